//! The native runtime loop.
//!
//! Polls the host's sessions, turns what it sees into engine observations
//! and carries out the resulting effects. Every engine call happens on the
//! task running [`Watcher::run`]; fetches and timers are spawned and report
//! back through a channel.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use sw_core::config::{EngineConfig, MonitorConfig};
use sw_core::ItemId;
use sw_engine::{
    DetectError, Effect, Event, Monitor, Page, PreferenceStore, SkipRange, TimerKind, VideoId,
    VideoSignal,
};

use super::fetch::SegmentSource;
use super::remote::{NowPlaying, Player, SessionInfo};

/// Results of spawned work, delivered back to the loop.
#[derive(Debug)]
pub enum Feedback {
    Segments {
        item: ItemId,
        result: std::result::Result<Vec<SkipRange>, String>,
    },
    Timer {
        timer: TimerKind,
        generation: u64,
    },
}

/// The host playback entry currently followed.
#[derive(Debug)]
struct Tracked {
    session_id: String,
    item: String,
    video: VideoId,
    position: Option<f64>,
}

/// A session snapshot seen through the engine's page interface. The
/// now-playing entry plays the part of both the playback manager and the
/// video element.
struct SessionPage<'a>(Option<&'a Tracked>);

impl Page for SessionPage<'_> {
    fn playback_manager_item(&self) -> std::result::Result<Option<String>, DetectError> {
        Ok(self.0.map(|t| t.item.clone()))
    }

    fn location(&self) -> String {
        match self.0 {
            Some(t) => format!("jellyfin:session/{}", t.session_id),
            None => "jellyfin:idle".to_string(),
        }
    }

    fn find_video(&self) -> Option<VideoId> {
        self.0.map(|t| t.video)
    }

    fn has_video(&self, video: VideoId) -> bool {
        self.0.is_some_and(|t| t.video == video)
    }
}

pub struct Watcher {
    monitor: Monitor,
    player: Arc<dyn Player>,
    source: Arc<dyn SegmentSource>,
    prefs: Arc<dyn PreferenceStore>,
    config: MonitorConfig,
    notice_duration: Duration,
    tracked: Option<Tracked>,
    next_video: u64,
    timers: HashMap<TimerKind, JoinHandle<()>>,
    tx: mpsc::UnboundedSender<Feedback>,
    rx: mpsc::UnboundedReceiver<Feedback>,
}

impl Watcher {
    pub fn new(
        engine: &EngineConfig,
        config: MonitorConfig,
        player: Arc<dyn Player>,
        source: Arc<dyn SegmentSource>,
        prefs: Arc<dyn PreferenceStore>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            monitor: Monitor::new(engine, prefs.load_enabled()),
            player,
            source,
            prefs,
            config,
            notice_duration: engine.notice_duration(),
            tracked: None,
            next_video: 0,
            timers: HashMap::new(),
            tx,
            rx,
        }
    }

    pub fn monitor(&self) -> &Monitor {
        &self.monitor
    }

    /// Poll until `cancel` fires, then tear the session down.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<()> {
        let mut ticker = tokio::time::interval(self.config.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            poll_ms = self.config.poll_ms,
            device = ?self.config.device_name,
            "Watching playback sessions"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.poll_once().await {
                        tracing::warn!("Session poll failed: {e:#}");
                    }
                }
                Some(feedback) = self.rx.recv() => self.handle_feedback(feedback),
            }
        }

        let fx = self.monitor.teardown();
        self.execute(fx);
        for (_, handle) in self.timers.drain() {
            handle.abort();
        }
        tracing::info!("Stopped watching");
        Ok(())
    }

    /// One observation pass over the host's sessions.
    pub async fn poll_once(&mut self) -> Result<()> {
        self.sync_preference();

        let sessions = self.player.sessions().await?;
        let playing = self
            .pick(&sessions)
            .map(|(s, n)| (s.id.clone(), n.id.clone(), s.position_secs(), s.is_paused()));

        let mut fx = Vec::new();
        match playing {
            Some((session_id, item, position, paused)) => {
                let same = self
                    .tracked
                    .as_ref()
                    .is_some_and(|t| t.session_id == session_id && t.item == item);
                if !same {
                    self.next_video += 1;
                    let video = VideoId(self.next_video);
                    tracing::info!(session = %session_id, item = %item, %video, "Following playback");
                    self.tracked = Some(Tracked {
                        session_id,
                        item,
                        video,
                        position: None,
                    });
                    let page = SessionPage(self.tracked.as_ref());
                    fx.extend(self.monitor.on_mutation(&page, &[video]));
                }
                if let Some(position) = position {
                    fx.extend(self.position_signal(position, paused));
                }
            }
            None => {
                if let Some(gone) = self.tracked.take() {
                    tracing::info!(session = %gone.session_id, "Playback stopped");
                    fx.extend(self.monitor.on_scan(&SessionPage(None)));
                }
            }
        }

        self.execute(fx);
        Ok(())
    }

    /// Feed the result of spawned work back into the engine.
    pub fn handle_feedback(&mut self, feedback: Feedback) {
        let event = match feedback {
            Feedback::Segments {
                item,
                result: Ok(segments),
            } => Event::SegmentsLoaded { item, segments },
            Feedback::Segments {
                item,
                result: Err(error),
            } => Event::SegmentsFailed { item, error },
            Feedback::Timer {
                timer: TimerKind::Cooldown,
                generation,
            } => Event::SkipCooldownElapsed {
                generation,
                position: self.current_position().unwrap_or(f64::NAN),
            },
            Feedback::Timer {
                timer: TimerKind::Notice,
                generation,
            } => Event::NoticeElapsed { generation },
        };
        let fx = self.monitor.dispatch(event);
        self.execute(fx);
    }

    /// Wait for the next piece of spawned work to report back.
    pub async fn next_feedback(&mut self) -> Option<Feedback> {
        self.rx.recv().await
    }

    fn pick<'s>(&self, sessions: &'s [SessionInfo]) -> Option<(&'s SessionInfo, &'s NowPlaying)> {
        let device = self.config.device_name.as_deref();
        let followed = self.tracked.as_ref().map(|t| t.session_id.as_str());

        let mut candidates = sessions
            .iter()
            .filter(|s| match device {
                Some(d) => s
                    .device_name
                    .as_deref()
                    .is_some_and(|n| n.eq_ignore_ascii_case(d)),
                None => true,
            })
            .filter_map(|s| s.playing_video().map(|n| (s, n)))
            .peekable();

        let first = candidates.peek().copied();
        candidates
            .find(|(s, _)| Some(s.id.as_str()) == followed)
            .or(first)
    }

    fn current_position(&self) -> Option<f64> {
        self.tracked.as_ref().and_then(|t| t.position)
    }

    /// Turn a polled position into a playback signal. A jump past the
    /// threshold is reported as a seek; the session tells its own seeks
    /// apart from the viewer's.
    fn position_signal(&mut self, position: f64, paused: bool) -> Vec<Effect> {
        let Some(tracked) = self.tracked.as_mut() else {
            return Vec::new();
        };
        let previous = tracked.position.replace(position);
        let jumped = previous.is_some_and(|p| (position - p).abs() > self.config.seek_jump_secs);

        let signal = if jumped {
            VideoSignal::Seeked(position)
        } else if paused {
            return Vec::new();
        } else {
            VideoSignal::TimeUpdate(position)
        };

        let page = SessionPage(self.tracked.as_ref());
        self.monitor.on_video_signal(&page, signal)
    }

    /// Pick up a preference changed by `skipwarden toggle`.
    fn sync_preference(&mut self) {
        let wanted = self.prefs.load_enabled();
        if wanted != self.monitor.session().is_enabled() {
            tracing::info!(enabled = wanted, "Preference changed on disk");
            let fx = self.monitor.toggle();
            self.execute(fx);
        }
    }

    fn execute(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::BindListeners(video) => {
                    tracing::trace!(%video, "Following position reports");
                }
                Effect::UnbindListeners(video) => {
                    tracing::trace!(%video, "No longer following position reports");
                }
                Effect::FetchSegments(item) => {
                    let source = self.source.clone();
                    let tx = self.tx.clone();
                    tokio::spawn(async move {
                        let result = source.segments(item).await.map_err(|e| format!("{e:#}"));
                        let _ = tx.send(Feedback::Segments { item, result });
                    });
                }
                Effect::Seek { to } => {
                    let Some(session_id) = self.tracked.as_ref().map(|t| t.session_id.clone())
                    else {
                        continue;
                    };
                    let player = self.player.clone();
                    tokio::spawn(async move {
                        if let Err(e) = player.seek(&session_id, to).await {
                            tracing::error!(session = %session_id, "Seek failed: {e:#}");
                        }
                    });
                }
                Effect::ShowNotice { text } => {
                    let Some(session_id) = self.tracked.as_ref().map(|t| t.session_id.clone())
                    else {
                        continue;
                    };
                    let player = self.player.clone();
                    let duration = self.notice_duration;
                    tokio::spawn(async move {
                        if let Err(e) = player.show_notice(&session_id, &text, duration).await {
                            tracing::warn!(session = %session_id, "Notice failed: {e:#}");
                        }
                    });
                }
                Effect::DismissNotice => {
                    tracing::trace!("Notice expires on the client");
                }
                Effect::StartTimer {
                    timer,
                    generation,
                    after,
                } => {
                    let tx = self.tx.clone();
                    let handle = tokio::spawn(async move {
                        tokio::time::sleep(after).await;
                        let _ = tx.send(Feedback::Timer { timer, generation });
                    });
                    if let Some(old) = self.timers.insert(timer, handle) {
                        old.abort();
                    }
                }
                Effect::CancelTimer(timer) => {
                    if let Some(handle) = self.timers.remove(&timer) {
                        handle.abort();
                    }
                }
                Effect::PersistEnabled(enabled) => {
                    if let Err(e) = self.prefs.store_enabled(enabled) {
                        tracing::warn!("Failed to persist preference: {e}");
                    }
                }
                Effect::UpdateIndicator(indicator) => {
                    tracing::info!(indicator = %indicator.label(), "Skip indicator");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watch::remote::PlayState;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use sw_core::SegmentId;
    use sw_engine::{MemoryPreferences, Phase};

    const ITEM: &str = "4f1c2b3a9d8e4c7ba6f50123456789ab";

    #[derive(Default)]
    struct FakePlayer {
        sessions: Mutex<Vec<SessionInfo>>,
        seeks: Mutex<Vec<(String, f64)>>,
        notices: Mutex<Vec<String>>,
    }

    impl FakePlayer {
        fn play(&self, item: &str, position: f64) {
            *self.sessions.lock() = vec![SessionInfo {
                id: "s1".into(),
                device_name: Some("TV".into()),
                now_playing_item: Some(NowPlaying {
                    id: item.into(),
                    media_type: Some("Video".into()),
                    ..Default::default()
                }),
                play_state: Some(PlayState {
                    position_ticks: Some(sw_core::seconds_to_ticks(position)),
                    is_paused: false,
                }),
                ..Default::default()
            }];
        }

        fn stop(&self) {
            self.sessions.lock().clear();
        }
    }

    #[async_trait]
    impl Player for FakePlayer {
        async fn sessions(&self) -> Result<Vec<SessionInfo>> {
            Ok(self.sessions.lock().clone())
        }

        async fn seek(&self, session_id: &str, position: f64) -> Result<()> {
            self.seeks.lock().push((session_id.to_string(), position));
            Ok(())
        }

        async fn show_notice(&self, _session_id: &str, text: &str, _d: Duration) -> Result<()> {
            self.notices.lock().push(text.to_string());
            Ok(())
        }
    }

    struct FixedSource;

    #[async_trait]
    impl SegmentSource for FixedSource {
        async fn segments(&self, item: ItemId) -> Result<Vec<SkipRange>> {
            Ok(vec![SkipRange {
                id: SegmentId::from(1),
                item_id: item,
                start: 30.0,
                end: 45.5,
                reason: Some("Violence".into()),
            }])
        }
    }

    fn watcher(player: Arc<FakePlayer>, prefs: Arc<MemoryPreferences>) -> Watcher {
        let engine = EngineConfig {
            cooldown_ms: 20,
            notice_ms: 60_000,
            ..Default::default()
        };
        Watcher::new(
            &engine,
            MonitorConfig::default(),
            player,
            Arc::new(FixedSource),
            prefs,
        )
    }

    async fn drain_spawned() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    /// Start following `ITEM` at 10s with its segments loaded.
    async fn monitoring(player: &Arc<FakePlayer>, w: &mut Watcher) {
        player.play(ITEM, 10.0);
        w.poll_once().await.unwrap();
        let feedback = w.next_feedback().await.unwrap();
        assert!(matches!(feedback, Feedback::Segments { .. }));
        w.handle_feedback(feedback);
        assert_eq!(w.monitor().session().phase(), Phase::Monitoring);
    }

    #[tokio::test]
    async fn skips_once_and_returns_to_monitoring() {
        let player = Arc::new(FakePlayer::default());
        let mut w = watcher(player.clone(), Arc::new(MemoryPreferences::default()));
        monitoring(&player, &mut w).await;

        player.play(ITEM, 29.8);
        w.poll_once().await.unwrap();
        player.play(ITEM, 30.2);
        w.poll_once().await.unwrap();
        drain_spawned().await;
        assert_eq!(*player.seeks.lock(), vec![("s1".to_string(), 46.0)]);
        assert_eq!(*player.notices.lock(), vec!["Skipping: Violence".to_string()]);

        // Our own seek lands; no second skip.
        player.play(ITEM, 46.1);
        w.poll_once().await.unwrap();
        assert!(w.monitor().session().is_skipping());

        let feedback = w.next_feedback().await.unwrap();
        assert!(matches!(
            feedback,
            Feedback::Timer {
                timer: TimerKind::Cooldown,
                ..
            }
        ));
        w.handle_feedback(feedback);
        drain_spawned().await;
        assert_eq!(w.monitor().session().phase(), Phase::Monitoring);
        assert_eq!(player.seeks.lock().len(), 1);
    }

    #[tokio::test]
    async fn clamped_landing_is_not_skipped_again() {
        let player = Arc::new(FakePlayer::default());
        let mut w = watcher(player.clone(), Arc::new(MemoryPreferences::default()));
        monitoring(&player, &mut w).await;

        player.play(ITEM, 30.2);
        w.poll_once().await.unwrap();
        // The host snaps the seek to a keyframe short of the range end.
        for _ in 0..5 {
            player.play(ITEM, 45.2);
            w.poll_once().await.unwrap();
        }
        drain_spawned().await;

        assert!(w.monitor().session().is_skipping());
        assert_eq!(w.monitor().session().skip_count(), 1);
        assert_eq!(player.seeks.lock().len(), 1);
    }

    #[tokio::test]
    async fn skip_that_did_not_land_is_retried() {
        let player = Arc::new(FakePlayer::default());
        let mut w = watcher(player.clone(), Arc::new(MemoryPreferences::default()));
        monitoring(&player, &mut w).await;

        player.play(ITEM, 30.2);
        w.poll_once().await.unwrap();
        player.play(ITEM, 30.6);
        w.poll_once().await.unwrap();

        let feedback = w.next_feedback().await.unwrap();
        w.handle_feedback(feedback);
        drain_spawned().await;
        let seeks: Vec<f64> = player.seeks.lock().iter().map(|(_, p)| *p).collect();
        assert_eq!(seeks, vec![46.0, 46.0]);
    }

    #[tokio::test]
    async fn preference_change_on_disk_disables_skipping() {
        let player = Arc::new(FakePlayer::default());
        let prefs = Arc::new(MemoryPreferences::default());
        let mut w = watcher(player.clone(), prefs.clone());
        monitoring(&player, &mut w).await;

        prefs.store_enabled(false).unwrap();
        player.play(ITEM, 30.2);
        w.poll_once().await.unwrap();
        drain_spawned().await;

        assert!(!w.monitor().session().is_enabled());
        assert_eq!(w.monitor().session().indicator().loaded, 1);
        assert!(player.seeks.lock().is_empty());
    }

    #[tokio::test]
    async fn stopped_playback_detaches() {
        let player = Arc::new(FakePlayer::default());
        let mut w = watcher(player.clone(), Arc::new(MemoryPreferences::default()));
        monitoring(&player, &mut w).await;

        player.stop();
        w.poll_once().await.unwrap();
        assert_eq!(w.monitor().session().phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn new_item_is_a_new_element() {
        let player = Arc::new(FakePlayer::default());
        let mut w = watcher(player.clone(), Arc::new(MemoryPreferences::default()));
        monitoring(&player, &mut w).await;

        let next = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
        player.play(next, 0.0);
        w.poll_once().await.unwrap();
        assert_eq!(w.monitor().session().video(), Some(VideoId(2)));
        assert_eq!(
            w.monitor().session().active_item(),
            Some(next.parse().unwrap())
        );
        assert_eq!(w.monitor().session().phase(), Phase::Attached);
    }
}

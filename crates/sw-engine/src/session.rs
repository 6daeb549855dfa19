//! Per-viewing-session skip state machine.
//!
//! ```text
//!   Idle ──attach──▶ Attached ──segments loaded──▶ Monitoring ──match──▶ Skipping
//!    ▲                  ▲  ▲                          │  ▲                    │
//!    └──── detach ──────┘  └──── item changed ────────┘  └──── cooldown ──────┘
//! ```
//!
//! All transitions happen in [`Session::handle`]. The `enabled` flag is
//! orthogonal to the phase: when off, matching is skipped but segments are
//! still loaded and counted.

use std::time::Duration;

use sw_core::config::EngineConfig;
use sw_core::{ItemId, SegmentId};

use crate::event::{Effect, Event, Indicator, TimerKind, VideoId};
use crate::segment::{self, SkipRange};

/// A seek landing this close to the engine's own target is the engine's.
const OWN_SEEK_TOLERANCE_SECS: f64 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Phase {
    /// No playback element.
    Idle,
    /// Element present; active item or its segments not yet known.
    Attached,
    /// Segments current; every position signal is checked.
    Monitoring,
    /// A skip was issued; checks are suppressed until the cooldown ends.
    Skipping(ActiveSkip),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveSkip {
    pub segment: SegmentId,
    pub end: f64,
    pub target: f64,
    /// Set once the seek has been re-applied after a failed verification.
    pub retried: bool,
    /// A seek we issued has not been reported back yet. The next `Seeked`
    /// is ours wherever it lands, since players clamp to the duration and
    /// snap to keyframes.
    pub seek_pending: bool,
}

/// State of one viewing session.
#[derive(Debug)]
pub struct Session {
    skip_buffer: f64,
    cooldown: Duration,
    notice: Duration,
    show_notice: bool,
    default_reason: String,

    phase: Phase,
    video: Option<VideoId>,
    item: Option<ItemId>,
    segments: Vec<SkipRange>,
    segments_current: bool,
    enabled: bool,
    last_position: Option<f64>,

    cooldown_generation: u64,
    notice_generation: u64,
    skips: u64,
}

impl Session {
    /// Start a session with the persisted `enabled` preference.
    pub fn new(config: &EngineConfig, enabled: bool) -> Self {
        Self {
            skip_buffer: config.skip_buffer_secs.max(0.0),
            cooldown: config.cooldown(),
            notice: config.notice_duration(),
            show_notice: config.show_notice,
            default_reason: config.default_reason.clone(),
            phase: Phase::Idle,
            video: None,
            item: None,
            segments: Vec::new(),
            segments_current: false,
            enabled,
            last_position: None,
            cooldown_generation: 0,
            notice_generation: 0,
            skips: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_skipping(&self) -> bool {
        matches!(self.phase, Phase::Skipping(_))
    }

    pub fn active_item(&self) -> Option<ItemId> {
        self.item
    }

    pub fn video(&self) -> Option<VideoId> {
        self.video
    }

    pub fn segments(&self) -> &[SkipRange] {
        &self.segments
    }

    /// Skips issued since the session started.
    pub fn skip_count(&self) -> u64 {
        self.skips
    }

    pub fn indicator(&self) -> Indicator {
        Indicator {
            enabled: self.enabled,
            loaded: self.segments.len(),
        }
    }

    /// Apply one event and return the effects the host must perform.
    pub fn handle(&mut self, event: Event) -> Vec<Effect> {
        let mut fx = Vec::new();
        match event {
            Event::VideoAttached(video) => self.on_video_attached(video, &mut fx),
            Event::VideoDetached(video) => self.on_video_detached(video, &mut fx),
            Event::PositionUpdate { position } => self.on_position(position, &mut fx),
            Event::Seeked { position } => self.on_seeked(position, &mut fx),
            Event::ItemChanged(item) => self.on_item_changed(item, &mut fx),
            Event::SegmentsLoaded { item, segments } => {
                self.on_segments_loaded(item, segments, &mut fx)
            }
            Event::SegmentsFailed { item, error } => {
                if self.item == Some(item) {
                    tracing::warn!(item = %item, error = %error, "Failed to load segments");
                }
            }
            Event::ToggleEnabled => self.on_toggle(&mut fx),
            Event::SkipCooldownElapsed {
                generation,
                position,
            } => self.on_cooldown_elapsed(generation, position, &mut fx),
            Event::NoticeElapsed { generation } => {
                if generation == self.notice_generation {
                    fx.push(Effect::DismissNotice);
                }
            }
        }
        fx
    }

    /// End the session: release the element and stop every timer.
    pub fn teardown(&mut self) -> Vec<Effect> {
        let mut fx = Vec::new();
        if let Some(video) = self.video.take() {
            fx.push(Effect::UnbindListeners(video));
        }
        fx.push(Effect::CancelTimer(TimerKind::Cooldown));
        fx.push(Effect::CancelTimer(TimerKind::Notice));
        fx.push(Effect::DismissNotice);
        self.cooldown_generation += 1;
        self.notice_generation += 1;
        self.phase = Phase::Idle;
        self.item = None;
        self.segments.clear();
        self.segments_current = false;
        self.last_position = None;
        fx
    }

    // -----------------------------------------------------------------------
    // transitions
    // -----------------------------------------------------------------------

    fn on_video_attached(&mut self, video: VideoId, fx: &mut Vec<Effect>) {
        if self.video == Some(video) {
            return;
        }
        if let Some(old) = self.video.take() {
            fx.push(Effect::UnbindListeners(old));
        }
        self.abort_skip(fx);
        tracing::info!(%video, "Attached to playback element");
        self.video = Some(video);
        self.last_position = None;
        fx.push(Effect::BindListeners(video));
        self.settle();
        fx.push(Effect::UpdateIndicator(self.indicator()));
    }

    fn on_video_detached(&mut self, video: VideoId, fx: &mut Vec<Effect>) {
        if self.video != Some(video) {
            return;
        }
        tracing::info!(%video, "Playback element removed");
        fx.push(Effect::UnbindListeners(video));
        self.abort_skip(fx);
        self.video = None;
        self.last_position = None;
        self.settle();
    }

    fn on_position(&mut self, position: f64, fx: &mut Vec<Effect>) {
        if !position.is_finite() {
            return;
        }
        self.last_position = Some(position);
        if self.phase == Phase::Monitoring {
            self.evaluate(position, fx);
        }
    }

    fn on_seeked(&mut self, position: f64, fx: &mut Vec<Effect>) {
        if !position.is_finite() {
            return;
        }
        self.last_position = Some(position);
        match self.phase {
            Phase::Skipping(skip) => {
                if skip.seek_pending {
                    self.phase = Phase::Skipping(ActiveSkip {
                        seek_pending: false,
                        ..skip
                    });
                    return;
                }
                if (position - skip.target).abs() <= OWN_SEEK_TOLERANCE_SECS {
                    return;
                }
                tracing::debug!(position, "Viewer seeked during cooldown");
                self.abort_skip(fx);
                self.settle();
                if self.phase == Phase::Monitoring {
                    self.evaluate(position, fx);
                }
            }
            Phase::Monitoring => self.evaluate(position, fx),
            Phase::Idle | Phase::Attached => {}
        }
    }

    fn on_item_changed(&mut self, item: ItemId, fx: &mut Vec<Effect>) {
        if self.item == Some(item) {
            return;
        }
        tracing::info!(
            from = ?self.item.map(|i| i.to_string()),
            to = %item,
            "Active item changed"
        );
        self.item = Some(item);
        self.segments.clear();
        self.segments_current = false;
        self.last_position = None;
        self.abort_skip(fx);
        self.settle();
        fx.push(Effect::FetchSegments(item));
        fx.push(Effect::UpdateIndicator(self.indicator()));
    }

    fn on_segments_loaded(
        &mut self,
        item: ItemId,
        mut segments: Vec<SkipRange>,
        fx: &mut Vec<Effect>,
    ) {
        if self.item != Some(item) {
            tracing::debug!(item = %item, "Discarding segments for a superseded item");
            return;
        }
        let dropped = segment::prepare(&mut segments);
        if dropped > 0 {
            tracing::warn!(item = %item, dropped, "Ignored malformed segments");
        }
        tracing::info!(item = %item, count = segments.len(), "Segments loaded");
        self.segments = segments;
        self.segments_current = true;
        self.settle();
        fx.push(Effect::UpdateIndicator(self.indicator()));

        // Playback may already be inside a range.
        if self.phase == Phase::Monitoring {
            if let Some(position) = self.last_position {
                self.evaluate(position, fx);
            }
        }
    }

    fn on_toggle(&mut self, fx: &mut Vec<Effect>) {
        self.enabled = !self.enabled;
        tracing::info!(enabled = self.enabled, "Skipping toggled");
        if !self.enabled {
            self.abort_skip(fx);
        }
        fx.push(Effect::PersistEnabled(self.enabled));
        fx.push(Effect::UpdateIndicator(self.indicator()));
    }

    fn on_cooldown_elapsed(&mut self, generation: u64, position: f64, fx: &mut Vec<Effect>) {
        if generation != self.cooldown_generation {
            return;
        }
        let Phase::Skipping(skip) = self.phase else {
            return;
        };
        if position.is_finite() {
            self.last_position = Some(position);
        }

        if position < skip.end && !skip.retried {
            tracing::warn!(
                segment = %skip.segment,
                position,
                target = skip.target,
                "Skip did not take effect; seeking again"
            );
            self.cooldown_generation += 1;
            self.phase = Phase::Skipping(ActiveSkip {
                retried: true,
                seek_pending: true,
                ..skip
            });
            fx.push(Effect::Seek { to: skip.target });
            fx.push(Effect::StartTimer {
                timer: TimerKind::Cooldown,
                generation: self.cooldown_generation,
                after: self.cooldown,
            });
            return;
        }

        self.phase = Phase::Monitoring;
        self.settle();
    }

    // -----------------------------------------------------------------------
    // helpers
    // -----------------------------------------------------------------------

    /// Recompute the phase from the attachment and segment state. A skip in
    /// progress is left alone.
    fn settle(&mut self) {
        if self.is_skipping() && self.video.is_some() {
            return;
        }
        self.phase = match (self.video, self.segments_current) {
            (None, _) => Phase::Idle,
            (Some(_), false) => Phase::Attached,
            (Some(_), true) => Phase::Monitoring,
        };
    }

    /// Leave `Skipping` early, invalidating the pending cooldown.
    fn abort_skip(&mut self, fx: &mut Vec<Effect>) {
        if self.is_skipping() {
            self.cooldown_generation += 1;
            fx.push(Effect::CancelTimer(TimerKind::Cooldown));
            self.phase = Phase::Monitoring;
        }
    }

    fn evaluate(&mut self, position: f64, fx: &mut Vec<Effect>) {
        if !self.enabled {
            return;
        }
        let Some(hit) = segment::find_match(&self.segments, position) else {
            return;
        };
        let target = hit.end + self.skip_buffer;
        let reason = match hit.reason.as_deref().map(str::trim) {
            Some(r) if !r.is_empty() => r.to_string(),
            _ => self.default_reason.clone(),
        };
        let skip = ActiveSkip {
            segment: hit.id,
            end: hit.end,
            target,
            retried: false,
            seek_pending: true,
        };

        tracing::info!(
            item = ?self.item.map(|i| i.to_string()),
            segment = %skip.segment,
            from = position,
            to = target,
            "Skipping segment"
        );

        self.skips += 1;
        self.cooldown_generation += 1;
        self.phase = Phase::Skipping(skip);
        fx.push(Effect::Seek { to: target });
        if self.show_notice {
            self.push_notice(format!("Skipping: {reason}"), fx);
        }
        fx.push(Effect::StartTimer {
            timer: TimerKind::Cooldown,
            generation: self.cooldown_generation,
            after: self.cooldown,
        });
    }

    fn push_notice(&mut self, text: String, fx: &mut Vec<Effect>) {
        self.notice_generation += 1;
        fx.push(Effect::CancelTimer(TimerKind::Notice));
        fx.push(Effect::ShowNotice { text });
        fx.push(Effect::StartTimer {
            timer: TimerKind::Notice,
            generation: self.notice_generation,
            after: self.notice,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(n: u8) -> ItemId {
        format!("{n:032x}").parse().unwrap()
    }

    fn range(id: i64, item_id: ItemId, start: f64, end: f64, reason: Option<&str>) -> SkipRange {
        SkipRange {
            id: SegmentId::from(id),
            item_id,
            start,
            end,
            reason: reason.map(String::from),
        }
    }

    /// A session attached to video 1, playing `item(1)` with one range
    /// `[30, 45.5)` labelled "Violence".
    fn monitoring() -> Session {
        let mut s = Session::new(&EngineConfig::default(), true);
        s.handle(Event::VideoAttached(VideoId(1)));
        s.handle(Event::ItemChanged(item(1)));
        s.handle(Event::SegmentsLoaded {
            item: item(1),
            segments: vec![range(1, item(1), 30.0, 45.5, Some("Violence"))],
        });
        assert_eq!(s.phase(), Phase::Monitoring);
        s
    }

    fn seeks(fx: &[Effect]) -> Vec<f64> {
        fx.iter()
            .filter_map(|e| match e {
                Effect::Seek { to } => Some(*to),
                _ => None,
            })
            .collect()
    }

    fn cooldown_generation(fx: &[Effect]) -> u64 {
        fx.iter()
            .find_map(|e| match e {
                Effect::StartTimer {
                    timer: TimerKind::Cooldown,
                    generation,
                    ..
                } => Some(*generation),
                _ => None,
            })
            .expect("cooldown timer started")
    }

    #[test]
    fn starts_idle_with_preference() {
        let s = Session::new(&EngineConfig::default(), false);
        assert_eq!(s.phase(), Phase::Idle);
        assert!(!s.is_enabled());
        assert!(s.active_item().is_none());
    }

    #[test]
    fn attach_binds_and_enters_attached() {
        let mut s = Session::new(&EngineConfig::default(), true);
        let fx = s.handle(Event::VideoAttached(VideoId(1)));
        assert_eq!(fx[0], Effect::BindListeners(VideoId(1)));
        assert_eq!(s.phase(), Phase::Attached);

        // same element again is a no-op
        assert!(s.handle(Event::VideoAttached(VideoId(1))).is_empty());
    }

    #[test]
    fn reattach_unbinds_old_element_first() {
        let mut s = monitoring();
        let fx = s.handle(Event::VideoAttached(VideoId(2)));
        assert_eq!(fx[0], Effect::UnbindListeners(VideoId(1)));
        assert!(fx.contains(&Effect::BindListeners(VideoId(2))));
        assert_eq!(s.video(), Some(VideoId(2)));
        // segments for the same item remain current
        assert_eq!(s.phase(), Phase::Monitoring);
    }

    #[test]
    fn detach_returns_to_idle() {
        let mut s = monitoring();
        let fx = s.handle(Event::VideoDetached(VideoId(1)));
        assert_eq!(fx, vec![Effect::UnbindListeners(VideoId(1))]);
        assert_eq!(s.phase(), Phase::Idle);
        assert!(s.handle(Event::VideoDetached(VideoId(1))).is_empty());
    }

    #[test]
    fn position_inside_range_skips_once_past_end() {
        let mut s = monitoring();
        let fx = s.handle(Event::PositionUpdate { position: 30.2 });

        assert_eq!(seeks(&fx), vec![46.0]);
        assert!(fx.contains(&Effect::ShowNotice {
            text: "Skipping: Violence".into()
        }));
        assert!(fx.contains(&Effect::CancelTimer(TimerKind::Notice)));
        assert!(matches!(s.phase(), Phase::Skipping(_)));
        assert_eq!(s.skip_count(), 1);

        // signals during the cooldown never skip again
        for p in [30.3, 31.0, 45.6, 46.0, 46.8] {
            assert!(seeks(&s.handle(Event::PositionUpdate { position: p })).is_empty());
        }
        assert_eq!(s.skip_count(), 1);
    }

    #[test]
    fn position_outside_ranges_does_nothing() {
        let mut s = monitoring();
        assert!(s.handle(Event::PositionUpdate { position: 29.99 }).is_empty());
        assert!(s.handle(Event::PositionUpdate { position: 45.5 }).is_empty());
        assert_eq!(s.phase(), Phase::Monitoring);
    }

    #[test]
    fn missing_reason_uses_default_label() {
        let mut s = Session::new(&EngineConfig::default(), true);
        s.handle(Event::VideoAttached(VideoId(1)));
        s.handle(Event::ItemChanged(item(1)));
        s.handle(Event::SegmentsLoaded {
            item: item(1),
            segments: vec![range(1, item(1), 0.0, 5.0, None)],
        });
        let fx = s.handle(Event::PositionUpdate { position: 1.0 });
        assert!(fx.contains(&Effect::ShowNotice {
            text: "Skipping: Restricted Content".into()
        }));
    }

    #[test]
    fn cooldown_end_returns_to_monitoring() {
        let mut s = monitoring();
        let fx = s.handle(Event::PositionUpdate { position: 30.2 });
        let generation = cooldown_generation(&fx);

        let fx = s.handle(Event::SkipCooldownElapsed {
            generation,
            position: 46.7,
        });
        assert!(fx.is_empty());
        assert_eq!(s.phase(), Phase::Monitoring);
    }

    #[test]
    fn cooldown_reseeks_when_skip_did_not_take() {
        let mut s = monitoring();
        let fx = s.handle(Event::PositionUpdate { position: 30.2 });
        let generation = cooldown_generation(&fx);

        let fx = s.handle(Event::SkipCooldownElapsed {
            generation,
            position: 31.5,
        });
        assert_eq!(seeks(&fx), vec![46.0]);
        assert!(s.is_skipping());

        // second verification does not loop
        let generation = cooldown_generation(&fx);
        let fx = s.handle(Event::SkipCooldownElapsed {
            generation,
            position: 31.9,
        });
        assert!(seeks(&fx).is_empty());
        assert_eq!(s.phase(), Phase::Monitoring);
    }

    #[test]
    fn stale_cooldown_is_ignored() {
        let mut s = monitoring();
        let fx = s.handle(Event::PositionUpdate { position: 30.2 });
        let generation = cooldown_generation(&fx);
        assert!(s
            .handle(Event::SkipCooldownElapsed {
                generation: generation - 1,
                position: 46.0,
            })
            .is_empty());
        assert!(s.is_skipping());
    }

    #[test]
    fn own_seek_does_not_reset_cooldown() {
        let mut s = monitoring();
        s.handle(Event::PositionUpdate { position: 30.2 });
        let fx = s.handle(Event::Seeked { position: 46.1 });
        assert!(fx.is_empty());
        assert!(s.is_skipping());
    }

    #[test]
    fn clamped_landing_of_own_seek_is_not_a_viewer_seek() {
        let mut s = monitoring();
        s.handle(Event::PositionUpdate { position: 30.2 });

        // The player clamps to the media duration, short of the target.
        let fx = s.handle(Event::Seeked { position: 45.2 });
        assert!(fx.is_empty());
        assert!(s.is_skipping());
        assert_eq!(s.skip_count(), 1);

        // The clamped position keeps reporting; still no further skips.
        for _ in 0..5 {
            assert!(seeks(&s.handle(Event::PositionUpdate { position: 45.2 })).is_empty());
        }
        assert_eq!(s.skip_count(), 1);
    }

    #[test]
    fn unlanded_skip_retries_once_then_gives_up() {
        let mut s = monitoring();
        let fx = s.handle(Event::PositionUpdate { position: 30.2 });
        let generation = cooldown_generation(&fx);
        s.handle(Event::Seeked { position: 44.0 });

        let fx = s.handle(Event::SkipCooldownElapsed {
            generation,
            position: 44.0,
        });
        assert_eq!(seeks(&fx), vec![46.0]);
        // the retried seek is also ours, wherever it lands
        assert!(s.handle(Event::Seeked { position: 44.0 }).is_empty());

        let generation = cooldown_generation(&fx);
        let fx = s.handle(Event::SkipCooldownElapsed {
            generation,
            position: 44.0,
        });
        assert!(seeks(&fx).is_empty());
        assert_eq!(s.phase(), Phase::Monitoring);
        assert_eq!(s.skip_count(), 1);
    }

    #[test]
    fn user_seek_during_cooldown_is_enforced_immediately() {
        let mut s = monitoring();
        s.handle(Event::PositionUpdate { position: 30.2 });
        s.handle(Event::Seeked { position: 46.0 });

        let fx = s.handle(Event::Seeked { position: 35.0 });
        assert_eq!(fx[0], Effect::CancelTimer(TimerKind::Cooldown));
        assert_eq!(seeks(&fx), vec![46.0]);
        assert_eq!(s.skip_count(), 2);
    }

    #[test]
    fn user_seek_elsewhere_leaves_skipping() {
        let mut s = monitoring();
        s.handle(Event::PositionUpdate { position: 30.2 });
        s.handle(Event::Seeked { position: 46.0 });
        let fx = s.handle(Event::Seeked { position: 10.0 });
        assert_eq!(fx, vec![Effect::CancelTimer(TimerKind::Cooldown)]);
        assert_eq!(s.phase(), Phase::Monitoring);
    }

    #[test]
    fn item_change_clears_segments_and_fetches() {
        let mut s = monitoring();
        let fx = s.handle(Event::ItemChanged(item(2)));
        assert!(fx.contains(&Effect::FetchSegments(item(2))));
        assert!(s.segments().is_empty());
        assert_eq!(s.phase(), Phase::Attached);

        // a position inside the old item's range must not skip
        assert!(seeks(&s.handle(Event::PositionUpdate { position: 31.0 })).is_empty());
    }

    #[test]
    fn same_item_again_is_a_no_op() {
        let mut s = monitoring();
        assert!(s.handle(Event::ItemChanged(item(1))).is_empty());
        assert_eq!(s.segments().len(), 1);
    }

    #[test]
    fn late_response_for_previous_item_is_discarded() {
        let mut s = Session::new(&EngineConfig::default(), true);
        s.handle(Event::VideoAttached(VideoId(1)));
        s.handle(Event::ItemChanged(item(1)));
        s.handle(Event::ItemChanged(item(2)));

        let fx = s.handle(Event::SegmentsLoaded {
            item: item(1),
            segments: vec![range(1, item(1), 0.0, 100.0, None)],
        });
        assert!(fx.is_empty());
        assert!(s.segments().is_empty());
        assert_eq!(s.phase(), Phase::Attached);
        assert!(seeks(&s.handle(Event::PositionUpdate { position: 50.0 })).is_empty());
    }

    #[test]
    fn segments_arriving_mid_range_skip_immediately() {
        let mut s = Session::new(&EngineConfig::default(), true);
        s.handle(Event::VideoAttached(VideoId(1)));
        s.handle(Event::ItemChanged(item(1)));
        s.handle(Event::PositionUpdate { position: 31.0 });

        let fx = s.handle(Event::SegmentsLoaded {
            item: item(1),
            segments: vec![range(1, item(1), 30.0, 45.5, None)],
        });
        assert_eq!(seeks(&fx), vec![46.0]);
    }

    #[test]
    fn fetch_failure_keeps_attached() {
        let mut s = Session::new(&EngineConfig::default(), true);
        s.handle(Event::VideoAttached(VideoId(1)));
        s.handle(Event::ItemChanged(item(1)));
        let fx = s.handle(Event::SegmentsFailed {
            item: item(1),
            error: "connection refused".into(),
        });
        assert!(fx.is_empty());
        assert_eq!(s.phase(), Phase::Attached);
    }

    #[test]
    fn disabled_suppresses_next_skip_but_keeps_count() {
        let mut s = monitoring();
        let fx = s.handle(Event::ToggleEnabled);
        assert!(fx.contains(&Effect::PersistEnabled(false)));
        assert!(fx.contains(&Effect::UpdateIndicator(Indicator {
            enabled: false,
            loaded: 1
        })));

        assert!(s.handle(Event::PositionUpdate { position: 31.0 }).is_empty());
        assert_eq!(s.segments().len(), 1);

        s.handle(Event::ToggleEnabled);
        assert_eq!(seeks(&s.handle(Event::PositionUpdate { position: 31.0 })), vec![46.0]);
    }

    #[test]
    fn disabling_abandons_skip_in_progress() {
        let mut s = monitoring();
        let fx = s.handle(Event::PositionUpdate { position: 30.2 });
        let generation = cooldown_generation(&fx);

        let fx = s.handle(Event::ToggleEnabled);
        assert!(fx.contains(&Effect::CancelTimer(TimerKind::Cooldown)));
        assert_eq!(s.phase(), Phase::Monitoring);

        // the old cooldown can no longer re-seek
        let fx = s.handle(Event::SkipCooldownElapsed {
            generation,
            position: 31.0,
        });
        assert!(seeks(&fx).is_empty());
    }

    #[test]
    fn notices_can_be_switched_off() {
        let config = EngineConfig {
            show_notice: false,
            ..Default::default()
        };
        let mut s = Session::new(&config, true);
        s.handle(Event::VideoAttached(VideoId(1)));
        s.handle(Event::ItemChanged(item(1)));
        s.handle(Event::SegmentsLoaded {
            item: item(1),
            segments: vec![range(1, item(1), 30.0, 45.5, None)],
        });
        let fx = s.handle(Event::PositionUpdate { position: 30.2 });
        assert_eq!(seeks(&fx), vec![46.0]);
        assert!(!fx.iter().any(|e| matches!(e, Effect::ShowNotice { .. })));
        assert!(!fx.iter().any(|e| matches!(
            e,
            Effect::StartTimer {
                timer: TimerKind::Notice,
                ..
            }
        )));
    }

    #[test]
    fn disabled_session_still_loads_segments() {
        let mut s = Session::new(&EngineConfig::default(), false);
        s.handle(Event::VideoAttached(VideoId(1)));
        s.handle(Event::ItemChanged(item(1)));
        let fx = s.handle(Event::SegmentsLoaded {
            item: item(1),
            segments: vec![
                range(1, item(1), 1.0, 2.0, None),
                range(2, item(1), 5.0, 6.0, None),
            ],
        });
        assert!(fx.contains(&Effect::UpdateIndicator(Indicator {
            enabled: false,
            loaded: 2
        })));
    }

    #[test]
    fn new_notice_cancels_previous_dismissal() {
        let mut s = monitoring();
        s.handle(Event::SegmentsLoaded {
            item: item(1),
            segments: vec![
                range(1, item(1), 30.0, 45.5, None),
                range(2, item(1), 60.0, 70.0, None),
            ],
        });
        let first = s.handle(Event::PositionUpdate { position: 31.0 });
        let first_notice = first
            .iter()
            .find_map(|e| match e {
                Effect::StartTimer {
                    timer: TimerKind::Notice,
                    generation,
                    ..
                } => Some(*generation),
                _ => None,
            })
            .unwrap();

        // viewer jumps into the second range before the notice expires
        s.handle(Event::Seeked { position: 46.0 });
        let second = s.handle(Event::Seeked { position: 61.0 });
        let cancel = second
            .iter()
            .position(|e| *e == Effect::CancelTimer(TimerKind::Notice))
            .unwrap();
        let show = second
            .iter()
            .position(|e| matches!(e, Effect::ShowNotice { .. }))
            .unwrap();
        assert!(cancel < show);

        // the first notice timer firing late must not hide the second notice
        assert!(s
            .handle(Event::NoticeElapsed {
                generation: first_notice
            })
            .is_empty());
    }

    #[test]
    fn notice_elapsed_dismisses() {
        let mut s = monitoring();
        let fx = s.handle(Event::PositionUpdate { position: 31.0 });
        let generation = fx
            .iter()
            .find_map(|e| match e {
                Effect::StartTimer {
                    timer: TimerKind::Notice,
                    generation,
                    after,
                } => {
                    assert_eq!(*after, Duration::from_millis(3000));
                    Some(*generation)
                }
                _ => None,
            })
            .unwrap();
        assert_eq!(
            s.handle(Event::NoticeElapsed { generation }),
            vec![Effect::DismissNotice]
        );
    }

    #[test]
    fn teardown_releases_everything() {
        let mut s = monitoring();
        s.handle(Event::PositionUpdate { position: 31.0 });
        let fx = s.teardown();
        assert_eq!(fx[0], Effect::UnbindListeners(VideoId(1)));
        assert!(fx.contains(&Effect::CancelTimer(TimerKind::Cooldown)));
        assert!(fx.contains(&Effect::CancelTimer(TimerKind::Notice)));
        assert_eq!(s.phase(), Phase::Idle);
        assert!(s.active_item().is_none());
    }

    #[test]
    fn custom_buffer_and_label() {
        let config = EngineConfig {
            skip_buffer_secs: 1.0,
            default_reason: "Hidden".into(),
            ..EngineConfig::default()
        };
        let mut s = Session::new(&config, true);
        s.handle(Event::VideoAttached(VideoId(1)));
        s.handle(Event::ItemChanged(item(1)));
        s.handle(Event::SegmentsLoaded {
            item: item(1),
            segments: vec![range(1, item(1), 10.0, 20.0, None)],
        });
        let fx = s.handle(Event::PositionUpdate { position: 10.0 });
        assert_eq!(seeks(&fx), vec![21.0]);
        assert!(fx.contains(&Effect::ShowNotice {
            text: "Skipping: Hidden".into()
        }));
    }
}

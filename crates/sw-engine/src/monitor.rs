//! Host-facing monitor: page observations in, effects out.
//!
//! [`Monitor`] wires the attachment tracker, detector chain and request
//! sniffer to a [`Session`]. Hosts call one method per thing they observe
//! and execute whatever effects come back.

use sw_core::config::EngineConfig;

use crate::attach::AttachmentTracker;
use crate::detect::{DetectorChain, Page};
use crate::event::{Effect, Event, VideoId, VideoSignal};
use crate::session::Session;
use crate::sniff::{RequestObserver, RequestSniffer};

pub struct Monitor {
    session: Session,
    chain: DetectorChain,
    sniffer: RequestSniffer,
    tracker: AttachmentTracker,
    last_address: Option<String>,
}

impl Monitor {
    /// Monitor with the standard detector chain.
    pub fn new(config: &EngineConfig, enabled: bool) -> Self {
        let sniffer = RequestSniffer::new();
        let chain = DetectorChain::standard(sniffer.clone());
        Self::with_chain(config, enabled, chain, sniffer)
    }

    pub fn with_chain(
        config: &EngineConfig,
        enabled: bool,
        chain: DetectorChain,
        sniffer: RequestSniffer,
    ) -> Self {
        Self {
            session: Session::new(config, enabled),
            chain,
            sniffer,
            tracker: AttachmentTracker::new(),
            last_address: None,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Handle for the host's request hook.
    pub fn sniffer(&self) -> RequestSniffer {
        self.sniffer.clone()
    }

    /// Feed an event straight to the session (fetch results, timers).
    pub fn dispatch(&mut self, event: Event) -> Vec<Effect> {
        self.session.handle(event)
    }

    /// Structural page change; `added` are newly inserted playback elements.
    pub fn on_mutation(&mut self, page: &dyn Page, added: &[VideoId]) -> Vec<Effect> {
        let change = self.tracker.on_mutation(page, added);
        self.apply_attachment(page, change)
    }

    /// Periodic fallback scan for the playback element.
    pub fn on_scan(&mut self, page: &dyn Page) -> Vec<Effect> {
        let change = self.tracker.scan(page);
        self.apply_attachment(page, change)
    }

    pub fn on_video_signal(&mut self, page: &dyn Page, signal: VideoSignal) -> Vec<Effect> {
        match signal {
            VideoSignal::Play | VideoSignal::LoadedData => self.detect_item(page),
            VideoSignal::TimeUpdate(position) => {
                self.session.handle(Event::PositionUpdate { position })
            }
            VideoSignal::Seeked(position) => self.session.handle(Event::Seeked { position }),
        }
    }

    /// Poll the page address. A change re-resolves the element and the
    /// active item; the first observation only records the address.
    pub fn on_address_poll(&mut self, page: &dyn Page) -> Vec<Effect> {
        let address = page.location();
        if self.last_address.as_deref() == Some(address.as_str()) {
            return Vec::new();
        }
        let first = self.last_address.replace(address).is_none();
        if first {
            return Vec::new();
        }
        tracing::debug!("Page address changed");
        let mut fx = self.on_scan(page);
        fx.extend(self.detect_item(page));
        fx
    }

    /// Run the detector chain; a new answer switches the active item.
    pub fn detect_item(&mut self, page: &dyn Page) -> Vec<Effect> {
        match self.chain.detect(page) {
            Some(found) => self.session.handle(Event::ItemChanged(found.item)),
            None => Vec::new(),
        }
    }

    /// The viewer pressed the enable toggle.
    pub fn toggle(&mut self) -> Vec<Effect> {
        self.session.handle(Event::ToggleEnabled)
    }

    pub fn teardown(&mut self) -> Vec<Effect> {
        self.tracker = AttachmentTracker::new();
        self.last_address = None;
        self.sniffer.clear();
        self.session.teardown()
    }

    fn apply_attachment(&mut self, page: &dyn Page, change: Option<Event>) -> Vec<Effect> {
        let Some(event) = change else {
            return Vec::new();
        };
        let attached = matches!(event, Event::VideoAttached(_));
        let mut fx = self.session.handle(event);
        if attached {
            fx.extend(self.detect_item(page));
        }
        fx
    }
}

impl RequestObserver for Monitor {
    fn on_outgoing_request(&self, url: &str) {
        self.sniffer.on_outgoing_request(url);
    }
}

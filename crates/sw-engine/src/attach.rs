//! Tracking which playback element the session is bound to.
//!
//! Client-side navigation destroys and recreates the player, so the tracker
//! re-resolves the element on every structural page change and on a periodic
//! fallback scan.

use crate::detect::Page;
use crate::event::{Event, VideoId};

#[derive(Debug, Default)]
pub struct AttachmentTracker {
    current: Option<VideoId>,
}

impl AttachmentTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<VideoId> {
        self.current
    }

    /// React to a structural page change. `added` lists playback elements
    /// inserted by the change; the first one takes over.
    pub fn on_mutation(&mut self, page: &dyn Page, added: &[VideoId]) -> Option<Event> {
        if let Some(&video) = added.first() {
            return self.attach(video);
        }
        match self.current {
            Some(video) if !page.has_video(video) => self.rescan(page),
            _ => None,
        }
    }

    /// Periodic fallback for changes the mutation feed missed.
    pub fn scan(&mut self, page: &dyn Page) -> Option<Event> {
        match self.current {
            Some(video) if page.has_video(video) => None,
            _ => self.rescan(page),
        }
    }

    fn rescan(&mut self, page: &dyn Page) -> Option<Event> {
        match page.find_video() {
            Some(video) => self.attach(video),
            None => self.current.take().map(Event::VideoDetached),
        }
    }

    fn attach(&mut self, video: VideoId) -> Option<Event> {
        if self.current == Some(video) {
            return None;
        }
        self.current = Some(video);
        Some(Event::VideoAttached(video))
    }
}

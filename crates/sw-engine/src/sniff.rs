//! Item ids observed in the page's outgoing requests.
//!
//! The host's web client keeps talking to its server about the item being
//! played (playback reporting, image and stream URLs). The last item id seen
//! in such a request is the detector of last resort.

use std::sync::{Arc, LazyLock};

use parking_lot::Mutex;
use regex::Regex;
use sw_core::ItemId;

const UUID: &str = r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}|[0-9a-f]{32}";

static ITEMS_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)/Items/({UUID})(?:[/?#&]|$)")).expect("static regex")
});

static ID_PARAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)[?&](?:ItemId|id)=({UUID})(?:[&#]|$)")).expect("static regex")
});

/// Extract an item id from a request URL.
///
/// Matches an id path segment after `/Items/` first, then an `id`/`ItemId`
/// query parameter. URLs under `/Users/` are ignored unless they also
/// address `/Items/`, since those carry user ids in the same format.
pub fn item_id_from_url(url: &str) -> Option<ItemId> {
    let lower = url.to_ascii_lowercase();
    if lower.contains("/users/") && !lower.contains("/items/") {
        return None;
    }
    ITEMS_PATH
        .captures(url)
        .or_else(|| ID_PARAM.captures(url))
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Receives every outgoing request URL the host page issues.
pub trait RequestObserver: Send + Sync {
    fn on_outgoing_request(&self, url: &str);
}

/// Remembers the most recent item id seen in outgoing requests.
///
/// Cheap to clone; clones share the same slot, so the host's request hook
/// and the detector chain can each hold one.
#[derive(Debug, Clone, Default)]
pub struct RequestSniffer {
    last: Arc<Mutex<Option<ItemId>>>,
}

impl RequestSniffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_seen(&self) -> Option<ItemId> {
        *self.last.lock()
    }

    pub fn clear(&self) {
        *self.last.lock() = None;
    }
}

impl RequestObserver for RequestSniffer {
    fn on_outgoing_request(&self, url: &str) {
        if let Some(id) = item_id_from_url(url) {
            let mut last = self.last.lock();
            if *last != Some(id) {
                tracing::trace!(item = %id, "Sniffed item id from request");
                *last = Some(id);
            }
        }
    }
}

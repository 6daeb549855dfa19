//! Active-item detection.
//!
//! No single page signal reliably says what is playing, so a
//! [`DetectorChain`] asks several sources in priority order and takes the
//! first answer. A source that fails is logged and skipped.

use sw_core::ItemId;

use crate::event::VideoId;
use crate::sniff::RequestSniffer;

#[derive(Debug, thiserror::Error)]
pub enum DetectError {
    /// The host accessor itself failed (missing object, script error, ...).
    #[error("page accessor failed: {0}")]
    Page(String),

    #[error("malformed item id {value:?}")]
    MalformedId { value: String },
}

/// What the engine can observe about the host page.
pub trait Page {
    /// Item id reported by the host's playback manager.
    fn playback_manager_item(&self) -> Result<Option<String>, DetectError>;

    /// Item id from the playback manager's internal, undocumented state.
    fn internal_playback_manager_item(&self) -> Result<Option<String>, DetectError> {
        Ok(None)
    }

    /// Current page address, including query string and fragment.
    fn location(&self) -> String;

    /// Locate a playback element on the page.
    fn find_video(&self) -> Option<VideoId>;

    /// Whether `video` is still part of the page.
    fn has_video(&self, video: VideoId) -> bool;
}

/// One source of the active item id.
pub trait Detector: Send + Sync {
    fn name(&self) -> &'static str;
    fn detect(&self, page: &dyn Page) -> Result<Option<ItemId>, DetectError>;
}

fn parse_item(value: &str) -> Result<ItemId, DetectError> {
    value.parse().map_err(|_| DetectError::MalformedId {
        value: value.to_string(),
    })
}

pub struct PlaybackManagerDetector;

impl Detector for PlaybackManagerDetector {
    fn name(&self) -> &'static str {
        "playback-manager"
    }

    fn detect(&self, page: &dyn Page) -> Result<Option<ItemId>, DetectError> {
        page.playback_manager_item()?
            .filter(|v| !v.is_empty())
            .map(|v| parse_item(&v))
            .transpose()
    }
}

pub struct InternalPlaybackManagerDetector;

impl Detector for InternalPlaybackManagerDetector {
    fn name(&self) -> &'static str {
        "internal-playback-manager"
    }

    fn detect(&self, page: &dyn Page) -> Result<Option<ItemId>, DetectError> {
        page.internal_playback_manager_item()?
            .filter(|v| !v.is_empty())
            .map(|v| parse_item(&v))
            .transpose()
    }
}

/// Reads `id`, `videoId` or `itemId` from the address query string, then
/// from the fragment (client-side routes keep their parameters there).
pub struct AddressDetector;

const ADDRESS_PARAMS: [&str; 3] = ["id", "videoid", "itemid"];

fn query_params(part: &str) -> impl Iterator<Item = (&str, &str)> {
    part.split('&')
        .filter_map(|pair| pair.split_once('='))
        .filter(|(_, v)| !v.is_empty())
}

/// Item id carried in a page address, if any.
pub fn item_id_from_address(location: &str) -> Option<ItemId> {
    let (before_fragment, fragment) = match location.split_once('#') {
        Some((b, f)) => (b, Some(f)),
        None => (location, None),
    };
    let query = before_fragment.split_once('?').map(|(_, q)| q);
    let fragment_query = fragment.map(|f| f.split_once('?').map_or(f, |(_, q)| q));

    [query, fragment_query].into_iter().flatten().find_map(|part| {
        ADDRESS_PARAMS.iter().find_map(|name| {
            query_params(part)
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .and_then(|(_, v)| v.parse().ok())
        })
    })
}

impl Detector for AddressDetector {
    fn name(&self) -> &'static str {
        "address"
    }

    fn detect(&self, page: &dyn Page) -> Result<Option<ItemId>, DetectError> {
        Ok(item_id_from_address(&page.location()))
    }
}

/// The most recent item id seen in an outgoing request.
pub struct SniffedRequestDetector {
    sniffer: RequestSniffer,
}

impl SniffedRequestDetector {
    pub fn new(sniffer: RequestSniffer) -> Self {
        Self { sniffer }
    }
}

impl Detector for SniffedRequestDetector {
    fn name(&self) -> &'static str {
        "network-sniff"
    }

    fn detect(&self, _page: &dyn Page) -> Result<Option<ItemId>, DetectError> {
        Ok(self.sniffer.last_seen())
    }
}

/// Result of a successful detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Detection {
    pub item: ItemId,
    pub detector: &'static str,
}

/// Ordered list of detectors; first non-empty answer wins.
pub struct DetectorChain {
    detectors: Vec<Box<dyn Detector>>,
}

impl DetectorChain {
    pub fn new(detectors: Vec<Box<dyn Detector>>) -> Self {
        Self { detectors }
    }

    /// Playback manager, its internal variant, page address, sniffed
    /// requests.
    pub fn standard(sniffer: RequestSniffer) -> Self {
        Self::new(vec![
            Box::new(PlaybackManagerDetector),
            Box::new(InternalPlaybackManagerDetector),
            Box::new(AddressDetector),
            Box::new(SniffedRequestDetector::new(sniffer)),
        ])
    }

    pub fn detect(&self, page: &dyn Page) -> Option<Detection> {
        for detector in &self.detectors {
            match detector.detect(page) {
                Ok(Some(item)) => {
                    tracing::debug!(detector = detector.name(), item = %item, "Detected active item");
                    return Some(Detection {
                        item,
                        detector: detector.name(),
                    });
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::debug!(detector = detector.name(), error = %e, "Detector failed");
                }
            }
        }
        None
    }
}

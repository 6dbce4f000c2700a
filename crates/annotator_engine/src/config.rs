use std::time::Duration;

use annotator_core::RoutePattern;

use crate::FetchSettings;

pub const DEFAULT_API_BASE: &str = "https://scfs-api.hackjc.org/api/issues";

/// Minimal assumptions about the host page's markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostContract {
    pub routes: RoutePattern,
    /// Tag of the structural grouping that encloses one candidate link.
    pub grouping_tag: String,
    /// `id` of the injected single-target banner.
    pub banner_id: String,
}

impl Default for HostContract {
    fn default() -> Self {
        Self {
            routes: RoutePattern::default(),
            grouping_tag: "section".to_string(),
            banner_id: "scfs-banner".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OverlayConfig {
    pub api_base: String,
    pub fetch: FetchSettings,
    /// Pause between reaching `done == total` and the settled decoration.
    pub settle_delay: Duration,
    /// Upper bound on how long one element waits for its score. `None`
    /// leaves it to the transport.
    pub settle_timeout: Option<Duration>,
    pub banner_height_px: u32,
    pub contract: HostContract,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            fetch: FetchSettings::default(),
            settle_delay: Duration::from_millis(800),
            settle_timeout: Some(Duration::from_secs(45)),
            banner_height_px: 56,
            contract: HostContract::default(),
        }
    }
}

use std::time::Duration;

use serde::Serialize;
use telelink_frame::PayloadLayout;
use telelink_schema::MapperConfig;

/// Default evaluation cadence for link health.
pub const DEFAULT_HEALTH_INTERVAL: Duration = Duration::from_millis(500);
/// Default recency window: no valid frame for this long reads as STALE.
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_millis(1500);

/// Thresholds for the link health classifier.
///
/// These are a tuning policy for the physical link, not a wire contract.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthConfig {
    /// How often link health is re-evaluated. Default: 500 ms.
    pub interval: Duration,
    /// Time without a valid frame before the link reads STALE. Default: 1.5 s.
    pub stale_after: Duration,
    /// Number of past evaluations the failure rate is computed over. Default: 4.
    pub window_ticks: usize,
    /// Minimum validation failures in the window before BAD is possible. Default: 3.
    pub min_failures: u64,
    /// Failures as a share of validation outcomes at or above which the link
    /// reads BAD. Default: 0.5.
    pub bad_ratio: f64,
    /// Bytes skipped while hunting for a start marker, over the window,
    /// before noise alone can read BAD. Noise must also make up at least
    /// `bad_ratio` of the bytes seen (noise plus valid frames). Default: 256.
    pub min_noise_bytes: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_HEALTH_INTERVAL,
            stale_after: DEFAULT_STALE_AFTER,
            window_ticks: 4,
            min_failures: 3,
            bad_ratio: 0.5,
            min_noise_bytes: 256,
        }
    }
}

/// Labels attached to every published record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track: Option<String>,
}

impl SessionMeta {
    pub fn is_empty(&self) -> bool {
        self.driver.is_none() && self.track.is_none()
    }
}

/// Configuration for one reception session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Payload layout the transmitters use. Default: NEW.
    pub layout: PayloadLayout,
    pub mapper: MapperConfig,
    pub health: HealthConfig,
    /// Whether samples from unknown channels reach sinks. They are cached
    /// either way. Default: true.
    pub publish_unknown: bool,
    /// Force the TEST badge for bench runs with synthetic data.
    pub diagnostic: bool,
    pub meta: SessionMeta,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            layout: PayloadLayout::default(),
            mapper: MapperConfig::default(),
            health: HealthConfig::default(),
            publish_unknown: true,
            diagnostic: false,
            meta: SessionMeta::default(),
        }
    }
}

impl SessionConfig {
    pub fn with_layout(mut self, layout: PayloadLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_health(mut self, health: HealthConfig) -> Self {
        self.health = health;
        self
    }

    pub fn with_meta(mut self, meta: SessionMeta) -> Self {
        self.meta = meta;
        self
    }

    pub fn diagnostic(mut self, diagnostic: bool) -> Self {
        self.diagnostic = diagnostic;
        self
    }
}

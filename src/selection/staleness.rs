/// Per-category freshness budgets.
///
/// Each source category reports on its own cadence, so each gets its own
/// maximum age. `now` is always supplied by the caller.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use crate::model::SourceCategory;

/// Maximum acceptable observation age per source category.
#[derive(Debug, Clone, PartialEq)]
pub struct StalenessPolicy {
    pub sensor: Duration,
    pub satellite_model: Duration,
    pub manual_sample: Duration,
}

impl Default for StalenessPolicy {
    fn default() -> Self {
        Self {
            sensor: Duration::hours(4),
            satellite_model: Duration::hours(12),
            // Earlier deployments used 12h; 24h pending product-owner confirmation.
            manual_sample: Duration::hours(24),
        }
    }
}

impl StalenessPolicy {
    pub fn threshold(&self, category: SourceCategory) -> Duration {
        match category {
            SourceCategory::Sensor => self.sensor,
            SourceCategory::SatelliteModel => self.satellite_model,
            SourceCategory::ManualSample => self.manual_sample,
        }
    }

    /// True when `now - observed_at` strictly exceeds the category threshold.
    ///
    /// Timestamps at or before the Unix epoch (the normalizer's marker for an
    /// unparseable date) are always stale. Future timestamps are not.
    pub fn is_stale(&self, category: SourceCategory, observed_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        if observed_at <= DateTime::<Utc>::default() {
            return true;
        }
        now - observed_at > self.threshold(category)
    }
}

/// Largest accepted threshold, in hours (one year).
pub const MAX_THRESHOLD_HOURS: i64 = 24 * 365;

/// `[staleness]` table of sync.toml, in whole hours.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StalenessConfig {
    pub sensor_hours: i64,
    pub satellite_model_hours: i64,
    pub manual_sample_hours: i64,
}

impl Default for StalenessConfig {
    fn default() -> Self {
        Self {
            sensor_hours: 4,
            satellite_model_hours: 12,
            manual_sample_hours: 24,
        }
    }
}

impl From<&StalenessConfig> for StalenessPolicy {
    fn from(config: &StalenessConfig) -> Self {
        StalenessPolicy {
            sensor: Duration::hours(config.sensor_hours),
            satellite_model: Duration::hours(config.satellite_model_hours),
            manual_sample: Duration::hours(config.manual_sample_hours),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

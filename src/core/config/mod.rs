use serde::{Deserialize, Serialize};

use crate::core::error::LightError;
use crate::core::phase::IntervalSampler;

pub const DEFAULT_MIN_INTERVAL_SECS: u64 = 4;
pub const DEFAULT_MAX_INTERVAL_SECS: u64 = 6;
/// Longest phase a light accepts (one day)
pub const MAX_INTERVAL_SECS: u64 = 24 * 60 * 60;

/// Timing of a traffic light.
///
/// Every phase lasts a whole number of seconds drawn uniformly from
/// `[min_interval_secs, max_interval_secs]`. A fixed `seed` makes the
/// sequence of durations reproducible.
///
/// The transition history keeps every entry unless `history_limit` is set,
/// in which case only the most recent `history_limit` transitions are kept.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightConfig {
    pub min_interval_secs: u64,
    pub max_interval_secs: u64,
    pub seed: Option<u64>,
    pub history_limit: Option<usize>,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            min_interval_secs: DEFAULT_MIN_INTERVAL_SECS,
            max_interval_secs: DEFAULT_MAX_INTERVAL_SECS,
            seed: None,
            history_limit: None,
        }
    }
}

impl LightConfig {
    /// Parse and validate a JSON config; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, LightError> {
        let config: LightConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = Some(limit);
        self
    }

    pub fn validate(&self) -> Result<(), LightError> {
        if self.min_interval_secs == 0 {
            return Err(LightError::InvalidConfig(
                "min_interval_secs must be at least 1".into(),
            ));
        }
        if self.min_interval_secs > self.max_interval_secs {
            return Err(LightError::InvalidConfig(format!(
                "min_interval_secs ({}) exceeds max_interval_secs ({})",
                self.min_interval_secs, self.max_interval_secs
            )));
        }
        if self.max_interval_secs > MAX_INTERVAL_SECS {
            return Err(LightError::InvalidConfig(format!(
                "max_interval_secs ({}) exceeds the limit of {}",
                self.max_interval_secs, MAX_INTERVAL_SECS
            )));
        }
        if self.history_limit == Some(0) {
            return Err(LightError::InvalidConfig(
                "history_limit must be at least 1".into(),
            ));
        }
        Ok(())
    }

    // Only called on a validated config.
    pub(crate) fn sampler(&self) -> IntervalSampler {
        IntervalSampler::new(self.min_interval_secs, self.max_interval_secs, self.seed)
    }
}

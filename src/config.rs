//! Sampler configuration surface.
//!
//! The persistence encoding and transport are external concerns; the core
//! consumes an already-decoded [`SamplerConfig`] and applies it through
//! `RepeatSampler::apply_config`.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Per-sampler configuration.
///
/// One recognized field. It is non-mandatory in the serialized form: a
/// config blob without it deserializes to the default and leaves the
/// sampler's interval untouched on apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Repeat interval in milliseconds. Must be positive.
    pub repeat_interval_ms: u32,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            repeat_interval_ms: crate::cycle::DEFAULT_READ_INTERVAL_MS,
        }
    }
}

impl SamplerConfig {
    /// Range-check the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.repeat_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed(
                "repeat_interval_ms must be positive",
            ));
        }
        Ok(())
    }
}

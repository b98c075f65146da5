//! # Engine Configuration
//!
//! Environment-loaded knobs for the service layer. Everything has a default
//! matching shop policy; a host overrides via `VOLTA_*` variables.
//!
//! | Variable                        | Default | Meaning                         |
//! |---------------------------------|---------|---------------------------------|
//! | `VOLTA_FREE_DELIVERY_MAX_KM`    | 3.0     | Free-delivery distance ceiling  |
//! | `VOLTA_DISPATCH_INTERVAL_SECS`  | 30      | Outbox dispatcher poll interval |
//! | `VOLTA_DISPATCH_BATCH_SIZE`     | 50      | Outbox rows drained per pass    |
//! | `VOLTA_NOTIFY_MAX_ATTEMPTS`     | 5       | Delivery attempts before failed |

use std::env;
use std::time::Duration;

use thiserror::Error;

use volta_core::pricing::PricingConfig;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: '{value}' ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Tunables for the service layer.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Pricing knobs threaded into volta-core.
    pub pricing: PricingConfig,
    /// How often the outbox dispatcher polls for pending notifications.
    pub dispatch_interval: Duration,
    /// How many outbox rows one dispatcher pass drains.
    pub dispatch_batch_size: i64,
    /// Delivery attempts before an outbox row flips to failed.
    pub notify_max_attempts: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            pricing: PricingConfig::default(),
            dispatch_interval: Duration::from_secs(30),
            dispatch_batch_size: 50,
            notify_max_attempts: 5,
        }
    }
}

impl EngineConfig {
    /// Loads configuration from the environment, falling back to defaults
    /// for unset variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = EngineConfig::default();

        if let Some(km) = parse_var::<f64>("VOLTA_FREE_DELIVERY_MAX_KM")? {
            if !(km > 0.0) {
                return Err(ConfigError::Invalid {
                    var: "VOLTA_FREE_DELIVERY_MAX_KM",
                    value: km.to_string(),
                    reason: "must be positive".to_string(),
                });
            }
            config.pricing.free_delivery_max_km = km;
        }

        if let Some(secs) = parse_var::<u64>("VOLTA_DISPATCH_INTERVAL_SECS")? {
            config.dispatch_interval = Duration::from_secs(secs.max(1));
        }

        if let Some(batch) = parse_var::<i64>("VOLTA_DISPATCH_BATCH_SIZE")? {
            config.dispatch_batch_size = batch.max(1);
        }

        if let Some(attempts) = parse_var::<i64>("VOLTA_NOTIFY_MAX_ATTEMPTS")? {
            config.notify_max_attempts = attempts.max(1);
        }

        Ok(config)
    }
}

/// Reads and parses an optional environment variable.
fn parse_var<T: std::str::FromStr>(var: &'static str) -> Result<Option<T>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(raw) => raw.parse::<T>().map(Some).map_err(|e| ConfigError::Invalid {
            var,
            value: raw.clone(),
            reason: e.to_string(),
        }),
        Err(_) => Ok(None),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.pricing.free_delivery_max_km, 3.0);
        assert_eq!(config.dispatch_interval, Duration::from_secs(30));
        assert_eq!(config.dispatch_batch_size, 50);
        assert_eq!(config.notify_max_attempts, 5);
    }
}

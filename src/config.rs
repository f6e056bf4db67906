//! Engine configuration
//!
//! `EngineConfig` holds the knobs of the settlement engine: the operator's home
//! currency, the retry budget for lock conflicts, and the auto-settle limits.
//! Values come from defaults, optionally overlaid by a TOML file, optionally
//! overlaid again by CLI flags. Out-of-range values fall back to the default
//! with a warning rather than failing start-up.
//!
//! # File Format
//!
//! ```toml
//! home_currency = "IRR"
//! max_attempts = 3
//! lock_timeout_ms = 500
//! retry_backoff_ms = 10
//! auto_settle_max_rounds = 3
//! suggestion_limit = 50
//! default_strategy = "best_rate"
//! ```

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::types::{Currency, Result, SettlementError, SettlementStrategy};

/// Settlement engine configuration
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Currency of received amounts, fees, payouts and profit
    pub home_currency: Currency,

    /// Attempts made by a mutating operation before surfacing `Conflict`
    pub max_attempts: u32,

    /// Longest wait for a remittance row lock within one attempt
    pub lock_timeout: Duration,

    /// Pause between attempts; doubled after every failed attempt
    pub retry_backoff: Duration,

    /// Suggestion passes an auto-settle run may make
    pub auto_settle_max_rounds: u32,

    /// Suggestions generated per auto-settle pass
    pub suggestion_limit: usize,

    /// Strategy used when a caller does not name one
    pub default_strategy: SettlementStrategy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            home_currency: Currency::from_static("IRR"),
            max_attempts: 3,
            lock_timeout: Duration::from_millis(500),
            retry_backoff: Duration::from_millis(10),
            auto_settle_max_rounds: 3,
            suggestion_limit: 50,
            default_strategy: SettlementStrategy::Fifo,
        }
    }
}

/// On-disk shape of the configuration; every field is optional
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct EngineConfigFile {
    home_currency: Option<Currency>,
    max_attempts: Option<u32>,
    lock_timeout_ms: Option<u64>,
    retry_backoff_ms: Option<u64>,
    auto_settle_max_rounds: Option<u32>,
    suggestion_limit: Option<usize>,
    default_strategy: Option<String>,
}

impl EngineConfig {
    /// Parse a TOML document, filling unspecified fields with defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: EngineConfigFile =
            toml::from_str(content).map_err(|e| SettlementError::ParseError {
                line: None,
                message: format!("invalid engine configuration: {}", e),
            })?;

        let mut config = Self::default();
        if let Some(currency) = file.home_currency {
            config.home_currency = currency;
        }
        if let Some(attempts) = file.max_attempts {
            config.max_attempts = attempts;
        }
        if let Some(ms) = file.lock_timeout_ms {
            config.lock_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = file.retry_backoff_ms {
            config.retry_backoff = Duration::from_millis(ms);
        }
        if let Some(rounds) = file.auto_settle_max_rounds {
            config.auto_settle_max_rounds = rounds;
        }
        if let Some(limit) = file.suggestion_limit {
            config.suggestion_limit = limit;
        }
        if let Some(strategy) = file.default_strategy {
            config.default_strategy = strategy.parse()?;
        }

        Ok(config.sanitized())
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| SettlementError::IoError {
            message: format!("Failed to read config '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    /// Replace unusable values with defaults, warning about each one
    pub fn sanitized(mut self) -> Self {
        let default = Self::default();

        if self.max_attempts == 0 {
            tracing::warn!(
                "Invalid max_attempts (0), using default ({})",
                default.max_attempts
            );
            self.max_attempts = default.max_attempts;
        }
        if self.lock_timeout.is_zero() {
            tracing::warn!(
                "Invalid lock_timeout (0ms), using default ({}ms)",
                default.lock_timeout.as_millis()
            );
            self.lock_timeout = default.lock_timeout;
        }
        if self.auto_settle_max_rounds == 0 {
            tracing::warn!(
                "Invalid auto_settle_max_rounds (0), using default ({})",
                default.auto_settle_max_rounds
            );
            self.auto_settle_max_rounds = default.auto_settle_max_rounds;
        }
        if self.suggestion_limit == 0 {
            tracing::warn!(
                "Invalid suggestion_limit (0), using default ({})",
                default.suggestion_limit
            );
            self.suggestion_limit = default.suggestion_limit;
        }

        self
    }

    pub fn with_home_currency(mut self, currency: Currency) -> Self {
        self.home_currency = currency;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn with_default_strategy(mut self, strategy: SettlementStrategy) -> Self {
        self.default_strategy = strategy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_empty_document_yields_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_full_document_overrides_every_field() {
        let config = EngineConfig::from_toml_str(
            r#"
            home_currency = "afn"
            max_attempts = 5
            lock_timeout_ms = 250
            retry_backoff_ms = 2
            auto_settle_max_rounds = 4
            suggestion_limit = 10
            default_strategy = "best_rate"
            "#,
        )
        .unwrap();

        assert_eq!(config.home_currency.as_str(), "AFN");
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.lock_timeout, Duration::from_millis(250));
        assert_eq!(config.retry_backoff, Duration::from_millis(2));
        assert_eq!(config.auto_settle_max_rounds, 4);
        assert_eq!(config.suggestion_limit, 10);
        assert_eq!(config.default_strategy, SettlementStrategy::BestRate);
    }

    #[rstest]
    #[case::zero_attempts("max_attempts = 0")]
    #[case::zero_timeout("lock_timeout_ms = 0")]
    #[case::zero_rounds("auto_settle_max_rounds = 0")]
    #[case::zero_limit("suggestion_limit = 0")]
    fn test_zero_values_fall_back_to_defaults(#[case] document: &str) {
        let config = EngineConfig::from_toml_str(document).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[rstest]
    #[case::unknown_field("retries = 3")]
    #[case::bad_currency("home_currency = \"DOLLARS\"")]
    #[case::bad_strategy("default_strategy = \"random\"")]
    fn test_invalid_documents_are_rejected(#[case] document: &str) {
        assert!(EngineConfig::from_toml_str(document).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let result = EngineConfig::load(Path::new("does-not-exist.toml"));
        assert!(matches!(result, Err(SettlementError::IoError { .. })));
    }
}

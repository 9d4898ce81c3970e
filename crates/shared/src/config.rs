//! Application configuration management.

use serde::Deserialize;

use crate::types::Precision;

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Valuation configuration.
    #[serde(default)]
    pub valuation: ValuationConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Valuation configuration.
///
/// The standard valuation purity for purchased gold is deliberately not
/// configurable; it lives in `karat-core` as a constant.
#[derive(Debug, Clone, Deserialize)]
pub struct ValuationConfig {
    /// Currency code printed next to amounts.
    #[serde(default = "default_currency_code")]
    pub currency_code: String,
    /// Decimal places kept on money and weights.
    #[serde(default)]
    pub precision: Precision,
}

impl Default for ValuationConfig {
    fn default() -> Self {
        Self {
            currency_code: default_currency_code(),
            precision: Precision::default(),
        }
    }
}

fn default_currency_code() -> String {
    "OMR".to_string()
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

fn default_log_filter() -> String {
    "karat=info".to_string()
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("KARAT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

use crate::error::ConfigError;
use chrono::{Days, NaiveDate};
use core_types::OrderType;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::time::Duration;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub fallback: FallbackConfig,
    #[serde(default)]
    pub monitor: MonitorSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.base_url.trim().is_empty() {
            return Err(ConfigError::ValidationError("api.base_url must not be empty".to_string()));
        }
        if self.api.timeout_secs == 0 {
            return Err(ConfigError::ValidationError("api.timeout_secs must be positive".to_string()));
        }
        self.monitor.validate()
    }
}

/// Connection settings for the broker gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    /// Usually supplied through `TRAILGUARD__API__KEY` rather than the file.
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub secret: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// The secondary source of daily bars used when the broker has no history.
#[derive(Debug, Clone, Deserialize)]
pub struct FallbackConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_fallback_url")]
    pub base_url: String,
    /// Appended to the broker code to form the fallback ticker (e.g. "2330" -> "2330.TW").
    #[serde(default = "default_symbol_suffix")]
    pub symbol_suffix: String,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_fallback_url(),
            symbol_suffix: default_symbol_suffix(),
        }
    }
}

/// Parameters of a monitoring session.
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorSettings {
    /// Pullback from the running high, in percent, that triggers the exit.
    #[serde(default = "default_trailing_stop_pct")]
    pub trailing_stop_pct: Decimal,
    #[serde(default)]
    pub order_type: OrderType,
    /// First trading day considered when looking up the historical high.
    /// Defaults to 90 days before the session starts.
    #[serde(default)]
    pub lookback_start: Option<NaiveDate>,
    /// Holdings that are never monitored (long-term positions).
    #[serde(default)]
    pub excluded_symbols: Vec<String>,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_retry_backoff_secs")]
    pub retry_backoff_secs: u64,
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
    /// Log exit orders instead of sending them.
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            trailing_stop_pct: default_trailing_stop_pct(),
            order_type: OrderType::default(),
            lookback_start: None,
            excluded_symbols: Vec::new(),
            poll_interval_secs: default_poll_interval_secs(),
            retry_backoff_secs: default_retry_backoff_secs(),
            log_capacity: default_log_capacity(),
            dry_run: false,
        }
    }
}

impl MonitorSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.trailing_stop_pct <= Decimal::ZERO || self.trailing_stop_pct >= dec!(100) {
            return Err(ConfigError::ValidationError(format!(
                "monitor.trailing_stop_pct must be between 0 and 100 (exclusive), got {}",
                self.trailing_stop_pct
            )));
        }
        if self.poll_interval_secs == 0 || self.retry_backoff_secs == 0 {
            return Err(ConfigError::ValidationError(
                "monitor intervals must be positive".to_string(),
            ));
        }
        if self.log_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "monitor.log_capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// The configured lookback start, or 90 days before `today`.
    pub fn lookback_start_or_default(&self, today: NaiveDate) -> NaiveDate {
        self.lookback_start
            .unwrap_or_else(|| today.checked_sub_days(Days::new(90)).unwrap_or(today))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_secs(self.retry_backoff_secs)
    }

    pub fn is_excluded(&self, symbol: &str) -> bool {
        self.excluded_symbols.iter().any(|s| s == symbol)
    }
}

/// Command-line overrides for [`MonitorSettings`].
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "clap", derive(clap::Args))]
pub struct MonitorOverrides {
    /// Pullback from the running high, in percent.
    #[cfg_attr(feature = "clap", arg(long))]
    pub trailing_stop_pct: Option<Decimal>,
    /// Exit order type: ROD, IOC or FOK.
    #[cfg_attr(feature = "clap", arg(long))]
    pub order_type: Option<OrderType>,
    /// First day of the historical-high lookback (YYYY-MM-DD).
    #[cfg_attr(feature = "clap", arg(long))]
    pub lookback_start: Option<NaiveDate>,
    /// Additional symbols to leave unmonitored, comma separated.
    #[cfg_attr(feature = "clap", arg(long = "exclude", value_delimiter = ','))]
    pub excluded_symbols: Vec<String>,
    /// Log exit orders instead of sending them.
    #[cfg_attr(feature = "clap", arg(long))]
    pub dry_run: bool,
}

impl MonitorOverrides {
    /// Applies the overrides and re-validates the result.
    pub fn apply(&self, settings: &mut MonitorSettings) -> Result<(), ConfigError> {
        if let Some(pct) = self.trailing_stop_pct {
            settings.trailing_stop_pct = pct;
        }
        if let Some(order_type) = self.order_type {
            settings.order_type = order_type;
        }
        if let Some(start) = self.lookback_start {
            settings.lookback_start = Some(start);
        }
        for symbol in &self.excluded_symbols {
            if !settings.is_excluded(symbol) {
                settings.excluded_symbols.push(symbol.clone());
            }
        }
        settings.dry_run |= self.dry_run;
        settings.validate()
    }
}

/// Controls the process-wide tracing output.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG` when set.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// When set, logs are also written to a daily rolling file in this directory.
    #[serde(default)]
    pub directory: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_fallback_url() -> String {
    "https://query1.finance.yahoo.com".to_string()
}

fn default_symbol_suffix() -> String {
    ".TW".to_string()
}

fn default_trailing_stop_pct() -> Decimal {
    dec!(15)
}

fn default_poll_interval_secs() -> u64 {
    3
}

fn default_retry_backoff_secs() -> u64 {
    5
}

fn default_log_capacity() -> usize {
    100
}

fn default_log_level() -> String {
    "info".to_string()
}

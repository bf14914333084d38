use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use error::ConfigError;
pub use settings::{
    ApiConfig, Config, FallbackConfig, LoggingConfig, MonitorOverrides, MonitorSettings,
};

/// Prefix of the environment variables that override file values,
/// e.g. `TRAILGUARD__API__SECRET`.
pub const ENV_PREFIX: &str = "TRAILGUARD";

/// Loads the application configuration from a TOML file.
///
/// Values from the file are layered under environment variables, so broker
/// credentials can come from the environment (or a `.env` file loaded by the
/// binary) instead of the file. The result is validated before it is returned.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("monitor.excluded_symbols")
                .try_parsing(true),
        )
        .build()?;

    // Attempt to deserialize the entire configuration into our `Config` struct
    let config = builder.try_deserialize::<Config>()?;
    config.validate()?;

    tracing::debug!(path = %path.display(), "Configuration loaded.");
    Ok(config)
}

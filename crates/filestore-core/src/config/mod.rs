//! Application configuration schemas.
//!
//! Configuration is merged from TOML files and the environment via the
//! `config` crate. Every field carries a serde default, so a missing file
//! still yields a runnable configuration.

pub mod app;
pub mod logging;
pub mod realtime;

use serde::{Deserialize, Serialize};

pub use self::app::{CorsConfig, ServerConfig};
pub use self::logging::LoggingConfig;
pub use self::realtime::RealtimeConfig;

use crate::error::AppError;
use crate::result::AppResult;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Real-time hub settings.
    #[serde(default)]
    pub realtime: RealtimeConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration for the given environment name.
    ///
    /// Merges `config/default.toml`, `config/{env}.toml` and environment
    /// variables prefixed with `FILESTORE__` (e.g. `FILESTORE__SERVER__PORT`).
    pub fn load(env: &str) -> AppResult<Self> {
        tracing::debug!(env, "Loading configuration");

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("FILESTORE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_toml(raw: &str) -> AppConfig {
        config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()
            .and_then(|c| c.try_deserialize())
            .expect("valid config")
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = from_toml("");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.realtime.queue_capacity, 256);
        assert!(config.realtime.announce_presence);
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_partial_section_overrides() {
        let config = from_toml(
            r#"
            [server]
            port = 9100

            [realtime]
            queue_capacity = 8
            announce_presence = false
            "#,
        );
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.bind_address(), "0.0.0.0:9100");
        assert_eq!(config.realtime.queue_capacity, 8);
        assert!(!config.realtime.announce_presence);
        assert_eq!(config.realtime.max_inbound_frame_bytes, 65_536);
        assert_eq!(config.realtime.close_flush_timeout_ms, 2_000);
        assert_eq!(config.realtime.write_timeout(), std::time::Duration::from_secs(10));
    }
}

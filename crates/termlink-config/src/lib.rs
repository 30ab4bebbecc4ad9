//! termlink configuration.
//!
//! TOML-based configuration with per-section defaults, environment
//! overrides, and validation. Every section uses `serde(default)` so a
//! partial file (or none at all) works out of the box.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use termlink_config::{config_to_json, load_config};
//!
//! let config = load_config(None).expect("failed to load config");
//! println!("{}", config_to_json(&config));
//! ```

pub mod env_overrides;
pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{
    LogLevel, LoggingConfig, RunnerConfig, ServerConfig, TerminalConfig, TermlinkConfig,
};

use std::path::Path;

use termlink_common::ConfigError;

/// Load, override and validate the configuration.
///
/// With `path` set the file must exist. Without it the platform default
/// path is used and created from the template when missing. Environment
/// overrides are applied before validation.
pub fn load_config(path: Option<&Path>) -> Result<TermlinkConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.to_path_buf()));
            }
            toml_loader::load_from_path(path)?
        }
        None => toml_loader::load_default()?,
    };

    env_overrides::apply_env_overrides(&mut config);
    validation::validate(&config)?;
    Ok(config)
}

/// Serialize a config to a pretty-printed JSON string.
pub fn config_to_json(config: &TermlinkConfig) -> String {
    serde_json::to_string_pretty(config)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize config: {e}\"}}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_to_json_contains_all_sections() {
        let json = config_to_json(&TermlinkConfig::default());
        assert!(json.contains("\"server\""));
        assert!(json.contains("\"terminal\""));
        assert!(json.contains("\"runner\""));
        assert!(json.contains("\"logging\""));
    }

    #[test]
    fn load_config_missing_explicit_path_is_not_found() {
        let err = load_config(Some(Path::new("/tmp/termlink_missing_config.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn load_config_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[runner]\nlog_capacity = 0\n").unwrap();

        let err = load_config(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
        assert!(err.to_string().contains("runner.log_capacity"));
    }

    #[test]
    fn load_config_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server]\nport = 18000\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.server.port, 18000);
        assert_eq!(config.runner.log_capacity, 400);
    }
}

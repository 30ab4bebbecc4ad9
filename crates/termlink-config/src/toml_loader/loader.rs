//! Read the config from a path or the platform default.

use std::path::Path;

use termlink_common::ConfigError;
use tracing::{info, warn};

use super::paths::{create_default_config, default_config_path};
use crate::schema::TermlinkConfig;
use crate::validation;

/// Load config from a specific TOML file.
///
/// Missing fields take their defaults. Validation problems are logged
/// here and enforced by [`crate::load_config`].
pub fn load_from_path(path: &Path) -> Result<TermlinkConfig, ConfigError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::ParseError(format!("failed to read {}: {e}", path.display())))?;

    let config: TermlinkConfig = toml::from_str(&content)
        .map_err(|e| ConfigError::ParseError(format!("failed to parse TOML: {e}")))?;

    if let Err(e) = validation::validate(&config) {
        warn!(path = %path.display(), error = %e, "config validation warning");
    }

    info!("loaded config from {}", path.display());
    Ok(config)
}

/// Load config from the platform default path, creating it when missing.
///
/// On Linux: `~/.config/termlink/config.toml`
/// On macOS: `~/Library/Application Support/termlink/config.toml`
pub fn load_default() -> Result<TermlinkConfig, ConfigError> {
    let path = default_config_path()?;

    if !path.exists() {
        info!("no config found at {}, creating default", path.display());
        create_default_config(&path)?;
        return Ok(TermlinkConfig::default());
    }

    load_from_path(&path)
}

//! Full configuration validation.
//!
//! Each section has its own validator; this orchestrator calls them all
//! and collects errors into a single `ConfigError`.

mod helpers;
mod sections;


use termlink_common::ConfigError;

use crate::schema::TermlinkConfig;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &TermlinkConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    sections::validate_server(&mut errors, config);
    sections::validate_terminal(&mut errors, config);
    sections::validate_runner(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}

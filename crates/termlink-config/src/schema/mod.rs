//! Configuration schema types.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod logging;
mod runner;
mod server;
mod terminal;

pub use logging::*;
pub use runner::*;
pub use server::*;
pub use terminal::*;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TermlinkConfig {
    pub server: ServerConfig,
    pub terminal: TerminalConfig,
    pub runner: RunnerConfig,
    pub logging: LoggingConfig,
}

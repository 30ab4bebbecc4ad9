//! PTY constants and error types.

// =============================================================================
// CONSTANTS
// =============================================================================

/// Terminal rows. Geometry is fixed for the life of a session.
pub const DEFAULT_ROWS: u16 = 24;

/// Terminal columns.
pub const DEFAULT_COLS: u16 = 80;

// =============================================================================
// ERRORS
// =============================================================================

/// Errors originating from PTY setup.
#[derive(Debug, thiserror::Error)]
pub enum PtyError {
    #[error("failed to open pty: {0}")]
    Open(String),

    #[error("failed to spawn {program}: {message}")]
    Spawn { program: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

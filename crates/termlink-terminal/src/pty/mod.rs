//! PTY sessions using the `portable-pty` crate.
//!
//! [`PtySession`] owns the controlling side of a pseudoterminal and the
//! child spawned on its subordinate side. Output is read through the
//! separate [`PtyReader`] so a dedicated thread can block on it while the
//! session is written to and stopped from elsewhere.

mod session;
mod types;

pub use session::*;
pub use types::*;

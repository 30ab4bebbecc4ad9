//! Pseudoterminal side of termlink.
//!
//! - [`pty`]: spawn a program inside a pty and read/write its bytes.
//! - [`filter`]: strip cursor-position queries from pty output.
//! - [`decode`]: incremental, permissive UTF-8 decoding of output chunks.
//! - [`pump`]: the read/filter/reply loop run on the reader thread.
//! - [`resolve`]: turn terminal config plus a requested cwd into a
//!   [`termlink_common::ProcessSpec`].

pub mod decode;
pub mod filter;
pub mod pty;
pub mod pump;
pub mod resolve;

pub use decode::Utf8Decoder;
pub use filter::{CursorQueryFilter, Filtered, CURSOR_POSITION_QUERY, CURSOR_POSITION_REPLY};
pub use pty::{PtyError, PtyReader, PtySession};
pub use pump::{pump_output, InputSink, PumpSummary};
pub use resolve::{resolve_command, ResolveContext, ResolveError};

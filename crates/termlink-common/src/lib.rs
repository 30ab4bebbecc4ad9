pub mod errors;
pub mod process;
pub mod sync;

pub use errors::{ConfigError, ProcessError, TermlinkError};
pub use process::{ChildControl, ExitRecord, ProcessHandle, ProcessSpec};

pub type Result<T> = std::result::Result<T, TermlinkError>;

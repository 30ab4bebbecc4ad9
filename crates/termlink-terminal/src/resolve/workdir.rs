use std::path::{Path, PathBuf};

use super::ResolveError;

/// Expand a leading `~` to `home`.
pub fn expand_user(raw: &str, home: Option<&Path>) -> PathBuf {
    match (raw, home) {
        ("~", Some(home)) => home.to_path_buf(),
        (raw, Some(home)) if raw.starts_with("~/") => home.join(&raw[2..]),
        (raw, _) => PathBuf::from(raw),
    }
}

/// Pick the session's working directory.
///
/// A requested directory must exist; relative requests are taken from home.
/// A configured directory that is missing is skipped with a warning.
pub fn resolve_workdir(
    requested: Option<&str>,
    configured: Option<&str>,
    home: Option<&Path>,
) -> Result<PathBuf, ResolveError> {
    if let Some(raw) = requested.map(str::trim).filter(|s| !s.is_empty()) {
        let mut path = expand_user(raw, home);
        if path.is_relative() {
            if let Some(home) = home {
                path = home.join(path);
            }
        }
        return if path.is_dir() {
            Ok(path)
        } else {
            Err(ResolveError::WorkdirNotFound(raw.to_string()))
        };
    }

    if let Some(raw) = configured.map(str::trim).filter(|s| !s.is_empty()) {
        let path = expand_user(raw, home);
        if path.is_dir() {
            return Ok(path);
        }
        tracing::warn!(path = %path.display(), "configured working directory missing, using home");
    }

    home.map(Path::to_path_buf).ok_or(ResolveError::NoHome)
}

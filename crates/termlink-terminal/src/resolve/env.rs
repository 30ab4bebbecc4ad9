use std::collections::HashMap;
use std::path::{Path, PathBuf};

const DEFAULT_TERM: &str = "xterm-256color";

/// Child environment for a resolved program.
///
/// Starts from `base`, defaults `TERM`, puts the program's directory at the
/// front of `PATH` (nvm installs are usually not on it), then applies
/// `extras`.
pub fn build_env(
    base: &HashMap<String, String>,
    program: &Path,
    extras: &HashMap<String, String>,
) -> HashMap<String, String> {
    let mut env = base.clone();
    env.entry("TERM".into()).or_insert_with(|| DEFAULT_TERM.into());

    if let Some(dir) = program.parent().filter(|d| !d.as_os_str().is_empty()) {
        let current: Vec<PathBuf> = env
            .get("PATH")
            .map(|p| std::env::split_paths(p).collect())
            .unwrap_or_default();
        if !current.iter().any(|p| p == dir) {
            let joined = std::env::join_paths(std::iter::once(dir.to_path_buf()).chain(current));
            match joined {
                Ok(path) => {
                    env.insert("PATH".into(), path.to_string_lossy().into_owned());
                }
                Err(e) => tracing::debug!(error = %e, "could not extend PATH"),
            }
        }
    }

    env.extend(extras.iter().map(|(k, v)| (k.clone(), v.clone())));
    env
}

use std::path::{Path, PathBuf};

/// Locate `program`.
///
/// Anything containing a path separator is checked as-is (after `~`
/// expansion). Bare names are looked up on `path_var`, then among nvm's
/// node installs under `home`, newest version first.
pub fn resolve_program(program: &str, path_var: Option<&str>, home: Option<&Path>) -> Option<PathBuf> {
    if program.contains('/') {
        let path = super::expand_user(program, home);
        return is_executable(&path).then_some(path);
    }

    if let Some(path_var) = path_var {
        let found = std::env::split_paths(path_var)
            .map(|dir| dir.join(program))
            .find(|candidate| is_executable(candidate));
        if found.is_some() {
            return found;
        }
    }

    let versions = home?.join(".nvm").join("versions").join("node");
    let entries = std::fs::read_dir(versions).ok()?;
    let candidates = entries
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let version = entry.file_name().into_string().ok()?;
            let bin = entry.path().join("bin").join(program);
            is_executable(&bin).then_some((version, bin))
        })
        .collect();
    pick_latest_nvm(candidates)
}

/// Choose the candidate with the highest `vMAJOR.MINOR.PATCH` version.
pub fn pick_latest_nvm(candidates: Vec<(String, PathBuf)>) -> Option<PathBuf> {
    candidates
        .into_iter()
        .max_by(|(a, _), (b, _)| version_key(a).cmp(&version_key(b)))
        .map(|(_, path)| path)
}

fn version_key(version: &str) -> Vec<u64> {
    version
        .trim_start_matches('v')
        .split('.')
        .map(|part| part.parse().unwrap_or(0))
        .collect()
}

fn is_executable(path: &Path) -> bool {
    let Ok(meta) = std::fs::metadata(path) else {
        return false;
    };
    if !meta.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        meta.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}

//! Tests for command resolution.

use super::*;
use std::fs;
use std::path::Path;

fn make_executable(path: &Path) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, "#!/bin/sh\n").unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
    }
}

fn context(home: &Path, path_var: &str) -> ResolveContext {
    let mut base_env = HashMap::new();
    base_env.insert("PATH".to_string(), path_var.to_string());
    base_env.insert("HOME".to_string(), home.display().to_string());
    ResolveContext {
        home: Some(home.to_path_buf()),
        base_env,
    }
}

// ---------------------------------------------------------------------------
// workdir
// ---------------------------------------------------------------------------

#[test]
fn expand_user_variants() {
    let home = Path::new("/home/dev");
    assert_eq!(expand_user("~", Some(home)), PathBuf::from("/home/dev"));
    assert_eq!(expand_user("~/src", Some(home)), PathBuf::from("/home/dev/src"));
    assert_eq!(expand_user("/opt", Some(home)), PathBuf::from("/opt"));
    assert_eq!(expand_user("~/src", None), PathBuf::from("~/src"));
}

#[test]
fn requested_workdir_must_exist() {
    let home = tempfile::tempdir().unwrap();
    let err = resolve_workdir(Some("/definitely/not/here"), None, Some(home.path())).unwrap_err();
    assert_eq!(err, ResolveError::WorkdirNotFound("/definitely/not/here".into()));
    assert_eq!(err.to_string(), "Working directory not found: /definitely/not/here");
}

#[test]
fn requested_workdir_relative_to_home() {
    let home = tempfile::tempdir().unwrap();
    fs::create_dir(home.path().join("app")).unwrap();
    let dir = resolve_workdir(Some("app"), None, Some(home.path())).unwrap();
    assert_eq!(dir, home.path().join("app"));
}

#[test]
fn requested_file_is_not_a_workdir() {
    let home = tempfile::tempdir().unwrap();
    let file = home.path().join("notes.txt");
    fs::write(&file, "x").unwrap();
    let raw = file.display().to_string();
    assert!(resolve_workdir(Some(&raw), None, Some(home.path())).is_err());
}

#[test]
fn missing_configured_workdir_falls_back_to_home() {
    let home = tempfile::tempdir().unwrap();
    let dir = resolve_workdir(None, Some("/no/such/dir"), Some(home.path())).unwrap();
    assert_eq!(dir, home.path());
}

#[test]
fn no_home_no_workdir() {
    assert_eq!(resolve_workdir(None, None, None), Err(ResolveError::NoHome));
}

// ---------------------------------------------------------------------------
// program
// ---------------------------------------------------------------------------

#[test]
fn pick_latest_nvm_uses_numeric_order() {
    let candidates = vec![
        ("v9.11.2".to_string(), PathBuf::from("/nvm/v9/bin/codex")),
        ("v20.3.0".to_string(), PathBuf::from("/nvm/v20.3/bin/codex")),
        ("v20.11.1".to_string(), PathBuf::from("/nvm/v20.11/bin/codex")),
    ];
    assert_eq!(
        pick_latest_nvm(candidates),
        Some(PathBuf::from("/nvm/v20.11/bin/codex"))
    );
    assert_eq!(pick_latest_nvm(Vec::new()), None);
}

#[cfg(unix)]
#[test]
fn resolve_program_search_order() {
    let home = tempfile::tempdir().unwrap();
    let bin = home.path().join("bin");
    let on_path = bin.join("tool");
    make_executable(&on_path);
    make_executable(&home.path().join(".nvm/versions/node/v18.0.0/bin/codex"));
    make_executable(&home.path().join(".nvm/versions/node/v22.1.0/bin/codex"));

    let path_var = bin.display().to_string();
    assert_eq!(
        resolve_program("tool", Some(&path_var), Some(home.path())),
        Some(on_path.clone())
    );
    assert_eq!(
        resolve_program("codex", Some(&path_var), Some(home.path())),
        Some(home.path().join(".nvm/versions/node/v22.1.0/bin/codex"))
    );
    assert_eq!(
        resolve_program(&on_path.display().to_string(), None, None),
        Some(on_path)
    );
    assert_eq!(resolve_program("missing", Some(&path_var), Some(home.path())), None);
}

#[cfg(unix)]
#[test]
fn non_executable_file_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("plain"), "data").unwrap();
    let path_var = dir.path().display().to_string();
    assert_eq!(resolve_program("plain", Some(&path_var), None), None);
}

// ---------------------------------------------------------------------------
// env
// ---------------------------------------------------------------------------

#[test]
fn build_env_sets_term_and_path() {
    let mut base = HashMap::new();
    base.insert("PATH".to_string(), "/usr/bin".to_string());
    let extras = HashMap::from([("FOO".to_string(), "bar".to_string())]);

    let env = build_env(&base, Path::new("/opt/node/bin/codex"), &extras);
    assert_eq!(env["TERM"], "xterm-256color");
    assert_eq!(env["PATH"], "/opt/node/bin:/usr/bin");
    assert_eq!(env["FOO"], "bar");
}

#[test]
fn build_env_keeps_existing_term_and_path_entry() {
    let mut base = HashMap::new();
    base.insert("PATH".to_string(), "/usr/bin:/bin".to_string());
    base.insert("TERM".to_string(), "screen".to_string());

    let env = build_env(&base, Path::new("/usr/bin/bash"), &HashMap::new());
    assert_eq!(env["TERM"], "screen");
    assert_eq!(env["PATH"], "/usr/bin:/bin");
}

// ---------------------------------------------------------------------------
// resolve_command
// ---------------------------------------------------------------------------

#[cfg(unix)]
#[test]
fn resolves_program_args_and_workdir() {
    let home = tempfile::tempdir().unwrap();
    let tool = home.path().join("bin").join("codex");
    make_executable(&tool);
    let ctx = context(home.path(), &home.path().join("bin").display().to_string());

    let config = TerminalConfig {
        args: vec!["--full-auto".into()],
        env: HashMap::from([("CODEX_HOME".to_string(), "/tmp/codex".to_string())]),
        ..TerminalConfig::default()
    };
    let spec = resolve_command_with(&config, None, &ctx).unwrap();
    assert_eq!(spec.program, tool.display().to_string());
    assert_eq!(spec.args, vec!["--full-auto"]);
    assert_eq!(spec.cwd, home.path());
    assert_eq!(spec.env["CODEX_HOME"], "/tmp/codex");
    assert_eq!(spec.env["TERM"], "xterm-256color");
}

#[cfg(unix)]
#[test]
fn command_line_wins_over_program() {
    let home = tempfile::tempdir().unwrap();
    make_executable(&home.path().join("bin").join("bash"));
    let ctx = context(home.path(), &home.path().join("bin").display().to_string());

    let config = TerminalConfig {
        command: Some("bash -lc 'echo hi'".into()),
        ..TerminalConfig::default()
    };
    let spec = resolve_command_with(&config, None, &ctx).unwrap();
    assert!(spec.program.ends_with("/bin/bash"));
    assert_eq!(spec.args, vec!["-lc", "echo hi"]);
}

#[test]
fn missing_program_without_fallback_errors() {
    let home = tempfile::tempdir().unwrap();
    let ctx = context(home.path(), "/nonexistent-bin");
    let err = resolve_command_with(&TerminalConfig::default(), None, &ctx).unwrap_err();
    assert_eq!(
        err,
        ResolveError::ProgramNotFound {
            program: "codex".into()
        }
    );
    assert!(err.to_string().contains("TERMLINK_SHELL_FALLBACK"));
}

#[test]
fn missing_program_with_fallback_uses_shell() {
    let home = tempfile::tempdir().unwrap();
    let ctx = context(home.path(), "/nonexistent-bin");
    let config = TerminalConfig {
        args: vec!["--ignored".into()],
        allow_shell_fallback: true,
        ..TerminalConfig::default()
    };
    let spec = resolve_command_with(&config, None, &ctx).unwrap();
    assert_eq!(spec.program, "/bin/bash");
    assert!(spec.args.is_empty());
}

#[test]
fn bad_cwd_reported_before_program_lookup() {
    let home = tempfile::tempdir().unwrap();
    let ctx = context(home.path(), "/nonexistent-bin");
    let err = resolve_command_with(&TerminalConfig::default(), Some("/nope/nope"), &ctx)
        .unwrap_err();
    assert!(matches!(err, ResolveError::WorkdirNotFound(_)));
}

#[test]
fn empty_command_line_is_invalid() {
    let home = tempfile::tempdir().unwrap();
    let ctx = context(home.path(), "/nonexistent-bin");
    let config = TerminalConfig {
        command: Some("   ".into()),
        ..TerminalConfig::default()
    };
    let err = resolve_command_with(&config, None, &ctx).unwrap_err();
    assert!(matches!(err, ResolveError::InvalidCommand(_)));
}

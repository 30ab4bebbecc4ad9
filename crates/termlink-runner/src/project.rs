//! Project kind detection and directory scanning.

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Deepest scan allowed regardless of the requested depth.
pub const MAX_SCAN_DEPTH: usize = 8;

/// Directory names never descended into while scanning.
const SKIP_DIRS: &[&str] = &[
    ".git",
    ".idea",
    ".vscode",
    ".gradle",
    "node_modules",
    "build",
    "dist",
    ".venv",
    "venv",
    "__pycache__",
    ".cache",
    ".android",
    ".dart_tool",
    ".flutter-plugins",
    ".flutter-plugins-dependencies",
    "Pods",
];

static APPLICATION_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"applicationId\s*[= ]\s*["']([^"']+)["']"#).expect("static regex pattern must compile")
});
static NAMESPACE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"namespace\s*[= ]\s*["']([^"']+)["']"#).expect("static regex pattern must compile")
});
static MANIFEST_PACKAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<manifest[^>]+package=["']([^"']+)["']"#).expect("static regex pattern must compile")
});

// ---------------------------------------------------------------------------
// ProjectKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectKind {
    ReactNative,
    Flutter,
}

impl ProjectKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProjectKind::ReactNative => "react-native",
            ProjectKind::Flutter => "flutter",
        }
    }
}

impl fmt::Display for ProjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectKind {
    type Err = String;

    /// Accepts `react-native`, `react_native`, `reactnative`, `rn` and
    /// `flutter`, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "react-native" | "reactnative" | "rn" => Ok(ProjectKind::ReactNative),
            "flutter" => Ok(ProjectKind::Flutter),
            _ => Err(format!("unsupported project type: {s}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

/// Detect the project rooted at `dir`.
///
/// `pubspec.yaml` means Flutter; a `package.json` listing `react-native`
/// in `dependencies` or `devDependencies` means React Native.
pub fn detect_project_kind(dir: &Path) -> Option<ProjectKind> {
    if dir.join("pubspec.yaml").is_file() {
        return Some(ProjectKind::Flutter);
    }
    let content = std::fs::read_to_string(dir.join("package.json")).ok()?;
    let manifest: serde_json::Value = serde_json::from_str(&content).ok()?;
    let has_rn = ["dependencies", "devDependencies"]
        .iter()
        .any(|section| manifest.get(section).and_then(|deps| deps.get("react-native")).is_some());
    has_rn.then_some(ProjectKind::ReactNative)
}

/// Android application id of the project at `dir`, if one can be found.
pub fn detect_android_package(dir: &Path) -> Option<String> {
    let app = dir.join("android").join("app");
    for gradle in ["build.gradle", "build.gradle.kts"] {
        let Ok(content) = std::fs::read_to_string(app.join(gradle)) else {
            continue;
        };
        for pattern in [&APPLICATION_ID, &NAMESPACE] {
            if let Some(found) = capture(pattern, &content) {
                return Some(found);
            }
        }
    }

    let manifest = app.join("src").join("main").join("AndroidManifest.xml");
    let content = std::fs::read_to_string(manifest).ok()?;
    capture(&MANIFEST_PACKAGE, &content)
}

fn capture(pattern: &Regex, haystack: &str) -> Option<String> {
    pattern
        .captures(haystack)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

// ---------------------------------------------------------------------------
// Scanning
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectedProject {
    pub path: PathBuf,
    pub project_type: ProjectKind,
    pub android_package: Option<String>,
}

impl DetectedProject {
    pub fn detect(dir: &Path) -> Option<Self> {
        let project_type = detect_project_kind(dir)?;
        Some(Self {
            path: dir.to_path_buf(),
            project_type,
            android_package: detect_android_package(dir),
        })
    }
}

/// Breadth-first search for projects under `base`.
///
/// Depth is clamped to [`MAX_SCAN_DEPTH`]. Detected projects are not
/// descended into; symlinks and [`SKIP_DIRS`] are never followed.
pub fn scan_projects(base: &Path, max_depth: usize) -> Vec<DetectedProject> {
    let max_depth = max_depth.min(MAX_SCAN_DEPTH);
    let mut results = Vec::new();
    let mut seen = HashSet::new();
    let mut queue = VecDeque::from([(base.to_path_buf(), 0usize)]);

    while let Some((dir, depth)) = queue.pop_front() {
        if !seen.insert(dir.clone()) || !dir.is_dir() {
            continue;
        }

        if let Some(project) = DetectedProject::detect(&dir) {
            results.push(project);
            continue;
        }
        if depth >= max_depth {
            continue;
        }

        let Ok(entries) = std::fs::read_dir(&dir) else {
            tracing::debug!(dir = %dir.display(), "unreadable directory skipped");
            continue;
        };
        let mut children: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_ok_and(|t| t.is_dir()))
            .filter(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| !SKIP_DIRS.contains(&name))
            })
            .map(|entry| entry.path())
            .collect();
        children.sort();
        queue.extend(children.into_iter().map(|child| (child, depth + 1)));
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn rn_project(dir: &Path) {
        fs::create_dir_all(dir).unwrap();
        fs::write(
            dir.join("package.json"),
            r#"{"name":"app","dependencies":{"react":"18.2.0","react-native":"0.74.0"}}"#,
        )
        .unwrap();
    }

    fn flutter_project(dir: &Path) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join("pubspec.yaml"), "name: demo\n").unwrap();
    }

    #[test]
    fn kind_normalization() {
        for raw in ["react-native", "React_Native", "reactnative", "RN", " rn "] {
            assert_eq!(raw.parse::<ProjectKind>(), Ok(ProjectKind::ReactNative), "{raw}");
        }
        assert_eq!("Flutter".parse::<ProjectKind>(), Ok(ProjectKind::Flutter));
        assert!("ionic".parse::<ProjectKind>().is_err());
        assert_eq!(ProjectKind::ReactNative.to_string(), "react-native");
    }

    #[test]
    fn detects_flutter_and_rn() {
        let root = tempfile::tempdir().unwrap();
        let rn = root.path().join("rn");
        let fl = root.path().join("fl");
        rn_project(&rn);
        flutter_project(&fl);

        assert_eq!(detect_project_kind(&rn), Some(ProjectKind::ReactNative));
        assert_eq!(detect_project_kind(&fl), Some(ProjectKind::Flutter));
        assert_eq!(detect_project_kind(root.path()), None);
    }

    #[test]
    fn rn_in_dev_dependencies() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("package.json"),
            r#"{"devDependencies":{"react-native":"*"}}"#,
        )
        .unwrap();
        assert_eq!(detect_project_kind(dir.path()), Some(ProjectKind::ReactNative));
    }

    #[test]
    fn plain_node_project_is_not_detected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("package.json"), r#"{"dependencies":{"express":"4"}}"#).unwrap();
        assert_eq!(detect_project_kind(dir.path()), None);

        fs::write(dir.path().join("package.json"), "not json").unwrap();
        assert_eq!(detect_project_kind(dir.path()), None);
    }

    #[test]
    fn android_package_sources() {
        let dir = tempfile::tempdir().unwrap();
        let app = dir.path().join("android").join("app");
        fs::create_dir_all(app.join("src/main")).unwrap();

        fs::write(
            app.join("src/main/AndroidManifest.xml"),
            r#"<manifest xmlns:android="http://schemas.android.com/apk/res/android" package="com.example.manifest">"#,
        )
        .unwrap();
        assert_eq!(
            detect_android_package(dir.path()).as_deref(),
            Some("com.example.manifest")
        );

        fs::write(app.join("build.gradle.kts"), "android {\n  namespace = \"com.example.ns\"\n}\n")
            .unwrap();
        assert_eq!(detect_android_package(dir.path()).as_deref(), Some("com.example.ns"));

        fs::write(
            app.join("build.gradle"),
            "defaultConfig {\n  applicationId 'com.example.app'\n}\nnamespace \"com.example.other\"\n",
        )
        .unwrap();
        assert_eq!(detect_android_package(dir.path()).as_deref(), Some("com.example.app"));
    }

    #[test]
    fn scan_finds_projects_and_respects_depth() {
        let root = tempfile::tempdir().unwrap();
        rn_project(&root.path().join("work/mobile"));
        flutter_project(&root.path().join("work/deep/er/flutter_app"));
        // nested inside a detected project: not reported
        flutter_project(&root.path().join("work/mobile/packages/inner"));
        // skipped directory
        rn_project(&root.path().join("node_modules/dep"));

        let shallow = scan_projects(root.path(), 2);
        assert_eq!(shallow.len(), 1);
        assert_eq!(shallow[0].path, root.path().join("work/mobile"));
        assert_eq!(shallow[0].project_type, ProjectKind::ReactNative);

        let deep = scan_projects(root.path(), 8);
        let paths: Vec<_> = deep.iter().map(|p| p.path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                root.path().join("work/mobile"),
                root.path().join("work/deep/er/flutter_app"),
            ]
        );
    }

    #[test]
    fn scan_of_project_root_reports_itself() {
        let dir = tempfile::tempdir().unwrap();
        flutter_project(dir.path());
        let found = scan_projects(dir.path(), 0);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].project_type, ProjectKind::Flutter);
    }

    #[cfg(unix)]
    #[test]
    fn scan_skips_symlinks() {
        let root = tempfile::tempdir().unwrap();
        let elsewhere = tempfile::tempdir().unwrap();
        rn_project(&elsewhere.path().join("linked"));
        std::os::unix::fs::symlink(elsewhere.path(), root.path().join("link")).unwrap();
        assert!(scan_projects(root.path(), 8).is_empty());
    }
}

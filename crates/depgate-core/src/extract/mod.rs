//! Dependency extraction from manifest files.
//!
//! Each ecosystem gets one [`DependencyExtractor`]. Extractors only report
//! dependencies that are new relative to the previous content of the same
//! file, so a watcher can feed every file change through them.

mod gradle;
mod maven;
mod npm;

pub use gradle::GradleExtractor;
pub use maven::MavenExtractor;
pub use npm::NpmExtractor;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::paths::SKIPPED_DIRS;
use crate::types::Observation;

/// A declared dependency: `(name, version)`. Version may be empty.
pub type Declared = (String, String);

pub trait DependencyExtractor: Send + Sync {
    fn ecosystem(&self) -> &'static str;

    fn supports(&self, file_name: &str) -> bool;

    /// Every dependency declared in `content`, in declaration order.
    /// Unparseable content yields an empty list.
    fn declared(&self, content: &str) -> Vec<Declared>;

    /// Dependencies present in `content` but absent from `previous`.
    fn extract(&self, path: &str, content: &str, previous: &str) -> Vec<Observation> {
        let known: HashSet<String> = self
            .declared(previous)
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        let mut seen = HashSet::new();
        self.declared(content)
            .into_iter()
            .filter(|(name, _)| !known.contains(name) && seen.insert(name.clone()))
            .map(|(name, version)| Observation::new(name, self.ecosystem(), version, path))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Extractors
// ---------------------------------------------------------------------------

/// The set of extractors consulted for every file.
pub struct Extractors {
    extractors: Vec<Box<dyn DependencyExtractor>>,
}

impl Extractors {
    pub fn new(include_dev_dependencies: bool) -> Self {
        Self {
            extractors: vec![
                Box::new(NpmExtractor::new(include_dev_dependencies)),
                Box::new(MavenExtractor),
                Box::new(GradleExtractor),
            ],
        }
    }

    pub fn for_file(&self, file_name: &str) -> Option<&dyn DependencyExtractor> {
        self.extractors
            .iter()
            .find(|e| e.supports(file_name))
            .map(|e| e.as_ref())
    }

    pub fn for_path(&self, path: &Path) -> Option<&dyn DependencyExtractor> {
        let name = path.file_name()?.to_str()?;
        self.for_file(name)
    }

    /// New dependencies in `content` relative to `previous` for the file at `path`.
    pub fn extract(&self, path: &Path, content: &str, previous: &str) -> Vec<Observation> {
        match self.for_path(path) {
            Some(extractor) => extractor.extract(&path.to_string_lossy(), content, previous),
            None => Vec::new(),
        }
    }
}

/// A manifest file found under the project root.
#[derive(Debug, Clone)]
pub struct Manifest {
    pub path: PathBuf,
    pub content: String,
}

/// Every file under `root` some extractor supports, sorted.
///
/// Vendored and build output directories are skipped.
pub fn manifest_paths(root: &Path, extractors: &Extractors) -> Vec<PathBuf> {
    let walker = WalkDir::new(root).into_iter().filter_entry(|entry| {
        entry.depth() == 0
            || !(entry.file_type().is_dir()
                && entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| SKIPPED_DIRS.contains(&name)))
    });

    let mut paths: Vec<PathBuf> = walker
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && extractors.for_path(e.path()).is_some())
        .map(|e| e.into_path())
        .collect();
    paths.sort();
    paths
}

/// Walk `root` and read every file some extractor supports.
///
/// Unreadable files are logged and left out.
pub fn scan_manifests(root: &Path, extractors: &Extractors) -> Vec<Manifest> {
    let mut manifests = Vec::new();
    for path in manifest_paths(root, extractors) {
        match std::fs::read_to_string(&path) {
            Ok(content) => manifests.push(Manifest { path, content }),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "cannot read manifest"),
        }
    }
    manifests
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn picks_extractor_by_file_name() {
        let ex = Extractors::new(false);
        assert_eq!(ex.for_file("package.json").unwrap().ecosystem(), "npm");
        assert_eq!(ex.for_file("pom.xml").unwrap().ecosystem(), "maven");
        assert_eq!(ex.for_file("build.gradle").unwrap().ecosystem(), "gradle");
        assert_eq!(ex.for_file("build.gradle.kts").unwrap().ecosystem(), "gradle");
        assert!(ex.for_file("Cargo.toml").is_none());
    }

    #[test]
    fn extract_reports_only_new_names_once() {
        let ex = Extractors::new(false);
        let before = r#"{"dependencies": {"react": "^18.0.0"}}"#;
        let after = r#"{"dependencies": {"react": "^18.2.0", "left-pad": "1.0.0"}}"#;
        let found = ex.extract(Path::new("web/package.json"), after, before);
        assert_eq!(
            found,
            vec![Observation::new("left-pad", "npm", "1.0.0", "web/package.json")]
        );
    }

    #[test]
    fn unsupported_file_yields_nothing() {
        let ex = Extractors::new(false);
        assert!(ex
            .extract(Path::new("Cargo.toml"), "[dependencies]\nserde = \"1\"", "")
            .is_empty());
    }

    #[test]
    fn scan_skips_vendored_directories() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        std::fs::write(root.join("package.json"), "{}").unwrap();
        std::fs::create_dir_all(root.join("services/api")).unwrap();
        std::fs::write(root.join("services/api/pom.xml"), "<project/>").unwrap();
        std::fs::create_dir_all(root.join("node_modules/left-pad")).unwrap();
        std::fs::write(root.join("node_modules/left-pad/package.json"), "{}").unwrap();
        std::fs::write(root.join("README.md"), "# hi").unwrap();

        let found = scan_manifests(root, &Extractors::new(false));
        let rel: Vec<_> = found
            .iter()
            .map(|m| m.path.strip_prefix(root).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            rel,
            vec![
                PathBuf::from("package.json"),
                PathBuf::from("services/api/pom.xml"),
            ]
        );
    }

    #[test]
    fn manifest_paths_ignore_build_output() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("target/classes")).unwrap();
        std::fs::write(root.join("target/classes/pom.xml"), "<project/>").unwrap();
        std::fs::create_dir_all(root.join(".depgate")).unwrap();
        std::fs::write(root.join(".depgate/package.json"), "{}").unwrap();
        std::fs::write(root.join("build.gradle"), "").unwrap();

        let paths = manifest_paths(root, &Extractors::new(false));
        assert_eq!(paths, vec![root.join("build.gradle")]);
    }
}

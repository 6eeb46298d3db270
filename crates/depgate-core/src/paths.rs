use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const DEPGATE_DIR: &str = ".depgate";
pub const CONFIG_FILE: &str = "config.yaml";

/// Directories never descended into when looking for manifests.
pub const SKIPPED_DIRS: &[&str] = &["node_modules", ".git", "target", "build", DEPGATE_DIR];

fn depgate_dir(root: &Path) -> PathBuf {
    root.join(DEPGATE_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    depgate_dir(root).join(CONFIG_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_lives_under_depgate_dir() {
        let root = Path::new("/repo");
        assert_eq!(config_path(root), PathBuf::from("/repo/.depgate/config.yaml"));
        assert!(config_path(root).starts_with(depgate_dir(root)));
    }
}

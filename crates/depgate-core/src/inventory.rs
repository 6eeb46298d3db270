//! Whole-project dependency listings for bulk submission.

use std::collections::HashSet;
use std::path::Path;

use crate::client::{DeveloperInfo, InventoryReport, PackageInfo};
use crate::extract::{scan_manifests, Extractors};

/// Every dependency declared under `root`; the first declaration of a key wins.
pub fn collect_packages(root: &Path, extractors: &Extractors, project: &str) -> Vec<PackageInfo> {
    let mut seen = HashSet::new();
    let mut packages = Vec::new();

    for manifest in scan_manifests(root, extractors) {
        let rel = manifest.path.strip_prefix(root).unwrap_or(&manifest.path);
        for obs in extractors.extract(rel, &manifest.content, "") {
            if seen.insert(obs.key()) {
                packages.push(PackageInfo::new(&obs, project));
            }
        }
    }
    packages
}

impl DeveloperInfo {
    /// Describe the current user and machine.
    pub fn current(project: &str, tool_version: &str) -> Self {
        Self {
            username: username(),
            hostname: hostname(),
            os: std::env::consts::OS.to_string(),
            project_name: project.to_string(),
            tool_version: tool_version.to_string(),
        }
    }
}

impl InventoryReport {
    pub fn new(dependencies: Vec<PackageInfo>, developer: DeveloperInfo) -> Self {
        Self {
            dependencies,
            developer,
        }
    }
}

fn username() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}

fn hostname() -> String {
    std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("COMPUTERNAME"))
        .ok()
        .or_else(|| std::fs::read_to_string("/etc/hostname").ok())
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

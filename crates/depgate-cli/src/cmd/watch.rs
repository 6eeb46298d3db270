use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use anyhow::Context;
use depgate_core::extract::{manifest_paths, Extractors};
use depgate_core::{Config, CredentialProvider, Observation, ValidationEngine};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::{credentials, http_client, inventory, runtime};
use crate::output::print_event;

pub const DEFAULT_WATCH_INTERVAL_MS: u64 = 1_000;
const MIN_WATCH_INTERVAL_MS: u64 = 100;

pub fn run(root: &Path, interval_ms: Option<u64>, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let interval = Duration::from_millis(
        interval_ms
            .unwrap_or(DEFAULT_WATCH_INTERVAL_MS)
            .max(MIN_WATCH_INTERVAL_MS),
    );
    runtime()?.block_on(watch(root, &config, interval, json))
}

async fn watch(root: &Path, config: &Config, interval: Duration, json: bool) -> anyhow::Result<()> {
    let creds = credentials();
    let client = Arc::new(http_client(config, creds.clone())?);
    let has_credential = creds.credential().is_some();
    let (engine, mut events) =
        ValidationEngine::new(config.engine_settings(root), client.clone(), creds);

    if !engine.settings().enabled {
        warn!("validation is disabled; changes will not be submitted");
    } else if !has_credential {
        warn!("DEPGATE_TOKEN is not set; new dependencies will be skipped");
    } else {
        // Reported once per session.
        let report = inventory::build_report(root, config);
        if !report.dependencies.is_empty() {
            let client = client.clone();
            tokio::spawn(async move {
                if let Err(e) = inventory::send(client.as_ref(), &report).await {
                    warn!(error = %format!("{e:#}"), "inventory report failed");
                }
            });
        }
    }

    let extractors = Extractors::new(config.include_dev_dependencies);
    let mut snapshot = Snapshot::capture(root, &extractors);
    info!(root = %root.display(), manifests = snapshot.len(), "watching manifests");
    if !json {
        println!(
            "Watching {} manifest(s) under {} (Ctrl-C to stop)",
            snapshot.len(),
            root.display()
        );
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately and the snapshot is already fresh.
    ticker.tick().await;

    loop {
        tokio::select! {
            res = &mut ctrl_c => {
                res.context("failed to listen for Ctrl-C")?;
                break;
            }
            Some(event) = events.recv() => print_event(&event, json)?,
            _ = ticker.tick() => {
                for obs in snapshot.refresh(root, &extractors) {
                    let key = obs.key();
                    let outcome = engine.submit(obs).await;
                    debug!(key = %key, ?outcome, "observation submitted");
                }
            }
        }
    }

    let unresolved = engine.tracker().keys().await;
    info!(
        unresolved = unresolved.len(),
        reachable = engine.is_reachable().await,
        "stopping watch"
    );
    for key in &unresolved {
        let regime = engine.regime(key).await;
        debug!(key = %key, ?regime, "abandoning validation");
    }
    engine.dispose().await;
    Ok(())
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

struct Entry {
    modified: Option<SystemTime>,
    content: String,
}

/// Last seen content of every manifest, keyed by absolute path.
struct Snapshot {
    files: HashMap<PathBuf, Entry>,
}

impl Snapshot {
    fn capture(root: &Path, extractors: &Extractors) -> Self {
        let files = manifest_paths(root, extractors)
            .into_iter()
            .filter_map(|path| {
                let content = std::fs::read_to_string(&path).ok()?;
                let modified = modified(&path);
                Some((path, Entry { modified, content }))
            })
            .collect();
        Self { files }
    }

    fn len(&self) -> usize {
        self.files.len()
    }

    /// Re-read manifests whose modification time changed and return the
    /// dependencies they gained. Files created since the last refresh count
    /// as entirely new.
    fn refresh(&mut self, root: &Path, extractors: &Extractors) -> Vec<Observation> {
        let paths = manifest_paths(root, extractors);
        let present: HashSet<&PathBuf> = paths.iter().collect();
        self.files.retain(|path, _| present.contains(path));

        let mut found = Vec::new();
        for path in &paths {
            let modified = modified(path);
            let previous = match self.files.get(path) {
                Some(entry) if modified.is_some() && entry.modified == modified => continue,
                Some(entry) => entry.content.clone(),
                None => String::new(),
            };
            let content = match std::fs::read_to_string(path) {
                Ok(c) => c,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "cannot read manifest");
                    continue;
                }
            };
            if content != previous {
                let rel = path.strip_prefix(root).unwrap_or(path);
                found.extend(extractors.extract(rel, &content, &previous));
            }
            self.files
                .insert(path.clone(), Entry { modified, content });
        }
        found
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

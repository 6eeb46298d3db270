use std::path::Path;

use anyhow::Context;
use depgate_core::extract::Extractors;
use depgate_core::inventory::collect_packages;
use depgate_core::{Config, ValidationClient};

use super::{credentials, http_client, require_credential, runtime};
use crate::output::{print_json, print_table};

/// Queue every declared dependency in the project for review in one call.
pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    if !config.enabled {
        if json {
            print_json(&serde_json::json!({ "enabled": false, "queued": 0 }))?;
        } else {
            println!("Validation is disabled in .depgate/config.yaml; nothing queued.");
        }
        return Ok(());
    }

    let extractors = Extractors::new(config.include_dev_dependencies);
    let packages = collect_packages(root, &extractors, &config.project_name(root));
    if packages.is_empty() {
        if json {
            print_json(&serde_json::json!({ "queued": 0, "packages": packages }))?;
        } else {
            println!("No dependencies found under {}.", root.display());
        }
        return Ok(());
    }

    let creds = credentials();
    require_credential(creds.as_ref())?;
    let client = http_client(&config, creds)?;
    runtime()?
        .block_on(client.queue(&packages))
        .context("failed to queue dependencies")?;

    if json {
        print_json(&serde_json::json!({
            "queued": packages.len(),
            "packages": packages,
        }))?;
        return Ok(());
    }

    let rows = packages
        .iter()
        .map(|p| {
            vec![
                p.package_name.clone(),
                p.package_manager.clone(),
                p.package_version.clone(),
            ]
        })
        .collect();
    print_table(&["NAME", "ECOSYSTEM", "VERSION"], rows);
    println!();
    println!("Queued {} dependencies for validation.", packages.len());
    Ok(())
}

use std::path::Path;

use anyhow::Context;
use depgate_core::extract::Extractors;
use depgate_core::inventory::collect_packages;
use depgate_core::{Config, DeveloperInfo, InventoryReport, ValidationClient};
use tracing::info;

use super::{credentials, http_client, require_credential, runtime};
use crate::output::print_json;

/// Report every declared dependency together with who is working on it.
pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    if !config.enabled {
        if json {
            print_json(&serde_json::json!({ "enabled": false, "reported": 0 }))?;
        } else {
            println!("Validation is disabled in .depgate/config.yaml; nothing reported.");
        }
        return Ok(());
    }

    let creds = credentials();
    let report = build_report(root, &config);
    if report.dependencies.is_empty() {
        if json {
            print_json(&serde_json::json!({ "reported": 0 }))?;
        } else {
            println!("No dependencies found under {}.", root.display());
        }
        return Ok(());
    }

    require_credential(creds.as_ref())?;
    let client = http_client(&config, creds)?;
    runtime()?.block_on(send(&client, &report))?;

    if json {
        print_json(&serde_json::json!({
            "reported": report.dependencies.len(),
            "developer": report.developer,
        }))?;
    } else {
        println!(
            "Reported inventory of {} dependencies ({}@{}).",
            report.dependencies.len(),
            report.developer.username,
            report.developer.hostname
        );
    }
    Ok(())
}

pub(crate) fn build_report(root: &Path, config: &Config) -> InventoryReport {
    let project = config.project_name(root);
    let extractors = Extractors::new(config.include_dev_dependencies);
    InventoryReport::new(
        collect_packages(root, &extractors, &project),
        DeveloperInfo::current(&project, env!("CARGO_PKG_VERSION")),
    )
}

pub(crate) async fn send(
    client: &dyn ValidationClient,
    report: &InventoryReport,
) -> anyhow::Result<()> {
    client
        .report_inventory(report)
        .await
        .context("failed to report inventory")?;
    info!(
        dependencies = report.dependencies.len(),
        "reported dependency inventory"
    );
    Ok(())
}

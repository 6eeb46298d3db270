use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use depgate_core::{Config, HttpValidationClient, ValidationClient};

use super::{credentials, require_credential, runtime};
use crate::output::print_json;

/// Connect and read timeout for the health check.
pub const HEALTH_TIMEOUT: Duration = Duration::from_secs(10);

/// Check that the validation service is up and accepts our credential.
pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let creds = credentials();
    require_credential(creds.as_ref())?;
    let client = HttpValidationClient::new(&config.api_url, creds, HEALTH_TIMEOUT, HEALTH_TIMEOUT)
        .context("failed to build validation client")?;

    runtime()?
        .block_on(client.health())
        .with_context(|| format!("connection to {} failed", client.base_url()))?;

    if json {
        print_json(&serde_json::json!({
            "api_url": client.base_url(),
            "reachable": true,
        }))?;
    } else {
        println!("Connection successful: {}", client.base_url());
    }
    Ok(())
}

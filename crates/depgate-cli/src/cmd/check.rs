use std::path::Path;

use anyhow::Context;
use depgate_core::{Config, Decision, DependencyKey, ValidationClient};

use super::{credentials, http_client, require_credential, runtime};
use crate::output::print_json;

pub fn run(root: &Path, name: &str, ecosystem: &str, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let creds = credentials();
    require_credential(creds.as_ref())?;
    let client = http_client(&config, creds)?;

    let key = DependencyKey::new(name, ecosystem);
    let resp = runtime()?
        .block_on(client.check(&key))
        .with_context(|| format!("check failed for {key}"))?;
    let decision = resp.classify();

    if json {
        let value = serde_json::json!({
            "key": key,
            "decision": decision,
            "terminal": decision.is_terminal(),
            "message": resp.message,
        });
        print_json(&value)?;
        return Ok(());
    }

    println!("{key}: {decision}");
    let message = resp.message.as_deref().filter(|m| !m.trim().is_empty());
    if let (Some(message), false) = (message, matches!(decision, Decision::Denied { .. })) {
        println!("  {message}");
    }
    Ok(())
}

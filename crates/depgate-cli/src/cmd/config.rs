use std::path::Path;

use anyhow::Context;
use clap::Subcommand;
use depgate_core::config::WarnLevel;
use depgate_core::{paths, Config};

use crate::output::print_json;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Print the effective configuration
    Show,

    /// Validate the config for common mistakes
    Validate,

    /// Write a default .depgate/config.yaml
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(root: &Path, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Show => show(root, json),
        ConfigSubcommand::Validate => validate(root, json),
        ConfigSubcommand::Init { force } => init(root, force, json),
    }
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

fn show(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;

    if json {
        print_json(&config)?;
        return Ok(());
    }

    println!("Config file:              {}", paths::config_path(root).display());
    println!("Enabled:                  {}", config.enabled);
    println!("API URL:                  {}", config.api_url);
    println!("Project:                  {}", config.project_name(root));
    println!(
        "Poll interval:            {}ms",
        config.poll_interval().as_millis()
    );
    println!("Max connection attempts:  {}", config.max_connection_attempts);
    println!(
        "Timeouts:                 connect {}s, request {}s",
        config.connect_timeout().as_secs(),
        config.request_timeout().as_secs()
    );
    println!("Dev dependencies:         {}", config.include_dev_dependencies);
    println!("Log level:                {}", config.log_level);
    Ok(())
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

fn validate(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let warnings = config.validate();

    if json {
        let value = serde_json::json!({
            "warnings": warnings,
        });
        print_json(&value)?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("config validation found errors");
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// init
// ---------------------------------------------------------------------------

fn init(root: &Path, force: bool, json: bool) -> anyhow::Result<()> {
    let path = paths::config_path(root);
    let created = Config::init(root, force)
        .with_context(|| format!("failed to write {}", path.display()))?;

    if json {
        print_json(&serde_json::json!({ "path": path, "created": created }))?;
    } else if created {
        println!("Wrote {}", path.display());
    } else {
        println!("{} already exists; use --force to overwrite.", path.display());
    }
    Ok(())
}

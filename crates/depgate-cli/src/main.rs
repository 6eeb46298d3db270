mod cmd;
mod output;
mod root;

use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, Subcommand};
use cmd::config::ConfigSubcommand;
use depgate_core::Config;

#[derive(Parser)]
#[command(
    name = "depgate",
    about = "Hold newly declared dependencies until a remote approval service decides on them",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .depgate/ or .git/)
    #[arg(long, global = true, env = "DEPGATE_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch manifests and validate every dependency added to them
    Watch {
        /// How often manifest modification times are polled
        #[arg(long, value_name = "MS")]
        interval_ms: Option<u64>,
    },

    /// Queue every dependency already declared in the project for review
    Scan,

    /// Ask the validation service for the current decision on one dependency
    Check {
        /// Package name (maven and gradle use group:artifact)
        name: String,

        /// Package ecosystem: npm, maven, or gradle
        #[arg(long, short = 'e')]
        ecosystem: String,
    },

    /// Report every declared dependency and the current developer to the service
    Inventory,

    /// Test the connection and credential against the validation service
    Ping,

    /// Show, validate, or initialize .depgate/config.yaml
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();
    let root = root::resolve_root(cli.root.as_deref());

    let configured = Config::load(&root)
        .ok()
        .and_then(|c| tracing::Level::from_str(c.log_level.trim()).ok())
        .unwrap_or(tracing::Level::WARN);
    let default_level = match &cli.command {
        Commands::Watch { .. } => configured.max(tracing::Level::INFO),
        _ => configured,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Watch { interval_ms } => cmd::watch::run(&root, interval_ms, cli.json),
        Commands::Scan => cmd::scan::run(&root, cli.json),
        Commands::Check { name, ecosystem } => cmd::check::run(&root, &name, &ecosystem, cli.json),
        Commands::Inventory => cmd::inventory::run(&root, cli.json),
        Commands::Ping => cmd::ping::run(&root, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

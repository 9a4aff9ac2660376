//! eaudit CLI - Extension attribute audit tool
//!
//! Provides `eaudit scan`, `eaudit delete`, and `eaudit config`.

mod commands;
mod config;
mod logging;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use commands::config::ConfigCommands;
use config::{default_config_path, ConfigError, FileConfig, Overrides, Settings};

#[derive(Parser)]
#[command(name = "eaudit")]
#[command(about = "eaudit - Find extension attributes that are safe to remove")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every subcommand
#[derive(Args)]
struct GlobalArgs {
    /// Config file (defaults to ~/.eaudit/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Server base URL
    #[arg(long, global = true, env = "EAUDIT_URL")]
    url: Option<String>,

    /// API client id
    #[arg(long, global = true, env = "EAUDIT_CLIENT_ID")]
    client_id: Option<String>,

    /// API client secret
    #[arg(long, global = true, env = "EAUDIT_CLIENT_SECRET", hide_env_values = true)]
    client_secret: Option<String>,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan extension attributes and report which are safe to remove
    Scan {
        /// Also scan mobile device extension attributes
        #[arg(long)]
        include_mobile: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete an extension attribute
    Delete {
        /// Attribute id
        id: i64,

        /// Delete a mobile device attribute instead of a computer attribute
        #[arg(long)]
        mobile: bool,

        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.global.verbose);

    if let Err(e) = run(cli).await {
        match e.downcast_ref::<ConfigError>() {
            Some(config_error) => eprintln!("Error [{}]: {config_error}", config_error.code()),
            None => eprintln!("Error: {e:#}"),
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = load_settings(&cli.global)?;
    tracing::debug!(config = %settings.source.display(), "settings loaded");

    match cli.command {
        Commands::Scan {
            include_mobile,
            json,
        } => commands::scan::execute(&settings, include_mobile || settings.include_mobile, json).await,
        Commands::Delete { id, mobile, force } => {
            commands::delete::execute(&settings, id, mobile, force).await
        }
        Commands::Config { action } => commands::config::execute(action, &settings),
    }
}

fn load_settings(global: &GlobalArgs) -> anyhow::Result<Settings> {
    let (path, explicit) = match &global.config {
        Some(path) => (path.clone(), true),
        None => (default_config_path(), false),
    };
    let file = FileConfig::load(&path, explicit)?;
    let overrides = Overrides {
        url: global.url.clone(),
        client_id: global.client_id.clone(),
        client_secret: global.client_secret.clone(),
    };
    Ok(Settings::resolve(file, overrides, path)?)
}

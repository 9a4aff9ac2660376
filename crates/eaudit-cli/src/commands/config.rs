//! `eaudit config show/path`

use clap::Subcommand;

use crate::config::Settings;

/// Configuration commands
#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration (secret redacted)
    Show,
    /// Print the config file path
    Path,
}

pub fn execute(action: ConfigCommands, settings: &Settings) -> anyhow::Result<()> {
    match action {
        ConfigCommands::Show => {
            println!("Config file:     {}", settings.source.display());
            println!("URL:             {}", display_or_unset(settings.url.as_deref()));
            println!("Client ID:       {}", display_or_unset(settings.client_id.as_deref()));
            println!(
                "Client secret:   {}",
                if settings.client_secret.is_some() {
                    "********"
                } else {
                    "(not set)"
                }
            );
            println!("Include mobile:  {}", settings.include_mobile);
            println!("Batch size:      {}", settings.options.batch_size);
            println!("Timeout:         {}s", settings.options.timeout.as_secs());
        }
        ConfigCommands::Path => {
            println!("{}", settings.source.display());
        }
    }
    Ok(())
}

fn display_or_unset(value: Option<&str>) -> &str {
    value.unwrap_or("(not set)")
}

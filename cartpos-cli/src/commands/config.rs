//! Config command - show and change settings.json

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use cartpos_core::config::{Config, SETTABLE_KEYS, SETTINGS_FILE};

use super::get_data_dir;
use crate::output;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration (file, environment and defaults)
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set one value, e.g. `cart config set backend.baseUrl https://...`
    Set { key: String, value: String },
    /// List the keys that can be set
    Keys,
}

pub fn run(command: ConfigCommands) -> Result<()> {
    let data_dir = get_data_dir()?;

    match command {
        ConfigCommands::Show { json } => {
            let config = Config::load(&data_dir)?;
            if json {
                return output::print_json(&config);
            }

            let mut table = output::create_table();
            table.set_header(vec!["Setting", "Value"]);
            table.add_row(vec!["Backend URL".to_string(), config.backend_url.clone()]);
            table.add_row(vec![
                "HTTP timeout".to_string(),
                format!("{}s", config.http_timeout.as_secs()),
            ]);
            table.add_row(vec![
                "Firebase API key".to_string(),
                if config.firebase_api_key.is_some() {
                    "set".green().to_string()
                } else {
                    "missing".red().to_string()
                },
            ]);
            table.add_row(vec!["Country code".to_string(), config.country_code.clone()]);
            table.add_row(vec![
                "Identity Toolkit URL".to_string(),
                config.identity_toolkit_url.clone(),
            ]);
            table.add_row(vec!["Secure Token URL".to_string(), config.secure_token_url.clone()]);
            table.add_row(vec![
                "Poll interval".to_string(),
                format!("{}s", config.poll_interval.as_secs()),
            ]);
            table.add_row(vec![
                "Retry".to_string(),
                format!(
                    "{} attempts, {}ms initial, {}ms max",
                    config.retry.max_attempts, config.retry.initial_delay_ms, config.retry.max_delay_ms
                ),
            ]);
            println!("{}", table);
            println!("{}", data_dir.join(SETTINGS_FILE).display().to_string().dimmed());
        }
        ConfigCommands::Set { key, value } => {
            Config::set(&data_dir, &key, &value)?;
            output::success(&format!("{} updated", key));
        }
        ConfigCommands::Keys => {
            for key in SETTABLE_KEYS {
                println!("{}", key);
            }
        }
    }

    Ok(())
}

//! cartpos CLI - sign in and manage the food-cart POS session from a terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{config, login, logout, logs, profile, status, users, watch};

/// cartpos - food-cart point of sale
#[derive(Parser)]
#[command(name = "cart", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with your phone number
    Login {
        /// 10-digit phone number without country code
        #[arg(long)]
        phone: Option<String>,
        /// 6-digit verification code (prompted if omitted)
        #[arg(long)]
        code: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Sign out on this device
    Logout {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show session and backend status
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Keep checking the session until interrupted
    Watch {
        /// Seconds between checks (defaults to session.pollIntervalSecs)
        #[arg(long)]
        interval: Option<u64>,
    },

    /// View or edit your profile
    Profile {
        #[command(subcommand)]
        command: profile::ProfileCommands,
    },

    /// Manage users (super-admins only)
    Users {
        #[command(subcommand)]
        command: users::UsersCommands,
    },

    /// View and manage the event log
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },

    /// Show or change settings
    Config {
        #[command(subcommand)]
        command: config::ConfigCommands,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::report(&e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Login { phone, code, json } => login::run(phone, code, json).await,
        Commands::Logout { json } => logout::run(json).await,
        Commands::Status { json } => status::run(json).await,
        Commands::Watch { interval } => watch::run(interval).await,
        Commands::Profile { command } => profile::run(command).await,
        Commands::Users { command } => users::run(command).await,
        Commands::Logs { command } => logs::run(command),
        Commands::Config { command } => config::run(command),
    }
}

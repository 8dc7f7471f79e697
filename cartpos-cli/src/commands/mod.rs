//! CLI command implementations

pub mod config;
pub mod login;
pub mod logout;
pub mod logs;
pub mod profile;
pub mod status;
pub mod users;
pub mod watch;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use cartpos_core::services::{EntryPoint, LogEvent};
use cartpos_core::CartContext;

/// Data directory from `CARTPOS_DIR`, or `~/.cartpos`
pub fn get_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("CARTPOS_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".cartpos"))
        .ok_or_else(|| anyhow!("Could not find home directory; set CARTPOS_DIR"))
}

/// Build the context for this run
pub fn get_context() -> Result<CartContext> {
    let data_dir = get_data_dir()?;
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory: {:?}", data_dir))?;
    tracing::debug!(data_dir = %data_dir.display(), "opening cartpos context");

    CartContext::new(&data_dir, EntryPoint::Cli).context("Failed to initialize cartpos")
}

/// Build the context and resolve the startup session state
pub async fn get_session_context() -> Result<CartContext> {
    let ctx = get_context()?;
    ctx.session.initialize().await?;
    Ok(ctx)
}

/// Record a command in the event log, ignoring failures
pub fn log_command(ctx: &CartContext, command: &str) {
    log_event(ctx, LogEvent::new("command_executed").with_command(command));
}

pub fn log_event(ctx: &CartContext, event: LogEvent) {
    if let Some(logger) = &ctx.logger {
        if let Err(e) = logger.log(event) {
            tracing::debug!(error = %e, "failed to write event log");
        }
    }
}

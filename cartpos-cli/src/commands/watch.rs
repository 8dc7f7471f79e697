//! Watch command - keep the session alive and report deactivation
//!
//! Runs the status poller in the foreground until Ctrl-C, printing session
//! notices as they arrive. Mirrors what the mobile app does while open.

use std::time::Duration;

use anyhow::{bail, Result};
use cartpos_core::services::StatusPoller;
use cartpos_core::{SessionNotice, SessionState};
use colored::Colorize;
use tokio::sync::broadcast::error::RecvError;

use super::{get_session_context, log_command};
use crate::output;

pub async fn run(interval_secs: Option<u64>) -> Result<()> {
    let ctx = get_session_context().await?;
    log_command(&ctx, "watch");

    if ctx.session.state() != SessionState::Authenticated {
        bail!("Not signed in. Run 'cart login' first.");
    }

    let period = interval_secs
        .map(Duration::from_secs)
        .unwrap_or(ctx.config.poll_interval);
    if period.is_zero() {
        bail!("Interval must be greater than zero");
    }

    let mut notices = ctx.session.subscribe_notices();
    let poller = StatusPoller::new(ctx.session.clone(), period).spawn();

    output::info(&format!(
        "Watching session, checking every {}s. Press Ctrl-C to stop.",
        period.as_secs()
    ));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
            notice = notices.recv() => match notice {
                Ok(SessionNotice::AccountDeactivated { message }) => {
                    println!("{} {}", "Account Deactivated:".red().bold(), message);
                    break;
                }
                Ok(SessionNotice::SignedOut) => {
                    output::warning("Signed out");
                    break;
                }
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            },
        }
    }

    poller.shutdown().await;
    Ok(())
}

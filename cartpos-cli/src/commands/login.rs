//! Login command - phone number + OTP sign-in

use anyhow::{bail, Result};
use cartpos_core::services::LogEvent;
use cartpos_core::{Error, SessionState};
use colored::Colorize;
use dialoguer::Input;

use super::{get_session_context, log_command, log_event};
use crate::output;

/// Attempts allowed at the code prompt before starting over
const MAX_CODE_ATTEMPTS: usize = 3;

fn prompt(label: &str) -> Result<String> {
    if atty::isnt(atty::Stream::Stdin) {
        bail!("{} is required when not running interactively", label);
    }
    Ok(Input::<String>::new().with_prompt(label).interact_text()?)
}

pub async fn run(phone: Option<String>, code: Option<String>, json: bool) -> Result<()> {
    let ctx = get_session_context().await?;
    log_command(&ctx, "login");

    if ctx.session.state() == SessionState::Authenticated {
        if let Some(user) = ctx.session.current_user().await? {
            if json {
                output::print_result(Ok(user))?;
            } else {
                output::info(&format!(
                    "Already signed in as {} ({})",
                    user.display_name(),
                    user.phone_number
                ));
                println!("Run 'cart logout' to switch accounts.");
            }
            return Ok(());
        }
    }

    let phone = match phone {
        Some(p) => p,
        None => prompt(&format!("Phone number ({} is added)", ctx.session.country_code()))?,
    };

    let pb = output::spinner("Sending verification code...");
    let handle = ctx.session.request_code(phone.trim()).await;
    pb.finish_and_clear();
    let handle = handle?;

    if !json {
        output::info(&format!("Code sent to {}", handle.phone_number()));
    }

    // A code given on the command line gets exactly one try
    let interactive = code.is_none();
    let mut code = code;
    let mut attempts = 0;

    let result = loop {
        attempts += 1;
        let entered = match code.take() {
            Some(c) => c,
            None => prompt("Verification code")?,
        };

        let pb = output::spinner("Verifying...");
        let result = ctx.session.confirm_code(&handle, entered.trim()).await;
        pb.finish_and_clear();

        match result {
            Err(e @ (Error::Validation(_) | Error::Identity(_)))
                if interactive && attempts < MAX_CODE_ATTEMPTS =>
            {
                output::alert(&e.alert());
            }
            other => break other,
        }
    };

    if let Err(e) = &result {
        log_event(&ctx, LogEvent::new("cli_login_failed").with_error(e.to_string()));
    }

    if json {
        return output::print_result(result);
    }

    let user = result?;
    output::success(&format!("Signed in as {}", user.display_name()));
    if user.is_super_admin {
        println!("{}", "Super-admin: user management is available via 'cart users'".dimmed());
    }
    Ok(())
}

//! Status command - show who is signed in and whether the backend is reachable

use anyhow::Result;
use colored::Colorize;
use comfy_table::{ContentArrangement, Table};
use serde::Serialize;

use cartpos_core::SessionUser;

use super::{get_session_context, log_command};
use crate::output;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusReport {
    state: &'static str,
    user: Option<SessionUser>,
    backend_url: String,
    backend_reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    backend_error: Option<String>,
}

pub async fn run(json: bool) -> Result<()> {
    let pb = output::spinner("Checking session...");
    let ctx = get_session_context().await;
    pb.finish_and_clear();
    let ctx = ctx?;
    log_command(&ctx, "status");

    let health = ctx.backend.health().await;
    let report = StatusReport {
        state: ctx.session.state().as_str(),
        user: ctx.session.current_user().await?,
        backend_url: ctx.config.backend_url.clone(),
        backend_reachable: health.is_ok(),
        backend_error: health.err().map(|e| e.alert().message),
    };

    if json {
        return output::print_json(&report);
    }

    println!("{}", "Session Status".bold());
    println!();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.add_row(vec!["State", report.state]);
    if let Some(user) = &report.user {
        table.add_row(vec!["Phone", user.phone_number.as_str()]);
        table.add_row(vec!["Name", user.display_name()]);
        table.add_row(vec!["Active".to_string(), output::yes_no(user.is_active)]);
        table.add_row(vec!["Super-admin".to_string(), output::yes_no(user.is_super_admin)]);
    }
    table.add_row(vec!["Backend", report.backend_url.as_str()]);
    println!("{}", table);
    println!();

    match &report.backend_error {
        None => output::success("Backend reachable"),
        Some(e) => output::warning(&format!("Backend unreachable: {}", e)),
    }

    if report.user.is_none() {
        println!("Run 'cart login' to sign in.");
    }

    Ok(())
}

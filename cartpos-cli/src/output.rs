//! Output formatting utilities

use std::fmt;
use std::time::Duration;

use cartpos_core::{Alert, Error, OperationResult};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, ContentArrangement, Table};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{}", msg.cyan());
}

/// Print a user-facing alert to stderr
pub fn alert(alert: &Alert) {
    eprintln!("{} {}", format!("{}:", alert.title).red().bold(), alert.message);
}

/// A failure whose details already went to stdout as JSON
#[derive(Debug)]
pub struct AlreadyReported;

impl fmt::Display for AlreadyReported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("operation failed")
    }
}

impl std::error::Error for AlreadyReported {}

/// Print an error, as an alert when it comes from the core library
pub fn report(err: &anyhow::Error) {
    if err.is::<AlreadyReported>() {
        return;
    }
    match err.downcast_ref::<Error>() {
        Some(core) => alert(&core.alert()),
        None => eprintln!("{}", err.to_string().red()),
    }
}

/// Pretty-print any serializable value as JSON
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a core result as an `OperationResult` document
///
/// A failed result still prints, then comes back as [`AlreadyReported`] so the
/// process exits non-zero without a second message.
pub fn print_result<T: Serialize>(result: cartpos_core::domain::Result<T>) -> anyhow::Result<()> {
    let op: OperationResult<T> = result.into();
    let success = op.success;
    print_json(&op)?;
    if success {
        Ok(())
    } else {
        Err(AlreadyReported.into())
    }
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Spinner for network calls; hidden when stdout is not a terminal
pub fn spinner(msg: &str) -> ProgressBar {
    if atty::isnt(atty::Stream::Stdout) {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Format bytes as human-readable size
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

pub fn yes_no(value: bool) -> String {
    if value {
        "yes".green().to_string()
    } else {
        "no".red().to_string()
    }
}

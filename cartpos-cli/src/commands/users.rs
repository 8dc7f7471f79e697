//! Users command - super-admin user management

use anyhow::{bail, Result};
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Confirm;

use cartpos_core::{AdminUser, AdminUserUpdate, Error};

use super::{get_session_context, log_command};
use crate::output;

#[derive(Subcommand)]
pub enum UsersCommands {
    /// List all registered users
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Find users by (partial) phone number
    Search {
        query: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Rename, activate or deactivate a user
    Update {
        /// Full phone number including country code, e.g. +919876543210
        phone: String,
        #[arg(long)]
        name: Option<String>,
        /// Allow the user to sign in
        #[arg(long, conflicts_with = "deactivate")]
        activate: bool,
        /// Block the user from signing in
        #[arg(long)]
        deactivate: bool,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn format_date(value: Option<chrono::NaiveDateTime>) -> String {
    value
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn print_users(users: &[AdminUser]) {
    if users.is_empty() {
        println!("No users found.");
        return;
    }

    let mut table = output::create_table();
    table.set_header(vec!["Phone", "Name", "Active", "Created", "Last login"]);
    for user in users {
        table.add_row(vec![
            user.phone_number.clone(),
            user.name.clone(),
            output::yes_no(user.is_active),
            format_date(user.created_at),
            format_date(user.last_login),
        ]);
    }
    println!("{}", table);
    println!("{}", format!("{} user(s)", users.len()).dimmed());
}

pub async fn run(command: UsersCommands) -> Result<()> {
    let ctx = get_session_context().await?;

    match command {
        UsersCommands::List { json } => {
            log_command(&ctx, "users list");
            let pb = output::spinner("Loading users...");
            let users = ctx.admin.list_users().await;
            pb.finish_and_clear();
            let users = users?;

            if json {
                return output::print_json(&users);
            }
            print_users(&users);
        }
        UsersCommands::Search { query, json } => {
            log_command(&ctx, "users search");
            let users = ctx.admin.search_users(&query).await?;

            if json {
                return output::print_json(&users);
            }
            print_users(&users);
        }
        UsersCommands::Update {
            phone,
            name,
            activate,
            deactivate,
            force,
            json,
        } => {
            log_command(&ctx, "users update");
            if name.is_none() && !activate && !deactivate {
                bail!("Nothing to change. Pass --name, --activate or --deactivate.");
            }

            // The endpoint replaces both fields, so start from the current record
            let current = ctx
                .admin
                .search_users(&phone)
                .await?
                .into_iter()
                .find(|u| u.phone_number == phone)
                .ok_or_else(|| Error::not_found("User not found"))?;

            let mut update = AdminUserUpdate::from(&current);
            if let Some(name) = name {
                update.name = name;
            }
            if activate {
                update.is_active = true;
            } else if deactivate {
                update.is_active = false;
            }

            if deactivate && current.is_active && !force && !json {
                let confirmed = Confirm::new()
                    .with_prompt(format!(
                        "Deactivate {}? They will be signed out at their next check.",
                        phone
                    ))
                    .default(false)
                    .interact()?;
                if !confirmed {
                    println!("Cancelled.");
                    return Ok(());
                }
            }

            let result = ctx.admin.update_user(&phone, &update).await;
            if json {
                return output::print_result(result.map(|_| update));
            }
            result?;
            output::success(&format!(
                "Updated {}: name '{}', {}",
                phone,
                update.name,
                if update.is_active { "active" } else { "inactive" }
            ));
        }
    }

    Ok(())
}

//! Profile command - view or rename the signed-in user

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use super::{get_session_context, log_command};
use crate::output;

#[derive(Subcommand)]
pub enum ProfileCommands {
    /// Show the signed-in user
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change your display name
    SetName {
        name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub async fn run(command: ProfileCommands) -> Result<()> {
    let ctx = get_session_context().await?;

    match command {
        ProfileCommands::Show { json } => {
            log_command(&ctx, "profile show");
            let user = ctx.session.current_user().await?;

            if json {
                return output::print_json(&user);
            }
            match user {
                Some(user) => {
                    println!("{}", user.display_name().bold());
                    println!("  Phone: {}", user.phone_number);
                    println!("  Active: {}", output::yes_no(user.is_active));
                    if user.is_super_admin {
                        println!("  Role: {}", "super-admin".cyan());
                    }
                }
                None => println!("Not signed in. Run 'cart login' first."),
            }
        }
        ProfileCommands::SetName { name, json } => {
            log_command(&ctx, "profile set-name");
            let result = ctx.session.update_profile_name(&name).await;

            if json {
                return output::print_result(result);
            }
            let user = result?;
            output::success(&format!("Name updated to {}", user.name));
        }
    }

    Ok(())
}

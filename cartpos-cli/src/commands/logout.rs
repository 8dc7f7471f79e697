//! Logout command - end the session on this device

use anyhow::Result;

use super::{get_context, log_command};
use crate::output;

pub async fn run(json: bool) -> Result<()> {
    let ctx = get_context()?;
    log_command(&ctx, "logout");

    let was_signed_in = ctx.session.current_user().await.ok().flatten().is_some();
    ctx.session.logout().await;

    if json {
        println!("{}", serde_json::json!({ "success": true, "wasSignedIn": was_signed_in }));
    } else if was_signed_in {
        output::success("Signed out");
    } else {
        println!("Not signed in.");
    }

    Ok(())
}

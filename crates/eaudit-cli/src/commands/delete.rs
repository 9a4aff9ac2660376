//! `eaudit delete`
//!
//! Deletion is never part of a scan; it only happens here, one attribute at
//! a time, after confirmation.

use anyhow::Context;
use eaudit_scanner::client::endpoint;
use eaudit_scanner::{ApiClient, AttributeScope, Session};
use std::io::{self, Write};

use crate::config::Settings;

/// Delete one extension attribute
pub async fn execute(settings: &Settings, id: i64, mobile: bool, force: bool) -> anyhow::Result<()> {
    let scope = if mobile {
        AttributeScope::MobileDevice
    } else {
        AttributeScope::Computer
    };
    let credentials = settings.credentials()?;

    if !force {
        print!("Delete {scope} extension attribute {id}? [y/N] ");
        io::stdout().flush()?;
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let client = ApiClient::new(settings.options.timeout).context("Failed to build HTTP client")?;
    let mut session = Session::new(client, credentials);
    let token = session.token().await.context("Authentication failed")?;

    let url = endpoint(session.base_url(), &format!("JSSResource/{}/id/{id}", scope.resource()))?;
    session.client().delete(&url, &token).await?;
    tracing::info!(%scope, id, "extension attribute deleted");

    println!("Deleted {scope} extension attribute {id}");
    Ok(())
}

//! `eaudit scan`

use anyhow::Context;
use eaudit_scanner::{ApiClient, ScanResult, Scanner, Session, Status};

use crate::config::Settings;

/// Run a scan and print the report
pub async fn execute(settings: &Settings, include_mobile: bool, json: bool) -> anyhow::Result<()> {
    let credentials = settings.credentials()?;
    let client = ApiClient::new(settings.options.timeout).context("Failed to build HTTP client")?;
    let mut session = Session::new(client, credentials);
    let scanner = Scanner::for_session(&session).with_options(settings.options);

    let progress = |message: &str| eprintln!("{message}");
    let result = scanner
        .authenticate_and_run(&mut session, include_mobile, &progress)
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_report(&result);
    }

    if let Some(warning) = &result.warning {
        eprintln!("\nWarning: {warning}");
    }
    Ok(())
}

fn print_report(result: &ScanResult) {
    if result.attributes.is_empty() {
        println!("No extension attributes found.");
        return;
    }

    println!("{:<8} {:<14} {:<16} NAME", "ID", "SCOPE", "STATUS");
    for attribute in &result.attributes {
        println!(
            "{:<8} {:<14} {:<16} {}",
            attribute.id,
            attribute.scope.to_string(),
            attribute.status().to_string(),
            attribute.name
        );
        for dependency in attribute.dependencies() {
            println!(
                "{:<40} - {} #{}: {}",
                "", dependency.kind, dependency.source_id, dependency.source_name
            );
        }
    }

    println!("\nSummary:");
    println!("  In use:          {}", result.count(Status::InUse));
    println!("  Orphaned:        {}", result.count(Status::Orphaned));
    println!("  Safe to remove:  {}", result.count(Status::Safe));
    println!("  Total:           {}", result.attributes.len());

    let removable: Vec<String> = result.removable().map(|a| a.id.to_string()).collect();
    if !removable.is_empty() {
        println!("\nRemovable attribute ids: {}", removable.join(", "));
    }
}

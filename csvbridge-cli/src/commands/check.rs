//! Check command - verify connection and default context

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

use csvbridge_core::ports::AccountingApi;
use csvbridge_core::services::PseudoTransactionProcessor;

use super::{get_context, select_profile};
use crate::output;

#[derive(Serialize)]
struct CheckReport {
    url: String,
    version: String,
    api_version: String,
    default_account: Option<String>,
    default_currency: String,
    tasks: Vec<&'static str>,
}

pub fn run(profile: Option<&str>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let client = ctx.client()?;

    let default_account = match profile {
        Some(_) => select_profile(&ctx, profile)?.1.default_account,
        None => None,
    };

    let about = client.about()?;
    let processor =
        PseudoTransactionProcessor::new(&client, &ctx.config.transaction_tasks, default_account)?;

    let report = CheckReport {
        url: ctx.config.connection.url.clone(),
        version: about.version,
        api_version: about.api_version,
        default_account: processor
            .default_account()
            .map(|a| format!("{} (#{})", a.name, a.id)),
        default_currency: processor.default_currency().code.clone(),
        tasks: processor.task_names(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    output::success(&format!("Connected to {}", report.url));
    println!("  Firefly III {} (API {})", report.version, report.api_version);
    match &report.default_account {
        Some(account) => println!("  Default account: {}", account),
        None => println!("  Default account: {}", "none".dimmed()),
    }
    println!("  Default currency: {}", report.default_currency);
    println!("  Tasks: {}", report.tasks.join(", "));

    Ok(())
}

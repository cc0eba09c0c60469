//! Import command - send a CSV file to Firefly III

use std::path::Path;

use anyhow::Result;
use colored::Colorize;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};

use super::{get_context, select_profile};
use crate::output;

pub fn run(
    file: &Path,
    profile: Option<&str>,
    default_account: Option<i64>,
    preview: bool,
    yes: bool,
    json: bool,
) -> Result<()> {
    let ctx = get_context()?;
    let (profile_name, mut profile) = select_profile(&ctx, profile)?;
    if default_account.is_some() {
        profile.default_account = default_account;
    }
    let client = ctx.client()?;

    let interactive = atty::is(atty::Stream::Stdin) && atty::is(atty::Stream::Stdout);
    if !preview && !yes && !json && interactive {
        println!(
            "\nImporting {} with profile '{}' into {}",
            file.display().to_string().bold(),
            profile_name,
            ctx.config.connection.url
        );
        if !Confirm::new()
            .with_prompt("Submit the transactions?")
            .default(true)
            .interact()?
        {
            println!("{}\n", "Cancelled".dimmed());
            return Ok(());
        }
    }

    let bar = if json || preview {
        ProgressBar::hidden()
    } else {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} lines {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar
    };
    let result = ctx
        .import_service
        .import(&client, file, &profile, preview, &|done, total| {
            bar.set_length(total as u64);
            bar.set_position(done as u64);
        });
    bar.finish_and_clear();
    let result = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    if preview {
        println!("{}", "PREVIEW MODE - Nothing submitted".yellow());
        println!();

        let mut table = output::create_table();
        table.set_header(vec![
            "Line", "Type", "Date", "Amount", "Description", "Source", "Destination",
        ]);
        for tx in &result.transactions {
            table.add_row(vec![
                tx.line.to_string(),
                tx.transaction_type.clone(),
                tx.date.clone().unwrap_or_else(|| "-".to_string()),
                match (&tx.amount, &tx.currency) {
                    (Some(amount), Some(currency)) => format!("{} {}", amount, currency),
                    (Some(amount), None) => amount.clone(),
                    _ => "-".to_string(),
                },
                tx.description.clone(),
                tx.source.clone(),
                tx.destination.clone(),
            ]);
        }
        println!("{}", table);
        println!("\n{} lines converted", result.lines);
        output::print_line_problems(&result);
        return Ok(());
    }

    output::success(&format!("Imported {}", result.file_name));
    println!("  Lines read: {}", result.lines);
    println!("  Submitted: {}", result.submitted);
    if result.duplicates > 0 {
        println!("  Skipped: {} (imported before)", result.duplicates);
    }
    if result.failed > 0 {
        println!("  Failed: {}", result.failed.to_string().red());
    }
    if let Some(run_id) = &result.run_id {
        println!("  Run: {}", run_id.dimmed());
    }
    output::print_line_problems(&result);

    Ok(())
}

//! Runs command - list recent import runs

use anyhow::Result;

use super::get_context;
use crate::output;

pub fn run(limit: usize, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let runs = ctx.journal.recent_runs(limit)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&runs)?);
        return Ok(());
    }

    if runs.is_empty() {
        println!("No imports yet.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec![
        "Run", "File", "Started", "Lines", "Submitted", "Skipped", "Failed",
    ]);
    for run in &runs {
        table.add_row(vec![
            run.run_id.clone(),
            run.file_name.clone(),
            run.started_at.format("%Y-%m-%d %H:%M").to_string(),
            run.stats.lines.to_string(),
            run.stats.submitted.to_string(),
            run.stats.duplicates.to_string(),
            run.stats.failed.to_string(),
        ]);
    }
    println!("{}", table);

    Ok(())
}

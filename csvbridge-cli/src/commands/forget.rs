//! Forget command - drop a run from the journal

use anyhow::Result;
use colored::Colorize;
use dialoguer::Confirm;

use super::get_context;
use crate::output;

pub fn run(run_id: &str, yes: bool) -> Result<()> {
    let ctx = get_context()?;

    if !yes {
        println!(
            "\n{}",
            format!("Lines recorded by run {} will be importable again.", run_id).yellow()
        );
        println!("{}\n", "Transactions already in Firefly III are not touched.".dimmed());

        if !Confirm::new()
            .with_prompt("Are you sure?")
            .default(false)
            .interact()?
        {
            println!("{}\n", "Cancelled".dimmed());
            return Ok(());
        }
    }

    let lines = ctx.journal.forget_run(run_id)?;
    output::success(&format!("Forgot run {} ({} lines)", run_id, lines));

    Ok(())
}

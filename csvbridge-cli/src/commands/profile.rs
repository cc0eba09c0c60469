//! Profile command - show import profiles

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use super::{get_context, select_profile};
use crate::output;

#[derive(Subcommand)]
pub enum ProfileCommands {
    /// List configured profiles
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one profile
    Show {
        /// Profile name
        name: String,
    },
}

pub fn run(command: ProfileCommands) -> Result<()> {
    let ctx = get_context()?;

    match command {
        ProfileCommands::List { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(&ctx.config.profiles)?);
                return Ok(());
            }
            if ctx.config.profiles.is_empty() {
                println!("No import profiles configured.");
                return Ok(());
            }

            let mut table = output::create_table();
            table.set_header(vec!["Name", "Default account", "Delimiter", "Columns"]);
            for (name, profile) in &ctx.config.profiles {
                table.add_row(vec![
                    name.clone(),
                    profile
                        .default_account
                        .map(|id| id.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    format!("{:?}", profile.delimiter).to_lowercase(),
                    profile.roles.len().to_string(),
                ]);
            }
            println!("{}", table);
        }
        ProfileCommands::Show { name } => {
            let (name, profile) = select_profile(&ctx, Some(&name))?;
            println!("{}", name.green());
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
    }

    Ok(())
}

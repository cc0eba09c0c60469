//! Detect command - suggest column roles for a CSV file

use std::path::Path;

use anyhow::{bail, Result};

use csvbridge_core::config::Delimiter;
use csvbridge_core::services::{ColumnRole, CsvOptions};

use super::get_context;
use crate::output;

pub fn run(file: &Path, delimiter: &str, has_headers: bool, json: bool) -> Result<()> {
    let delimiter = match delimiter.to_lowercase().as_str() {
        "comma" | "," => Delimiter::Comma,
        "semicolon" | ";" => Delimiter::Semicolon,
        "tab" | "\\t" => Delimiter::Tab,
        other => bail!("Unknown delimiter '{}' (use comma, semicolon or tab)", other),
    };

    let ctx = get_context()?;
    let options = CsvOptions {
        delimiter,
        has_headers,
    };
    let inspection = ctx.import_service.inspect(file, options, true)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&inspection)?);
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["#", "Header", "Suggested role", "Example"]);
    for (i, role) in inspection.roles.iter().enumerate() {
        table.add_row(vec![
            i.to_string(),
            inspection.headers.get(i).cloned().unwrap_or_default(),
            output::role_name(*role),
            inspection
                .sample
                .first()
                .and_then(|row| row.get(i))
                .cloned()
                .unwrap_or_default(),
        ]);
    }
    println!("{}", table);

    if !inspection.roles.iter().any(|r| *r != ColumnRole::Ignore) {
        output::warning("No roles could be suggested; fill them in by hand.");
    }

    let roles: Vec<String> = inspection.roles.iter().map(|r| output::role_name(*r)).collect();
    println!();
    output::info("Profile roles for settings.json:");
    println!("  \"roles\": {}", serde_json::to_string(&roles)?);

    Ok(())
}

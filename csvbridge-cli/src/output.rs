//! Output formatting utilities

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, ContentArrangement, Table};
use csvbridge_core::services::{ColumnRole, ImportResult};

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// An error followed by its causes, on one line
pub fn describe_error(err: &anyhow::Error) -> String {
    format!("{:#}", err)
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{}", msg.cyan());
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Role name as written in settings.json
pub fn role_name(role: ColumnRole) -> String {
    serde_json::to_value(role)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| format!("{:?}", role))
}

/// Print line warnings and errors with their line in the file
pub fn print_line_problems(result: &ImportResult) {
    for (index, warnings) in &result.progress.warnings {
        for warning in warnings {
            println!("  {} line {}: {}", "warning".yellow(), result.file_line(*index), warning);
        }
    }
    for (index, errors) in &result.progress.errors {
        for error in errors {
            println!("  {} line {}: {}", "error".red(), result.file_line(*index), error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_describe_error_keeps_cause() {
        let err = std::fs::read("/nonexistent/bank.csv")
            .context("Failed to parse bank.csv")
            .unwrap_err();
        let message = describe_error(&err);
        assert!(message.starts_with("Failed to parse bank.csv: "));
        assert!(message.len() > "Failed to parse bank.csv: ".len());
    }
}

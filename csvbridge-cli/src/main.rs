//! csvbridge CLI - import bank CSV exports into Firefly III

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod logger;
mod output;

use commands::{check, detect, forget, import, profile, runs};

/// csvbridge - import bank CSV exports into Firefly III
#[derive(Parser)]
#[command(name = "csvbridge", version, about, long_about = None)]
struct Cli {
    /// Diagnostics level written to stderr (error, warn, info, debug, trace).
    /// Without it RUST_LOG is used, then "warn".
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a CSV file
    Import {
        /// Path to CSV file
        file: PathBuf,
        /// Import profile from settings.json
        #[arg(long)]
        profile: Option<String>,
        /// Asset account ID used when a line names none
        #[arg(long)]
        default_account: Option<i64>,
        /// Convert lines without submitting anything
        #[arg(long)]
        preview: bool,
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check the connection and the default account and currency
    Check {
        /// Profile whose default account should be checked
        #[arg(long)]
        profile: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Suggest column roles for a CSV file
    Detect {
        /// Path to CSV file
        file: PathBuf,
        /// Column delimiter (comma, semicolon, tab)
        #[arg(long, default_value = "comma")]
        delimiter: String,
        /// The file has no header line
        #[arg(long)]
        no_headers: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show import profiles
    Profile {
        #[command(subcommand)]
        command: profile::ProfileCommands,
    },

    /// List recent import runs
    Runs {
        /// Number of runs to show
        #[arg(long, default_value_t = 10)]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Forget an import run so its lines can be imported again
    Forget {
        /// Run ID as shown by `csvbridge runs`
        run_id: String,
        /// Skip confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = cli.log_level.as_deref().unwrap_or(logger::DEFAULT_LEVEL);
    if let Err(e) = logger::init(level, cli.log_level.is_some()) {
        output::error(&output::describe_error(&e));
        return ExitCode::FAILURE;
    }

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&output::describe_error(&e));
            tracing::debug!("{:?}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Import {
            file,
            profile,
            default_account,
            preview,
            yes,
            json,
        } => import::run(&file, profile.as_deref(), default_account, preview, yes, json),
        Commands::Check { profile, json } => check::run(profile.as_deref(), json),
        Commands::Detect {
            file,
            delimiter,
            no_headers,
            json,
        } => detect::run(&file, &delimiter, !no_headers, json),
        Commands::Profile { command } => profile::run(command),
        Commands::Runs { limit, json } => runs::run(limit, json),
        Commands::Forget { run_id, yes } => forget::run(&run_id, yes),
    }
}

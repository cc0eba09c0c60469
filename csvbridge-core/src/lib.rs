//! csvbridge core - CSV import into a Firefly III instance
//!
//! This crate follows a hexagonal layout:
//!
//! - **domain**: Plain entities (Account, PseudoTransaction, etc.)
//! - **ports**: Trait definitions for external dependencies (AccountingApi)
//! - **services**: The import pipeline (reader, mapper, tasks, processor, submitter)
//! - **adapters**: Concrete implementations (Firefly III over HTTP, DuckDB journal)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;

use adapters::firefly::FireflyClient;
use adapters::journal::ImportJournal;
use config::Config;
use services::ImportService;

// Re-export commonly used types at crate root
pub use config::ImportProfile;
pub use domain::result::Error;
pub use domain::{Account, PseudoTransaction, TransactionCurrency};
pub use ports::AccountingApi;

const JOURNAL_FILE: &str = "journal.duckdb";

/// Main context for csvbridge operations
///
/// Holds the configuration, the journal and the import service for one
/// csvbridge directory. The API client is built on demand since most
/// read-only commands never talk to the server.
pub struct BridgeContext {
    pub dir: PathBuf,
    pub config: Config,
    pub journal: Arc<ImportJournal>,
    pub import_service: ImportService,
}

impl BridgeContext {
    /// Open the csvbridge directory, creating it when missing
    pub fn new(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let config = Config::load(dir)?;
        let journal = Arc::new(ImportJournal::open(&dir.join(JOURNAL_FILE))?);
        let import_service = ImportService::new(
            dir.to_path_buf(),
            Arc::clone(&journal),
            config.transaction_tasks.clone(),
        );

        Ok(Self {
            dir: dir.to_path_buf(),
            config,
            journal,
            import_service,
        })
    }

    /// Build a client from the connection settings
    pub fn client(&self) -> Result<FireflyClient> {
        Ok(FireflyClient::new(&self.config.connection)?)
    }
}

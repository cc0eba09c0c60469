//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on one step of the import pipeline.

pub mod import;
pub mod mapper;
pub mod migration;
pub mod processor;
pub mod progress;
pub mod reader;
pub mod storage;
pub mod submitter;
pub mod tasks;

pub use import::{FileInspection, ImportResult, ImportService, TransactionPreview};
pub use mapper::{ColumnRole, MappedLine, RoleMapper};
pub use migration::{MigrationResult, MigrationService};
pub use processor::PseudoTransactionProcessor;
pub use progress::ProgressInformation;
pub use reader::{CsvOptions, CsvReader};
pub use storage::StorageService;
pub use submitter::{ProcessedLine, SubmissionResult, SubmitOptions, Submitter};
pub use tasks::{Task, TaskContext, TaskKind};

//! Import service - CSV file to accounting API
//!
//! One import: store the upload, read and map it, run the tasks, then either
//! return a preview or submit every line and record the run in the journal.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use fs2::FileExt;
use serde::Serialize;

use crate::adapters::journal::{ImportJournal, RunStats};
use crate::config::ImportProfile;
use crate::domain::{AccountRef, PseudoTransaction};
use crate::ports::AccountingApi;
use crate::services::mapper::{detect_roles, ColumnRole, RoleMapper};
use crate::services::processor::PseudoTransactionProcessor;
use crate::services::progress::ProgressInformation;
use crate::services::reader::{reader_from_bytes, reader_from_storage, CsvOptions};
use crate::services::storage::StorageService;
use crate::services::submitter::{ProcessedLine, SubmitOptions, Submitter};
use crate::services::tasks::TaskKind;

const LOCK_FILE: &str = ".import.lock";
const SAMPLE_ROWS: usize = 3;

/// Outcome of an import or preview
#[derive(Debug, Serialize)]
pub struct ImportResult {
    /// Journal run ID; absent for previews
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    pub file_name: String,
    /// Data lines read from the file
    pub lines: usize,
    pub submitted: usize,
    pub duplicates: usize,
    pub failed: usize,
    /// Whether this was a preview (nothing submitted)
    pub preview: bool,
    /// Converted lines (only in preview mode)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub transactions: Vec<TransactionPreview>,
    pub progress: ProgressInformation,
    /// File line number for each data line index in `progress`
    pub line_numbers: BTreeMap<usize, u64>,
}

impl ImportResult {
    /// File line of a data line index
    pub fn file_line(&self, index: usize) -> u64 {
        self.line_numbers
            .get(&index)
            .copied()
            .unwrap_or(index as u64 + 1)
    }
}

/// One converted line as shown in a preview
#[derive(Debug, Clone, Serialize)]
pub struct TransactionPreview {
    /// Line of the file the transaction came from
    pub line: u64,
    #[serde(rename = "type")]
    pub transaction_type: String,
    pub date: Option<String>,
    pub amount: Option<String>,
    pub currency: Option<String>,
    pub description: String,
    pub source: String,
    pub destination: String,
}

impl TransactionPreview {
    fn from_line(file_line: u64, line: &PseudoTransaction) -> Vec<Self> {
        line.transactions
            .iter()
            .map(|split| Self {
                line: file_line,
                transaction_type: split.transaction_type.to_string(),
                date: split.date.map(|d| d.format("%Y-%m-%d").to_string()),
                amount: split.amount.map(|a| a.normalize().to_string()),
                currency: split.currency_code.clone(),
                description: split.description.clone().unwrap_or_default(),
                source: describe_account(&split.source),
                destination: describe_account(&split.destination),
            })
            .collect()
    }
}

/// Headers, suggested roles and a few rows of a CSV file
#[derive(Debug, Serialize)]
pub struct FileInspection {
    pub headers: Vec<String>,
    pub roles: Vec<ColumnRole>,
    pub sample: Vec<Vec<String>>,
}

/// Import service
pub struct ImportService {
    dir: PathBuf,
    storage: StorageService,
    journal: Arc<ImportJournal>,
    task_kinds: Vec<TaskKind>,
}

impl ImportService {
    pub fn new(dir: PathBuf, journal: Arc<ImportJournal>, task_kinds: Vec<TaskKind>) -> Self {
        Self {
            storage: StorageService::new(&dir),
            dir,
            journal,
            task_kinds,
        }
    }

    /// Import a CSV file
    ///
    /// With `preview` the lines are converted but nothing is submitted and
    /// no run is recorded. `on_line` reports submission progress.
    pub fn import(
        &self,
        api: &dyn AccountingApi,
        file: &Path,
        profile: &ImportProfile,
        preview: bool,
        on_line: &dyn Fn(usize, usize),
    ) -> Result<ImportResult> {
        let _lock = self.acquire_lock()?;

        let bytes = std::fs::read(file)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.display().to_string());

        let upload = self.storage.store_content(&bytes)?;
        let result = self.import_stored(api, &upload, &file_name, profile, preview, on_line);
        if let Err(e) = self.storage.delete_content(&upload) {
            tracing::warn!("could not remove stored upload {}: {}", upload, e);
        }
        result
    }

    fn import_stored(
        &self,
        api: &dyn AccountingApi,
        upload: &str,
        file_name: &str,
        profile: &ImportProfile,
        preview: bool,
        on_line: &dyn Fn(usize, usize),
    ) -> Result<ImportResult> {
        let mut reader = reader_from_storage(
            &self.storage,
            upload,
            profile.convert_encoding,
            CsvOptions::from(profile),
        )?;
        let mapper = RoleMapper::new(profile)?;
        let mapped = mapper
            .map_reader(&mut reader)
            .with_context(|| format!("Failed to parse {}", file_name))?;

        let line_numbers: BTreeMap<usize, u64> =
            mapped.iter().map(|line| (line.index, line.line)).collect();
        let mut progress = ProgressInformation::new();
        for line in &mapped {
            for warning in &line.warnings {
                progress.add_warning(line.index, warning.clone());
            }
        }

        let processor =
            PseudoTransactionProcessor::new(api, &self.task_kinds, profile.default_account)?;

        let (meta, transactions): (Vec<_>, Vec<_>) = mapped
            .into_iter()
            .map(|line| ((line.index, line.fingerprint), line.transaction))
            .unzip();
        let processed: Vec<ProcessedLine> = meta
            .into_iter()
            .zip(processor.process_pseudo(transactions))
            .map(|((index, fingerprint), transaction)| ProcessedLine {
                index,
                fingerprint,
                transaction,
            })
            .collect();

        if preview {
            return Ok(ImportResult {
                run_id: None,
                file_name: file_name.to_string(),
                lines: processed.len(),
                submitted: 0,
                duplicates: 0,
                failed: 0,
                preview: true,
                transactions: processed
                    .iter()
                    .flat_map(|line| {
                        let file_line = line_numbers.get(&line.index).copied().unwrap_or_default();
                        TransactionPreview::from_line(file_line, &line.transaction)
                    })
                    .collect(),
                progress,
                line_numbers,
            });
        }

        let run_id = self.journal.start_run(file_name)?;
        let submission = Submitter::new(api, &self.journal, SubmitOptions::from(profile))
            .submit(&run_id, &processed, on_line);

        let stats = RunStats {
            lines: processed.len() as i64,
            submitted: submission.submitted as i64,
            duplicates: submission.duplicates as i64,
            failed: submission.failed as i64,
        };
        self.journal.finish_run(&run_id, &stats)?;
        progress.merge(submission.progress);

        Ok(ImportResult {
            run_id: Some(run_id),
            file_name: file_name.to_string(),
            lines: processed.len(),
            submitted: submission.submitted,
            duplicates: submission.duplicates,
            failed: submission.failed,
            preview: false,
            transactions: Vec::new(),
            progress,
            line_numbers,
        })
    }

    /// Read headers and sample rows and suggest column roles
    pub fn inspect(&self, file: &Path, options: CsvOptions, convert: bool) -> Result<FileInspection> {
        let bytes = std::fs::read(file)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        let mut reader = reader_from_bytes(&bytes, convert, options)?;

        let headers: Vec<String> = if options.has_headers {
            reader.headers()?.iter().map(|h| h.to_string()).collect()
        } else {
            Vec::new()
        };

        let mut sample = Vec::new();
        for record in reader.records().take(SAMPLE_ROWS) {
            sample.push(record?.iter().map(|f| f.to_string()).collect::<Vec<_>>());
        }

        let roles = if headers.is_empty() {
            let width = sample.first().map(Vec::len).unwrap_or(0);
            vec![ColumnRole::Ignore; width]
        } else {
            detect_roles(&headers)
        };

        Ok(FileInspection {
            headers,
            roles,
            sample,
        })
    }

    pub fn journal(&self) -> &ImportJournal {
        &self.journal
    }

    fn acquire_lock(&self) -> Result<File> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(LOCK_FILE);
        let file = File::create(&path)
            .with_context(|| format!("Failed to create lock file {}", path.display()))?;
        if file.try_lock_exclusive().is_err() {
            bail!("Another import is already running ({} is locked)", path.display());
        }
        Ok(file)
    }
}

fn describe_account(side: &AccountRef) -> String {
    if let Some(id) = side.id {
        return match side.name.as_deref() {
            Some(name) => format!("{} (#{})", name, id),
            None => format!("#{}", id),
        };
    }
    side.name
        .clone()
        .or_else(|| side.iban.clone())
        .or_else(|| side.number.clone())
        .unwrap_or_default()
}

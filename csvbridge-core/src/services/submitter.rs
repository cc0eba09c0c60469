//! Submitter - sends processed lines to the accounting API
//!
//! Lines are submitted one by one. A line that fails is recorded as an
//! error for that line and the batch carries on.

use serde::Serialize;

use crate::adapters::journal::ImportJournal;
use crate::config::ImportProfile;
use crate::domain::PseudoTransaction;
use crate::ports::AccountingApi;
use crate::services::progress::ProgressInformation;

/// Submission flags taken from the import profile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitOptions {
    pub ignore_duplicate_lines: bool,
    pub error_if_duplicate_hash: bool,
    pub apply_rules: bool,
}

impl From<&ImportProfile> for SubmitOptions {
    fn from(profile: &ImportProfile) -> Self {
        Self {
            ignore_duplicate_lines: profile.ignore_duplicate_lines,
            error_if_duplicate_hash: profile.error_if_duplicate_hash,
            apply_rules: profile.apply_rules,
        }
    }
}

/// A processed line ready to be sent
#[derive(Debug, Clone)]
pub struct ProcessedLine {
    pub index: usize,
    pub fingerprint: String,
    pub transaction: PseudoTransaction,
}

/// Outcome of a batch
#[derive(Debug, Clone, Default, Serialize)]
pub struct SubmissionResult {
    pub submitted: usize,
    pub duplicates: usize,
    pub failed: usize,
    /// Line index and the group ID the API assigned
    pub created: Vec<(usize, i64)>,
    pub progress: ProgressInformation,
}

/// Submits lines and keeps the journal in sync
pub struct Submitter<'a> {
    api: &'a dyn AccountingApi,
    journal: &'a ImportJournal,
    options: SubmitOptions,
}

impl<'a> Submitter<'a> {
    pub fn new(api: &'a dyn AccountingApi, journal: &'a ImportJournal, options: SubmitOptions) -> Self {
        Self {
            api,
            journal,
            options,
        }
    }

    /// Submit all lines for a run
    ///
    /// `on_line` is called after each line with the number of lines handled
    /// so far and the total. Every failure, API or journal, stays with its
    /// line so the counters always describe what reached the server.
    pub fn submit(
        &self,
        run_id: &str,
        lines: &[ProcessedLine],
        on_line: &dyn Fn(usize, usize),
    ) -> SubmissionResult {
        let mut result = SubmissionResult::default();
        let total = lines.len();

        for (done, line) in lines.iter().enumerate() {
            self.submit_line(run_id, line, &mut result);
            on_line(done + 1, total);
        }

        tracing::info!(
            "submitted {} lines ({} duplicates, {} failed)",
            result.submitted,
            result.duplicates,
            result.failed
        );
        result
    }

    fn submit_line(&self, run_id: &str, line: &ProcessedLine, result: &mut SubmissionResult) {
        if self.options.ignore_duplicate_lines {
            match self.journal.has_line(&line.fingerprint) {
                Ok(true) => {
                    tracing::debug!("line {} was imported before, skipping", line.index + 1);
                    result.duplicates += 1;
                    result.progress.add_warning(
                        line.index,
                        "This line was imported before and has been skipped.",
                    );
                    return;
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::error!("journal lookup for line {} failed: {:#}", line.index + 1, e);
                    result.failed += 1;
                    result.progress.add_error(
                        line.index,
                        format!("Could not check the journal for this line: {:#}", e),
                    );
                    return;
                }
            }
        }

        let request = match line
            .transaction
            .to_request(self.options.error_if_duplicate_hash, self.options.apply_rules)
        {
            Ok(request) => request,
            Err(e) => {
                result.failed += 1;
                result.progress.add_error(line.index, e.to_string());
                return;
            }
        };

        match self.api.store_transaction(&request) {
            Ok(stored) => {
                result.submitted += 1;
                result.created.push((line.index, stored.group_id));
                result.progress.add_message(
                    line.index,
                    format!("Created transaction group #{}.", stored.group_id),
                );
                if let Err(e) = self
                    .journal
                    .record_line(&line.fingerprint, run_id, Some(stored.group_id))
                {
                    tracing::error!("journal write for line {} failed: {:#}", line.index + 1, e);
                    result.progress.add_error(
                        line.index,
                        format!(
                            "Transaction group #{} was created but could not be recorded in the journal: {:#}",
                            stored.group_id, e
                        ),
                    );
                }
            }
            Err(e) => {
                tracing::warn!("line {} was rejected: {}", line.index + 1, e);
                result.failed += 1;
                result.progress.add_error(line.index, e.to_string());
            }
        }
    }
}

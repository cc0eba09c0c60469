//! Per-line progress collected during an import

use std::collections::BTreeMap;

use serde::Serialize;

/// Messages, warnings and errors keyed by line index
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProgressInformation {
    pub messages: BTreeMap<usize, Vec<String>>,
    pub warnings: BTreeMap<usize, Vec<String>>,
    pub errors: BTreeMap<usize, Vec<String>>,
}

impl ProgressInformation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_message(&mut self, index: usize, message: impl Into<String>) {
        self.messages.entry(index).or_default().push(message.into());
    }

    pub fn add_warning(&mut self, index: usize, warning: impl Into<String>) {
        self.warnings.entry(index).or_default().push(warning.into());
    }

    pub fn add_error(&mut self, index: usize, error: impl Into<String>) {
        self.errors.entry(index).or_default().push(error.into());
    }

    /// Append everything from `other`
    pub fn merge(&mut self, other: ProgressInformation) {
        for (target, source) in [
            (&mut self.messages, other.messages),
            (&mut self.warnings, other.warnings),
            (&mut self.errors, other.errors),
        ] {
            for (index, entries) in source {
                target.entry(index).or_default().extend(entries);
            }
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.values().map(Vec::len).sum()
    }

    pub fn error_count(&self) -> usize {
        self.errors.values().map(Vec::len).sum()
    }
}

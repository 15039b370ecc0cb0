use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::finding::ValidateStatus;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecordIdentifier {
    /// Row number to info text of invalid rows
    pub critical: BTreeMap<usize, String>,
    pub warning: BTreeMap<usize, String>,
}

/// Per file row counts written to the job meta.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetrics {
    pub total_data_count: usize,
    pub invalid_count: usize,
    pub warning_count: usize,
    pub valid_count: usize,
    pub record_identifier: RecordIdentifier,
}

impl FileMetrics {
    pub fn record(&mut self, row: usize, status: ValidateStatus, info: &str) {
        self.total_data_count += 1;
        match status {
            ValidateStatus::Invalid => {
                self.invalid_count += 1;
                self.record_identifier.critical.insert(row, info.to_string());
            }
            ValidateStatus::Warning => {
                self.warning_count += 1;
                self.record_identifier.warning.insert(row, info.to_string());
            }
            ValidateStatus::Valid => self.valid_count += 1,
        }
    }
}

/// Job level outcome written under `navianceStatus` when the step finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompletionStatus {
    TestingCompleted,
    TestingCompletedWithAlerts,
    CriticalError,
    ImportInProgress,
}

impl CompletionStatus {
    /// A later step still has to import the data unless this one found invalid rows.
    pub fn from_outcome(worst: ValidateStatus, is_last_step: bool) -> Self {
        if !is_last_step && worst != ValidateStatus::Invalid {
            return CompletionStatus::ImportInProgress;
        }
        match worst {
            ValidateStatus::Valid => CompletionStatus::TestingCompleted,
            ValidateStatus::Warning => CompletionStatus::TestingCompletedWithAlerts,
            ValidateStatus::Invalid => CompletionStatus::CriticalError,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CompletionStatus::TestingCompleted => "TESTING_COMPLETED",
            CompletionStatus::TestingCompletedWithAlerts => "TESTING_COMPLETED_WITH_ALERTS",
            CompletionStatus::CriticalError => "CRITICAL_ERROR",
            CompletionStatus::ImportInProgress => "IMPORT_IN_PROGRESS",
        }
    }
}

impl fmt::Display for CompletionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::config::Comparator;

/// Row verdict. Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ValidateStatus {
    #[default]
    Valid,
    Warning,
    Invalid,
}

impl ValidateStatus {
    /// Most severe of the two wins.
    pub fn merge(self, other: ValidateStatus) -> ValidateStatus {
        self.max(other)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ValidateStatus::Valid => "valid",
            ValidateStatus::Warning => "warning",
            ValidateStatus::Invalid => "invalid",
        }
    }
}

impl fmt::Display for ValidateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single rule violation found while validating a row.
///
/// The display text is what ends up in the info column, joined with `"; "`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Finding {
    #[error("Missing required column {column}")]
    MissingRequiredColumn { column: String },

    #[error("Invalid Value for {column}")]
    InvalidValue {
        column: String,
        severity: ValidateStatus,
    },

    #[error("Column {column} cannot be blank")]
    Blank {
        column: String,
        severity: ValidateStatus,
    },

    #[error("Column {column} should be valid format")]
    InvalidFormat { column: String },

    #[error("Column {column} should be of type {}", .types.join(", "))]
    TypeAcceptedWithWarning { column: String, types: Vec<String> },

    #[error("Column {column} must be of type {}", .types.join(", "))]
    TypeMismatch { column: String, types: Vec<String> },

    #[error(
        "Column {column} must be {} the Column {compare_field} and must be of type {}",
        comparator_relation(.comparator),
        .types.join(", ")
    )]
    ComparisonMismatch {
        column: String,
        comparator: Comparator,
        compare_field: String,
        types: Vec<String>,
    },

    #[error("Value {} for {column} is below the minimum of {}", number_text(.value), number_text(.limit))]
    BelowMinimum { column: String, value: f64, limit: f64 },

    #[error("Value {} for {column} is above the maximum of {}", number_text(.value), number_text(.limit))]
    AboveMaximum { column: String, value: f64, limit: f64 },

    #[error("Value for {column} is missing for range limit {setter}")]
    MissingLevelLimit { column: String, setter: String },

    #[error("Column {column} exceeds the maximum length of {max_length}")]
    MaxLengthExceeded { column: String, max_length: usize },
}

impl Finding {
    pub fn severity(&self) -> ValidateStatus {
        match self {
            Finding::InvalidValue { severity, .. } | Finding::Blank { severity, .. } => *severity,
            Finding::TypeAcceptedWithWarning { .. } => ValidateStatus::Warning,
            _ => ValidateStatus::Invalid,
        }
    }
}

fn comparator_relation(comparator: &Comparator) -> String {
    match comparator {
        Comparator::Equal => "equal to".to_string(),
        Comparator::Greater => "greater than".to_string(),
        Comparator::GreaterEq => "greater than or equal to".to_string(),
        Comparator::Lesser => "lesser than".to_string(),
        Comparator::LesserEq => "lesser than or equal to".to_string(),
        Comparator::Unknown(tag) => tag.clone(),
    }
}

fn number_text(value: &f64) -> String {
    format_number(*value)
}

/// Render a number the way the rule authors write it: no trailing `.0` on whole values.
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e21 {
        return format!("{}", value as i128);
    }
    value.to_string()
}

/// Diagnostics and running status for the row currently being validated.
#[derive(Debug, Default, Clone)]
pub struct RowValidationState {
    pub findings: Vec<Finding>,
    pub status: ValidateStatus,
}

impl RowValidationState {
    pub fn record(&mut self, finding: Finding) {
        self.status = self.status.merge(finding.severity());
        self.findings.push(finding);
    }

    pub fn info(&self) -> String {
        self.findings
            .iter()
            .map(|finding| finding.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }

    pub fn is_invalid(&self) -> bool {
        self.status == ValidateStatus::Invalid
    }
}

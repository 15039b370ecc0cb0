#![allow(clippy::needless_return, non_snake_case)]

pub mod checkers;
pub mod config;
mod engine;
pub mod error;
pub mod finding;
pub mod flow;
pub mod host;
pub mod metrics;
pub mod reader;
pub mod schema;
pub mod utils;

// Test utilities - only compiled when testing or with test feature
// #[cfg(test)] alone doesn't work for integration tests (they're external crates)
// The feature flag makes it available to integration tests via dev-dependencies
#[cfg(any(test, feature = "test"))]
pub mod test_utils;

pub use config::{ColumnRule, FileValidateConfig, ValidateParameters};
pub use engine::{FileHeaders, FileValidationSession, RowInput, RowOutput, Validator, build_headers};
pub use error::{ConfigurationError, ValidateError, ValidateResult};
pub use finding::{Finding, RowValidationState, ValidateStatus};
pub use flow::{FileInfo, JobContext};
pub use host::{InputRegistration, OutputRegistration, StepHost};
pub use metrics::{CompletionStatus, FileMetrics};

pub const ERRORS_LOG_FILE: &str = "errors.log";

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use crate::utils::get_utc_iso_datetime;

/// Append a timestamped report to an errors log file
///
/// # Arguments
/// * `log_path` - Log file to append to (usually [`crate::ERRORS_LOG_FILE`])
/// * `error_type` - A description of the error type/category (e.g., "Validation Configuration Error")
/// * `error_message` - The actual error message content
pub fn write_error_to_log(log_path: impl AsRef<Path>, error_type: &str, error_message: &str) {
    let timestamp = get_utc_iso_datetime();
    let log_entry = format!("\n[{}] {}:\n{}\n", timestamp, error_type, error_message);

    if let Ok(mut file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path.as_ref())
    {
        let _ = writeln!(file, "{}", log_entry);
    } else {
        tracing::warn!(path = %log_path.as_ref().display(), "could not open errors log");
    }
}

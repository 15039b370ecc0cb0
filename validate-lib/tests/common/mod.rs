use serde_json::{Value, json};

// Re-export shared test utilities from src/test_utils.rs
pub use validate_lib::test_utils::{
    RecordingHost, create_validator, default_job, run_file, single_step_job, strings,
};

// =============================================================================
// Parameter fixtures
// =============================================================================

/// Column rules of the users file
#[allow(dead_code)]
pub fn users_columns() -> Value {
    json!({
        "integration_id": { "required": true, "validTypes": ["string"], "invalidIfBlank": true },
        "family_name": { "required": true, "validTypes": ["string"], "invalidIfBlank": true },
        "middle_name": { "required": false, "validTypes": ["string"] },
        "given_name": { "required": true, "validTypes": ["string"] },
        "email": { "required": true, "validTypes": ["email"], "warnIfBlank": true },
        "secondary_email": {
            "required": false,
            "validTypes": ["email"],
            "warnIfNotValidValue": true
        },
        "user_id": { "required": true, "validTypes": ["string"], "invalidIfBlank": true },
        "gender": {
            "required": false,
            "validTypes": ["string"],
            "validValues": ["M", "F", "U", "MALE", "FEMALE", "UNKNOWN"],
            "caseInSensitive": true
        },
        "available_ind": {
            "required": true,
            "validTypes": ["integer"],
            "invalidIfBlank": true,
            "validValues": ["1", "0"]
        }
    })
}

/// Users file with the log appended to the data file
#[allow(dead_code)]
pub fn users_log_in_data_parameters() -> Value {
    json!({
        "multipleFileConfig": true,
        "fileValidateConfig": {
            "users": {
                "columns": users_columns(),
                "includeDataInLog": true,
                "includeLogInData": true,
                "discardInvalidRows": false
            }
        }
    })
}

/// Users file with a separate log that carries every data column
#[allow(dead_code)]
pub fn users_separate_log_parameters(discard_invalid_rows: bool) -> Value {
    json!({
        "validateConfig": {
            "columns": users_columns(),
            "includeDataInLog": true,
            "discardInvalidRows": discard_invalid_rows
        }
    })
}

#[allow(dead_code)]
pub const USERS_HEADERS: [&str; 7] = [
    "integration_id",
    "family_name",
    "given_name",
    "email",
    "user_id",
    "available_ind",
    "secondary_email",
];

/// A users row with the given email and available_ind values
#[allow(dead_code)]
pub fn users_row(email: &str, available_ind: &str) -> Vec<String> {
    strings(&[
        "Yolanda.Gold",
        "goldnew",
        "yolandanew",
        email,
        "ygold_test",
        available_ind,
        email,
    ])
}

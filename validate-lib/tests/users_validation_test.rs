use validate_lib::{RowInput, ValidateStatus, Validator};

mod common;
use common::*;

fn validator_with_header(parameters: &serde_json::Value) -> (Validator, RecordingHost) {
    let mut validator = create_validator(parameters);
    let mut host = RecordingHost::default();
    validator
        .validate(&RowInput::header("users", strings(&USERS_HEADERS)), &mut host)
        .unwrap();
    (validator, host)
}

fn users_input(raw: Vec<String>) -> RowInput {
    RowInput::record(2, "users", &strings(&USERS_HEADERS), raw)
}

#[test]
fn test_invalid_emails_are_reported_in_the_data_file() {
    let (mut validator, mut host) = validator_with_header(&users_log_in_data_parameters());

    let result = validator
        .validate(&users_input(users_row("testusernewgmail.com", "1")), &mut host)
        .unwrap();

    assert!(result.error);
    assert_eq!(result.outputs.len(), 1);
    let mut expected = users_row("testusernewgmail.com", "1");
    expected.push("invalid".to_string());
    expected.push(
        "Column email must be of type email; Column secondary_email must be of type email".to_string(),
    );
    assert_eq!(result.outputs["usersValidated"], expected);
}

#[test]
fn test_header_row_shapes_outputs() {
    let mut validator = create_validator(&users_log_in_data_parameters());
    let mut host = RecordingHost::default();

    let header = validator
        .validate(&RowInput::header("users", strings(&USERS_HEADERS)), &mut host)
        .unwrap();

    assert!(!header.error);
    let mut expected = strings(&USERS_HEADERS);
    expected.extend(strings(&["Validation_Status", "Validation_Info"]));
    assert_eq!(header.outputs["usersValidated"], expected);
    assert!(!header.outputs.contains_key("log"));
}

#[test]
fn test_valid_row_goes_to_data_and_log() {
    let (mut validator, mut host) = validator_with_header(&users_separate_log_parameters(true));

    let result = validator
        .validate(&users_input(users_row("testusernew@gmail.com", "1")), &mut host)
        .unwrap();

    assert!(!result.error);
    assert_eq!(result.outputs["usersValidated"], users_row("testusernew@gmail.com", "1"));

    let mut log = vec!["2".to_string()];
    log.extend(users_row("testusernew@gmail.com", "1"));
    log.extend(strings(&["valid", ""]));
    assert_eq!(result.outputs["log"], log);
}

#[test]
fn test_invalid_value_is_discarded_but_logged() {
    let (mut validator, mut host) = validator_with_header(&users_separate_log_parameters(true));

    let result = validator
        .validate(&users_input(users_row("testusernew@gmail.com", "12345")), &mut host)
        .unwrap();

    assert!(result.error);
    assert!(!result.outputs.contains_key("usersValidated"));
    let log = &result.outputs["log"];
    assert_eq!(log[log.len() - 2], "invalid");
    assert_eq!(log[log.len() - 1], "Invalid Value for available_ind");
}

#[test]
fn test_invalid_rows_are_kept_without_discard() {
    let (mut validator, mut host) = validator_with_header(&users_separate_log_parameters(false));

    let result = validator
        .validate(&users_input(users_row("testusernew@gmail.com", "12345")), &mut host)
        .unwrap();

    assert!(result.error);
    assert_eq!(
        result.outputs["usersValidated"],
        users_row("testusernew@gmail.com", "12345")
    );
}

#[test]
fn test_not_valid_value_can_be_a_warning() {
    let parameters = serde_json::json!({
        "validateConfig": {
            "columns": {
                "available_ind": {
                    "required": true,
                    "validTypes": ["integer"],
                    "validValues": ["1", "0"],
                    "warnIfNotValidValue": true
                }
            }
        }
    });
    let mut validator = create_validator(&parameters);
    let mut host = RecordingHost::default();

    let outputs = run_file(&mut validator, &mut host, "users", &["available_ind"], &[&["12345"]]).unwrap();

    assert!(!outputs[1].error);
    assert_eq!(outputs[1].outputs["log"], strings(&["2", "12345", "warning", "Invalid Value for available_ind"]));
}

#[test]
fn test_warning_values_and_blank_policy() {
    let parameters = serde_json::json!({
        "validateConfig": {
            "columns": {
                "role": {
                    "validValues": ["STUDENT", "INSTRUCTOR"],
                    "validWithWarningValues": ["TA"],
                    "invalidIfBlank": true
                },
                "phone": { "validTypes": ["string"], "warnIfBlank": true }
            },
            "logHeaders": ["role", "phone"]
        }
    });
    let mut validator = create_validator(&parameters);
    let mut host = RecordingHost::default();

    let outputs = run_file(
        &mut validator,
        &mut host,
        "users",
        &["role", "phone"],
        &[&["TA", "555"], &["STUDENT", ""], &["", "555"]],
    )
    .unwrap();

    assert_eq!(
        outputs[0].outputs["log"],
        strings(&["Row", "role", "phone", "Validation_Status", "Validation_Info"])
    );
    assert_eq!(outputs[1].outputs["log"], strings(&["2", "TA", "555", "warning", "Invalid Value for role"]));
    assert_eq!(
        outputs[2].outputs["log"],
        strings(&["3", "STUDENT", "", "warning", "Column phone cannot be blank"])
    );
    assert_eq!(outputs[3].outputs["log"], strings(&["4", "", "555", "invalid", "Invalid Value for role"]));
}

#[test]
fn test_case_insensitive_valid_values() {
    let mut validator = create_validator(&users_separate_log_parameters(false));
    let mut host = RecordingHost::default();
    let mut headers = USERS_HEADERS.to_vec();
    headers.push("Gender");

    let outputs = run_file(
        &mut validator,
        &mut host,
        "users",
        &headers,
        &[
            &["Yolanda.Gold", "goldnew", "yolandanew", "a@b.co", "ygold", "0", "", "FeMale"],
            &["Yolanda.Gold", "goldnew", "yolandanew", "a@b.co", "ygold", "0", "", "other"],
        ],
    )
    .unwrap();

    assert!(!outputs[1].error);
    assert!(outputs[2].error);
    assert_eq!(outputs[2].outputs["log"].last().unwrap(), "Invalid Value for gender");
}

#[test]
fn test_missing_required_columns() {
    let mut validator = create_validator(&users_separate_log_parameters(false));
    let mut host = RecordingHost::default();

    let outputs = run_file(
        &mut validator,
        &mut host,
        "users",
        &["integration_id", "family_name", "given_name", "email", "user_id"],
        &[&["Yolanda.Gold", "goldnew", "yolandanew", "", "ygold_test"]],
    )
    .unwrap();

    let log = &outputs[1].outputs["log"];
    assert_eq!(log[log.len() - 2], "invalid");
    assert_eq!(
        log[log.len() - 1],
        "Column email cannot be blank; Column email must be of type email; Missing required column available_ind"
    );
    assert_eq!(
        validator.session("users").unwrap().worst_status,
        ValidateStatus::Invalid
    );
}

#[test]
fn test_column_lookup_ignores_case() {
    let parameters = serde_json::json!({
        "validateConfig": {
            "columns": { "email": { "required": true, "validTypes": ["email"] } }
        }
    });
    let mut validator = create_validator(&parameters);
    let mut host = RecordingHost::default();

    let outputs = run_file(&mut validator, &mut host, "users", &["EMAIL"], &[&["first.last@school.edu"]]).unwrap();

    assert!(!outputs[1].error);
    assert_eq!(outputs[1].outputs["log"], strings(&["2", "first.last@school.edu", "valid", ""]));
}

#[test]
fn test_max_length() {
    let parameters = serde_json::json!({
        "validateConfig": {
            "columns": { "code": { "validTypes": ["string"], "maxlength": 4 } }
        }
    });
    let mut validator = create_validator(&parameters);
    let mut host = RecordingHost::default();

    let outputs =
        run_file(&mut validator, &mut host, "codes", &["code"], &[&["ABCD"], &["ABCDE"]]).unwrap();

    assert!(!outputs[1].error);
    assert_eq!(
        outputs[2].outputs["log"],
        strings(&["3", "ABCDE", "invalid", "Column code exceeds the maximum length of 4"])
    );
}

#[test]
fn test_zero_max_length_is_not_a_limit() {
    let parameters = serde_json::json!({
        "validateConfig": {
            "columns": { "code": { "validTypes": ["string"], "maxlength": 0 } }
        }
    });
    let mut validator = create_validator(&parameters);
    let mut host = RecordingHost::default();

    let outputs =
        run_file(&mut validator, &mut host, "codes", &["code"], &[&["ABCDE"], &[""]]).unwrap();

    assert!(!outputs[1].error);
    assert!(!outputs[2].error);
}

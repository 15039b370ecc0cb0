use chrono::{NaiveDateTime, Utc};
use serde_json::{Map, Value, json};
use std::collections::{BTreeMap, HashMap};

use crate::checkers::{CompareOperand, LevelMemo, TypeCheck, check_range};
use crate::config::{CURRENT_DATE, ColumnRule, FileValidateConfig, ValidateParameters};
use crate::error::{ConfigurationError, ValidateError, ValidateResult};
use crate::finding::{Finding, RowValidationState, ValidateStatus};
use crate::flow::{
    FileInfo, JobContext, StepNames, bucket_from_input, file_name_from_input, file_path_from_input,
};
use crate::host::{InputRegistration, OutputDetails, OutputRegistration, StepHost, StorageLocation};
use crate::metrics::{CompletionStatus, FileMetrics};
use crate::schema::apply_schema_columns;
use crate::utils::find_case_insensitive;

/// One row handed to the validate step. Row 1 is the header row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowInput {
    pub index: usize,
    /// Logical name of the input file
    pub name: String,
    pub raw: Vec<String>,
    /// Cell values keyed by header; empty for the header row
    pub data: BTreeMap<String, String>,
    pub file_info: Option<FileInfo>,
}

impl RowInput {
    pub fn header(name: &str, headers: Vec<String>) -> Self {
        RowInput {
            index: 1,
            name: name.to_string(),
            raw: headers,
            ..Default::default()
        }
    }

    /// Data row keyed by `headers`. Cells past the last header are kept in `raw` only.
    pub fn record(index: usize, name: &str, headers: &[String], raw: Vec<String>) -> Self {
        let data = headers.iter().cloned().zip(raw.iter().cloned()).collect();
        RowInput {
            index,
            name: name.to_string(),
            raw,
            data,
            file_info: None,
        }
    }

    pub fn with_file_info(mut self, file_info: FileInfo) -> Self {
        self.file_info = Some(file_info);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowOutput {
    /// The row is invalid
    pub error: bool,
    /// Output name to record
    pub outputs: BTreeMap<String, Vec<String>>,
}

/// Data and log headers of a file, fixed by its header row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileHeaders {
    pub data: Vec<String>,
    pub log: Vec<String>,
}

/// Derive the data and log headers from the header row.
pub fn build_headers(config: &FileValidateConfig, header_row: &[String]) -> FileHeaders {
    let status_name = config.status_column_name().to_string();
    let info_name = config.info_column_name().to_string();

    let mut data = header_row.to_vec();
    if config.include_log_in_data {
        data.push(status_name.clone());
        data.push(info_name.clone());
    }

    let log = if let Some(custom) = &config.log_headers {
        let mut log = custom.clone();
        if !log.iter().any(|header| header == "Row") {
            log.insert(0, "Row".to_string());
        }
        for name in [status_name, info_name] {
            if !log.contains(&name) {
                log.push(name);
            }
        }
        log
    } else if config.include_data_in_log {
        let mut log = vec!["Row".to_string()];
        log.extend(header_row.iter().cloned());
        log.extend([status_name, info_name]);
        log
    } else {
        vec![
            "Row".to_string(),
            header_row.first().cloned().unwrap_or_default(),
            status_name,
            info_name,
        ]
    };

    FileHeaders { data, log }
}

/// State kept for one input file between row calls.
#[derive(Debug, Clone, Default)]
pub struct FileValidationSession {
    /// Name used for outputs and metrics, recovered from the input key with dynamic output
    pub file_name: String,
    pub headers: FileHeaders,
    pub levels: LevelMemo,
    pub metrics: FileMetrics,
    pub worst_status: ValidateStatus,
}

impl FileValidationSession {
    pub fn start(config: &FileValidateConfig, file_name: &str, header_row: &[String]) -> Self {
        FileValidationSession {
            file_name: file_name.to_string(),
            headers: build_headers(config, header_row),
            levels: LevelMemo::new(config.columns.level_setters()),
            metrics: FileMetrics::default(),
            worst_status: ValidateStatus::Valid,
        }
    }

    fn header_output(&self, config: &FileValidateConfig, data_output_name: &str) -> RowOutput {
        let mut outputs = BTreeMap::new();
        outputs.insert(data_output_name.to_string(), self.headers.data.clone());
        for log_name in config.log_output_names() {
            outputs.insert(log_name, self.headers.log.clone());
        }
        RowOutput {
            error: false,
            outputs,
        }
    }

    fn validate_row(
        &mut self,
        config: &FileValidateConfig,
        data_output_name: &str,
        input: &RowInput,
    ) -> RowOutput {
        self.levels.refresh(&input.data);
        let now = Utc::now().naive_utc();

        let mut state = RowValidationState::default();
        for rule in config.columns.iter() {
            validate_column(rule, input, now, &self.levels, &mut state);
        }

        let status = state.status;
        let info = state.info();
        let mut outputs = BTreeMap::new();

        if !(state.is_invalid() && config.discard_invalid_rows) {
            let mut data_row = input.raw.clone();
            if config.include_log_in_data {
                data_row.push(status.to_string());
                data_row.push(info.clone());
            }
            outputs.insert(data_output_name.to_string(), data_row);
        }

        let log_row = self.log_row(config, input, status, &info);
        for log_name in config.log_output_names() {
            outputs.insert(log_name, log_row.clone());
        }

        self.metrics.record(input.index, status, &info);
        self.worst_status = self.worst_status.merge(status);
        tracing::debug!(
            file = %self.file_name,
            row = input.index,
            status = %status,
            "row validated"
        );

        RowOutput {
            error: state.is_invalid(),
            outputs,
        }
    }

    fn log_row(
        &self,
        config: &FileValidateConfig,
        input: &RowInput,
        status: ValidateStatus,
        info: &str,
    ) -> Vec<String> {
        let mut by_header: HashMap<&str, String> = HashMap::new();
        by_header.insert("Row", input.index.to_string());
        by_header.insert(config.status_column_name(), status.to_string());
        by_header.insert(config.info_column_name(), info.to_string());
        for (header, value) in self.headers.data.iter().zip(&input.raw) {
            by_header.insert(header.as_str(), value.clone());
        }

        self.headers
            .log
            .iter()
            .map(|header| by_header.get(header.as_str()).cloned().unwrap_or_default())
            .collect()
    }
}

fn valid_value_matches(rule: &ColumnRule, value: &str) -> bool {
    let Some(valid_values) = &rule.valid_values else {
        return true;
    };
    if value.is_empty() && !rule.invalid_if_blank {
        return true;
    }
    if rule.case_in_sensitive {
        let wanted = value.to_uppercase();
        valid_values.iter().any(|valid| valid.to_uppercase() == wanted)
    } else {
        valid_values.iter().any(|valid| valid == value)
    }
}

fn compare_operand<'a>(
    rule: &ColumnRule,
    input: &'a RowInput,
    now: NaiveDateTime,
) -> Option<CompareOperand<'a>> {
    let field = rule.compare_field.as_deref()?;
    if field == CURRENT_DATE {
        return Some(CompareOperand::Now(now));
    }
    let value = find_case_insensitive(&input.data, field).map(String::as_str);
    Some(CompareOperand::Value(value.unwrap_or_default()))
}

/// Run every check of one column and record the findings on the row.
fn validate_column(
    rule: &ColumnRule,
    input: &RowInput,
    now: NaiveDateTime,
    levels: &LevelMemo,
    state: &mut RowValidationState,
) {
    let column = rule.name.as_str();
    let Some(value) = find_case_insensitive(&input.data, column) else {
        if rule.required {
            state.record(Finding::MissingRequiredColumn {
                column: column.to_string(),
            });
        }
        return;
    };

    let valid_value = valid_value_matches(rule, value);
    let warning_value = rule
        .valid_with_warning_values
        .as_ref()
        .is_some_and(|values| values.iter().any(|warning| warning == value));
    if !valid_value {
        let severity = if warning_value || rule.warn_if_not_valid_value {
            ValidateStatus::Warning
        } else {
            ValidateStatus::Invalid
        };
        state.record(Finding::InvalidValue {
            column: column.to_string(),
            severity,
        });
        return;
    }

    if value.is_empty() {
        if rule.invalid_if_blank {
            state.record(Finding::Blank {
                column: column.to_string(),
                severity: ValidateStatus::Invalid,
            });
        } else if rule.warn_if_blank {
            state.record(Finding::Blank {
                column: column.to_string(),
                severity: ValidateStatus::Warning,
            });
        }
    }

    let mut check = TypeCheck::new(rule, compare_operand(rule, input, now));
    let mut valid_type = check.accepts_any(value);
    if check.format_breached() {
        state.record(Finding::InvalidFormat {
            column: column.to_string(),
        });
    }

    // The fallback retries validTypes and only downgrades a later success to a warning
    if !valid_type && !rule.valid_with_warning_types.is_empty() {
        valid_type = check.accepts_any(value);
        if valid_type {
            state.record(Finding::TypeAcceptedWithWarning {
                column: column.to_string(),
                types: rule.type_names(),
            });
        }
    }

    if !valid_type {
        if !check.format_breached() {
            let finding = match (&rule.comparator, &rule.compare_field) {
                (Some(comparator), Some(compare_field)) => Finding::ComparisonMismatch {
                    column: column.to_string(),
                    comparator: comparator.clone(),
                    compare_field: compare_field.clone(),
                    types: rule.type_names(),
                },
                _ => Finding::TypeMismatch {
                    column: column.to_string(),
                    types: rule.type_names(),
                },
            };
            state.record(finding);
        }
        return;
    }

    if let Some(range) = &rule.range {
        let number = value.trim().parse::<f64>().ok().filter(|number| number.is_finite());
        let depends_on = rule.depends_on.as_deref();
        if let Some(finding) = check_range(column, number, range, depends_on, levels) {
            state.record(finding);
        }
    }

    if let Some(max_length) = rule.max_length.filter(|max_length| *max_length > 0) {
        if value.chars().count() > max_length {
            state.record(Finding::MaxLengthExceeded {
                column: column.to_string(),
                max_length,
            });
        }
    }
}

/// The validate step: configured once, then fed rows of one or more files.
#[derive(Debug)]
pub struct Validator {
    parameters: ValidateParameters,
    steps: StepNames,
    sessions: BTreeMap<String, FileValidationSession>,
}

impl Validator {
    /// Check and load the step parameters and resolve the neighbouring steps.
    pub fn before_validate(
        parameters: &Value,
        job: &JobContext,
    ) -> Result<Self, ConfigurationError> {
        let mut parameters = ValidateParameters::from_value(parameters)?;
        if parameters.multiple_file_config && parameters.file_validate_config.is_empty() {
            return Err(ConfigurationError::MissingFileValidateConfig);
        }
        if !parameters.multiple_file_config && parameters.validate_config.is_none() {
            return Err(ConfigurationError::MissingValidateConfig);
        }

        apply_schema_columns(&mut parameters)?;
        for config in parameters.file_configs() {
            config.validate()?;
        }

        let steps = StepNames::resolve(job);
        tracing::info!(
            step = %steps.current,
            previous = steps.previous.as_deref().unwrap_or(""),
            next = steps.next.as_deref().unwrap_or(""),
            multiple_files = parameters.multiple_file_config,
            "validate step configured"
        );

        Ok(Validator {
            parameters,
            steps,
            sessions: BTreeMap::new(),
        })
    }

    pub fn parameters(&self) -> &ValidateParameters {
        &self.parameters
    }

    pub fn steps(&self) -> &StepNames {
        &self.steps
    }

    pub fn session(&self, name: &str) -> Option<&FileValidationSession> {
        self.sessions.get(name)
    }

    /// Validate one row. Rows of a file must arrive in ascending order, header first.
    pub fn validate(
        &mut self,
        input: &RowInput,
        host: &mut dyn StepHost,
    ) -> ValidateResult<RowOutput> {
        let config = self.parameters.file_config(&input.name)?;
        let file_name = if self.parameters.dynamic_output {
            file_name_from_input(
                &input.name,
                input.file_info.as_ref(),
                &self.steps.job_out_file_extension,
            )
        } else {
            input.name.clone()
        };
        let data_output_name = self.steps.data_output_name(&file_name);

        if input.index == 1 {
            register_dynamic_files(&self.parameters, &self.steps, &file_name, input, host)?;
            let session = FileValidationSession::start(config, &file_name, &input.raw);
            let output = session.header_output(config, &data_output_name);
            self.sessions.insert(input.name.clone(), session);
            return Ok(output);
        }

        let session = self
            .sessions
            .get_mut(&input.name)
            .ok_or_else(|| ValidateError::HeaderNotSeen {
                index: input.index,
                file: input.name.clone(),
            })?;

        Ok(session.validate_row(config, &data_output_name, input))
    }

    /// Worst row status over every file seen by this step.
    pub fn worst_status(&self) -> ValidateStatus {
        self.sessions
            .values()
            .fold(ValidateStatus::Valid, |worst, session| worst.merge(session.worst_status))
    }

    /// Write the per file metrics and the completion status to the job meta.
    pub fn after_validate(&self, host: &mut dyn StepHost) -> ValidateResult<CompletionStatus> {
        if self.parameters.write_error_data_to_job_meta {
            let mut by_file = Map::new();
            for session in self.sessions.values() {
                by_file.insert(session.file_name.clone(), serde_json::to_value(&session.metrics)?);
            }

            let mut processors = match host.meta_value("processors") {
                Some(Value::Object(existing)) => existing,
                _ => Map::new(),
            };
            processors.insert("validate".to_string(), Value::Object(by_file));
            host.set_meta_value("processors", Value::Object(processors))
                .map_err(ValidateError::Host)?;
        }

        let status = CompletionStatus::from_outcome(self.worst_status(), self.steps.is_last_step);
        host.set_meta_value("navianceStatus", json!(status.as_str()))
            .map_err(ValidateError::Host)?;
        tracing::info!(status = %status, files = self.sessions.len(), "validate step finished");

        Ok(status)
    }
}

fn register_dynamic_files(
    parameters: &ValidateParameters,
    steps: &StepNames,
    file_name: &str,
    input: &RowInput,
    host: &mut dyn StepHost,
) -> ValidateResult<()> {
    let output_name = steps.data_output_name(file_name);

    if parameters.dynamic_output {
        let key = format!("{}{}.csv", file_path_from_input(input.file_info.as_ref()), output_name);
        host.create_output(OutputRegistration {
            name: output_name.clone(),
            details: OutputDetails {
                name: output_name.clone(),
                storage: StorageLocation {
                    key,
                    bucket: bucket_from_input(input.file_info.as_ref()),
                },
            },
        })
        .map_err(ValidateError::Host)?;
    }

    if let (true, Some(next_step)) = (parameters.dynamic_input, &steps.next) {
        host.create_input(InputRegistration {
            name: format!("{}->{}", output_name, input.name),
            step: next_step.clone(),
        })
        .map_err(ValidateError::Host)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(value: Value) -> FileValidateConfig {
        serde_json::from_value(value).unwrap()
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_default_log_headers_carry_first_column() {
        let headers = build_headers(&config(json!({ "columns": {} })), &strings(&["id", "email"]));
        assert_eq!(headers.data, strings(&["id", "email"]));
        assert_eq!(
            headers.log,
            strings(&["Row", "id", "Validation_Status", "Validation_Info"])
        );
    }

    #[test]
    fn test_custom_log_headers_are_completed_once() {
        let config = config(json!({
            "columns": {},
            "logHeaders": ["email", "Status"],
            "validStatusColumnName": "Status"
        }));
        let headers = build_headers(&config, &strings(&["id", "email"]));
        assert_eq!(headers.log, strings(&["Row", "email", "Status", "Validation_Info"]));
    }

    #[test]
    fn test_log_in_data_extends_data_headers() {
        let config = config(json!({ "columns": {}, "includeLogInData": true, "includeDataInLog": true }));
        let headers = build_headers(&config, &strings(&["id"]));
        assert_eq!(headers.data, strings(&["id", "Validation_Status", "Validation_Info"]));
        assert_eq!(headers.log, strings(&["Row", "id", "Validation_Status", "Validation_Info"]));
        assert!(config.log_output_names().is_empty());
    }

    #[test]
    fn test_valid_value_case_folding() {
        let rule: ColumnRule = serde_json::from_value(json!({
            "validValues": ["Male", "Female"],
            "caseInSensitive": true
        }))
        .unwrap();
        assert!(valid_value_matches(&rule, "FeMale"));
        assert!(valid_value_matches(&rule, ""));
        assert!(!valid_value_matches(&rule, "other"));

        let strict = ColumnRule {
            case_in_sensitive: false,
            invalid_if_blank: true,
            ..rule
        };
        assert!(!valid_value_matches(&strict, "FeMale"));
        assert!(!valid_value_matches(&strict, ""));
    }
}

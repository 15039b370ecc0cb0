use once_cell::sync::Lazy;
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::ConfigurationError;

pub const DEFAULT_STATUS_COLUMN: &str = "Validation_Status";
pub const DEFAULT_INFO_COLUMN: &str = "Validation_Info";
/// Compare-field sentinel meaning "now"
pub const CURRENT_DATE: &str = "current_date";

//////////////////////////////////////////////////////////////
///  Tags
//////////////////////////////////////////////////////////////

/// Value type a column may hold. Unrecognized tags are kept and never match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "String")]
pub enum TypeTag {
    String,
    Integer,
    Decimal,
    Boolean,
    Datetime,
    Email,
    Unknown(String),
}

impl From<String> for TypeTag {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "string" => TypeTag::String,
            "integer" => TypeTag::Integer,
            "decimal" => TypeTag::Decimal,
            "boolean" => TypeTag::Boolean,
            "datetime" => TypeTag::Datetime,
            "email" => TypeTag::Email,
            _ => TypeTag::Unknown(tag),
        }
    }
}

impl TypeTag {
    pub fn as_str(&self) -> &str {
        match self {
            TypeTag::String => "string",
            TypeTag::Integer => "integer",
            TypeTag::Decimal => "decimal",
            TypeTag::Boolean => "boolean",
            TypeTag::Datetime => "datetime",
            TypeTag::Email => "email",
            TypeTag::Unknown(tag) => tag,
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text shape a datetime column must follow.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "String")]
pub enum DateFormat {
    /// `YYYY-MM-DD`
    IsoDate,
    /// `YYYY-MM-DD HH:MM:SS`
    IsoDateTime,
    /// `HH:MM A` (12-hour clock)
    Time12Hour,
    /// `YYYYMMDD`
    CompactDate,
    /// `YYYYMM`
    YearMonth,
    /// `YYYY`
    Year,
    Unknown(String),
}

impl From<String> for DateFormat {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "YYYY-MM-DD" => DateFormat::IsoDate,
            "YYYY-MM-DD HH:MM:SS" => DateFormat::IsoDateTime,
            "HH:MM A" | "HH:MM AM/PM" => DateFormat::Time12Hour,
            "YYYYMMDD" => DateFormat::CompactDate,
            "YYYYMM" => DateFormat::YearMonth,
            "YYYY" => DateFormat::Year,
            _ => DateFormat::Unknown(tag),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "String")]
pub enum Comparator {
    Equal,
    Greater,
    GreaterEq,
    Lesser,
    LesserEq,
    Unknown(String),
}

impl From<String> for Comparator {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "eq" => Comparator::Equal,
            "gt" => Comparator::Greater,
            "gtEq" | "gte" => Comparator::GreaterEq,
            "lt" => Comparator::Lesser,
            "ltEq" | "lte" => Comparator::LesserEq,
            _ => Comparator::Unknown(tag),
        }
    }
}

//////////////////////////////////////////////////////////////
///  Column rules
//////////////////////////////////////////////////////////////

/// A range limit: either a literal, or a limit per level of the `dependsOn` column.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RangeLimit {
    Value(f64),
    ByLevel(BTreeMap<String, f64>),
}

impl RangeLimit {
    pub fn is_by_level(&self) -> bool {
        matches!(self, RangeLimit::ByLevel(_))
    }
}

/// Both keys must be present; a limit written as `null` counts as `0`.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeRule {
    #[serde(default, deserialize_with = "limit_or_zero")]
    pub min_val: Option<RangeLimit>,
    #[serde(default, deserialize_with = "limit_or_zero")]
    pub max_val: Option<RangeLimit>,
}

fn limit_or_zero<'de, D>(deserializer: D) -> Result<Option<RangeLimit>, D::Error>
where
    D: Deserializer<'de>,
{
    let limit: Option<RangeLimit> = Option::deserialize(deserializer)?;
    Ok(Some(limit.unwrap_or(RangeLimit::Value(0.0))))
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ColumnRule {
    /// Filled from the key of the `columns` map
    #[serde(skip)]
    pub name: String,
    pub required: bool,
    pub valid_types: Vec<TypeTag>,
    pub valid_with_warning_types: Vec<TypeTag>,
    #[serde(deserialize_with = "scalar_texts")]
    pub valid_values: Option<Vec<String>>,
    pub warn_if_not_valid_value: bool,
    #[serde(deserialize_with = "scalar_texts")]
    pub valid_with_warning_values: Option<Vec<String>>,
    pub invalid_if_blank: bool,
    pub warn_if_blank: bool,
    pub date_time_format: Option<Vec<DateFormat>>,
    pub case_in_sensitive: bool,
    pub compare_field: Option<String>,
    pub comparator: Option<Comparator>,
    #[serde(rename = "maxlength")]
    pub max_length: Option<usize>,
    /// Per type limit: fractional digits for `decimal`, characters for `string`
    pub max_length_valid_range: Option<BTreeMap<String, usize>>,
    pub range: Option<RangeRule>,
    pub depends_on: Option<String>,
}

impl ColumnRule {
    pub fn new(name: &str) -> Self {
        ColumnRule {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn type_names(&self) -> Vec<String> {
        self.valid_types.iter().map(|t| t.to_string()).collect()
    }

    pub fn format_limit_for(&self, type_tag: &TypeTag) -> Option<usize> {
        self.max_length_valid_range
            .as_ref()
            .and_then(|limits| limits.get(type_tag.as_str()).copied())
    }
}

/// Valid values may be authored as strings, numbers or booleans; compare them as text.
pub(crate) fn scalar_texts<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let values: Option<Vec<Value>> = Option::deserialize(deserializer)?;
    Ok(values.map(|values| {
        values
            .into_iter()
            .map(|value| match value {
                Value::String(s) => s,
                Value::Null => String::new(),
                other => other.to_string(),
            })
            .collect()
    }))
}

/// Column rules in the order they were authored.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColumnRules(Vec<ColumnRule>);

impl ColumnRules {
    pub fn iter(&self) -> std::slice::Iter<'_, ColumnRule> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ColumnRule> {
        self.0.iter().find(|rule| rule.name == name)
    }

    /// Replace the rule with the same name in place, or append it.
    pub fn upsert(&mut self, rule: ColumnRule) {
        match self.0.iter_mut().find(|existing| existing.name == rule.name) {
            Some(existing) => *existing = rule,
            None => self.0.push(rule),
        }
    }

    /// Columns whose value selects a range limit for another column.
    pub fn level_setters(&self) -> BTreeSet<String> {
        self.0
            .iter()
            .filter_map(|rule| rule.depends_on.clone())
            .collect()
    }
}

impl FromIterator<ColumnRule> for ColumnRules {
    fn from_iter<I: IntoIterator<Item = ColumnRule>>(iter: I) -> Self {
        let mut rules = ColumnRules::default();
        for rule in iter {
            rules.upsert(rule);
        }
        rules
    }
}

impl<'de> Deserialize<'de> for ColumnRules {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ColumnRulesVisitor;

        impl<'de> Visitor<'de> for ColumnRulesVisitor {
            type Value = ColumnRules;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of column name to column rule")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut rules = ColumnRules::default();
                while let Some((name, mut rule)) = access.next_entry::<String, ColumnRule>()? {
                    rule.name = name;
                    rules.upsert(rule);
                }
                Ok(rules)
            }
        }

        deserializer.deserialize_map(ColumnRulesVisitor)
    }
}

//////////////////////////////////////////////////////////////
///  File and step configuration
//////////////////////////////////////////////////////////////

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FileValidateConfig {
    pub columns: ColumnRules,
    /// Drop invalid rows from the data output; they still appear in the log
    pub discard_invalid_rows: bool,
    pub valid_status_column_name: Option<String>,
    pub valid_info_column_name: Option<String>,
    /// Log rows carry every data column in addition to the log columns
    pub include_data_in_log: bool,
    /// Put the log columns in the data file instead of a separate log
    pub include_log_in_data: bool,
    pub log_headers: Option<Vec<String>>,
    pub extra_log_file: Option<String>,
}

impl FileValidateConfig {
    pub fn status_column_name(&self) -> &str {
        non_empty_or(&self.valid_status_column_name, DEFAULT_STATUS_COLUMN)
    }

    pub fn info_column_name(&self) -> &str {
        non_empty_or(&self.valid_info_column_name, DEFAULT_INFO_COLUMN)
    }

    /// Names of the log outputs: `log` unless the log lives in the data file, plus the extra log.
    pub fn log_output_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        if !self.include_log_in_data {
            names.push("log".to_string());
        }
        if let Some(extra) = self.extra_log_file.as_ref().filter(|name| !name.is_empty()) {
            names.push(extra.clone());
        }
        names
    }

    /// Check the invariants the engine relies on.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for rule in self.columns.iter() {
            if let Some(range) = &rule.range {
                let (Some(min_val), Some(max_val)) = (&range.min_val, &range.max_val) else {
                    return Err(ConfigurationError::IncompleteRange {
                        column: rule.name.clone(),
                    });
                };
                if (min_val.is_by_level() || max_val.is_by_level()) && rule.depends_on.is_none() {
                    return Err(ConfigurationError::LevelLimitWithoutSetter {
                        column: rule.name.clone(),
                    });
                }
            }

            if let Some(setter) = &rule.depends_on {
                if self.columns.get(setter).is_none() {
                    return Err(ConfigurationError::UnknownLevelSetter {
                        column: rule.name.clone(),
                        setter: setter.clone(),
                    });
                }
            }

            for type_tag in rule.valid_types.iter().chain(&rule.valid_with_warning_types) {
                if let TypeTag::Unknown(tag) = type_tag {
                    tracing::warn!(
                        column = %rule.name,
                        tag = %tag,
                        "unknown type tag never matches"
                    );
                }
            }
            for format in rule.date_time_format.iter().flatten() {
                if let DateFormat::Unknown(tag) = format {
                    tracing::warn!(
                        column = %rule.name,
                        format = %tag,
                        "unknown date format never matches"
                    );
                }
            }
            if let Some(Comparator::Unknown(tag)) = &rule.comparator {
                tracing::warn!(
                    column = %rule.name,
                    comparator = %tag,
                    "unknown comparator never holds"
                );
            }
        }

        Ok(())
    }
}

fn non_empty_or<'a>(value: &'a Option<String>, default: &'a str) -> &'a str {
    match value.as_deref() {
        Some(name) if !name.is_empty() => name,
        _ => default,
    }
}

/// Parameters handed to the validate step by the orchestrator.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateParameters {
    pub validate_config: Option<FileValidateConfig>,
    #[serde(default)]
    pub multiple_file_config: bool,
    #[serde(default)]
    pub file_validate_config: BTreeMap<String, FileValidateConfig>,
    #[serde(default)]
    pub dynamic_output: bool,
    #[serde(default)]
    pub dynamic_input: bool,
    #[serde(default)]
    pub write_error_data_to_job_meta: bool,
    #[serde(default)]
    pub json_schema_names: Vec<String>,
    /// Everything else, including the schema documents named in `jsonSchemaNames`
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ValidateParameters {
    /// Check the raw document against the parameters schema, then deserialize it.
    pub fn from_value(value: &Value) -> Result<Self, ConfigurationError> {
        check_parameters_schema(value)?;
        let parameters: ValidateParameters = serde_json::from_value(value.clone())?;
        Ok(parameters)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigurationError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(&value)
    }

    /// Rule set for the given input file.
    pub fn file_config(&self, file_name: &str) -> Result<&FileValidateConfig, ConfigurationError> {
        if self.multiple_file_config {
            return self.file_validate_config.get(file_name).ok_or_else(|| {
                ConfigurationError::MissingFileEntry {
                    file: file_name.to_string(),
                }
            });
        }
        self.validate_config
            .as_ref()
            .ok_or(ConfigurationError::MissingValidateConfig)
    }

    pub fn file_configs(&self) -> Box<dyn Iterator<Item = &FileValidateConfig> + '_> {
        if self.multiple_file_config {
            Box::new(self.file_validate_config.values())
        } else {
            Box::new(self.validate_config.iter())
        }
    }
}

//////////////////////////////////////////////////////////////
///  Parameters schema
//////////////////////////////////////////////////////////////

static PARAMETERS_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "properties": {
            "validateConfig": { "$ref": "#/definitions/fileConfig" },
            "fileValidateConfig": {
                "type": "object",
                "additionalProperties": { "$ref": "#/definitions/fileConfig" }
            },
            "multipleFileConfig": { "type": "boolean" },
            "dynamicOutput": { "type": "boolean" },
            "dynamicInput": { "type": "boolean" },
            "writeErrorDataToJobMeta": { "type": "boolean" },
            "jsonSchemaNames": { "$ref": "#/definitions/stringList" }
        },
        "definitions": {
            "stringList": { "type": "array", "items": { "type": "string" } },
            "scalarList": {
                "type": "array",
                "items": { "type": ["string", "number", "boolean", "null"] }
            },
            "limit": {
                "anyOf": [
                    { "type": "number" },
                    { "type": "null" },
                    { "type": "object", "additionalProperties": { "type": "number" } }
                ]
            },
            "column": {
                "type": "object",
                "properties": {
                    "required": { "type": "boolean" },
                    "validTypes": { "$ref": "#/definitions/stringList" },
                    "validWithWarningTypes": { "$ref": "#/definitions/stringList" },
                    "validValues": { "$ref": "#/definitions/scalarList" },
                    "warnIfNotValidValue": { "type": "boolean" },
                    "validWithWarningValues": { "$ref": "#/definitions/scalarList" },
                    "invalidIfBlank": { "type": "boolean" },
                    "warnIfBlank": { "type": "boolean" },
                    "dateTimeFormat": { "$ref": "#/definitions/stringList" },
                    "caseInSensitive": { "type": "boolean" },
                    "compareField": { "type": "string" },
                    "comparator": { "type": "string" },
                    "maxlength": { "type": "integer", "minimum": 0 },
                    "maxLengthValidRange": {
                        "type": "object",
                        "additionalProperties": { "type": "integer", "minimum": 0 }
                    },
                    "range": {
                        "type": "object",
                        "properties": {
                            "minVal": { "$ref": "#/definitions/limit" },
                            "maxVal": { "$ref": "#/definitions/limit" }
                        }
                    },
                    "dependsOn": { "type": "string" }
                }
            },
            "fileConfig": {
                "type": "object",
                "properties": {
                    "columns": {
                        "type": "object",
                        "additionalProperties": { "$ref": "#/definitions/column" }
                    },
                    "discardInvalidRows": { "type": "boolean" },
                    "validStatusColumnName": { "type": "string" },
                    "validInfoColumnName": { "type": "string" },
                    "includeDataInLog": { "type": "boolean" },
                    "includeLogInData": { "type": "boolean" },
                    "logHeaders": { "$ref": "#/definitions/stringList" },
                    "extraLogFile": { "type": "string" }
                }
            }
        }
    })
});

fn check_parameters_schema(value: &Value) -> Result<(), ConfigurationError> {
    let validator = jsonschema::validator_for(&PARAMETERS_SCHEMA)
        .map_err(|e| ConfigurationError::Malformed(format!("Invalid parameters schema: {}", e)))?;

    let errors: Vec<String> = validator
        .iter_errors(value)
        .map(|error| {
            let path = error.instance_path.to_string();
            if path.is_empty() {
                error.to_string()
            } else {
                format!("{}: {}", path, error)
            }
        })
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigurationError::Schema { errors })
    }
}

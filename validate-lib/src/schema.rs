//! Column rules generated from the schema documents named in `jsonSchemaNames`.

use serde::Deserialize;
use serde_json::Value;

use crate::config::{ColumnRule, RangeLimit, RangeRule, TypeTag, ValidateParameters, scalar_texts};
use crate::error::ConfigurationError;

/// Upper limit used when a schema field only sets `min`
pub const MAX_SAFE_INTEGER: f64 = 9007199254740991.0;

/// One field of a schema document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSchema {
    pub name: String,
    #[serde(default)]
    pub optional: bool,
    #[serde(rename = "type")]
    pub field_type: Option<String>,
    pub depends_on: Option<String>,
    #[serde(default, deserialize_with = "scalar_texts")]
    pub valid_values: Option<Vec<String>>,
    pub min: Option<RangeLimit>,
    pub max: Option<RangeLimit>,
}

fn limit_is_set(limit: &Option<RangeLimit>) -> bool {
    match limit {
        Some(RangeLimit::Value(value)) => *value != 0.0,
        Some(RangeLimit::ByLevel(_)) => true,
        None => false,
    }
}

fn schema_type(field_type: &str) -> TypeTag {
    match field_type {
        "date" => TypeTag::Datetime,
        "number" => TypeTag::Integer,
        other => TypeTag::from(other.to_string()),
    }
}

impl FieldSchema {
    pub fn to_column_rule(&self) -> ColumnRule {
        let range = (limit_is_set(&self.min) || limit_is_set(&self.max)).then(|| RangeRule {
            min_val: Some(self.min.clone().unwrap_or(RangeLimit::Value(0.0))),
            max_val: Some(self.max.clone().unwrap_or(RangeLimit::Value(MAX_SAFE_INTEGER))),
        });

        ColumnRule {
            required: !self.optional,
            valid_types: self.field_type.as_deref().map(schema_type).into_iter().collect(),
            valid_values: self.valid_values.clone(),
            depends_on: self.depends_on.clone(),
            range,
            ..ColumnRule::new(&self.name)
        }
    }
}

/// Convert every field of the named schema documents, in document order.
pub fn columns_from_schemas(
    parameters: &ValidateParameters,
) -> Result<Vec<ColumnRule>, ConfigurationError> {
    let mut rules = Vec::new();
    for schema_name in &parameters.json_schema_names {
        let Some(Value::Object(fields)) = parameters.extra.get(schema_name) else {
            return Err(ConfigurationError::MissingSchema {
                schema: schema_name.clone(),
            });
        };
        for field in fields.values() {
            let field: FieldSchema = serde_json::from_value(field.clone())?;
            rules.push(field.to_column_rule());
        }
    }
    Ok(rules)
}

/// Merge schema driven columns into `validateConfig`.
/// Schema validated files always discard invalid rows.
pub fn apply_schema_columns(parameters: &mut ValidateParameters) -> Result<(), ConfigurationError> {
    if parameters.json_schema_names.is_empty() || parameters.validate_config.is_none() {
        return Ok(());
    }

    let rules = columns_from_schemas(parameters)?;
    tracing::info!(
        schemas = parameters.json_schema_names.len(),
        columns = rules.len(),
        "merging schema columns"
    );
    if let Some(config) = parameters.validate_config.as_mut() {
        for rule in rules {
            config.columns.upsert(rule);
        }
        config.discard_invalid_rows = true;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parameters(value: Value) -> ValidateParameters {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_field_conversion() {
        let field: FieldSchema = serde_json::from_value(json!({
            "name": "Science",
            "type": "number",
            "dependsOn": "grade",
            "max": { "6": 400, "7": 433 }
        }))
        .unwrap();

        let rule = field.to_column_rule();
        assert_eq!(rule.name, "Science");
        assert!(rule.required);
        assert_eq!(rule.valid_types, vec![TypeTag::Integer]);
        assert_eq!(rule.depends_on.as_deref(), Some("grade"));
        let range = rule.range.unwrap();
        assert_eq!(range.min_val, Some(RangeLimit::Value(0.0)));
        assert!(matches!(range.max_val, Some(RangeLimit::ByLevel(_))));
    }

    #[test]
    fn test_zero_min_alone_adds_no_range() {
        let field: FieldSchema = serde_json::from_value(json!({
            "name": "start",
            "type": "date",
            "optional": true,
            "min": 0
        }))
        .unwrap();

        let rule = field.to_column_rule();
        assert!(!rule.required);
        assert_eq!(rule.valid_types, vec![TypeTag::Datetime]);
        assert!(rule.range.is_none());
    }

    #[test]
    fn test_merge_into_validate_config() {
        let mut parameters = parameters(json!({
            "validateConfig": {
                "columns": {
                    "grade": { "validTypes": ["string"] },
                    "student_id": { "required": true }
                }
            },
            "jsonSchemaNames": ["gradeSchema"],
            "gradeSchema": {
                "grade": { "name": "grade", "type": "number" },
                "gpa": { "name": "gpa", "type": "decimal", "optional": true, "min": 1, "max": 4 }
            }
        }));

        apply_schema_columns(&mut parameters).unwrap();
        let config = parameters.validate_config.unwrap();
        let names: Vec<&str> = config.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["grade", "student_id", "gpa"]);
        assert_eq!(config.columns.get("grade").unwrap().valid_types, vec![TypeTag::Integer]);
        assert!(config.discard_invalid_rows);
    }

    #[test]
    fn test_missing_schema_document() {
        let mut parameters = parameters(json!({
            "validateConfig": { "columns": {} },
            "jsonSchemaNames": ["absent"]
        }));
        assert_eq!(
            apply_schema_columns(&mut parameters).unwrap_err(),
            ConfigurationError::MissingSchema {
                schema: "absent".to_string()
            }
        );
    }
}

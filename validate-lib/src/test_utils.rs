// Test utilities available to both unit and integration tests
// Only compiled when testing

use serde_json::{Map, Value};

use crate::engine::{RowInput, RowOutput, Validator};
use crate::error::ValidateResult;
use crate::flow::JobContext;
use crate::host::{InputRegistration, OutputRegistration, StepHost};

/// Step host that remembers every request instead of provisioning anything
#[derive(Debug, Default)]
pub struct RecordingHost {
    pub outputs: Vec<OutputRegistration>,
    pub inputs: Vec<InputRegistration>,
    pub meta: Map<String, Value>,
    /// Make every provisioning request fail with this message
    pub fail_with: Option<String>,
}

impl RecordingHost {
    pub fn failing(message: &str) -> Self {
        RecordingHost {
            fail_with: Some(message.to_string()),
            ..Default::default()
        }
    }

    fn check_failure(&self) -> anyhow::Result<()> {
        match &self.fail_with {
            Some(message) => Err(anyhow::anyhow!(message.clone())),
            None => Ok(()),
        }
    }
}

impl StepHost for RecordingHost {
    fn create_output(&mut self, output: OutputRegistration) -> anyhow::Result<()> {
        self.check_failure()?;
        self.outputs.push(output);
        Ok(())
    }

    fn create_input(&mut self, input: InputRegistration) -> anyhow::Result<()> {
        self.check_failure()?;
        self.inputs.push(input);
        Ok(())
    }

    fn meta_value(&self, key: &str) -> Option<Value> {
        self.meta.get(key).cloned()
    }

    fn set_meta_value(&mut self, key: &str, value: Value) -> anyhow::Result<()> {
        self.meta.insert(key.to_string(), value);
        Ok(())
    }
}

/// A three step job with `validate` in the middle
pub fn default_job() -> JobContext {
    JobContext::new(
        vec![
            "flatfile translate".to_string(),
            "validate".to_string(),
            "upload".to_string(),
        ],
        "validate",
    )
}

/// A single step job, so `validate` is also the last step
pub fn single_step_job() -> JobContext {
    JobContext::new(vec!["validate".to_string()], "validate")
}

#[allow(dead_code)]
pub fn create_validator(parameters: &Value) -> Validator {
    Validator::before_validate(parameters, &default_job()).unwrap()
}

pub fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

/// Feed the header and data rows of one file, numbering data rows from 2
pub fn run_file(
    validator: &mut Validator,
    host: &mut RecordingHost,
    name: &str,
    headers: &[&str],
    rows: &[&[&str]],
) -> ValidateResult<Vec<RowOutput>> {
    let headers = strings(headers);
    let mut outputs = vec![validator.validate(&RowInput::header(name, headers.clone()), host)?];
    for (offset, row) in rows.iter().enumerate() {
        let input = RowInput::record(offset + 2, name, &headers, strings(row));
        outputs.push(validator.validate(&input, host)?);
    }
    Ok(outputs)
}

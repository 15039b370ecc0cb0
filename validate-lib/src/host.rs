use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StorageLocation {
    pub key: String,
    pub bucket: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputDetails {
    pub name: String,
    pub storage: StorageLocation,
}

/// A file output created at runtime for the current step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputRegistration {
    pub name: String,
    pub details: OutputDetails,
}

/// Hand an output of this step to a later step as input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputRegistration {
    pub name: String,
    pub step: String,
}

/// What the validate step needs from the job orchestrator.
pub trait StepHost {
    fn create_output(&mut self, output: OutputRegistration) -> anyhow::Result<()>;

    fn create_input(&mut self, input: InputRegistration) -> anyhow::Result<()>;

    fn meta_value(&self, key: &str) -> Option<Value>;

    fn set_meta_value(&mut self, key: &str, value: Value) -> anyhow::Result<()>;
}

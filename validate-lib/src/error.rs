use thiserror::Error;

pub type ValidateResult<T> = Result<T, ValidateError>;

/// Fatal problems with the rule configuration. These abort the file.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("Missing validateConfig in Validate-Builtin")]
    MissingValidateConfig,

    #[error("Missing fileValidateConfig in Validate-Builtin")]
    MissingFileValidateConfig,

    #[error("Missing fileValidateConfig entry for input file {file}")]
    MissingFileEntry { file: String },

    #[error("column {column} minVal or maxVal config missing in the range validation")]
    IncompleteRange { column: String },

    #[error("column {column} uses a range limit by level but has no dependsOn column")]
    LevelLimitWithoutSetter { column: String },

    #[error("column {column} depends on {setter}, which is not a configured column")]
    UnknownLevelSetter { column: String, setter: String },

    #[error("schema {schema} named in jsonSchemaNames is missing or not an object")]
    MissingSchema { schema: String },

    #[error("Invalid validate parameters:\n{}", .errors.join("\n"))]
    Schema { errors: Vec<String> },

    #[error("Invalid validate parameters: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for ConfigurationError {
    fn from(err: serde_json::Error) -> Self {
        ConfigurationError::Malformed(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum ValidateError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Failure reported by the orchestrator while provisioning dynamic outputs/inputs
    #[error("Step host request failed: {0}")]
    Host(#[source] anyhow::Error),

    #[error("Row {index} was received before the header row of file {file}")]
    HeaderNotSeen { index: usize, file: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Error reading workbook: {0}")]
    Workbook(String),

    #[error("Input file contains duplicate column headers: {}", .headers.join(", "))]
    DuplicateHeaders { headers: Vec<String> },
}

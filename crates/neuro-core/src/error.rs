//! Error types for the diagnosis pipeline.

use thiserror::Error;

/// Result type alias for diagnosis operations
pub type DiagnoseResult<T> = Result<T, DiagnoseError>;

/// Every failure that can surface from one diagnosis request.
///
/// Nothing here is retried: the orchestrator returns the first error it meets.
#[derive(Error, Debug)]
pub enum DiagnoseError {
    /// An external capability failed (audio resolution, transcription, classification, retrieval).
    #[error("Provider error: {0}")]
    Provider(String),

    /// The model asked for a tool that does not exist or sent unusable arguments.
    #[error("Tool error: {0}")]
    Tool(String),

    /// The final model output was not valid JSON.
    #[error("Malformed output: {source} (raw: {raw})")]
    MalformedOutput {
        raw: String,
        #[source]
        source: serde_json::Error,
    },

    /// Valid JSON, but a required top-level key is missing.
    #[error("Result is missing '{missing_key}'. Actual result: {actual}")]
    SchemaViolation {
        missing_key: String,
        actual: serde_json::Value,
    },

    /// All keys present, but a value breaks the typed contract (length, enum, range).
    #[error("Result field '{field}' violates the output contract: {reason}")]
    ContractViolation {
        field: String,
        reason: String,
        actual: serde_json::Value,
    },

    /// The chat completion API failed or answered with nothing usable.
    #[error("Model error: {0}")]
    Model(String),

    /// The model kept calling tools past the configured round limit.
    #[error("Tool-calling rounds exhausted after {0} rounds without a final answer")]
    ToolRoundsExhausted(usize),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl DiagnoseError {
    /// Short machine-readable kind, used in API error bodies and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            DiagnoseError::Provider(_) => "provider_error",
            DiagnoseError::Tool(_) => "tool_error",
            DiagnoseError::MalformedOutput { .. } => "malformed_output",
            DiagnoseError::SchemaViolation { .. } => "schema_violation",
            DiagnoseError::ContractViolation { .. } => "contract_violation",
            DiagnoseError::Model(_) => "model_error",
            DiagnoseError::ToolRoundsExhausted(_) => "tool_rounds_exhausted",
            DiagnoseError::Config(_) => "config_error",
        }
    }

    /// The offending result, when the error carries one.
    pub fn actual(&self) -> Option<&serde_json::Value> {
        match self {
            DiagnoseError::SchemaViolation { actual, .. }
            | DiagnoseError::ContractViolation { actual, .. } => Some(actual),
            _ => None,
        }
    }
}

//! Tool execution errors and their mapping onto the pipeline error.

use neuro_core::DiagnoseError;
use neuro_voice::VoiceError;
use thiserror::Error;

pub type ToolResult<T> = Result<T, ToolError>;

#[derive(Error, Debug)]
pub enum ToolError {
    /// Missing or mistyped argument from the model.
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// No tool registered under this name.
    #[error("Tool not available: {0}")]
    NotAvailable(String),

    /// Audio, transcription, or classification backend failed.
    #[error(transparent)]
    Voice(#[from] VoiceError),

    #[error("Retrieval failed: {0}")]
    Retrieval(String),
}

impl From<ToolError> for DiagnoseError {
    fn from(e: ToolError) -> Self {
        match e {
            ToolError::InvalidParameters(_) | ToolError::NotAvailable(_) => {
                DiagnoseError::Tool(e.to_string())
            }
            ToolError::Voice(_) | ToolError::Retrieval(_) => DiagnoseError::Provider(e.to_string()),
        }
    }
}

//! Tool contract between the orchestrator and whatever registry executes the tools.

use crate::error::DiagnoseResult;
use serde::{Deserialize, Serialize};

pub const TRANSCRIBE_TOOL: &str = "diarized_transcription_tool";
pub const CLASSIFY_TOOL: &str = "classify_neuro_status_tool";
pub const RETRIEVE_TOOL: &str = "retrieve_disease_info_tool";

/// Name, description, and JSON-schema parameters of one callable tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

impl ToolSpec {
    /// OpenAI `tools[]` entry.
    pub fn to_openai_function(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters,
            }
        })
    }
}

/// Executes tools on behalf of the orchestrator.
///
/// `execute` receives the model's raw argument value; implementations validate it and
/// return the tool's fixed-shape output. Errors propagate to the caller unchanged.
#[async_trait::async_trait]
pub trait ToolExecutor: Send + Sync {
    fn specs(&self) -> Vec<ToolSpec>;

    async fn execute(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> DiagnoseResult<serde_json::Value>;
}

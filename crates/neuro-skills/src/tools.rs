//! Diagnosis tools exposed to the chat model.
//!
//! Three fixed capabilities, each with a JSON-schema parameter block and a fixed output
//! shape:
//!
//! | Tool | Arguments | Output |
//! |------|-----------|--------|
//! | `diarized_transcription_tool` | `{audio_path}` | `{"asr_text": str}` |
//! | `classify_neuro_status_tool` | `{audio_path}` | `{"accuracy": [stroke, degenerative, normal]}` |
//! | `retrieve_disease_info_tool` | `{query}` | `{"context": str}` |
//!
//! Provider output is passed through untouched: no trimming, no normalization.

use std::sync::Arc;
use std::time::Duration;

use neuro_core::{
    DiagnoseResult, ToolExecutor, ToolSpec, CLASSIFY_TOOL, RETRIEVE_TOOL, TRANSCRIBE_TOOL,
};
use neuro_voice::{
    AudioLoader, ClassifierProvider, PlaceholderClassifier, PlaceholderTranscriber,
    TranscriptionProvider,
};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::{ToolError, ToolResult};
use crate::retrieval::{PlaceholderRetriever, RetrievalProvider};

// ---------------------------------------------------------------------------
// Tool catalogue
// ---------------------------------------------------------------------------

/// The closed set of tools the orchestrator may call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NeuroTool {
    Transcribe,
    Classify,
    Retrieve,
}

impl NeuroTool {
    pub const ALL: [NeuroTool; 3] = [NeuroTool::Transcribe, NeuroTool::Classify, NeuroTool::Retrieve];

    pub fn name(&self) -> &'static str {
        match self {
            NeuroTool::Transcribe => TRANSCRIBE_TOOL,
            NeuroTool::Classify => CLASSIFY_TOOL,
            NeuroTool::Retrieve => RETRIEVE_TOOL,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    pub fn description(&self) -> &'static str {
        match self {
            NeuroTool::Transcribe => {
                "Transcribe the whole call recording with speaker separation. Returns the \
                 transcript text exactly as produced under 'asr_text'."
            }
            NeuroTool::Classify => {
                "Score the call recording with the neuro-status voice classifier. Returns \
                 'accuracy' = [stroke, degenerative, normal] probabilities in that order."
            }
            NeuroTool::Retrieve => {
                "Look up reference material about a disease (stroke, dementia, Parkinson's, \
                 ALS) and the patient's previous screening results. Returns 'context' text."
            }
        }
    }

    pub fn parameters_schema(&self) -> Value {
        match self {
            NeuroTool::Transcribe | NeuroTool::Classify => json!({
                "type": "object",
                "properties": {
                    "audio_path": {
                        "type": "string",
                        "description": "Local path or http(s) URL of the call recording"
                    }
                },
                "required": ["audio_path"]
            }),
            NeuroTool::Retrieve => json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Disease name or question to look up"
                    }
                },
                "required": ["query"]
            }),
        }
    }

    pub fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// Required non-empty string argument.
fn string_param<'a>(params: &'a Value, key: &str) -> ToolResult<&'a str> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ToolError::InvalidParameters(format!("Missing '{}' parameter", key)))
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Binds each [`NeuroTool`] to its provider. Build one per request; providers are shared.
#[derive(Clone)]
pub struct ToolRegistry {
    loader: AudioLoader,
    transcriber: Arc<dyn TranscriptionProvider>,
    classifier: Arc<dyn ClassifierProvider>,
    retriever: Arc<dyn RetrievalProvider>,
}

impl ToolRegistry {
    pub fn new(
        loader: AudioLoader,
        transcriber: Arc<dyn TranscriptionProvider>,
        classifier: Arc<dyn ClassifierProvider>,
        retriever: Arc<dyn RetrievalProvider>,
    ) -> Self {
        Self {
            loader,
            transcriber,
            classifier,
            retriever,
        }
    }

    /// All-placeholder registry for offline runs.
    pub fn placeholder(timeout: Duration) -> ToolResult<Self> {
        Ok(Self::new(
            AudioLoader::new(timeout)?,
            Arc::new(PlaceholderTranscriber::new()),
            Arc::new(PlaceholderClassifier::default()),
            Arc::new(PlaceholderRetriever::new()),
        ))
    }

    /// Same providers, different retrieval backend (e.g. one carrying a report history).
    pub fn with_retriever(mut self, retriever: Arc<dyn RetrievalProvider>) -> Self {
        self.retriever = retriever;
        self
    }

    /// Run one tool by name.
    pub async fn run(&self, name: &str, params: &Value) -> ToolResult<Value> {
        let tool = NeuroTool::from_name(name)
            .ok_or_else(|| ToolError::NotAvailable(name.to_string()))?;
        debug!(tool = name, "executing tool");
        match tool {
            NeuroTool::Transcribe => {
                let clip = self.loader.load(string_param(params, "audio_path")?).await?;
                let text = self.transcriber.transcribe(&clip).await?;
                info!(tool = name, chars = text.chars().count(), "transcription done");
                Ok(json!({ "asr_text": text }))
            }
            NeuroTool::Classify => {
                let clip = self.loader.load(string_param(params, "audio_path")?).await?;
                let probabilities = self.classifier.classify(&clip).await?;
                info!(tool = name, accuracy = ?probabilities.as_array(), "classification done");
                Ok(json!({ "accuracy": probabilities.as_array() }))
            }
            NeuroTool::Retrieve => {
                let context = self.retriever.retrieve(string_param(params, "query")?).await?;
                Ok(json!({ "context": context }))
            }
        }
    }
}

#[async_trait::async_trait]
impl ToolExecutor for ToolRegistry {
    fn specs(&self) -> Vec<ToolSpec> {
        NeuroTool::ALL.iter().map(NeuroTool::spec).collect()
    }

    async fn execute(&self, name: &str, arguments: Value) -> DiagnoseResult<Value> {
        Ok(self.run(name, &arguments).await?)
    }
}

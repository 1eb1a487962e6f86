//! neuro-core: diagnostic contract, validator, chat model bridge, and the tool-calling
//! orchestrator for neurological screening from a recorded call.
//!
//! ## Flow
//!
//! ```text
//! audio_path + self_report
//!        │
//!        ▼
//! ┌──────────────┐  tool calls   ┌──────────────┐
//! │ Orchestrator │ ────────────▶ │ ToolExecutor │  (transcribe / classify / retrieve)
//! │  (ChatModel) │ ◀──────────── │              │
//! └──────┬───────┘  tool output  └──────────────┘
//!        │ final text
//!        ▼
//!   validate_output → ContractValidator → JSON result
//! ```

mod config;
mod diagnosis;
mod error;
pub mod llm;
pub mod orchestrator;
pub mod prompts;
pub mod validator;

pub use config::{
    AgentConfig, DEFAULT_API_BASE, DEFAULT_CHAT_MODEL, DEFAULT_MAX_TOOL_ROUNDS,
    DEFAULT_TRANSCRIPTION_MODEL,
};
pub use diagnosis::{
    Condition, DiagnosticResult, ReportHistory, RiskLevel, SelfReport, REQUIRED_KEYS,
};
pub use error::{DiagnoseError, DiagnoseResult};
pub use llm::{ChatMessage, ChatModel, FunctionCall, OpenAiChatModel, Role, ToolCall};
pub use orchestrator::traits::{
    ToolExecutor, ToolSpec, CLASSIFY_TOOL, RETRIEVE_TOOL, TRANSCRIBE_TOOL,
};
pub use orchestrator::{DiagnosisRequest, Orchestrator, RunState};
pub use validator::{
    check_required_keys, parse_output, validate_output, ContractValidator, ModelOutput,
};

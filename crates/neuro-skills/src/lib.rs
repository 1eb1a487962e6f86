//! neuro-skills: the diagnosis tool registry.
//!
//! [`ToolRegistry`] implements [`neuro_core::ToolExecutor`], so the orchestrator can call
//! transcription, classification, and retrieval by name without knowing the providers.

mod error;
pub mod retrieval;
pub mod tools;

pub use error::{ToolError, ToolResult};
pub use retrieval::{PlaceholderRetriever, RetrievalProvider};
pub use tools::{NeuroTool, ToolRegistry};

//! Prompt templates for the diagnosis orchestrator.

pub mod diagnosis;

pub use diagnosis::{
    diagnosis_system_prompt, diagnosis_user_prompt, DEFAULT_RISK_POLICY, DIAGNOSIS_SYSTEM_TEMPLATE,
    DIAGNOSIS_USER_TEMPLATE,
};

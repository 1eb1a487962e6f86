//! Diagnosis orchestrator: drives the chat model through tool calls until it produces a
//! final answer, then validates that answer.
//!
//! From the caller's point of view one run is `Idle → Running → Done | Failed`. Inside,
//! each round sends the conversation to the model; if the reply asks for tools, every call
//! is executed in order and its output appended as a `tool` message. A reply without tool
//! calls ends the loop and its content is the raw output. Tool and model errors end the run
//! immediately.
//!
//! In strict mode the final answer must also copy `accuracy` and `ASR` from the tool
//! outputs seen during the run.

pub mod traits;

use crate::config::AgentConfig;
use crate::diagnosis::{DiagnosticResult, ReportHistory, SelfReport};
use crate::error::{DiagnoseError, DiagnoseResult};
use crate::llm::{ChatMessage, ChatModel};
use crate::prompts::{diagnosis_system_prompt, diagnosis_user_prompt};
use crate::validator::{validate_output, ContractValidator, ModelOutput};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};
use traits::{ToolExecutor, CLASSIFY_TOOL, TRANSCRIBE_TOOL};

/// One diagnosis request: where the audio is and what the person reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisRequest {
    pub audio_path: String,
    #[serde(default)]
    pub self_report: SelfReport,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_history: Option<ReportHistory>,
}

impl DiagnosisRequest {
    pub fn new(audio_path: impl Into<String>, self_report: SelfReport) -> Self {
        Self {
            audio_path: audio_path.into(),
            self_report,
            report_history: None,
        }
    }

    pub fn with_history(mut self, history: ReportHistory) -> Self {
        self.report_history = Some(history);
        self
    }
}

/// Caller-visible lifecycle of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Done,
    /// Failed with the given error kind.
    Failed(&'static str),
}

pub struct Orchestrator {
    model: Arc<dyn ChatModel>,
    tools: Arc<dyn ToolExecutor>,
    system_prompt: String,
    max_tool_rounds: usize,
    contract: Option<ContractValidator>,
    state: RunState,
}

impl Orchestrator {
    pub fn new(
        model: Arc<dyn ChatModel>,
        tools: Arc<dyn ToolExecutor>,
        config: &AgentConfig,
    ) -> Self {
        Self {
            model,
            tools,
            system_prompt: diagnosis_system_prompt(config.risk_policy.as_deref()),
            max_tool_rounds: config.max_tool_rounds.max(1),
            contract: config.contract_validator(),
            state: RunState::Idle,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Run the request to completion and return the validated result object.
    ///
    /// The value is returned exactly as the model produced it once it passes the key check
    /// and, when enabled, the typed contract check.
    pub async fn diagnose(&mut self, request: &DiagnosisRequest) -> DiagnoseResult<Value> {
        self.state = RunState::Running;
        info!(
            target: "neuro::orchestrator",
            audio = %request.audio_path,
            self_report_keys = request.self_report.len(),
            history = request.report_history.as_ref().map_or(0, |h| h.len()),
            model = self.model.model_name(),
            "diagnosis started"
        );

        let outcome = match self.run(request).await {
            Ok((output, evidence)) => self.validate(output, &evidence),
            Err(e) => Err(e),
        };

        match &outcome {
            Ok((_, Some(result))) => {
                self.state = RunState::Done;
                info!(
                    target: "neuro::orchestrator",
                    overall_risk = %result.overall_risk(),
                    summary = %result.history_summary(),
                    "diagnosis completed"
                );
            }
            Ok((_, None)) => {
                self.state = RunState::Done;
                info!(target: "neuro::orchestrator", "diagnosis completed");
            }
            Err(e) => {
                self.state = RunState::Failed(e.kind());
                warn!(target: "neuro::orchestrator", kind = e.kind(), error = %e, "diagnosis failed");
            }
        }
        outcome.map(|(value, _)| value)
    }

    /// Key check, then (strict mode) the typed contract and the tool-output cross-check.
    fn validate(
        &self,
        output: ModelOutput,
        evidence: &ToolEvidence,
    ) -> DiagnoseResult<(Value, Option<DiagnosticResult>)> {
        let value = validate_output(output)?;
        let Some(contract) = &self.contract else {
            return Ok((value, None));
        };
        let result = contract.check(&value)?;
        evidence.check(&value, &result)?;
        Ok((value, Some(result)))
    }

    /// Tool-calling loop. Returns the content of the first reply that asks for no tools.
    async fn run(&self, request: &DiagnosisRequest) -> DiagnoseResult<(ModelOutput, ToolEvidence)> {
        let self_report_json = serde_json::to_string(&request.self_report)
            .map_err(|e| DiagnoseError::Config(format!("self-report not serializable: {}", e)))?;
        let mut messages = vec![
            ChatMessage::system(self.system_prompt.clone()),
            ChatMessage::user(diagnosis_user_prompt(
                &request.audio_path,
                &self_report_json,
                request.report_history.as_ref(),
            )),
        ];
        let specs = self.tools.specs();
        let mut evidence = ToolEvidence::default();

        for round in 1..=self.max_tool_rounds {
            let reply = self.model.complete(&messages, &specs).await?;
            if !reply.has_tool_calls() {
                debug!(target: "neuro::orchestrator", round, "final answer received");
                return Ok((ModelOutput::Text(reply.content.unwrap_or_default()), evidence));
            }

            let calls = reply.tool_calls.clone();
            messages.push(reply);
            for call in calls {
                let arguments = parse_arguments(&call.function.arguments)?;
                info!(
                    target: "neuro::orchestrator",
                    round,
                    tool = %call.function.name,
                    "tool call"
                );
                let output = self.tools.execute(&call.function.name, arguments).await?;
                evidence.record(&call.function.name, &output);
                messages.push(ChatMessage::tool_result(call.id, output.to_string()));
            }
        }

        Err(DiagnoseError::ToolRoundsExhausted(self.max_tool_rounds))
    }
}

/// Latest transcription and classification outputs of one run.
#[derive(Debug, Default)]
struct ToolEvidence {
    asr: Option<String>,
    accuracy: Option<Vec<f64>>,
}

impl ToolEvidence {
    fn record(&mut self, tool: &str, output: &Value) {
        match tool {
            TRANSCRIBE_TOOL => {
                self.asr = output.get("asr_text").and_then(Value::as_str).map(str::to_string);
            }
            CLASSIFY_TOOL => {
                self.accuracy = output
                    .get("accuracy")
                    .and_then(Value::as_array)
                    .map(|a| a.iter().filter_map(Value::as_f64).collect());
            }
            _ => {}
        }
    }

    /// The answer must carry the tool outputs unchanged. Tools that never ran are not checked.
    fn check(&self, value: &Value, result: &DiagnosticResult) -> DiagnoseResult<()> {
        let violation = |field: &str, reason: String| DiagnoseError::ContractViolation {
            field: field.to_string(),
            reason,
            actual: value.clone(),
        };
        if let Some(accuracy) = &self.accuracy {
            if accuracy.as_slice() != result.accuracy.as_slice() {
                return Err(violation(
                    "accuracy",
                    format!("differs from classifier output {:?}", accuracy),
                ));
            }
        }
        if let Some(asr) = &self.asr {
            if *asr != result.asr {
                return Err(violation("ASR", "differs from the transcription output".to_string()));
            }
        }
        Ok(())
    }
}

/// Decode the model's argument text. Empty text means no arguments.
fn parse_arguments(raw: &str) -> DiagnoseResult<Value> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_str(raw)
        .map_err(|e| DiagnoseError::Tool(format!("tool arguments are not valid JSON ({}): {}", e, raw)))
}

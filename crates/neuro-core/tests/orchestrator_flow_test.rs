//! Integration test: the orchestrator's tool-calling loop and output validation, driven by
//! a scripted chat model and an in-memory tool executor.
//!
//! ## Scenarios
//! 1. Tool calls run in order, their output is fed back, and the final JSON passes through.
//! 2. The self-report reaches the model serialized with non-ASCII text intact.
//! 3. A final answer missing a key fails with SchemaViolation naming that key.
//! 4. A non-JSON final answer fails with MalformedOutput.
//! 5. A provider failure inside a tool ends the run without another model turn.
//! 6. A model that never stops calling tools hits the round limit.
//! 7. Strict validation rejects a short `risk` array; key-only validation lets it through.
//! 8. Strict validation rejects an answer whose `accuracy` or `ASR` differs from what the
//!    tools returned, including a transcript that was only trimmed.
//! 9. Strict validation rejects English or padded risk labels.

use neuro_core::{
    AgentConfig, ChatMessage, ChatModel, DiagnoseError, DiagnoseResult, DiagnosisRequest,
    Orchestrator, Role, RunState, SelfReport, ToolCall, ToolExecutor, ToolSpec, CLASSIFY_TOOL,
    TRANSCRIBE_TOOL,
};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Replays canned replies and records every conversation it was shown.
struct ScriptedModel {
    replies: Mutex<VecDeque<ChatMessage>>,
    seen: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedModel {
    fn new(replies: Vec<ChatMessage>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn turns(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    fn conversation(&self, turn: usize) -> Vec<ChatMessage> {
        self.seen.lock().unwrap()[turn].clone()
    }
}

#[async_trait::async_trait]
impl ChatModel for ScriptedModel {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        _tools: &[ToolSpec],
    ) -> DiagnoseResult<ChatMessage> {
        self.seen.lock().unwrap().push(messages.to_vec());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| DiagnoseError::Model("script exhausted".to_string()))
    }
}

/// Fixed tool outputs; optionally fails transcription.
struct FakeTools {
    fail_transcription: bool,
    calls: Mutex<Vec<(String, Value)>>,
}

impl FakeTools {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            fail_transcription: false,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail_transcription: true,
            calls: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait::async_trait]
impl ToolExecutor for FakeTools {
    fn specs(&self) -> Vec<ToolSpec> {
        Vec::new()
    }

    async fn execute(&self, name: &str, arguments: Value) -> DiagnoseResult<Value> {
        self.calls.lock().unwrap().push((name.to_string(), arguments));
        match name {
            TRANSCRIBE_TOOL if self.fail_transcription => {
                Err(DiagnoseError::Provider("cannot open audio".to_string()))
            }
            TRANSCRIBE_TOOL => Ok(json!({ "asr_text": "안녕하세요 testing" })),
            CLASSIFY_TOOL => Ok(json!({ "accuracy": [0.6, 0.3, 0.1] })),
            other => Err(DiagnoseError::Tool(format!("unknown tool {}", other))),
        }
    }
}

fn final_result() -> Value {
    json!({
        "accuracy": [0.6, 0.3, 0.1],
        "ASR": "안녕하세요 testing",
        "risk": ["주의", "관찰", "정상", "정상"],
        "explain": [
            "뇌졸중 확률이 0.6으로 높아 주의가 필요합니다.",
            "경미한 변화가 있어 관찰을 권합니다.",
            "현재로서는 특이 소견이 없어 보입니다.",
            "현재로서는 특이 소견이 없어 보입니다."
        ]
    })
}

fn tool_round() -> ChatMessage {
    ChatMessage::assistant_tool_calls(vec![
        ToolCall::new("call_1", TRANSCRIBE_TOOL, json!({ "audio_path": "/tmp/call.wav" })),
        ToolCall::new("call_2", CLASSIFY_TOOL, json!({ "audio_path": "/tmp/call.wav" })),
    ])
}

fn request() -> DiagnosisRequest {
    let mut report = SelfReport::new();
    report.insert("age".to_string(), json!(72));
    report.insert("symptoms".to_string(), json!("말이 어눌함"));
    DiagnosisRequest::new("/tmp/call.wav", report)
}

// ===========================================================================
// Scenario 1: tools run in order, output is fed back, result passes through
// ===========================================================================

#[tokio::test]
async fn tool_outputs_feed_back_and_result_passes_through() {
    let model = ScriptedModel::new(vec![
        tool_round(),
        ChatMessage::assistant(final_result().to_string()),
    ]);
    let tools = FakeTools::new();
    let mut orchestrator = Orchestrator::new(model.clone(), tools.clone(), &AgentConfig::default());
    assert_eq!(orchestrator.state(), RunState::Idle);

    let result = orchestrator.diagnose(&request()).await.unwrap();
    assert_eq!(result, final_result());
    assert_eq!(orchestrator.state(), RunState::Done);

    let calls = tools.calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].0, TRANSCRIBE_TOOL);
    assert_eq!(calls[1].0, CLASSIFY_TOOL);
    assert_eq!(calls[0].1["audio_path"], "/tmp/call.wav");

    // Second turn sees: system, user, assistant(tool_calls), tool, tool
    assert_eq!(model.turns(), 2);
    let second = model.conversation(1);
    assert_eq!(second.len(), 5);
    assert_eq!(second[2].role, Role::Assistant);
    assert_eq!(second[3].role, Role::Tool);
    assert_eq!(second[3].tool_call_id.as_deref(), Some("call_1"));
    let transcript: Value = serde_json::from_str(second[3].content.as_deref().unwrap()).unwrap();
    assert_eq!(transcript["asr_text"], "안녕하세요 testing");
    assert_eq!(second[4].tool_call_id.as_deref(), Some("call_2"));
}

// ===========================================================================
// Scenario 2: self-report reaches the model intact
// ===========================================================================

#[tokio::test]
async fn self_report_is_serialized_into_user_prompt() {
    let model = ScriptedModel::new(vec![ChatMessage::assistant(final_result().to_string())]);
    let mut orchestrator = Orchestrator::new(model.clone(), FakeTools::new(), &AgentConfig::default());
    orchestrator.diagnose(&request()).await.unwrap();

    let first = model.conversation(0);
    assert_eq!(first[0].role, Role::System);
    let user = first[1].content.clone().unwrap();
    assert!(user.contains("/tmp/call.wav"));
    assert!(user.contains("말이 어눌함"));
    assert!(user.contains("\"age\":72"));
}

// ===========================================================================
// Scenario 3: missing key
// ===========================================================================

#[tokio::test]
async fn missing_key_is_schema_violation() {
    let mut broken = final_result();
    broken.as_object_mut().unwrap().remove("explain");
    let model = ScriptedModel::new(vec![tool_round(), ChatMessage::assistant(broken.to_string())]);
    let mut orchestrator = Orchestrator::new(model, FakeTools::new(), &AgentConfig::default());

    match orchestrator.diagnose(&request()).await {
        Err(DiagnoseError::SchemaViolation { missing_key, actual }) => {
            assert_eq!(missing_key, "explain");
            assert_eq!(actual, broken);
        }
        other => panic!("expected schema violation, got {:?}", other),
    }
    assert_eq!(orchestrator.state(), RunState::Failed("schema_violation"));
}

// ===========================================================================
// Scenario 4: non-JSON final answer
// ===========================================================================

#[tokio::test]
async fn prose_answer_is_malformed_output() {
    let model = ScriptedModel::new(vec![ChatMessage::assistant("뇌졸중 위험이 있어 보입니다.")]);
    let mut orchestrator = Orchestrator::new(model, FakeTools::new(), &AgentConfig::default());
    let err = orchestrator.diagnose(&request()).await.unwrap_err();
    assert!(matches!(err, DiagnoseError::MalformedOutput { .. }));
}

// ===========================================================================
// Scenario 5: provider failure propagates
// ===========================================================================

#[tokio::test]
async fn provider_failure_stops_the_run() {
    let model = ScriptedModel::new(vec![
        tool_round(),
        ChatMessage::assistant(final_result().to_string()),
    ]);
    let tools = FakeTools::failing();
    let mut orchestrator = Orchestrator::new(model.clone(), tools.clone(), &AgentConfig::default());

    let err = orchestrator.diagnose(&request()).await.unwrap_err();
    assert_eq!(err.kind(), "provider_error");
    assert_eq!(model.turns(), 1);
    // Classification never ran.
    assert_eq!(tools.calls.lock().unwrap().len(), 1);
}

// ===========================================================================
// Scenario 6: round limit
// ===========================================================================

#[tokio::test]
async fn endless_tool_calls_hit_round_limit() {
    let config = AgentConfig {
        max_tool_rounds: 3,
        ..AgentConfig::default()
    };
    let model = ScriptedModel::new(vec![tool_round(), tool_round(), tool_round(), tool_round()]);
    let mut orchestrator = Orchestrator::new(model.clone(), FakeTools::new(), &config);

    let err = orchestrator.diagnose(&request()).await.unwrap_err();
    assert!(matches!(err, DiagnoseError::ToolRoundsExhausted(3)));
    assert_eq!(model.turns(), 3);
}

// ===========================================================================
// Scenario 7: strict vs key-only validation
// ===========================================================================

#[tokio::test]
async fn strict_validation_rejects_short_risk() {
    let mut short = final_result();
    short["risk"] = json!(["주의", "관찰", "정상"]);

    let strict = AgentConfig::default();
    let model = ScriptedModel::new(vec![ChatMessage::assistant(short.to_string())]);
    let mut orchestrator = Orchestrator::new(model, FakeTools::new(), &strict);
    match orchestrator.diagnose(&request()).await {
        Err(DiagnoseError::ContractViolation { field, .. }) => assert_eq!(field, "risk"),
        other => panic!("expected contract violation, got {:?}", other),
    }

    let lenient = AgentConfig {
        strict_validation: false,
        ..AgentConfig::default()
    };
    let model = ScriptedModel::new(vec![ChatMessage::assistant(short.to_string())]);
    let mut orchestrator = Orchestrator::new(model, FakeTools::new(), &lenient);
    assert_eq!(orchestrator.diagnose(&request()).await.unwrap(), short);
}

// ===========================================================================
// Scenario 8: answer must carry the tool outputs unchanged
// ===========================================================================

async fn run_after_tools(answer: &Value, config: &AgentConfig) -> DiagnoseResult<Value> {
    let model = ScriptedModel::new(vec![tool_round(), ChatMessage::assistant(answer.to_string())]);
    let mut orchestrator = Orchestrator::new(model, FakeTools::new(), config);
    orchestrator.diagnose(&request()).await
}

#[tokio::test]
async fn strict_validation_cross_checks_tool_outputs() {
    let strict = AgentConfig::default();

    let mut rounded = final_result();
    rounded["accuracy"] = json!([0.55, 0.35, 0.1]);
    match run_after_tools(&rounded, &strict).await {
        Err(DiagnoseError::ContractViolation { field, actual, .. }) => {
            assert_eq!(field, "accuracy");
            assert_eq!(actual, rounded);
        }
        other => panic!("expected accuracy violation, got {:?}", other),
    }

    let mut trimmed = final_result();
    trimmed["ASR"] = json!("안녕하세요");
    match run_after_tools(&trimmed, &strict).await {
        Err(DiagnoseError::ContractViolation { field, .. }) => assert_eq!(field, "ASR"),
        other => panic!("expected ASR violation, got {:?}", other),
    }

    let lenient = AgentConfig {
        strict_validation: false,
        ..AgentConfig::default()
    };
    assert_eq!(run_after_tools(&trimmed, &lenient).await.unwrap(), trimmed);
    assert_eq!(run_after_tools(&final_result(), &strict).await.unwrap(), final_result());
}

// ===========================================================================
// Scenario 9: risk labels are the exact Korean levels
// ===========================================================================

#[tokio::test]
async fn strict_validation_rejects_english_and_padded_labels() {
    for risk in [
        json!(["caution", "관찰", "정상", "정상"]),
        json!([" 주의", "관찰", "정상", "정상"]),
    ] {
        let mut answer = final_result();
        answer["risk"] = risk;
        match run_after_tools(&answer, &AgentConfig::default()).await {
            Err(DiagnoseError::ContractViolation { field, .. }) => assert_eq!(field, "risk"),
            other => panic!("expected risk violation, got {:?}", other),
        }
    }
}

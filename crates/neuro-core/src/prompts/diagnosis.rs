//! Task description for the screening agent: output schema, tool-use order, and the risk
//! mapping policy. Written for a Korean-speaking guardian audience.
//!
//! The policy block is a placeholder so deployments can supply their own mapping from
//! probabilities to risk levels without touching the rest of the instructions.

use crate::diagnosis::ReportHistory;
use crate::orchestrator::traits::{CLASSIFY_TOOL, RETRIEVE_TOOL, TRANSCRIBE_TOOL};

/// Default probability → risk mapping. Replaced by `AgentConfig::risk_policy` when set.
pub const DEFAULT_RISK_POLICY: &str = r#"위험도 판단 기준(기본 정책):
- 뇌졸중: 뇌졸중 확률이 0.7 이상이면 "위험", 0.5 이상이면 "주의", 0.3 이상이면 "관찰", 그 미만이면 "정상".
- 치매, 파킨슨병, 루게릭병: 퇴행성 뇌질환 확률에 같은 기준을 적용하되,
  ASR 텍스트(기억·단어 찾기 어려움은 치매, 느리고 작은 발화·떨림 언급은 파킨슨병,
  발음이 뭉개지거나 삼킴 곤란 언급은 루게릭병)로 질환별 차이를 둔다.
- 자가 문진표에 해당 질환과 관련된 증상이 있으면 한 단계까지 올릴 수 있다.
- 문제 없음 확률이 0.7 이상이고 관련 증상이 없으면 모든 질환을 "정상"으로 본다."#;

/// System instruction. Placeholders: `{transcribe_tool}`, `{classify_tool}`,
/// `{retrieve_tool}`, `{risk_policy}`.
pub const DIAGNOSIS_SYSTEM_TEMPLATE: &str = r#"너는 뇌졸중과 퇴행성 뇌질환(치매, 파킨슨병, 루게릭병)의 위험도를 평가하는 의료 보조 에이전트다.

사용할 수 있는 도구:
- {transcribe_tool}(audio_path): 통화 음성을 화자 분리 전사하여 ASR 텍스트를 돌려준다.
- {classify_tool}(audio_path): 음성을 분석해 [뇌졸중, 퇴행성 뇌질환, 문제 없음] 세 확률을 돌려준다.
- {retrieve_tool}(query): 질병에 대한 참고 문서 요약과 이전 검사 기록을 돌려준다.

반드시 아래 구조의 JSON 객체 하나만 출력한다:
{
  "accuracy": [뇌졸중 확률, 퇴행성 뇌질환 확률, 문제 없음 확률],
  "ASR": "전사 전체 텍스트",
  "risk": ["뇌졸중 위험도", "치매 위험도", "파킨슨병 위험도", "루게릭병 위험도"],
  "explain": ["뇌졸중 설명", "치매 설명", "파킨슨병 설명", "루게릭병 설명"]
}

규칙:
- "accuracy"는 {classify_tool} 결과를 순서 그대로 옮긴다. 값을 바꾸거나 정규화하지 않는다.
- "ASR"에는 {transcribe_tool}가 돌려준 텍스트 전체를 수정 없이 넣는다.
- "risk"와 "explain"은 각각 정확히 4개이며 순서는 [뇌졸중, 치매, 파킨슨병, 루게릭병]이다.
- 위험도 값은 "정상", "관찰", "주의", "위험" 중 하나다.
- 설명은 보호자가 이해하기 쉬운 한국어로 쓴다. 위험도가 "정상"이어도
  "현재로서는 특이 소견이 없어 보입니다"처럼 안심할 수 있는 설명을 쓴다.
- 위험도가 높을수록 그 근거(확률, 발화 특징, 문진 내용)를 설명에 밝힌다.
- JSON 외의 문장, 마크다운, 주석은 출력하지 않는다.

진행 순서:
1) 자가 문진표를 읽고 환자의 전반적인 상태를 파악한다.
2) {transcribe_tool}로 ASR 텍스트를 얻는다.
3) {classify_tool}로 세 범주 확률을 얻는다.
4) 필요하면 질환별로 {retrieve_tool}를 호출해 설명을 보완한다.
5) 확률, ASR, 자가 문진표를 종합해 질환별 위험도와 설명을 정한다.

{risk_policy}"#;

/// User message. Placeholders: `{audio_path}`, `{self_report_json}`, `{report_history}`.
pub const DIAGNOSIS_USER_TEMPLATE: &str = r#"다음 정보로 result를 만들어줘.

- audio_path: {audio_path}
- self_report(JSON): {self_report_json}
- 이전 검사 기록: {report_history}

audio_path로 도구를 호출해 ASR과 확률을 구하고, 자가 문진표와 이전 기록을 반영해 최종 result를 만들어."#;

/// Build the system prompt with the given policy (or [`DEFAULT_RISK_POLICY`]).
pub fn diagnosis_system_prompt(risk_policy: Option<&str>) -> String {
    DIAGNOSIS_SYSTEM_TEMPLATE
        .replace("{transcribe_tool}", TRANSCRIBE_TOOL)
        .replace("{classify_tool}", CLASSIFY_TOOL)
        .replace("{retrieve_tool}", RETRIEVE_TOOL)
        .replace("{risk_policy}", risk_policy.unwrap_or(DEFAULT_RISK_POLICY))
}

/// Build the user prompt. `self_report_json` must already be serialized (non-ASCII kept).
pub fn diagnosis_user_prompt(
    audio_path: &str,
    self_report_json: &str,
    history: Option<&ReportHistory>,
) -> String {
    let history_text = match history {
        Some(h) if !h.is_empty() => h
            .iter()
            .map(|(date, summary)| format!("{}: {}", date, summary))
            .collect::<Vec<_>>()
            .join("; "),
        _ => "없음".to_string(),
    };
    DIAGNOSIS_USER_TEMPLATE
        .replace("{audio_path}", audio_path)
        .replace("{self_report_json}", self_report_json)
        .replace("{report_history}", &history_text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_names_every_tool_and_policy() {
        let p = diagnosis_system_prompt(None);
        assert!(p.contains(TRANSCRIBE_TOOL));
        assert!(p.contains(CLASSIFY_TOOL));
        assert!(p.contains(RETRIEVE_TOOL));
        assert!(p.contains("기본 정책"));
        assert!(!p.contains("{risk_policy}"));
    }

    #[test]
    fn custom_policy_replaces_default() {
        let p = diagnosis_system_prompt(Some("항상 관찰로 판단한다."));
        assert!(p.contains("항상 관찰로 판단한다."));
        assert!(!p.contains("기본 정책"));
    }

    #[test]
    fn user_prompt_embeds_inputs() {
        let mut history = ReportHistory::new();
        history.insert("2025-11-27".to_string(), "주의 (확률: 93.5%)".to_string());
        let p = diagnosis_user_prompt("/tmp/call.wav", r#"{"age":72}"#, Some(&history));
        assert!(p.contains("/tmp/call.wav"));
        assert!(p.contains(r#"{"age":72}"#));
        assert!(p.contains("2025-11-27: 주의 (확률: 93.5%)"));

        let p = diagnosis_user_prompt("a.wav", "{}", None);
        assert!(p.contains("이전 검사 기록: 없음"));
    }
}

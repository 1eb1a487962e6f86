//! Disease-information retrieval.
//!
//! The document store is an external capability. [`PlaceholderRetriever`] answers from a
//! short built-in note per condition and appends the caller's previous screening summaries.

use crate::error::ToolResult;
use neuro_core::{Condition, ReportHistory};
use tracing::debug;

/// Text query in, opaque context text out.
#[async_trait::async_trait]
pub trait RetrievalProvider: Send + Sync {
    async fn retrieve(&self, query: &str) -> ToolResult<String>;
}

/// Static lookup: condition notes matched by name plus optional report history.
#[derive(Debug, Clone, Default)]
pub struct PlaceholderRetriever {
    history: Option<ReportHistory>,
}

impl PlaceholderRetriever {
    pub fn new() -> Self {
        Self::default()
    }

    /// Previous screening summaries to include in every answer.
    pub fn with_history(history: ReportHistory) -> Self {
        Self {
            history: Some(history),
        }
    }

    fn matching_conditions(query: &str) -> Vec<Condition> {
        let lower = query.to_lowercase();
        Condition::ALL
            .into_iter()
            .filter(|c| {
                lower.contains(c.label()) || keywords(*c).iter().any(|k| mentions(&lower, k))
            })
            .collect()
    }
}

/// Short keywords (acronyms) must match a whole word.
fn mentions(text: &str, keyword: &str) -> bool {
    if keyword.len() <= 3 {
        text.split(|c: char| !c.is_alphanumeric())
            .any(|w| w == keyword)
    } else {
        text.contains(keyword)
    }
}

fn keywords(condition: Condition) -> &'static [&'static str] {
    match condition {
        Condition::Stroke => &["stroke", "cva"],
        Condition::Dementia => &["dementia", "alzheimer"],
        Condition::Parkinsons => &["parkinson"],
        Condition::Als => &["als", "amyotrophic", "lou gehrig"],
    }
}

fn note(condition: Condition) -> &'static str {
    match condition {
        Condition::Stroke => {
            "뇌졸중: 갑작스러운 발음 이상(구음장애), 한쪽 얼굴·팔다리 마비, 말을 이해하지 못함이 \
             대표적 경고 신호다. 증상 발생 후 수 시간 내 치료가 예후를 좌우한다."
        }
        Condition::Dementia => {
            "치매: 단어 찾기 어려움, 같은 질문 반복, 대화 주제 이탈, 최근 일 기억 저하가 \
             말하기에서 드러나며 수개월에서 수년에 걸쳐 서서히 진행한다."
        }
        Condition::Parkinsons => {
            "파킨슨병: 작고 단조로운 목소리, 말 속도 변화, 발음이 흐려지는 운동저하성 \
             구음장애가 흔하며 떨림·서동과 함께 점진적으로 나타난다."
        }
        Condition::Als => {
            "루게릭병(ALS): 콧소리가 섞인 느리고 힘겨운 발음, 삼킴 곤란, 호흡 약화가 \
             진행성으로 나타나며 구음 증상이 첫 증상인 경우도 있다."
        }
    }
}

#[async_trait::async_trait]
impl RetrievalProvider for PlaceholderRetriever {
    async fn retrieve(&self, query: &str) -> ToolResult<String> {
        let conditions = Self::matching_conditions(query);
        debug!(query, matched = conditions.len(), "retrieval lookup");

        let mut sections: Vec<String> = if conditions.is_empty() {
            vec![format!("'{}'에 대한 참고 문서를 찾지 못했습니다.", query)]
        } else {
            conditions.into_iter().map(|c| note(c).to_string()).collect()
        };

        if let Some(history) = self.history.as_ref().filter(|h| !h.is_empty()) {
            let lines: Vec<String> = history
                .iter()
                .map(|(date, summary)| format!("- {}: {}", date, summary))
                .collect();
            sections.push(format!("이전 검사 기록:\n{}", lines.join("\n")));
        }
        Ok(sections.join("\n\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn matches_by_korean_or_english_name() {
        let r = PlaceholderRetriever::new();
        let ctx = r.retrieve("뇌졸중 초기 증상").await.unwrap();
        assert!(ctx.starts_with("뇌졸중:"));
        let ctx = r.retrieve("Parkinson's disease speech").await.unwrap();
        assert!(ctx.starts_with("파킨슨병:"));
        let ctx = r.retrieve("ALS bulbar onset").await.unwrap();
        assert!(ctx.starts_with("루게릭병"));
        assert!(!r.retrieve("dementia signals").await.unwrap().contains("루게릭병"));
    }

    #[tokio::test]
    async fn unknown_query_still_answers() {
        let ctx = PlaceholderRetriever::new().retrieve("감기").await.unwrap();
        assert!(ctx.contains("감기"));
    }

    #[tokio::test]
    async fn history_is_appended() {
        let mut h = ReportHistory::new();
        h.insert("2025-11-27".to_string(), "주의 (확률: 93.5%)".to_string());
        let ctx = PlaceholderRetriever::with_history(h)
            .retrieve("stroke")
            .await
            .unwrap();
        assert!(ctx.contains("이전 검사 기록"));
        assert!(ctx.contains("2025-11-27: 주의 (확률: 93.5%)"));
    }
}

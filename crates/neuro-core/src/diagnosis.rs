//! Diagnostic result contract: the four-field JSON object handed back to callers.
//!
//! ```json
//! {
//!   "accuracy": [stroke, degenerative, normal],
//!   "ASR": "full transcript",
//!   "risk": ["뇌졸중", "치매", "파킨슨병", "루게릭병"],
//!   "explain": ["...", "...", "...", "..."]
//! }
//! ```
//!
//! `risk` and `explain` are index-aligned with [`Condition::ALL`]; the order is fixed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Required top-level keys, in the order the validator checks them.
pub const REQUIRED_KEYS: [&str; 4] = ["accuracy", "ASR", "risk", "explain"];

/// Free-form patient self-report. Passed through to the model untouched.
pub type SelfReport = serde_json::Map<String, serde_json::Value>;

/// Previous screening summaries keyed by date (e.g. `"2025-11-27" -> "주의 (확률: 93.5%)"`).
pub type ReportHistory = BTreeMap<String, String>;

/// Conditions assessed per request, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Stroke,
    Dementia,
    Parkinsons,
    Als,
}

impl Condition {
    /// Output order of `risk` and `explain`.
    pub const ALL: [Condition; 4] = [
        Condition::Stroke,
        Condition::Dementia,
        Condition::Parkinsons,
        Condition::Als,
    ];

    /// Localized name used in prompts and retrieval queries.
    pub fn label(&self) -> &'static str {
        match self {
            Condition::Stroke => "뇌졸중",
            Condition::Dementia => "치매",
            Condition::Parkinsons => "파킨슨병",
            Condition::Als => "루게릭병",
        }
    }
}

/// Per-condition severity. Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RiskLevel {
    Normal,
    Observe,
    Caution,
    Danger,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 4] = [
        RiskLevel::Normal,
        RiskLevel::Observe,
        RiskLevel::Caution,
        RiskLevel::Danger,
    ];

    /// Serialized (source-locale) label.
    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::Normal => "정상",
            RiskLevel::Observe => "관찰",
            RiskLevel::Caution => "주의",
            RiskLevel::Danger => "위험",
        }
    }

    /// English name, accepted on input alongside the localized label.
    pub fn english(&self) -> &'static str {
        match self {
            RiskLevel::Normal => "normal",
            RiskLevel::Observe => "observe",
            RiskLevel::Caution => "caution",
            RiskLevel::Danger => "danger",
        }
    }

    /// Exact source-locale label only. Used where the output must stay in that locale.
    pub fn from_label(s: &str) -> Option<Self> {
        RiskLevel::ALL.into_iter().find(|level| level.label() == s)
    }

    /// Parse a localized label or an English name (case-insensitive, trimmed).
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        RiskLevel::ALL
            .into_iter()
            .find(|level| level.label() == s || level.english().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for RiskLevel {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for RiskLevel {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        RiskLevel::parse(&s).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "unknown risk level '{}' (expected one of 정상/관찰/주의/위험 or normal/observe/caution/danger)",
                s
            ))
        })
    }
}

/// Validated diagnostic result. Fixed-size arrays make the length invariants unrepresentable
/// to break once a value exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticResult {
    /// `[stroke, degenerative, normal]` probabilities from the classifier, order fixed.
    pub accuracy: [f64; 3],
    /// Full diarized transcript.
    #[serde(rename = "ASR")]
    pub asr: String,
    /// One level per [`Condition::ALL`] entry.
    pub risk: [RiskLevel; 4],
    /// One explanation per [`Condition::ALL`] entry.
    pub explain: [String; 4],
}

impl DiagnosticResult {
    /// Highest risk across all conditions.
    pub fn overall_risk(&self) -> RiskLevel {
        self.risk.iter().copied().max().unwrap_or(RiskLevel::Normal)
    }

    /// One-line summary in the shape the report history uses (`"주의 (확률: 60.0%)"`).
    pub fn history_summary(&self) -> String {
        let overall = self.overall_risk();
        let concern = self.accuracy[0].max(self.accuracy[1]);
        format!("{} (확률: {:.1}%)", overall, concern * 100.0)
    }
}

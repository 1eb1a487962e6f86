//! Result validation: decode the orchestrator's final output and check it against the
//! diagnostic contract.
//!
//! Two levels:
//! 1. [`validate_output`]: parse text as JSON, then require the four top-level keys.
//!    Returns the value unchanged on success.
//! 2. [`ContractValidator::check`]: exhaustive typed check (lengths, enum labels,
//!    probability range and sum) producing a [`DiagnosticResult`].

use crate::diagnosis::{DiagnosticResult, RiskLevel, REQUIRED_KEYS};
use crate::error::{DiagnoseError, DiagnoseResult};
use serde_json::Value;

/// What the orchestrator hands back: either raw text or an already-structured value.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelOutput {
    Text(String),
    Structured(Value),
}

impl From<String> for ModelOutput {
    fn from(s: String) -> Self {
        ModelOutput::Text(s)
    }
}

impl From<Value> for ModelOutput {
    fn from(v: Value) -> Self {
        ModelOutput::Structured(v)
    }
}

/// Parse model text as JSON. A single surrounding Markdown code fence is removed first;
/// nothing else is repaired.
pub fn parse_output(raw: &str) -> DiagnoseResult<Value> {
    serde_json::from_str(strip_code_fence(raw)).map_err(|source| DiagnoseError::MalformedOutput {
        raw: raw.to_string(),
        source,
    })
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening fence, whether or not a newline follows.
    let info_len = body
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
        .unwrap_or(body.len());
    let rest = &body[info_len..];
    match rest.chars().next() {
        Some(c) if c.is_whitespace() || c == '{' || c == '[' => rest.trim(),
        _ => body.trim(),
    }
}

/// Require every key in [`REQUIRED_KEYS`]. The first missing key is reported together with
/// the actual result. A non-object value is missing all of them.
pub fn check_required_keys(value: Value) -> DiagnoseResult<Value> {
    let missing = match value.as_object() {
        Some(map) => REQUIRED_KEYS.iter().find(|k| !map.contains_key(**k)),
        None => REQUIRED_KEYS.first(),
    };
    match missing {
        Some(key) => Err(DiagnoseError::SchemaViolation {
            missing_key: key.to_string(),
            actual: value,
        }),
        None => Ok(value),
    }
}

/// Decode (if text) and key-check the final output. Parse errors surface before any key check.
pub fn validate_output(output: ModelOutput) -> DiagnoseResult<Value> {
    let value = match output {
        ModelOutput::Text(raw) => parse_output(&raw)?,
        ModelOutput::Structured(v) => v,
    };
    check_required_keys(value)
}

/// Exhaustive contract check on a key-checked value.
#[derive(Debug, Clone, Copy)]
pub struct ContractValidator {
    /// Allowed distance of `sum(accuracy)` from 1.0.
    pub probability_tolerance: f64,
}

impl Default for ContractValidator {
    fn default() -> Self {
        Self {
            probability_tolerance: 0.05,
        }
    }
}

impl ContractValidator {
    pub fn new(probability_tolerance: f64) -> Self {
        Self {
            probability_tolerance,
        }
    }

    pub fn check(&self, value: &Value) -> DiagnoseResult<DiagnosticResult> {
        let violation = |field: &str, reason: String| DiagnoseError::ContractViolation {
            field: field.to_string(),
            reason,
            actual: value.clone(),
        };

        let accuracy = array_of_len(value, "accuracy", 3).map_err(|r| violation("accuracy", r))?;
        let mut probs = [0.0f64; 3];
        for (i, item) in accuracy.iter().enumerate() {
            let p = item
                .as_f64()
                .ok_or_else(|| violation("accuracy", format!("element {} is not a number", i)))?;
            if !p.is_finite() || !(0.0..=1.0).contains(&p) {
                return Err(violation(
                    "accuracy",
                    format!("element {} = {} is outside [0, 1]", i, p),
                ));
            }
            probs[i] = p;
        }
        let sum: f64 = probs.iter().sum();
        if (sum - 1.0).abs() > self.probability_tolerance {
            return Err(violation(
                "accuracy",
                format!(
                    "probabilities sum to {:.4}, expected 1.0 ± {}",
                    sum, self.probability_tolerance
                ),
            ));
        }

        let asr = value
            .get("ASR")
            .and_then(Value::as_str)
            .ok_or_else(|| violation("ASR", "expected a string".to_string()))?
            .to_string();

        let risk_items = array_of_len(value, "risk", 4).map_err(|r| violation("risk", r))?;
        let mut risk = [RiskLevel::Normal; 4];
        for (i, item) in risk_items.iter().enumerate() {
            let label = item
                .as_str()
                .ok_or_else(|| violation("risk", format!("element {} is not a string", i)))?;
            risk[i] = RiskLevel::from_label(label).ok_or_else(|| {
                violation(
                    "risk",
                    format!("element {} = '{}' is not one of 정상/관찰/주의/위험", i, label),
                )
            })?;
        }

        let explain_items = array_of_len(value, "explain", 4).map_err(|r| violation("explain", r))?;
        let mut explain: [String; 4] = Default::default();
        for (i, item) in explain_items.iter().enumerate() {
            let text = item
                .as_str()
                .ok_or_else(|| violation("explain", format!("element {} is not a string", i)))?;
            if text.trim().is_empty() {
                return Err(violation("explain", format!("element {} is empty", i)));
            }
            explain[i] = text.to_string();
        }

        Ok(DiagnosticResult {
            accuracy: probs,
            asr,
            risk,
            explain,
        })
    }
}

fn array_of_len<'a>(value: &'a Value, key: &str, len: usize) -> Result<&'a Vec<Value>, String> {
    let items = value
        .get(key)
        .and_then(Value::as_array)
        .ok_or_else(|| "expected an array".to_string())?;
    if items.len() != len {
        return Err(format!("expected {} elements, got {}", len, items.len()));
    }
    Ok(items)
}

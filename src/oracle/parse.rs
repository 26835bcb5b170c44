//! Strict extraction of the oracle's structured estimate from free-form
//! reply text. The reply must embed exactly one JSON object; anything less
//! fails that subject with a typed error instead of throwing past the batch.

use crate::core::error::PipelineError;
use serde::Deserialize;

/// The oracle's declared output contract, on its native 0-100 scale.
/// `edge` and `recommendation` are the oracle's own claims; both are
/// recomputed locally and never trusted for the decision.
#[derive(Debug, Deserialize)]
pub struct RawEstimate {
    pub probability: f64,
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: String,
    pub fair_value: f64,
    #[serde(default)]
    pub edge: Option<f64>,
    #[serde(default)]
    pub recommendation: Option<String>,
}

/// Finds the first balanced `{...}` region, string- and escape-aware, so a
/// brace inside a quoted reasoning field cannot truncate the object.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Extracts and schema-validates the estimate embedded in `text`.
pub fn parse_estimate(subject_id: &str, text: &str) -> Result<RawEstimate, PipelineError> {
    let parse_err = |reason: String| PipelineError::OracleParse {
        subject_id: subject_id.to_string(),
        reason,
    };

    let json = extract_json_object(text)
        .ok_or_else(|| parse_err("no JSON object found in reply".to_string()))?;

    let estimate: RawEstimate =
        serde_json::from_str(json).map_err(|e| parse_err(format!("invalid JSON: {e}")))?;

    for (name, value) in [
        ("probability", estimate.probability),
        ("confidence", estimate.confidence),
        ("fair_value", estimate.fair_value),
    ] {
        if !(0.0..=100.0).contains(&value) || value.is_nan() {
            return Err(parse_err(format!("{name} out of range: {value}")));
        }
    }

    Ok(estimate)
}

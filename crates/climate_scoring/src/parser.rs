//! Turning the model's reply text into a validated score set.
//!
//! Order matters: the safety scan runs on the raw text before any structural
//! parsing, and a hit replaces whatever JSON the model also produced.

use crate::error::{ScoringError, ScoringResult};
use climate_core::{EmotionKind, EmotionScoreSet};
use serde_json::Value;

/// Value assumed for a category the model left out.
pub const MISSING_SCORE: u32 = 50;
pub const MIN_SCORE: u32 = 1;
pub const MAX_SCORE: u32 = 100;

/// Crisis and safety language that, when it appears in a reply, means the
/// model is reacting to a distressing post rather than scoring it.
pub const SAFETY_KEYWORDS: &[&str] = &[
    "suicide",
    "자살",
    "danger",
    "위험",
    "counseling",
    "counselling",
    "상담",
    "help",
    "도움",
    "1393",
    "1577-0199",
    "109",
    "safety",
    "안전",
    "worried",
    "걱정",
];

#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    /// Normal scores extracted from the reply.
    Scored(EmotionScoreSet),
    /// The reply carried safety language; the fixed distress set was substituted.
    SafetyOverride {
        scores: EmotionScoreSet,
        keyword: &'static str,
    },
}

impl ParseOutcome {
    pub fn scores(&self) -> EmotionScoreSet {
        match self {
            ParseOutcome::Scored(s) => *s,
            ParseOutcome::SafetyOverride { scores, .. } => *scores,
        }
    }

    pub fn is_safety_override(&self) -> bool {
        matches!(self, ParseOutcome::SafetyOverride { .. })
    }
}

/// First safety keyword found in `text`, case-insensitively.
pub fn detect_safety_keyword(text: &str) -> Option<&'static str> {
    let lowered = text.to_lowercase();
    SAFETY_KEYWORDS
        .iter()
        .copied()
        .find(|kw| lowered.contains(kw))
}

pub fn parse_scores(raw: &str) -> ScoringResult<ParseOutcome> {
    if let Some(keyword) = detect_safety_keyword(raw) {
        tracing::warn!("Safety keyword '{}' in model reply, substituting distress scores", keyword);
        return Ok(ParseOutcome::SafetyOverride {
            scores: EmotionScoreSet::distress(),
            keyword,
        });
    }

    let (start, end) = match (raw.find('{'), raw.rfind('}')) {
        (Some(start), Some(end)) if start < end => (start, end),
        _ => return Err(ScoringError::malformed("no JSON object in reply", raw)),
    };

    let value: Value = serde_json::from_str(&raw[start..=end])
        .map_err(|e| ScoringError::malformed(format!("invalid JSON: {}", e), raw))?;
    let object = value
        .as_object()
        .ok_or_else(|| ScoringError::malformed("reply JSON is not an object", raw))?;

    let scores = EmotionScoreSet::from_fn(|kind| match lookup(object, kind) {
        Some(v) => score_from_value(v).unwrap_or_else(|| {
            tracing::debug!("Non-numeric value for {}: {}, using {}", kind, v, MISSING_SCORE);
            MISSING_SCORE
        }),
        None => {
            tracing::debug!("Missing score for {}, using {}", kind, MISSING_SCORE);
            MISSING_SCORE
        }
    });

    Ok(ParseOutcome::Scored(scores))
}

/// Keys match case-insensitively so `"Depression"` is accepted.
fn lookup<'a>(object: &'a serde_json::Map<String, Value>, kind: EmotionKind) -> Option<&'a Value> {
    object.get(kind.as_str()).or_else(|| {
        object
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(kind.as_str()))
            .map(|(_, v)| v)
    })
}

fn score_from_value(value: &Value) -> Option<u32> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !n.is_finite() {
        return None;
    }
    Some(n.round().clamp(MIN_SCORE as f64, MAX_SCORE as f64) as u32)
}

//! Schema-shaped coercion of parsed model output.
//!
//! The last line of defense against well-formed-but-wrong AI responses.
//! Missing fields get defaults, enumerations are case-normalized with a
//! fallback member, scores are clamped to 0..=100, and list fields accept
//! strings, lists of strings, or lists of objects. Validation never fails;
//! every declared field is present in the output, defaulted if needed.
//! Unknown top-level keys are preserved so evolving response shapes survive
//! a round trip.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

// ── Enumerations ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GapSeverity {
    Bloccante,
    Importante,
    #[default]
    Minore,
}

impl<'de> Deserialize<'de> for GapSeverity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let v = Value::deserialize(deserializer)?;
        Ok(match normalized(&v).as_deref() {
            Some("bloccante") => GapSeverity::Bloccante,
            Some("importante") => GapSeverity::Importante,
            _ => GapSeverity::Minore,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Alta,
    #[default]
    Media,
    Bassa,
}

impl<'de> Deserialize<'de> for Confidence {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let v = Value::deserialize(deserializer)?;
        Ok(match normalized(&v).as_deref() {
            Some("alta") => Confidence::Alta,
            Some("bassa") => Confidence::Bassa,
            _ => Confidence::Media,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Recommendation {
    Apply,
    #[default]
    Consider,
    Skip,
}

impl<'de> Deserialize<'de> for Recommendation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let v = Value::deserialize(deserializer)?;
        Ok(match normalized(&v).as_deref() {
            Some("apply") => Recommendation::Apply,
            Some("skip") => Recommendation::Skip,
            _ => Recommendation::Consider,
        })
    }
}

/// Lowercased, trimmed view of a string-ish value for enum membership checks.
fn normalized(v: &Value) -> Option<String> {
    v.as_str().map(|s| s.trim().to_lowercase())
}

// ── List item shapes ────────────────────────────────────────────────────────

/// A single skill deficit found by the analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapItem {
    #[serde(default, deserialize_with = "lossy_string")]
    pub gap: String,
    #[serde(default)]
    pub severity: GapSeverity,
    #[serde(default = "default_true", deserialize_with = "lossy_bool")]
    pub closable: bool,
    #[serde(default, deserialize_with = "lossy_string")]
    pub how: String,
}

impl Default for GapItem {
    fn default() -> Self {
        Self {
            gap: String::new(),
            severity: GapSeverity::default(),
            closable: true,
            how: String::new(),
        }
    }
}

/// A single interview Q&A suggestion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InterviewScript {
    #[serde(default, deserialize_with = "lossy_string")]
    pub question: String,
    #[serde(default, deserialize_with = "lossy_string")]
    pub suggested_answer: String,
}

/// How the posting expects applications to arrive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationMethod {
    #[serde(
        rename = "type",
        default = "default_method_type",
        deserialize_with = "lossy_string"
    )]
    pub method_type: String,
    #[serde(default, deserialize_with = "lossy_string")]
    pub detail: String,
    #[serde(default, deserialize_with = "lossy_string")]
    pub note: String,
}

impl Default for ApplicationMethod {
    fn default() -> Self {
        Self {
            method_type: default_method_type(),
            detail: String::new(),
            note: String::new(),
        }
    }
}

fn default_method_type() -> String {
    "sconosciuto".to_string()
}

/// The model's honest guess about the employer's reputation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyReputation {
    #[serde(
        default = "default_glassdoor_estimate",
        deserialize_with = "lossy_string"
    )]
    pub glassdoor_estimate: String,
    #[serde(default, deserialize_with = "lossy_string_list")]
    pub known_pros: Vec<String>,
    #[serde(default, deserialize_with = "lossy_string_list")]
    pub known_cons: Vec<String>,
    #[serde(default, deserialize_with = "lossy_string")]
    pub note: String,
}

impl Default for CompanyReputation {
    fn default() -> Self {
        Self {
            glassdoor_estimate: default_glassdoor_estimate(),
            known_pros: Vec::new(),
            known_cons: Vec::new(),
            note: String::new(),
        }
    }
}

fn default_glassdoor_estimate() -> String {
    "non disponibile".to_string()
}

// ── Payloads ────────────────────────────────────────────────────────────────

/// Validated analysis response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisPayload {
    #[serde(default, deserialize_with = "lossy_string")]
    pub company: String,
    #[serde(default, deserialize_with = "lossy_string")]
    pub role: String,
    #[serde(default, deserialize_with = "lossy_string")]
    pub location: String,
    #[serde(default, deserialize_with = "lossy_string")]
    pub work_mode: String,
    #[serde(default, deserialize_with = "lossy_string")]
    pub salary_info: String,
    #[serde(default, deserialize_with = "clamped_score")]
    pub score: u8,
    #[serde(default, deserialize_with = "lossy_string")]
    pub score_label: String,
    #[serde(default, deserialize_with = "clamped_score")]
    pub potential_score: u8,
    #[serde(default, deserialize_with = "lossy_string")]
    pub gap_timeline: String,
    #[serde(default)]
    pub confidence: Confidence,
    #[serde(default, deserialize_with = "lossy_string")]
    pub confidence_reason: String,
    #[serde(default)]
    pub recommendation: Recommendation,
    #[serde(default, deserialize_with = "lossy_string")]
    pub job_summary: String,
    #[serde(default, deserialize_with = "lossy_string")]
    pub summary: String,
    #[serde(default, deserialize_with = "strength_list")]
    pub strengths: Vec<String>,
    #[serde(default, deserialize_with = "gap_list")]
    pub gaps: Vec<GapItem>,
    #[serde(default, deserialize_with = "script_list")]
    pub interview_scripts: Vec<InterviewScript>,
    #[serde(default, deserialize_with = "lossy_string")]
    pub advice: String,
    #[serde(default, deserialize_with = "coerced_application_method")]
    pub application_method: ApplicationMethod,
    #[serde(default, deserialize_with = "coerced_company_reputation")]
    pub company_reputation: CompanyReputation,
    #[serde(default, deserialize_with = "lossy_string")]
    pub full_response: String,
    /// Unvalidated keys the model added beyond the declared schema.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Validated cover letter response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoverLetterPayload {
    #[serde(default, deserialize_with = "lossy_string")]
    pub cover_letter: String,
    #[serde(default, deserialize_with = "subject_line_list")]
    pub subject_lines: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Validated follow-up email response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FollowupPayload {
    #[serde(default, deserialize_with = "lossy_string")]
    pub subject: String,
    #[serde(default, deserialize_with = "lossy_string")]
    pub body: String,
    #[serde(default, deserialize_with = "lossy_string")]
    pub tone_notes: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Validated LinkedIn outreach response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkedinPayload {
    #[serde(default, deserialize_with = "lossy_string")]
    pub message: String,
    #[serde(default, deserialize_with = "lossy_string")]
    pub connection_note: String,
    #[serde(default, deserialize_with = "lossy_string")]
    pub approach_tip: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ── Entry points ────────────────────────────────────────────────────────────

// Keys owned by the result envelope; stripped from the pass-through map so a
// response that echoes them cannot duplicate keys on serialization.
const ENVELOPE_KEYS: &[&str] = &[
    "model_used",
    "tokens",
    "cost_usd",
    "from_cache",
    "content_hash",
];

pub fn validate_analysis(raw: Value) -> AnalysisPayload {
    match serde_json::from_value::<AnalysisPayload>(raw) {
        Ok(mut payload) => {
            strip_envelope_keys(&mut payload.extra);
            payload
        }
        Err(e) => {
            warn!("analysis validation fell back to defaults: {e}");
            AnalysisPayload::default()
        }
    }
}

pub fn validate_cover_letter(raw: Value) -> CoverLetterPayload {
    match serde_json::from_value::<CoverLetterPayload>(raw) {
        Ok(mut payload) => {
            strip_envelope_keys(&mut payload.extra);
            payload
        }
        Err(e) => {
            warn!("cover letter validation fell back to defaults: {e}");
            CoverLetterPayload::default()
        }
    }
}

pub fn validate_followup(raw: Value) -> FollowupPayload {
    match serde_json::from_value::<FollowupPayload>(raw) {
        Ok(mut payload) => {
            strip_envelope_keys(&mut payload.extra);
            payload
        }
        Err(e) => {
            warn!("follow-up validation fell back to defaults: {e}");
            FollowupPayload::default()
        }
    }
}

pub fn validate_linkedin(raw: Value) -> LinkedinPayload {
    match serde_json::from_value::<LinkedinPayload>(raw) {
        Ok(mut payload) => {
            strip_envelope_keys(&mut payload.extra);
            payload
        }
        Err(e) => {
            warn!("LinkedIn message validation fell back to defaults: {e}");
            LinkedinPayload::default()
        }
    }
}

fn strip_envelope_keys(extra: &mut Map<String, Value>) {
    for key in ENVELOPE_KEYS {
        extra.remove(*key);
    }
}

// ── Field coercers ──────────────────────────────────────────────────────────

fn default_true() -> bool {
    true
}

fn lossy_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(string_from(Value::deserialize(deserializer)?))
}

fn string_from(v: Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn lossy_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => b,
        Value::String(s) => !s.trim().eq_ignore_ascii_case("false"),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        _ => true,
    })
}

fn clamped_score<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    Ok(clamp_score(&Value::deserialize(deserializer)?))
}

/// Coerces int / float / numeric string to an integer in 0..=100.
/// Anything non-numeric becomes 0.
pub(crate) fn clamp_score(v: &Value) -> u8 {
    let parsed = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(f) if f.is_finite() => f.clamp(0.0, 100.0) as u8,
        _ => 0,
    }
}

fn strength_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => split_comma_list(&s),
        Value::Array(items) => items.into_iter().map(strength_from_item).collect(),
        _ => Vec::new(),
    })
}

fn strength_from_item(item: Value) -> String {
    match item {
        Value::String(s) => s,
        Value::Object(ref m) => match m.get("skill").and_then(Value::as_str) {
            Some(skill) => skill.to_string(),
            None => item.to_string(),
        },
        other => other.to_string(),
    }
}

fn gap_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<GapItem>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => split_comma_list(&s)
            .into_iter()
            .map(|gap| GapItem {
                gap,
                ..GapItem::default()
            })
            .collect(),
        Value::Array(items) => items.into_iter().map(gap_from_item).collect(),
        _ => Vec::new(),
    })
}

fn gap_from_item(item: Value) -> GapItem {
    match item {
        Value::String(s) => GapItem {
            gap: s,
            ..GapItem::default()
        },
        Value::Object(_) => serde_json::from_value(item.clone()).unwrap_or_else(|_| GapItem {
            gap: string_from(item),
            ..GapItem::default()
        }),
        other => GapItem {
            gap: string_from(other),
            ..GapItem::default()
        },
    }
}

fn script_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<InterviewScript>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items.into_iter().map(script_from_item).collect(),
        _ => Vec::new(),
    })
}

fn script_from_item(item: Value) -> InterviewScript {
    match item {
        Value::String(s) => InterviewScript {
            question: s,
            ..InterviewScript::default()
        },
        Value::Object(_) => {
            serde_json::from_value(item.clone()).unwrap_or_else(|_| InterviewScript {
                question: string_from(item),
                ..InterviewScript::default()
            })
        }
        other => InterviewScript {
            question: string_from(other),
            ..InterviewScript::default()
        },
    }
}

fn subject_line_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => vec![s],
        Value::Array(items) => items
            .into_iter()
            .filter(|item| !item.is_null() && item.as_str() != Some(""))
            .map(string_from)
            .collect(),
        _ => Vec::new(),
    })
}

fn lossy_string_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => vec![s],
        Value::Array(items) => items.into_iter().map(string_from).collect(),
        _ => Vec::new(),
    })
}

fn coerced_application_method<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<ApplicationMethod, D::Error> {
    let v = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(v).unwrap_or_default())
}

fn coerced_company_reputation<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<CompanyReputation, D::Error> {
    let v = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(v).unwrap_or_default())
}

fn split_comma_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}

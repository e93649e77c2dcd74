//! Typed results returned by the AI gateway.
//!
//! Each operation's result is its validated payload plus the universal
//! envelope: the model that produced it, token counts, cost in USD, and
//! whether it came from the cache. Cached entries are stored without the
//! `from_cache` flag, so the field defaults to `false` on deserialization
//! and is flipped by the gateway on a hit.

use serde::{Deserialize, Serialize};

use crate::transport::Usage;
use crate::validate::{AnalysisPayload, CoverLetterPayload, FollowupPayload, LinkedinPayload};

/// Token counts for one call. `total` is always `input + output`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input: u32,
    pub output: u32,
    pub total: u32,
}

impl From<Usage> for TokenUsage {
    fn from(usage: Usage) -> Self {
        Self {
            input: usage.input_tokens,
            output: usage.output_tokens,
            total: usage.input_tokens + usage.output_tokens,
        }
    }
}

/// CV / job-description compatibility analysis.
///
/// Carries the full content fingerprint so callers can deduplicate against
/// their persisted analysis history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(flatten)]
    pub analysis: AnalysisPayload,
    pub model_used: String,
    pub content_hash: String,
    pub tokens: TokenUsage,
    pub cost_usd: f64,
    #[serde(default)]
    pub from_cache: bool,
}

/// Generated cover letter with alternative subject lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverLetterResult {
    #[serde(flatten)]
    pub letter: CoverLetterPayload,
    pub model_used: String,
    pub tokens: TokenUsage,
    pub cost_usd: f64,
    #[serde(default)]
    pub from_cache: bool,
}

/// Post-application follow-up email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowupResult {
    #[serde(flatten)]
    pub email: FollowupPayload,
    pub model_used: String,
    pub tokens: TokenUsage,
    pub cost_usd: f64,
    #[serde(default)]
    pub from_cache: bool,
}

/// LinkedIn outreach message for a recruiter or hiring manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkedinResult {
    #[serde(flatten)]
    pub message: LinkedinPayload,
    pub model_used: String,
    pub tokens: TokenUsage,
    pub cost_usd: f64,
    #[serde(default)]
    pub from_cache: bool,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_token_usage_total_invariant() {
        let tokens = TokenUsage::from(Usage {
            input_tokens: 1200,
            output_tokens: 345,
        });
        assert_eq!(tokens.total, tokens.input + tokens.output);
        assert_eq!(tokens.total, 1545);
    }

    #[test]
    fn test_analysis_round_trip_without_from_cache() {
        let result = AnalysisResult {
            analysis: crate::validate::validate_analysis(json!({"score": 80, "company": "Acme"})),
            model_used: "claude-haiku-4-5-20251001".to_string(),
            content_hash: "ab".repeat(32),
            tokens: TokenUsage {
                input: 10,
                output: 5,
                total: 15,
            },
            cost_usd: 0.000028,
            from_cache: false,
        };

        // Simulate a cache write: serialize, drop from_cache, read back.
        let mut stored = serde_json::to_value(&result).unwrap();
        stored.as_object_mut().unwrap().remove("from_cache");
        let read: AnalysisResult = serde_json::from_value(stored).unwrap();

        assert!(!read.from_cache);
        assert_eq!(read.analysis.score, 80);
        assert_eq!(read.analysis.company, "Acme");
        assert_eq!(read.tokens, result.tokens);
        assert_eq!(read.model_used, result.model_used);
    }

    #[test]
    fn test_flattened_payload_serializes_at_top_level() {
        let result = CoverLetterResult {
            letter: crate::validate::validate_cover_letter(
                json!({"cover_letter": "Gentile team,", "subject_lines": ["A"]}),
            ),
            model_used: "claude-sonnet-4-5-20250929".to_string(),
            tokens: TokenUsage {
                input: 1,
                output: 1,
                total: 2,
            },
            cost_usd: 0.0,
            from_cache: false,
        };
        let v = serde_json::to_value(&result).unwrap();
        assert_eq!(v["cover_letter"], "Gentile team,");
        assert_eq!(v["subject_lines"][0], "A");
        assert_eq!(v["model_used"], "claude-sonnet-4-5-20250929");
    }
}

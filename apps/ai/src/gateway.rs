//! AI gateway: the single entry point for all model-backed operations.
//!
//! Each operation follows the same sequence: fingerprint the inputs, try the
//! cache, call the transport, recover JSON from the raw text (escalating once
//! to model-assisted repair), coerce into the typed payload, price the call,
//! and write the result back to the cache best-effort.
//!
//! Both collaborators are injected at construction; nothing here reaches for
//! ambient global state.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::{ResultCache, CACHE_TTL_SECS};
use crate::errors::AiError;
use crate::fingerprint;
use crate::models::{AnalysisResult, CoverLetterResult, FollowupResult, LinkedinResult};
use crate::pricing;
use crate::prompts;
use crate::repair;
use crate::transport::Transport;
use crate::validate::{self, AnalysisPayload};

const ANALYSIS_MAX_TOKENS: u32 = 4096;
const COVER_LETTER_MAX_TOKENS: u32 = 2048;
const FOLLOWUP_MAX_TOKENS: u32 = 1024;
const LINKEDIN_MAX_TOKENS: u32 = 1024;
const SELF_REPAIR_MAX_TOKENS: u32 = 4096;

/// Broken payloads are truncated before the repair round trip to cap cost.
const SELF_REPAIR_INPUT_LIMIT: usize = 8000;
/// CV excerpt length for the short-form prompts (follow-up, LinkedIn).
const CV_SUMMARY_LIMIT: usize = 1500;
/// Input prefix length hashed into the cover-letter cache key.
const COVER_LETTER_KEY_LIMIT: usize = 300;

pub struct AiGateway {
    transport: Arc<dyn Transport>,
    cache: Arc<dyn ResultCache>,
}

impl AiGateway {
    pub fn new(transport: Arc<dyn Transport>, cache: Arc<dyn ResultCache>) -> Self {
        Self { transport, cache }
    }

    /// Scores a CV against a job description.
    ///
    /// The returned `content_hash` is the dedup key callers use against their
    /// persisted analysis history.
    pub async fn analyze_compatibility(
        &self,
        cv_text: &str,
        job_description: &str,
        model: &str,
    ) -> Result<AnalysisResult, AiError> {
        let model_id = pricing::resolve_model(model);
        let content_hash = fingerprint::fingerprint(cv_text, job_description);
        let cache_key = format!("analysis:{model}:{}", fingerprint::short(&content_hash));

        if let Some(mut result) = self.lookup::<AnalysisResult>(&cache_key).await {
            debug!("analysis served from cache");
            result.from_cache = true;
            result.content_hash = content_hash;
            return Ok(result);
        }

        let user_prompt = prompts::ANALYSIS_USER_TEMPLATE
            .replace("{cv_text}", cv_text)
            .replace("{job_description}", job_description);

        let completion = self
            .transport
            .call(prompts::ANALYSIS_SYSTEM, &user_prompt, model_id, ANALYSIS_MAX_TOKENS)
            .await?;

        let parsed = self.parse_or_self_repair(&completion.text, model_id).await?;
        let mut analysis = validate::validate_analysis(parsed);
        // The raw response never outlives the call that produced it.
        analysis.full_response = String::new();

        let result = AnalysisResult {
            analysis,
            model_used: model_id.to_string(),
            content_hash,
            tokens: completion.usage.into(),
            cost_usd: pricing::cost_usd(&completion.usage, model_id),
            from_cache: false,
        };

        self.store(&cache_key, serde_json::to_value(&result)).await;
        Ok(result)
    }

    /// Drafts a cover letter grounded in a prior analysis.
    pub async fn draft_cover_letter(
        &self,
        cv_text: &str,
        job_description: &str,
        analysis: &AnalysisPayload,
        language: &str,
        model: &str,
    ) -> Result<CoverLetterResult, AiError> {
        let model_id = pricing::resolve_model(model);
        let fp = fingerprint::fingerprint_salted(
            &truncate_chars(cv_text, COVER_LETTER_KEY_LIMIT),
            &truncate_chars(job_description, COVER_LETTER_KEY_LIMIT),
            &format!("{model}:{language}"),
        );
        let cache_key = format!("coverletter:{model}:{}", fingerprint::short(&fp));

        if let Some(mut result) = self.lookup::<CoverLetterResult>(&cache_key).await {
            debug!("cover letter served from cache");
            result.from_cache = true;
            return Ok(result);
        }

        let strengths_text = join_first(&analysis.strengths, 5);
        let gaps: Vec<String> = analysis.gaps.iter().map(|g| g.gap.clone()).collect();
        let gaps_text = join_first(&gaps, 5);

        let user_prompt = prompts::COVER_LETTER_USER_TEMPLATE
            .replace("{cv_text}", cv_text)
            .replace("{job_description}", job_description)
            .replace("{role}", &analysis.role)
            .replace("{company}", &analysis.company)
            .replace("{score}", &analysis.score.to_string())
            .replace("{strengths}", &strengths_text)
            .replace("{gaps}", &gaps_text)
            .replace("{language}", language);

        let completion = self
            .transport
            .call(
                prompts::COVER_LETTER_SYSTEM,
                &user_prompt,
                model_id,
                COVER_LETTER_MAX_TOKENS,
            )
            .await?;

        let parsed = self.parse_or_self_repair(&completion.text, model_id).await?;
        let result = CoverLetterResult {
            letter: validate::validate_cover_letter(parsed),
            model_used: model_id.to_string(),
            tokens: completion.usage.into(),
            cost_usd: pricing::cost_usd(&completion.usage, model_id),
            from_cache: false,
        };

        self.store(&cache_key, serde_json::to_value(&result)).await;
        Ok(result)
    }

    /// Drafts a follow-up email some days after an application was sent.
    /// Uncached: the day count makes every request effectively unique.
    pub async fn draft_followup_email(
        &self,
        cv_text: &str,
        role: &str,
        company: &str,
        days_since: u32,
        language: &str,
        model: &str,
    ) -> Result<FollowupResult, AiError> {
        let model_id = pricing::resolve_model(model);
        let cv_summary = truncate_chars(cv_text, CV_SUMMARY_LIMIT);

        let user_prompt = prompts::FOLLOWUP_USER_TEMPLATE
            .replace("{cv_summary}", &cv_summary)
            .replace("{role}", role)
            .replace("{company}", company)
            .replace("{days_since_application}", &days_since.to_string())
            .replace("{language}", language);

        let completion = self
            .transport
            .call(prompts::FOLLOWUP_SYSTEM, &user_prompt, model_id, FOLLOWUP_MAX_TOKENS)
            .await?;

        let parsed = self.parse_or_self_repair(&completion.text, model_id).await?;
        Ok(FollowupResult {
            email: validate::validate_followup(parsed),
            model_used: model_id.to_string(),
            tokens: completion.usage.into(),
            cost_usd: pricing::cost_usd(&completion.usage, model_id),
            from_cache: false,
        })
    }

    /// Drafts a LinkedIn outreach message for a recruiter or hiring manager.
    /// Uncached, like the follow-up email.
    pub async fn draft_linkedin_message(
        &self,
        cv_text: &str,
        role: &str,
        company: &str,
        contact_info: &str,
        language: &str,
        model: &str,
    ) -> Result<LinkedinResult, AiError> {
        let model_id = pricing::resolve_model(model);
        let cv_summary = truncate_chars(cv_text, CV_SUMMARY_LIMIT);
        let contact = if contact_info.trim().is_empty() {
            "Not available"
        } else {
            contact_info
        };

        let user_prompt = prompts::LINKEDIN_USER_TEMPLATE
            .replace("{cv_summary}", &cv_summary)
            .replace("{role}", role)
            .replace("{company}", company)
            .replace("{contact_info}", contact)
            .replace("{language}", language);

        let completion = self
            .transport
            .call(prompts::LINKEDIN_SYSTEM, &user_prompt, model_id, LINKEDIN_MAX_TOKENS)
            .await?;

        let parsed = self.parse_or_self_repair(&completion.text, model_id).await?;
        Ok(LinkedinResult {
            message: validate::validate_linkedin(parsed),
            model_used: model_id.to_string(),
            tokens: completion.usage.into(),
            cost_usd: pricing::cost_usd(&completion.usage, model_id),
            from_cache: false,
        })
    }

    /// Runs the repair pipeline; on exhaustion, sends the broken text back to
    /// the model once with a fix-only instruction and re-runs the pipeline.
    /// A second failure surfaces the ORIGINAL parse error.
    async fn parse_or_self_repair(&self, raw: &str, model_id: &str) -> Result<Value, AiError> {
        let original_err = match repair::parse_model_json(raw) {
            Ok(v) => return Ok(v),
            Err(e) => e,
        };

        warn!(
            "primary JSON parse failed (model={model_id}, response_len={}), attempting model-assisted repair",
            raw.len()
        );

        let truncated = truncate_chars(raw, SELF_REPAIR_INPUT_LIMIT);
        let fix_prompt = prompts::JSON_FIX_USER_TEMPLATE.replace("{broken_json}", &truncated);

        match self
            .transport
            .call(prompts::JSON_FIX_SYSTEM, &fix_prompt, model_id, SELF_REPAIR_MAX_TOKENS)
            .await
        {
            Ok(completion) => match repair::parse_model_json(&completion.text) {
                Ok(v) => {
                    info!("model-assisted JSON repair succeeded");
                    Ok(v)
                }
                Err(e) => {
                    warn!("model-assisted JSON repair still malformed: {e}");
                    Err(AiError::Malformed(original_err))
                }
            },
            Err(e) => {
                warn!("model-assisted JSON repair call failed: {e}");
                Err(AiError::Malformed(original_err))
            }
        }
    }

    /// Cache read that tolerates stale or unreadable entries.
    async fn lookup<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.cache.get_json(key).await?;
        match serde_json::from_value(value) {
            Ok(result) => Some(result),
            Err(e) => {
                debug!("ignoring stale cache entry '{key}': {e}");
                None
            }
        }
    }

    /// Best-effort cache write. The stored entry omits `from_cache` so the
    /// flag always reflects the current call, not the original one.
    async fn store(&self, key: &str, value: serde_json::Result<Value>) {
        match value {
            Ok(mut v) => {
                if let Some(map) = v.as_object_mut() {
                    map.remove("from_cache");
                }
                self.cache.set_json(key, &v, CACHE_TTL_SECS).await;
            }
            Err(e) => debug!("skipping cache write for '{key}': {e}"),
        }
    }
}

/// Char-safe prefix, since CVs are routinely non-ASCII.
fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

fn join_first(items: &[String], n: usize) -> String {
    items
        .iter()
        .take(n)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;
    use crate::cache::testing::MemoryCache;
    use crate::cache::NullCache;
    use crate::transport::{Completion, TransportError, Usage};

    const CV: &str = "Python developer, 5 yrs";
    const JD: &str = "Senior Backend Role";

    /// Scripted transport: pops one canned response per call and records
    /// every prompt it was given.
    struct MockTransport {
        responses: Mutex<VecDeque<Result<String, TransportError>>>,
        calls: AtomicUsize,
        prompts: Mutex<Vec<(String, String)>>,
    }

    impl MockTransport {
        fn new(responses: Vec<Result<String, TransportError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into_iter().collect()),
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn last_user_prompt(&self) -> String {
            self.prompts.lock().unwrap().last().unwrap().1.clone()
        }
    }

    #[async_trait::async_trait]
    impl Transport for MockTransport {
        async fn call(
            &self,
            system: &str,
            user: &str,
            _model_id: &str,
            _max_tokens: u32,
        ) -> Result<Completion, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts
                .lock()
                .unwrap()
                .push((system.to_string(), user.to_string()));
            let next = self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("transport called more times than scripted");
            next.map(|text| Completion {
                text,
                usage: Usage {
                    input_tokens: 1000,
                    output_tokens: 500,
                },
            })
        }
    }

    fn init_tracing() {
        use tracing_subscriber::EnvFilter;
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .try_init()
            .ok();
    }

    fn messy_analysis_response() -> String {
        // Fenced, trailing comma, score as numeric string
        "```json\n{\"company\": \"Acme\", \"role\": \"Backend Engineer\", \
         \"score\": \"87.5\", \"recommendation\": \"apply\", \"gaps\": [\"Kubernetes\"],}\n```"
            .to_string()
    }

    #[tokio::test]
    async fn test_analyze_validates_prices_and_fingerprints() {
        init_tracing();
        let transport = MockTransport::new(vec![Ok(messy_analysis_response())]);
        let gateway = AiGateway::new(transport.clone(), Arc::new(NullCache));

        let result = gateway.analyze_compatibility(CV, JD, "haiku").await.unwrap();

        assert_eq!(result.analysis.company, "Acme");
        assert_eq!(result.analysis.score, 87);
        assert_eq!(
            result.analysis.recommendation,
            crate::validate::Recommendation::Apply
        );
        assert_eq!(result.analysis.gaps[0].gap, "Kubernetes");
        assert_eq!(result.model_used, "claude-haiku-4-5-20251001");
        assert_eq!(result.tokens.total, 1500);
        assert_eq!(result.cost_usd, 0.0028);
        assert!(!result.from_cache);
        assert_eq!(result.content_hash.len(), 64);
        assert_eq!(result.content_hash, fingerprint::fingerprint(CV, JD));
    }

    #[tokio::test]
    async fn test_second_identical_analysis_served_from_cache() {
        let transport = MockTransport::new(vec![Ok(messy_analysis_response())]);
        let cache = Arc::new(MemoryCache::default());
        let gateway = AiGateway::new(transport.clone(), cache);

        let first = gateway.analyze_compatibility(CV, JD, "haiku").await.unwrap();
        let second = gateway.analyze_compatibility(CV, JD, "haiku").await.unwrap();

        assert_eq!(transport.calls(), 1);
        assert!(!first.from_cache);
        assert!(second.from_cache);
        assert_eq!(second.content_hash, first.content_hash);
        assert_eq!(second.analysis.score, first.analysis.score);
        assert_eq!(second.cost_usd, first.cost_usd);
    }

    #[tokio::test]
    async fn test_cached_entry_omits_from_cache_flag() {
        let transport = MockTransport::new(vec![Ok(messy_analysis_response())]);
        let cache = Arc::new(MemoryCache::default());
        let gateway = AiGateway::new(transport, cache.clone());

        gateway.analyze_compatibility(CV, JD, "haiku").await.unwrap();

        let key = format!(
            "analysis:haiku:{}",
            fingerprint::short(&fingerprint::fingerprint(CV, JD))
        );
        let stored = cache.get(&key).await.unwrap();
        assert!(!stored.contains("from_cache"));
    }

    #[tokio::test]
    async fn test_self_repair_recovers_broken_response() {
        init_tracing();
        let transport = MockTransport::new(vec![
            Ok("Sure! The analysis went well but I forgot the JSON format entirely.".to_string()),
            Ok("{\"company\": \"Acme\", \"score\": 70}".to_string()),
        ]);
        let gateway = AiGateway::new(transport.clone(), Arc::new(NullCache));

        let result = gateway.analyze_compatibility(CV, JD, "haiku").await.unwrap();

        assert_eq!(transport.calls(), 2);
        assert_eq!(result.analysis.score, 70);
        // Cost accounting covers the primary call only.
        assert_eq!(result.tokens.total, 1500);

        let (system, user) = transport.prompts.lock().unwrap()[1].clone();
        assert_eq!(system, prompts::JSON_FIX_SYSTEM);
        assert!(user.contains("Fix this malformed JSON"));
    }

    #[tokio::test]
    async fn test_self_repair_attempted_at_most_once() {
        let transport = MockTransport::new(vec![
            Ok("not json at all".to_string()),
            Ok("still not json".to_string()),
        ]);
        let gateway = AiGateway::new(transport.clone(), Arc::new(NullCache));

        let err = gateway
            .analyze_compatibility(CV, JD, "haiku")
            .await
            .unwrap_err();

        assert_eq!(transport.calls(), 2);
        match err {
            AiError::Malformed(m) => assert!(m.snippet.starts_with("not json")),
            other => panic!("expected Malformed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_transport_error_during_self_repair_keeps_parse_error() {
        let transport = MockTransport::new(vec![
            Ok("garbage".to_string()),
            Err(TransportError::EmptyContent),
        ]);
        let gateway = AiGateway::new(transport.clone(), Arc::new(NullCache));

        let err = gateway
            .analyze_compatibility(CV, JD, "haiku")
            .await
            .unwrap_err();

        assert!(matches!(err, AiError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_primary_transport_error_propagates() {
        let transport = MockTransport::new(vec![Err(TransportError::Api {
            status: 401,
            message: "invalid api key".to_string(),
        })]);
        let gateway = AiGateway::new(transport, Arc::new(NullCache));

        let err = gateway
            .analyze_compatibility(CV, JD, "haiku")
            .await
            .unwrap_err();

        match err {
            AiError::Transport(TransportError::Api { status, .. }) => assert_eq!(status, 401),
            other => panic!("expected Transport, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_model_alias_falls_back_to_haiku() {
        let transport = MockTransport::new(vec![Ok("{\"score\": 10}".to_string())]);
        let gateway = AiGateway::new(transport, Arc::new(NullCache));

        let result = gateway.analyze_compatibility(CV, JD, "opus").await.unwrap();
        assert_eq!(result.model_used, pricing::DEFAULT_MODEL_ID);
    }

    #[tokio::test]
    async fn test_cover_letter_prompt_folds_in_analysis() {
        let transport = MockTransport::new(vec![Ok(
            "{\"cover_letter\": \"Gentile team,\", \"subject_lines\": [\"Candidatura\"]}"
                .to_string(),
        )]);
        let gateway = AiGateway::new(transport.clone(), Arc::new(NullCache));

        let analysis = validate::validate_analysis(json!({
            "company": "Acme", "role": "Backend Engineer", "score": 87,
            "strengths": ["Python", "PostgreSQL", "Docker", "CI", "Linux", "Kafka"],
            "gaps": [{"gap": "Kubernetes"}],
        }));

        let result = gateway
            .draft_cover_letter(CV, JD, &analysis, "italiano", "sonnet")
            .await
            .unwrap();

        assert_eq!(result.letter.cover_letter, "Gentile team,");
        assert_eq!(result.model_used, "claude-sonnet-4-5-20250929");

        let prompt = transport.last_user_prompt();
        assert!(prompt.contains("Backend Engineer"));
        assert!(prompt.contains("87/100"));
        assert!(prompt.contains("Python, PostgreSQL, Docker, CI, Linux"));
        // Only the first five strengths are folded in.
        assert!(!prompt.contains("Kafka"));
        assert!(prompt.contains("Kubernetes"));
        assert!(prompt.contains("italiano"));
    }

    #[tokio::test]
    async fn test_cover_letter_cache_varies_by_language() {
        let letter = "{\"cover_letter\": \"Dear team,\", \"subject_lines\": []}".to_string();
        let transport = MockTransport::new(vec![Ok(letter.clone()), Ok(letter)]);
        let cache = Arc::new(MemoryCache::default());
        let gateway = AiGateway::new(transport.clone(), cache);
        let analysis = validate::validate_analysis(json!({"company": "Acme"}));

        gateway
            .draft_cover_letter(CV, JD, &analysis, "italiano", "haiku")
            .await
            .unwrap();
        gateway
            .draft_cover_letter(CV, JD, &analysis, "english", "haiku")
            .await
            .unwrap();
        let cached = gateway
            .draft_cover_letter(CV, JD, &analysis, "italiano", "haiku")
            .await
            .unwrap();

        assert_eq!(transport.calls(), 2);
        assert!(cached.from_cache);
    }

    #[tokio::test]
    async fn test_followup_is_never_cached() {
        let email = "{\"subject\": \"Follow-up\", \"body\": \"Gentile team,\"}".to_string();
        let transport = MockTransport::new(vec![Ok(email.clone()), Ok(email)]);
        let cache = Arc::new(MemoryCache::default());
        let gateway = AiGateway::new(transport.clone(), cache.clone());

        let first = gateway
            .draft_followup_email(CV, "Backend Engineer", "Acme", 7, "italiano", "haiku")
            .await
            .unwrap();
        gateway
            .draft_followup_email(CV, "Backend Engineer", "Acme", 7, "italiano", "haiku")
            .await
            .unwrap();

        assert_eq!(transport.calls(), 2);
        assert_eq!(cache.len(), 0);
        assert_eq!(first.email.subject, "Follow-up");
        assert!(transport.last_user_prompt().contains("GIORNI DALLA CANDIDATURA: 7"));
    }

    #[tokio::test]
    async fn test_linkedin_blank_contact_becomes_not_available() {
        let transport = MockTransport::new(vec![Ok(
            "{\"message\": \"Ciao!\", \"connection_note\": \"n\", \"approach_tip\": \"t\"}"
                .to_string(),
        )]);
        let gateway = AiGateway::new(transport.clone(), Arc::new(NullCache));

        let result = gateway
            .draft_linkedin_message(CV, "Backend Engineer", "Acme", "  ", "italiano", "haiku")
            .await
            .unwrap();

        assert_eq!(result.message.message, "Ciao!");
        assert!(transport.last_user_prompt().contains("CONTATTO: Not available"));
    }

    #[tokio::test]
    async fn test_long_cv_is_truncated_in_short_form_prompts() {
        let transport =
            MockTransport::new(vec![Ok("{\"subject\": \"s\", \"body\": \"b\"}".to_string())]);
        let gateway = AiGateway::new(transport.clone(), Arc::new(NullCache));

        let long_cv = "x".repeat(4000);
        gateway
            .draft_followup_email(&long_cv, "r", "c", 3, "it", "haiku")
            .await
            .unwrap();

        let prompt = transport.last_user_prompt();
        assert!(prompt.contains(&"x".repeat(CV_SUMMARY_LIMIT)));
        assert!(!prompt.contains(&"x".repeat(CV_SUMMARY_LIMIT + 1)));
    }
}

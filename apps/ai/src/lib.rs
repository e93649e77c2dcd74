//! AI layer of the jobsearch application tracker.
//!
//! Turns free-form Claude responses into validated, typed results: JSON
//! repair, schema coercion, Redis caching, and per-call cost accounting.
//! The web/API crate consumes this through [`AiGateway`].

pub mod cache;
pub mod config;
pub mod errors;
pub mod fingerprint;
pub mod gateway;
pub mod models;
pub mod pricing;
pub mod prompts;
pub mod repair;
pub mod transport;
pub mod validate;

pub use cache::{NullCache, RedisCache, ResultCache};
pub use config::Config;
pub use errors::AiError;
pub use gateway::AiGateway;
pub use models::{AnalysisResult, CoverLetterResult, FollowupResult, LinkedinResult, TokenUsage};
pub use transport::{AnthropicTransport, Completion, Transport, TransportError, Usage};

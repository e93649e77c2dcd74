use thiserror::Error;

use crate::repair::MalformedJson;
use crate::transport::TransportError;

/// The only failures a caller of [`crate::AiGateway`] can observe.
///
/// Validation problems resolve internally to defaults-filled results and
/// cache problems degrade to misses; neither ever aborts an operation.
#[derive(Debug, Error)]
pub enum AiError {
    #[error("malformed AI response: {0}")]
    Malformed(#[from] MalformedJson),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

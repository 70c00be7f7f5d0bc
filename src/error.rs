use thiserror::Error;

use crate::RuleError;

/// Unified error type covering rule documents, compilation and the binary
/// envelope.
///
/// Returned by convenience entry points like [`compile_json()`](crate::compile_json)
/// that both decode and compile a rule.
#[derive(Debug, Error)]
pub enum RulekitError {
    #[error(transparent)]
    Rule(#[from] RuleError),

    #[error("invalid rule document: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "binary")]
    #[error(transparent)]
    Serialize(#[from] crate::serial::SerializeError),

    #[cfg(feature = "binary")]
    #[error(transparent)]
    Deserialize(#[from] crate::serial::DeserializeError),
}

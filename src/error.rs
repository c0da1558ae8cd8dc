use tasep_common::ParamsError;
use thiserror::Error;

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors raised by the simulation engine.
///
/// Neither variant is retryable. A configuration error means the caller must
/// supply different parameters; an invariant violation means the engine state is
/// corrupt and has to be rebuilt from scratch.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// The configuration cannot produce a valid particle system.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Internal bookkeeping is inconsistent with the particle positions.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

impl From<ParamsError> for EngineError {
    fn from(err: ParamsError) -> Self {
        EngineError::Configuration(err.to_string())
    }
}

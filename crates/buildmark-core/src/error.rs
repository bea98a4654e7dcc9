//! Error taxonomy shared by the version and config facilities.

/// Errors produced by buildmark operations.
#[derive(Debug, thiserror::Error)]
pub enum BuildmarkError {
    /// An operation was invoked on a target that has not been set up yet,
    /// e.g. a config save path or save value that was never installed.
    #[error("target is undefined: {0}")]
    Undefined(&'static str),

    /// A required numeric component (or the whole version pattern) could
    /// not be parsed.
    #[error("invalid parameter: {0}")]
    ParamInvalid(String),

    /// A numeric component failed to parse; propagated unwrapped so callers
    /// see the underlying cause.
    #[error(transparent)]
    Num(#[from] std::num::ParseIntError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for buildmark operations.
pub type Result<T> = std::result::Result<T, BuildmarkError>;

use thiserror::Error;

/// Errors surfaced at the engine boundary.
///
/// Sparse or degenerate history is never an error; these only come from configuration
/// loading and from the collaborator that supplies data snapshots.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("data source error: {0}")]
    Source(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;

/// Why a raw record was dropped during normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RecordRejection {
    #[error("record has no timestamp")]
    MissingTimestamp,
    #[error("timestamp is not a valid instant")]
    InvalidTimestamp,
    #[error("attempt has no outcome")]
    MissingOutcome,
    #[error("session has no score and no word counts")]
    MissingScore,
    #[error("record has no id")]
    MissingId,
}

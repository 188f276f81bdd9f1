use thiserror::Error;

/// Caller-visible error taxonomy for the lifecycle pipeline.
///
/// Only `Validation` and `Persistence` are produced by the write path;
/// side-effect failures (audit append, ledger anchoring) are logged and
/// swallowed inside the dispatch worker and never surface here.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

use thiserror::Error;

/// The six error kinds named in the pipeline's error-handling design: each
/// carries a distinct recovery story (skip-and-log, abort-tick, or surface
/// as an HTTP status from the read API).
#[derive(Error, Debug)]
pub enum PainError {
    #[error("transient upstream failure: {0}")]
    TransientUpstream(String),

    #[error("failed to parse response: {0}")]
    Parse(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("auth error: {0}")]
    Auth(String),
}

impl From<sqlx::Error> for PainError {
    fn from(e: sqlx::Error) -> Self {
        PainError::Storage(e.to_string())
    }
}

impl From<reqwest::Error> for PainError {
    fn from(e: reqwest::Error) -> Self {
        PainError::TransientUpstream(e.to_string())
    }
}

impl PainError {
    /// HTTP status this error kind maps to when surfaced by the read API.
    pub fn status_code(&self) -> u16 {
        match self {
            PainError::TransientUpstream(_) => 503,
            PainError::Parse(_) => 500,
            PainError::Storage(_) => 500,
            PainError::Validation(_) => 400,
            PainError::NotFound(_) => 404,
            PainError::Auth(_) => 401,
        }
    }
}

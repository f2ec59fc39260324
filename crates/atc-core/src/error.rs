use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("dependency unavailable: {0}")]
    DependencyUnavailable(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("{0}")]
    Validation(String),
    #[error("git error: {0}")]
    Vcs(String),
    #[error("multiplexer error: {0}")]
    Mux(String),
    #[error("session not found: {0}")]
    SessionNotFound(String),
}

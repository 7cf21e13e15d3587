// shared/src/lib.rs

/// Boxed error carried by loader failures
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("loader failed: {0}")]
    LoaderFailure(#[source] BoxError),
    #[error("infrastructure unavailable: {0}")]
    InfrastructureUnavailable(String),
    #[error("not found")]
    NotFound,
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("validation failed on '{field}': {reason}")]
    Validation { field: &'static str, reason: String },
    #[error("internal: {0}")]
    Internal(String),
}

impl Error {
    /// Wrap any loader-side error
    pub fn loader(err: impl Into<BoxError>) -> Self {
        Error::LoaderFailure(err.into())
    }

    pub fn infrastructure(msg: impl Into<String>) -> Self {
        Error::InfrastructureUnavailable(msg.into())
    }

    /// True when the coordination backend (cache or lock store) is down,
    /// as opposed to a data or input problem.
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, Error::InfrastructureUnavailable(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

pub mod config;

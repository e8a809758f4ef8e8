use thiserror::Error;

pub type Result<T> = std::result::Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// A referenced user, article, post or review is absent.
    #[error("{0}")]
    NotFound(String),

    /// The request is well-formed but not acceptable: empty content, unknown
    /// status or vote direction, duplicate review, or a frozen article.
    #[error("{0}")]
    InvalidArgument(String),

    /// The actor is not the author of the resource being changed.
    #[error("{0}")]
    NotAuthorized(String),

    #[error("storage failure: {0}")]
    Storage(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn not_authorized(msg: impl Into<String>) -> Self {
        Self::NotAuthorized(msg.into())
    }
}

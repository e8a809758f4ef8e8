use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use referee_core::ServiceError;
use referee_types::api::ErrorResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Like `Service`, but a rejected argument answers 400 rather than 422.
    /// Used by the vote and status-edit routes.
    #[error(transparent)]
    BadRequest(ServiceError),

    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl ApiError {
    pub fn bad_request(err: ServiceError) -> Self {
        Self::BadRequest(err)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Service(err) => service_status(err, StatusCode::UNPROCESSABLE_ENTITY),
            Self::BadRequest(err) => service_status(err, StatusCode::BAD_REQUEST),
            Self::Join(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn service_status(err: &ServiceError, invalid: StatusCode) -> StatusCode {
    match err {
        ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        ServiceError::InvalidArgument(_) => invalid,
        ServiceError::NotAuthorized(_) => StatusCode::UNAUTHORIZED,
        ServiceError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // storage details stay in the log
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Request failed: {:#}", self);
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

/// Run engine work off the async runtime.
pub async fn blocking<F, T>(f: F) -> Result<referee_core::Result<T>, ApiError>
where
    F: FnOnce() -> referee_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    Ok(tokio::task::spawn_blocking(f).await?)
}

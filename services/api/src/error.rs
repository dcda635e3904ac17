//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service, and how each
//! error surfaces to an HTTP client.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use emotionverse_core::identity::SignInError;
use emotionverse_core::ports::PortError;
use tracing::error;

use crate::config::ConfigError;
use crate::web::auth::NoticeResponse;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Sign-in refused for the client's environment, or the provider failed.
    #[error("Sign-in error: {0}")]
    SignIn(#[from] SignInError),

    #[error("Unknown persona '{0}'")]
    UnknownPersona(String),

    #[error("Unknown client environment '{0}'")]
    UnknownEnvironment(String),

    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Binding the listener, mostly.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::SignIn(SignInError::Unsupported(notice)) => {
                (StatusCode::CONFLICT, Json(NoticeResponse::from(notice))).into_response()
            }
            ApiError::UnknownPersona(_) => {
                (StatusCode::NOT_FOUND, self.to_string()).into_response()
            }
            ApiError::UnknownEnvironment(_) => {
                (StatusCode::BAD_REQUEST, self.to_string()).into_response()
            }
            other => {
                error!("Request failed: {}", other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emotionverse_core::identity::SignInNotice;

    #[test]
    fn client_errors_keep_their_status() {
        let notice = ApiError::SignIn(SignInError::Unsupported(
            SignInNotice::unsupported_environment(),
        ));
        assert_eq!(notice.into_response().status(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::UnknownPersona("Envy".into()).into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::UnknownEnvironment("web".into()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn provider_failures_are_internal() {
        let err = ApiError::SignIn(SignInError::Port(PortError::Unexpected("boom".into())));
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}

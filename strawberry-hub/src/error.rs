//! Error types for strawberry-hub
//!
//! Every error is recovered at the request boundary and reported to the
//! client as an [`OpStatus`] code in the response body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use strawberry_common::api::OpStatus;
use thiserror::Error;

use crate::fanout::FanoutError;

/// Main error type for strawberry-hub
#[derive(Error, Debug)]
pub enum Error {
    /// Launch parameters missing, unsigned, or signed with another secret
    #[error("Signature invalid: {0}")]
    SignatureInvalid(String),

    /// Bearer token unknown or expired
    #[error("Token invalid")]
    TokenInvalid,

    /// Database connection or query errors
    #[error("Store error: {0}")]
    Store(#[from] sqlx::Error),

    /// A backend was unreachable, timed out, or answered with an error
    #[error("Microservice error: {0}")]
    Fanout(FanoutError),

    /// No backend with the requested name
    #[error("Not found: {0}")]
    NotFound(String),

    /// Group is not ready for generation
    #[error("Group {0} is not ready")]
    NotReady(i64),

    /// Malformed request body
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Status code reported to clients
    pub fn status(&self) -> OpStatus {
        match self {
            Error::SignatureInvalid(_) | Error::TokenInvalid => OpStatus::AuthError,
            Error::Store(_) => OpStatus::StoreError,
            Error::Fanout(_) | Error::NotFound(_) => OpStatus::MicroserviceError,
            Error::NotReady(_) => OpStatus::NotReady,
            Error::BadRequest(_) | Error::Internal(_) => OpStatus::InternalError,
        }
    }
}

impl From<FanoutError> for Error {
    fn from(err: FanoutError) -> Self {
        match err {
            FanoutError::UnknownBackend(name) => Error::NotFound(format!("backend {}", name)),
            other => Error::Fanout(other),
        }
    }
}

impl From<strawberry_common::Error> for Error {
    fn from(err: strawberry_common::Error) -> Self {
        match err {
            strawberry_common::Error::Database(e) => Error::Store(e),
            other => Error::Internal(other.to_string()),
        }
    }
}

/// Used for failures that happen before a handler runs (body extraction).
/// Domain outcomes are answered with HTTP 200 by the handlers themselves.
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let http_status = match self {
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "status": self.status(),
            "error": self.to_string(),
        }));

        (http_status, body).into_response()
    }
}

/// Convenience Result type using strawberry-hub Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(Error::SignatureInvalid("x".into()).status(), OpStatus::AuthError);
        assert_eq!(Error::TokenInvalid.status(), OpStatus::AuthError);
        assert_eq!(Error::Store(sqlx::Error::PoolTimedOut).status(), OpStatus::StoreError);
        assert_eq!(
            Error::Fanout(FanoutError::Timeout { backend: "text_gen".into() }).status(),
            OpStatus::MicroserviceError
        );
        assert_eq!(Error::NotFound("x".into()).status(), OpStatus::MicroserviceError);
        assert_eq!(Error::NotReady(1).status(), OpStatus::NotReady);
        assert_eq!(Error::BadRequest("x".into()).status(), OpStatus::InternalError);
        assert_eq!(Error::Internal("x".into()).status(), OpStatus::InternalError);
    }

    #[test]
    fn test_unknown_backend_becomes_not_found() {
        let err: Error = FanoutError::UnknownBackend("nope".into()).into();
        assert!(matches!(err, Error::NotFound(_)));
    }
}

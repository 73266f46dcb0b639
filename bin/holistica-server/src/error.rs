//! Unified server error type.
//!
//! Every handler returns `Result<T, ServerError>`, which implements
//! [`axum::response::IntoResponse`] so errors are automatically converted
//! to a JSON-body HTTP response with an appropriate status code.
//!
//! **Security note:** Internal errors (Database, Internal) are logged with
//! full detail but only a generic message is returned to the caller so that
//! SQL, file paths, or other implementation details never leak to clients.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use holistica_responder::ResponderError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// All errors that can occur in the request lifecycle.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The caller sent malformed or out-of-range input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Missing, invalid, or expired credentials.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated, but the policy denies access to the record.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The caller referenced a record that does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A unique field (email, CRP, message slot) is already taken.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The external AI service failed or timed out.
    #[error("upstream AI error: {0}")]
    Upstream(#[from] ResponderError),

    /// Propagated from the SQLite store.
    #[error("database error: {0}")]
    Database(sqlx::Error),

    /// An unclassified internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, client_message) = match &self {
            // Client-facing errors: expose the message directly.
            ServerError::Validation(m) => (StatusCode::BAD_REQUEST, m.clone()),
            ServerError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, m.clone()),
            ServerError::Forbidden(m) => (StatusCode::FORBIDDEN, m.clone()),
            ServerError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
            ServerError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),

            // Upstream failures: 504 on timeout, 502 otherwise. The patient
            // message is already persisted at this point; the caller may
            // retry with the same expected_seq.
            ServerError::Upstream(e) => {
                error!(error = %e, "AI service failure");
                match e {
                    ResponderError::Timeout => (
                        StatusCode::GATEWAY_TIMEOUT,
                        "tempo esgotado ao contatar o serviço de IA".to_owned(),
                    ),
                    _ => (
                        StatusCode::BAD_GATEWAY,
                        "serviço de IA indisponível no momento".to_owned(),
                    ),
                }
            }

            // Internal errors: log the full detail, return a generic message.
            ServerError::Database(e) => {
                error!(error = %e, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "erro interno do servidor".to_owned(),
                )
            }
            ServerError::Internal(m) => {
                error!(message = %m, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "erro interno do servidor".to_owned(),
                )
            }
        };
        (status, Json(json!({ "error": client_message }))).into_response()
    }
}

impl From<sqlx::Error> for ServerError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::RowNotFound => {
                ServerError::NotFound("registro não encontrado".to_owned())
            }
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                ServerError::Conflict("valor duplicado para um campo único".to_owned())
            }
            _ => ServerError::Database(e),
        }
    }
}

impl From<validator::ValidationErrors> for ServerError {
    fn from(e: validator::ValidationErrors) -> Self {
        ServerError::Validation(e.to_string())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use axum::response::IntoResponse;

    #[test]
    fn upstream_timeout_maps_to_gateway_timeout() {
        let resp = ServerError::Upstream(ResponderError::Timeout).into_response();
        assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn upstream_api_error_maps_to_bad_gateway() {
        let err = ServerError::Upstream(ResponderError::Api {
            status: 500,
            body: "boom".into(),
        });
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn conflict_maps_to_409() {
        let resp = ServerError::Conflict("email já cadastrado".into()).into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn row_not_found_becomes_not_found() {
        let err: ServerError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, ServerError::NotFound(_)));
    }
}

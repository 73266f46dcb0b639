//! Bearer-token authentication.
//!
//! Clients send `Authorization: Bearer <token>` where `<token>` is the
//! opaque UUID issued at login. The middleware hashes it with SHA-256,
//! looks the digest up in `auth_tokens`, loads the account plus its
//! role-specific row, and injects an [`AuthIdentity`] extension. Handlers
//! behind this middleware can therefore `Extension(identity)` without any
//! further lookup.

use axum::extract::{Request, State};
use axum::http::header::{HeaderMap, AUTHORIZATION};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::warn;

use crate::auth::AuthIdentity;
use crate::entities::{PatientStore, TherapistStore, TokenStore, UserStore, ROLE_PACIENTE};
use crate::error::ServerError;
use crate::state::AppState;

pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    match resolve_identity(&state, req.headers()).await {
        Ok(identity) => {
            req.extensions_mut().insert(identity);
            next.run(req).await
        }
        Err(e) => e.into_response(),
    }
}

/// Extract the raw bearer token from the `Authorization` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// SHA-256 hex digest of a raw token; this is what `auth_tokens` stores.
pub fn token_hash(raw: &str) -> String {
    Sha256::digest(raw.as_bytes())
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

async fn resolve_identity(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<AuthIdentity, ServerError> {
    let raw = bearer_token(headers)
        .ok_or_else(|| ServerError::Unauthorized("credenciais não fornecidas".to_owned()))?;
    let hash = token_hash(raw);

    let token = state
        .store
        .find_token_by_hash(&hash)
        .await?
        .ok_or_else(|| ServerError::Unauthorized("token inválido".to_owned()))?;

    if token.is_expired(Utc::now()) {
        // Sweep the stale row; the 401 stands even if the sweep fails.
        if let Err(e) = state.store.delete_token(&hash).await {
            warn!(error = %e, "failed to delete expired token");
        }
        return Err(ServerError::Unauthorized("token expirado".to_owned()));
    }

    let user = state
        .store
        .get_user(&token.user_id)
        .await?
        .ok_or_else(|| ServerError::Unauthorized("token inválido".to_owned()))?;

    if user.role == ROLE_PACIENTE {
        let patient = state.store.get_patient_by_user(&user.id).await?.ok_or_else(|| {
            ServerError::Internal(format!("user {} has role paciente but no patient row", user.id))
        })?;
        Ok(AuthIdentity::Patient { user, patient })
    } else {
        let therapist = state.store.get_therapist_by_user(&user.id).await?.ok_or_else(|| {
            ServerError::Internal(format!(
                "user {} has role terapeuta but no therapist row",
                user.id
            ))
        })?;
        Ok(AuthIdentity::Therapist { user, therapist })
    }
}

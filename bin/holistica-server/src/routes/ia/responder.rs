//! The AI responder endpoint.
//!
//! One POST runs one full exchange: the patient message is stored, the
//! configured [`Responder`] is called with the recent history, and the
//! labelled reply is stored right after it. The heavy lifting (session
//! resolution, per-session locking, idempotent retries) lives in
//! [`crate::conversation`].
//!
//! [`Responder`]: holistica_responder::Responder

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Extension, Json, Router};
use tracing::info;
use utoipa::OpenApi;
use validator::Validate;

use crate::auth::AuthIdentity;
use crate::conversation;
use crate::error::ServerError;
use crate::schemas::ia::{ResponderRequest, ResponderResponse};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(responder),
    components(schemas(ResponderRequest, ResponderResponse))
)]
pub struct ResponderApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/responder/", post(responder))
}

/// Send a message and receive the AI reply (`POST /api/ia/responder/`).
///
/// Resends are idempotent when `expected_seq` names the sequence the
/// patient message was stored at: a finished exchange is returned as-is,
/// a half-finished one is completed without re-storing the text.
#[utoipa::path(
    post,
    path = "/api/ia/responder/",
    tag = "ia",
    request_body = ResponderRequest,
    responses(
        (status = 200, description = "Exchange stored", body = ResponderResponse),
        (status = 400, description = "Empty text, oversize text or closed session"),
        (status = 403, description = "Caller is not a patient, or the session is another patient's"),
        (status = 404, description = "No such session"),
        (status = 409, description = "expected_seq does not match the stored conversation"),
        (status = 502, description = "AI collaborator failed"),
        (status = 504, description = "AI collaborator timed out"),
    )
)]
pub async fn responder(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthIdentity>,
    Json(req): Json<ResponderRequest>,
) -> Result<Json<ResponderResponse>, ServerError> {
    req.validate()?;
    let patient = identity.as_patient()?.clone();

    let outcome = conversation::respond(
        state.clone(),
        patient,
        req.mensagem_usuario,
        req.sessao_id,
        req.expected_seq,
    )
    .await?;

    info!(
        session_id = %outcome.session.id,
        seq = outcome.patient_message.seq,
        "exchange completed"
    );
    Ok(Json(ResponderResponse {
        resposta: outcome.reply.texto.clone(),
        sentimento: outcome.reply.sentimento.clone().unwrap_or_default(),
        categoria: outcome.reply.categoria.clone().unwrap_or_default(),
        intensidade: outcome.reply.intensidade.clone().unwrap_or_default(),
        sessao_id: outcome.session.id.clone(),
        seq: outcome.patient_message.seq,
    }))
}

// ── Tests ──────────────────────────────────────────────────────────────────────

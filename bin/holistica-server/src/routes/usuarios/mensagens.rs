//! Message routes.
//!
//! Messages are append-only: there is no update or delete route, and the
//! sequence numbers handed out by the store are gapless per session.
//! Posting here stores a patient message without generating an AI reply;
//! the responder endpoint owns the full exchange.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Extension, Json, Router};
use utoipa::OpenApi;
use validator::Validate;

use crate::auth::AuthIdentity;
use crate::conversation::{self, clamp_history_limit};
use crate::entities::{MessageStore, SessionStore};
use crate::error::ServerError;
use crate::routes::usuarios::sessoes::session_for;
use crate::schemas::usuarios::mensagem::{
    CreateMensagemRequest, MensagemResponse, MensagensQuery,
};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(list_mensagens, create_mensagem, get_mensagem),
    components(schemas(MensagemResponse, CreateMensagemRequest))
)]
pub struct MensagensApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/mensagens/", get(list_mensagens).post(create_mensagem))
        .route("/mensagens/{id}/", get(get_mensagem))
}

/// Page through one session's messages
/// (`GET /api/usuarios/mensagens/?sessao_id=&after=&limit=`).
///
/// Strictly ordered by `seq`; pass the last seen `seq` as `after` to
/// resume.
#[utoipa::path(
    get,
    path = "/api/usuarios/mensagens/",
    tag = "usuarios",
    params(MensagensQuery),
    responses(
        (status = 200, description = "Messages in order", body = [MensagemResponse]),
        (status = 400, description = "Missing sessao_id"),
        (status = 403, description = "Caller cannot reach this session"),
        (status = 404, description = "No such session"),
    )
)]
pub async fn list_mensagens(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthIdentity>,
    Query(query): Query<MensagensQuery>,
) -> Result<Json<Vec<MensagemResponse>>, ServerError> {
    let session_id = query
        .sessao_id
        .as_deref()
        .ok_or_else(|| ServerError::Validation("sessao_id é obrigatório".to_owned()))?;
    let (session, _) = session_for(&state, &identity, session_id).await?;

    let messages = state
        .store
        .list_messages(
            &session.id,
            query.after.unwrap_or(0),
            clamp_history_limit(query.limit),
        )
        .await?;
    Ok(Json(messages.iter().map(|m| m.to_response()).collect()))
}

/// Append a patient message without an AI reply
/// (`POST /api/usuarios/mensagens/`).
#[utoipa::path(
    post,
    path = "/api/usuarios/mensagens/",
    tag = "usuarios",
    request_body = CreateMensagemRequest,
    responses(
        (status = 201, description = "Message stored", body = MensagemResponse),
        (status = 400, description = "Empty text or closed session"),
        (status = 403, description = "Session belongs to another patient"),
        (status = 404, description = "No such session"),
    )
)]
pub async fn create_mensagem(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthIdentity>,
    Json(req): Json<CreateMensagemRequest>,
) -> Result<(StatusCode, Json<MensagemResponse>), ServerError> {
    let patient = identity.as_patient()?;
    req.validate()?;

    let session = state
        .store
        .get_session(&req.sessao_id)
        .await?
        .ok_or_else(|| ServerError::NotFound("sessão não encontrada".to_owned()))?;
    if session.patient_id != patient.id {
        return Err(ServerError::Forbidden(
            "esta sessão pertence a outro paciente".to_owned(),
        ));
    }

    let message = conversation::append_patient_message(&state, &session.id, &req.texto).await?;
    Ok((StatusCode::CREATED, Json(message.to_response())))
}

/// Read one message (`GET /api/usuarios/mensagens/{id}/`).
#[utoipa::path(
    get,
    path = "/api/usuarios/mensagens/{id}/",
    tag = "usuarios",
    params(("id" = String, Path, description = "Message id")),
    responses(
        (status = 200, description = "Message", body = MensagemResponse),
        (status = 403, description = "Caller cannot reach this message"),
        (status = 404, description = "No such message"),
    )
)]
pub async fn get_mensagem(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthIdentity>,
    Path(id): Path<String>,
) -> Result<Json<MensagemResponse>, ServerError> {
    let message = state
        .store
        .get_message(&id)
        .await?
        .ok_or_else(|| ServerError::NotFound("mensagem não encontrada".to_owned()))?;
    session_for(&state, &identity, &message.session_id).await?;
    Ok(Json(message.to_response()))
}

// ── Tests ──────────────────────────────────────────────────────────────────────

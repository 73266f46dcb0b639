//! Therapy-session routes.
//!
//! A session is a bounded conversation thread owned by one patient.
//! Patients open sessions for themselves (usually implicitly, via the
//! responder); therapists open scheduled appointments for their assigned
//! patients and close finished threads.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Extension, Json, Router};
use chrono::{DateTime, Utc};
use tracing::{info, warn};
use utoipa::OpenApi;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{policy, AuthIdentity};
use crate::entities::{
    Notification, NotificationStore, Patient, PatientStore, Session, SessionStore,
    STATUS_ABERTA, STATUS_ENCERRADA,
};
use crate::error::ServerError;
use crate::schemas::usuarios::sessao::{CreateSessaoRequest, SessaoResponse, UpdateSessaoRequest};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(list_sessoes, create_sessao, get_sessao, update_sessao, delete_sessao),
    components(schemas(SessaoResponse, CreateSessaoRequest, UpdateSessaoRequest))
)]
pub struct SessoesApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sessoes/", get(list_sessoes).post(create_sessao))
        .route(
            "/sessoes/{id}/",
            get(get_sessao).put(update_sessao).delete(delete_sessao),
        )
}

fn parse_data(raw: &str) -> Result<DateTime<Utc>, ServerError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| ServerError::Validation("data inválida (use o formato RFC 3339)".to_owned()))
}

/// Resolve the session a caller may touch, or fail with 404/403.
pub(crate) async fn session_for(
    state: &AppState,
    identity: &AuthIdentity,
    id: &str,
) -> Result<(Session, Patient), ServerError> {
    let session = state
        .store
        .get_session(id)
        .await?
        .ok_or_else(|| ServerError::NotFound("sessão não encontrada".to_owned()))?;
    let patient = state
        .store
        .get_patient(&session.patient_id)
        .await?
        .ok_or_else(|| ServerError::Internal("session patient row missing".to_owned()))?;
    policy::can_access_patient(identity, &patient)?;
    Ok((session, patient))
}

async fn nome_for(state: &AppState, patient_id: &str) -> Result<String, ServerError> {
    Ok(state
        .store
        .get_patient_profile(patient_id)
        .await?
        .map(|p| p.nome_completo())
        .unwrap_or_default())
}

// ── Collection ────────────────────────────────────────────────────────────────

/// List reachable sessions, newest first (`GET /api/usuarios/sessoes/`).
#[utoipa::path(
    get,
    path = "/api/usuarios/sessoes/",
    tag = "usuarios",
    responses(
        (status = 200, description = "Reachable sessions", body = [SessaoResponse]),
        (status = 401, description = "Missing or invalid token"),
    )
)]
pub async fn list_sessoes(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthIdentity>,
) -> Result<Json<Vec<SessaoResponse>>, ServerError> {
    let sessions = match &identity {
        AuthIdentity::Patient { patient, .. } => {
            state.store.list_sessions_for_patient(&patient.id).await?
        }
        AuthIdentity::Therapist { therapist, .. } => {
            state
                .store
                .list_sessions_for_therapist(&therapist.id)
                .await?
        }
    };
    Ok(Json(
        sessions
            .iter()
            .map(|(session, nome)| session.to_response(nome))
            .collect(),
    ))
}

/// Open a session (`POST /api/usuarios/sessoes/`).
///
/// Patients always open sessions for themselves. Therapists must name an
/// assigned patient and may attach an appointment date, which also sends
/// the patient a notification; a failed notification does not undo the
/// session.
#[utoipa::path(
    post,
    path = "/api/usuarios/sessoes/",
    tag = "usuarios",
    request_body = CreateSessaoRequest,
    responses(
        (status = 201, description = "Session opened", body = SessaoResponse),
        (status = 400, description = "Malformed request"),
        (status = 403, description = "Patient is not assigned to the caller"),
        (status = 404, description = "No such patient"),
    )
)]
pub async fn create_sessao(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthIdentity>,
    Json(req): Json<CreateSessaoRequest>,
) -> Result<(StatusCode, Json<SessaoResponse>), ServerError> {
    req.validate()?;

    let patient = match &identity {
        AuthIdentity::Patient { patient, .. } => patient.clone(),
        AuthIdentity::Therapist { .. } => {
            let id = req.paciente_id.as_deref().ok_or_else(|| {
                ServerError::Validation("paciente_id é obrigatório".to_owned())
            })?;
            let patient = state
                .store
                .get_patient(id)
                .await?
                .ok_or_else(|| ServerError::NotFound("paciente não encontrado".to_owned()))?;
            policy::can_access_patient(&identity, &patient)?;
            patient
        }
    };

    let scheduled_at = req.data.as_deref().map(parse_data).transpose()?;
    let now = Utc::now();
    let session = Session {
        id: Uuid::new_v4().to_string(),
        patient_id: patient.id.clone(),
        status: STATUS_ABERTA.to_owned(),
        scheduled_at,
        duracao: req.duracao,
        observacoes: req.observacoes,
        created_at: now,
        updated_at: now,
    };
    state.store.create_session(&session).await?;

    if let (true, Some(at)) = (identity.is_therapist(), scheduled_at) {
        let aviso = Notification {
            id: Uuid::new_v4().to_string(),
            user_id: patient.user_id.clone(),
            assunto: "Nova sessão agendada".to_owned(),
            conteudo: format!(
                "Seu terapeuta agendou uma sessão para {}.",
                at.format("%d/%m/%Y às %H:%M")
            ),
            lida: false,
            created_at: now,
        };
        if let Err(e) = state.store.create_notification(&aviso).await {
            warn!(error = %e, session_id = %session.id, "failed to notify patient of new session");
        }
    }

    info!(session_id = %session.id, patient_id = %patient.id, "session opened");
    let nome = nome_for(&state, &patient.id).await?;
    Ok((StatusCode::CREATED, Json(session.to_response(&nome))))
}

// ── Item ──────────────────────────────────────────────────────────────────────

/// Read one session (`GET /api/usuarios/sessoes/{id}/`).
#[utoipa::path(
    get,
    path = "/api/usuarios/sessoes/{id}/",
    tag = "usuarios",
    params(("id" = String, Path, description = "Session id")),
    responses(
        (status = 200, description = "Session", body = SessaoResponse),
        (status = 403, description = "Caller cannot reach this session"),
        (status = 404, description = "No such session"),
    )
)]
pub async fn get_sessao(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthIdentity>,
    Path(id): Path<String>,
) -> Result<Json<SessaoResponse>, ServerError> {
    let (session, patient) = session_for(&state, &identity, &id).await?;
    let nome = nome_for(&state, &patient.id).await?;
    Ok(Json(session.to_response(&nome)))
}

/// Update status and scheduling fields
/// (`PUT /api/usuarios/sessoes/{id}/`).
///
/// Closing is one-way in practice: a closed session refuses new
/// messages, though the status itself can be reopened here.
#[utoipa::path(
    put,
    path = "/api/usuarios/sessoes/{id}/",
    tag = "usuarios",
    params(("id" = String, Path, description = "Session id")),
    request_body = UpdateSessaoRequest,
    responses(
        (status = 200, description = "Updated session", body = SessaoResponse),
        (status = 400, description = "Unknown status or malformed date"),
        (status = 403, description = "Caller cannot reach this session"),
        (status = 404, description = "No such session"),
    )
)]
pub async fn update_sessao(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthIdentity>,
    Path(id): Path<String>,
    Json(req): Json<UpdateSessaoRequest>,
) -> Result<Json<SessaoResponse>, ServerError> {
    req.validate()?;
    let (mut session, patient) = session_for(&state, &identity, &id).await?;

    if let Some(status) = req.status {
        if status != STATUS_ABERTA && status != STATUS_ENCERRADA {
            return Err(ServerError::Validation(format!(
                "status inválido: {status} (use aberta ou encerrada)"
            )));
        }
        session.status = status;
    }
    if let Some(raw) = req.data.as_deref() {
        session.scheduled_at = Some(parse_data(raw)?);
    }
    if let Some(v) = req.duracao {
        session.duracao = Some(v);
    }
    if let Some(v) = req.observacoes {
        session.observacoes = Some(v);
    }
    session.updated_at = Utc::now();
    state.store.update_session(&session).await?;

    info!(session_id = %session.id, status = %session.status, "session updated");
    let nome = nome_for(&state, &patient.id).await?;
    Ok(Json(session.to_response(&nome)))
}

/// Remove a session and its messages
/// (`DELETE /api/usuarios/sessoes/{id}/`).
#[utoipa::path(
    delete,
    path = "/api/usuarios/sessoes/{id}/",
    tag = "usuarios",
    params(("id" = String, Path, description = "Session id")),
    responses(
        (status = 204, description = "Session removed"),
        (status = 403, description = "Caller is not this patient's therapist"),
        (status = 404, description = "No such session"),
    )
)]
pub async fn delete_sessao(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthIdentity>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
    identity.as_therapist()?;
    let (session, _) = session_for(&state, &identity, &id).await?;

    state.store.delete_session_cascade(&session.id).await?;
    state.session_locks.remove(&session.id);

    info!(session_id = %session.id, "session removed");
    Ok(StatusCode::NO_CONTENT)
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;
    use crate::conversation;
    use crate::testutil::{
        create_test_session, register_test_patient, register_test_therapist, test_state,
    };

    #[tokio::test]
    async fn patient_opens_a_session_for_themselves() {
        let state = test_state().await;
        let (user, patient) = register_test_patient(&state, "paciente@exemplo.com", None).await;

        let (status, Json(created)) = create_sessao(
            State(state.clone()),
            Extension(AuthIdentity::Patient {
                user,
                patient: patient.clone(),
            }),
            Json(CreateSessaoRequest {
                // Ignored for patients; they cannot open sessions for others.
                paciente_id: Some("outro-paciente".into()),
                data: None,
                duracao: None,
                observacoes: None,
            }),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created.paciente_id, patient.id);
        assert_eq!(created.status, STATUS_ABERTA);
        assert_eq!(created.paciente_nome, "Ana Souza");
    }

    #[tokio::test]
    async fn therapist_schedules_and_patient_is_notified() {
        let state = test_state().await;
        let (t_user, therapist) = register_test_therapist(&state, "tera@exemplo.com").await;
        let (p_user, patient) =
            register_test_patient(&state, "paciente@exemplo.com", Some(&therapist.id)).await;
        let identity = AuthIdentity::Therapist {
            user: t_user,
            therapist,
        };

        let err = create_sessao(
            State(state.clone()),
            Extension(identity.clone()),
            Json(CreateSessaoRequest {
                paciente_id: None,
                data: None,
                duracao: None,
                observacoes: None,
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServerError::Validation(_)));

        let (_, Json(created)) = create_sessao(
            State(state.clone()),
            Extension(identity),
            Json(CreateSessaoRequest {
                paciente_id: Some(patient.id.clone()),
                data: Some("2026-03-10T14:00:00Z".into()),
                duracao: Some(50),
                observacoes: Some("Sessão de acompanhamento".into()),
            }),
        )
        .await
        .unwrap();
        assert_eq!(created.duracao, Some(50));
        assert!(created.data.is_some());

        let notifications = state.store.list_notifications(&p_user.id).await.unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].assunto, "Nova sessão agendada");
    }

    #[tokio::test]
    async fn listing_is_scoped_to_the_caller() {
        let state = test_state().await;
        let (t_user, therapist) = register_test_therapist(&state, "tera@exemplo.com").await;
        let (p_user, patient) =
            register_test_patient(&state, "paciente@exemplo.com", Some(&therapist.id)).await;
        let (_, stranger) = register_test_patient(&state, "outro@exemplo.com", None).await;
        create_test_session(&state, &patient.id).await;
        create_test_session(&state, &patient.id).await;
        create_test_session(&state, &stranger.id).await;

        let Json(for_therapist) = list_sessoes(
            State(state.clone()),
            Extension(AuthIdentity::Therapist {
                user: t_user,
                therapist,
            }),
        )
        .await
        .unwrap();
        assert_eq!(for_therapist.len(), 2);

        let Json(for_patient) = list_sessoes(
            State(state.clone()),
            Extension(AuthIdentity::Patient {
                user: p_user,
                patient,
            }),
        )
        .await
        .unwrap();
        assert_eq!(for_patient.len(), 2);
        assert!(for_patient.iter().all(|s| s.paciente_nome == "Ana Souza"));
    }

    #[tokio::test]
    async fn unassigned_therapist_cannot_read_a_session() {
        let state = test_state().await;
        let (_, patient) = register_test_patient(&state, "paciente@exemplo.com", None).await;
        let session = create_test_session(&state, &patient.id).await;

        let (user, other) = register_test_therapist(&state, "outra@exemplo.com").await;
        let err = get_sessao(
            State(state.clone()),
            Extension(AuthIdentity::Therapist {
                user,
                therapist: other,
            }),
            Path(session.id.clone()),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServerError::Forbidden(_)));
    }

    #[tokio::test]
    async fn closing_a_session_blocks_new_messages() {
        let state = test_state().await;
        let (user, patient) = register_test_patient(&state, "paciente@exemplo.com", None).await;
        let session = create_test_session(&state, &patient.id).await;

        let Json(updated) = update_sessao(
            State(state.clone()),
            Extension(AuthIdentity::Patient {
                user,
                patient: patient.clone(),
            }),
            Path(session.id.clone()),
            Json(UpdateSessaoRequest {
                status: Some(STATUS_ENCERRADA.into()),
                data: None,
                duracao: None,
                observacoes: None,
            }),
        )
        .await
        .unwrap();
        assert_eq!(updated.status, STATUS_ENCERRADA);

        let err = conversation::append_patient_message(&state, &session.id, "Olá?")
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::Validation(_)));
    }

    #[tokio::test]
    async fn update_rejects_unknown_status() {
        let state = test_state().await;
        let (user, patient) = register_test_patient(&state, "paciente@exemplo.com", None).await;
        let session = create_test_session(&state, &patient.id).await;

        let err = update_sessao(
            State(state.clone()),
            Extension(AuthIdentity::Patient { user, patient }),
            Path(session.id),
            Json(UpdateSessaoRequest {
                status: Some("pausada".into()),
                data: None,
                duracao: None,
                observacoes: None,
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServerError::Validation(_)));
    }

    #[tokio::test]
    async fn delete_sessao_is_therapist_only() {
        let state = test_state().await;
        let (t_user, therapist) = register_test_therapist(&state, "tera@exemplo.com").await;
        let (p_user, patient) =
            register_test_patient(&state, "paciente@exemplo.com", Some(&therapist.id)).await;
        let session = create_test_session(&state, &patient.id).await;

        let err = delete_sessao(
            State(state.clone()),
            Extension(AuthIdentity::Patient {
                user: p_user,
                patient,
            }),
            Path(session.id.clone()),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServerError::Forbidden(_)));

        let status = delete_sessao(
            State(state.clone()),
            Extension(AuthIdentity::Therapist {
                user: t_user,
                therapist,
            }),
            Path(session.id.clone()),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(state.store.get_session(&session.id).await.unwrap().is_none());
    }
}

//! Patient roster routes.
//!
//! Therapists see and manage their assigned patients; patients see only
//! their own record. Creating a patient here (as opposed to self-service
//! registration) assigns the patient to the calling therapist.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Extension, Json, Router};
use chrono::Utc;
use tracing::{info, warn};
use utoipa::OpenApi;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{hash_password, policy, AuthIdentity};
use crate::entities::{
    Notification, NotificationStore, Patient, PatientStore, SessionStore, TherapistStore, User,
    UserStore, ROLE_PACIENTE,
};
use crate::error::ServerError;
use crate::schemas::usuarios::auth::CadastroPacienteRequest;
use crate::schemas::usuarios::paciente::{
    BuscarPacienteResponse, BuscarPacientesQuery, PacienteResponse, TerapeutaResponse,
    UpdatePacienteRequest,
};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        list_pacientes,
        create_paciente,
        get_paciente,
        update_paciente,
        delete_paciente,
        buscar_pacientes,
        meu_terapeuta
    ),
    components(schemas(
        PacienteResponse,
        BuscarPacienteResponse,
        UpdatePacienteRequest,
        TerapeutaResponse
    ))
)]
pub struct PacientesApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/pacientes/", get(list_pacientes).post(create_paciente))
        .route(
            "/pacientes/{id}/",
            get(get_paciente)
                .put(update_paciente)
                .delete(delete_paciente),
        )
        .route("/buscar-pacientes/", get(buscar_pacientes))
        .route("/meu-terapeuta/", get(meu_terapeuta))
}

// ── Roster ────────────────────────────────────────────────────────────────────

/// List reachable patients (`GET /api/usuarios/pacientes/`).
///
/// Therapists get their assigned patients, newest first; patients get a
/// single-element list with their own record.
#[utoipa::path(
    get,
    path = "/api/usuarios/pacientes/",
    tag = "usuarios",
    responses(
        (status = 200, description = "Reachable patients", body = [PacienteResponse]),
        (status = 401, description = "Missing or invalid token"),
    )
)]
pub async fn list_pacientes(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthIdentity>,
) -> Result<Json<Vec<PacienteResponse>>, ServerError> {
    let profiles = match &identity {
        AuthIdentity::Therapist { therapist, .. } => {
            state.store.list_patient_profiles(&therapist.id).await?
        }
        AuthIdentity::Patient { patient, .. } => state
            .store
            .get_patient_profile(&patient.id)
            .await?
            .into_iter()
            .collect(),
    };
    Ok(Json(profiles.iter().map(|p| p.to_response()).collect()))
}

/// Create and assign a patient (`POST /api/usuarios/pacientes/`).
///
/// Therapist only. The new patient is assigned to the caller and greeted
/// with a notification; a failed notification does not undo the account.
#[utoipa::path(
    post,
    path = "/api/usuarios/pacientes/",
    tag = "usuarios",
    request_body = CadastroPacienteRequest,
    responses(
        (status = 201, description = "Patient created and assigned", body = PacienteResponse),
        (status = 400, description = "Malformed request"),
        (status = 403, description = "Caller is not a therapist"),
        (status = 409, description = "Email already registered"),
    )
)]
pub async fn create_paciente(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthIdentity>,
    Json(req): Json<CadastroPacienteRequest>,
) -> Result<(StatusCode, Json<PacienteResponse>), ServerError> {
    let therapist = identity.as_therapist()?;
    req.validate()?;

    if state.store.get_user_by_email(&req.email).await?.is_some() {
        return Err(ServerError::Conflict("email já cadastrado".to_owned()));
    }

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4().to_string(),
        email: req.email,
        password_hash: hash_password(&req.password)?,
        first_name: req.first_name,
        last_name: req.last_name,
        role: ROLE_PACIENTE.to_owned(),
        telefone: req.telefone,
        data_nascimento: req.data_nascimento,
        endereco: req.endereco,
        created_at: now,
        updated_at: now,
    };
    let patient = Patient {
        id: Uuid::new_v4().to_string(),
        user_id: user.id.clone(),
        therapist_id: Some(therapist.id.clone()),
        created_at: now,
    };
    state.store.register_patient(&user, &patient).await?;

    let welcome = Notification {
        id: Uuid::new_v4().to_string(),
        user_id: user.id.clone(),
        assunto: "Bem-vindo(a) à Holística".to_owned(),
        conteudo: format!(
            "Olá {}, sua conta foi criada pelo seu terapeuta. Faça login para começar suas conversas.",
            user.first_name
        ),
        lida: false,
        created_at: now,
    };
    if let Err(e) = state.store.create_notification(&welcome).await {
        warn!(error = %e, user_id = %user.id, "failed to create welcome notification");
    }

    info!(patient_id = %patient.id, therapist_id = %therapist.id, "patient created by therapist");
    let profile = state
        .store
        .get_patient_profile(&patient.id)
        .await?
        .ok_or_else(|| ServerError::Internal("patient profile missing after insert".to_owned()))?;
    Ok((StatusCode::CREATED, Json(profile.to_response())))
}

/// Read one patient (`GET /api/usuarios/pacientes/{id}/`).
#[utoipa::path(
    get,
    path = "/api/usuarios/pacientes/{id}/",
    tag = "usuarios",
    params(("id" = String, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Patient profile", body = PacienteResponse),
        (status = 403, description = "Caller cannot reach this patient"),
        (status = 404, description = "No such patient"),
    )
)]
pub async fn get_paciente(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthIdentity>,
    Path(id): Path<String>,
) -> Result<Json<PacienteResponse>, ServerError> {
    let patient = state
        .store
        .get_patient(&id)
        .await?
        .ok_or_else(|| ServerError::NotFound("paciente não encontrado".to_owned()))?;
    policy::can_access_patient(&identity, &patient)?;

    let profile = state
        .store
        .get_patient_profile(&patient.id)
        .await?
        .ok_or_else(|| ServerError::NotFound("paciente não encontrado".to_owned()))?;
    Ok(Json(profile.to_response()))
}

/// Update a patient's account data (`PUT /api/usuarios/pacientes/{id}/`).
#[utoipa::path(
    put,
    path = "/api/usuarios/pacientes/{id}/",
    tag = "usuarios",
    params(("id" = String, Path, description = "Patient id")),
    request_body = UpdatePacienteRequest,
    responses(
        (status = 200, description = "Updated profile", body = PacienteResponse),
        (status = 403, description = "Caller cannot reach this patient"),
        (status = 404, description = "No such patient"),
        (status = 409, description = "Email already in use"),
    )
)]
pub async fn update_paciente(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthIdentity>,
    Path(id): Path<String>,
    Json(req): Json<UpdatePacienteRequest>,
) -> Result<Json<PacienteResponse>, ServerError> {
    req.validate()?;
    let patient = state
        .store
        .get_patient(&id)
        .await?
        .ok_or_else(|| ServerError::NotFound("paciente não encontrado".to_owned()))?;
    policy::can_access_patient(&identity, &patient)?;

    let mut user = state
        .store
        .get_user(&patient.user_id)
        .await?
        .ok_or_else(|| ServerError::Internal("patient user row missing".to_owned()))?;
    if let Some(email) = req.email {
        if email != user.email && state.store.get_user_by_email(&email).await?.is_some() {
            return Err(ServerError::Conflict("email já cadastrado".to_owned()));
        }
        user.email = email;
    }
    if let Some(v) = req.first_name {
        user.first_name = v;
    }
    if let Some(v) = req.last_name {
        user.last_name = v;
    }
    if let Some(v) = req.telefone {
        user.telefone = Some(v);
    }
    if let Some(v) = req.data_nascimento {
        user.data_nascimento = Some(v);
    }
    if let Some(v) = req.endereco {
        user.endereco = Some(v);
    }
    user.updated_at = Utc::now();
    state.store.update_user(&user).await?;

    let profile = state
        .store
        .get_patient_profile(&patient.id)
        .await?
        .ok_or_else(|| ServerError::NotFound("paciente não encontrado".to_owned()))?;
    Ok(Json(profile.to_response()))
}

/// Remove a patient and every record about them
/// (`DELETE /api/usuarios/pacientes/{id}/`).
///
/// Therapist only, and only for their own patients. Messages, sessions,
/// reports, tokens and notifications go with the account.
#[utoipa::path(
    delete,
    path = "/api/usuarios/pacientes/{id}/",
    tag = "usuarios",
    params(("id" = String, Path, description = "Patient id")),
    responses(
        (status = 204, description = "Patient removed"),
        (status = 403, description = "Caller is not this patient's therapist"),
        (status = 404, description = "No such patient"),
    )
)]
pub async fn delete_paciente(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthIdentity>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
    identity.as_therapist()?;
    let patient = state
        .store
        .get_patient(&id)
        .await?
        .ok_or_else(|| ServerError::NotFound("paciente não encontrado".to_owned()))?;
    policy::can_access_patient(&identity, &patient)?;

    // Snapshot the session ids so their in-process locks can be dropped
    // once the rows are gone.
    let sessions = state.store.list_sessions_for_patient(&patient.id).await?;
    state
        .store
        .delete_patient_cascade(&patient.id, &patient.user_id)
        .await?;
    for (session, _) in &sessions {
        state.session_locks.remove(&session.id);
    }

    info!(patient_id = %patient.id, "patient removed");
    Ok(StatusCode::NO_CONTENT)
}

// ── Search / assignment ───────────────────────────────────────────────────────

/// Search assigned patients (`GET /api/usuarios/buscar-pacientes/?search=`).
#[utoipa::path(
    get,
    path = "/api/usuarios/buscar-pacientes/",
    tag = "usuarios",
    params(BuscarPacientesQuery),
    responses(
        (status = 200, description = "Matching patients", body = [BuscarPacienteResponse]),
        (status = 403, description = "Caller is not a therapist"),
    )
)]
pub async fn buscar_pacientes(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthIdentity>,
    Query(query): Query<BuscarPacientesQuery>,
) -> Result<Json<Vec<BuscarPacienteResponse>>, ServerError> {
    let therapist = identity.as_therapist()?;
    let term = query.search.unwrap_or_default();
    let profiles = state
        .store
        .search_patient_profiles(&therapist.id, term.trim())
        .await?;
    Ok(Json(profiles.iter().map(|p| p.to_buscar_response()).collect()))
}

/// The caller's assigned therapist (`GET /api/usuarios/meu-terapeuta/`).
#[utoipa::path(
    get,
    path = "/api/usuarios/meu-terapeuta/",
    tag = "usuarios",
    responses(
        (status = 200, description = "Assigned therapist", body = TerapeutaResponse),
        (status = 403, description = "Caller is not a patient"),
        (status = 404, description = "No therapist assigned"),
    )
)]
pub async fn meu_terapeuta(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthIdentity>,
) -> Result<Json<TerapeutaResponse>, ServerError> {
    let patient = identity.as_patient()?;
    let therapist_id = patient
        .therapist_id
        .as_deref()
        .ok_or_else(|| ServerError::NotFound("nenhum terapeuta atribuído".to_owned()))?;
    let therapist = state
        .store
        .get_therapist(therapist_id)
        .await?
        .ok_or_else(|| ServerError::NotFound("nenhum terapeuta atribuído".to_owned()))?;
    let user = state
        .store
        .get_user(&therapist.user_id)
        .await?
        .ok_or_else(|| ServerError::Internal("therapist user row missing".to_owned()))?;
    Ok(Json(therapist.to_response(&user)))
}

// ── Tests ──────────────────────────────────────────────────────────────────────

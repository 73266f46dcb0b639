//! Login, logout and self-service registration.
//!
//! Registration never assigns a therapist; assignment happens when a
//! therapist adds the patient through `POST /api/usuarios/pacientes/`.
//! The login token is returned to the client exactly once and stored
//! hashed, so a database leak exposes no usable credentials.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Extension, Json, Router};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tracing::{info, warn};
use utoipa::OpenApi;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{hash_password, verify_password, AuthIdentity};
use crate::entities::{
    AuthToken, Patient, PatientStore, Therapist, TherapistStore, TokenStore, User, UserStore,
    ROLE_PACIENTE, ROLE_TERAPEUTA,
};
use crate::error::ServerError;
use crate::middleware::auth::{bearer_token, token_hash};
use crate::schemas::usuarios::auth::{
    CadastroPacienteRequest, CadastroTerapeutaRequest, LoginRequest, LoginResponse, UserResponse,
};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(login, logout, cadastro_paciente, cadastro_terapeuta),
    components(schemas(
        LoginRequest,
        LoginResponse,
        UserResponse,
        CadastroPacienteRequest,
        CadastroTerapeutaRequest
    ))
)]
pub struct AuthApi;

/// Routes that require no token.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login/", post(login))
        .route("/cadastro/paciente/", post(cadastro_paciente))
        .route("/cadastro/terapeuta/", post(cadastro_terapeuta))
}

/// Routes behind the bearer-token middleware.
pub fn protected_router() -> Router<Arc<AppState>> {
    Router::new().route("/logout/", post(logout))
}

// ── Login / logout ────────────────────────────────────────────────────────────

/// Authenticate with email + password (`POST /api/usuarios/login/`).
///
/// Unknown email and wrong password answer the same 401 so the endpoint
/// cannot be used to probe which emails exist.
#[utoipa::path(
    post,
    path = "/api/usuarios/login/",
    tag = "usuarios",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated; token is shown only here", body = LoginResponse),
        (status = 400, description = "Malformed request"),
        (status = 401, description = "Unknown email or wrong password"),
    )
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ServerError> {
    req.validate()?;

    let user = state
        .store
        .get_user_by_email(&req.email)
        .await?
        .ok_or_else(|| ServerError::Unauthorized("email ou senha inválidos".to_owned()))?;
    verify_password(&req.password, &user.password_hash)?;

    // Opportunistic sweep; login still succeeds if it fails.
    let now = Utc::now();
    if let Err(e) = state.store.delete_expired_tokens(now).await {
        warn!(error = %e, "failed to sweep expired tokens");
    }

    let raw = Uuid::new_v4().to_string();
    let token = AuthToken {
        id: Uuid::new_v4().to_string(),
        user_id: user.id.clone(),
        token_hash: token_hash(&raw),
        created_at: now,
        expires_at: now + Duration::hours(state.config.token_ttl_hours),
    };
    state.store.insert_token(&token).await?;

    info!(user_id = %user.id, role = %user.role, "login");
    Ok(Json(LoginResponse {
        token: raw,
        user: user.to_response(),
    }))
}

/// Revoke the presented token (`POST /api/usuarios/logout/`).
#[utoipa::path(
    post,
    path = "/api/usuarios/logout/",
    tag = "usuarios",
    responses(
        (status = 200, description = "Token revoked", body = Value),
        (status = 401, description = "Missing or invalid token"),
    )
)]
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthIdentity>,
    headers: HeaderMap,
) -> Result<Json<Value>, ServerError> {
    if let Some(raw) = bearer_token(&headers) {
        state.store.delete_token(&token_hash(raw)).await?;
    }
    info!(user_id = %identity.user().id, "logout");
    Ok(Json(json!({ "message": "logout realizado com sucesso" })))
}

// ── Registration ──────────────────────────────────────────────────────────────

/// Create a patient account (`POST /api/usuarios/cadastro/paciente/`).
#[utoipa::path(
    post,
    path = "/api/usuarios/cadastro/paciente/",
    tag = "usuarios",
    request_body = CadastroPacienteRequest,
    responses(
        (status = 201, description = "Account created", body = UserResponse),
        (status = 400, description = "Malformed request"),
        (status = 409, description = "Email already registered"),
    )
)]
pub async fn cadastro_paciente(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CadastroPacienteRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ServerError> {
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
        therapist_id: None,
        created_at: now,
    };
    state.store.register_patient(&user, &patient).await?;

    info!(user_id = %user.id, "patient account created");
    Ok((StatusCode::CREATED, Json(user.to_response())))
}

/// Create a therapist account (`POST /api/usuarios/cadastro/terapeuta/`).
#[utoipa::path(
    post,
    path = "/api/usuarios/cadastro/terapeuta/",
    tag = "usuarios",
    request_body = CadastroTerapeutaRequest,
    responses(
        (status = 201, description = "Account created", body = UserResponse),
        (status = 400, description = "Malformed request"),
        (status = 409, description = "Email or CRP already registered"),
    )
)]
pub async fn cadastro_terapeuta(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CadastroTerapeutaRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ServerError> {
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
        role: ROLE_TERAPEUTA.to_owned(),
        telefone: req.telefone,
        data_nascimento: req.data_nascimento,
        endereco: req.endereco,
        created_at: now,
        updated_at: now,
    };
    let therapist = Therapist {
        id: Uuid::new_v4().to_string(),
        user_id: user.id.clone(),
        especialidade: req.especialidade,
        crp: req.crp,
        created_at: now,
    };
    state.store.register_therapist(&user, &therapist).await?;

    info!(user_id = %user.id, "therapist account created");
    Ok((StatusCode::CREATED, Json(user.to_response())))
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;
    use crate::testutil::test_state;
    use axum::http::header::AUTHORIZATION;

    fn paciente_request(email: &str) -> CadastroPacienteRequest {
        CadastroPacienteRequest {
            first_name: "Ana".into(),
            last_name: "Lima".into(),
            email: email.into(),
            password: "senha-segura".into(),
            telefone: None,
            data_nascimento: None,
            endereco: None,
        }
    }

    #[tokio::test]
    async fn register_then_login_roundtrip() {
        let state = test_state().await;

        let (status, Json(created)) = cadastro_paciente(
            State(state.clone()),
            Json(paciente_request("ana@exemplo.com")),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created.tipo, ROLE_PACIENTE);

        // Registration never assigns a therapist.
        let patient = state
            .store
            .get_patient_by_user(&created.id)
            .await
            .unwrap()
            .unwrap();
        assert!(patient.therapist_id.is_none());

        let Json(body) = login(
            State(state.clone()),
            Json(LoginRequest {
                email: "ana@exemplo.com".into(),
                password: "senha-segura".into(),
            }),
        )
        .await
        .unwrap();
        assert!(!body.token.is_empty());
        assert_eq!(body.user.email, "ana@exemplo.com");
    }

    #[tokio::test]
    async fn login_rejects_wrong_password() {
        let state = test_state().await;
        cadastro_paciente(
            State(state.clone()),
            Json(paciente_request("bruno@exemplo.com")),
        )
        .await
        .unwrap();

        let err = login(
            State(state.clone()),
            Json(LoginRequest {
                email: "bruno@exemplo.com".into(),
                password: "senha-errada".into(),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServerError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn duplicate_email_registration_conflicts() {
        let state = test_state().await;
        cadastro_paciente(
            State(state.clone()),
            Json(paciente_request("carla@exemplo.com")),
        )
        .await
        .unwrap();

        let err = cadastro_paciente(
            State(state.clone()),
            Json(paciente_request("carla@exemplo.com")),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServerError::Conflict(_)));
    }

    #[tokio::test]
    async fn cadastro_terapeuta_creates_professional_record() {
        let state = test_state().await;

        let (status, Json(created)) = cadastro_terapeuta(
            State(state.clone()),
            Json(CadastroTerapeutaRequest {
                first_name: "Diego".into(),
                last_name: "Souza".into(),
                email: "diego@exemplo.com".into(),
                password: "senha-segura".into(),
                especialidade: "Terapia Cognitivo-Comportamental".into(),
                crp: "06/12345".into(),
                telefone: None,
                data_nascimento: None,
                endereco: None,
            }),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created.tipo, ROLE_TERAPEUTA);

        let therapist = state
            .store
            .get_therapist_by_user(&created.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(therapist.crp, "06/12345");
    }

    #[tokio::test]
    async fn logout_revokes_the_token() {
        let state = test_state().await;
        cadastro_paciente(
            State(state.clone()),
            Json(paciente_request("elisa@exemplo.com")),
        )
        .await
        .unwrap();
        let Json(body) = login(
            State(state.clone()),
            Json(LoginRequest {
                email: "elisa@exemplo.com".into(),
                password: "senha-segura".into(),
            }),
        )
        .await
        .unwrap();

        let user = state
            .store
            .get_user_by_email("elisa@exemplo.com")
            .await
            .unwrap()
            .unwrap();
        let patient = state
            .store
            .get_patient_by_user(&user.id)
            .await
            .unwrap()
            .unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            format!("Bearer {}", body.token).parse().unwrap(),
        );
        logout(
            State(state.clone()),
            Extension(AuthIdentity::Patient { user, patient }),
            headers,
        )
        .await
        .unwrap();

        let stored = state
            .store
            .find_token_by_hash(&token_hash(&body.token))
            .await
            .unwrap();
        assert!(stored.is_none());
    }
}

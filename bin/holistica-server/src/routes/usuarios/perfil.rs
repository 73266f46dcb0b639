//! Own-profile routes: read, update, change password.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::info;
use utoipa::OpenApi;
use validator::Validate;

use crate::auth::{hash_password, verify_password, AuthIdentity};
use crate::entities::{TherapistStore, UserStore};
use crate::error::ServerError;
use crate::schemas::usuarios::auth::ChangePasswordRequest;
use crate::schemas::usuarios::perfil::{PerfilResponse, UpdatePerfilRequest};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(get_perfil, update_perfil, alterar_senha),
    components(schemas(PerfilResponse, UpdatePerfilRequest, ChangePasswordRequest))
)]
pub struct PerfilApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/perfil/", get(get_perfil).put(update_perfil))
        .route("/perfil/senha/", post(alterar_senha))
}

/// Read the caller's profile (`GET /api/usuarios/perfil/`).
#[utoipa::path(
    get,
    path = "/api/usuarios/perfil/",
    tag = "usuarios",
    responses(
        (status = 200, description = "Caller's profile", body = PerfilResponse),
        (status = 401, description = "Missing or invalid token"),
    )
)]
pub async fn get_perfil(
    Extension(identity): Extension<AuthIdentity>,
) -> Result<Json<PerfilResponse>, ServerError> {
    let response = match &identity {
        AuthIdentity::Patient { user, .. } => user.to_perfil_response(None),
        AuthIdentity::Therapist { user, therapist } => user.to_perfil_response(Some(therapist)),
    };
    Ok(Json(response))
}

/// Update the caller's profile (`PUT /api/usuarios/perfil/`).
///
/// `especialidade` and `crp` are applied only for therapist accounts;
/// absent fields keep their current value.
#[utoipa::path(
    put,
    path = "/api/usuarios/perfil/",
    tag = "usuarios",
    request_body = UpdatePerfilRequest,
    responses(
        (status = 200, description = "Updated profile", body = PerfilResponse),
        (status = 400, description = "Malformed request"),
        (status = 409, description = "Email already in use"),
    )
)]
pub async fn update_perfil(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthIdentity>,
    Json(req): Json<UpdatePerfilRequest>,
) -> Result<Json<PerfilResponse>, ServerError> {
    req.validate()?;

    let current = identity.user();
    if req.email != current.email && state.store.get_user_by_email(&req.email).await?.is_some() {
        return Err(ServerError::Conflict("email já cadastrado".to_owned()));
    }

    let mut user = current.clone();
    user.email = req.email;
    user.first_name = req.first_name;
    user.last_name = req.last_name;
    user.telefone = req.telefone;
    user.data_nascimento = req.data_nascimento;
    user.endereco = req.endereco;
    user.updated_at = Utc::now();
    state.store.update_user(&user).await?;

    let updated_therapist = match &identity {
        AuthIdentity::Therapist { therapist, .. } => {
            let especialidade = req
                .especialidade
                .as_deref()
                .unwrap_or(&therapist.especialidade);
            let crp = req.crp.as_deref().unwrap_or(&therapist.crp);
            state
                .store
                .update_professional(&therapist.id, especialidade, crp)
                .await?;
            let mut updated = therapist.clone();
            updated.especialidade = especialidade.to_owned();
            updated.crp = crp.to_owned();
            Some(updated)
        }
        AuthIdentity::Patient { .. } => None,
    };

    info!(user_id = %user.id, "profile updated");
    Ok(Json(user.to_perfil_response(updated_therapist.as_ref())))
}

/// Change the caller's password (`POST /api/usuarios/perfil/senha/`).
#[utoipa::path(
    post,
    path = "/api/usuarios/perfil/senha/",
    tag = "usuarios",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = Value),
        (status = 400, description = "Wrong current password or weak new password"),
    )
)]
pub async fn alterar_senha(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthIdentity>,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<Value>, ServerError> {
    req.validate()?;

    let user = identity.user();
    verify_password(&req.old_password, &user.password_hash)
        .map_err(|_| ServerError::Validation("senha atual incorreta".to_owned()))?;

    let new_hash = hash_password(&req.new_password)?;
    state.store.update_password(&user.id, &new_hash).await?;

    info!(user_id = %user.id, "password changed");
    Ok(Json(json!({ "message": "senha alterada com sucesso" })))
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;
    use crate::testutil::{register_test_patient, register_test_therapist, test_state};

    #[tokio::test]
    async fn perfil_includes_professional_fields_for_therapists() {
        let state = test_state().await;
        let (user, therapist) = register_test_therapist(&state, "tera@exemplo.com").await;

        let Json(perfil) = get_perfil(Extension(AuthIdentity::Therapist {
            user,
            therapist: therapist.clone(),
        }))
        .await
        .unwrap();
        assert_eq!(perfil.crp.as_deref(), Some(therapist.crp.as_str()));
        assert!(perfil.especialidade.is_some());

        let (user, patient) = register_test_patient(&state, "pac@exemplo.com", None).await;
        let Json(perfil) = get_perfil(Extension(AuthIdentity::Patient { user, patient }))
            .await
            .unwrap();
        assert!(perfil.crp.is_none());
    }

    #[tokio::test]
    async fn update_perfil_persists_contact_and_professional_data() {
        let state = test_state().await;
        let (user, therapist) = register_test_therapist(&state, "tera2@exemplo.com").await;
        let identity = AuthIdentity::Therapist {
            user: user.clone(),
            therapist,
        };

        let Json(perfil) = update_perfil(
            State(state.clone()),
            Extension(identity),
            Json(UpdatePerfilRequest {
                first_name: "Helena".into(),
                last_name: "Ramos".into(),
                email: "helena@exemplo.com".into(),
                telefone: Some("11 91234-5678".into()),
                data_nascimento: None,
                endereco: None,
                especialidade: Some("Psicanálise".into()),
                crp: None,
            }),
        )
        .await
        .unwrap();
        assert_eq!(perfil.email, "helena@exemplo.com");
        assert_eq!(perfil.especialidade.as_deref(), Some("Psicanálise"));

        let stored = state.store.get_user(&user.id).await.unwrap().unwrap();
        assert_eq!(stored.first_name, "Helena");
        assert_eq!(stored.telefone.as_deref(), Some("11 91234-5678"));
    }

    #[tokio::test]
    async fn update_perfil_rejects_taken_email() {
        let state = test_state().await;
        register_test_patient(&state, "ocupado@exemplo.com", None).await;
        let (user, patient) = register_test_patient(&state, "livre@exemplo.com", None).await;

        let err = update_perfil(
            State(state.clone()),
            Extension(AuthIdentity::Patient { user, patient }),
            Json(UpdatePerfilRequest {
                first_name: "Conta".into(),
                last_name: "Teste".into(),
                email: "ocupado@exemplo.com".into(),
                telefone: None,
                data_nascimento: None,
                endereco: None,
                especialidade: None,
                crp: None,
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServerError::Conflict(_)));
    }

    #[tokio::test]
    async fn alterar_senha_requires_current_password() {
        let state = test_state().await;
        let (user, patient) = register_test_patient(&state, "senha@exemplo.com", None).await;
        let identity = AuthIdentity::Patient {
            user: user.clone(),
            patient,
        };

        let err = alterar_senha(
            State(state.clone()),
            Extension(identity.clone()),
            Json(ChangePasswordRequest {
                old_password: "senha-errada".into(),
                new_password: "nova-senha-123".into(),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServerError::Validation(_)));

        alterar_senha(
            State(state.clone()),
            Extension(identity),
            Json(ChangePasswordRequest {
                old_password: crate::testutil::TEST_PASSWORD.into(),
                new_password: "nova-senha-123".into(),
            }),
        )
        .await
        .unwrap();

        let stored = state.store.get_user(&user.id).await.unwrap().unwrap();
        assert!(verify_password("nova-senha-123", &stored.password_hash).is_ok());
    }
}

//! Notification routes.
//!
//! Notifications are strictly personal: every route operates on the
//! calling user's own rows, whatever their role.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::{Extension, Json, Router};
use utoipa::OpenApi;

use crate::auth::AuthIdentity;
use crate::entities::{Notification, NotificationStore};
use crate::error::ServerError;
use crate::schemas::usuarios::notificacao::{NotificacaoResponse, UpdateNotificacaoRequest};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(list_notificacoes, update_notificacao, delete_notificacao),
    components(schemas(NotificacaoResponse, UpdateNotificacaoRequest))
)]
pub struct NotificacoesApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/notificacoes/", get(list_notificacoes))
        .route(
            "/notificacoes/{id}/",
            patch(update_notificacao).delete(delete_notificacao),
        )
}

async fn own_notification(
    state: &AppState,
    identity: &AuthIdentity,
    id: &str,
) -> Result<Notification, ServerError> {
    let notification = state
        .store
        .get_notification(id)
        .await?
        .ok_or_else(|| ServerError::NotFound("notificação não encontrada".to_owned()))?;
    if notification.user_id != identity.user().id {
        return Err(ServerError::Forbidden(
            "acesso negado a esta notificação".to_owned(),
        ));
    }
    Ok(notification)
}

/// List the caller's notifications, newest first
/// (`GET /api/usuarios/notificacoes/`).
#[utoipa::path(
    get,
    path = "/api/usuarios/notificacoes/",
    tag = "usuarios",
    responses(
        (status = 200, description = "Caller's notifications", body = [NotificacaoResponse]),
        (status = 401, description = "Missing or invalid token"),
    )
)]
pub async fn list_notificacoes(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthIdentity>,
) -> Result<Json<Vec<NotificacaoResponse>>, ServerError> {
    let notifications = state
        .store
        .list_notifications(&identity.user().id)
        .await?;
    Ok(Json(
        notifications.iter().map(|n| n.to_response()).collect(),
    ))
}

/// Mark a notification read or unread
/// (`PATCH /api/usuarios/notificacoes/{id}/`).
#[utoipa::path(
    patch,
    path = "/api/usuarios/notificacoes/{id}/",
    tag = "usuarios",
    params(("id" = String, Path, description = "Notification id")),
    request_body = UpdateNotificacaoRequest,
    responses(
        (status = 200, description = "Updated notification", body = NotificacaoResponse),
        (status = 403, description = "Notification belongs to another user"),
        (status = 404, description = "No such notification"),
    )
)]
pub async fn update_notificacao(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthIdentity>,
    Path(id): Path<String>,
    Json(req): Json<UpdateNotificacaoRequest>,
) -> Result<Json<NotificacaoResponse>, ServerError> {
    let mut notification = own_notification(&state, &identity, &id).await?;
    state
        .store
        .set_notification_read(&notification.id, req.lida)
        .await?;
    notification.lida = req.lida;
    Ok(Json(notification.to_response()))
}

/// Remove a notification (`DELETE /api/usuarios/notificacoes/{id}/`).
#[utoipa::path(
    delete,
    path = "/api/usuarios/notificacoes/{id}/",
    tag = "usuarios",
    params(("id" = String, Path, description = "Notification id")),
    responses(
        (status = 204, description = "Notification removed"),
        (status = 403, description = "Notification belongs to another user"),
        (status = 404, description = "No such notification"),
    )
)]
pub async fn delete_notificacao(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthIdentity>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
    let notification = own_notification(&state, &identity, &id).await?;
    state.store.delete_notification(&notification.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;
    use crate::testutil::{register_test_patient, test_state};
    use chrono::Utc;
    use uuid::Uuid;

    async fn seed_notification(state: &crate::state::AppState, user_id: &str) -> Notification {
        let notification = Notification {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_owned(),
            assunto: "Lembrete".to_owned(),
            conteudo: "Sua sessão é amanhã.".to_owned(),
            lida: false,
            created_at: Utc::now(),
        };
        state
            .store
            .create_notification(&notification)
            .await
            .expect("seed notification");
        notification
    }

    #[tokio::test]
    async fn listing_is_scoped_to_the_owner() {
        let state = test_state().await;
        let (user_a, patient_a) = register_test_patient(&state, "a@exemplo.com", None).await;
        let (user_b, _) = register_test_patient(&state, "b@exemplo.com", None).await;
        seed_notification(&state, &user_a.id).await;
        seed_notification(&state, &user_a.id).await;
        seed_notification(&state, &user_b.id).await;

        let Json(mine) = list_notificacoes(
            State(state.clone()),
            Extension(AuthIdentity::Patient {
                user: user_a,
                patient: patient_a,
            }),
        )
        .await
        .unwrap();
        assert_eq!(mine.len(), 2);
    }

    #[tokio::test]
    async fn mark_read_roundtrip() {
        let state = test_state().await;
        let (user, patient) = register_test_patient(&state, "a@exemplo.com", None).await;
        let seeded = seed_notification(&state, &user.id).await;

        let Json(updated) = update_notificacao(
            State(state.clone()),
            Extension(AuthIdentity::Patient { user, patient }),
            Path(seeded.id.clone()),
            Json(UpdateNotificacaoRequest { lida: true }),
        )
        .await
        .unwrap();
        assert!(updated.lida);

        let stored = state
            .store
            .get_notification(&seeded.id)
            .await
            .unwrap()
            .unwrap();
        assert!(stored.lida);
    }

    #[tokio::test]
    async fn foreign_notifications_are_forbidden() {
        let state = test_state().await;
        let (owner, _) = register_test_patient(&state, "dona@exemplo.com", None).await;
        let seeded = seed_notification(&state, &owner.id).await;

        let (user, patient) = register_test_patient(&state, "outra@exemplo.com", None).await;
        let identity = AuthIdentity::Patient { user, patient };

        let err = update_notificacao(
            State(state.clone()),
            Extension(identity.clone()),
            Path(seeded.id.clone()),
            Json(UpdateNotificacaoRequest { lida: true }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServerError::Forbidden(_)));

        let err = delete_notificacao(
            State(state.clone()),
            Extension(identity),
            Path(seeded.id.clone()),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServerError::Forbidden(_)));
    }

    #[tokio::test]
    async fn delete_removes_the_notification() {
        let state = test_state().await;
        let (user, patient) = register_test_patient(&state, "a@exemplo.com", None).await;
        let seeded = seed_notification(&state, &user.id).await;

        let status = delete_notificacao(
            State(state.clone()),
            Extension(AuthIdentity::Patient { user, patient }),
            Path(seeded.id.clone()),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(state
            .store
            .get_notification(&seeded.id)
            .await
            .unwrap()
            .is_none());
    }
}

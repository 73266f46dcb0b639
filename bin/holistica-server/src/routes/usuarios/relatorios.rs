//! Clinical report routes. Therapist only.
//!
//! A report is authored by one therapist about one of their assigned
//! patients; only the author can read it back, change it or remove it.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Extension, Json, Router};
use chrono::Utc;
use tracing::{info, warn};
use utoipa::OpenApi;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{policy, AuthIdentity};
use crate::entities::{
    Notification, NotificationStore, PatientStore, Report, ReportStore,
};
use crate::error::ServerError;
use crate::schemas::usuarios::relatorio::{
    CreateRelatorioRequest, RelatorioResponse, UpdateRelatorioRequest,
};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        list_relatorios,
        create_relatorio,
        get_relatorio,
        update_relatorio,
        delete_relatorio
    ),
    components(schemas(RelatorioResponse, CreateRelatorioRequest, UpdateRelatorioRequest))
)]
pub struct RelatoriosApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/relatorios/", get(list_relatorios).post(create_relatorio))
        .route(
            "/relatorios/{id}/",
            get(get_relatorio)
                .put(update_relatorio)
                .delete(delete_relatorio),
        )
}

/// Fetch a report and check the caller authored it.
async fn own_report(
    state: &AppState,
    identity: &AuthIdentity,
    id: &str,
) -> Result<(Report, String), ServerError> {
    let therapist = identity.as_therapist()?;
    let (report, nome) = state
        .store
        .get_report_with_name(id)
        .await?
        .ok_or_else(|| ServerError::NotFound("relatório não encontrado".to_owned()))?;
    if report.therapist_id != therapist.id {
        return Err(ServerError::Forbidden(
            "acesso negado a este relatório".to_owned(),
        ));
    }
    Ok((report, nome))
}

/// List the caller's reports, newest first
/// (`GET /api/usuarios/relatorios/`).
#[utoipa::path(
    get,
    path = "/api/usuarios/relatorios/",
    tag = "usuarios",
    responses(
        (status = 200, description = "Reports authored by the caller", body = [RelatorioResponse]),
        (status = 403, description = "Caller is not a therapist"),
    )
)]
pub async fn list_relatorios(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthIdentity>,
) -> Result<Json<Vec<RelatorioResponse>>, ServerError> {
    let therapist = identity.as_therapist()?;
    let reports = state
        .store
        .list_reports_for_therapist(&therapist.id)
        .await?;
    Ok(Json(
        reports
            .iter()
            .map(|(report, nome)| report.to_response(nome))
            .collect(),
    ))
}

/// Write a report about an assigned patient
/// (`POST /api/usuarios/relatorios/`).
///
/// The patient is notified that a new report exists; a failed
/// notification does not undo the report.
#[utoipa::path(
    post,
    path = "/api/usuarios/relatorios/",
    tag = "usuarios",
    request_body = CreateRelatorioRequest,
    responses(
        (status = 201, description = "Report stored", body = RelatorioResponse),
        (status = 400, description = "Malformed request"),
        (status = 403, description = "Patient is not assigned to the caller"),
        (status = 404, description = "No such patient"),
    )
)]
pub async fn create_relatorio(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthIdentity>,
    Json(req): Json<CreateRelatorioRequest>,
) -> Result<(StatusCode, Json<RelatorioResponse>), ServerError> {
    req.validate()?;

    let patient = state
        .store
        .get_patient(&req.paciente_id)
        .await?
        .ok_or_else(|| ServerError::NotFound("paciente não encontrado".to_owned()))?;
    let therapist = policy::can_author_report(&identity, &patient)?;

    let now = Utc::now();
    let report = Report {
        id: Uuid::new_v4().to_string(),
        therapist_id: therapist.id.clone(),
        patient_id: patient.id.clone(),
        titulo: req.titulo,
        conteudo: req.conteudo,
        created_at: now,
        updated_at: now,
    };
    state.store.create_report(&report).await?;

    let aviso = Notification {
        id: Uuid::new_v4().to_string(),
        user_id: patient.user_id.clone(),
        assunto: "Novo relatório disponível".to_owned(),
        conteudo: format!("Seu terapeuta registrou o relatório \"{}\".", report.titulo),
        lida: false,
        created_at: now,
    };
    if let Err(e) = state.store.create_notification(&aviso).await {
        warn!(error = %e, report_id = %report.id, "failed to notify patient of new report");
    }

    info!(report_id = %report.id, patient_id = %patient.id, "report created");
    let nome = state
        .store
        .get_patient_profile(&patient.id)
        .await?
        .map(|p| p.nome_completo())
        .unwrap_or_default();
    Ok((StatusCode::CREATED, Json(report.to_response(&nome))))
}

/// Read one report (`GET /api/usuarios/relatorios/{id}/`).
#[utoipa::path(
    get,
    path = "/api/usuarios/relatorios/{id}/",
    tag = "usuarios",
    params(("id" = String, Path, description = "Report id")),
    responses(
        (status = 200, description = "Report", body = RelatorioResponse),
        (status = 403, description = "Caller did not author this report"),
        (status = 404, description = "No such report"),
    )
)]
pub async fn get_relatorio(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthIdentity>,
    Path(id): Path<String>,
) -> Result<Json<RelatorioResponse>, ServerError> {
    let (report, nome) = own_report(&state, &identity, &id).await?;
    Ok(Json(report.to_response(&nome)))
}

/// Update a report's title or body (`PUT /api/usuarios/relatorios/{id}/`).
#[utoipa::path(
    put,
    path = "/api/usuarios/relatorios/{id}/",
    tag = "usuarios",
    params(("id" = String, Path, description = "Report id")),
    request_body = UpdateRelatorioRequest,
    responses(
        (status = 200, description = "Updated report", body = RelatorioResponse),
        (status = 403, description = "Caller did not author this report"),
        (status = 404, description = "No such report"),
    )
)]
pub async fn update_relatorio(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthIdentity>,
    Path(id): Path<String>,
    Json(req): Json<UpdateRelatorioRequest>,
) -> Result<Json<RelatorioResponse>, ServerError> {
    req.validate()?;
    let (mut report, nome) = own_report(&state, &identity, &id).await?;

    if let Some(v) = req.titulo {
        report.titulo = v;
    }
    if let Some(v) = req.conteudo {
        report.conteudo = v;
    }
    report.updated_at = Utc::now();
    state.store.update_report(&report).await?;

    Ok(Json(report.to_response(&nome)))
}

/// Remove a report (`DELETE /api/usuarios/relatorios/{id}/`).
#[utoipa::path(
    delete,
    path = "/api/usuarios/relatorios/{id}/",
    tag = "usuarios",
    params(("id" = String, Path, description = "Report id")),
    responses(
        (status = 204, description = "Report removed"),
        (status = 403, description = "Caller did not author this report"),
        (status = 404, description = "No such report"),
    )
)]
pub async fn delete_relatorio(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthIdentity>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
    let (report, _) = own_report(&state, &identity, &id).await?;
    state.store.delete_report(&report.id).await?;
    info!(report_id = %report.id, "report removed");
    Ok(StatusCode::NO_CONTENT)
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;
    use crate::testutil::{register_test_patient, register_test_therapist, test_state};

    #[tokio::test]
    async fn create_relatorio_notifies_the_patient() {
        let state = test_state().await;
        let (user, therapist) = register_test_therapist(&state, "tera@exemplo.com").await;
        let (p_user, patient) =
            register_test_patient(&state, "paciente@exemplo.com", Some(&therapist.id)).await;
        let identity = AuthIdentity::Therapist { user, therapist };

        let (status, Json(created)) = create_relatorio(
            State(state.clone()),
            Extension(identity.clone()),
            Json(CreateRelatorioRequest {
                titulo: "Avaliação inicial".into(),
                paciente_id: patient.id.clone(),
                conteudo: "Paciente apresenta quadro estável.".into(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created.paciente_nome, "Ana Souza");

        let notifications = state.store.list_notifications(&p_user.id).await.unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].assunto, "Novo relatório disponível");

        let Json(listed) = list_relatorios(State(state.clone()), Extension(identity))
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].titulo, "Avaliação inicial");
    }

    #[tokio::test]
    async fn create_requires_assignment() {
        let state = test_state().await;
        let (user, therapist) = register_test_therapist(&state, "tera@exemplo.com").await;
        let (_, unassigned) = register_test_patient(&state, "livre@exemplo.com", None).await;

        let err = create_relatorio(
            State(state.clone()),
            Extension(AuthIdentity::Therapist { user, therapist }),
            Json(CreateRelatorioRequest {
                titulo: "Nota".into(),
                paciente_id: unassigned.id.clone(),
                conteudo: "texto".into(),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServerError::Forbidden(_)));
    }

    #[tokio::test]
    async fn item_routes_enforce_authorship() {
        let state = test_state().await;
        let (a_user, author) = register_test_therapist(&state, "autora@exemplo.com").await;
        let (_, patient) =
            register_test_patient(&state, "paciente@exemplo.com", Some(&author.id)).await;
        let author_identity = AuthIdentity::Therapist {
            user: a_user,
            therapist: author,
        };

        let (_, Json(created)) = create_relatorio(
            State(state.clone()),
            Extension(author_identity.clone()),
            Json(CreateRelatorioRequest {
                titulo: "Sessão 3".into(),
                paciente_id: patient.id.clone(),
                conteudo: "Evolução positiva.".into(),
            }),
        )
        .await
        .unwrap();

        let (user, other) = register_test_therapist(&state, "outra@exemplo.com").await;
        let err = get_relatorio(
            State(state.clone()),
            Extension(AuthIdentity::Therapist {
                user,
                therapist: other,
            }),
            Path(created.id.clone()),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServerError::Forbidden(_)));

        let Json(updated) = update_relatorio(
            State(state.clone()),
            Extension(author_identity.clone()),
            Path(created.id.clone()),
            Json(UpdateRelatorioRequest {
                titulo: None,
                conteudo: Some("Evolução positiva; revisar em duas semanas.".into()),
            }),
        )
        .await
        .unwrap();
        assert!(updated.conteudo.contains("revisar"));
        assert_eq!(updated.titulo, "Sessão 3");

        let status = delete_relatorio(
            State(state.clone()),
            Extension(author_identity.clone()),
            Path(created.id.clone()),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);

        let err = get_relatorio(
            State(state.clone()),
            Extension(author_identity),
            Path(created.id),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServerError::NotFound(_)));
    }

    #[tokio::test]
    async fn patients_cannot_touch_reports() {
        let state = test_state().await;
        let (user, patient) = register_test_patient(&state, "paciente@exemplo.com", None).await;

        let err = list_relatorios(
            State(state.clone()),
            Extension(AuthIdentity::Patient { user, patient }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServerError::Forbidden(_)));
    }
}

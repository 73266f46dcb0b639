//! Dashboard endpoints.
//!
//! Every figure is recomputed from the message and session tables on
//! each call; nothing is cached or denormalized. "Conversations" are
//! counted as completed exchanges, i.e. stored AI replies.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Extension, Json, Router};
use chrono::{Duration, NaiveTime, Utc};
use utoipa::OpenApi;

use crate::auth::AuthIdentity;
use crate::entities::{PainelStore, PatientStore, SessionStore, TherapistStore};
use crate::error::ServerError;
use crate::schemas::ia::{PacienteAtivoResponse, PainelPacienteResponse, PainelTerapeutaResponse};
use crate::state::AppState;

/// How many patients the therapist dashboard's activity feed shows.
const ACTIVITY_FEED_SIZE: i64 = 5;

#[derive(OpenApi)]
#[openapi(
    paths(painel_paciente, painel_terapeuta),
    components(schemas(
        PainelPacienteResponse,
        PainelTerapeutaResponse,
        PacienteAtivoResponse
    ))
)]
pub struct PainelApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/painel_paciente/", get(painel_paciente))
        .route("/painel_terapeuta/", get(painel_terapeuta))
}

/// Patient progress summary (`GET /api/ia/painel_paciente/`).
#[utoipa::path(
    get,
    path = "/api/ia/painel_paciente/",
    tag = "ia",
    responses(
        (status = 200, description = "Progress summary", body = PainelPacienteResponse),
        (status = 403, description = "Caller is not a patient"),
    )
)]
pub async fn painel_paciente(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthIdentity>,
) -> Result<Json<PainelPacienteResponse>, ServerError> {
    let patient = identity.as_patient()?;

    let profile = state
        .store
        .get_patient_profile(&patient.id)
        .await?
        .ok_or_else(|| ServerError::Internal("patient profile missing".to_owned()))?;

    let now = Utc::now();
    let week_ago = now - Duration::days(7);
    let total = state
        .store
        .count_ai_messages_for_patient(&patient.id)
        .await?;
    let semana = state
        .store
        .count_ai_messages_for_patient_since(&patient.id, week_ago)
        .await?;
    let sentimento = state.store.modal_sentiment_for_patient(&patient.id).await?;
    let proxima = state.store.next_scheduled_session(&patient.id, now).await?;

    Ok(Json(PainelPacienteResponse {
        paciente_perfil: profile.to_response(),
        total_conversas: total,
        conversas_essa_semana: semana,
        sentimento_medio: sentimento,
        proxima_sessao: proxima.map(|t| t.to_rfc3339()),
    }))
}

/// Therapist practice summary (`GET /api/ia/painel_terapeuta/`).
#[utoipa::path(
    get,
    path = "/api/ia/painel_terapeuta/",
    tag = "ia",
    responses(
        (status = 200, description = "Practice summary", body = PainelTerapeutaResponse),
        (status = 403, description = "Caller is not a therapist"),
    )
)]
pub async fn painel_terapeuta(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthIdentity>,
) -> Result<Json<PainelTerapeutaResponse>, ServerError> {
    let therapist = identity.as_therapist()?;
    let user = identity.user();

    let now = Utc::now();
    // "Today" in UTC; the deployment runs with UTC timestamps throughout.
    let midnight = now.date_naive().and_time(NaiveTime::MIN).and_utc();
    let week_ago = now - Duration::days(7);

    let total_pacientes = state.store.count_patients(&therapist.id).await?;
    let conversas_hoje = state
        .store
        .count_ai_messages_for_therapist_since(&therapist.id, midnight)
        .await?;
    let sessoes_pendentes = state
        .store
        .count_pending_sessions(&therapist.id, now)
        .await?;
    let alertas_urgentes = state
        .store
        .count_urgent_alerts(&therapist.id, week_ago)
        .await?;
    let ativos = state
        .store
        .list_patient_activity(&therapist.id, ACTIVITY_FEED_SIZE)
        .await?;

    Ok(Json(PainelTerapeutaResponse {
        terapeuta: therapist.to_response(user),
        total_pacientes,
        conversas_hoje,
        sessoes_pendentes,
        alertas_urgentes,
        pacientes_ativos: ativos.iter().map(|a| a.to_response()).collect(),
    }))
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;
    use crate::conversation;
    use crate::testutil::{
        create_test_session, register_test_patient, register_test_therapist, test_state,
    };

    async fn exchange(state: &Arc<AppState>, patient: &crate::entities::Patient, texto: &str) {
        conversation::respond(
            state.clone(),
            patient.clone(),
            texto.to_owned(),
            None,
            None,
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn painel_paciente_counts_completed_exchanges() {
        let state = test_state().await;
        let (user, patient) = register_test_patient(&state, "paciente@exemplo.com", None).await;
        exchange(&state, &patient, "Hoje estou bem").await;
        exchange(&state, &patient, "Foi um dia ótimo").await;
        let identity = AuthIdentity::Patient {
            user,
            patient: patient.clone(),
        };

        let Json(painel) = painel_paciente(State(state.clone()), Extension(identity.clone()))
            .await
            .unwrap();
        assert_eq!(painel.total_conversas, 2);
        assert_eq!(painel.conversas_essa_semana, 2);
        assert_eq!(painel.sentimento_medio.as_deref(), Some("Positivo"));
        assert!(painel.proxima_sessao.is_none());
        assert_eq!(painel.paciente_perfil.id, patient.id);

        // An upcoming appointment surfaces as proximaSessao.
        let mut session = create_test_session(&state, &patient.id).await;
        session.scheduled_at = Some(Utc::now() + Duration::days(3));
        state.store.update_session(&session).await.unwrap();

        let Json(painel) = painel_paciente(State(state.clone()), Extension(identity))
            .await
            .unwrap();
        assert!(painel.proxima_sessao.is_some());
    }

    #[tokio::test]
    async fn painel_terapeuta_aggregates_the_practice() {
        let state = test_state().await;
        let (t_user, therapist) = register_test_therapist(&state, "tera@exemplo.com").await;
        let (_, anxious) =
            register_test_patient(&state, "ansiosa@exemplo.com", Some(&therapist.id)).await;
        let (_, calm) =
            register_test_patient(&state, "tranquila@exemplo.com", Some(&therapist.id)).await;
        exchange(&state, &anxious, "Estou muito triste e sozinho").await;
        exchange(&state, &calm, "Hoje me sinto bem").await;

        let Json(painel) = painel_terapeuta(
            State(state.clone()),
            Extension(AuthIdentity::Therapist {
                user: t_user,
                therapist: therapist.clone(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(painel.terapeuta.crp, therapist.crp);
        assert_eq!(painel.total_pacientes, 2);
        assert_eq!(painel.conversas_hoje, 2);
        assert_eq!(painel.alertas_urgentes, 1, "one Negativo/Alta reply");
        assert_eq!(painel.pacientes_ativos.len(), 2);
        assert!(painel
            .pacientes_ativos
            .iter()
            .all(|p| p.ultima_conversa.is_some() && p.sentimento.is_some()));
    }

    #[tokio::test]
    async fn dashboards_enforce_roles() {
        let state = test_state().await;
        let (user, patient) = register_test_patient(&state, "paciente@exemplo.com", None).await;
        let identity = AuthIdentity::Patient { user, patient };

        let err = painel_terapeuta(State(state.clone()), Extension(identity))
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::Forbidden(_)));

        let (user, therapist) = register_test_therapist(&state, "tera@exemplo.com").await;
        let err = painel_paciente(
            State(state.clone()),
            Extension(AuthIdentity::Therapist { user, therapist }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServerError::Forbidden(_)));
    }
}

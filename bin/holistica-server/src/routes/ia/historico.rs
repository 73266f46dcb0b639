//! Conversation history, paired into exchanges.
//!
//! The frontend renders history as patient-text/AI-reply cards, so the
//! flat message rows are folded back into [`Exchange`] pairs here. A
//! patient message whose reply never arrived shows up with a null
//! `resposta_ia`.
//!
//! [`Exchange`]: crate::conversation::Exchange

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Extension, Json, Router};
use utoipa::OpenApi;

use crate::auth::AuthIdentity;
use crate::conversation::{clamp_history_limit, pair_exchanges};
use crate::entities::{MessageStore, SessionStore};
use crate::error::ServerError;
use crate::schemas::ia::{ConversaResponse, HistoricoQuery, HistoricoResponse};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(historico),
    components(schemas(HistoricoResponse, ConversaResponse))
)]
pub struct HistoricoApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/historico/", get(historico))
}

/// Read the caller's conversation history (`GET /api/ia/historico/`).
///
/// Scoped to one session when `sessao_id` is given (with `after`/`limit`
/// keyset pagination), otherwise every session of the caller, oldest
/// first.
#[utoipa::path(
    get,
    path = "/api/ia/historico/",
    tag = "ia",
    params(HistoricoQuery),
    responses(
        (status = 200, description = "Exchanges, oldest first", body = HistoricoResponse),
        (status = 403, description = "Caller is not a patient, or the session is another patient's"),
        (status = 404, description = "No such session"),
    )
)]
pub async fn historico(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthIdentity>,
    Query(query): Query<HistoricoQuery>,
) -> Result<Json<HistoricoResponse>, ServerError> {
    let patient = identity.as_patient()?;

    let messages = match query.sessao_id.as_deref() {
        Some(session_id) => {
            let session = state
                .store
                .get_session(session_id)
                .await?
                .ok_or_else(|| ServerError::NotFound("sessão não encontrada".to_owned()))?;
            if session.patient_id != patient.id {
                return Err(ServerError::Forbidden(
                    "esta sessão pertence a outro paciente".to_owned(),
                ));
            }
            state
                .store
                .list_messages(
                    &session.id,
                    query.after.unwrap_or(0),
                    clamp_history_limit(query.limit),
                )
                .await?
        }
        None => state.store.list_messages_for_patient(&patient.id).await?,
    };

    let conversas = pair_exchanges(&messages)
        .iter()
        .map(|e| e.to_response())
        .collect();
    Ok(Json(HistoricoResponse { conversas }))
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;
    use crate::conversation;
    use crate::routes::ia::responder::responder;
    use crate::schemas::ia::ResponderRequest;
    use crate::testutil::{create_test_session, register_test_patient, test_state};

    #[tokio::test]
    async fn historico_pairs_exchanges_oldest_first() {
        let state = test_state().await;
        let (user, patient) = register_test_patient(&state, "paciente@exemplo.com", None).await;
        let identity = AuthIdentity::Patient { user, patient };

        for texto in ["Olá", "Hoje foi um dia bom"] {
            responder(
                State(state.clone()),
                Extension(identity.clone()),
                Json(ResponderRequest {
                    mensagem_usuario: texto.into(),
                    sessao_id: None,
                    expected_seq: None,
                }),
            )
            .await
            .unwrap();
        }

        let Json(body) = historico(
            State(state.clone()),
            Extension(identity),
            Query(HistoricoQuery {
                sessao_id: None,
                after: None,
                limit: None,
            }),
        )
        .await
        .unwrap();
        assert_eq!(body.conversas.len(), 2);
        assert_eq!(body.conversas[0].mensagem_usuario, "Olá");
        assert_eq!(body.conversas[0].seq, 1);
        assert!(body.conversas[0].resposta_ia.is_some());
        assert!(body.conversas[1].resposta_ia.is_some());
    }

    #[tokio::test]
    async fn historico_scopes_to_own_sessions() {
        let state = test_state().await;
        let (_, owner) = register_test_patient(&state, "dona@exemplo.com", None).await;
        let foreign = create_test_session(&state, &owner.id).await;

        let (user, patient) = register_test_patient(&state, "outra@exemplo.com", None).await;
        let identity = AuthIdentity::Patient { user, patient };

        let err = historico(
            State(state.clone()),
            Extension(identity.clone()),
            Query(HistoricoQuery {
                sessao_id: Some(foreign.id.clone()),
                after: None,
                limit: None,
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServerError::Forbidden(_)));

        let err = historico(
            State(state.clone()),
            Extension(identity),
            Query(HistoricoQuery {
                sessao_id: Some("inexistente".into()),
                after: None,
                limit: None,
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServerError::NotFound(_)));
    }

    #[tokio::test]
    async fn unanswered_message_shows_a_null_reply() {
        let state = test_state().await;
        let (user, patient) = register_test_patient(&state, "paciente@exemplo.com", None).await;
        let session = create_test_session(&state, &patient.id).await;
        conversation::append_patient_message(&state, &session.id, "Alguém aí?")
            .await
            .unwrap();

        let Json(body) = historico(
            State(state.clone()),
            Extension(AuthIdentity::Patient { user, patient }),
            Query(HistoricoQuery {
                sessao_id: Some(session.id.clone()),
                after: None,
                limit: None,
            }),
        )
        .await
        .unwrap();
        assert_eq!(body.conversas.len(), 1);
        assert_eq!(body.conversas[0].mensagem_usuario, "Alguém aí?");
        assert!(body.conversas[0].resposta_ia.is_none());
    }
}

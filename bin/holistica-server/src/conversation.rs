//! Conversation engine: ordered message history and patient/AI exchanges.
//!
//! Every append goes through the per-session lock in
//! [`crate::state::SessionLocks`], so a patient message and its AI reply
//! always occupy adjacent sequence numbers. The AI call happens while the
//! lock is held; concurrent sends to the same session queue up behind it
//! rather than interleaving.
//!
//! A failed AI call leaves the patient message in place. The client can
//! retry the same exchange by passing `expected_seq` (the sequence number
//! its message was or should be stored at); the retry either completes
//! the missing reply, returns the already-stored pair, or fails with 409
//! when the conversation has moved on.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use holistica_responder::{Intensidade, Sentimento, Speaker, Turn};
use tracing::warn;
use uuid::Uuid;

use crate::entities::{
    dao::{Message, NewMessage, Notification, Patient, Session},
    MessageStore, NotificationStore, PatientStore, SessionStore, TherapistStore, SENDER_IA,
    SENDER_PACIENTE, STATUS_ABERTA,
};
use crate::error::ServerError;
use crate::state::AppState;

/// Upper bound on a single message body.
pub const MAX_TEXTO_BYTES: usize = 16 * 1024;

/// How many prior messages are replayed to the AI as context.
const AI_HISTORY_TURNS: i64 = 50;

pub const DEFAULT_HISTORY_LIMIT: i64 = 100;
pub const MAX_HISTORY_LIMIT: i64 = 500;

/// Clamp a client-supplied page size into `1..=MAX_HISTORY_LIMIT`.
pub fn clamp_history_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_HISTORY_LIMIT).clamp(1, MAX_HISTORY_LIMIT)
}

fn validate_texto(texto: &str) -> Result<(), ServerError> {
    if texto.trim().is_empty() {
        return Err(ServerError::Validation(
            "a mensagem não pode ser vazia".to_owned(),
        ));
    }
    if texto.len() > MAX_TEXTO_BYTES {
        return Err(ServerError::Validation(
            "a mensagem excede o tamanho máximo".to_owned(),
        ));
    }
    Ok(())
}

/// A completed patient/AI exchange, as stored.
#[derive(Debug)]
pub struct RespondOutcome {
    pub session: Session,
    pub patient_message: Message,
    pub reply: Message,
}

/// Append a patient-authored message without generating a reply.
///
/// The caller has already resolved the session and checked access; the
/// status check happens here, under the session lock.
pub async fn append_patient_message(
    state: &AppState,
    session_id: &str,
    texto: &str,
) -> Result<Message, ServerError> {
    validate_texto(texto)?;
    let lock = state.session_locks.for_session(session_id);
    let _guard = lock.lock().await;
    let session = state
        .store
        .get_session(session_id)
        .await?
        .ok_or_else(|| ServerError::NotFound("sessão não encontrada".to_owned()))?;
    if session.is_closed() {
        return Err(ServerError::Validation(
            "sessão encerrada não aceita novas mensagens".to_owned(),
        ));
    }
    Ok(state
        .store
        .append_message(&NewMessage::from_patient(session_id, texto))
        .await?)
}

/// Run one full exchange: store the patient message, call the AI, store
/// the reply.
///
/// Runs on a detached task; dropping the caller's future (client
/// disconnect) must not abort a half-written exchange.
pub async fn respond(
    state: Arc<AppState>,
    patient: Patient,
    texto: String,
    sessao_id: Option<String>,
    expected_seq: Option<i64>,
) -> Result<RespondOutcome, ServerError> {
    let handle = tokio::spawn(respond_inner(state, patient, texto, sessao_id, expected_seq));
    match handle.await {
        Ok(result) => result,
        Err(e) => Err(ServerError::Internal(format!("respond task failed: {e}"))),
    }
}

async fn respond_inner(
    state: Arc<AppState>,
    patient: Patient,
    texto: String,
    sessao_id: Option<String>,
    expected_seq: Option<i64>,
) -> Result<RespondOutcome, ServerError> {
    validate_texto(&texto)?;

    // Resolve (or create) the target session before taking its lock.
    let session = match &sessao_id {
        Some(id) => {
            let session = state
                .store
                .get_session(id)
                .await?
                .ok_or_else(|| ServerError::NotFound("sessão não encontrada".to_owned()))?;
            if session.patient_id != patient.id {
                return Err(ServerError::Forbidden(
                    "esta sessão pertence a outro paciente".to_owned(),
                ));
            }
            session
        }
        None => match state.store.find_open_session(&patient.id).await? {
            Some(open) => open,
            None => {
                let now = Utc::now();
                let session = Session {
                    id: Uuid::new_v4().to_string(),
                    patient_id: patient.id.clone(),
                    status: STATUS_ABERTA.to_owned(),
                    scheduled_at: None,
                    duracao: None,
                    observacoes: None,
                    created_at: now,
                    updated_at: now,
                };
                state.store.create_session(&session).await?;
                session
            }
        },
    };

    let lock = state.session_locks.for_session(&session.id);
    let _guard = lock.lock().await;

    // Re-read under the lock; status or contents may have moved while we
    // were queued.
    let session = state
        .store
        .get_session(&session.id)
        .await?
        .ok_or_else(|| ServerError::NotFound("sessão não encontrada".to_owned()))?;
    if session.is_closed() {
        return Err(ServerError::Validation(
            "sessão encerrada não aceita novas mensagens".to_owned(),
        ));
    }

    if let Some(exp) = expected_seq {
        if let Some(prior) = state.store.get_message_at(&session.id, exp).await? {
            return retry_exchange(&state, &patient, &session, prior, &texto, exp).await;
        }
        let max = state.store.max_seq(&session.id).await?;
        if exp != max + 1 {
            return Err(ServerError::Conflict(format!(
                "expected_seq {exp} fora de sequência (próximo: {})",
                max + 1
            )));
        }
    }

    let history = recent_turns(&state, &session.id, i64::MAX).await?;
    let patient_message = state
        .store
        .append_message(&NewMessage::from_patient(&session.id, &texto))
        .await?;
    let reply = complete_exchange(&state, &patient, &session, &history, &texto).await?;
    Ok(RespondOutcome { session, patient_message, reply })
}

/// Handle a send whose `expected_seq` slot is already occupied.
async fn retry_exchange(
    state: &AppState,
    patient: &Patient,
    session: &Session,
    prior: Message,
    texto: &str,
    exp: i64,
) -> Result<RespondOutcome, ServerError> {
    if prior.sender != SENDER_PACIENTE || prior.texto != texto {
        return Err(ServerError::Conflict(
            "expected_seq já ocupado por outra mensagem".to_owned(),
        ));
    }
    if let Some(next) = state.store.get_message_at(&session.id, exp + 1).await? {
        if next.sender == SENDER_IA {
            // The exchange already completed; hand back the stored pair.
            return Ok(RespondOutcome {
                session: session.clone(),
                patient_message: prior,
                reply: next,
            });
        }
        return Err(ServerError::Conflict(
            "a conversa avançou desde esta mensagem".to_owned(),
        ));
    }
    // The patient message survived an earlier failed attempt; only the
    // reply is missing.
    let history = recent_turns(state, &session.id, exp).await?;
    let reply = complete_exchange(state, patient, session, &history, texto).await?;
    Ok(RespondOutcome {
        session: session.clone(),
        patient_message: prior,
        reply,
    })
}

/// Call the responder and store its reply, raising an urgent-alert
/// notification for the assigned therapist when warranted.
async fn complete_exchange(
    state: &AppState,
    patient: &Patient,
    session: &Session,
    history: &[Turn],
    texto: &str,
) -> Result<Message, ServerError> {
    let ai_reply = state.responder.respond(history, texto).await?;
    let reply = state
        .store
        .append_message(&NewMessage {
            session_id: session.id.clone(),
            sender: SENDER_IA.to_owned(),
            texto: ai_reply.resposta.clone(),
            sentimento: Some(ai_reply.sentimento.as_str().to_owned()),
            categoria: Some(ai_reply.categoria.clone()),
            intensidade: Some(ai_reply.intensidade.as_str().to_owned()),
        })
        .await?;
    if ai_reply.sentimento == Sentimento::Negativo && ai_reply.intensidade == Intensidade::Alta {
        // The reply is already stored; a failed alert must not fail the
        // exchange.
        if let Err(e) = alert_therapist(state, patient).await {
            warn!(error = %e, patient_id = %patient.id, "failed to create urgent alert notification");
        }
    }
    Ok(reply)
}

async fn alert_therapist(state: &AppState, patient: &Patient) -> Result<(), ServerError> {
    let Some(therapist_id) = patient.therapist_id.as_deref() else {
        return Ok(());
    };
    let Some(therapist) = state.store.get_therapist(therapist_id).await? else {
        return Ok(());
    };
    let nome = state
        .store
        .get_patient_profile(&patient.id)
        .await?
        .map(|p| p.nome_completo())
        .unwrap_or_else(|| "Um paciente".to_owned());
    state
        .store
        .create_notification(&Notification {
            id: Uuid::new_v4().to_string(),
            user_id: therapist.user_id,
            assunto: "Alerta: sentimento negativo de alta intensidade".to_owned(),
            conteudo: format!(
                "{nome} relatou sentimento negativo de alta intensidade em uma conversa recente."
            ),
            lida: false,
            created_at: Utc::now(),
        })
        .await?;
    Ok(())
}

/// The last [`AI_HISTORY_TURNS`] messages before `before_seq`, oldest
/// first, as responder turns.
async fn recent_turns(
    state: &AppState,
    session_id: &str,
    before_seq: i64,
) -> Result<Vec<Turn>, ServerError> {
    let max = state.store.max_seq(session_id).await?;
    let upper = before_seq.saturating_sub(1).min(max);
    let after = (upper - AI_HISTORY_TURNS).max(0);
    let messages = state
        .store
        .list_messages(session_id, after, AI_HISTORY_TURNS)
        .await?;
    Ok(messages
        .iter()
        .filter(|m| m.seq <= upper)
        .map(turn_from_message)
        .collect())
}

fn turn_from_message(m: &Message) -> Turn {
    Turn {
        speaker: if m.sender == SENDER_IA { Speaker::Ai } else { Speaker::Patient },
        text: m.texto.clone(),
    }
}

/// One patient message with its AI reply, as the history endpoint
/// presents them.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub sessao_id: String,
    pub seq: i64,
    pub mensagem_usuario: String,
    pub resposta_ia: Option<String>,
    pub sentimento: Option<String>,
    pub categoria: Option<String>,
    pub intensidade: Option<String>,
    pub data_conversa: DateTime<Utc>,
}

/// Fold an ordered message list into patient/reply exchanges.
///
/// A reply attaches to the immediately preceding patient message of the
/// same session; a reply whose patient message fell outside the window
/// becomes its own entry with an empty user text.
pub fn pair_exchanges(messages: &[Message]) -> Vec<Exchange> {
    let mut exchanges: Vec<Exchange> = Vec::new();
    for m in messages {
        if m.sender == SENDER_PACIENTE {
            exchanges.push(Exchange {
                sessao_id: m.session_id.clone(),
                seq: m.seq,
                mensagem_usuario: m.texto.clone(),
                resposta_ia: None,
                sentimento: None,
                categoria: None,
                intensidade: None,
                data_conversa: m.created_at,
            });
            continue;
        }
        match exchanges.last_mut() {
            Some(last)
                if last.sessao_id == m.session_id
                    && last.resposta_ia.is_none()
                    && m.seq == last.seq + 1 =>
            {
                last.resposta_ia = Some(m.texto.clone());
                last.sentimento = m.sentimento.clone();
                last.categoria = m.categoria.clone();
                last.intensidade = m.intensidade.clone();
            }
            _ => {
                exchanges.push(Exchange {
                    sessao_id: m.session_id.clone(),
                    seq: m.seq,
                    mensagem_usuario: String::new(),
                    resposta_ia: Some(m.texto.clone()),
                    sentimento: m.sentimento.clone(),
                    categoria: m.categoria.clone(),
                    intensidade: m.intensidade.clone(),
                    data_conversa: m.created_at,
                });
            }
        }
    }
    exchanges
}

// ── Tests ─────────────────────────────────────────────────────────────────────

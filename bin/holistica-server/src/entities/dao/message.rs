use chrono::{DateTime, Utc};

/// Sender value for patient-authored messages.
pub const SENDER_PACIENTE: &str = "paciente";
/// Sender value for AI replies.
pub const SENDER_IA: &str = "ia";

/// A row in the `messages` table.
///
/// `seq` is assigned by the store on insert and is gapless per session,
/// starting at 1. The sentiment triple (`sentimento`, `categoria`,
/// `intensidade`) is populated only on AI replies.
#[derive(Debug, Clone)]
pub struct Message {
    pub id: String,
    pub session_id: String,
    pub seq: i64,
    /// Either [`SENDER_PACIENTE`] or [`SENDER_IA`].
    pub sender: String,
    pub texto: String,
    pub sentimento: Option<String>,
    pub categoria: Option<String>,
    pub intensidade: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a message; `seq` is chosen atomically by the store.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub session_id: String,
    pub sender: String,
    pub texto: String,
    pub sentimento: Option<String>,
    pub categoria: Option<String>,
    pub intensidade: Option<String>,
}

impl NewMessage {
    /// A patient-authored message without sentiment annotations.
    pub fn from_patient(session_id: &str, texto: &str) -> Self {
        Self {
            session_id: session_id.to_owned(),
            sender: SENDER_PACIENTE.to_owned(),
            texto: texto.to_owned(),
            sentimento: None,
            categoria: None,
            intensidade: None,
        }
    }
}

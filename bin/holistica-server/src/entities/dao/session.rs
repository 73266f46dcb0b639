use chrono::{DateTime, Utc};

/// A session that still accepts new messages.
pub const STATUS_ABERTA: &str = "aberta";
/// A session closed by the therapist or patient; append is rejected.
pub const STATUS_ENCERRADA: &str = "encerrada";

/// A row in the `sessions` table.
///
/// A session is a conversation container: messages belong to exactly one
/// session and carry a per-session sequence number. Therapist-scheduled
/// sessions additionally carry an appointment date and duration.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub patient_id: String,
    /// Either [`STATUS_ABERTA`] or [`STATUS_ENCERRADA`].
    pub status: String,
    /// Appointment date for therapist-scheduled sessions.
    pub scheduled_at: Option<DateTime<Utc>>,
    /// Planned duration in minutes.
    pub duracao: Option<i64>,
    pub observacoes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn is_closed(&self) -> bool {
        self.status == STATUS_ENCERRADA
    }
}

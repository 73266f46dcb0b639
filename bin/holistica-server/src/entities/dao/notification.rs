use chrono::{DateTime, Utc};

/// A row in the `notifications` table.
#[derive(Debug, Clone)]
pub struct Notification {
    pub id: String,
    /// Recipient account.
    pub user_id: String,
    pub assunto: String,
    pub conteudo: String,
    pub lida: bool,
    pub created_at: DateTime<Utc>,
}

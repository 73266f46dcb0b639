use chrono::{DateTime, Utc};

/// A row in the `auth_tokens` table.
///
/// Only the SHA-256 hex digest of the token is stored; the raw value is
/// returned to the client once at login and never persisted.
#[derive(Debug, Clone)]
pub struct AuthToken {
    pub id: String,
    pub user_id: String,
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl AuthToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

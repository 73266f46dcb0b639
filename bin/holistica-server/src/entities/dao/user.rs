use chrono::{DateTime, Utc};

/// Role value stored for patient accounts.
pub const ROLE_PACIENTE: &str = "paciente";
/// Role value stored for therapist accounts.
pub const ROLE_TERAPEUTA: &str = "terapeuta";

/// A row in the `users` table.
///
/// Both patients and therapists have a `User` record; the role-specific
/// data lives in the `patients` / `therapists` tables keyed by `user_id`.
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub email: String,
    /// Argon2 PHC string, never the plaintext password.
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    /// Either [`ROLE_PACIENTE`] or [`ROLE_TERAPEUTA`].
    pub role: String,
    pub telefone: Option<String>,
    /// Date of birth as `YYYY-MM-DD`.
    pub data_nascimento: Option<String>,
    pub endereco: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

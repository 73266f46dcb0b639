use chrono::{DateTime, Utc};

/// A row in the `therapists` table.
#[derive(Debug, Clone)]
pub struct Therapist {
    pub id: String,
    pub user_id: String,
    pub especialidade: String,
    /// Professional registration number, unique across therapists.
    pub crp: String,
    pub created_at: DateTime<Utc>,
}

use chrono::{DateTime, Utc};

/// A row in the `reports` table: a clinical note written by a therapist
/// about one of their patients.
#[derive(Debug, Clone)]
pub struct Report {
    pub id: String,
    pub therapist_id: String,
    pub patient_id: String,
    pub titulo: String,
    pub conteudo: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

use chrono::{DateTime, Utc};

/// A row in the `patients` table.
#[derive(Debug, Clone)]
pub struct Patient {
    pub id: String,
    pub user_id: String,
    /// Assigned therapist, `None` for self-registered patients awaiting
    /// assignment.
    pub therapist_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Patient joined with the account fields from `users`.
///
/// This is the shape the listing and profile endpoints work with, so
/// handlers never issue a second query for the name or email.
#[derive(Debug, Clone)]
pub struct PatientProfile {
    pub id: String,
    pub user_id: String,
    pub therapist_id: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub telefone: Option<String>,
    pub data_nascimento: Option<String>,
    pub endereco: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PatientProfile {
    pub fn nome_completo(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// One row of the therapist dashboard's recent-activity listing.
#[derive(Debug, Clone)]
pub struct PatientActivity {
    pub patient_id: String,
    pub first_name: String,
    pub last_name: String,
    /// Timestamp of the patient's most recent message, if any.
    pub ultima_conversa: Option<DateTime<Utc>>,
    /// Sentiment of the most recent AI reply, if any.
    pub sentimento: Option<String>,
}

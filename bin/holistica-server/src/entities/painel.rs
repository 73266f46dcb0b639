use crate::entities::{dao::PatientActivity, parse_ts_opt, Store, SENDER_IA};
use chrono::{DateTime, Utc};
use std::future::Future;

/// Aggregation queries backing the patient and therapist dashboards.
///
/// A "conversation" is counted as one completed exchange, i.e. one AI
/// reply; a patient message still waiting for its reply does not count.
pub trait PainelStore: Send + Sync + 'static {
    fn count_ai_messages_for_patient(
        &self,
        patient_id: &str,
    ) -> impl Future<Output = Result<i64, sqlx::Error>> + Send;
    fn count_ai_messages_for_patient_since(
        &self,
        patient_id: &str,
        since: DateTime<Utc>,
    ) -> impl Future<Output = Result<i64, sqlx::Error>> + Send;
    /// Most frequent sentiment across the patient's AI replies, if any.
    fn modal_sentiment_for_patient(
        &self,
        patient_id: &str,
    ) -> impl Future<Output = Result<Option<String>, sqlx::Error>> + Send;
    fn count_ai_messages_for_therapist_since(
        &self,
        therapist_id: &str,
        since: DateTime<Utc>,
    ) -> impl Future<Output = Result<i64, sqlx::Error>> + Send;
    /// AI replies since `since` classified Negativo with Alta intensity,
    /// across the therapist's patients.
    fn count_urgent_alerts(
        &self,
        therapist_id: &str,
        since: DateTime<Utc>,
    ) -> impl Future<Output = Result<i64, sqlx::Error>> + Send;
    /// The therapist's patients ordered by most recent message, with the
    /// sentiment of each patient's latest AI reply.
    fn list_patient_activity(
        &self,
        therapist_id: &str,
        limit: i64,
    ) -> impl Future<Output = Result<Vec<PatientActivity>, sqlx::Error>> + Send;
}

impl PainelStore for Store {
    async fn count_ai_messages_for_patient(&self, patient_id: &str) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM messages m JOIN sessions s ON s.id = m.session_id \
             WHERE s.patient_id = ?1 AND m.sender = ?2",
        )
        .bind(patient_id)
        .bind(SENDER_IA)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn count_ai_messages_for_patient_since(
        &self,
        patient_id: &str,
        since: DateTime<Utc>,
    ) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM messages m JOIN sessions s ON s.id = m.session_id \
             WHERE s.patient_id = ?1 AND m.sender = ?2 AND m.created_at >= ?3",
        )
        .bind(patient_id)
        .bind(SENDER_IA)
        .bind(since.to_rfc3339())
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn modal_sentiment_for_patient(
        &self,
        patient_id: &str,
    ) -> Result<Option<String>, sqlx::Error> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT m.sentimento FROM messages m JOIN sessions s ON s.id = m.session_id \
             WHERE s.patient_id = ?1 AND m.sender = ?2 AND m.sentimento IS NOT NULL \
             GROUP BY m.sentimento ORDER BY COUNT(*) DESC LIMIT 1",
        )
        .bind(patient_id)
        .bind(SENDER_IA)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(s,)| s))
    }

    async fn count_ai_messages_for_therapist_since(
        &self,
        therapist_id: &str,
        since: DateTime<Utc>,
    ) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM messages m \
             JOIN sessions s ON s.id = m.session_id \
             JOIN patients p ON p.id = s.patient_id \
             WHERE p.therapist_id = ?1 AND m.sender = ?2 AND m.created_at >= ?3",
        )
        .bind(therapist_id)
        .bind(SENDER_IA)
        .bind(since.to_rfc3339())
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn count_urgent_alerts(
        &self,
        therapist_id: &str,
        since: DateTime<Utc>,
    ) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM messages m \
             JOIN sessions s ON s.id = m.session_id \
             JOIN patients p ON p.id = s.patient_id \
             WHERE p.therapist_id = ?1 AND m.sender = ?2 \
               AND m.sentimento = 'Negativo' AND m.intensidade = 'Alta' \
               AND m.created_at >= ?3",
        )
        .bind(therapist_id)
        .bind(SENDER_IA)
        .bind(since.to_rfc3339())
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn list_patient_activity(
        &self,
        therapist_id: &str,
        limit: i64,
    ) -> Result<Vec<PatientActivity>, sqlx::Error> {
        let rows: Vec<(String, String, String, Option<String>, Option<String>)> = sqlx::query_as(
            "SELECT p.id, u.first_name, u.last_name, \
             (SELECT MAX(m.created_at) FROM messages m \
              JOIN sessions s ON s.id = m.session_id \
              WHERE s.patient_id = p.id) AS ultima_conversa, \
             (SELECT m.sentimento FROM messages m \
              JOIN sessions s ON s.id = m.session_id \
              WHERE s.patient_id = p.id AND m.sender = ?2 AND m.sentimento IS NOT NULL \
              ORDER BY m.created_at DESC, m.seq DESC LIMIT 1) \
             FROM patients p JOIN users u ON u.id = p.user_id \
             WHERE p.therapist_id = ?1 \
             ORDER BY ultima_conversa IS NULL, ultima_conversa DESC \
             LIMIT ?3",
        )
        .bind(therapist_id)
        .bind(SENDER_IA)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(
                |(patient_id, first_name, last_name, ultima_conversa, sentimento)| {
                    PatientActivity {
                        patient_id,
                        first_name,
                        last_name,
                        ultima_conversa: parse_ts_opt(ultima_conversa, "messages.created_at"),
                        sentimento,
                    }
                },
            )
            .collect())
    }
}

use crate::entities::{dao::Session, parse_ts, parse_ts_opt, Store};
use chrono::{DateTime, Utc};
use std::future::Future;

const SESSION_COLUMNS: &str =
    "id, patient_id, status, scheduled_at, duracao, observacoes, created_at, updated_at";

type SessionRow = (
    String,
    String,
    String,
    Option<String>,
    Option<i64>,
    Option<String>,
    String,
    String,
);

type SessionNameRow = (
    String,
    String,
    String,
    Option<String>,
    Option<i64>,
    Option<String>,
    String,
    String,
    String,
);

fn session_from_row(row: SessionRow) -> Session {
    let (id, patient_id, status, scheduled_at, duracao, observacoes, created_at, updated_at) = row;
    Session {
        id,
        patient_id,
        status,
        scheduled_at: parse_ts_opt(scheduled_at, "sessions.scheduled_at"),
        duracao,
        observacoes,
        created_at: parse_ts(&created_at, "sessions.created_at"),
        updated_at: parse_ts(&updated_at, "sessions.updated_at"),
    }
}

fn session_name_from_row(row: SessionNameRow) -> (Session, String) {
    let (id, patient_id, status, scheduled_at, duracao, observacoes, created_at, updated_at, nome) =
        row;
    (
        session_from_row((
            id,
            patient_id,
            status,
            scheduled_at,
            duracao,
            observacoes,
            created_at,
            updated_at,
        )),
        nome,
    )
}

pub trait SessionStore: Send + Sync + 'static {
    fn create_session(
        &self,
        session: &Session,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
    fn get_session(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Option<Session>, sqlx::Error>> + Send;
    /// Sessions of one patient, newest first, with the patient's full name.
    fn list_sessions_for_patient(
        &self,
        patient_id: &str,
    ) -> impl Future<Output = Result<Vec<(Session, String)>, sqlx::Error>> + Send;
    /// Sessions across all patients assigned to the therapist, newest
    /// first, with each patient's full name.
    fn list_sessions_for_therapist(
        &self,
        therapist_id: &str,
    ) -> impl Future<Output = Result<Vec<(Session, String)>, sqlx::Error>> + Send;
    /// Persist status, scheduling fields, and notes of `session`.
    fn update_session(
        &self,
        session: &Session,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
    /// Delete the session and its messages in one transaction.
    fn delete_session_cascade(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
    /// Most recently created open session of the patient, if any.
    fn find_open_session(
        &self,
        patient_id: &str,
    ) -> impl Future<Output = Result<Option<Session>, sqlx::Error>> + Send;
    /// Open sessions of the therapist's patients with an appointment date
    /// at or after `now`.
    fn count_pending_sessions(
        &self,
        therapist_id: &str,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<i64, sqlx::Error>> + Send;
    /// Earliest upcoming appointment date among the patient's open
    /// sessions.
    fn next_scheduled_session(
        &self,
        patient_id: &str,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<Option<DateTime<Utc>>, sqlx::Error>> + Send;
}

impl SessionStore for Store {
    async fn create_session(&self, session: &Session) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO sessions (id, patient_id, status, scheduled_at, duracao, observacoes, \
             created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&session.id)
        .bind(&session.patient_id)
        .bind(&session.status)
        .bind(session.scheduled_at.map(|t| t.to_rfc3339()))
        .bind(session.duracao)
        .bind(&session.observacoes)
        .bind(session.created_at.to_rfc3339())
        .bind(session.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_session(&self, id: &str) -> Result<Option<Session>, sqlx::Error> {
        let row: Option<SessionRow> = sqlx::query_as(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(session_from_row))
    }

    async fn list_sessions_for_patient(
        &self,
        patient_id: &str,
    ) -> Result<Vec<(Session, String)>, sqlx::Error> {
        let rows: Vec<SessionNameRow> = sqlx::query_as(
            "SELECT s.id, s.patient_id, s.status, s.scheduled_at, s.duracao, s.observacoes, \
             s.created_at, s.updated_at, u.first_name || ' ' || u.last_name \
             FROM sessions s \
             JOIN patients p ON p.id = s.patient_id \
             JOIN users u ON u.id = p.user_id \
             WHERE s.patient_id = ?1 ORDER BY s.created_at DESC",
        )
        .bind(patient_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(session_name_from_row).collect())
    }

    async fn list_sessions_for_therapist(
        &self,
        therapist_id: &str,
    ) -> Result<Vec<(Session, String)>, sqlx::Error> {
        let rows: Vec<SessionNameRow> = sqlx::query_as(
            "SELECT s.id, s.patient_id, s.status, s.scheduled_at, s.duracao, s.observacoes, \
             s.created_at, s.updated_at, u.first_name || ' ' || u.last_name \
             FROM sessions s \
             JOIN patients p ON p.id = s.patient_id \
             JOIN users u ON u.id = p.user_id \
             WHERE p.therapist_id = ?1 ORDER BY s.created_at DESC",
        )
        .bind(therapist_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(session_name_from_row).collect())
    }

    async fn update_session(&self, session: &Session) -> Result<(), sqlx::Error> {
        let updated_at = chrono::Utc::now().to_rfc3339();
        sqlx::query(
            "UPDATE sessions SET status = ?1, scheduled_at = ?2, duracao = ?3, \
             observacoes = ?4, updated_at = ?5 WHERE id = ?6",
        )
        .bind(&session.status)
        .bind(session.scheduled_at.map(|t| t.to_rfc3339()))
        .bind(session.duracao)
        .bind(&session.observacoes)
        .bind(&updated_at)
        .bind(&session.id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_session_cascade(&self, id: &str) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM messages WHERE session_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM sessions WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn find_open_session(&self, patient_id: &str) -> Result<Option<Session>, sqlx::Error> {
        let row: Option<SessionRow> = sqlx::query_as(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions \
             WHERE patient_id = ?1 AND status = 'aberta' \
             ORDER BY created_at DESC LIMIT 1"
        ))
        .bind(patient_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(session_from_row))
    }

    async fn count_pending_sessions(
        &self,
        therapist_id: &str,
        now: DateTime<Utc>,
    ) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sessions s \
             JOIN patients p ON p.id = s.patient_id \
             WHERE p.therapist_id = ?1 AND s.status = 'aberta' \
               AND s.scheduled_at IS NOT NULL AND s.scheduled_at >= ?2",
        )
        .bind(therapist_id)
        .bind(now.to_rfc3339())
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn next_scheduled_session(
        &self,
        patient_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, sqlx::Error> {
        let row: Option<(Option<String>,)> = sqlx::query_as(
            "SELECT MIN(scheduled_at) FROM sessions \
             WHERE patient_id = ?1 AND status = 'aberta' \
               AND scheduled_at IS NOT NULL AND scheduled_at >= ?2",
        )
        .bind(patient_id)
        .bind(now.to_rfc3339())
        .fetch_optional(&self.pool)
        .await?;
        Ok(parse_ts_opt(
            row.and_then(|(min,)| min),
            "sessions.scheduled_at",
        ))
    }
}

use crate::entities::{
    dao::{Message, NewMessage},
    parse_ts, Store,
};
use std::future::Future;
use uuid::Uuid;

const MESSAGE_COLUMNS: &str =
    "id, session_id, seq, sender, texto, sentimento, categoria, intensidade, created_at";

type MessageRow = (
    String,
    String,
    i64,
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    String,
);

fn message_from_row(row: MessageRow) -> Message {
    let (id, session_id, seq, sender, texto, sentimento, categoria, intensidade, created_at) = row;
    Message {
        id,
        session_id,
        seq,
        sender,
        texto,
        sentimento,
        categoria,
        intensidade,
        created_at: parse_ts(&created_at, "messages.created_at"),
    }
}

pub trait MessageStore: Send + Sync + 'static {
    /// Insert `new` with the next per-session sequence number and return
    /// the stored row.
    ///
    /// The sequence is assigned inside the INSERT itself
    /// (`COALESCE(MAX(seq), 0) + 1`), so two writers can never read the
    /// same maximum; the `UNIQUE(session_id, seq)` index backstops it.
    fn append_message(
        &self,
        new: &NewMessage,
    ) -> impl Future<Output = Result<Message, sqlx::Error>> + Send;
    /// Messages of a session with `seq > after_seq`, ascending, at most
    /// `limit` rows.
    fn list_messages(
        &self,
        session_id: &str,
        after_seq: i64,
        limit: i64,
    ) -> impl Future<Output = Result<Vec<Message>, sqlx::Error>> + Send;
    fn get_message(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Option<Message>, sqlx::Error>> + Send;
    fn get_message_at(
        &self,
        session_id: &str,
        seq: i64,
    ) -> impl Future<Output = Result<Option<Message>, sqlx::Error>> + Send;
    /// Highest assigned sequence number in the session, 0 when empty.
    fn max_seq(&self, session_id: &str) -> impl Future<Output = Result<i64, sqlx::Error>> + Send;
    /// Every message across all of the patient's sessions, oldest first.
    fn list_messages_for_patient(
        &self,
        patient_id: &str,
    ) -> impl Future<Output = Result<Vec<Message>, sqlx::Error>> + Send;
}

impl MessageStore for Store {
    async fn append_message(&self, new: &NewMessage) -> Result<Message, sqlx::Error> {
        let id = Uuid::new_v4().to_string();
        let created_at = chrono::Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO messages (id, session_id, seq, sender, texto, sentimento, categoria, \
             intensidade, created_at) \
             SELECT ?1, ?2, COALESCE(MAX(seq), 0) + 1, ?3, ?4, ?5, ?6, ?7, ?8 \
             FROM messages WHERE session_id = ?2",
        )
        .bind(&id)
        .bind(&new.session_id)
        .bind(&new.sender)
        .bind(&new.texto)
        .bind(&new.sentimento)
        .bind(&new.categoria)
        .bind(&new.intensidade)
        .bind(&created_at)
        .execute(&self.pool)
        .await?;
        let row: MessageRow =
            sqlx::query_as(&format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1"))
                .bind(&id)
                .fetch_one(&self.pool)
                .await?;
        Ok(message_from_row(row))
    }

    async fn list_messages(
        &self,
        session_id: &str,
        after_seq: i64,
        limit: i64,
    ) -> Result<Vec<Message>, sqlx::Error> {
        let rows: Vec<MessageRow> = sqlx::query_as(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages \
             WHERE session_id = ?1 AND seq > ?2 ORDER BY seq ASC LIMIT ?3"
        ))
        .bind(session_id)
        .bind(after_seq)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(message_from_row).collect())
    }

    async fn get_message(&self, id: &str) -> Result<Option<Message>, sqlx::Error> {
        let row: Option<MessageRow> =
            sqlx::query_as(&format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(message_from_row))
    }

    async fn get_message_at(
        &self,
        session_id: &str,
        seq: i64,
    ) -> Result<Option<Message>, sqlx::Error> {
        let row: Option<MessageRow> = sqlx::query_as(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE session_id = ?1 AND seq = ?2"
        ))
        .bind(session_id)
        .bind(seq)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(message_from_row))
    }

    async fn max_seq(&self, session_id: &str) -> Result<i64, sqlx::Error> {
        let (max,): (i64,) =
            sqlx::query_as("SELECT COALESCE(MAX(seq), 0) FROM messages WHERE session_id = ?1")
                .bind(session_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(max)
    }

    async fn list_messages_for_patient(
        &self,
        patient_id: &str,
    ) -> Result<Vec<Message>, sqlx::Error> {
        let rows: Vec<MessageRow> = sqlx::query_as(
            "SELECT m.id, m.session_id, m.seq, m.sender, m.texto, m.sentimento, m.categoria, \
             m.intensidade, m.created_at \
             FROM messages m JOIN sessions s ON s.id = m.session_id \
             WHERE s.patient_id = ?1 ORDER BY m.created_at ASC, m.seq ASC",
        )
        .bind(patient_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(message_from_row).collect())
    }
}

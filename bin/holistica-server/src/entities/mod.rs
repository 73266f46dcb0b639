//! Database abstraction layer.
//!
//! Each entity gets a narrow store trait (one file per entity) and the
//! single [`Store`] type implements all of them on top of a SQLite pool.
//! Handlers depend on the traits, so swapping the backing database means
//! implementing the traits for a new type and changing the concrete type
//! in [`crate::state::AppState`].
//!
//! All trait methods use `impl Future` in their signatures (stable since
//! Rust 1.75) so no extra `async-trait` crate is required.
//!
//! # Queries
//!
//! The `sqlx::query` (runtime-verified) form is used deliberately so that
//! no `DATABASE_URL` environment variable is needed at compile time.
//! Timestamps are stored as RFC 3339 TEXT and parsed back with a
//! warn-and-fallback so one bad row never poisons a listing.

pub mod dao;
pub mod message;
pub mod notification;
pub mod painel;
pub mod patient;
pub mod report;
pub mod session;
pub mod therapist;
pub mod token;
pub mod user;

pub use dao::{
    AuthToken, Message, NewMessage, Notification, Patient, PatientActivity, PatientProfile,
    Report, Session, Therapist, User, ROLE_PACIENTE, ROLE_TERAPEUTA, SENDER_IA, SENDER_PACIENTE,
    STATUS_ABERTA, STATUS_ENCERRADA,
};

pub use message::MessageStore;
pub use notification::NotificationStore;
pub use painel::PainelStore;
pub use patient::PatientStore;
pub use report::ReportStore;
pub use session::SessionStore;
pub use therapist::TherapistStore;
pub use token::TokenStore;
pub use user::UserStore;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;

/// SQLite-backed store implementing every entity trait.
#[derive(Clone, Debug)]
pub struct Store {
    pool: sqlx::SqlitePool,
}

impl Store {
    /// Open (or create) the SQLite database at `url` and run pending
    /// migrations.
    ///
    /// `url` should be a sqlx-compatible SQLite URL, e.g.
    /// `"sqlite://holistica.db"` or `"sqlite::memory:"` for tests.
    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);
        // An in-memory database exists per connection, so the pool must
        // not open a second one.
        let max_connections = if url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        // Path is resolved relative to CARGO_MANIFEST_DIR at compile time.
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    /// Liveness probe: one round-trip through the pool.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Parse an RFC 3339 TEXT column, warning and substituting `now` on
/// malformed data.
pub(crate) fn parse_ts(raw: &str, column: &'static str) -> DateTime<Utc> {
    raw.parse().unwrap_or_else(|e: chrono::ParseError| {
        tracing::warn!(raw = %raw, column, error = %e, "failed to parse stored timestamp; using now");
        Utc::now()
    })
}

/// Parse a nullable RFC 3339 TEXT column; malformed data becomes `None`.
pub(crate) fn parse_ts_opt(raw: Option<String>, column: &'static str) -> Option<DateTime<Utc>> {
    let raw = raw?;
    match raw.parse() {
        Ok(ts) => Some(ts),
        Err(e) => {
            tracing::warn!(raw = %raw, column, error = %e, "failed to parse stored timestamp; dropping");
            None
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;
    use uuid::Uuid;

    async fn store() -> Store {
        Store::connect("sqlite::memory:").await.expect("connect in-memory store")
    }

    fn make_user(email: &str, role: &str) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4().to_string(),
            email: email.to_owned(),
            password_hash: "$argon2id$test".to_owned(),
            first_name: "Ana".to_owned(),
            last_name: "Silva".to_owned(),
            role: role.to_owned(),
            telefone: None,
            data_nascimento: None,
            endereco: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn make_patient(user_id: &str, therapist_id: Option<&str>) -> Patient {
        Patient {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_owned(),
            therapist_id: therapist_id.map(str::to_owned),
            created_at: Utc::now(),
        }
    }

    fn make_session(patient_id: &str) -> Session {
        let now = Utc::now();
        Session {
            id: Uuid::new_v4().to_string(),
            patient_id: patient_id.to_owned(),
            status: STATUS_ABERTA.to_owned(),
            scheduled_at: None,
            duracao: None,
            observacoes: None,
            created_at: now,
            updated_at: now,
        }
    }

    async fn count(store: &Store, table: &str) -> i64 {
        let (n,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&store.pool)
            .await
            .expect("count query");
        n
    }

    #[test]
    fn parse_ts_falls_back_on_garbage() {
        let before = Utc::now();
        let parsed = parse_ts("not-a-timestamp", "test.column");
        assert!(parsed >= before);
        assert_eq!(parse_ts_opt(Some("garbage".into()), "test.column"), None);
        assert_eq!(parse_ts_opt(None, "test.column"), None);
    }

    #[tokio::test]
    async fn append_message_assigns_gapless_seq() {
        let store = store().await;
        let user = make_user("p@example.com", ROLE_PACIENTE);
        let patient = make_patient(&user.id, None);
        store.register_patient(&user, &patient).await.unwrap();
        let session = make_session(&patient.id);
        store.create_session(&session).await.unwrap();

        for i in 1..=3 {
            let msg = store
                .append_message(&NewMessage::from_patient(&session.id, &format!("msg {i}")))
                .await
                .unwrap();
            assert_eq!(msg.seq, i);
        }
        assert_eq!(store.max_seq(&session.id).await.unwrap(), 3);

        let all = store.list_messages(&session.id, 0, 100).await.unwrap();
        let seqs: Vec<i64> = all.iter().map(|m| m.seq).collect();
        assert_eq!(seqs, vec![1, 2, 3]);

        let tail = store.list_messages(&session.id, 1, 100).await.unwrap();
        assert_eq!(tail.first().map(|m| m.seq), Some(2));
    }

    #[tokio::test]
    async fn duplicate_email_is_a_unique_violation() {
        let store = store().await;
        let user = make_user("dup@example.com", ROLE_PACIENTE);
        let patient = make_patient(&user.id, None);
        store.register_patient(&user, &patient).await.unwrap();

        let mut again = make_user("dup@example.com", ROLE_PACIENTE);
        again.id = Uuid::new_v4().to_string();
        let patient2 = make_patient(&again.id, None);
        let err = store.register_patient(&again, &patient2).await.unwrap_err();
        match err {
            sqlx::Error::Database(db) => assert!(db.is_unique_violation()),
            other => panic!("expected unique violation, got {other:?}"),
        }
        // The failed transaction must not leave a dangling patient row.
        assert_eq!(count(&store, "patients").await, 1);
    }

    #[tokio::test]
    async fn delete_patient_cascade_leaves_no_orphans() {
        let store = store().await;
        let t_user = make_user("t@example.com", ROLE_TERAPEUTA);
        let therapist = Therapist {
            id: Uuid::new_v4().to_string(),
            user_id: t_user.id.clone(),
            especialidade: "TCC".to_owned(),
            crp: "06/12345".to_owned(),
            created_at: Utc::now(),
        };
        store.register_therapist(&t_user, &therapist).await.unwrap();

        let p_user = make_user("p@example.com", ROLE_PACIENTE);
        let patient = make_patient(&p_user.id, Some(&therapist.id));
        store.register_patient(&p_user, &patient).await.unwrap();

        let session = make_session(&patient.id);
        store.create_session(&session).await.unwrap();
        store
            .append_message(&NewMessage::from_patient(&session.id, "olá"))
            .await
            .unwrap();
        let now = Utc::now();
        store
            .create_report(&Report {
                id: Uuid::new_v4().to_string(),
                therapist_id: therapist.id.clone(),
                patient_id: patient.id.clone(),
                titulo: "Avaliação".to_owned(),
                conteudo: "Primeira sessão".to_owned(),
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
        store
            .create_notification(&Notification {
                id: Uuid::new_v4().to_string(),
                user_id: p_user.id.clone(),
                assunto: "Bem-vindo".to_owned(),
                conteudo: "Olá".to_owned(),
                lida: false,
                created_at: now,
            })
            .await
            .unwrap();
        store
            .insert_token(&AuthToken {
                id: Uuid::new_v4().to_string(),
                user_id: p_user.id.clone(),
                token_hash: "deadbeef".to_owned(),
                created_at: now,
                expires_at: now + chrono::Duration::hours(1),
            })
            .await
            .unwrap();

        store
            .delete_patient_cascade(&patient.id, &p_user.id)
            .await
            .unwrap();

        assert_eq!(count(&store, "messages").await, 0);
        assert_eq!(count(&store, "sessions").await, 0);
        assert_eq!(count(&store, "reports").await, 0);
        assert_eq!(count(&store, "notifications").await, 0);
        assert_eq!(count(&store, "auth_tokens").await, 0);
        assert_eq!(count(&store, "patients").await, 0);
        // Only the therapist account remains.
        assert_eq!(count(&store, "users").await, 1);
    }

    #[tokio::test]
    async fn patient_search_treats_wildcards_literally() {
        let store = store().await;
        let t_user = make_user("t@example.com", ROLE_TERAPEUTA);
        let therapist = Therapist {
            id: Uuid::new_v4().to_string(),
            user_id: t_user.id.clone(),
            especialidade: "TCC".to_owned(),
            crp: "06/12345".to_owned(),
            created_at: Utc::now(),
        };
        store.register_therapist(&t_user, &therapist).await.unwrap();

        let u1 = make_user("primeira@example.com", ROLE_PACIENTE);
        store
            .register_patient(&u1, &make_patient(&u1.id, Some(&therapist.id)))
            .await
            .unwrap();
        let mut u2 = make_user("segunda@example.com", ROLE_PACIENTE);
        u2.last_name = "Silva_Prado".to_owned();
        store
            .register_patient(&u2, &make_patient(&u2.id, Some(&therapist.id)))
            .await
            .unwrap();

        let hits = store.search_patient_profiles(&therapist.id, "Ana").await.unwrap();
        assert_eq!(hits.len(), 2, "plain substring search matches both");

        let hits = store.search_patient_profiles(&therapist.id, "%").await.unwrap();
        assert!(hits.is_empty(), "a bare wildcard must not match every patient");

        let hits = store.search_patient_profiles(&therapist.id, "_").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].last_name, "Silva_Prado");
    }

    #[tokio::test]
    async fn expired_tokens_are_swept() {
        let store = store().await;
        let user = make_user("p@example.com", ROLE_PACIENTE);
        let patient = make_patient(&user.id, None);
        store.register_patient(&user, &patient).await.unwrap();

        let now = Utc::now();
        store
            .insert_token(&AuthToken {
                id: Uuid::new_v4().to_string(),
                user_id: user.id.clone(),
                token_hash: "old".to_owned(),
                created_at: now - chrono::Duration::hours(2),
                expires_at: now - chrono::Duration::hours(1),
            })
            .await
            .unwrap();
        store
            .insert_token(&AuthToken {
                id: Uuid::new_v4().to_string(),
                user_id: user.id.clone(),
                token_hash: "fresh".to_owned(),
                created_at: now,
                expires_at: now + chrono::Duration::hours(1),
            })
            .await
            .unwrap();

        let swept = store.delete_expired_tokens(now).await.unwrap();
        assert_eq!(swept, 1);
        assert!(store.find_token_by_hash("old").await.unwrap().is_none());
        assert!(store.find_token_by_hash("fresh").await.unwrap().is_some());
    }
}

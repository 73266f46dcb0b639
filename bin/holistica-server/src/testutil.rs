//! Shared helpers for in-crate tests: in-memory state and fixture accounts.

use std::sync::Arc;

use chrono::Utc;
use holistica_responder::{MockResponder, Responder};
use uuid::Uuid;

use crate::auth::hash_password;
use crate::config::Config;
use crate::entities::{
    dao::{Patient, Session, Therapist, User},
    PatientStore, SessionStore, Store, TherapistStore, ROLE_PACIENTE, ROLE_TERAPEUTA,
    STATUS_ABERTA,
};
use crate::state::{AppState, SessionLocks};

/// Password used by every fixture account.
pub const TEST_PASSWORD: &str = "senha-teste-123";

pub fn test_config() -> Config {
    Config {
        bind_address: "127.0.0.1:0".to_owned(),
        database_url: "sqlite::memory:".to_owned(),
        log_level: "warn".to_owned(),
        log_json: false,
        enable_swagger: false,
        cors_allowed_origins: None,
        ai_api_url: String::new(),
        ai_api_key: String::new(),
        ai_model: "test".to_owned(),
        ai_timeout_secs: 5,
        ai_use_mock: true,
        token_ttl_hours: 1,
    }
}

/// Fresh state over an in-memory database and the fast mock responder.
pub async fn test_state() -> Arc<AppState> {
    test_state_with(Arc::new(MockResponder::with_delay(1))).await
}

pub async fn test_state_with(responder: Arc<dyn Responder>) -> Arc<AppState> {
    let store = Store::connect("sqlite::memory:")
        .await
        .expect("connect in-memory store");
    Arc::new(AppState {
        config: Arc::new(test_config()),
        store: Arc::new(store),
        responder,
        session_locks: Arc::new(SessionLocks::new()),
    })
}

/// Same store and locks as `state`, different responder.
pub fn with_responder(state: &AppState, responder: Arc<dyn Responder>) -> Arc<AppState> {
    Arc::new(AppState {
        config: state.config.clone(),
        store: state.store.clone(),
        responder,
        session_locks: state.session_locks.clone(),
    })
}

pub async fn register_test_patient(
    state: &AppState,
    email: &str,
    therapist_id: Option<&str>,
) -> (User, Patient) {
    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4().to_string(),
        email: email.to_owned(),
        password_hash: hash_password(TEST_PASSWORD).expect("hash fixture password"),
        first_name: "Ana".to_owned(),
        last_name: "Souza".to_owned(),
        role: ROLE_PACIENTE.to_owned(),
        telefone: None,
        data_nascimento: None,
        endereco: None,
        created_at: now,
        updated_at: now,
    };
    let patient = Patient {
        id: Uuid::new_v4().to_string(),
        user_id: user.id.clone(),
        therapist_id: therapist_id.map(str::to_owned),
        created_at: now,
    };
    state
        .store
        .register_patient(&user, &patient)
        .await
        .expect("register fixture patient");
    (user, patient)
}

pub async fn register_test_therapist(state: &AppState, email: &str) -> (User, Therapist) {
    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4().to_string(),
        email: email.to_owned(),
        password_hash: hash_password(TEST_PASSWORD).expect("hash fixture password"),
        first_name: "Carla".to_owned(),
        last_name: "Lima".to_owned(),
        role: ROLE_TERAPEUTA.to_owned(),
        telefone: None,
        data_nascimento: None,
        endereco: None,
        created_at: now,
        updated_at: now,
    };
    let therapist = Therapist {
        id: Uuid::new_v4().to_string(),
        user_id: user.id.clone(),
        especialidade: "Terapia Cognitivo-Comportamental".to_owned(),
        // Unique per fixture; the column has a UNIQUE constraint.
        crp: format!("06/{}", &user.id[..8]),
        created_at: now,
    };
    state
        .store
        .register_therapist(&user, &therapist)
        .await
        .expect("register fixture therapist");
    (user, therapist)
}

pub async fn create_test_session(state: &AppState, patient_id: &str) -> Session {
    let now = Utc::now();
    let session = Session {
        id: Uuid::new_v4().to_string(),
        patient_id: patient_id.to_owned(),
        status: STATUS_ABERTA.to_owned(),
        scheduled_at: None,
        duracao: None,
        observacoes: None,
        created_at: now,
        updated_at: now,
    };
    state
        .store
        .create_session(&session)
        .await
        .expect("create fixture session");
    session
}

//! Routes nested under `/api/usuarios`: accounts, profiles, patients,
//! sessions, messages, reports and notifications.
//!
//! Everything except login and registration sits behind the bearer-token
//! middleware, which resolves the caller into an [`AuthIdentity`]
//! request extension.
//!
//! [`AuthIdentity`]: crate::auth::AuthIdentity

pub mod auth;
pub mod mensagens;
pub mod notificacoes;
pub mod pacientes;
pub mod perfil;
pub mod relatorios;
pub mod sessoes;

use crate::middleware::auth::auth_middleware;
use crate::state::AppState;

use axum::{
    middleware::{self},
    Router,
};
use std::sync::Arc;
use utoipa::OpenApi;

pub fn router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let protected = Router::new()
        .merge(auth::protected_router())
        .merge(perfil::router())
        .merge(pacientes::router())
        .merge(sessoes::router())
        .merge(mensagens::router())
        .merge(relatorios::router())
        .merge(notificacoes::router())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    auth::router().merge(protected).with_state(state.clone())
}

#[derive(OpenApi)]
#[openapi()]
pub struct UsuariosApi;

pub fn api_docs() -> utoipa::openapi::OpenApi {
    let mut spec = UsuariosApi::openapi();
    spec.merge(auth::AuthApi::openapi());
    spec.merge(perfil::PerfilApi::openapi());
    spec.merge(pacientes::PacientesApi::openapi());
    spec.merge(sessoes::SessoesApi::openapi());
    spec.merge(mensagens::MensagensApi::openapi());
    spec.merge(relatorios::RelatoriosApi::openapi());
    spec.merge(notificacoes::NotificacoesApi::openapi());

    spec
}

//! Routes nested under `/api/ia`: the AI responder, conversation history
//! and the two dashboards. All of them require a bearer token.

pub mod historico;
pub mod painel;
pub mod responder;

use crate::middleware::auth::auth_middleware;
use crate::state::AppState;

use axum::{
    middleware::{self},
    Router,
};
use std::sync::Arc;
use utoipa::OpenApi;

pub fn router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .merge(responder::router())
        .merge(historico::router())
        .merge(painel::router())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state.clone())
}

#[derive(OpenApi)]
#[openapi()]
pub struct IaApi;

pub fn api_docs() -> utoipa::openapi::OpenApi {
    let mut spec = IaApi::openapi();
    spec.merge(responder::ResponderApi::openapi());
    spec.merge(historico::HistoricoApi::openapi());
    spec.merge(painel::PainelApi::openapi());

    spec
}

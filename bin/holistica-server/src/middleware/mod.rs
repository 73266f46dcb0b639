//! HTTP middleware stack: request tracing, CORS, and bearer-token auth.

pub mod auth;
pub mod cors;
pub mod trace;

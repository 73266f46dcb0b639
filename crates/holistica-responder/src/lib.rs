//! AI responder client for the Holistica backend.
//!
//! Wraps the external text-generation service behind the [`Responder`]
//! trait so the HTTP server never talks to the upstream API directly.
//! Two implementations are provided:
//!
//! - [`OpenAiResponder`]: any OpenAI-compatible chat-completions endpoint
//!   (OpenAI, Azure OpenAI, local Ollama).
//! - [`MockResponder`]: deterministic canned replies for development and
//!   tests, no network access.
//!
//! The upstream call is an opaque synchronous request with a bounded
//! timeout; callers decide how failures map to their own error types.

mod error;
mod mock;
mod openai;
mod reply;

pub use error::ResponderError;
pub use mock::MockResponder;
pub use openai::OpenAiResponder;
pub use reply::{AiReply, Intensidade, Sentimento};

/// One prior conversation turn, passed to the responder as context.
#[derive(Debug, Clone)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
}

/// Who produced a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    Patient,
    Ai,
}

/// Produces an AI reply for a patient message given the session history.
///
/// Object-safe so the server can hold `Arc<dyn Responder>` and swap the
/// real client for a mock via configuration.
#[async_trait::async_trait]
pub trait Responder: Send + Sync + 'static {
    /// Generate a reply to `patient_text`.
    ///
    /// `history` contains the session's prior turns, oldest first. The
    /// current patient message is passed separately and must not be
    /// duplicated into `history` by the caller.
    async fn respond(&self, history: &[Turn], patient_text: &str)
    -> Result<AiReply, ResponderError>;
}

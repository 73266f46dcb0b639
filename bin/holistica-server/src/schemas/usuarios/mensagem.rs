use crate::entities::Message;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MensagemResponse {
    pub id: String,
    pub sessao_id: String,
    /// Position in the session, gapless from 1.
    pub seq: i64,
    /// `"paciente"` or `"ia"`.
    pub remetente: String,
    pub texto: String,
    pub sentimento: Option<String>,
    pub categoria: Option<String>,
    pub intensidade: Option<String>,
    pub criado_em: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateMensagemRequest {
    pub sessao_id: String,
    #[validate(length(min = 1, message = "texto é obrigatório"))]
    pub texto: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct MensagensQuery {
    /// Session to read; required.
    pub sessao_id: Option<String>,
    /// Return messages with `seq` greater than this (default 0).
    pub after: Option<i64>,
    /// Page size, clamped to 1..=500 (default 100).
    pub limit: Option<i64>,
}

impl Message {
    pub fn to_response(&self) -> MensagemResponse {
        MensagemResponse {
            id: self.id.clone(),
            sessao_id: self.session_id.clone(),
            seq: self.seq,
            remetente: self.sender.clone(),
            texto: self.texto.clone(),
            sentimento: self.sentimento.clone(),
            categoria: self.categoria.clone(),
            intensidade: self.intensidade.clone(),
            criado_em: self.created_at.to_rfc3339(),
        }
    }
}

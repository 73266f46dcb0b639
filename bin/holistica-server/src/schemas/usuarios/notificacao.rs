use crate::entities::Notification;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct NotificacaoResponse {
    pub id: String,
    pub assunto: String,
    pub conteudo: String,
    pub lida: bool,
    pub data_criacao: String,
}

/// Read-state toggle; `PATCH {"lida": true}` marks as read.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateNotificacaoRequest {
    pub lida: bool,
}

impl Notification {
    pub fn to_response(&self) -> NotificacaoResponse {
        NotificacaoResponse {
            id: self.id.clone(),
            assunto: self.assunto.clone(),
            conteudo: self.conteudo.clone(),
            lida: self.lida,
            data_criacao: self.created_at.to_rfc3339(),
        }
    }
}

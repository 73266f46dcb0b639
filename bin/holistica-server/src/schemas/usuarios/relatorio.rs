use crate::entities::Report;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RelatorioResponse {
    pub id: String,
    pub titulo: String,
    pub conteudo: String,
    pub paciente_id: String,
    pub paciente_nome: String,
    pub data_criacao: String,
    pub atualizado_em: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateRelatorioRequest {
    #[validate(length(min = 1, message = "título é obrigatório"))]
    pub titulo: String,
    pub paciente_id: String,
    #[validate(length(min = 1, message = "conteúdo é obrigatório"))]
    pub conteudo: String,
}

/// Partial update; absent fields keep their current value.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateRelatorioRequest {
    #[validate(length(min = 1, message = "título é obrigatório"))]
    pub titulo: Option<String>,
    #[validate(length(min = 1, message = "conteúdo é obrigatório"))]
    pub conteudo: Option<String>,
}

impl Report {
    pub fn to_response(&self, paciente_nome: &str) -> RelatorioResponse {
        RelatorioResponse {
            id: self.id.clone(),
            titulo: self.titulo.clone(),
            conteudo: self.conteudo.clone(),
            paciente_id: self.patient_id.clone(),
            paciente_nome: paciente_nome.to_owned(),
            data_criacao: self.created_at.to_rfc3339(),
            atualizado_em: self.updated_at.to_rfc3339(),
        }
    }
}

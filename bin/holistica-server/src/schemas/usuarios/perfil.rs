use crate::entities::{Therapist, User};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PerfilResponse {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub tipo: String,
    pub telefone: Option<String>,
    pub data_nascimento: Option<String>,
    pub endereco: Option<String>,
    /// Present only for therapist accounts.
    pub especialidade: Option<String>,
    /// Present only for therapist accounts.
    pub crp: Option<String>,
    pub criado_em: String,
}

/// Profile update; therapists may also adjust `especialidade` and `crp`.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdatePerfilRequest {
    #[validate(length(min = 1, message = "nome é obrigatório"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "sobrenome é obrigatório"))]
    pub last_name: String,
    #[validate(email(message = "email inválido"))]
    pub email: String,
    pub telefone: Option<String>,
    pub data_nascimento: Option<String>,
    pub endereco: Option<String>,
    pub especialidade: Option<String>,
    pub crp: Option<String>,
}

impl User {
    pub fn to_perfil_response(&self, therapist: Option<&Therapist>) -> PerfilResponse {
        PerfilResponse {
            id: self.id.clone(),
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            tipo: self.role.clone(),
            telefone: self.telefone.clone(),
            data_nascimento: self.data_nascimento.clone(),
            endereco: self.endereco.clone(),
            especialidade: therapist.map(|t| t.especialidade.clone()),
            crp: therapist.map(|t| t.crp.clone()),
            criado_em: self.created_at.to_rfc3339(),
        }
    }
}

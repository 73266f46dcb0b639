use crate::entities::User;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "email inválido"))]
    pub email: String,
    #[validate(length(min = 1, message = "senha é obrigatória"))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// `"paciente"` or `"terapeuta"`; the frontend routes on this.
    pub tipo: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    /// Opaque bearer token; shown to the client exactly once.
    pub token: String,
    pub user: UserResponse,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CadastroPacienteRequest {
    #[validate(length(min = 1, message = "nome é obrigatório"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "sobrenome é obrigatório"))]
    pub last_name: String,
    #[validate(email(message = "email inválido"))]
    pub email: String,
    #[validate(length(min = 6, message = "a senha deve ter pelo menos 6 caracteres"))]
    pub password: String,
    pub telefone: Option<String>,
    /// `YYYY-MM-DD`.
    pub data_nascimento: Option<String>,
    pub endereco: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CadastroTerapeutaRequest {
    #[validate(length(min = 1, message = "nome é obrigatório"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "sobrenome é obrigatório"))]
    pub last_name: String,
    #[validate(email(message = "email inválido"))]
    pub email: String,
    #[validate(length(min = 6, message = "a senha deve ter pelo menos 6 caracteres"))]
    pub password: String,
    #[validate(length(min = 1, message = "especialidade é obrigatória"))]
    pub especialidade: String,
    #[validate(length(min = 1, message = "CRP é obrigatório"))]
    pub crp: String,
    pub telefone: Option<String>,
    pub data_nascimento: Option<String>,
    pub endereco: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "senha atual é obrigatória"))]
    pub old_password: String,
    #[validate(length(min = 6, message = "a nova senha deve ter pelo menos 6 caracteres"))]
    pub new_password: String,
}

impl User {
    pub fn to_response(&self) -> UserResponse {
        UserResponse {
            id: self.id.clone(),
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            tipo: self.role.clone(),
        }
    }
}

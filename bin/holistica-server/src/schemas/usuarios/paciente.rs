use crate::entities::{PatientProfile, Therapist, User};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PacienteResponse {
    pub id: String,
    pub usuario_id: String,
    pub nome_completo: String,
    pub email: String,
    pub telefone: Option<String>,
    pub data_nascimento: Option<String>,
    pub endereco: Option<String>,
    pub terapeuta_id: Option<String>,
    pub criado_em: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct BuscarPacientesQuery {
    /// Matches against first name, last name and email; empty returns
    /// every assigned patient.
    pub search: Option<String>,
}

/// Trimmed shape returned by the patient search endpoint.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BuscarPacienteResponse {
    pub id: String,
    pub usuario_id: String,
    pub nome_completo: String,
    pub email: String,
}

/// Partial update of a patient's account data; absent fields keep their
/// current value.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdatePacienteRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[validate(email(message = "email inválido"))]
    pub email: Option<String>,
    pub telefone: Option<String>,
    pub data_nascimento: Option<String>,
    pub endereco: Option<String>,
}

/// The assigned therapist, as shown on the patient's profile page.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TerapeutaResponse {
    pub id: String,
    pub usuario_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub especialidade: String,
    pub crp: String,
    pub telefone: Option<String>,
    pub endereco: Option<String>,
}

impl PatientProfile {
    pub fn to_response(&self) -> PacienteResponse {
        PacienteResponse {
            id: self.id.clone(),
            usuario_id: self.user_id.clone(),
            nome_completo: self.nome_completo(),
            email: self.email.clone(),
            telefone: self.telefone.clone(),
            data_nascimento: self.data_nascimento.clone(),
            endereco: self.endereco.clone(),
            terapeuta_id: self.therapist_id.clone(),
            criado_em: self.created_at.to_rfc3339(),
        }
    }

    pub fn to_buscar_response(&self) -> BuscarPacienteResponse {
        BuscarPacienteResponse {
            id: self.id.clone(),
            usuario_id: self.user_id.clone(),
            nome_completo: self.nome_completo(),
            email: self.email.clone(),
        }
    }
}

impl Therapist {
    pub fn to_response(&self, user: &User) -> TerapeutaResponse {
        TerapeutaResponse {
            id: self.id.clone(),
            usuario_id: self.user_id.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            especialidade: self.especialidade.clone(),
            crp: self.crp.clone(),
            telefone: user.telefone.clone(),
            endereco: user.endereco.clone(),
        }
    }
}

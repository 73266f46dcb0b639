use crate::entities::Session;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessaoResponse {
    pub id: String,
    pub paciente_id: String,
    pub paciente_nome: String,
    /// `"aberta"` or `"encerrada"`.
    pub status: String,
    /// Appointment date (RFC 3339), for scheduled sessions.
    pub data: Option<String>,
    /// Planned duration in minutes.
    pub duracao: Option<i64>,
    pub observacoes: Option<String>,
    pub criado_em: String,
    pub atualizado_em: String,
}

/// Session creation.
///
/// Therapists must name the patient (`paciente_id`); patients always
/// create sessions for themselves and the field is ignored.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateSessaoRequest {
    pub paciente_id: Option<String>,
    /// Appointment date, RFC 3339.
    pub data: Option<String>,
    #[validate(range(min = 1, max = 480, message = "duração deve estar entre 1 e 480 minutos"))]
    pub duracao: Option<i64>,
    pub observacoes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateSessaoRequest {
    /// `"aberta"` or `"encerrada"`.
    pub status: Option<String>,
    pub data: Option<String>,
    #[validate(range(min = 1, max = 480, message = "duração deve estar entre 1 e 480 minutos"))]
    pub duracao: Option<i64>,
    pub observacoes: Option<String>,
}

impl Session {
    pub fn to_response(&self, paciente_nome: &str) -> SessaoResponse {
        SessaoResponse {
            id: self.id.clone(),
            paciente_id: self.patient_id.clone(),
            paciente_nome: paciente_nome.to_owned(),
            status: self.status.clone(),
            data: self.scheduled_at.map(|t| t.to_rfc3339()),
            duracao: self.duracao,
            observacoes: self.observacoes.clone(),
            criado_em: self.created_at.to_rfc3339(),
            atualizado_em: self.updated_at.to_rfc3339(),
        }
    }
}

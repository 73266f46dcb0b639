//! DTOs for the AI surface: respond, history, and the two dashboards.
//!
//! Dashboard field names are camelCase because the web frontend consumes
//! them verbatim.

use crate::conversation::Exchange;
use crate::entities::PatientActivity;
use crate::schemas::usuarios::paciente::{PacienteResponse, TerapeutaResponse};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ResponderRequest {
    #[validate(length(min = 1, message = "mensagem_usuario é obrigatória"))]
    pub mensagem_usuario: String,
    /// Target session; when absent the patient's open session is reused
    /// or a fresh one is created.
    pub sessao_id: Option<String>,
    /// Retry handle: the sequence number this message was (or should be)
    /// stored at. Resending with the same value is idempotent.
    pub expected_seq: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ResponderResponse {
    pub resposta: String,
    pub sentimento: String,
    pub categoria: String,
    pub intensidade: String,
    pub sessao_id: String,
    /// Sequence number of the stored patient message; the reply sits at
    /// `seq + 1`.
    pub seq: i64,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct HistoricoQuery {
    /// Scope to one session; all of the patient's sessions when absent.
    pub sessao_id: Option<String>,
    /// Return messages with `seq` greater than this (default 0). Only
    /// meaningful together with `sessao_id`.
    pub after: Option<i64>,
    /// Page size, clamped to 1..=500 (default 100).
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ConversaResponse {
    pub sessao_id: String,
    pub seq: i64,
    pub mensagem_usuario: String,
    pub resposta_ia: Option<String>,
    pub sentimento: Option<String>,
    pub categoria: Option<String>,
    pub intensidade: Option<String>,
    pub data_conversa: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HistoricoResponse {
    pub conversas: Vec<ConversaResponse>,
}

impl Exchange {
    pub fn to_response(&self) -> ConversaResponse {
        ConversaResponse {
            sessao_id: self.sessao_id.clone(),
            seq: self.seq,
            mensagem_usuario: self.mensagem_usuario.clone(),
            resposta_ia: self.resposta_ia.clone(),
            sentimento: self.sentimento.clone(),
            categoria: self.categoria.clone(),
            intensidade: self.intensidade.clone(),
            data_conversa: self.data_conversa.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PainelPacienteResponse {
    pub paciente_perfil: PacienteResponse,
    #[serde(rename = "totalConversas")]
    pub total_conversas: i64,
    #[serde(rename = "conversasEssaSemana")]
    pub conversas_essa_semana: i64,
    /// Most frequent sentiment across the patient's AI replies.
    #[serde(rename = "sentimentoMedio")]
    pub sentimento_medio: Option<String>,
    /// Earliest upcoming appointment (RFC 3339).
    #[serde(rename = "proximaSessao")]
    pub proxima_sessao: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PacienteAtivoResponse {
    pub nome: String,
    #[serde(rename = "ultimaConversa")]
    pub ultima_conversa: Option<String>,
    pub sentimento: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PainelTerapeutaResponse {
    pub terapeuta: TerapeutaResponse,
    #[serde(rename = "totalPacientes")]
    pub total_pacientes: i64,
    #[serde(rename = "conversasHoje")]
    pub conversas_hoje: i64,
    #[serde(rename = "sessoesPendentes")]
    pub sessoes_pendentes: i64,
    #[serde(rename = "alertasUrgentes")]
    pub alertas_urgentes: i64,
    #[serde(rename = "pacientesAtivos")]
    pub pacientes_ativos: Vec<PacienteAtivoResponse>,
}

impl PatientActivity {
    pub fn to_response(&self) -> PacienteAtivoResponse {
        PacienteAtivoResponse {
            nome: format!("{} {}", self.first_name, self.last_name),
            ultima_conversa: self.ultima_conversa.map(|t| t.to_rfc3339()),
            sentimento: self.sentimento.clone(),
        }
    }
}

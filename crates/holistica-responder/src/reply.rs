//! Parsed reply payload and the JSON cleanup applied to raw model output.

use serde::{Deserialize, Serialize};

/// Emotional reading of the patient message, as labelled by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sentimento {
    #[serde(alias = "positivo")]
    Positivo,
    #[serde(alias = "negativo")]
    Negativo,
    #[serde(alias = "neutro")]
    Neutro,
}

impl Sentimento {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentimento::Positivo => "Positivo",
            Sentimento::Negativo => "Negativo",
            Sentimento::Neutro => "Neutro",
        }
    }
}

impl std::fmt::Display for Sentimento {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How strongly the sentiment comes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intensidade {
    #[serde(alias = "alta")]
    Alta,
    #[serde(rename = "Média", alias = "Media", alias = "média", alias = "media")]
    Media,
    #[serde(alias = "baixa")]
    Baixa,
}

impl Intensidade {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intensidade::Alta => "Alta",
            Intensidade::Media => "Média",
            Intensidade::Baixa => "Baixa",
        }
    }
}

impl std::fmt::Display for Intensidade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The structured reply the model is instructed to produce.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiReply {
    /// Reply text shown to the patient.
    pub resposta: String,
    pub sentimento: Sentimento,
    /// Free-form theme label, e.g. `"Ansiedade"` or `"Sono"`.
    pub categoria: String,
    pub intensidade: Intensidade,
}

/// Strip markdown fences and surrounding prose from raw model output.
///
/// Models regularly wrap the requested JSON in ```` ```json ```` blocks or
/// prefix it with a sentence even when told not to.
pub(crate) fn sanitize_json(raw_text: &str) -> String {
    let trimmed = raw_text.trim();

    if trimmed.starts_with("```") {
        let without_prefix = if trimmed.starts_with("```json") {
            trimmed.strip_prefix("```json").unwrap_or(trimmed)
        } else {
            trimmed.strip_prefix("```").unwrap_or(trimmed)
        };

        if let Some(end_idx) = without_prefix.rfind("```") {
            return without_prefix[..end_idx].trim().to_string();
        }
        return without_prefix.trim().to_string();
    }

    // JSON embedded in prose: take the outermost brace pair.
    if let Some(start) = trimmed.find('{') {
        if let Some(end) = trimmed.rfind('}') {
            if start < end {
                return trimmed[start..=end].to_string();
            }
        }
    }

    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_passes_clean_json_through() {
        let input = r#"{"resposta": "Olá"}"#;
        assert_eq!(sanitize_json(input), input);
    }

    #[test]
    fn sanitize_strips_json_fence() {
        let input = "```json\n{\"resposta\": \"Olá\"}\n```";
        assert_eq!(sanitize_json(input), r#"{"resposta": "Olá"}"#);
    }

    #[test]
    fn sanitize_strips_bare_fence() {
        let input = "```\n{\"resposta\": \"Olá\"}\n```";
        assert_eq!(sanitize_json(input), r#"{"resposta": "Olá"}"#);
    }

    #[test]
    fn sanitize_extracts_json_from_prose() {
        let input = "Aqui está a análise:\n{\"resposta\": \"Olá\", \"categoria\": \"Sono\"}";
        assert_eq!(
            sanitize_json(input),
            r#"{"resposta": "Olá", "categoria": "Sono"}"#
        );
    }

    #[test]
    fn reply_parses_canonical_labels() {
        let json = r#"{
            "resposta": "Entendo como você se sente.",
            "sentimento": "Negativo",
            "categoria": "Ansiedade",
            "intensidade": "Média"
        }"#;
        let reply: AiReply = serde_json::from_str(json).unwrap();
        assert_eq!(reply.sentimento, Sentimento::Negativo);
        assert_eq!(reply.intensidade, Intensidade::Media);
        assert_eq!(reply.intensidade.as_str(), "Média");
    }

    #[test]
    fn reply_accepts_unaccented_and_lowercase_labels() {
        let json = r#"{
            "resposta": "ok",
            "sentimento": "positivo",
            "categoria": "Bem-estar",
            "intensidade": "Media"
        }"#;
        let reply: AiReply = serde_json::from_str(json).unwrap();
        assert_eq!(reply.sentimento, Sentimento::Positivo);
        assert_eq!(reply.intensidade, Intensidade::Media);
    }
}

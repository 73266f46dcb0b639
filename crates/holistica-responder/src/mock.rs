//! Mock responder for development and tests, no API calls.

use std::time::Duration;

use tracing::info;

use crate::reply::{AiReply, Intensidade, Sentimento};
use crate::{Responder, ResponderError, Turn};

/// Deterministic responder with simulated latency.
///
/// Classifies by keyword so sentiment-dependent behaviour (dashboards,
/// therapist alerts) can be exercised offline.
pub struct MockResponder {
    /// Simulated network delay in milliseconds.
    delay_ms: u64,
}

impl MockResponder {
    /// Create a mock responder with the default delay (100ms).
    pub fn new() -> Self {
        Self { delay_ms: 100 }
    }

    /// Create a mock responder with a custom delay.
    pub fn with_delay(delay_ms: u64) -> Self {
        Self { delay_ms }
    }

    fn classify(text: &str) -> (Sentimento, Intensidade, &'static str) {
        let lower = text.to_lowercase();
        if ["triste", "ansios", "medo", "mal", "sozinh"]
            .iter()
            .any(|kw| lower.contains(kw))
        {
            (Sentimento::Negativo, Intensidade::Alta, "Ansiedade")
        } else if ["feliz", "bem", "ótim", "otim", "alegr"]
            .iter()
            .any(|kw| lower.contains(kw))
        {
            (Sentimento::Positivo, Intensidade::Baixa, "Bem-estar")
        } else {
            (Sentimento::Neutro, Intensidade::Baixa, "Conversa geral")
        }
    }
}

impl Default for MockResponder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Responder for MockResponder {
    async fn respond(
        &self,
        history: &[Turn],
        patient_text: &str,
    ) -> Result<AiReply, ResponderError> {
        info!(
            history_len = history.len(),
            text_len = patient_text.len(),
            "[MOCK] simulating AI reply"
        );

        tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;

        let (sentimento, intensidade, categoria) = Self::classify(patient_text);

        Ok(AiReply {
            resposta: format!(
                "[MOCK] Obrigado por compartilhar. Esta é a mensagem {} da nossa conversa; \
                 em produção um modelo de linguagem responderia aqui.",
                history.len() + 1
            ),
            sentimento,
            categoria: categoria.to_string(),
            intensidade,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_flags_distress_keywords_as_negative() {
        let mock = MockResponder::with_delay(1);
        let reply = mock
            .respond(&[], "Estou muito triste hoje")
            .await
            .unwrap();
        assert_eq!(reply.sentimento, Sentimento::Negativo);
        assert_eq!(reply.intensidade, Intensidade::Alta);
        assert!(!reply.resposta.is_empty());
    }

    #[tokio::test]
    async fn mock_returns_neutral_for_plain_text() {
        let mock = MockResponder::with_delay(1);
        let reply = mock.respond(&[], "Olá").await.unwrap();
        assert_eq!(reply.sentimento, Sentimento::Neutro);
        assert_eq!(reply.categoria, "Conversa geral");
    }
}

//! OpenAI-compatible responder.
//!
//! Works against OpenAI, Azure OpenAI, or a local Ollama instance: anything
//! that speaks the chat-completions wire format.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::reply::{sanitize_json, AiReply};
use crate::{Responder, ResponderError, Speaker, Turn};

/// Client for an OpenAI-compatible chat-completions endpoint.
pub struct OpenAiResponder {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl OpenAiResponder {
    /// Create a new responder.
    ///
    /// # Arguments
    /// * `api_url` - full endpoint URL, e.g. `"https://api.openai.com/v1/chat/completions"`
    /// * `api_key` - bearer key (may be empty for local Ollama)
    /// * `model` - model name, e.g. `"gpt-4o-mini"` or `"llama3.2"`
    /// * `timeout` - per-request deadline; on expiry the call fails with
    ///   [`ResponderError::Timeout`]
    pub fn new(api_url: String, api_key: String, model: String, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
            api_key,
            model,
            timeout,
        }
    }

    /// System prompt fixing the persona and the reply JSON schema.
    fn system_prompt() -> &'static str {
        r#"Você é um assistente terapêutico acolhedor do aplicativo Holistica.
Converse em português, com empatia e sem julgamentos. Você NÃO é um
profissional de saúde: nunca faça diagnósticos nem prescreva tratamentos e,
em situações de risco, oriente a pessoa a procurar ajuda profissional.

Além de responder, classifique a mensagem do paciente.

Responda SOMENTE com JSON válido, sem markdown e sem texto fora do JSON:

{
  "resposta": "sua resposta acolhedora ao paciente",
  "sentimento": "Positivo" | "Negativo" | "Neutro",
  "categoria": "tema principal em uma ou duas palavras, ex.: Ansiedade, Sono, Trabalho",
  "intensidade": "Alta" | "Média" | "Baixa"
}

Use exatamente os valores listados para sentimento e intensidade."#
    }

    fn role_for(speaker: Speaker) -> &'static str {
        match speaker {
            Speaker::Patient => "user",
            Speaker::Ai => "assistant",
        }
    }
}

/// Chat-completions request body.
#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

/// Chat-completions response body (only the fields we read).
#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: MessageContent,
}

#[derive(Deserialize)]
struct MessageContent {
    content: String,
}

#[async_trait::async_trait]
impl Responder for OpenAiResponder {
    async fn respond(
        &self,
        history: &[Turn],
        patient_text: &str,
    ) -> Result<AiReply, ResponderError> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage {
            role: "system".to_string(),
            content: Self::system_prompt().to_string(),
        });
        for turn in history {
            messages.push(ChatMessage {
                role: Self::role_for(turn.speaker).to_string(),
                content: turn.text.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: patient_text.to_string(),
        });

        let request = ChatRequest {
            model: self.model.clone(),
            messages,
            temperature: 0.7,
            response_format: Some(ResponseFormat {
                format_type: "json_object".to_string(),
            }),
        };

        debug!(
            model = %self.model,
            history_len = history.len(),
            text_len = patient_text.len(),
            "sending patient message to AI service"
        );

        let response = self
            .client
            .post(&self.api_url)
            .timeout(self.timeout)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            warn!(status, body = %body, "AI service returned error");
            return Err(ResponderError::Api {
                status,
                body: body.chars().take(200).collect(),
            });
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| ResponderError::InvalidReply(format!("malformed response body: {e}")))?;

        let raw_content = chat_response
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| ResponderError::InvalidReply("no choices returned".to_string()))?;

        let clean_json = sanitize_json(&raw_content);
        let reply: AiReply = serde_json::from_str(&clean_json).map_err(|e| {
            warn!(
                error = %e,
                json = %clean_json.chars().take(200).collect::<String>(),
                "reply JSON parse failed"
            );
            ResponderError::InvalidReply(e.to_string())
        })?;

        debug!(
            sentimento = %reply.sentimento,
            categoria = %reply.categoria,
            reply_len = reply.resposta.len(),
            "AI reply parsed"
        );

        Ok(reply)
    }
}

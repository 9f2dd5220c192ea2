//! HTTP implementation of the agent backend transport

use crate::config::ClientConfig;
use crate::protocol::{HealthHistory, Medication, ResponseEnvelope, Turn, TurnKind, UserProfile};
use crate::transport::AgentBackend;
use crate::{Result, SanaError};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde_json::json;
use tracing::{debug, info, warn};

/// Reqwest-backed transport for the agent backend
pub struct AgentTransport {
    client: reqwest::Client,
    base_url: String,
    bearer_token: Option<String>,
}

impl AgentTransport {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            bearer_token: config.bearer_token.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Attach the bearer header when a token is configured. A missing token
    /// omits the header; the backend decides whether the request is allowed.
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.bearer_token {
            Some(token) => request.header("Authorization", format!("Bearer {token}")),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| SanaError::Network(format!("Request failed: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            warn!(%status, "backend rejected credentials");
            return Err(SanaError::Auth(format!("Rejected with status {status}")));
        }

        // Non-2xx responses carry a JSON body with an error or message field
        let message = match response.json::<serde_json::Value>().await {
            Ok(body) => body
                .get("error")
                .or_else(|| body.get("message"))
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| format!("Erro na requisição ({status})")),
            Err(_) => format!("Erro na requisição ({status})"),
        };

        warn!(%status, %message, "backend returned an error body");
        Err(SanaError::Backend(message))
    }

    async fn get_json(&self, path: &str) -> Result<serde_json::Value> {
        let response = self.send(self.client.get(self.url(path))).await?;
        response
            .json()
            .await
            .map_err(|e| SanaError::Backend(format!("Invalid response body: {e}")))
    }
}

#[async_trait]
impl AgentBackend for AgentTransport {
    async fn send_turn(&self, turn: &Turn) -> Result<ResponseEnvelope> {
        let url = self.url("/api/conversa");

        let request = match &turn.kind {
            TurnKind::Text(message) => {
                debug!(turn = %turn.id, "sending text turn");
                self.client.post(&url).json(&json!({
                    "mensagem": message,
                    "tipo_interacao": turn.interaction_type,
                }))
            }
            TurnKind::Audio { data, file_name } => {
                debug!(turn = %turn.id, bytes = data.len(), "sending audio turn");
                let part = Part::bytes(data.clone())
                    .file_name(file_name.clone())
                    .mime_str("audio/wav")
                    .map_err(|e| SanaError::Network(format!("Invalid audio part: {e}")))?;

                // Content-Type is left to reqwest so it owns the multipart boundary
                let form = Form::new()
                    .part("audio", part)
                    .text("tipo_interacao", turn.interaction_type.clone());
                self.client.post(&url).multipart(form)
            }
            TurnKind::Image {
                data,
                mime,
                message,
            } => {
                debug!(turn = %turn.id, bytes = data.len(), %mime, "sending image turn");
                let part = Part::bytes(data.clone())
                    .file_name("image".to_string())
                    .mime_str(mime)
                    .map_err(|e| SanaError::Network(format!("Invalid image part: {e}")))?;

                let mut form = Form::new()
                    .part("image", part)
                    .text("tipo_interacao", turn.interaction_type.clone());
                if let Some(message) = message {
                    form = form.text("mensagem", message.clone());
                }
                self.client.post(&url).multipart(form)
            }
        };

        let response = self.send(request).await?;
        let envelope: ResponseEnvelope = response
            .json()
            .await
            .map_err(|e| SanaError::Backend(format!("Invalid response envelope: {e}")))?;

        info!(
            turn = %turn.id,
            functions = envelope.executed_functions.len(),
            has_reply = envelope.reply_text.is_some(),
            "turn completed"
        );
        Ok(envelope)
    }

    async fn synthesize_speech(&self, text: &str, voice: &str) -> Result<Vec<u8>> {
        let request = self.client.post(self.url("/api/text-to-speech")).json(&json!({
            "texto": text,
            "voz": voice,
        }));

        let response = self.send(request).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| SanaError::Network(format!("Failed to read audio body: {e}")))?;

        debug!(bytes = bytes.len(), "speech synthesized");
        Ok(bytes.to_vec())
    }

    async fn fetch_profile(&self) -> Result<UserProfile> {
        let value = self.get_json("/api/user/profile").await?;
        serde_json::from_value(value)
            .map_err(|e| SanaError::Backend(format!("Invalid profile payload: {e}")))
    }

    async fn fetch_medications(&self) -> Result<Vec<Medication>> {
        let value = self.get_json("/api/medicamentos").await?;
        serde_json::from_value(value)
            .map_err(|e| SanaError::Backend(format!("Invalid medication payload: {e}")))
    }

    async fn fetch_health_history(&self, limit: u32) -> Result<HealthHistory> {
        let value = self
            .get_json(&format!("/api/dados-saude?limite={limit}"))
            .await?;
        HealthHistory::from_value(value)
            .ok_or_else(|| SanaError::Backend("Invalid health data payload".to_string()))
    }
}

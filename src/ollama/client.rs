// HTTP client for the model server's JSON API
//
// Non-streaming only: every call is one POST/GET and one JSON reply.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::debug;

use super::types::{
    ChatBody, ChatMessage, ChatResponse, GenerateBody, GenerateResponse, ModelReply, ModelRequest,
    TagsResponse,
};
use super::ModelServer;
use crate::errors::ModelError;

/// Timeout for the lightweight `/api/tags` listing
const TAGS_TIMEOUT_SECS: u64 = 10;

#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        // Per-request timeouts are applied on each call
        let client = Client::builder()
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn map_send_error(&self, err: reqwest::Error, timeout: Duration) -> ModelError {
        if err.is_timeout() {
            ModelError::Timeout {
                secs: timeout.as_secs(),
            }
        } else {
            ModelError::Unreachable {
                url: self.base_url.clone(),
                reason: err.to_string(),
            }
        }
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ModelError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ModelError::Status {
            code: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl ModelServer for OllamaClient {
    async fn generate(&self, request: &ModelRequest) -> Result<ModelReply, ModelError> {
        let started = Instant::now();
        let body = GenerateBody {
            model: &request.model,
            prompt: &request.prompt,
            stream: false,
            options: &request.options,
            keep_alive: request.keep_alive.as_deref(),
        };

        debug!(model = %request.model, "POST /api/generate");

        let response = self
            .client
            .post(self.url("/api/generate"))
            .timeout(request.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e, request.timeout))?;

        let response = Self::check_status(response).await?;
        let parsed: GenerateResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                ModelError::Timeout {
                    secs: request.timeout.as_secs(),
                }
            } else {
                ModelError::Decode(e.to_string())
            }
        })?;

        Ok(ModelReply {
            model: request.model.clone(),
            text: parsed.response,
            elapsed: started.elapsed(),
        })
    }

    async fn chat(&self, request: &ModelRequest) -> Result<ModelReply, ModelError> {
        let started = Instant::now();
        let body = ChatBody {
            model: &request.model,
            messages: vec![ChatMessage::user(request.prompt.clone())],
            stream: false,
            options: &request.options,
            keep_alive: request.keep_alive.as_deref(),
        };

        debug!(model = %request.model, "POST /api/chat");

        let response = self
            .client
            .post(self.url("/api/chat"))
            .timeout(request.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e, request.timeout))?;

        let response = Self::check_status(response).await?;
        let parsed: ChatResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                ModelError::Timeout {
                    secs: request.timeout.as_secs(),
                }
            } else {
                ModelError::Decode(e.to_string())
            }
        })?;

        Ok(ModelReply {
            model: request.model.clone(),
            text: parsed.message.content,
            elapsed: started.elapsed(),
        })
    }

    async fn list_models(&self) -> Result<Vec<String>, ModelError> {
        let timeout = Duration::from_secs(TAGS_TIMEOUT_SECS);
        let response = self
            .client
            .get(self.url("/api/tags"))
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| self.map_send_error(e, timeout))?;

        let response = Self::check_status(response).await?;
        let parsed: TagsResponse = response
            .json()
            .await
            .map_err(|e| ModelError::Decode(e.to_string()))?;

        Ok(parsed.models.into_iter().map(|m| m.name).collect())
    }

    fn name(&self) -> &str {
        "ollama-http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ollama::GenerateOptions;
    use mockito::Matcher;

    fn request(prompt: &str) -> ModelRequest {
        ModelRequest::new("mistral:7b", prompt, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_generate_reads_response_field() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/generate")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "model": "mistral:7b",
                "prompt": "status?",
                "stream": false
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"model":"mistral:7b","response":"All systems nominal","done":true}"#)
            .create_async()
            .await;

        let client = OllamaClient::new(server.url()).unwrap();
        let reply = client.generate(&request("status?")).await.unwrap();

        assert_eq!(reply.text, "All systems nominal");
        assert_eq!(reply.model, "mistral:7b");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_chat_sends_options_and_keep_alive() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/chat")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "messages": [{"role": "user", "content": "Initialize"}],
                "options": {"num_predict": 30},
                "keep_alive": "24h"
            })))
            .with_status(200)
            .with_body(r#"{"message":{"role":"assistant","content":"ready"}}"#)
            .create_async()
            .await;

        let client = OllamaClient::new(format!("{}/", server.url())).unwrap();
        let req = request("Initialize")
            .with_options(GenerateOptions::new(0.1, 30))
            .with_keep_alive("24h");
        let reply = client.chat(&req).await.unwrap();

        assert_eq!(reply.text, "ready");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_success_status_is_status_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/generate")
            .with_status(404)
            .with_body(r#"{"error":"model 'x' not found"}"#)
            .create_async()
            .await;

        let client = OllamaClient::new(server.url()).unwrap();
        let err = client.generate(&request("hi")).await.unwrap_err();

        match err {
            ModelError::Status { code, body } => {
                assert_eq!(code, 404);
                assert!(body.contains("not found"));
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_garbage_body_is_decode_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/chat")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let client = OllamaClient::new(server.url()).unwrap();
        let err = client.chat(&request("hi")).await.unwrap_err();
        assert!(matches!(err, ModelError::Decode(_)));
    }

    #[tokio::test]
    async fn test_list_models() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/tags")
            .with_status(200)
            .with_body(r#"{"models":[{"name":"mistral:7b"},{"name":"llama2:13b"}]}"#)
            .create_async()
            .await;

        let client = OllamaClient::new(server.url()).unwrap();
        let models = client.list_models().await.unwrap();
        assert_eq!(models, vec!["mistral:7b", "llama2:13b"]);
    }

    /// Accepts connections and never answers
    async fn silent_server() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_deadline_is_timeout_error() {
        let client = OllamaClient::new(silent_server().await).unwrap();
        let req = ModelRequest::new("mistral:7b", "hi", Duration::from_millis(300));

        let err = client.chat(&req).await.unwrap_err();
        assert!(err.is_timeout(), "got {:?}", err);
        assert_eq!(err.reason(), "timeout");

        let err = client.generate(&req).await.unwrap_err();
        assert!(matches!(err, ModelError::Timeout { .. }), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_unreachable_server() {
        // Port 9 (discard) is essentially never listening on test hosts
        let client = OllamaClient::new("http://127.0.0.1:9").unwrap();
        let err = client.list_models().await.unwrap_err();
        assert!(matches!(
            err,
            ModelError::Unreachable { .. } | ModelError::Timeout { .. }
        ));
    }
}

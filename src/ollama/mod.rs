// Local model server access
//
// One trait over the two ways the family's models are reached: the HTTP API
// and the `ollama` command-line tool.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

pub mod cli;
pub mod client;
pub mod reply;
pub mod types;

#[cfg(test)]
pub(crate) mod fake;

pub use cli::OllamaCli;
pub use client::OllamaClient;
pub use reply::{extract_json_object, model_available, truncate_chars};
pub use types::{ChatMessage, GenerateOptions, ModelReply, ModelRequest};

use crate::config::ModelServerConfig;
use crate::errors::ModelError;

/// A server that turns a prompt into generated text
#[async_trait]
pub trait ModelServer: Send + Sync {
    /// Single-shot completion
    async fn generate(&self, request: &ModelRequest) -> Result<ModelReply, ModelError>;

    /// Single-turn chat (the prompt becomes one user message)
    async fn chat(&self, request: &ModelRequest) -> Result<ModelReply, ModelError>;

    /// Names of the models the server has pulled
    async fn list_models(&self) -> Result<Vec<String>, ModelError>;

    /// Short label for logs
    fn name(&self) -> &str;
}

/// Build the configured server backend
pub fn create_server(config: &ModelServerConfig) -> Result<Arc<dyn ModelServer>> {
    if config.use_cli {
        Ok(Arc::new(OllamaCli::default()))
    } else {
        Ok(Arc::new(OllamaClient::new(config.base_url.clone())?))
    }
}

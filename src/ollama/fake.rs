// In-process model server for unit tests

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use super::types::{ModelReply, ModelRequest};
use super::ModelServer;
use crate::errors::ModelError;

type Responder = Box<dyn Fn(&ModelRequest) -> Result<String, ModelError> + Send + Sync>;

pub struct ScriptedServer {
    responder: Responder,
    delays: HashMap<String, Duration>,
    models: Vec<String>,
    calls: Mutex<Vec<ModelRequest>>,
}

impl ScriptedServer {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&ModelRequest) -> Result<String, ModelError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            delays: HashMap::new(),
            models: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Always answer with the same text
    pub fn constant(text: &str) -> Self {
        let text = text.to_string();
        Self::new(move |_| Ok(text.clone()))
    }

    /// Always fail with an unreachable error
    pub fn offline() -> Self {
        Self::new(|_| {
            Err(ModelError::Unreachable {
                url: "http://localhost:11434".into(),
                reason: "connection refused".into(),
            })
        })
    }

    pub fn with_models(mut self, models: &[&str]) -> Self {
        self.models = models.iter().map(|m| m.to_string()).collect();
        self
    }

    /// Sleep before answering requests for `model`
    pub fn with_delay(mut self, model: &str, delay: Duration) -> Self {
        self.delays.insert(model.to_string(), delay);
        self
    }

    pub fn calls(&self) -> Vec<ModelRequest> {
        self.calls.lock().unwrap().clone()
    }

    async fn answer(&self, request: &ModelRequest) -> Result<ModelReply, ModelError> {
        self.calls.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delays.get(&request.model) {
            tokio::time::sleep(*delay).await;
        }
        let text = (self.responder)(request)?;
        Ok(ModelReply {
            model: request.model.clone(),
            text,
            elapsed: Duration::from_millis(1),
        })
    }
}

#[async_trait]
impl ModelServer for ScriptedServer {
    async fn generate(&self, request: &ModelRequest) -> Result<ModelReply, ModelError> {
        self.answer(request).await
    }

    async fn chat(&self, request: &ModelRequest) -> Result<ModelReply, ModelError> {
        self.answer(request).await
    }

    async fn list_models(&self) -> Result<Vec<String>, ModelError> {
        if self.models.is_empty() {
            return Err(ModelError::Unreachable {
                url: "http://localhost:11434".into(),
                reason: "no listing scripted".into(),
            });
        }
        Ok(self.models.clone())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

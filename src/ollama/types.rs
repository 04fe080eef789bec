// Request/response types for the model server
//
// `ModelRequest`/`ModelReply` are what the rest of the crate sees; the
// `*Body`/`*Response` structs mirror the server's JSON API.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Sampling options forwarded verbatim in the `options` object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<u32>,
}

impl GenerateOptions {
    pub fn new(temperature: f32, num_predict: u32) -> Self {
        Self {
            temperature: Some(temperature),
            num_predict: Some(num_predict),
        }
    }
}

/// A single prompt sent to one model
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub model: String,
    pub prompt: String,
    pub options: GenerateOptions,
    /// How long the server keeps the model resident afterwards (e.g. "24h")
    pub keep_alive: Option<String>,
    pub timeout: Duration,
}

impl ModelRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>, timeout: Duration) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            options: GenerateOptions::default(),
            keep_alive: None,
            timeout,
        }
    }

    pub fn with_options(mut self, options: GenerateOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_keep_alive(mut self, keep_alive: impl Into<String>) -> Self {
        self.keep_alive = Some(keep_alive.into());
        self
    }
}

/// Completed text from the server
#[derive(Debug, Clone)]
pub struct ModelReply {
    pub model: String,
    pub text: String,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct GenerateBody<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub stream: bool,
    pub options: &'a GenerateOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_alive: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GenerateResponse {
    #[serde(default)]
    pub response: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatBody<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    pub options: &'a GenerateOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_alive: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponse {
    pub message: ChatMessage,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TagsResponse {
    #[serde(default)]
    pub models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TagEntry {
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_options_serialize_to_empty_object() {
        let json = serde_json::to_value(GenerateOptions::default()).unwrap();
        assert_eq!(json, serde_json::json!({}));
    }

    #[test]
    fn test_generate_body_shape() {
        let options = GenerateOptions::new(0.1, 50);
        let body = GenerateBody {
            model: "mistral:7b",
            prompt: "hi",
            stream: false,
            options: &options,
            keep_alive: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["num_predict"], 50);
        assert!(json.get("keep_alive").is_none());
    }
}

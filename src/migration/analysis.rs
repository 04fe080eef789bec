// Document classification for migration
//
// The model is asked for a JSON verdict; prose replies and server failures
// fall back to keyword heuristics so every document still gets a category.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::constants::MIGRATION_PROMPT_CHARS;
use crate::ollama::{extract_json_object, truncate_chars};

/// Category a document is filed under in `organized_docs/`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Blueprint,
    Session,
    Status,
    Config,
    Documentation,
    /// The document could not be read
    Error,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Blueprint => "blueprint",
            ContentType::Session => "session",
            ContentType::Status => "status",
            ContentType::Config => "config",
            ContentType::Documentation => "documentation",
            ContentType::Error => "error",
        }
    }

    /// Model-supplied label; anything unrecognised is documentation
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "blueprint" => ContentType::Blueprint,
            "session" => ContentType::Session,
            "status" => ContentType::Status,
            "config" | "configuration" => ContentType::Config,
            _ => ContentType::Documentation,
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentAnalysis {
    pub file_path: PathBuf,
    pub content_type: ContentType,
    pub importance_score: f64,
    pub key_topics: Vec<String>,
    pub relationships: Vec<String>,
    pub summary: String,
    pub confidence: f64,
    pub processing_time: f64,
}

pub fn migration_prompt(path: &Path, content: &str) -> String {
    format!(
        "You are CLAUDAE, the System Guardian of the HONEY DUO WEALTH project.\n\
         Analyze this document for intelligent organization in our family wealth protection system.\n\n\
         DOCUMENT: {path}\n\
         CONTENT:\n{content}\n\n\
         ANALYSIS REQUIRED:\n\
         1. Content Type: (blueprint/session/status/config/documentation)\n\
         2. Importance Score: (0.0-1.0, where 1.0 is critical for family wealth protection)\n\
         3. Key Topics: (3-5 main topics this document covers)\n\
         4. Relationships: (which other documents or systems this relates to)\n\
         5. Summary: (2-3 sentences describing what this document contains)\n\n\
         CONTEXT: This is part of building an AI family (CLAUDAE/NYALA/DEON) to protect family wealth.\n\n\
         Respond in this exact JSON format:\n\
         {{\"content_type\": \"...\", \"importance_score\": 0.0, \"key_topics\": [], \
         \"relationships\": [], \"summary\": \"...\", \"confidence\": 0.0}}",
        path = path.display(),
        content = truncate_chars(content, MIGRATION_PROMPT_CHARS),
    )
}

fn strings(value: &Value, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn unit(value: &Value, key: &str, default: f64) -> f64 {
    value
        .get(key)
        .and_then(Value::as_f64)
        .unwrap_or(default)
        .clamp(0.0, 1.0)
}

/// Interpret a model reply for `path`
pub fn parse_analysis(path: &Path, reply: &str, processing_time: f64) -> DocumentAnalysis {
    match extract_json_object(reply) {
        Some(value) => DocumentAnalysis {
            file_path: path.to_path_buf(),
            content_type: value
                .get("content_type")
                .and_then(Value::as_str)
                .map(ContentType::from_label)
                .unwrap_or(ContentType::Documentation),
            importance_score: unit(&value, "importance_score", 0.5),
            key_topics: strings(&value, "key_topics"),
            relationships: strings(&value, "relationships"),
            summary: value
                .get("summary")
                .and_then(Value::as_str)
                .unwrap_or("No summary available")
                .to_string(),
            confidence: unit(&value, "confidence", 0.5),
            processing_time,
        },
        None => text_analysis(path, reply, processing_time),
    }
}

/// Keyword reading of a prose reply
fn text_analysis(path: &Path, reply: &str, processing_time: f64) -> DocumentAnalysis {
    let lower = reply.to_lowercase();
    let (content_type, importance_score) = if lower.contains("blueprint") {
        (ContentType::Blueprint, 0.9)
    } else if lower.contains("session") {
        (ContentType::Session, 0.7)
    } else if lower.contains("status") {
        (ContentType::Status, 0.7)
    } else {
        (ContentType::Documentation, 0.7)
    };

    let summary = if reply.chars().count() > 200 {
        format!("{}...", truncate_chars(reply, 200))
    } else {
        reply.to_string()
    };

    DocumentAnalysis {
        file_path: path.to_path_buf(),
        content_type,
        importance_score,
        key_topics: Vec::new(),
        relationships: Vec::new(),
        summary,
        confidence: 0.6,
        processing_time,
    }
}

/// Classification from the file path alone, used when the server fails
pub fn fallback_analysis(path: &Path, processing_time: f64) -> DocumentAnalysis {
    let lower = path.to_string_lossy().to_lowercase();
    let (content_type, importance_score) = if lower.contains("blueprint") {
        (ContentType::Blueprint, 0.9)
    } else if lower.contains("session") {
        (ContentType::Session, 0.8)
    } else if lower.contains("status") {
        (ContentType::Status, 0.7)
    } else {
        (ContentType::Documentation, 0.5)
    };

    DocumentAnalysis {
        file_path: path.to_path_buf(),
        content_type,
        importance_score,
        key_topics: vec!["family_wealth".to_string(), "ai_system".to_string()],
        relationships: vec!["ai_family".to_string()],
        summary: format!("Document from {} - analyzed without CLAUDAE", path.display()),
        confidence: 0.3,
        processing_time,
    }
}

// Learner session bookkeeping: status snapshots and the final handoff

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::PathBuf;

use super::monitor::ChangeEvent;

/// Learnings quoted in the handoff
const HANDOFF_RECENT_LEARNINGS: usize = 10;

/// One analysed change, as stored in `user_learning_<stamp>.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningRecord {
    pub timestamp: DateTime<Local>,
    pub session_id: String,
    pub file_path: PathBuf,
    pub change_event: ChangeEvent,
    pub claudae_analysis: Value,
    pub source: String,
}

impl LearningRecord {
    fn text_field(&self, key: &str, default: &str) -> String {
        self.claudae_analysis
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or(default)
            .to_string()
    }

    pub fn importance(&self) -> f64 {
        importance_score(&self.claudae_analysis)
    }

    pub fn pattern(&self) -> String {
        self.text_field("development_pattern", "Unknown")
    }
}

/// `importance_score` from an analysis, accepting numbers or numeric strings
pub fn importance_score(analysis: &Value) -> f64 {
    match analysis.get("importance_score") {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatus {
    pub session_id: String,
    pub duration_minutes: f64,
    pub user_changes_detected: usize,
    pub learnings_captured: usize,
    pub last_update: DateTime<Local>,
    pub system_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub duration_minutes: f64,
    pub user_changes_monitored: usize,
    pub learnings_captured: usize,
    pub average_importance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningDigest {
    pub file: String,
    pub pattern: String,
    pub insight: String,
    pub user_intent: String,
    pub importance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Handoff {
    pub session_summary: SessionSummary,
    pub key_user_learnings: Vec<LearningDigest>,
    pub development_patterns_learned: Vec<String>,
    pub generated: DateTime<Local>,
}

pub struct Session {
    pub id: String,
    pub started: DateTime<Local>,
    pub changes: Vec<ChangeEvent>,
    pub learnings: Vec<LearningRecord>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        let started = Local::now();
        Self {
            id: format!("clean_{}", started.format("%Y%m%d_%H%M%S")),
            started,
            changes: Vec::new(),
            learnings: Vec::new(),
        }
    }

    pub fn duration_minutes(&self) -> f64 {
        (Local::now() - self.started).num_milliseconds() as f64 / 60_000.0
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            session_id: self.id.clone(),
            duration_minutes: self.duration_minutes(),
            user_changes_detected: self.changes.len(),
            learnings_captured: self.learnings.len(),
            last_update: Local::now(),
            system_type: "clean_user_code_only".to_string(),
        }
    }

    pub fn average_importance(&self) -> f64 {
        if self.learnings.is_empty() {
            return 0.0;
        }
        self.learnings.iter().map(|l| l.importance()).sum::<f64>() / self.learnings.len() as f64
    }

    pub fn handoff(&self) -> Handoff {
        let skip = self.learnings.len().saturating_sub(HANDOFF_RECENT_LEARNINGS);
        let key_user_learnings = self.learnings[skip..]
            .iter()
            .map(|l| LearningDigest {
                file: l
                    .file_path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                pattern: l.pattern(),
                insight: l.text_field("key_insight", "No insight"),
                user_intent: l.text_field("user_intent", "Unknown"),
                importance: l.importance(),
            })
            .collect();

        let patterns: BTreeSet<String> = self.learnings.iter().map(|l| l.pattern()).collect();

        Handoff {
            session_summary: SessionSummary {
                session_id: self.id.clone(),
                duration_minutes: self.duration_minutes(),
                user_changes_monitored: self.changes.len(),
                learnings_captured: self.learnings.len(),
                average_importance: self.average_importance(),
            },
            key_user_learnings,
            development_patterns_learned: patterns.into_iter().collect(),
            generated: Local::now(),
        }
    }
}

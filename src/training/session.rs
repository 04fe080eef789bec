// Named development sessions around the collector
//
// A session is opened by one command and closed by a later one, so the open
// session lives in `<training>/active_session.json` between invocations.
// Closing it writes `<training>/sessions/<name>_<YYYYMMDD>.json`.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use super::collector::{TrainingCollector, TrainingSummary};
use super::json_store::{read_json, write_pretty_json};

const ACTIVE_FILE: &str = "active_session.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionItemKind {
    Code,
    FileCreation,
    ProblemSolution,
    ArchitectureChoice,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionItem {
    pub timestamp: DateTime<Local>,
    #[serde(rename = "type")]
    pub kind: SessionItemKind,
    pub description: String,
    pub category: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveSession {
    pub name: String,
    pub started: DateTime<Local>,
    pub log: Vec<SessionItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSessionSummary {
    pub session_name: String,
    pub duration_minutes: i64,
    pub items_collected: usize,
    pub categories: Vec<String>,
    pub timestamp: DateTime<Local>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub summary: TrainingSessionSummary,
    pub log: Vec<SessionItem>,
}

/// What `end` hands back
#[derive(Debug, Clone)]
pub struct ClosedSession {
    pub path: PathBuf,
    pub record: SessionRecord,
    pub training: TrainingSummary,
}

pub struct TrainingSessions {
    collector: TrainingCollector,
}

impl TrainingSessions {
    pub fn new(collector: TrainingCollector) -> Self {
        Self { collector }
    }

    fn active_path(&self) -> PathBuf {
        self.collector.training_dir().join(ACTIVE_FILE)
    }

    pub fn sessions_dir(&self) -> PathBuf {
        self.collector.training_dir().join("sessions")
    }

    pub fn active(&self) -> Result<Option<ActiveSession>> {
        let path = self.active_path();
        if !path.exists() {
            return Ok(None);
        }
        read_json(&path).map(Some)
    }

    fn require_active(&self) -> Result<ActiveSession> {
        self.active()?
            .context("No training session active; run `session start <name>` first")
    }

    fn save(&self, session: &ActiveSession) -> Result<()> {
        write_pretty_json(&self.active_path(), session)
    }

    fn push(
        &self,
        mut session: ActiveSession,
        kind: SessionItemKind,
        description: &str,
        category: &str,
    ) -> Result<()> {
        session.log.push(SessionItem {
            timestamp: Local::now(),
            kind,
            description: description.to_string(),
            category: category.to_string(),
        });
        self.save(&session)
    }

    pub fn start(&self, name: &str) -> Result<ActiveSession> {
        let name = name.trim();
        let plain = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !plain {
            bail!("Session name must be letters, digits, '_' or '-': {:?}", name);
        }
        if let Some(open) = self.active()? {
            bail!("Session '{}' is still open; end it first", open.name);
        }
        let session = ActiveSession {
            name: name.to_string(),
            started: Local::now(),
            log: Vec::new(),
        };
        self.save(&session)?;
        info!(session = name, "Training session started");
        Ok(session)
    }

    /// Collect a snippet written during the session
    pub fn collect_code(&self, code: &str, description: &str, category: &str) -> Result<()> {
        let session = self.require_active()?;
        let example = self.collector.collect_code_example(
            code,
            &format!("Session: {} - {}", session.name, description),
            category,
            "Active development pattern",
            &[session.name.clone(), "active_dev".to_string()],
        )?;
        self.push(session, SessionItemKind::Code, description, &example.category)
    }

    /// Collect a whole file created during the session
    pub fn collect_file(&self, path: &Path, purpose: &str, patterns: &[String]) -> Result<()> {
        let session = self.require_active()?;
        let code = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mut tags = vec!["file_creation".to_string()];
        tags.extend(patterns.iter().cloned());
        self.collector.collect_code_example(
            &code,
            &format!("File creation: {} - {}", path.display(), purpose),
            "file_creation",
            &format!("Created for: {}", purpose),
            &tags,
        )?;
        self.push(session, SessionItemKind::FileCreation, purpose, "file_creation")
    }

    pub fn collect_solution(&self, problem: &str, code: &str, explanation: &str) -> Result<()> {
        let session = self.require_active()?;
        self.collector.collect_debugging_solution(
            problem,
            "Development challenge encountered",
            &format!("{}\n\nCode:\n{}", explanation, code),
            "Pattern learned for future reference",
        )?;
        self.push(session, SessionItemKind::ProblemSolution, problem, "debugging")
    }

    pub fn collect_decision(
        &self,
        choice: &str,
        alternatives: &[String],
        reasoning: &str,
    ) -> Result<()> {
        let session = self.require_active()?;
        self.collector.collect_architecture_decision(
            choice,
            alternatives,
            reasoning,
            "Will influence future development patterns",
        )?;
        self.push(session, SessionItemKind::ArchitectureChoice, choice, "architecture")
    }

    /// Close the open session, write its record and refresh the training summary
    pub fn end(&self) -> Result<ClosedSession> {
        let session = self.require_active()?;
        let now = Local::now();

        let categories: BTreeSet<String> =
            session.log.iter().map(|i| i.category.clone()).collect();
        let record = SessionRecord {
            summary: TrainingSessionSummary {
                session_name: session.name.clone(),
                duration_minutes: (now - session.started).num_minutes(),
                items_collected: session.log.len(),
                categories: categories.into_iter().collect(),
                timestamp: now,
            },
            log: session.log,
        };

        let path = self
            .sessions_dir()
            .join(format!("{}_{}.json", session.name, now.format("%Y%m%d")));
        write_pretty_json(&path, &record)?;
        fs::remove_file(self.active_path())
            .with_context(|| format!("Failed to close {}", self.active_path().display()))?;

        let training = self.collector.generate_training_summary()?;
        info!(
            session = %record.summary.session_name,
            items = record.summary.items_collected,
            "Training session complete"
        );
        Ok(ClosedSession {
            path,
            record,
            training,
        })
    }
}

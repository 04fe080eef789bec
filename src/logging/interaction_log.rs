// Interaction logger: one JSONL file per family member
//
// <logs_dir>/<member>_interactions.jsonl, one record per model call.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::family::Member;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    Success,
    Error,
}

/// Outcome of one call to a family member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub ai: Member,
    pub status: CallStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Wall-clock duration formatted as "12.34s"
    pub elapsed_time: String,

    pub timestamp: DateTime<Local>,
}

impl InteractionRecord {
    pub fn success(ai: Member, response: String, elapsed_secs: f64) -> Self {
        Self {
            ai,
            status: CallStatus::Success,
            response: Some(response),
            error: None,
            elapsed_time: format!("{:.2}s", elapsed_secs),
            timestamp: Local::now(),
        }
    }

    pub fn failure(ai: Member, error: String, elapsed_secs: f64) -> Self {
        Self {
            ai,
            status: CallStatus::Error,
            response: None,
            error: Some(error),
            elapsed_time: format!("{:.2}s", elapsed_secs),
            timestamp: Local::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == CallStatus::Success
    }

    /// Response text, or an empty string for failed calls
    pub fn text(&self) -> &str {
        self.response.as_deref().unwrap_or("")
    }
}

/// Appends interaction records to per-member JSONL files
pub struct InteractionLog {
    logs_dir: PathBuf,
}

impl InteractionLog {
    pub fn new(logs_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&logs_dir).with_context(|| {
            format!("Failed to create logs directory: {}", logs_dir.display())
        })?;
        Ok(Self { logs_dir })
    }

    pub fn path_for(&self, member: Member) -> PathBuf {
        self.logs_dir
            .join(format!("{}_interactions.jsonl", member.key()))
    }

    /// Append a record to the member's log
    pub fn log(&self, record: &InteractionRecord) -> Result<()> {
        let path = self.path_for(record.ai);
        let json = serde_json::to_string(record).context("Failed to serialize interaction")?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open interaction log: {}", path.display()))?;

        writeln!(file, "{}", json).context("Failed to write interaction")?;
        Ok(())
    }

    /// Read back every record for a member (missing file = empty)
    pub fn read(&self, member: Member) -> Result<Vec<InteractionRecord>> {
        let path = self.path_for(member);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read interaction log: {}", path.display()))?;

        contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).context("Failed to parse interaction"))
            .collect()
    }
}

/// The single-record log written by `ask`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestLogEntry {
    pub timestamp: DateTime<Local>,
    pub member: String,
    pub prompt: String,
    pub response: String,
}

/// Overwrite `path` with one pretty-printed entry
pub fn write_test_log(path: &Path, entry: &TestLogEntry) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(entry).context("Failed to serialize test log")?;
    fs::write(path, json).with_context(|| format!("Failed to write test log: {}", path.display()))
}

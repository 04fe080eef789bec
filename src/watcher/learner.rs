// Autonomous learner
//
// Consumes change events, asks Claudae to analyse each user-code change,
// stores the analysis, feeds significant ones to the training collector and
// queues documentation updates. Ends the session with a handoff file.

use anyhow::Result;
use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, error, info, warn};

use super::filter::CodeFilter;
use super::monitor::ChangeEvent;
use super::session::{importance_score, Handoff, LearningRecord, Session};
use crate::config::{Config, DocTriggerConfig, LearnerConfig};
use crate::logging::InteractionLog;
use crate::ollama::{extract_json_object, ModelRequest, ModelServer};
use crate::training::{write_pretty_json, TrainingCollector};

/// Extensions whose content is worth keeping as a training example
const FEEDABLE_EXTENSIONS: [&str; 4] = ["py", "js", "md", "rs"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocTrigger {
    MajorUpdate,
    ArchitecturalUpdate,
    ComponentUpdate,
    AccumulatedChanges,
}

/// Pick the documentation update an analysis calls for, if any
pub fn evaluate_doc_trigger(
    analysis: &Value,
    session_changes: usize,
    thresholds: &DocTriggerConfig,
) -> Option<DocTrigger> {
    let importance = importance_score(analysis);
    let flag = |key: &str| analysis.get(key).and_then(Value::as_bool).unwrap_or(false);

    if importance >= thresholds.major_feature {
        Some(DocTrigger::MajorUpdate)
    } else if flag("architectural_change") && importance >= thresholds.architectural {
        Some(DocTrigger::ArchitecturalUpdate)
    } else if flag("documentation_trigger") && importance >= thresholds.component_change {
        Some(DocTrigger::ComponentUpdate)
    } else if session_changes >= thresholds.change_count {
        Some(DocTrigger::AccumulatedChanges)
    } else {
        None
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocUpdateRequest {
    pub trigger_type: DocTrigger,
    pub file_path: PathBuf,
    pub analysis: Value,
    pub session_changes: usize,
    pub timestamp: chrono::DateTime<Local>,
}

pub fn analysis_prompt(file_name: &str, event: &ChangeEvent, content: &str) -> String {
    let change = match event.event_type {
        super::ChangeKind::Created => "created",
        super::ChangeKind::Modified => "modified",
    };
    format!(
        "You are CLAUDAE, analyzing USER CODE CHANGES for the HONEY DUO WEALTH project.\n\n\
         FILE: {file_name}\n\
         CHANGE TYPE: {change}\n\
         CONTENT (first {len} bytes):\n{content}\n\n\
         Analyze this USER development work and provide JSON:\n\
         {{\n\
         \x20   \"analysis_type\": \"user_code_analysis\",\n\
         \x20   \"file_type\": \"python/markdown/json/config/rust/other\",\n\
         \x20   \"development_pattern\": \"what development pattern this represents\",\n\
         \x20   \"key_insight\": \"main learning from this user change\",\n\
         \x20   \"importance_score\": 0.1-1.0,\n\
         \x20   \"learning_category\": \"architecture/feature/bugfix/documentation/testing/config\",\n\
         \x20   \"technical_details\": \"specific insights about the user's approach\",\n\
         \x20   \"project_impact\": \"how this user change affects the project\",\n\
         \x20   \"user_intent\": \"what the developer was trying to accomplish\",\n\
         \x20   \"documentation_trigger\": true/false,\n\
         \x20   \"architectural_change\": true/false,\n\
         \x20   \"claudae_confidence\": 0.1-1.0\n\
         }}\n\n\
         Focus on learning from the USER'S development decisions and patterns.",
        len = content.len(),
    )
}

/// Read at most `limit` bytes of a file as lossy UTF-8
fn read_prefix(path: &Path, limit: usize) -> std::io::Result<String> {
    let file = std::fs::File::open(path)?;
    let mut buf = Vec::with_capacity(limit);
    file.take(limit as u64).read_to_end(&mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn is_feedable(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| FEEDABLE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

pub struct AutonomousLearner {
    server: Arc<dyn ModelServer>,
    model: String,
    settings: LearnerConfig,
    learning_dir: PathBuf,
    collector: TrainingCollector,
    filter: CodeFilter,
    session: Session,
}

impl AutonomousLearner {
    pub fn new(server: Arc<dyn ModelServer>, config: &Config) -> Result<Self> {
        let paths = config.paths();
        let learning_dir = paths.learning_dir();
        std::fs::create_dir_all(&learning_dir)?;

        // Interaction logs land under ai_family/logs, which the filter rejects.
        InteractionLog::new(paths.logs_dir())?;

        Ok(Self {
            server,
            model: config.learner_model().to_string(),
            settings: config.learner.clone(),
            learning_dir,
            collector: TrainingCollector::new(paths.training_dir())?,
            filter: CodeFilter::new(config.learner.max_file_bytes),
            session: Session::new(),
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn learning_dir(&self) -> &Path {
        &self.learning_dir
    }

    pub fn filter(&self) -> &CodeFilter {
        &self.filter
    }

    /// Ask the model about one change. None when the file cannot be read or
    /// the reply carries no JSON object.
    pub async fn analyze(&self, event: &ChangeEvent) -> Option<Value> {
        let file_name = event
            .file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        info!(file = %file_name, "Analysing user change");

        let content = match read_prefix(&event.file_path, self.settings.read_bytes) {
            Ok(c) => c,
            Err(e) => {
                warn!(path = %event.file_path.display(), error = %e, "Could not read changed file");
                return None;
            }
        };

        let request = ModelRequest::new(
            self.model.clone(),
            analysis_prompt(&file_name, event, &content),
            Duration::from_secs(self.settings.query_timeout_secs),
        );

        match self.server.generate(&request).await {
            Ok(reply) => {
                let parsed = extract_json_object(&reply.text);
                if parsed.is_none() {
                    debug!(file = %file_name, "Analysis reply had no JSON object");
                }
                parsed
            }
            Err(e) => {
                error!(error = %e, "Analysis query failed");
                None
            }
        }
    }

    /// Filter, analyse and store one event. Returns the stored learning.
    pub async fn handle_event(&mut self, event: ChangeEvent) -> Option<LearningRecord> {
        if !self.filter.is_user_code(&event.file_path) {
            return None;
        }
        let analysis = self.analyze(&event).await?;
        match self.store_learning(event, analysis) {
            Ok(record) => Some(record),
            Err(e) => {
                error!(error = %e, "Failed to store learning");
                None
            }
        }
    }

    fn store_learning(&mut self, event: ChangeEvent, analysis: Value) -> Result<LearningRecord> {
        let now = Local::now();
        let record = LearningRecord {
            timestamp: now,
            session_id: self.session.id.clone(),
            file_path: event.file_path.clone(),
            change_event: event.clone(),
            claudae_analysis: analysis,
            source: "user_code_change".to_string(),
        };

        let file = self
            .learning_dir
            .join(format!("user_learning_{}.json", now.format("%Y%m%d_%H%M%S_%3f")));
        write_pretty_json(&file, &record)?;

        self.session.changes.push(event);
        self.session.learnings.push(record.clone());

        if record.importance() >= self.settings.feed_threshold {
            self.feed_collector(&record);
        }
        self.queue_doc_update(&record)?;

        info!(
            pattern = %record.pattern(),
            importance = record.importance(),
            "User learning captured"
        );
        Ok(record)
    }

    fn feed_collector(&self, record: &LearningRecord) {
        if !is_feedable(&record.file_path) {
            return;
        }
        let code = match read_prefix(&record.file_path, self.settings.feed_bytes) {
            Ok(c) => c,
            Err(e) => {
                debug!(error = %e, "Training feed skipped");
                return;
            }
        };

        let field = |key: &str, default: &str| {
            record
                .claudae_analysis
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or(default)
                .to_string()
        };
        let tags = ["user_code", "autonomous", "clean_system"].map(String::from);

        match self.collector.collect_code_example(
            &code,
            &format!(
                "User Development: {}",
                field("development_pattern", "Code change")
            ),
            &field("learning_category", "user_code"),
            &field("key_insight", "User code change captured automatically"),
            &tags,
        ) {
            Ok(_) => debug!(path = %record.file_path.display(), "Fed to training collector"),
            Err(e) => debug!(error = %e, "Training feed failed"),
        }
    }

    fn queue_doc_update(&self, record: &LearningRecord) -> Result<()> {
        let Some(trigger) = evaluate_doc_trigger(
            &record.claudae_analysis,
            self.session.changes.len(),
            &self.settings.doc_triggers,
        ) else {
            return Ok(());
        };

        info!(trigger = ?trigger, "Documentation update triggered");
        let request = DocUpdateRequest {
            trigger_type: trigger,
            file_path: record.file_path.clone(),
            analysis: record.claudae_analysis.clone(),
            session_changes: self.session.changes.len(),
            timestamp: Local::now(),
        };

        let path = self.learning_dir.join("doc_updates.jsonl");
        let line = serde_json::to_string(&request)?;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        std::io::Write::write_all(&mut file, format!("{}\n", line).as_bytes())?;
        Ok(())
    }

    pub fn write_session_status(&self) -> Result<()> {
        write_pretty_json(
            &self.learning_dir.join("clean_session_status.json"),
            &self.session.status(),
        )?;
        let learned = self.session.learnings.len();
        if learned > 0 && learned % 5 == 0 {
            info!(learnings = learned, "Session progress");
        }
        Ok(())
    }

    pub fn write_handoff(&self) -> Result<(PathBuf, Handoff)> {
        let handoff = self.session.handoff();
        let path = self.learning_dir.join(format!(
            "CLEAN_HANDOFF_{}.json",
            Local::now().format("%Y%m%d_%H%M%S")
        ));
        write_pretty_json(&path, &handoff)?;
        info!(
            file = %path.display(),
            learnings = handoff.session_summary.learnings_captured,
            "Handoff written"
        );
        Ok((path, handoff))
    }

    /// Process events until `shutdown` resolves, then write the handoff
    pub async fn run<F>(
        mut self,
        mut rx: UnboundedReceiver<ChangeEvent>,
        shutdown: F,
    ) -> Result<(PathBuf, Handoff)>
    where
        F: Future<Output = ()>,
    {
        let period = Duration::from_secs(self.settings.session_interval_secs.max(1));
        let poll = Duration::from_millis(self.settings.poll_interval_ms);
        let mut status_tick = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        let mut closed = false;
        tokio::pin!(shutdown);

        info!(session = %self.session.id, model = %self.model, "Learner running");
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = status_tick.tick() => {
                    if let Err(e) = self.write_session_status() {
                        error!(error = %e, "Session status update failed");
                    }
                }
                // An analysis in flight is finished before the next tick or shutdown
                next = tokio::time::timeout(poll, rx.recv()), if !closed => match next {
                    Ok(Some(event)) => {
                        self.handle_event(event).await;
                    }
                    Ok(None) => {
                        debug!("Change channel closed");
                        closed = true;
                    }
                    Err(_) => {}
                },
            }
        }

        info!("Learner shutting down");
        self.write_handoff()
    }
}

// Project status tracking
//
// Inspects the project tree for known components, derives the development
// phase and next priorities, and writes status/README/report files.

mod report;

pub use report::{render_progress_report, render_readme};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, warn};

use crate::config::constants::COMPONENT_READY_BYTES;
use crate::config::ProjectPaths;
use crate::family::Member;
use crate::training::{category_files, load_json_array, MemberModelStatus, ModelVersionManager};

/// Known components and the file that marks each one as built
pub const COMPONENTS: [(&str, &str); 6] = [
    ("Market Data Pipeline", "data_pipeline/unified_data.py"),
    ("AI Family Communication", "ai_family/ai_orchestrator.py"),
    ("Trading Engine", "ai_family/nyala/trading_engine.py"),
    ("Paper Trading", "trading_systems/paper_trader.py"),
    ("System Monitor", "monitoring/web_monitor.py"),
    (
        "Training System",
        "ai_family/claudae/training/claudae_training_collector.py",
    ),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComponentState {
    Ready,
    Partial,
    Missing,
}

impl ComponentState {
    /// Ready if the file holds more than a stub, Partial if it merely exists
    pub fn of_file(path: &Path) -> Self {
        match fs::metadata(path) {
            Ok(meta) if meta.len() > COMPONENT_READY_BYTES => ComponentState::Ready,
            Ok(_) => ComponentState::Partial,
            Err(_) => ComponentState::Missing,
        }
    }

    pub fn marker(&self) -> &'static str {
        match self {
            ComponentState::Ready => "✅",
            ComponentState::Partial => "⏳",
            ComponentState::Missing => "❌",
        }
    }
}

/// Component states in their fixed order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Components(pub Vec<(String, ComponentState)>);

impl Components {
    pub fn get(&self, name: &str) -> Option<ComponentState> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, s)| *s)
    }

    pub fn ready_count(&self) -> usize {
        self.0
            .iter()
            .filter(|(_, s)| *s == ComponentState::Ready)
            .count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, ComponentState)> {
        self.0.iter()
    }
}

impl Serialize for Components {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, state) in &self.0 {
            map.serialize_entry(name, state)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectStatus {
    pub timestamp: DateTime<Local>,
    pub phase: String,
    pub components: Components,
    pub ai_family: BTreeMap<Member, MemberModelStatus>,
    pub recent_changes: Vec<String>,
    pub next_priorities: Vec<String>,
    pub training_examples: usize,
    pub last_training_session: Option<String>,
}

pub fn current_phase(components: &Components) -> &'static str {
    match components.ready_count() {
        n if n >= 5 => "Phase 2: AI Training & Integration",
        n if n >= 3 => "Phase 1: Foundation Complete",
        _ => "Phase 1: Foundation Building",
    }
}

/// At most three next steps, derived from what is not yet ready
pub fn next_priorities(components: &Components) -> Vec<String> {
    let mut tasks = Vec::new();
    if components.get("Market Data Pipeline") != Some(ComponentState::Ready) {
        tasks.push("Complete market data pipeline");
    }
    if components.get("Trading Engine") != Some(ComponentState::Ready) {
        tasks.push("Integrate NYALA trading engine");
    }
    if components.ready_count() >= 4 {
        tasks.push("Deploy to production server");
        tasks.push("Begin live paper trading");
    }
    tasks.into_iter().take(3).map(String::from).collect()
}

pub struct ProjectManager {
    paths: ProjectPaths,
}

impl ProjectManager {
    pub fn new(paths: ProjectPaths) -> Self {
        Self { paths }
    }

    pub fn root(&self) -> &Path {
        &self.paths.root
    }

    pub fn check_components(&self) -> Components {
        Components(
            COMPONENTS
                .iter()
                .map(|(name, rel)| {
                    (
                        name.to_string(),
                        ComponentState::of_file(&self.paths.root.join(rel)),
                    )
                })
                .collect(),
        )
    }

    /// Subjects of the last five commits; empty outside a git checkout
    pub fn recent_changes(&self) -> Vec<String> {
        let output = Command::new("git")
            .args(["log", "--oneline", "-n", "5"])
            .current_dir(&self.paths.root)
            .output();

        match output {
            Ok(out) if out.status.success() => String::from_utf8_lossy(&out.stdout)
                .lines()
                .filter_map(|line| line.split_once(' ').map(|(_, subject)| subject.to_string()))
                .collect(),
            Ok(out) => {
                debug!(stderr = %String::from_utf8_lossy(&out.stderr).trim(), "git log failed");
                Vec::new()
            }
            Err(e) => {
                debug!(error = %e, "git not available");
                Vec::new()
            }
        }
    }

    fn training_examples(&self) -> usize {
        category_files(&self.paths.training_dir().join("code_examples"))
            .map(|files| files.iter().map(|(_, p)| load_json_array(p).len()).sum())
            .unwrap_or(0)
    }

    /// Newest session file under the training directory, by modification time
    fn last_training_session(&self) -> Option<String> {
        let dir = self.paths.training_dir().join("sessions");
        fs::read_dir(dir)
            .ok()?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "json"))
            .filter_map(|e| {
                let modified = e.metadata().ok()?.modified().ok()?;
                Some((modified, e.path()))
            })
            .max_by_key(|(modified, _)| *modified)
            .and_then(|(_, path)| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
    }

    /// Collect the current status (does not write the status file)
    pub fn snapshot(&self) -> ProjectStatus {
        let components = self.check_components();
        let ai_family = match ModelVersionManager::new(self.paths.clone())
            .and_then(|manager| manager.status(None))
        {
            Ok(status) => status,
            Err(e) => {
                warn!(error = %e, "Could not read model versions");
                BTreeMap::new()
            }
        };

        ProjectStatus {
            timestamp: Local::now(),
            phase: current_phase(&components).to_string(),
            next_priorities: next_priorities(&components),
            components,
            ai_family,
            recent_changes: self.recent_changes(),
            training_examples: self.training_examples(),
            last_training_session: self.last_training_session(),
        }
    }

    /// Snapshot and save to `project_memory/current_status.json`
    pub fn update_status(&self) -> Result<ProjectStatus> {
        let status = self.snapshot();
        let path = self.paths.memory_dir().join("current_status.json");
        crate::training::write_pretty_json(&path, &status)?;
        info!(path = %path.display(), "Project status updated");
        Ok(status)
    }

    /// Regenerate README.md from the current status
    pub fn write_readme(&self) -> Result<PathBuf> {
        let status = self.update_status()?;
        let path = self.paths.root.join("README.md");
        fs::write(&path, render_readme(&status))
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }

    /// Write today's progress report and return its text
    pub fn progress_report(&self) -> Result<(PathBuf, String)> {
        let status = self.update_status()?;
        let report = render_progress_report(&status);

        let dir = self.paths.docs_dir();
        fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;
        let path = dir.join(format!(
            "progress_report_{}.md",
            status.timestamp.format("%Y%m%d")
        ));
        fs::write(&path, &report).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok((path, report))
    }

    /// Stage everything and commit. Returns false if git refuses.
    pub fn commit(&self, message: Option<&str>) -> Result<bool> {
        let message = match message {
            Some(m) => m.to_string(),
            None => {
                let status = self.update_status()?;
                format!(
                    "CLAUDAE Auto-commit: {} components ready",
                    status.components.ready_count()
                )
            }
        };

        for args in [vec!["add", "."], vec!["commit", "-m", message.as_str()]] {
            let ok = Command::new("git")
                .args(&args)
                .current_dir(&self.paths.root)
                .status()
                .map(|s| s.success())
                .unwrap_or(false);
            if !ok {
                warn!(command = %args.join(" "), "git command failed");
                return Ok(false);
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(root: &Path, rel: &str, bytes: usize) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "x".repeat(bytes)).unwrap();
    }

    #[test]
    fn test_component_states() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "data_pipeline/unified_data.py", 500);
        touch(dir.path(), "ai_family/ai_orchestrator.py", 100);

        let manager = ProjectManager::new(ProjectPaths::new(dir.path()));
        let components = manager.check_components();

        assert_eq!(components.0.len(), 6);
        assert_eq!(components.0[0].0, "Market Data Pipeline");
        assert_eq!(
            components.get("Market Data Pipeline"),
            Some(ComponentState::Ready)
        );
        // exactly 100 bytes is not enough
        assert_eq!(
            components.get("AI Family Communication"),
            Some(ComponentState::Partial)
        );
        assert_eq!(components.get("Paper Trading"), Some(ComponentState::Missing));
    }

    #[test]
    fn test_phase_thresholds() {
        let mk = |ready: usize| {
            Components(
                (0..6)
                    .map(|i| {
                        let state = if i < ready {
                            ComponentState::Ready
                        } else {
                            ComponentState::Missing
                        };
                        (format!("c{}", i), state)
                    })
                    .collect(),
            )
        };
        assert_eq!(current_phase(&mk(2)), "Phase 1: Foundation Building");
        assert_eq!(current_phase(&mk(3)), "Phase 1: Foundation Complete");
        assert_eq!(current_phase(&mk(5)), "Phase 2: AI Training & Integration");
    }

    #[test]
    fn test_priorities_capped_at_three() {
        let components = Components(vec![
            ("Market Data Pipeline".into(), ComponentState::Partial),
            ("Trading Engine".into(), ComponentState::Missing),
            ("a".into(), ComponentState::Ready),
            ("b".into(), ComponentState::Ready),
            ("c".into(), ComponentState::Ready),
            ("d".into(), ComponentState::Ready),
        ]);
        let tasks = next_priorities(&components);
        assert_eq!(
            tasks,
            vec![
                "Complete market data pipeline",
                "Integrate NYALA trading engine",
                "Deploy to production server"
            ]
        );
    }

    #[test]
    fn test_components_serialize_in_order() {
        let components = Components(vec![
            ("Zeta".into(), ComponentState::Ready),
            ("Alpha".into(), ComponentState::Missing),
        ]);
        let json = serde_json::to_string(&components).unwrap();
        assert_eq!(json, r#"{"Zeta":"Ready","Alpha":"Missing"}"#);
    }

    #[test]
    fn test_update_status_writes_memory_file() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ProjectManager::new(ProjectPaths::new(dir.path()));

        let status = manager.update_status().unwrap();
        assert_eq!(status.ai_family.len(), 3);

        let saved: serde_json::Value = crate::training::read_json(
            &dir.path().join("project_memory/current_status.json"),
        )
        .unwrap();
        assert_eq!(saved["phase"], "Phase 1: Foundation Building");
        assert_eq!(saved["components"]["Trading Engine"], "Missing");
    }
}

// Foundation checks, backup and layout
//
// Run before anything else touches an existing project: validate that the
// model server and project tree are usable, snapshot `project_memory`, and
// lay out `claudae_foundation/`.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::config::constants::{FOUNDATION_CHECK_TIMEOUT_SECS, MIGRATION_TIMEOUT_SECS};
use crate::config::{Config, ProjectPaths};
use crate::migration::discover_documents;
use crate::ollama::{model_available, ModelRequest, ModelServer};
use crate::project::ProjectManager;
use crate::training::write_pretty_json;

pub const FOUNDATION_SUBDIRS: [&str; 5] =
    ["config", "logs", "staging", "training_data", "vector_store"];

const BACKUP_COMMIT_MESSAGE: &str = "CLAUDAE Foundation: Pre-deployment state";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemValidation {
    pub component: String,
    pub status: bool,
    pub message: String,
    pub timestamp: DateTime<Local>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl SystemValidation {
    fn pass(component: &str, message: impl Into<String>, details: Option<Value>) -> Self {
        Self {
            component: component.to_string(),
            status: true,
            message: message.into(),
            timestamp: Local::now(),
            details,
        }
    }

    fn fail(component: &str, message: impl Into<String>) -> Self {
        Self {
            component: component.to_string(),
            status: false,
            message: message.into(),
            timestamp: Local::now(),
            details: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub timestamp: DateTime<Local>,
    pub validations: Vec<SystemValidation>,
    pub passed: usize,
    pub total: usize,
    pub overall_status: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupReport {
    pub start_time: DateTime<Local>,
    pub end_time: DateTime<Local>,
    pub backup_location: PathBuf,
    pub files_backed_up: usize,
    pub total_size_mb: f64,
    pub backup_integrity: bool,
    pub git_commit: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetupReport {
    pub start_time: DateTime<Local>,
    pub end_time: DateTime<Local>,
    pub components_created: Vec<String>,
    pub infrastructure_ready: bool,
}

/// SHA-256 of every file under `dir`, keyed by relative path
pub fn hash_tree(dir: &Path) -> Result<BTreeMap<PathBuf, String>> {
    let mut hashes = BTreeMap::new();
    for entry in WalkDir::new(dir) {
        let entry = entry.with_context(|| format!("Failed to walk {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let bytes = fs::read(entry.path())
            .with_context(|| format!("Failed to read {}", entry.path().display()))?;
        let relative = entry
            .path()
            .strip_prefix(dir)
            .context("Walked outside the hashed directory")?;
        hashes.insert(relative.to_path_buf(), format!("{:x}", Sha256::digest(&bytes)));
    }
    Ok(hashes)
}

/// Copy files from `from` into `to`, overwriting what is already there.
/// Returns (files, bytes).
fn copy_tree(from: &Path, to: &Path) -> Result<(usize, u64)> {
    let mut files = 0;
    let mut bytes = 0;
    for entry in WalkDir::new(from) {
        let entry = entry.with_context(|| format!("Failed to walk {}", from.display()))?;
        let relative = entry
            .path()
            .strip_prefix(from)
            .context("Walked outside the source directory")?;
        let target = to.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .with_context(|| format!("Failed to create {}", target.display()))?;
        } else if entry.file_type().is_file() {
            bytes += fs::copy(entry.path(), &target)
                .with_context(|| format!("Failed to copy {}", entry.path().display()))?;
            files += 1;
        }
    }
    Ok((files, bytes))
}

pub struct Foundation {
    server: Arc<dyn ModelServer>,
    paths: ProjectPaths,
    model: String,
    base_url: String,
}

impl Foundation {
    pub fn new(server: Arc<dyn ModelServer>, config: &Config) -> Self {
        Self {
            server,
            paths: config.paths(),
            model: config.family.claudae.model.clone(),
            base_url: config.model_server.base_url.clone(),
        }
    }

    pub fn foundation_dir(&self) -> PathBuf {
        self.paths.foundation_dir()
    }

    async fn check_model(&self) -> SystemValidation {
        const NAME: &str = "CLAUDAE Connection";
        let listing = match self.server.list_models().await {
            Ok(listing) => listing,
            Err(e) => {
                return SystemValidation::fail(NAME, format!("Model server not accessible: {}", e))
            }
        };
        if !model_available(&listing, &self.model) {
            let message = format!("CLAUDAE model ({}) not found", self.model);
            return SystemValidation::fail(NAME, message);
        }

        let request = ModelRequest::new(
            &self.model,
            "Respond with 'CLAUDAE OPERATIONAL' if you can understand this.",
            Duration::from_secs(FOUNDATION_CHECK_TIMEOUT_SECS),
        );
        match self.server.generate(&request).await {
            Ok(reply) if reply.text.to_lowercase().contains("operational") => {
                SystemValidation::pass(
                    NAME,
                    "CLAUDAE connection validated successfully",
                    Some(json!({
                        "model": self.model,
                        "response_secs": reply.elapsed.as_secs_f64(),
                    })),
                )
            }
            Ok(_) => SystemValidation::fail(NAME, "CLAUDAE test query failed"),
            Err(e) => SystemValidation::fail(NAME, format!("CLAUDAE test query failed: {}", e)),
        }
    }

    fn check_structure(&self) -> SystemValidation {
        const NAME: &str = "Project Structure";
        let required = [
            self.paths.ai_family_dir(),
            self.paths.root.join("monitoring"),
            self.paths.memory_dir(),
        ];
        let missing: Vec<String> = required
            .iter()
            .filter(|dir| !dir.is_dir())
            .map(|dir| dir.display().to_string())
            .collect();
        if missing.is_empty() {
            SystemValidation::pass(NAME, "Project structure validated successfully", None)
        } else {
            SystemValidation::fail(NAME, format!("Missing directories: {}", missing.join(", ")))
        }
    }

    fn check_documents(&self) -> SystemValidation {
        const NAME: &str = "Existing Documentation";
        let documents = discover_documents(&self.paths.root);
        if documents.is_empty() {
            return SystemValidation::fail(NAME, "No documentation files found to preserve");
        }

        let mut file_types: BTreeMap<String, usize> = BTreeMap::new();
        let mut total_size = 0;
        for doc in &documents {
            total_size += fs::metadata(doc).map(|m| m.len()).unwrap_or(0);
            let ext = doc
                .extension()
                .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
                .unwrap_or_default();
            *file_types.entry(ext).or_insert(0) += 1;
        }
        SystemValidation::pass(
            NAME,
            format!("Found {} documentation files to preserve", documents.len()),
            Some(json!({
                "total_files": documents.len(),
                "total_size_mb": megabytes(total_size),
                "file_types": file_types,
            })),
        )
    }

    fn check_git(&self) -> SystemValidation {
        const NAME: &str = "Git Repository";
        if !self.paths.root.join(".git").exists() {
            return SystemValidation::fail(NAME, "Git repository not initialized");
        }
        let output = Command::new("git")
            .args(["status", "--porcelain"])
            .current_dir(&self.paths.root)
            .output();
        match output {
            Ok(out) if out.status.success() => {
                let uncommitted = String::from_utf8_lossy(&out.stdout).lines().count();
                SystemValidation::pass(
                    NAME,
                    "Git repository validated successfully",
                    Some(json!({
                        "uncommitted_files": uncommitted,
                        "status": if uncommitted == 0 { "clean" } else { "has_changes" },
                    })),
                )
            }
            Ok(_) => SystemValidation::fail(NAME, "Git repository error"),
            Err(e) => SystemValidation::fail(NAME, format!("Git validation failed: {}", e)),
        }
    }

    fn check_permissions(&self) -> SystemValidation {
        const NAME: &str = "Permissions";
        let dir = self.foundation_dir();
        let file = dir.join("permission_test.txt");
        let scratch = dir.join("test_dir");
        let result = fs::create_dir_all(&dir)
            .and_then(|_| fs::write(&file, "permission test"))
            .and_then(|_| fs::remove_file(&file))
            .and_then(|_| fs::create_dir(&scratch))
            .and_then(|_| fs::remove_dir(&scratch));
        match result {
            Ok(()) => SystemValidation::pass(NAME, "Permissions validated successfully", None),
            Err(e) => {
                SystemValidation::fail(NAME, format!("Insufficient write permissions: {}", e))
            }
        }
    }

    /// Run every check and write `validation_results.json`
    pub async fn validate(&self) -> Result<ValidationReport> {
        let validations = vec![
            self.check_model().await,
            self.check_structure(),
            self.check_documents(),
            self.check_git(),
            self.check_permissions(),
        ];
        for v in &validations {
            if v.status {
                info!(component = %v.component, "{}", v.message);
            } else {
                warn!(component = %v.component, "{}", v.message);
            }
        }

        let passed = validations.iter().filter(|v| v.status).count();
        let report = ValidationReport {
            timestamp: Local::now(),
            passed,
            total: validations.len(),
            overall_status: passed == validations.len(),
            validations,
        };
        write_pretty_json(&self.foundation_dir().join("validation_results.json"), &report)?;
        Ok(report)
    }

    /// Snapshot `project_memory` into `original_state_backup/`, verify it by
    /// hash, commit the project and write `backup_report.json`
    pub fn backup(&self) -> Result<BackupReport> {
        let start_time = Local::now();
        let backup_dir = self.foundation_dir().join("original_state_backup");
        fs::create_dir_all(&backup_dir)
            .with_context(|| format!("Failed to create {}", backup_dir.display()))?;

        let memory = self.paths.memory_dir();
        let memory_backup = backup_dir.join("project_memory");
        let (files_backed_up, bytes, backup_integrity) = if memory.is_dir() {
            let (files, bytes) = copy_tree(&memory, &memory_backup)?;
            let original = hash_tree(&memory)?;
            let copy = hash_tree(&memory_backup)?;
            (files, bytes, original == copy)
        } else {
            warn!(dir = %memory.display(), "No project memory to back up");
            (0, 0, false)
        };

        let git_commit =
            ProjectManager::new(self.paths.clone()).commit(Some(BACKUP_COMMIT_MESSAGE))?;
        if !git_commit {
            warn!("Git commit failed (may be no changes)");
        }

        let report = BackupReport {
            start_time,
            end_time: Local::now(),
            backup_location: backup_dir.clone(),
            files_backed_up,
            total_size_mb: megabytes(bytes),
            backup_integrity,
            git_commit,
        };
        write_pretty_json(&backup_dir.join("backup_report.json"), &report)?;
        info!(files = files_backed_up, integrity = backup_integrity, "Backup created");
        Ok(report)
    }

    /// Create the foundation directories, config and status files
    pub fn setup(&self) -> Result<SetupReport> {
        let start_time = Local::now();
        let dir = self.foundation_dir();
        let mut components_created = Vec::new();

        for sub in FOUNDATION_SUBDIRS {
            let path = dir.join(sub);
            fs::create_dir_all(&path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            components_created.push(format!("Directory: {}", sub));
        }

        let foundation_config = json!({
            "claudae_memory_config": {
                "version": "1.0",
                "deployment_phase": "foundation",
                "project_root": self.paths.root,
                "foundation_dir": dir,
                "claudae": {
                    "model": self.model,
                    "base_url": self.base_url,
                    "timeout": MIGRATION_TIMEOUT_SECS,
                    "temperature": 0.3,
                },
                "safety": {
                    "backup_before_changes": true,
                    "validate_operations": true,
                    "rollback_on_failure": true,
                    "max_file_size_mb": 50,
                },
                "training": {
                    "enabled": true,
                    "collection_enabled": false,
                    "training_data_dir": dir.join("training_data"),
                },
            }
        });
        write_pretty_json(
            &dir.join("config").join("foundation_config.json"),
            &foundation_config,
        )?;
        components_created.push("Configuration files".to_string());

        let status = json!({
            "deployment_phase": "foundation",
            "phase_1_complete": false,
            "phase_2_ready": false,
            "last_update": Local::now().to_rfc3339(),
            "system_status": "foundation_setup",
        });
        write_pretty_json(&dir.join("system_status.json"), &status)?;
        components_created.push("Status tracking".to_string());

        info!(dir = %dir.display(), "Foundation infrastructure ready");
        Ok(SetupReport {
            start_time,
            end_time: Local::now(),
            components_created,
            infrastructure_ready: true,
        })
    }
}

fn megabytes(bytes: u64) -> f64 {
    (bytes as f64 / 1024.0 / 1024.0 * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ModelError;
    use crate::ollama::fake::ScriptedServer;
    use crate::training::read_json;

    fn project(server: ScriptedServer) -> (tempfile::TempDir, Foundation) {
        let dir = tempfile::tempdir().unwrap();
        for rel in ["ai_family/claudae", "monitoring", "project_memory/sessions"] {
            fs::create_dir_all(dir.path().join(rel)).unwrap();
        }
        fs::write(dir.path().join("project_memory/MASTER_BLUEPRINT.md"), "# Plan").unwrap();
        fs::write(dir.path().join("project_memory/sessions/s1.json"), "{}").unwrap();
        let config = Config::with_project_root(dir.path().to_path_buf());
        (dir, Foundation::new(Arc::new(server), &config))
    }

    #[tokio::test]
    async fn test_validate_reports_each_check() {
        let server = ScriptedServer::constant("CLAUDAE OPERATIONAL").with_models(&["mistral:7b"]);
        let (dir, foundation) = project(server);

        let report = foundation.validate().await.unwrap();
        let status: BTreeMap<_, _> = report
            .validations
            .iter()
            .map(|v| (v.component.as_str(), v.status))
            .collect();
        assert!(status["CLAUDAE Connection"]);
        assert!(status["Project Structure"]);
        assert!(status["Existing Documentation"]);
        assert!(!status["Git Repository"]);
        assert!(status["Permissions"]);
        assert_eq!(report.passed, 4);
        assert!(!report.overall_status);

        let saved: ValidationReport =
            read_json(&dir.path().join("claudae_foundation/validation_results.json")).unwrap();
        assert_eq!(saved.total, 5);
        assert!(!dir.path().join("claudae_foundation/test_dir").exists());
    }

    #[tokio::test]
    async fn test_model_check_failures() {
        let server = ScriptedServer::constant("hi").with_models(&["llama2:13b"]);
        let (_dir, foundation) = project(server);
        let check = foundation.check_model().await;
        assert!(!check.status);
        assert!(check.message.contains("mistral:7b"));

        let server = ScriptedServer::constant("no idea").with_models(&["mistral:7b"]);
        let (_dir, foundation) = project(server);
        assert_eq!(foundation.check_model().await.message, "CLAUDAE test query failed");

        let server = ScriptedServer::new(|_| Err(ModelError::Timeout { secs: 30 }))
            .with_models(&["mistral:7b"]);
        let (_dir, foundation) = project(server);
        assert!(!foundation.check_model().await.status);

        let (_dir, foundation) = project(ScriptedServer::offline());
        assert!(foundation
            .check_model()
            .await
            .message
            .starts_with("Model server not accessible"));
    }

    #[test]
    fn test_missing_structure_is_named() {
        let (dir, foundation) = project(ScriptedServer::offline());
        fs::remove_dir_all(dir.path().join("monitoring")).unwrap();
        let check = foundation.check_structure();
        assert!(!check.status);
        assert!(check.message.contains("monitoring"));
    }

    #[test]
    fn test_backup_copies_and_verifies() {
        let (dir, foundation) = project(ScriptedServer::offline());
        let report = foundation.backup().unwrap();
        assert_eq!(report.files_backed_up, 2);
        assert!(report.backup_integrity);

        let backup = dir.path().join("claudae_foundation/original_state_backup");
        assert_eq!(
            fs::read_to_string(backup.join("project_memory/MASTER_BLUEPRINT.md")).unwrap(),
            "# Plan"
        );
        assert!(backup.join("backup_report.json").exists());

        // a second run overwrites in place
        fs::write(dir.path().join("project_memory/MASTER_BLUEPRINT.md"), "# Plan v2").unwrap();
        assert!(foundation.backup().unwrap().backup_integrity);
    }

    #[test]
    fn test_hash_tree_detects_drift() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        fs::write(a.path().join("x.md"), "same").unwrap();
        fs::write(b.path().join("x.md"), "same").unwrap();
        assert_eq!(hash_tree(a.path()).unwrap(), hash_tree(b.path()).unwrap());
        fs::write(b.path().join("x.md"), "changed").unwrap();
        assert_ne!(hash_tree(a.path()).unwrap(), hash_tree(b.path()).unwrap());
    }

    #[test]
    fn test_setup_lays_out_foundation() {
        let (dir, foundation) = project(ScriptedServer::offline());
        let report = foundation.setup().unwrap();
        assert!(report.infrastructure_ready);
        assert_eq!(report.components_created.len(), 7);

        let root = dir.path().join("claudae_foundation");
        for sub in FOUNDATION_SUBDIRS {
            assert!(root.join(sub).is_dir(), "{}", sub);
        }
        let config: Value = read_json(&root.join("config/foundation_config.json")).unwrap();
        assert_eq!(config["claudae_memory_config"]["claudae"]["model"], "mistral:7b");
        let status: Value = read_json(&root.join("system_status.json")).unwrap();
        assert_eq!(status["system_status"], "foundation_setup");
    }
}

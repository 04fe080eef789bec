// Model version manager
//
// Keeps numbered versions per member under `versions/<ai>/v<N>/`, a
// `production/` copy under `models/<ai>/`, and a deployment log used for
// rollback. Weight training itself happens elsewhere: `train` only prepares
// the dataset and writes a training plan next to the version metadata.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{info, warn};
use walkdir::WalkDir;

use super::collector::category_files;
use super::json_store::{append_to_json_array, load_json_array, read_json, write_pretty_json};
use crate::config::ProjectPaths;
use crate::family::Member;
use crate::ollama::{GenerateOptions, ModelRequest, ModelServer};

/// Timeout for a single validation check
const CHECK_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionStatus {
    Created,
    TrainingPrepared,
    Validated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingParams {
    pub epochs: u32,
    pub batch_size: u32,
    pub learning_rate: f64,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            epochs: 3,
            batch_size: 4,
            learning_rate: 2e-5,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub average_score: f64,
    pub pass_rate: f64,
    pub total_tests: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub score: f64,
    pub output: String,
    pub passed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionMetadata {
    pub version: String,
    pub ai_name: Member,
    pub base_model: String,
    pub created: DateTime<Local>,
    pub training_data_size: usize,
    /// Empty until the version has been validated
    #[serde(default)]
    pub performance_metrics: Option<PerformanceMetrics>,
    pub notes: String,
    pub status: VersionStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub training_params: Option<TrainingParams>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_results: Option<BTreeMap<String, CheckResult>>,
}

/// Written by `train` for an external trainer to pick up
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingPlan {
    pub ai_name: Member,
    pub version: String,
    pub base_model: String,
    pub dataset: PathBuf,
    pub examples: usize,
    pub params: TrainingParams,
    pub prepared: DateTime<Local>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentEntry {
    pub timestamp: DateTime<Local>,
    pub version: String,
    pub action: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberModelStatus {
    pub total_versions: usize,
    pub latest_version: Option<String>,
    pub production_status: String,
    pub training_examples: usize,
}

/// One training example reshaped for fine-tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetRow {
    pub input: String,
    pub output: String,
    pub metadata: Value,
}

/// Fixed checks: (name, prompt, substring a passing answer contains)
const VALIDATION_CHECKS: [(&str, &str, &str); 3] = [
    ("code_generation", "Generate a function", "def "),
    ("error_handling", "Handle API error", "try"),
    ("project_knowledge", "HONEY DUO WEALTH", "family"),
];

fn version_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^v(\d+)$").ok()).as_ref()
}

/// Parse "v12" into 12
pub fn parse_version(name: &str) -> Option<u32> {
    version_regex()?
        .captures(name)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

pub struct ModelVersionManager {
    paths: ProjectPaths,
}

impl ModelVersionManager {
    pub fn new(paths: ProjectPaths) -> Result<Self> {
        let mut dirs = vec![
            paths.training_data_dir().join("datasets"),
            paths.training_data_dir().join("preprocessed"),
        ];
        for member in Member::ALL {
            dirs.push(paths.models_dir().join(member.key()));
            dirs.push(paths.versions_dir().join(member.key()));
        }
        for dir in dirs {
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        Ok(Self { paths })
    }

    fn version_dir(&self, ai: Member, version: &str) -> PathBuf {
        self.paths.versions_dir().join(ai.key()).join(version)
    }

    fn production_dir(&self, ai: Member) -> PathBuf {
        self.paths.models_dir().join(ai.key()).join("production")
    }

    fn deployment_log_path(&self, ai: Member) -> PathBuf {
        self.paths.models_dir().join(ai.key()).join("deployment_log.json")
    }

    /// Version numbers present for a member, ascending
    pub fn versions(&self, ai: Member) -> Result<Vec<u32>> {
        let dir = self.paths.versions_dir().join(ai.key());
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut found = Vec::new();
        for entry in fs::read_dir(&dir).with_context(|| format!("Failed to list {}", dir.display()))? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(n) = entry.file_name().to_str().and_then(parse_version) {
                found.push(n);
            }
        }
        found.sort_unstable();
        Ok(found)
    }

    pub fn load_metadata(&self, ai: Member, version: &str) -> Result<VersionMetadata> {
        let path = self.version_dir(ai, version).join("metadata.json");
        if !path.exists() {
            bail!("{} has no version {}", ai, version);
        }
        read_json(&path)
    }

    fn save_metadata(&self, metadata: &VersionMetadata) -> Result<()> {
        let path = self
            .version_dir(metadata.ai_name, &metadata.version)
            .join("metadata.json");
        write_pretty_json(&path, metadata)
    }

    /// Reshape every collected code example into fine-tuning rows
    pub fn prepare_dataset(&self, ai: Member) -> Result<(PathBuf, usize)> {
        let mut rows = Vec::new();
        for (_, path) in category_files(&self.paths.training_dir().join("code_examples"))? {
            for example in load_json_array(&path) {
                rows.push(dataset_row(&example));
            }
        }

        let file = self.paths.training_data_dir().join("datasets").join(format!(
            "{}_training_{}.json",
            ai.key(),
            Local::now().format("%Y%m%d")
        ));
        write_pretty_json(&file, &rows)?;
        info!(ai = %ai, examples = rows.len(), path = %file.display(), "Prepared training dataset");
        Ok((file, rows.len()))
    }

    /// Create the next numbered version for a member
    pub fn create_version(&self, ai: Member, base_model: &str, notes: &str) -> Result<VersionMetadata> {
        let next = self.versions(ai)?.last().copied().unwrap_or(0) + 1;
        let metadata = VersionMetadata {
            version: format!("v{}", next),
            ai_name: ai,
            base_model: base_model.to_string(),
            created: Local::now(),
            training_data_size: 0,
            performance_metrics: None,
            notes: notes.to_string(),
            status: VersionStatus::Created,
            training_params: None,
            validation_results: None,
        };
        self.save_metadata(&metadata)?;
        info!(ai = %ai, version = %metadata.version, "Created model version");
        Ok(metadata)
    }

    /// Prepare the dataset and training plan for a version
    pub fn train(&self, ai: Member, version: &str, params: TrainingParams) -> Result<TrainingPlan> {
        let mut metadata = self.load_metadata(ai, version)?;
        let (dataset, examples) = self.prepare_dataset(ai)?;

        let plan = TrainingPlan {
            ai_name: ai,
            version: version.to_string(),
            base_model: metadata.base_model.clone(),
            dataset,
            examples,
            params: params.clone(),
            prepared: Local::now(),
        };
        write_pretty_json(&self.version_dir(ai, version).join("training_plan.json"), &plan)?;

        metadata.training_data_size = examples;
        metadata.training_params = Some(params);
        metadata.status = VersionStatus::TrainingPrepared;
        self.save_metadata(&metadata)?;
        Ok(plan)
    }

    /// Run the fixed checks against the version's base model
    pub async fn validate(
        &self,
        ai: Member,
        version: &str,
        server: &dyn ModelServer,
    ) -> Result<PerformanceMetrics> {
        let mut metadata = self.load_metadata(ai, version)?;

        let mut results = BTreeMap::new();
        for (name, prompt, expected) in VALIDATION_CHECKS {
            let request = ModelRequest::new(
                metadata.base_model.clone(),
                prompt,
                Duration::from_secs(CHECK_TIMEOUT_SECS),
            )
            .with_options(GenerateOptions::new(0.2, 256));

            let result = match server.generate(&request).await {
                Ok(reply) => {
                    let passed = reply.text.to_lowercase().contains(&expected.to_lowercase());
                    CheckResult {
                        score: if passed { 1.0 } else { 0.0 },
                        output: reply.text,
                        passed,
                    }
                }
                Err(e) => {
                    warn!(ai = %ai, check = name, error = %e, "Validation check failed");
                    CheckResult {
                        score: 0.0,
                        output: format!("Error: {}", e),
                        passed: false,
                    }
                }
            };
            results.insert(name.to_string(), result);
        }

        let metrics = performance_metrics(&results);
        metadata.performance_metrics = Some(metrics.clone());
        metadata.validation_results = Some(results);
        metadata.status = VersionStatus::Validated;
        self.save_metadata(&metadata)?;
        Ok(metrics)
    }

    /// Copy a version into production, backing up whatever was there
    pub fn deploy(&self, ai: Member, version: &str) -> Result<()> {
        let source = self.version_dir(ai, version);
        if !source.is_dir() {
            bail!("{} has no version {}", ai, version);
        }

        let production = self.production_dir(ai);
        if production.exists() {
            let backup = self.paths.models_dir().join(ai.key()).join(format!(
                "backup_{}",
                Local::now().format("%Y%m%d_%H%M")
            ));
            if backup.exists() {
                fs::remove_dir_all(&backup)
                    .with_context(|| format!("Failed to replace {}", backup.display()))?;
            }
            copy_dir(&production, &backup)?;
            fs::remove_dir_all(&production)
                .with_context(|| format!("Failed to clear {}", production.display()))?;
        }
        copy_dir(&source, &production)?;

        append_to_json_array(
            &self.deployment_log_path(ai),
            &DeploymentEntry {
                timestamp: Local::now(),
                version: version.to_string(),
                action: "deployed".to_string(),
            },
        )?;
        info!(ai = %ai, version, "Deployed to production");
        Ok(())
    }

    pub fn deployments(&self, ai: Member) -> Vec<DeploymentEntry> {
        load_json_array(&self.deployment_log_path(ai))
            .into_iter()
            .filter_map(|v| serde_json::from_value(v).ok())
            .collect()
    }

    /// Redeploy `target`, or the deployment before the current one
    pub fn rollback(&self, ai: Member, target: Option<&str>) -> Result<String> {
        let target = match target {
            Some(t) => t.to_string(),
            None => {
                let log = self.deployments(ai);
                if log.len() < 2 {
                    bail!("{} has no earlier deployment to roll back to", ai);
                }
                log[log.len() - 2].version.clone()
            }
        };
        self.deploy(ai, &target)?;
        info!(ai = %ai, version = %target, "Rolled back");
        Ok(target)
    }

    /// Version and deployment overview for one member or all of them
    pub fn status(&self, ai: Option<Member>) -> Result<BTreeMap<Member, MemberModelStatus>> {
        let training_examples = self.count_training_examples();
        let members: Vec<Member> = match ai {
            Some(m) => vec![m],
            None => Member::ALL.to_vec(),
        };

        let mut status = BTreeMap::new();
        for member in members {
            let versions = self.versions(member)?;
            let production_status = if self.production_dir(member).exists() {
                "Deployed"
            } else {
                "Not Deployed"
            };
            status.insert(
                member,
                MemberModelStatus {
                    total_versions: versions.len(),
                    latest_version: versions.last().map(|n| format!("v{}", n)),
                    production_status: production_status.to_string(),
                    training_examples,
                },
            );
        }
        Ok(status)
    }

    fn count_training_examples(&self) -> usize {
        match category_files(&self.paths.training_dir().join("code_examples")) {
            Ok(files) => files.iter().map(|(_, p)| load_json_array(p).len()).sum(),
            Err(e) => {
                warn!(error = %e, "Could not count training examples");
                0
            }
        }
    }
}

fn dataset_row(example: &Value) -> DatasetRow {
    let field = |key: &str| example.get(key).and_then(Value::as_str).unwrap_or("");
    DatasetRow {
        input: format!(
            "Context: {}\nCategory: {}",
            field("context"),
            field("category")
        ),
        output: field("code").to_string(),
        metadata: serde_json::json!({
            "reasoning": field("reasoning"),
            "tags": example.get("tags").cloned().unwrap_or_else(|| Value::Array(Vec::new())),
            "timestamp": field("timestamp"),
        }),
    }
}

fn performance_metrics(results: &BTreeMap<String, CheckResult>) -> PerformanceMetrics {
    if results.is_empty() {
        return PerformanceMetrics::default();
    }
    let total = results.len() as f64;
    PerformanceMetrics {
        average_score: results.values().map(|r| r.score).sum::<f64>() / total,
        pass_rate: results.values().filter(|r| r.passed).count() as f64 / total,
        total_tests: results.len(),
    }
}

/// Recursively copy `from` into a new directory `to`
fn copy_dir(from: &Path, to: &Path) -> Result<()> {
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
        } else {
            fs::copy(entry.path(), &target)
                .with_context(|| format!("Failed to copy {}", entry.path().display()))?;
        }
    }
    Ok(())
}

// Document migration
//
// Copies every project document into `claudae_foundation/migration`: a
// verbatim backup tree, then an `organized_docs/<content_type>/` copy headed
// with Claudae's analysis, plus a report and summary of the run.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use walkdir::WalkDir;

pub mod analysis;
pub mod review;

pub use analysis::{
    fallback_analysis, migration_prompt, parse_analysis, ContentType, DocumentAnalysis,
};
pub use review::ReviewGenerator;

use crate::config::constants::{MIGRATION_TEMPERATURE, MIGRATION_TIMEOUT_SECS};
use crate::config::Config;
use crate::ollama::{GenerateOptions, ModelRequest, ModelServer};
use crate::training::write_pretty_json;

const DOCUMENT_EXTENSIONS: [&str; 5] = ["md", "json", "yaml", "yml", "txt"];

const SKIPPED_DIRS: [&str; 6] = [
    "claudae_foundation",
    ".git",
    "venv",
    ".venv",
    "target",
    "node_modules",
];

pub const METADATA_HEADER_START: &str = "<!-- CLAUDAE Analysis Metadata";

/// Every document under `root` that migration picks up, sorted
pub fn discover_documents(root: &Path) -> Vec<PathBuf> {
    let mut documents: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| {
            let name = e.file_name().to_string_lossy();
            !(e.file_type().is_dir() && SKIPPED_DIRS.contains(&&*name))
        })
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .map(|ext| ext.to_string_lossy().to_lowercase())
                .map(|ext| DOCUMENT_EXTENSIONS.contains(&ext.as_str()))
                .unwrap_or(false)
        })
        .map(|e| e.into_path())
        .collect();
    documents.sort();
    documents
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationResult {
    pub original_path: PathBuf,
    pub migrated_path: Option<PathBuf>,
    pub analysis: DocumentAnalysis,
    pub success: bool,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationReport {
    pub start_time: DateTime<Local>,
    pub end_time: DateTime<Local>,
    pub documents_found: usize,
    pub documents_migrated: usize,
    pub claudae_analyses: usize,
    pub migration_results: Vec<MigrationResult>,
    pub success: bool,
    pub success_rate: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisPerformance {
    pub average_confidence: f64,
    pub average_processing_time: f64,
    pub total_processing_time: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationSummary {
    pub migration_date: DateTime<Local>,
    pub total_documents: usize,
    pub successful_migrations: usize,
    pub failed_migrations: usize,
    pub content_type_breakdown: BTreeMap<String, usize>,
    /// Importance bucketed as "N/10"
    pub importance_distribution: BTreeMap<String, usize>,
    pub claudae_performance: Option<AnalysisPerformance>,
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

pub fn summarize(results: &[MigrationResult]) -> MigrationSummary {
    let mut content_type_breakdown = BTreeMap::new();
    let mut importance_distribution = BTreeMap::new();
    for result in results.iter().filter(|r| r.success) {
        *content_type_breakdown
            .entry(result.analysis.content_type.to_string())
            .or_insert(0) += 1;
        let bucket = (result.analysis.importance_score * 10.0).floor() as u32;
        *importance_distribution
            .entry(format!("{}/10", bucket))
            .or_insert(0) += 1;
    }

    let claudae_performance = if results.is_empty() {
        None
    } else {
        let n = results.len() as f64;
        let total: f64 = results.iter().map(|r| r.analysis.processing_time).sum();
        Some(AnalysisPerformance {
            average_confidence: round_to(
                results.iter().map(|r| r.analysis.confidence).sum::<f64>() / n,
                3,
            ),
            average_processing_time: round_to(total / n, 3),
            total_processing_time: round_to(total, 2),
        })
    };

    let successful = results.iter().filter(|r| r.success).count();
    MigrationSummary {
        migration_date: Local::now(),
        total_documents: results.len(),
        successful_migrations: successful,
        failed_migrations: results.len() - successful,
        content_type_breakdown,
        importance_distribution,
        claudae_performance,
    }
}

/// Analysis header followed by the untouched original
pub fn annotated_document(path: &Path, content: &str, analysis: &DocumentAnalysis) -> String {
    format!(
        "{start}\n\
         File: {file}\n\
         Content Type: {kind}\n\
         Importance Score: {importance}\n\
         Key Topics: {topics}\n\
         Relationships: {relationships}\n\
         Summary: {summary}\n\
         CLAUDAE Confidence: {confidence}\n\
         Processing Time: {time:.2}s\n\
         Migration Date: {date}\n\
         -->\n\n{content}",
        start = METADATA_HEADER_START,
        file = path.display(),
        kind = analysis.content_type,
        importance = analysis.importance_score,
        topics = analysis.key_topics.join(", "),
        relationships = analysis.relationships.join(", "),
        summary = analysis.summary,
        confidence = analysis.confidence,
        time = analysis.processing_time,
        date = Local::now().to_rfc3339(),
    )
}

pub struct DocumentMigrator {
    server: Arc<dyn ModelServer>,
    model: String,
    timeout: Duration,
    root: PathBuf,
    migration_dir: PathBuf,
}

impl DocumentMigrator {
    pub fn new(server: Arc<dyn ModelServer>, config: &Config) -> Self {
        Self {
            server,
            model: config.family.claudae.model.clone(),
            timeout: Duration::from_secs(MIGRATION_TIMEOUT_SECS),
            root: config.project_root.clone(),
            migration_dir: config.paths().migration_dir(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn migration_dir(&self) -> &Path {
        &self.migration_dir
    }

    /// Ask the model to classify one document
    pub async fn analyze(&self, path: &Path, content: &str) -> DocumentAnalysis {
        let started = Instant::now();
        let request = ModelRequest::new(&self.model, migration_prompt(path, content), self.timeout)
            .with_options(GenerateOptions {
                temperature: Some(MIGRATION_TEMPERATURE),
                num_predict: None,
            });

        match self.server.generate(&request).await {
            Ok(reply) => parse_analysis(path, &reply.text, started.elapsed().as_secs_f64()),
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Document analysis failed; using path heuristics"
                );
                fallback_analysis(path, started.elapsed().as_secs_f64())
            }
        }
    }

    /// Copy each document to `phase2_backup/` keeping its relative path
    fn backup(&self, documents: &[PathBuf]) -> usize {
        let backup_dir = self.migration_dir.join("phase2_backup");
        let mut copied = 0;
        for doc in documents {
            let Ok(relative) = doc.strip_prefix(&self.root) else {
                continue;
            };
            let target = backup_dir.join(relative);
            let result = target
                .parent()
                .map(fs::create_dir_all)
                .transpose()
                .and_then(|_| fs::copy(doc, &target));
            match result {
                Ok(_) => copied += 1,
                Err(e) => warn!(path = %doc.display(), error = %e, "Failed to back up document"),
            }
        }
        info!(copied, dir = %backup_dir.display(), "Migration backup written");
        copied
    }

    fn write_migrated(
        &self,
        doc: &Path,
        content: &str,
        analysis: &DocumentAnalysis,
        taken: &mut HashSet<PathBuf>,
    ) -> Result<PathBuf> {
        let category_dir = self
            .migration_dir
            .join("organized_docs")
            .join(analysis.content_type.as_str());
        fs::create_dir_all(&category_dir)
            .with_context(|| format!("Failed to create {}", category_dir.display()))?;

        let stem = doc
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        let ext = doc
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();

        let mut target = category_dir.join(format!("{}_migrated{}", stem, ext));
        let mut n = 2;
        while taken.contains(&target) {
            target = category_dir.join(format!("{}_migrated_{}{}", stem, n, ext));
            n += 1;
        }

        fs::write(&target, annotated_document(doc, content, analysis))
            .with_context(|| format!("Failed to write {}", target.display()))?;
        taken.insert(target.clone());
        Ok(target)
    }

    /// Back up, analyse and file every document; writes
    /// `migration_report.json` and `migration_summary.json`
    pub async fn run(&self) -> Result<MigrationReport> {
        let start_time = Local::now();
        fs::create_dir_all(&self.migration_dir)
            .with_context(|| format!("Failed to create {}", self.migration_dir.display()))?;

        let documents = discover_documents(&self.root);
        info!(documents = documents.len(), "Starting document migration");
        self.backup(&documents);

        let mut results = Vec::with_capacity(documents.len());
        let mut analyses = 0;
        let mut taken = HashSet::new();
        for doc in &documents {
            let content = match fs::read_to_string(doc) {
                Ok(content) => content,
                Err(e) => {
                    error!(path = %doc.display(), error = %e, "Failed to read document");
                    results.push(MigrationResult {
                        original_path: doc.clone(),
                        migrated_path: None,
                        analysis: DocumentAnalysis {
                            file_path: doc.clone(),
                            content_type: ContentType::Error,
                            importance_score: 0.0,
                            key_topics: Vec::new(),
                            relationships: Vec::new(),
                            summary: format!("Error processing: {}", e),
                            confidence: 0.0,
                            processing_time: 0.0,
                        },
                        success: false,
                        error_message: Some(e.to_string()),
                    });
                    continue;
                }
            };

            let analysis = self.analyze(doc, &content).await;
            analyses += 1;

            let result = match self.write_migrated(doc, &content, &analysis, &mut taken) {
                Ok(path) => MigrationResult {
                    original_path: doc.clone(),
                    migrated_path: Some(path),
                    analysis,
                    success: true,
                    error_message: None,
                },
                Err(e) => {
                    error!(path = %doc.display(), error = %e, "Failed to migrate document");
                    MigrationResult {
                        original_path: doc.clone(),
                        migrated_path: None,
                        analysis,
                        success: false,
                        error_message: Some(format!("{:#}", e)),
                    }
                }
            };
            results.push(result);
        }

        write_pretty_json(
            &self.migration_dir.join("migration_summary.json"),
            &summarize(&results),
        )?;

        let migrated = results.iter().filter(|r| r.success).count();
        let report = MigrationReport {
            start_time,
            end_time: Local::now(),
            documents_found: documents.len(),
            documents_migrated: migrated,
            claudae_analyses: analyses,
            migration_results: results,
            success: migrated > 0,
            success_rate: migrated as f64 / documents.len().max(1) as f64,
        };
        write_pretty_json(&self.migration_dir.join("migration_report.json"), &report)?;

        info!(
            migrated,
            found = report.documents_found,
            "Document migration complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ollama::fake::ScriptedServer;
    use crate::training::read_json;

    fn project() -> (tempfile::TempDir, Config) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for (rel, body) in [
            ("project_memory/MASTER_BLUEPRINT.md", "# Blueprint\nFamily first."),
            ("project_memory/session_notes.md", "# Session 3"),
            ("ai_family/nyala/config.yaml", "model: mixtral"),
            ("ai_family/nyala/engine.py", "print('not a document')"),
            ("claudae_foundation/autonomous_learning/x.json", "{}"),
            (".git/description", "ignored"),
            ("venv/lib/readme.txt", "ignored"),
        ] {
            let path = root.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, body).unwrap();
        }
        let config = Config::with_project_root(root.to_path_buf());
        (dir, config)
    }

    #[test]
    fn test_discover_skips_own_and_tool_dirs() {
        let (dir, _config) = project();
        let found: Vec<_> = discover_documents(dir.path())
            .into_iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            found,
            vec![
                PathBuf::from("ai_family/nyala/config.yaml"),
                PathBuf::from("project_memory/MASTER_BLUEPRINT.md"),
                PathBuf::from("project_memory/session_notes.md"),
            ]
        );
    }

    #[tokio::test]
    async fn test_run_files_documents_by_content_type() {
        let (dir, config) = project();
        let server = ScriptedServer::new(|req| {
            if req.prompt.contains("MASTER_BLUEPRINT") {
                Ok(r#"{"content_type": "blueprint", "importance_score": 0.93, "confidence": 0.9}"#.into())
            } else if req.prompt.contains("config.yaml") {
                Ok(r#"{"content_type": "config", "importance_score": 0.4, "confidence": 0.7}"#.into())
            } else {
                Ok("This reads like a session log.".into())
            }
        });
        let server = Arc::new(server);
        let migrator = DocumentMigrator::new(server.clone(), &config);

        let report = migrator.run().await.unwrap();
        assert_eq!(report.documents_found, 3);
        assert_eq!(report.documents_migrated, 3);
        assert_eq!(report.claudae_analyses, 3);
        assert_eq!(report.success_rate, 1.0);
        assert!(server
            .calls()
            .iter()
            .all(|c| c.options.temperature == Some(MIGRATION_TEMPERATURE)));

        let migration = dir.path().join("claudae_foundation/migration");
        let blueprint = fs::read_to_string(
            migration.join("organized_docs/blueprint/MASTER_BLUEPRINT_migrated.md"),
        )
        .unwrap();
        assert!(blueprint.starts_with(METADATA_HEADER_START));
        assert!(blueprint.contains("Importance Score: 0.93"));
        assert!(blueprint.ends_with("# Blueprint\nFamily first."));
        assert!(migration
            .join("organized_docs/session/session_notes_migrated.md")
            .exists());
        assert!(migration
            .join("phase2_backup/project_memory/session_notes.md")
            .exists());

        let summary: MigrationSummary =
            read_json(&migration.join("migration_summary.json")).unwrap();
        assert_eq!(summary.content_type_breakdown["blueprint"], 1);
        assert_eq!(summary.content_type_breakdown["config"], 1);
        assert_eq!(summary.importance_distribution["9/10"], 1);
        assert_eq!(summary.importance_distribution["4/10"], 1);
        assert_eq!(summary.importance_distribution["7/10"], 1);
        let saved: MigrationReport = read_json(&migration.join("migration_report.json")).unwrap();
        assert_eq!(saved.documents_migrated, 3);
    }

    #[tokio::test]
    async fn test_offline_server_falls_back_to_path() {
        let (dir, config) = project();
        let migrator = DocumentMigrator::new(Arc::new(ScriptedServer::offline()), &config);
        let report = migrator.run().await.unwrap();
        assert!(report.success);

        let blueprint = report
            .migration_results
            .iter()
            .find(|r| r.original_path.ends_with("MASTER_BLUEPRINT.md"))
            .unwrap();
        assert_eq!(blueprint.analysis.content_type, ContentType::Blueprint);
        assert_eq!(blueprint.analysis.confidence, 0.3);
        assert!(dir
            .path()
            .join("claudae_foundation/migration/organized_docs/documentation/config_migrated.yaml")
            .exists());
    }

    #[tokio::test]
    async fn test_same_stem_does_not_overwrite() {
        let (dir, config) = project();
        fs::write(dir.path().join("project_memory/config.yaml"), "other: true").unwrap();
        let server = Arc::new(ScriptedServer::constant("plain notes"));
        let migrator = DocumentMigrator::new(server, &config);
        let report = migrator.run().await.unwrap();
        assert_eq!(report.documents_migrated, 4);

        let docs = dir.path().join("claudae_foundation/migration/organized_docs/documentation");
        assert!(docs.join("config_migrated.yaml").exists());
        assert!(docs.join("config_migrated_2.yaml").exists());
    }

    #[test]
    fn test_summarize_empty() {
        let summary = summarize(&[]);
        assert_eq!(summary.total_documents, 0);
        assert!(summary.claudae_performance.is_none());
    }
}

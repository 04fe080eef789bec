// Migration review reports
//
// Reads what `DocumentMigrator::run` left behind and renders it for a human
// into `claudae_foundation/review_output/`.

use anyhow::{Context, Result};
use chrono::Local;
use serde_json::{json, Map, Value};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use walkdir::WalkDir;

use super::{MigrationReport, MigrationSummary, METADATA_HEADER_START};
use crate::config::constants::REVIEW_PREVIEW_CHARS;
use crate::config::ProjectPaths;
use crate::ollama::truncate_chars;
use crate::training::{read_json, write_pretty_json};

pub const MASTER_REVIEW: &str = "master_review.md";
pub const CONTENT_REVIEW: &str = "content_review.md";
pub const FILE_LISTING: &str = "file_listing.txt";
pub const ANALYSIS_REVIEW: &str = "analysis_review.json";
pub const COMPLETE_REVIEW: &str = "COMPLETE_CLAUDAE_REVIEW.md";

/// Sorted files under `dir`, relative to it
fn files_under(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.path().strip_prefix(dir).ok().map(Path::to_path_buf))
        .collect()
}

/// Split a migrated file into its analysis header and the original text
pub fn split_metadata(content: &str) -> (Option<&str>, &str) {
    if !content.starts_with(METADATA_HEADER_START) {
        return (None, content);
    }
    match content.find("-->") {
        Some(end) => (Some(&content[..end + 3]), content[end + 3..].trim()),
        None => (None, content),
    }
}

pub struct ReviewGenerator {
    migration_dir: PathBuf,
    review_dir: PathBuf,
}

impl ReviewGenerator {
    pub fn new(paths: &ProjectPaths) -> Self {
        Self {
            migration_dir: paths.migration_dir(),
            review_dir: paths.review_dir(),
        }
    }

    fn organized_dir(&self) -> PathBuf {
        self.migration_dir.join("organized_docs")
    }

    pub fn master_review(
        &self,
        report: &MigrationReport,
        summary: Option<&MigrationSummary>,
    ) -> String {
        let mut out = format!(
            "# CLAUDAE Migration Review - Master Report\n\
             Generated: {}\n\n\
             ## Migration Overview\n\n\
             - **Documents Found:** {}\n\
             - **Documents Migrated:** {}\n\
             - **CLAUDAE Analyses:** {}\n\
             - **Success Rate:** {:.1}%\n\
             - **Start Time:** {}\n\
             - **End Time:** {}\n",
            Local::now().to_rfc3339(),
            report.documents_found,
            report.documents_migrated,
            report.claudae_analyses,
            report.success_rate * 100.0,
            report.start_time.to_rfc3339(),
            report.end_time.to_rfc3339(),
        );

        let Some(summary) = summary else {
            return out;
        };
        out.push_str("\n### Content Type Breakdown\n");
        for (kind, count) in &summary.content_type_breakdown {
            let _ = writeln!(out, "- **{}:** {} documents", kind, count);
        }
        out.push_str("\n### Importance Distribution\n");
        for (bucket, count) in &summary.importance_distribution {
            let _ = writeln!(out, "- **{}:** {} documents", bucket, count);
        }
        if let Some(perf) = &summary.claudae_performance {
            let _ = write!(
                out,
                "\n### CLAUDAE Performance\n\
                 - **Average Confidence:** {}\n\
                 - **Average Processing Time:** {}s\n\
                 - **Total Processing Time:** {}s\n",
                perf.average_confidence, perf.average_processing_time, perf.total_processing_time
            );
        }
        out
    }

    /// Per-category file list, then each file's analysis header and a preview
    pub fn content_review(&self) -> String {
        let mut out = String::from("# CLAUDAE Content Review\n\n## Document Organization\n");
        let organized = self.organized_dir();
        let files = files_under(&organized);

        let mut current: Option<String> = None;
        let mut details = String::from("\n## Document Content\n");
        for relative in &files {
            let category = relative
                .components()
                .next()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .unwrap_or_default();
            if current.as_deref() != Some(category.as_str()) {
                let count = files.iter().filter(|f| f.starts_with(&category)).count();
                let _ = write!(out, "\n### Category: {}\n**Files:** {}\n\n", category, count);
                let _ = write!(details, "\n### {} DOCUMENTS\n", category.to_uppercase());
                current = Some(category);
            }

            let name = relative
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let _ = writeln!(out, "- `{}`", name);

            let path = organized.join(relative);
            match fs::read_to_string(&path) {
                Ok(content) => {
                    let (metadata, original) = split_metadata(&content);
                    let _ = write!(
                        details,
                        "\n#### {}\n\n**File Path:** `{}`\n**File Size:** {} characters\n\n",
                        name,
                        path.display(),
                        content.chars().count()
                    );
                    if let Some(metadata) = metadata {
                        let _ = write!(
                            details,
                            "**CLAUDAE Analysis:**\n```\n{}\n```\n\n",
                            metadata
                        );
                    }
                    let preview = truncate_chars(original, REVIEW_PREVIEW_CHARS);
                    let ellipsis = if preview.len() < original.len() { "..." } else { "" };
                    let _ = write!(
                        details,
                        "**Content Preview:**\n```\n{}{}\n```\n\n---\n",
                        preview, ellipsis
                    );
                }
                Err(e) => {
                    let _ = write!(details, "\n#### {}\nError reading file: {}\n", name, e);
                }
            }
        }
        out.push_str(&details);
        out
    }

    pub fn file_listing(&self) -> String {
        let mut out = format!(
            "CLAUDAE Migration - Complete File Listing\nGenerated: {}\n\n\
             === ORIGINAL FILES (Backed Up) ===\n",
            Local::now().to_rfc3339()
        );
        for path in files_under(&self.migration_dir.join("phase2_backup")) {
            let _ = writeln!(out, "{}", path.display());
        }
        out.push_str("\n=== MIGRATED FILES (CLAUDAE Organized) ===\n");
        for path in files_under(&self.organized_dir()) {
            let _ = writeln!(out, "{}", path.display());
        }
        out.push_str("\n=== MIGRATION METADATA ===\nmigration_report.json\nmigration_summary.json\n");
        out
    }

    /// Per-file outcome keyed by file name
    pub fn analysis_review(&self, report: &MigrationReport) -> Value {
        let mut files = Map::new();
        for result in &report.migration_results {
            let name = result
                .original_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| result.original_path.display().to_string());
            files.insert(
                name,
                json!({
                    "original_path": result.original_path,
                    "migrated_path": result.migrated_path,
                    "success": result.success,
                    "claudae_analysis": result.analysis,
                }),
            );
        }
        json!({
            "generation_time": Local::now().to_rfc3339(),
            "migration_overview": {
                "documents_found": report.documents_found,
                "documents_migrated": report.documents_migrated,
                "claudae_analyses": report.claudae_analyses,
                "success_rate": report.success_rate,
            },
            "file_analysis": files,
        })
    }

    fn save(&self, name: &str, content: &str) -> Result<PathBuf> {
        let path = self.review_dir.join(name);
        fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }

    /// Write every review file; returns the consolidated one
    pub fn generate(&self) -> Result<PathBuf> {
        let report: MigrationReport = read_json(&self.migration_dir.join("migration_report.json"))
            .context("No migration report found; run `migrate run` first")?;
        let summary: Option<MigrationSummary> =
            read_json(&self.migration_dir.join("migration_summary.json")).ok();

        fs::create_dir_all(&self.review_dir)
            .with_context(|| format!("Failed to create {}", self.review_dir.display()))?;

        let master = self.master_review(&report, summary.as_ref());
        let content = self.content_review();
        let listing = self.file_listing();

        self.save(MASTER_REVIEW, &master)?;
        self.save(CONTENT_REVIEW, &content)?;
        self.save(FILE_LISTING, &listing)?;
        write_pretty_json(
            &self.review_dir.join(ANALYSIS_REVIEW),
            &self.analysis_review(&report),
        )?;

        let consolidated = format!(
            "# COMPLETE CLAUDAE MIGRATION REVIEW\nGenerated: {}\n\n{}\n\n{}\n\n## File Listing\n\n```\n{}```\n",
            Local::now().to_rfc3339(),
            master,
            content,
            listing
        );
        let path = self.save(COMPLETE_REVIEW, &consolidated)?;
        info!(dir = %self.review_dir.display(), "Migration review written");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::migration::DocumentMigrator;
    use crate::ollama::fake::ScriptedServer;
    use std::sync::Arc;

    #[test]
    fn test_split_metadata() {
        let text = format!("{}\nFile: a.md\n-->\n\n# Body", METADATA_HEADER_START);
        let (meta, body) = split_metadata(&text);
        assert!(meta.unwrap().ends_with("-->"));
        assert_eq!(body, "# Body");

        assert_eq!(split_metadata("# Plain"), (None, "# Plain"));
        let unterminated = format!("{}\nFile: a.md", METADATA_HEADER_START);
        assert_eq!(split_metadata(&unterminated).0, None);
    }

    #[test]
    fn test_generate_needs_a_migration() {
        let dir = tempfile::tempdir().unwrap();
        let generator = ReviewGenerator::new(&ProjectPaths::new(dir.path()));
        let err = generator.generate().unwrap_err();
        assert!(format!("{:#}", err).contains("migrate run"));
    }

    #[tokio::test]
    async fn test_generate_after_migration() {
        let dir = tempfile::tempdir().unwrap();
        let memory = dir.path().join("project_memory");
        fs::create_dir_all(&memory).unwrap();
        fs::write(memory.join("STATUS.md"), format!("# Status\n{}", "z".repeat(800))).unwrap();
        fs::write(memory.join("plan.txt"), "short plan").unwrap();

        let config = Config::with_project_root(dir.path().to_path_buf());
        let server = Arc::new(ScriptedServer::constant(
            r#"{"content_type": "status", "importance_score": 0.7, "confidence": 0.8}"#,
        ));
        DocumentMigrator::new(server, &config).run().await.unwrap();

        let generator = ReviewGenerator::new(&config.paths());
        let complete = generator.generate().unwrap();
        assert!(complete.ends_with(COMPLETE_REVIEW));

        let review_dir = config.paths().review_dir();
        let master = fs::read_to_string(review_dir.join(MASTER_REVIEW)).unwrap();
        assert!(master.contains("- **Documents Migrated:** 2"));
        assert!(master.contains("- **Success Rate:** 100.0%"));
        assert!(master.contains("- **status:** 2 documents"));

        let content = fs::read_to_string(review_dir.join(CONTENT_REVIEW)).unwrap();
        assert!(content.contains("### Category: status\n**Files:** 2"));
        assert!(content.contains("- `STATUS_migrated.md`"));
        assert!(content.contains("### STATUS DOCUMENTS"));
        assert!(content.contains("...\n```"));

        let listing = fs::read_to_string(review_dir.join(FILE_LISTING)).unwrap();
        assert!(listing.contains("project_memory/plan.txt"));
        assert!(listing.contains("status/plan_migrated.txt"));

        let analysis: Value = read_json(&review_dir.join(ANALYSIS_REVIEW)).unwrap();
        assert_eq!(analysis["file_analysis"]["STATUS.md"]["success"], true);
        assert_eq!(
            analysis["file_analysis"]["plan.txt"]["claudae_analysis"]["content_type"],
            "status"
        );
    }
}

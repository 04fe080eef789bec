// Training example collector
//
// Captures code examples, architecture decisions, debugging fixes and reusable
// patterns as JSON arrays under the training directory.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::json_store::{append_to_json_array, load_json_array, write_pretty_json};
use super::patterns::{extract_patterns, guess_component};

/// Subdirectories created under the training directory
pub const TRAINING_SUBDIRS: [&str; 5] = [
    "code_examples",
    "architecture_decisions",
    "debugging_solutions",
    "system_patterns",
    "error_handling",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeExample {
    pub timestamp: DateTime<Local>,
    pub code: String,
    pub context: String,
    pub category: String,
    pub reasoning: String,
    pub tags: Vec<String>,
    pub hash: String,
    pub file_pattern: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchitectureDecision {
    pub timestamp: DateTime<Local>,
    pub decision: String,
    pub alternatives_considered: Vec<String>,
    pub reasoning: String,
    pub expected_impact: String,
    pub components_affected: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebuggingSolution {
    pub timestamp: DateTime<Local>,
    pub problem: String,
    pub symptoms: String,
    pub solution: String,
    pub prevention: String,
    pub component: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemPattern {
    pub timestamp: DateTime<Local>,
    pub name: String,
    pub description: String,
    pub code_example: String,
    pub when_to_use: String,
    pub frequency: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub generation_date: DateTime<Local>,
    pub total_examples: usize,
    pub categories: BTreeMap<String, usize>,
}

/// First 8 hex characters of the SHA-256 digest of `code`
pub fn short_hash(code: &str) -> String {
    let digest = Sha256::digest(code.as_bytes());
    format!("{:x}", digest)[..8].to_string()
}

/// Category used when a requested one is not a plain file-name token
pub const DEFAULT_CATEGORY: &str = "user_code";

/// `category` if it is non-empty ASCII letters, digits, `_` or `-`;
/// otherwise `DEFAULT_CATEGORY`. Categories become file names.
pub fn sanitize_category(category: &str) -> &str {
    let category = category.trim();
    let plain = !category.is_empty()
        && category
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if plain {
        category
    } else {
        DEFAULT_CATEGORY
    }
}

pub struct TrainingCollector {
    training_dir: PathBuf,
}

impl TrainingCollector {
    /// Open (and lay out) the training directory
    pub fn new(training_dir: PathBuf) -> Result<Self> {
        for sub in TRAINING_SUBDIRS {
            let dir = training_dir.join(sub);
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        Ok(Self { training_dir })
    }

    pub fn training_dir(&self) -> &Path {
        &self.training_dir
    }

    fn code_examples_dir(&self) -> PathBuf {
        self.training_dir.join("code_examples")
    }

    /// Record a code example in its category file and in today's log
    pub fn collect_code_example(
        &self,
        code: &str,
        context: &str,
        category: &str,
        reasoning: &str,
        tags: &[String],
    ) -> Result<CodeExample> {
        let requested = category;
        let category = sanitize_category(requested);
        if category != requested.trim() {
            debug!(requested, category, "Replaced non-file-name training category");
        }
        let example = CodeExample {
            timestamp: Local::now(),
            code: code.to_string(),
            context: context.to_string(),
            category: category.to_string(),
            reasoning: reasoning.to_string(),
            tags: tags.to_vec(),
            hash: short_hash(code),
            file_pattern: extract_patterns(code),
        };

        let dir = self.code_examples_dir();
        append_to_json_array(&dir.join(format!("{}_examples.json", category)), &example)?;
        append_to_json_array(
            &dir.join(format!(
                "daily_log_{}.json",
                example.timestamp.format("%Y-%m-%d")
            )),
            &example,
        )?;

        debug!(category, hash = %example.hash, "Collected code example");
        Ok(example)
    }

    pub fn collect_architecture_decision(
        &self,
        decision: &str,
        alternatives: &[String],
        reasoning: &str,
        impact: &str,
    ) -> Result<ArchitectureDecision> {
        let record = ArchitectureDecision {
            timestamp: Local::now(),
            decision: decision.to_string(),
            alternatives_considered: alternatives.to_vec(),
            reasoning: reasoning.to_string(),
            expected_impact: impact.to_string(),
            components_affected: Vec::new(),
        };
        append_to_json_array(
            &self
                .training_dir
                .join("architecture_decisions")
                .join("decisions.json"),
            &record,
        )?;
        Ok(record)
    }

    pub fn collect_debugging_solution(
        &self,
        problem: &str,
        symptoms: &str,
        solution: &str,
        prevention: &str,
    ) -> Result<DebuggingSolution> {
        let record = DebuggingSolution {
            timestamp: Local::now(),
            problem: problem.to_string(),
            symptoms: symptoms.to_string(),
            solution: solution.to_string(),
            prevention: prevention.to_string(),
            component: guess_component(problem).to_string(),
        };
        append_to_json_array(
            &self
                .training_dir
                .join("debugging_solutions")
                .join("solutions.json"),
            &record,
        )?;
        Ok(record)
    }

    pub fn collect_system_pattern(
        &self,
        name: &str,
        description: &str,
        code_example: &str,
        when_to_use: &str,
    ) -> Result<SystemPattern> {
        let record = SystemPattern {
            timestamp: Local::now(),
            name: name.to_string(),
            description: description.to_string(),
            code_example: code_example.to_string(),
            when_to_use: when_to_use.to_string(),
            frequency: 1,
        };
        append_to_json_array(
            &self.training_dir.join("system_patterns").join("patterns.json"),
            &record,
        )?;
        Ok(record)
    }

    /// Count examples per category and write `training_summary.json`
    pub fn generate_training_summary(&self) -> Result<TrainingSummary> {
        let mut categories = BTreeMap::new();
        for (category, path) in category_files(&self.code_examples_dir())? {
            categories.insert(category, load_json_array(&path).len());
        }

        let summary = TrainingSummary {
            generation_date: Local::now(),
            total_examples: categories.values().sum(),
            categories,
        };
        write_pretty_json(&self.training_dir.join("training_summary.json"), &summary)?;
        Ok(summary)
    }
}

/// Every `<category>_examples.json` in `dir`, keyed by category
pub fn category_files(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let pattern = dir.join("*_examples.json");
    let pattern = pattern.to_string_lossy();

    let mut files = Vec::new();
    for entry in glob::glob(&pattern).context("Invalid glob pattern")? {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                debug!(error = %e, "Skipping unreadable path");
                continue;
            }
        };
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let category = stem.trim_end_matches("_examples").to_string();
        files.push((category, path));
    }
    files.sort();
    Ok(files)
}

// Which changed files count as user code
//
// The learner writes into the project it watches. Everything it (or the
// collector, or the dashboards) produces must be rejected here, otherwise each
// learning triggers another analysis.

use std::fs;
use std::path::Path;

use crate::config::constants::LEARNER_MAX_FILE_BYTES;

const SYSTEM_OUTPUT_PATTERNS: [&str; 20] = [
    "claudae_foundation/",
    "ai_family/claudae/training/",
    "ai_family/logs/",
    "ai_family/versions/",
    "ai_family/models/",
    "ai_family/training_data/",
    "_interactions.jsonl",
    "documentation/progress_report_",
    "monitoring/metrics.db",
    ".git/",
    "__pycache__/",
    ".pyc",
    ".log",
    "node_modules/",
    ".venv/",
    "venv/",
    "target/",
    ".DS_Store",
    ".gitignore",
    "project_memory/current_status.json",
];

const GENERATED_TRAINING_MARKERS: [&str; 3] = ["_examples.json", "daily_log_", "session_"];

const BINARY_EXTENSIONS: [&str; 16] = [
    ".db",
    ".db-journal",
    ".sqlite",
    ".sqlite3",
    ".pkl",
    ".pickle",
    ".bin",
    ".exe",
    ".so",
    ".jpg",
    ".jpeg",
    ".png",
    ".gif",
    ".pdf",
    ".zip",
    ".tar.gz",
];

const MEDIA_EXTENSIONS: [&str; 3] = [".mp3", ".mp4", ".avi"];

#[derive(Debug, Clone, Copy)]
pub struct CodeFilter {
    max_file_bytes: u64,
}

impl Default for CodeFilter {
    fn default() -> Self {
        Self::new(LEARNER_MAX_FILE_BYTES)
    }
}

impl CodeFilter {
    pub fn new(max_file_bytes: u64) -> Self {
        Self { max_file_bytes }
    }

    /// True when `path` is something a developer wrote by hand
    pub fn is_user_code(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy().replace('\\', "/");
        if SYSTEM_OUTPUT_PATTERNS.iter().any(|p| path_str.contains(p)) {
            return false;
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        if name == "test_log.json" && path_str.contains("ai_family/") {
            return false;
        }

        if name.ends_with(".json")
            && path_str.contains("training")
            && GENERATED_TRAINING_MARKERS.iter().any(|m| name.contains(m))
        {
            return false;
        }

        if BINARY_EXTENSIONS
            .iter()
            .chain(MEDIA_EXTENSIONS.iter())
            .any(|ext| name.ends_with(ext))
        {
            return false;
        }

        match fs::metadata(path) {
            Ok(meta) => meta.is_file() && meta.len() <= self.max_file_bytes,
            Err(_) => false,
        }
    }
}

/// `CodeFilter::default().is_user_code(path)`
pub fn is_user_code(path: &Path) -> bool {
    CodeFilter::default().is_user_code(path)
}

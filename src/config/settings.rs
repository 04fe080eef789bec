// Configuration structs

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::constants::*;
use crate::family::Roster;

/// Connection settings for the local model server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelServerConfig {
    /// Base URL of the HTTP API (e.g. "http://localhost:11434")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Talk to the server through the `ollama` CLI instead of HTTP
    #[serde(default)]
    pub use_cli: bool,

    /// Timeout for one-off prompts
    #[serde(default = "default_ask_timeout")]
    pub ask_timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_MODEL_SERVER_URL.to_string()
}

fn default_ask_timeout() -> u64 {
    DEFAULT_ASK_TIMEOUT_SECS
}

impl Default for ModelServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            use_cli: false,
            ask_timeout_secs: default_ask_timeout(),
        }
    }
}

/// Host monitoring and dashboard settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Refresh period of the system monitor view
    pub monitor_refresh_secs: u64,
    /// Refresh period of the metrics dashboard
    pub dashboard_refresh_secs: u64,
    /// Dedicated bulk-storage mount shown in the monitor
    pub storage_mount: PathBuf,
    /// Rows older than this are pruned on each dashboard tick
    pub retention_hours: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            monitor_refresh_secs: MONITOR_REFRESH_SECS,
            dashboard_refresh_secs: DASHBOARD_REFRESH_SECS,
            storage_mount: PathBuf::from("/mnt/honey_duo_storage"),
            retention_hours: METRICS_RETENTION_HOURS,
        }
    }
}

/// Importance thresholds that trigger a documentation update plan
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocTriggerConfig {
    pub major_feature: f64,
    pub architectural: f64,
    pub component_change: f64,
    /// Number of session changes that forces an update regardless of score
    pub change_count: usize,
}

impl Default for DocTriggerConfig {
    fn default() -> Self {
        Self {
            major_feature: 0.8,
            architectural: 0.7,
            component_change: 0.6,
            change_count: 5,
        }
    }
}

/// Autonomous learner settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LearnerConfig {
    /// Model used for change analysis; empty = Claudae's model
    pub model: String,
    pub poll_interval_ms: u64,
    pub query_timeout_secs: u64,
    pub max_file_bytes: u64,
    pub read_bytes: usize,
    pub feed_bytes: usize,
    pub feed_threshold: f64,
    pub session_interval_secs: u64,
    pub doc_triggers: DocTriggerConfig,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            model: String::new(),
            poll_interval_ms: LEARNER_POLL_INTERVAL_MS,
            query_timeout_secs: LEARNER_QUERY_TIMEOUT_SECS,
            max_file_bytes: LEARNER_MAX_FILE_BYTES,
            read_bytes: LEARNER_READ_BYTES,
            feed_bytes: LEARNER_FEED_BYTES,
            feed_threshold: LEARNER_FEED_THRESHOLD,
            session_interval_secs: LEARNER_SESSION_INTERVAL_SECS,
            doc_triggers: DocTriggerConfig::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Root of the project tree everything else lives under
    pub project_root: PathBuf,

    /// Model server connection
    pub model_server: ModelServerConfig,

    /// Model assignment per family member
    pub family: Roster,

    /// Monitor / dashboard settings
    pub monitor: MonitorConfig,

    /// Autonomous learner settings
    pub learner: LearnerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self::with_project_root(default_project_root())
    }
}

/// `~/honey_duo_wealth`, or `./honey_duo_wealth` when there is no home directory
pub fn default_project_root() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("honey_duo_wealth")
}

impl Config {
    pub fn with_project_root(project_root: PathBuf) -> Self {
        Self {
            project_root,
            model_server: ModelServerConfig::default(),
            family: Roster::default(),
            monitor: MonitorConfig::default(),
            learner: LearnerConfig::default(),
        }
    }

    /// Resolved directory layout under the project root
    pub fn paths(&self) -> ProjectPaths {
        ProjectPaths::new(&self.project_root)
    }

    /// Model the learner sends analysis prompts to
    pub fn learner_model(&self) -> &str {
        if self.learner.model.is_empty() {
            &self.family.claudae.model
        } else {
            &self.learner.model
        }
    }

    /// Validate configuration and return helpful errors
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.model_server.base_url.trim().is_empty() {
            anyhow::bail!("model_server.base_url must not be empty");
        }
        if !self.model_server.base_url.starts_with("http://")
            && !self.model_server.base_url.starts_with("https://")
        {
            anyhow::bail!(
                "model_server.base_url must start with http:// or https:// (got '{}')",
                self.model_server.base_url
            );
        }
        if self.model_server.ask_timeout_secs == 0 {
            anyhow::bail!("model_server.ask_timeout_secs must be greater than zero");
        }
        for (member, profile) in self.family.iter() {
            if profile.model.trim().is_empty() {
                anyhow::bail!("family.{}.model must not be empty", member.key());
            }
            if profile.timeout_secs == 0 {
                anyhow::bail!("family.{}.timeout_secs must be greater than zero", member.key());
            }
        }
        if self.learner.poll_interval_ms == 0 {
            anyhow::bail!("learner.poll_interval_ms must be greater than zero");
        }
        if self.learner.query_timeout_secs == 0 {
            anyhow::bail!("learner.query_timeout_secs must be greater than zero");
        }
        if self.learner.session_interval_secs == 0 {
            anyhow::bail!("learner.session_interval_secs must be greater than zero");
        }
        if self.monitor.monitor_refresh_secs == 0 || self.monitor.dashboard_refresh_secs == 0 {
            anyhow::bail!("monitor refresh intervals must be greater than zero");
        }
        Ok(())
    }
}

/// Fixed directory layout of the project tree
#[derive(Debug, Clone)]
pub struct ProjectPaths {
    pub root: PathBuf,
}

impl ProjectPaths {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    pub fn ai_family_dir(&self) -> PathBuf {
        self.root.join("ai_family")
    }

    /// Per-member working directory (holds `test_log.json`)
    pub fn member_dir(&self, member: crate::family::Member) -> PathBuf {
        self.ai_family_dir().join(member.key())
    }

    /// JSONL interaction logs
    pub fn logs_dir(&self) -> PathBuf {
        self.ai_family_dir().join("logs")
    }

    pub fn training_dir(&self) -> PathBuf {
        self.ai_family_dir().join("claudae").join("training")
    }

    pub fn models_dir(&self) -> PathBuf {
        self.ai_family_dir().join("models")
    }

    pub fn training_data_dir(&self) -> PathBuf {
        self.ai_family_dir().join("training_data")
    }

    pub fn versions_dir(&self) -> PathBuf {
        self.ai_family_dir().join("versions")
    }

    /// Everything the learner, migration and foundation steps write
    pub fn foundation_dir(&self) -> PathBuf {
        self.root.join("claudae_foundation")
    }

    pub fn learning_dir(&self) -> PathBuf {
        self.foundation_dir().join("autonomous_learning")
    }

    pub fn migration_dir(&self) -> PathBuf {
        self.foundation_dir().join("migration")
    }

    pub fn review_dir(&self) -> PathBuf {
        self.foundation_dir().join("review_output")
    }

    pub fn memory_dir(&self) -> PathBuf {
        self.root.join("project_memory")
    }

    pub fn docs_dir(&self) -> PathBuf {
        self.root.join("documentation")
    }

    pub fn metrics_db(&self) -> PathBuf {
        self.root.join("monitoring").join("metrics.db")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::family::Member;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::with_project_root(PathBuf::from("/tmp/hdw"));
        config.validate().unwrap();
        assert_eq!(config.model_server.base_url, "http://localhost:11434");
        assert_eq!(config.learner_model(), "mistral:7b");
    }

    #[test]
    fn test_learner_model_override() {
        let mut config = Config::with_project_root(PathBuf::from("/tmp/hdw"));
        config.learner.model = "phi:2.7b".to_string();
        assert_eq!(config.learner_model(), "phi:2.7b");
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let mut config = Config::with_project_root(PathBuf::from("/tmp/hdw"));
        config.model_server.base_url = "localhost:11434".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = Config::with_project_root(PathBuf::from("/tmp/hdw"));
        config.family.deon.timeout_secs = 0;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("family.deon"), "got: {}", err);
    }

    #[test]
    fn test_validate_rejects_zero_learner_intervals() {
        let mut config = Config::with_project_root(PathBuf::from("/tmp/hdw"));
        config.learner.query_timeout_secs = 0;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("learner.query_timeout_secs"), "got: {}", err);

        let mut config = Config::with_project_root(PathBuf::from("/tmp/hdw"));
        config.learner.session_interval_secs = 0;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("learner.session_interval_secs"), "got: {}", err);
    }

    #[test]
    fn test_paths_layout() {
        let paths = ProjectPaths::new(Path::new("/p"));
        assert_eq!(paths.logs_dir(), PathBuf::from("/p/ai_family/logs"));
        assert_eq!(
            paths.training_dir(),
            PathBuf::from("/p/ai_family/claudae/training")
        );
        assert_eq!(paths.member_dir(Member::Nyala), PathBuf::from("/p/ai_family/nyala"));
        assert_eq!(paths.metrics_db(), PathBuf::from("/p/monitoring/metrics.db"));
        assert_eq!(
            paths.learning_dir(),
            PathBuf::from("/p/claudae_foundation/autonomous_learning")
        );
        assert_eq!(
            paths.migration_dir(),
            PathBuf::from("/p/claudae_foundation/migration")
        );
    }
}

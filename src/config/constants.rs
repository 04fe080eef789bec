// Project-wide constants
//
// Centralised here so ports, timeouts and thresholds have one source of truth.
// Import via `use crate::config::constants::*;`.

/// Default base URL of the local model server (Ollama's default port).
pub const DEFAULT_MODEL_SERVER_URL: &str = "http://localhost:11434";

/// Timeout for one-off `ask` calls.
pub const DEFAULT_ASK_TIMEOUT_SECS: u64 = 30;

/// Per-call timeout for the parallel quick decision.
pub const QUICK_DECISION_TIMEOUT_SECS: u64 = 5;

/// Upper bound on concurrent model calls in the quick decision fan-out.
pub const QUICK_DECISION_MAX_WORKERS: usize = 3;

/// Pause between members during a sequential health check.
pub const HEALTH_CHECK_PAUSE_SECS: u64 = 2;

/// How long preloaded models stay resident on the server.
pub const PRELOAD_KEEP_ALIVE: &str = "24h";

/// Timeout for the learner's change-analysis call.
pub const LEARNER_QUERY_TIMEOUT_SECS: u64 = 45;

/// Files larger than this are never analysed by the learner.
pub const LEARNER_MAX_FILE_BYTES: u64 = 50_000;

/// Bytes of a changed file included in the analysis prompt.
pub const LEARNER_READ_BYTES: usize = 2_000;

/// Bytes of a changed file fed to the training collector.
pub const LEARNER_FEED_BYTES: usize = 1_000;

/// Minimum importance score for a learning to become a training example.
pub const LEARNER_FEED_THRESHOLD: f64 = 0.5;

/// Sleep between queue polls in the learner loop.
pub const LEARNER_POLL_INTERVAL_MS: u64 = 200;

/// Interval between session status snapshots.
pub const LEARNER_SESSION_INTERVAL_SECS: u64 = 60;

/// Size above which a component file counts as "Ready" rather than "Partial".
pub const COMPONENT_READY_BYTES: u64 = 100;

/// Maximum rows returned by a metrics history query.
pub const METRICS_HISTORY_LIMIT: usize = 500;

/// Default metrics retention for the dashboard's prune pass.
pub const METRICS_RETENTION_HOURS: u64 = 48;

/// Refresh period of the system monitor view.
pub const MONITOR_REFRESH_SECS: u64 = 5;

/// Refresh period of the metrics dashboard.
pub const DASHBOARD_REFRESH_SECS: u64 = 30;

/// Bytes per gibibyte, used for GB figures throughout the monitor.
pub const BYTES_PER_GB: f64 = 1_073_741_824.0;

/// Bytes per tebibyte, used for the storage mount panel.
pub const BYTES_PER_TB: f64 = 1_099_511_627_776.0;

/// Timeout for one document-migration analysis call.
pub const MIGRATION_TIMEOUT_SECS: u64 = 120;

/// Characters of a document included in the migration prompt.
pub const MIGRATION_PROMPT_CHARS: usize = 2_000;

/// Sampling temperature for document analysis.
pub const MIGRATION_TEMPERATURE: f32 = 0.2;

/// Characters of a migrated document shown in the content review.
pub const REVIEW_PREVIEW_CHARS: usize = 500;

/// Timeout for the foundation check's test prompt.
pub const FOUNDATION_CHECK_TIMEOUT_SECS: u64 = 30;

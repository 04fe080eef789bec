// Training data: example collection and model versioning

pub mod collector;
pub mod json_store;
pub mod manager;
pub mod patterns;
pub mod session;

pub use collector::{
    category_files, sanitize_category, short_hash, ArchitectureDecision, CodeExample,
    DebuggingSolution, SystemPattern, TrainingCollector, TrainingSummary, DEFAULT_CATEGORY,
};
pub use json_store::{append_to_json_array, load_json_array, read_json, write_pretty_json};
pub use manager::{
    parse_version, DeploymentEntry, MemberModelStatus, ModelVersionManager, PerformanceMetrics,
    TrainingParams, TrainingPlan, VersionMetadata, VersionStatus,
};
pub use patterns::{extract_patterns, guess_component};
pub use session::{
    ActiveSession, ClosedSession, SessionItem, SessionItemKind, SessionRecord,
    TrainingSessionSummary, TrainingSessions,
};

// Configuration module
// Public interface for configuration loading

pub mod constants;
mod loader;
mod settings;

pub use loader::{apply_env_overrides, config_path, load_config, load_config_from};
pub use settings::{
    default_project_root, Config, DocTriggerConfig, LearnerConfig, ModelServerConfig,
    MonitorConfig, ProjectPaths,
};

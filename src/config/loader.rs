// Configuration loader
// Loads ~/.honeyduo/config.toml (or $HONEYDUO_CONFIG), then applies env overrides

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::settings::{
    default_project_root, Config, LearnerConfig, ModelServerConfig, MonitorConfig,
};
use crate::errors;
use crate::family::Roster;

/// Load configuration from the config file (if any) and the environment
pub fn load_config() -> Result<Config> {
    let path = config_path()?;
    let mut config = match load_config_from(&path)? {
        Some(config) => config,
        None => {
            debug!(path = %path.display(), "No config file, using defaults");
            Config::default()
        }
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    config
        .validate()
        .context("Configuration validation failed")?;

    Ok(config)
}

/// `$HONEYDUO_CONFIG` or `~/.honeyduo/config.toml`
pub fn config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("HONEYDUO_CONFIG") {
        if !path.is_empty() {
            return Ok(PathBuf::from(path));
        }
    }
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".honeyduo").join("config.toml"))
}

/// Parse a config file; `Ok(None)` when it does not exist
pub fn load_config_from(path: &Path) -> Result<Option<Config>> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    #[derive(Deserialize)]
    struct TomlConfig {
        #[serde(default)]
        project_root: Option<PathBuf>,
        #[serde(default)]
        model_server: Option<ModelServerConfig>,
        #[serde(default)]
        family: Option<Roster>,
        #[serde(default)]
        monitor: Option<MonitorConfig>,
        #[serde(default)]
        learner: Option<LearnerConfig>,
    }

    let toml_config: TomlConfig = toml::from_str(&contents).map_err(|e| {
        anyhow::anyhow!(errors::config_parse_error(
            &path.display().to_string(),
            &e.to_string()
        ))
    })?;

    let root = toml_config
        .project_root
        .map(expand_home)
        .unwrap_or_else(default_project_root);
    let mut config = Config::with_project_root(root);

    if let Some(model_server) = toml_config.model_server {
        config.model_server = model_server;
    }
    if let Some(family) = toml_config.family {
        config.family = family;
    }
    if let Some(monitor) = toml_config.monitor {
        config.monitor = monitor;
    }
    if let Some(learner) = toml_config.learner {
        config.learner = learner;
    }

    Ok(Some(config))
}

/// Apply `HONEYDUO_PROJECT_ROOT` and `OLLAMA_HOST` on top of file settings
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(root) = lookup("HONEYDUO_PROJECT_ROOT").filter(|v| !v.is_empty()) {
        config.project_root = expand_home(PathBuf::from(root));
    }
    if let Some(host) = lookup("OLLAMA_HOST").filter(|v| !v.is_empty()) {
        // OLLAMA_HOST is commonly given without a scheme ("127.0.0.1:11434")
        config.model_server.base_url = if host.starts_with("http://") || host.starts_with("https://") {
            host
        } else {
            format!("http://{}", host)
        };
    }
}

fn expand_home(path: PathBuf) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or(path),
        Err(_) => path,
    }
}

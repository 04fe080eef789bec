// Model server access through the `ollama` command-line tool
//
// Used when the HTTP API is not exposed. Sampling options and keep_alive are
// not expressible on the command line and are ignored here.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::debug;

use super::types::{ModelReply, ModelRequest};
use super::ModelServer;
use crate::errors::ModelError;

const LIST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct OllamaCli {
    program: String,
}

impl Default for OllamaCli {
    fn default() -> Self {
        Self::new("ollama")
    }
}

impl OllamaCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn run(&self, args: &[&str], timeout: Duration) -> Result<String, ModelError> {
        let child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ModelError::Process(format!("failed to start {}: {}", self.program, e)))?;

        // Dropping the future on timeout drops the child, which kills it
        let output = tokio::time::timeout(timeout, child.wait_with_output())
            .await
            .map_err(|_| ModelError::Timeout {
                secs: timeout.as_secs(),
            })?
            .map_err(|e| ModelError::Process(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(ModelError::Process(format!("Error: {}", stderr)));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// Model names from `ollama list` output (first column, header skipped)
pub fn parse_list_output(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .skip(1)
        .filter_map(|line| line.split_whitespace().next())
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl ModelServer for OllamaCli {
    async fn generate(&self, request: &ModelRequest) -> Result<ModelReply, ModelError> {
        let started = Instant::now();
        debug!(model = %request.model, "ollama run");
        let text = self
            .run(&["run", &request.model, &request.prompt], request.timeout)
            .await?;
        Ok(ModelReply {
            model: request.model.clone(),
            text,
            elapsed: started.elapsed(),
        })
    }

    async fn chat(&self, request: &ModelRequest) -> Result<ModelReply, ModelError> {
        // The CLI has no separate chat mode; a single-turn chat is a run
        self.generate(request).await
    }

    async fn list_models(&self) -> Result<Vec<String>, ModelError> {
        let stdout = self
            .run(&["list"], Duration::from_secs(LIST_TIMEOUT_SECS))
            .await?;
        Ok(parse_list_output(&stdout))
    }

    fn name(&self) -> &str {
        "ollama-cli"
    }
}

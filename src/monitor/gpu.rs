// GPU status via nvidia-smi

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

const NVIDIA_SMI_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpuInfo {
    pub name: String,
    pub memory_used_mb: u64,
    pub memory_total_mb: u64,
    pub utilization_percent: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GpuStatus {
    Available(GpuInfo),
    Unavailable,
}

/// Parse one `name, memory.used, memory.total, utilization.gpu` CSV line
pub fn parse_nvidia_smi(line: &str) -> Option<GpuInfo> {
    let fields: Vec<&str> = line.trim().split(',').map(str::trim).collect();
    if fields.len() < 4 || fields[0].is_empty() {
        return None;
    }
    Some(GpuInfo {
        name: fields[0].to_string(),
        memory_used_mb: fields[1].parse().ok()?,
        memory_total_mb: fields[2].parse().ok()?,
        utilization_percent: fields[3].parse().ok()?,
    })
}

/// Query the first GPU. Any failure (no driver, no binary, timeout) is Unavailable.
pub async fn gpu_stats() -> GpuStatus {
    let mut cmd = Command::new("nvidia-smi");
    cmd.args([
        "--query-gpu=name,memory.used,memory.total,utilization.gpu",
        "--format=csv,noheader,nounits",
    ])
    .kill_on_drop(true);

    let output = match tokio::time::timeout(NVIDIA_SMI_TIMEOUT, cmd.output()).await {
        Ok(Ok(output)) if output.status.success() => output,
        Ok(Ok(output)) => {
            debug!(code = ?output.status.code(), "nvidia-smi exited with failure");
            return GpuStatus::Unavailable;
        }
        Ok(Err(e)) => {
            debug!(error = %e, "nvidia-smi not available");
            return GpuStatus::Unavailable;
        }
        Err(_) => return GpuStatus::Unavailable,
    };

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .and_then(parse_nvidia_smi)
        .map(GpuStatus::Available)
        .unwrap_or(GpuStatus::Unavailable)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line() {
        let gpu = parse_nvidia_smi("NVIDIA GeForce RTX 4090, 2048, 24564, 37\n").unwrap();
        assert_eq!(gpu.name, "NVIDIA GeForce RTX 4090");
        assert_eq!(gpu.memory_used_mb, 2048);
        assert_eq!(gpu.memory_total_mb, 24564);
        assert_eq!(gpu.utilization_percent, 37);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_nvidia_smi("").is_none());
        assert!(parse_nvidia_smi("GPU, N/A, 24564, 37").is_none());
        assert!(parse_nvidia_smi("only, three, fields").is_none());
    }
}

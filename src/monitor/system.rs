// Host resource sampling - CPU, memory, disks

use serde::{Deserialize, Serialize};
use std::path::Path;
use sysinfo::{Disks, System};

use crate::config::constants::{BYTES_PER_GB, BYTES_PER_TB};

/// Used/total pair for memory or a disk
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub total_bytes: u64,
    pub used_bytes: u64,
}

impl Usage {
    pub fn new(total_bytes: u64, used_bytes: u64) -> Self {
        Self {
            total_bytes,
            used_bytes: used_bytes.min(total_bytes),
        }
    }

    pub fn total_gb(&self) -> f64 {
        self.total_bytes as f64 / BYTES_PER_GB
    }

    pub fn used_gb(&self) -> f64 {
        self.used_bytes as f64 / BYTES_PER_GB
    }

    pub fn free_gb(&self) -> f64 {
        (self.total_bytes - self.used_bytes) as f64 / BYTES_PER_GB
    }

    /// Percentage used; zero for an empty total
    pub fn percent(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        self.used_bytes as f64 / self.total_bytes as f64 * 100.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemStats {
    pub cpu_percent: f64,
    pub memory: Usage,
    /// Root filesystem
    pub disk: Usage,
}

impl SystemStats {
    pub fn format_status(&self) -> String {
        format!(
            "CPU {:.1}% | RAM {:.1}/{:.1}GB ({:.1}%) | Disk {:.1}/{:.1}GB ({:.1}%)",
            self.cpu_percent,
            self.memory.used_gb(),
            self.memory.total_gb(),
            self.memory.percent(),
            self.disk.used_gb(),
            self.disk.total_gb(),
            self.disk.percent()
        )
    }
}

/// One mounted filesystem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageInfo {
    pub mount_point: String,
    pub file_system: String,
    pub usage: Usage,
}

/// The dedicated storage volume, if present
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MountStatus {
    Mounted {
        total_tb: f64,
        used_tb: f64,
        free_tb: f64,
    },
    NotMounted,
}

impl MountStatus {
    fn from_usage(usage: Usage) -> Self {
        MountStatus::Mounted {
            total_tb: usage.total_bytes as f64 / BYTES_PER_TB,
            used_tb: usage.used_bytes as f64 / BYTES_PER_TB,
            free_tb: (usage.total_bytes - usage.used_bytes) as f64 / BYTES_PER_TB,
        }
    }
}

/// Long-lived sampler. CPU usage is measured between consecutive refreshes,
/// so keep one around instead of creating a new one per sample.
pub struct SystemSampler {
    system: System,
    disks: Disks,
}

impl Default for SystemSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemSampler {
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_cpu_usage();
        system.refresh_memory();
        Self {
            system,
            disks: Disks::new_with_refreshed_list(),
        }
    }

    /// Wait long enough for the first CPU reading to be meaningful
    pub async fn warm_up(&mut self) {
        tokio::time::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL).await;
        self.system.refresh_cpu_usage();
    }

    pub fn sample(&mut self) -> SystemStats {
        self.system.refresh_cpu_usage();
        self.system.refresh_memory();
        self.disks.refresh_list();

        let memory = Usage::new(self.system.total_memory(), self.system.used_memory());
        SystemStats {
            cpu_percent: self.system.global_cpu_usage() as f64,
            memory,
            disk: root_usage(&self.partitions()),
        }
    }

    /// Every mounted filesystem with a non-zero size
    pub fn partitions(&self) -> Vec<StorageInfo> {
        let mut partitions: Vec<StorageInfo> = self
            .disks
            .list()
            .iter()
            .filter(|disk| disk.total_space() > 0)
            .map(|disk| StorageInfo {
                mount_point: disk.mount_point().display().to_string(),
                file_system: disk.file_system().to_string_lossy().into_owned(),
                usage: Usage::new(
                    disk.total_space(),
                    disk.total_space().saturating_sub(disk.available_space()),
                ),
            })
            .collect();
        partitions.sort_by(|a, b| a.mount_point.cmp(&b.mount_point));
        partitions.dedup_by(|a, b| a.mount_point == b.mount_point);
        partitions
    }

    pub fn storage_mount(&self, mount: &Path) -> MountStatus {
        mount_status(&self.partitions(), mount)
    }
}

/// Usage of "/", or of the largest filesystem when there is no root mount
pub fn root_usage(partitions: &[StorageInfo]) -> Usage {
    partitions
        .iter()
        .find(|p| p.mount_point == "/")
        .or_else(|| partitions.iter().max_by_key(|p| p.usage.total_bytes))
        .map(|p| p.usage)
        .unwrap_or_default()
}

pub fn mount_status(partitions: &[StorageInfo], mount: &Path) -> MountStatus {
    partitions
        .iter()
        .find(|p| Path::new(&p.mount_point) == mount)
        .map(|p| MountStatus::from_usage(p.usage))
        .unwrap_or(MountStatus::NotMounted)
}

// Host and family monitoring
//
// Sampling is split from presentation: the dashboards render snapshots built
// here, and the metrics store keeps a rolling history for charts.

pub mod family;
pub mod gpu;
pub mod level;
pub mod store;
pub mod system;

pub use family::{family_from_listing, family_status, FamilyStatus, MemberModelState};
pub use gpu::{gpu_stats, parse_nvidia_smi, GpuInfo, GpuStatus};
pub use level::{Level, Thresholds};
pub use store::{MetricSample, MetricsStore};
pub use system::{
    mount_status, root_usage, MountStatus, StorageInfo, SystemSampler, SystemStats, Usage,
};

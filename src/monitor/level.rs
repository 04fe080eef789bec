// Warning levels for resource percentages

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Level {
    Normal,
    Warning,
    Critical,
}

/// Percent above which a resource is `Warning` / `Critical`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub warning: f64,
    pub critical: f64,
}

impl Thresholds {
    pub const CPU: Thresholds = Thresholds {
        warning: 60.0,
        critical: 80.0,
    };
    pub const MEMORY: Thresholds = Thresholds {
        warning: 70.0,
        critical: 85.0,
    };
    pub const DISK: Thresholds = Thresholds {
        warning: 80.0,
        critical: 90.0,
    };

    pub fn level(&self, percent: f64) -> Level {
        if percent > self.critical {
            Level::Critical
        } else if percent > self.warning {
            Level::Warning
        } else {
            Level::Normal
        }
    }
}

impl Level {
    pub fn cpu(percent: f64) -> Self {
        Thresholds::CPU.level(percent)
    }

    pub fn memory(percent: f64) -> Self {
        Thresholds::MEMORY.level(percent)
    }

    pub fn disk(percent: f64) -> Self {
        Thresholds::DISK.level(percent)
    }

    pub fn marker(&self) -> &'static str {
        match self {
            Level::Normal => "🟢",
            Level::Warning => "🟡",
            Level::Critical => "🔴",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundaries_are_exclusive() {
        assert_eq!(Level::cpu(60.0), Level::Normal);
        assert_eq!(Level::cpu(60.1), Level::Warning);
        assert_eq!(Level::cpu(80.0), Level::Warning);
        assert_eq!(Level::cpu(80.5), Level::Critical);
    }

    #[test]
    fn test_per_resource_thresholds() {
        assert_eq!(Level::memory(75.0), Level::Warning);
        assert_eq!(Level::memory(86.0), Level::Critical);
        assert_eq!(Level::disk(75.0), Level::Normal);
        assert_eq!(Level::disk(91.0), Level::Critical);
    }
}

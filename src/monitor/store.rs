// Metrics history in SQLite
//
// One row per second (later writes in the same second replace earlier ones).
// The schema is created once and kept; rows age out through `prune`.

use anyhow::{Context, Result};
use chrono::Local;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use super::system::SystemStats;
use crate::config::constants::METRICS_HISTORY_LIMIT;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS metrics (
    timestamp INTEGER PRIMARY KEY,
    cpu       REAL NOT NULL,
    memory    REAL NOT NULL,
    memory_gb REAL NOT NULL,
    disk      REAL NOT NULL
);
";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    /// Unix seconds
    pub timestamp: i64,
    pub cpu: f64,
    pub memory: f64,
    pub memory_gb: f64,
    pub disk: f64,
}

impl MetricSample {
    pub fn from_stats(stats: &SystemStats, timestamp: i64) -> Self {
        Self {
            timestamp,
            cpu: stats.cpu_percent,
            memory: stats.memory.percent(),
            memory_gb: stats.memory.used_gb(),
            disk: stats.disk.percent(),
        }
    }

    pub fn now(stats: &SystemStats) -> Self {
        Self::from_stats(stats, Local::now().timestamp())
    }
}

/// `now` minus `hours`, saturating at `i64::MIN` for huge windows
fn cutoff_before(now: i64, hours: u64) -> i64 {
    let span = i64::try_from(hours).unwrap_or(i64::MAX).saturating_mul(3600);
    now.saturating_sub(span)
}

pub struct MetricsStore {
    conn: Connection,
}

impl MetricsStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open metrics database: {}", path.display()))?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory().context("Failed to open in-memory database")?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)
            .context("Failed to create metrics schema")?;
        Ok(Self { conn })
    }

    pub fn record(&self, sample: &MetricSample) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO metrics (timestamp, cpu, memory, memory_gb, disk)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    sample.timestamp,
                    sample.cpu,
                    sample.memory,
                    sample.memory_gb,
                    sample.disk
                ],
            )
            .context("Failed to record metrics")?;
        Ok(())
    }

    /// Samples at or after `since`, oldest first. Only the newest
    /// `METRICS_HISTORY_LIMIT` rows are returned.
    pub fn history_since(&self, since: i64) -> Result<Vec<MetricSample>> {
        let mut stmt = self.conn.prepare(
            "SELECT timestamp, cpu, memory, memory_gb, disk FROM metrics
             WHERE timestamp >= ?1 ORDER BY timestamp DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![since, METRICS_HISTORY_LIMIT as i64], |row| {
            Ok(MetricSample {
                timestamp: row.get(0)?,
                cpu: row.get(1)?,
                memory: row.get(2)?,
                memory_gb: row.get(3)?,
                disk: row.get(4)?,
            })
        })?;

        let mut samples = rows
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read metrics history")?;
        samples.reverse();
        Ok(samples)
    }

    /// The last `hours` of samples, oldest first
    pub fn history(&self, hours: u64) -> Result<Vec<MetricSample>> {
        self.history_since(cutoff_before(Local::now().timestamp(), hours))
    }

    /// Delete samples older than `hours`. Returns rows removed.
    pub fn prune(&self, hours: u64) -> Result<usize> {
        self.prune_before(cutoff_before(Local::now().timestamp(), hours))
    }

    pub fn prune_before(&self, cutoff: i64) -> Result<usize> {
        let removed = self
            .conn
            .execute("DELETE FROM metrics WHERE timestamp < ?1", params![cutoff])
            .context("Failed to prune metrics")?;
        if removed > 0 {
            debug!(removed, "Pruned old metrics");
        }
        Ok(removed)
    }

    pub fn len(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM metrics", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

// Integration tests for the metrics store and dashboard rendering

use anyhow::Result;
use chrono::Local;
use honeyduo::dashboard::{render_dashboard, DashboardSnapshot, HistoryWindow};
use honeyduo::monitor::{MetricSample, MetricsStore, StorageInfo, SystemStats, Usage};
use ratatui::{backend::TestBackend, Terminal};
use std::collections::BTreeMap;

fn sample(timestamp: i64, cpu: f64) -> MetricSample {
    MetricSample {
        timestamp,
        cpu,
        memory: 50.0,
        memory_gb: 8.0,
        disk: 40.0,
    }
}

#[test]
fn test_store_survives_reopen_and_prunes() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let db = dir.path().join("monitoring").join("metrics.db");
    let now = Local::now().timestamp();

    {
        let store = MetricsStore::open(&db)?;
        store.record(&sample(now - 72 * 3600, 5.0))?;
        store.record(&sample(now - 60, 10.0))?;
        store.record(&sample(now, 20.0))?;
    }

    let store = MetricsStore::open(&db)?;
    assert_eq!(store.len()?, 3);

    let recent = store.history(1)?;
    assert_eq!(recent.len(), 2);
    assert!(recent[0].timestamp < recent[1].timestamp);

    assert_eq!(store.prune(48)?, 1);
    assert_eq!(store.len()?, 2);
    Ok(())
}

#[test]
fn test_same_second_replaces_row() -> Result<()> {
    let store = MetricsStore::open_in_memory()?;
    store.record(&sample(1_000, 10.0))?;
    store.record(&sample(1_000, 30.0))?;
    let rows = store.history_since(0)?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].cpu, 30.0);
    Ok(())
}

#[test]
fn test_dashboard_renders_stored_history() -> Result<()> {
    let store = MetricsStore::open_in_memory()?;
    let now = Local::now().timestamp();
    for i in 0..5 {
        store.record(&sample(now - i * 300, 20.0 + i as f64))?;
    }

    let gb = 1_073_741_824;
    let snapshot = DashboardSnapshot {
        taken: Local::now(),
        stats: SystemStats {
            cpu_percent: 12.0,
            memory: Usage::new(16 * gb, 8 * gb),
            disk: Usage::new(200 * gb, 100 * gb),
        },
        partitions: vec![StorageInfo {
            mount_point: "/".into(),
            file_system: "btrfs".into(),
            usage: Usage::new(200 * gb, 100 * gb),
        }],
        history: store.history(6)?,
        window: HistoryWindow::SixHours,
        training: BTreeMap::new(),
        refresh_secs: 30,
    };

    let mut terminal = Terminal::new(TestBackend::new(120, 40))?;
    terminal.draw(|f| render_dashboard(f, &snapshot))?;
    let buffer = terminal.backend().buffer();
    let text: String = buffer.content.iter().map(|c| c.symbol()).collect();

    assert!(text.contains("btrfs"));
    assert!(text.contains("5 samples"));
    assert!(text.contains("History (6h)"));
    Ok(())
}

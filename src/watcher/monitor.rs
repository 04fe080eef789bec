// Recursive file watcher feeding a channel
//
// The notify callback only queues; filtering happens in the consumer.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{info, warn};
use walkdir::WalkDir;

use super::filter::CodeFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Created,
    Modified,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub file_path: PathBuf,
    pub event_type: ChangeKind,
    pub timestamp: DateTime<Local>,
}

impl ChangeEvent {
    pub fn new(file_path: PathBuf, event_type: ChangeKind) -> Self {
        Self {
            file_path,
            event_type,
            timestamp: Local::now(),
        }
    }
}

/// Map a notify event kind to the two kinds the learner cares about
pub fn classify(kind: &EventKind) -> Option<ChangeKind> {
    match kind {
        EventKind::Create(_) => Some(ChangeKind::Created),
        EventKind::Modify(ModifyKind::Metadata(_)) => None,
        EventKind::Modify(_) => Some(ChangeKind::Modified),
        _ => None,
    }
}

fn forward(tx: &UnboundedSender<ChangeEvent>, event: Event) {
    let Some(kind) = classify(&event.kind) else {
        return;
    };
    for path in event.paths {
        if path.is_dir() {
            continue;
        }
        if tx.send(ChangeEvent::new(path, kind)).is_err() {
            // receiver gone; the learner is shutting down
            return;
        }
    }
}

pub struct FileMonitor {
    watcher: RecommendedWatcher,
    root: PathBuf,
    tx: UnboundedSender<ChangeEvent>,
}

impl FileMonitor {
    /// Start watching `root` recursively
    pub fn start(root: &Path) -> Result<(Self, UnboundedReceiver<ChangeEvent>)> {
        let (tx, rx) = mpsc::unbounded_channel();

        let watch_tx = tx.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => forward(&watch_tx, event),
            Err(e) => warn!(error = %e, "File watch error"),
        })
        .context("Failed to create file watcher")?;

        watcher
            .watch(root, RecursiveMode::Recursive)
            .with_context(|| format!("Failed to watch {}", root.display()))?;

        info!(root = %root.display(), "File monitoring started");
        Ok((
            Self {
                watcher,
                root: root.to_path_buf(),
                tx,
            },
            rx,
        ))
    }

    /// Queue events behind whatever the watcher has already reported.
    /// Returns how many were queued.
    pub fn enqueue(&self, events: impl IntoIterator<Item = ChangeEvent>) -> usize {
        let mut queued = 0;
        for event in events {
            if self.tx.send(event).is_err() {
                break;
            }
            queued += 1;
        }
        queued
    }

    pub fn stop(mut self) {
        if let Err(e) = self.watcher.unwatch(&self.root) {
            warn!(error = %e, "Failed to unwatch project root");
        }
        info!("File monitoring stopped");
    }
}

/// Every user-code file under `root`, as `created` events
pub fn scan_existing(root: &Path, filter: &CodeFilter) -> Vec<ChangeEvent> {
    WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| {
            let name = e.file_name().to_string_lossy();
            !(e.file_type().is_dir()
                && matches!(
                    name.as_ref(),
                    ".git" | "target" | "node_modules" | ".venv" | "venv" | "__pycache__"
                ))
        })
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| filter.is_user_code(e.path()))
        .map(|e| ChangeEvent::new(e.into_path(), ChangeKind::Created))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, MetadataKind, RemoveKind};
    use std::fs;

    #[test]
    fn test_classify() {
        assert_eq!(
            classify(&EventKind::Create(CreateKind::File)),
            Some(ChangeKind::Created)
        );
        assert_eq!(
            classify(&EventKind::Modify(ModifyKind::Data(DataChange::Content))),
            Some(ChangeKind::Modified)
        );
        assert_eq!(
            classify(&EventKind::Modify(ModifyKind::Metadata(MetadataKind::AccessTime))),
            None
        );
        assert_eq!(classify(&EventKind::Remove(RemoveKind::File)), None);
    }

    #[test]
    fn test_forward_skips_directories() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.py");
        fs::write(&file, "print(1)").unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let event = Event::new(EventKind::Create(CreateKind::Any))
            .add_path(dir.path().to_path_buf())
            .add_path(file.clone());
        forward(&tx, event);

        let got = rx.try_recv().unwrap();
        assert_eq!(got.file_path, file);
        assert_eq!(got.event_type, ChangeKind::Created);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_scan_existing_prunes_and_filters() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::create_dir_all(root.join("target/debug")).unwrap();
        fs::write(root.join("src/main.py"), "x").unwrap();
        fs::write(root.join("target/debug/out.py"), "x").unwrap();
        fs::write(root.join("image.png"), "x").unwrap();

        let events = scan_existing(root, &CodeFilter::default());
        assert_eq!(events.len(), 1);
        assert!(events[0].file_path.ends_with("src/main.py"));
    }

    #[test]
    fn test_event_json_shape() {
        let event = ChangeEvent::new(PathBuf::from("/p/a.py"), ChangeKind::Modified);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event_type"], "modified");
        assert_eq!(json["file_path"], "/p/a.py");
    }

    #[tokio::test]
    async fn test_watcher_reports_new_file() {
        let dir = tempfile::tempdir().unwrap();
        let (monitor, mut rx) = FileMonitor::start(dir.path()).unwrap();

        let file = dir.path().join("new.py");
        fs::write(&file, "print('hi')").unwrap();

        let event = tokio::time::timeout(std::time::Duration::from_secs(5), rx.recv())
            .await
            .expect("no event within 5s")
            .unwrap();
        assert!(event.file_path.ends_with("new.py"));
        monitor.stop();
    }

    #[tokio::test]
    async fn test_enqueue_feeds_the_same_channel() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.py"), "x").unwrap();
        fs::write(dir.path().join("b.rs"), "x").unwrap();
        let (monitor, mut rx) = FileMonitor::start(dir.path()).unwrap();

        let scanned = scan_existing(dir.path(), &CodeFilter::default());
        assert_eq!(monitor.enqueue(scanned), 2);

        let mut names = Vec::new();
        while names.len() < 2 {
            let event = tokio::time::timeout(std::time::Duration::from_secs(5), rx.recv())
                .await
                .expect("queued events not delivered")
                .unwrap();
            names.push(event.file_path.file_name().unwrap().to_string_lossy().into_owned());
        }
        names.sort();
        assert_eq!(names, vec!["a.py", "b.rs"]);
        monitor.stop();
    }
}

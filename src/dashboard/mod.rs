// Terminal dashboards
//
// Two full-screen views share one event loop shape: refresh a snapshot on a
// fixed period, redraw, and poll the keyboard in between. Rendering only sees
// snapshot structs.

pub mod metrics_view;
pub mod system_view;

pub use metrics_view::{render_dashboard, DashboardSnapshot};
pub use system_view::{render_monitor, MonitorSnapshot};

use anyhow::{Context, Result};
use chrono::Local;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, style::Color, Terminal};
use serde::{Deserialize, Serialize};
use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::config::Config;
use crate::monitor::{Level, MetricSample, MetricsStore, SystemSampler, SystemStats};
use crate::ollama::ModelServer;
use crate::training::ModelVersionManager;

const KEY_POLL: Duration = Duration::from_millis(250);

type Term = Terminal<CrosstermBackend<Stdout>>;

/// Span of history shown in the dashboard charts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HistoryWindow {
    #[default]
    SixHours,
    Day,
    TwoDays,
}

impl HistoryWindow {
    pub fn hours(&self) -> u64 {
        match self {
            HistoryWindow::SixHours => 6,
            HistoryWindow::Day => 24,
            HistoryWindow::TwoDays => 48,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            HistoryWindow::SixHours => "6h",
            HistoryWindow::Day => "24h",
            HistoryWindow::TwoDays => "48h",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Quit,
    Refresh,
    Window(HistoryWindow),
}

pub fn key_action(key: KeyEvent) -> Option<KeyAction> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => Some(KeyAction::Quit),
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(KeyAction::Quit)
        }
        KeyCode::Char('r') => Some(KeyAction::Refresh),
        KeyCode::Char('1') => Some(KeyAction::Window(HistoryWindow::SixHours)),
        KeyCode::Char('2') => Some(KeyAction::Window(HistoryWindow::Day)),
        KeyCode::Char('3') => Some(KeyAction::Window(HistoryWindow::TwoDays)),
        _ => None,
    }
}

pub(crate) fn level_color(level: Level) -> Color {
    match level {
        Level::Normal => Color::Green,
        Level::Warning => Color::Yellow,
        Level::Critical => Color::Red,
    }
}

fn setup_terminal() -> Result<Term> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    Terminal::new(CrosstermBackend::new(stdout)).context("Failed to create terminal")
}

fn restore_terminal(terminal: &mut Term) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Run `body` inside the alternate screen, restoring the terminal whatever it returns
async fn with_terminal<F, Fut>(body: F) -> Result<()>
where
    F: FnOnce(Term) -> Fut,
    Fut: std::future::Future<Output = (Term, Result<()>)>,
{
    let terminal = setup_terminal()?;
    let (mut terminal, result) = body(terminal).await;
    restore_terminal(&mut terminal)?;
    result
}

/// Next keyboard action, waiting at most `KEY_POLL`
fn poll_key() -> Result<Option<KeyAction>> {
    if event::poll(KEY_POLL)? {
        if let Event::Key(key) = event::read()? {
            return Ok(key_action(key));
        }
    }
    Ok(None)
}

/// Live system monitor (`honeyduo monitor`)
pub async fn run_monitor(config: &Config, server: Arc<dyn ModelServer>) -> Result<()> {
    let refresh = Duration::from_secs(config.monitor.monitor_refresh_secs);
    let mut sampler = SystemSampler::new();
    sampler.warm_up().await;

    info!("System monitor started");
    with_terminal(|mut terminal| async move {
        let result: Result<()> = async {
            let mut snapshot = None;
            let mut last = Instant::now();
            loop {
                if snapshot.is_none() || last.elapsed() >= refresh {
                    snapshot = Some(
                        MonitorSnapshot::capture(
                            &mut sampler,
                            server.as_ref(),
                            &config.family,
                            config.monitor.storage_mount.clone(),
                            refresh.as_secs(),
                        )
                        .await,
                    );
                    last = Instant::now();
                }
                if let Some(snap) = &snapshot {
                    terminal.draw(|f| render_monitor(f, snap))?;
                }
                match poll_key()? {
                    Some(KeyAction::Quit) => return Ok(()),
                    Some(KeyAction::Refresh) => snapshot = None,
                    _ => {}
                }
            }
        }
        .await;
        (terminal, result)
    })
    .await?;
    info!("System monitor stopped");
    Ok(())
}

/// Record one sample and prune rows past retention; returns the stored sample
pub fn record_tick(
    stats: &SystemStats,
    store: &MetricsStore,
    retention_hours: u64,
) -> Result<MetricSample> {
    let sample = MetricSample::now(stats);
    store.record(&sample)?;
    let pruned = store.prune(retention_hours)?;
    if pruned > 0 {
        info!(rows = pruned, "Pruned old metrics");
    }
    Ok(sample)
}

fn dashboard_snapshot(
    sampler: &mut SystemSampler,
    store: &MetricsStore,
    versions: &ModelVersionManager,
    config: &Config,
    window: HistoryWindow,
) -> Result<DashboardSnapshot> {
    let stats = sampler.sample();
    record_tick(&stats, store, config.monitor.retention_hours)?;

    let training = versions.status(None).unwrap_or_else(|e| {
        warn!(error = %e, "Training status unavailable");
        Default::default()
    });

    Ok(DashboardSnapshot {
        taken: Local::now(),
        stats,
        partitions: sampler.partitions(),
        history: store.history(window.hours())?,
        window,
        training,
        refresh_secs: config.monitor.dashboard_refresh_secs,
    })
}

/// Metrics dashboard with history charts (`honeyduo dashboard`)
pub async fn run_dashboard(config: &Config) -> Result<()> {
    let paths = config.paths();
    let store = MetricsStore::open(&paths.metrics_db())?;
    let versions = ModelVersionManager::new(paths)?;
    let refresh = Duration::from_secs(config.monitor.dashboard_refresh_secs);
    let mut sampler = SystemSampler::new();
    sampler.warm_up().await;

    info!("Metrics dashboard started");
    with_terminal(|mut terminal| async move {
        let result = (|| -> Result<()> {
            let mut window = HistoryWindow::default();
            let mut snapshot =
                dashboard_snapshot(&mut sampler, &store, &versions, config, window)?;
            let mut last = Instant::now();
            loop {
                if last.elapsed() >= refresh {
                    snapshot = dashboard_snapshot(&mut sampler, &store, &versions, config, window)?;
                    last = Instant::now();
                }
                terminal.draw(|f| render_dashboard(f, &snapshot))?;
                match poll_key()? {
                    Some(KeyAction::Quit) => return Ok(()),
                    Some(KeyAction::Window(w)) => {
                        window = w;
                        snapshot.window = w;
                        snapshot.history = store.history(w.hours())?;
                    }
                    Some(KeyAction::Refresh) => {
                        snapshot = dashboard_snapshot(&mut sampler, &store, &versions, config, window)?;
                        last = Instant::now();
                    }
                    None => {}
                }
            }
        })();
        (terminal, result)
    })
    .await?;
    info!("Metrics dashboard stopped");
    Ok(())
}

/// Flatten a rendered buffer to text, one line per row
#[cfg(test)]
pub(crate) fn buffer_text(buffer: &ratatui::buffer::Buffer) -> String {
    let width = buffer.area.width as usize;
    buffer
        .content
        .chunks(width.max(1))
        .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_key_actions() {
        assert_eq!(key_action(key(KeyCode::Char('q'))), Some(KeyAction::Quit));
        assert_eq!(key_action(key(KeyCode::Esc)), Some(KeyAction::Quit));
        assert_eq!(
            key_action(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(KeyAction::Quit)
        );
        assert_eq!(
            key_action(key(KeyCode::Char('2'))),
            Some(KeyAction::Window(HistoryWindow::Day))
        );
        assert_eq!(key_action(key(KeyCode::Char('x'))), None);
    }

    #[test]
    fn test_window_hours() {
        assert_eq!(HistoryWindow::default().hours(), 6);
        assert_eq!(HistoryWindow::TwoDays.label(), "48h");
    }

    #[test]
    fn test_record_tick_stores_a_row() {
        let store = MetricsStore::open_in_memory().unwrap();
        let stats = SystemSampler::new().sample();
        let sample = record_tick(&stats, &store, 48).unwrap();
        assert_eq!(store.len().unwrap(), 1);
        assert!(sample.memory >= 0.0 && sample.memory <= 100.0);
    }
}

// Live system monitor view
//
// System resources, GPU, the storage mount and which family models the
// server has loaded.

use chrono::{DateTime, Local};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use std::path::PathBuf;

use super::level_color;
use crate::monitor::{
    FamilyStatus, GpuStatus, Level, MountStatus, SystemSampler, SystemStats,
};

/// Everything one frame of the monitor shows
#[derive(Debug, Clone)]
pub struct MonitorSnapshot {
    pub taken: DateTime<Local>,
    pub stats: SystemStats,
    pub gpu: GpuStatus,
    pub mount_path: PathBuf,
    pub mount: MountStatus,
    pub family: FamilyStatus,
    pub refresh_secs: u64,
}

impl MonitorSnapshot {
    pub async fn capture(
        sampler: &mut SystemSampler,
        server: &dyn crate::ollama::ModelServer,
        roster: &crate::family::Roster,
        mount_path: PathBuf,
        refresh_secs: u64,
    ) -> Self {
        let stats = sampler.sample();
        let mount = sampler.storage_mount(&mount_path);
        Self {
            taken: Local::now(),
            stats,
            gpu: crate::monitor::gpu_stats().await,
            mount_path,
            mount,
            family: crate::monitor::family_status(server, roster).await,
            refresh_secs,
        }
    }
}

fn resource_line(label: &str, text: String, level: Level) -> Line<'static> {
    Line::from(vec![
        Span::styled(
            format!("{:<8}", label),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::styled(text, Style::default().fg(level_color(level))),
    ])
}

fn system_lines(stats: &SystemStats) -> Vec<Line<'static>> {
    vec![
        resource_line(
            "CPU",
            format!("{:.1}%", stats.cpu_percent),
            Level::cpu(stats.cpu_percent),
        ),
        resource_line(
            "Memory",
            format!(
                "{:.1}% ({:.1}GB / {:.1}GB)",
                stats.memory.percent(),
                stats.memory.used_gb(),
                stats.memory.total_gb()
            ),
            Level::memory(stats.memory.percent()),
        ),
        resource_line(
            "Disk",
            format!(
                "{:.1}% ({:.1}GB / {:.1}GB)",
                stats.disk.percent(),
                stats.disk.used_gb(),
                stats.disk.total_gb()
            ),
            Level::disk(stats.disk.percent()),
        ),
    ]
}

fn gpu_lines(gpu: &GpuStatus) -> Vec<Line<'static>> {
    match gpu {
        GpuStatus::Available(info) => vec![
            Line::from(format!("GPU:     {}", info.name)),
            Line::from(format!(
                "Memory:  {}MB / {}MB",
                info.memory_used_mb, info.memory_total_mb
            )),
            Line::from(format!("Usage:   {}%", info.utilization_percent)),
        ],
        GpuStatus::Unavailable => vec![Line::styled(
            "GPU monitoring unavailable",
            Style::default().fg(Color::DarkGray),
        )],
    }
}

fn mount_lines(path: &std::path::Path, mount: &MountStatus) -> Vec<Line<'static>> {
    match mount {
        MountStatus::Mounted {
            total_tb,
            used_tb,
            free_tb,
        } => vec![
            Line::from(format!("Mount:   {}", path.display())),
            Line::from(format!("Total:   {:.1}TB", total_tb)),
            Line::from(format!("Used:    {:.1}TB", used_tb)),
            Line::from(format!("Free:    {:.1}TB", free_tb)),
        ],
        MountStatus::NotMounted => vec![Line::styled(
            format!("{} not mounted", path.display()),
            Style::default().fg(Color::Yellow),
        )],
    }
}

fn family_lines(family: &FamilyStatus) -> Vec<Line<'static>> {
    match family {
        FamilyStatus::Online(members) => members
            .iter()
            .map(|state| {
                let color = if state.available {
                    Color::Green
                } else {
                    Color::Yellow
                };
                Line::from(vec![
                    Span::styled(
                        format!("{:<8}", state.member.display_name()),
                        Style::default().add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(format!("{:<14}", state.model)),
                    Span::styled(state.label(), Style::default().fg(color)),
                ])
            })
            .collect(),
        FamilyStatus::Offline(reason) => vec![Line::styled(
            reason.clone(),
            Style::default().fg(Color::Red),
        )],
    }
}

fn panel<'a>(title: &'a str, lines: Vec<Line<'a>>) -> Paragraph<'a> {
    Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title))
}

pub fn render_monitor(frame: &mut Frame, snapshot: &MonitorSnapshot) {
    let area: Rect = frame.area();
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(6),
            Constraint::Length(6),
            Constraint::Min(5),
            Constraint::Length(1),
        ])
        .split(area);

    let title = Paragraph::new(Line::from(vec![
        Span::styled(
            "HONEY DUO WEALTH - System Monitor",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!("   {}", snapshot.taken.format("%Y-%m-%d %H:%M:%S"))),
    ]))
    .block(Block::default().borders(Borders::ALL));
    frame.render_widget(title, rows[0]);

    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[1]);
    frame.render_widget(panel("System Resources", system_lines(&snapshot.stats)), middle[0]);
    frame.render_widget(panel("GPU", gpu_lines(&snapshot.gpu)), middle[1]);

    frame.render_widget(
        panel(
            "Storage",
            mount_lines(&snapshot.mount_path, &snapshot.mount),
        ),
        rows[2],
    );
    frame.render_widget(panel("AI Family", family_lines(&snapshot.family)), rows[3]);

    let footer = Paragraph::new(Line::styled(
        format!(
            "Next update in {}s | q/Esc to quit",
            snapshot.refresh_secs
        ),
        Style::default().fg(Color::DarkGray),
    ));
    frame.render_widget(footer, rows[4]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::buffer_text;
    use crate::family::Member;
    use crate::monitor::{GpuInfo, MemberModelState, Usage};
    use ratatui::{backend::TestBackend, Terminal};

    const GB: u64 = 1_073_741_824;

    fn snapshot() -> MonitorSnapshot {
        MonitorSnapshot {
            taken: Local::now(),
            stats: SystemStats {
                cpu_percent: 42.5,
                memory: Usage::new(32 * GB, 8 * GB),
                disk: Usage::new(500 * GB, 450 * GB),
            },
            gpu: GpuStatus::Unavailable,
            mount_path: PathBuf::from("/mnt/honey_duo_storage"),
            mount: MountStatus::NotMounted,
            family: FamilyStatus::Online(vec![MemberModelState {
                member: Member::Nyala,
                model: "phi:2.7b".into(),
                available: true,
                backup_model: "llama3.2:1b".into(),
                backup_available: false,
            }]),
            refresh_secs: 5,
        }
    }

    fn draw(snapshot: &MonitorSnapshot) -> String {
        let mut terminal = Terminal::new(TestBackend::new(90, 32)).unwrap();
        terminal.draw(|f| render_monitor(f, snapshot)).unwrap();
        buffer_text(terminal.backend().buffer())
    }

    #[test]
    fn test_renders_all_panels() {
        let text = draw(&snapshot());
        assert!(text.contains("System Monitor"));
        assert!(text.contains("42.5%"));
        assert!(text.contains("90.0%"));
        assert!(text.contains("GPU monitoring unavailable"));
        assert!(text.contains("/mnt/honey_duo_storage not mounted"));
        assert!(text.contains("NYALA"));
        assert!(text.contains("Ready"));
        assert!(text.contains("Next update in 5s"));
    }

    #[test]
    fn test_gpu_and_mount_details() {
        let mut snap = snapshot();
        snap.gpu = GpuStatus::Available(GpuInfo {
            name: "RTX 4090".into(),
            memory_used_mb: 1024,
            memory_total_mb: 24564,
            utilization_percent: 12,
        });
        snap.mount = MountStatus::Mounted {
            total_tb: 4.0,
            used_tb: 1.5,
            free_tb: 2.5,
        };
        let text = draw(&snap);
        assert!(text.contains("RTX 4090"));
        assert!(text.contains("1024MB / 24564MB"));
        assert!(text.contains("Free:    2.5TB"));
    }

    #[test]
    fn test_offline_family() {
        let mut snap = snapshot();
        snap.family = FamilyStatus::Offline("Cannot check model server status".into());
        assert!(draw(&snap).contains("Cannot check model server status"));
    }
}

// Metrics dashboard view: gauges, partitions, history charts, training status

use chrono::{DateTime, Local};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Cell, Chart, Dataset, Gauge, GraphType, Paragraph, Row, Table},
    Frame,
};
use std::collections::BTreeMap;

use super::{level_color, HistoryWindow};
use crate::family::Member;
use crate::monitor::{Level, MetricSample, StorageInfo, SystemStats};
use crate::training::MemberModelStatus;

#[derive(Debug, Clone)]
pub struct DashboardSnapshot {
    pub taken: DateTime<Local>,
    pub stats: SystemStats,
    pub partitions: Vec<StorageInfo>,
    /// Ascending by timestamp
    pub history: Vec<MetricSample>,
    pub window: HistoryWindow,
    pub training: BTreeMap<Member, MemberModelStatus>,
    pub refresh_secs: u64,
}

/// (hours before `now`, value) points for one metric
pub fn series(
    history: &[MetricSample],
    now: i64,
    value: impl Fn(&MetricSample) -> f64,
) -> Vec<(f64, f64)> {
    history
        .iter()
        .map(|s| ((s.timestamp - now) as f64 / 3600.0, value(s)))
        .collect()
}

fn gauge<'a>(title: &'a str, percent: f64, level: Level) -> Gauge<'a> {
    Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(title))
        .gauge_style(Style::default().fg(level_color(level)))
        .ratio((percent / 100.0).clamp(0.0, 1.0))
        .label(format!("{:.1}%", percent))
}

fn partition_table(partitions: &[StorageInfo]) -> Table<'_> {
    let header = Row::new(["Mount", "FS", "Total GB", "Used GB", "Free GB", "Use %"])
        .style(Style::default().add_modifier(Modifier::BOLD));
    let rows = partitions.iter().map(|p| {
        let percent = p.usage.percent();
        Row::new(vec![
            Cell::from(p.mount_point.as_str()),
            Cell::from(p.file_system.as_str()),
            Cell::from(format!("{:.1}", p.usage.total_gb())),
            Cell::from(format!("{:.1}", p.usage.used_gb())),
            Cell::from(format!("{:.1}", p.usage.free_gb())),
            Cell::from(format!("{:.1}%", percent))
                .style(Style::default().fg(level_color(Level::disk(percent)))),
        ])
    });
    Table::new(
        rows,
        [
            Constraint::Percentage(30),
            Constraint::Percentage(14),
            Constraint::Percentage(14),
            Constraint::Percentage(14),
            Constraint::Percentage(14),
            Constraint::Percentage(14),
        ],
    )
    .header(header)
    .block(Block::default().borders(Borders::ALL).title("Storage"))
}

fn training_table(training: &BTreeMap<Member, MemberModelStatus>) -> Table<'static> {
    let header = Row::new(["Member", "Versions", "Latest", "Production", "Examples"])
        .style(Style::default().add_modifier(Modifier::BOLD));
    let rows: Vec<Row> = training
        .iter()
        .map(|(member, status)| {
            Row::new(vec![
                member.display_name().to_string(),
                status.total_versions.to_string(),
                status.latest_version.clone().unwrap_or_else(|| "-".into()),
                status.production_status.clone(),
                status.training_examples.to_string(),
            ])
        })
        .collect();
    Table::new(
        rows,
        [
            Constraint::Percentage(20),
            Constraint::Percentage(15),
            Constraint::Percentage(20),
            Constraint::Percentage(30),
            Constraint::Percentage(15),
        ],
    )
    .header(header)
    .block(Block::default().borders(Borders::ALL).title("AI Family Training"))
}

fn hour_labels(window: HistoryWindow) -> Vec<Span<'static>> {
    let hours = window.hours();
    vec![
        Span::raw(format!("-{}h", hours)),
        Span::raw(format!("-{}h", hours / 2)),
        Span::raw("now"),
    ]
}

fn render_charts(frame: &mut Frame, area: Rect, snapshot: &DashboardSnapshot) {
    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    let now = snapshot.taken.timestamp();
    let x_bounds = [-(snapshot.window.hours() as f64), 0.0];
    let title = format!("History ({})", snapshot.window.label());

    let cpu = series(&snapshot.history, now, |s| s.cpu);
    let memory = series(&snapshot.history, now, |s| s.memory);
    let percent_chart = Chart::new(vec![
        Dataset::default()
            .name("CPU %")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Cyan))
            .data(&cpu),
        Dataset::default()
            .name("Memory %")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Magenta))
            .data(&memory),
    ])
    .block(Block::default().borders(Borders::ALL).title(title))
    .x_axis(
        Axis::default()
            .bounds(x_bounds)
            .labels(hour_labels(snapshot.window)),
    )
    .y_axis(
        Axis::default()
            .bounds([0.0, 100.0])
            .labels(vec![Span::raw("0"), Span::raw("50"), Span::raw("100")]),
    );
    frame.render_widget(percent_chart, halves[0]);

    let memory_gb = series(&snapshot.history, now, |s| s.memory_gb);
    let ceiling = snapshot
        .stats
        .memory
        .total_gb()
        .max(memory_gb.iter().map(|(_, y)| *y).fold(0.0, f64::max))
        .max(1.0);
    let gb_chart = Chart::new(vec![Dataset::default()
        .name("Memory GB")
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Green))
        .data(&memory_gb)])
    .block(Block::default().borders(Borders::ALL).title("Memory Usage (GB)"))
    .x_axis(
        Axis::default()
            .bounds(x_bounds)
            .labels(hour_labels(snapshot.window)),
    )
    .y_axis(Axis::default().bounds([0.0, ceiling]).labels(vec![
        Span::raw("0"),
        Span::raw(format!("{:.0}", ceiling)),
    ]));
    frame.render_widget(gb_chart, halves[1]);
}

pub fn render_dashboard(frame: &mut Frame, snapshot: &DashboardSnapshot) {
    let area = frame.area();
    let partition_rows = snapshot.partitions.len().clamp(1, 6) as u16;
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(partition_rows + 3),
            Constraint::Length(Member::ALL.len() as u16 + 3),
            Constraint::Min(8),
            Constraint::Length(1),
        ])
        .split(area);

    let title = Paragraph::new(Line::from(vec![
        Span::styled(
            "HONEY DUO WEALTH - Metrics Dashboard",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!("   {}", snapshot.taken.format("%Y-%m-%d %H:%M:%S"))),
    ]))
    .block(Block::default().borders(Borders::ALL));
    frame.render_widget(title, rows[0]);

    let gauges = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
        ])
        .split(rows[1]);
    let stats = &snapshot.stats;
    frame.render_widget(
        gauge("CPU", stats.cpu_percent, Level::cpu(stats.cpu_percent)),
        gauges[0],
    );
    frame.render_widget(
        gauge(
            "Memory",
            stats.memory.percent(),
            Level::memory(stats.memory.percent()),
        ),
        gauges[1],
    );
    frame.render_widget(
        gauge("Disk", stats.disk.percent(), Level::disk(stats.disk.percent())),
        gauges[2],
    );

    frame.render_widget(partition_table(&snapshot.partitions), rows[2]);

    if snapshot.training.is_empty() {
        frame.render_widget(
            Paragraph::new("Training status unavailable").block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("AI Family Training"),
            ),
            rows[3],
        );
    } else {
        frame.render_widget(training_table(&snapshot.training), rows[3]);
    }

    render_charts(frame, rows[4], snapshot);

    let footer = Paragraph::new(Line::styled(
        format!(
            "{} samples | refresh {}s | 1/2/3: 6h/24h/48h | q/Esc to quit",
            snapshot.history.len(),
            snapshot.refresh_secs
        ),
        Style::default().fg(Color::DarkGray),
    ));
    frame.render_widget(footer, rows[5]);
}

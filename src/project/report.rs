// Markdown rendering for README and progress reports

use std::fmt::Write;

use super::ProjectStatus;
use crate::family::Member;

fn family_line(status: &ProjectStatus, member: Member) -> String {
    match status.ai_family.get(&member) {
        Some(s) => format!(
            "{} ({}, latest {})",
            s.production_status,
            plural(s.total_versions, "version"),
            s.latest_version.as_deref().unwrap_or("none")
        ),
        None => "Unknown".to_string(),
    }
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("1 {}", word)
    } else {
        format!("{} {}s", n, word)
    }
}

pub fn render_readme(status: &ProjectStatus) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# HONEY DUO WEALTH - AI Portfolio Guardian");
    let _ = writeln!(
        out,
        "**Last Updated:** {}\n",
        status.timestamp.format("%Y-%m-%d %H:%M")
    );

    let _ = writeln!(out, "## Current Status");
    let _ = writeln!(out, "- **Phase:** {}", status.phase);
    let _ = writeln!(
        out,
        "- **Components Ready:** {}",
        status.components.ready_count()
    );
    let deployed = status
        .ai_family
        .values()
        .filter(|s| s.production_status == "Deployed")
        .count();
    let _ = writeln!(
        out,
        "- **AI Family:** {}/{} members deployed\n",
        deployed,
        Member::ALL.len()
    );

    let _ = writeln!(out, "## Quick Start");
    let _ = writeln!(out, "```bash\nhoneyduo health\nhoneyduo monitor\n```\n");

    let _ = writeln!(out, "## System Health");
    for (name, state) in status.components.iter() {
        let _ = writeln!(out, "- {} {}", state.marker(), name);
    }

    let _ = writeln!(out, "\n## CLAUDAE Training Progress");
    let _ = writeln!(
        out,
        "- Total Examples Collected: {}",
        status.training_examples
    );
    let _ = writeln!(
        out,
        "- Categories: Market Data, AI Integration, Trading, Monitoring\n"
    );

    let _ = writeln!(out, "## Links");
    let _ = writeln!(out, "- [Documentation](documentation/)");
    let _ = writeln!(out, "- [Training Data](ai_family/claudae/training/)");
    out
}

pub fn render_progress_report(status: &ProjectStatus) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# HONEY DUO WEALTH Progress Report");
    let _ = writeln!(
        out,
        "**Generated:** {}\n",
        status.timestamp.format("%Y-%m-%d %H:%M:%S")
    );

    let _ = writeln!(out, "## Component Status");
    for (name, state) in status.components.iter() {
        let _ = writeln!(out, "- {} **{}**: {:?}", state.marker(), name, state);
    }

    let _ = writeln!(out, "\n## AI Family Status");
    for member in Member::ALL {
        let _ = writeln!(out, "- **{}**: {}", member, family_line(status, member));
    }

    let _ = writeln!(out, "\n## Next Priorities");
    if status.next_priorities.is_empty() {
        let _ = writeln!(out, "- Nothing outstanding");
    }
    for (i, priority) in status.next_priorities.iter().enumerate() {
        let _ = writeln!(out, "{}. {}", i + 1, priority);
    }

    let _ = writeln!(out, "\n## Training Progress");
    let _ = writeln!(out, "- Examples Collected: {}", status.training_examples);
    let _ = writeln!(
        out,
        "- Last Session: {}",
        status
            .last_training_session
            .as_deref()
            .unwrap_or("No sessions found")
    );

    let _ = writeln!(out, "\n## Recent Changes");
    if status.recent_changes.is_empty() {
        let _ = writeln!(out, "- No git history available");
    }
    for change in &status.recent_changes {
        let _ = writeln!(out, "- {}", change);
    }
    out
}

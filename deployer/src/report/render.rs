//! Markdown rendering of the progress history

use crate::deploy::events::{Phase, ProgressEvent};
use crate::image::EnvHints;

const TIME_FORMAT: &str = "%H:%M:%S UTC";

/// Fixed facts about the deployment shown above the history
#[derive(Debug, Clone, Default)]
pub struct ReportContext {
    pub service: String,
    pub region: String,
    pub image: String,
}

/// Render the whole history; the last entry is the current step
pub fn render(context: &ReportContext, env_hints: Option<&EnvHints>, history: &[ProgressEvent]) -> String {
    let mut lines = vec![
        format!("### {} Cloud Run: `{}`", headline_icon(history), context.service),
        String::new(),
        format!("Image `{}` in region `{}`", context.image, context.region),
        String::new(),
        "| | Step | Details | Time |".to_string(),
        "|---|---|---|---|".to_string(),
    ];

    let last = history.len().saturating_sub(1);
    lines.extend(history.iter().enumerate().map(|(i, event)| {
        let icon = if i < last { "✅" } else { step_icon(event.phase) };
        format!(
            "| {} | {} | {} | {} |",
            icon,
            event.phase.label(),
            escape_cell(&event.detail),
            event.at.format(TIME_FORMAT)
        )
    }));

    if let Some(hints) = env_hints.filter(|h| !h.is_empty()) {
        lines.extend([
            String::new(),
            "<details><summary>Environment variables</summary>".to_string(),
            String::new(),
            "| Name | Source |".to_string(),
            "|---|---|".to_string(),
        ]);
        lines.extend(hints.declared().iter().map(|hint| {
            let source = if hint.overridden { "image, overridden" } else { "image" };
            format!("| `{}` | {} |", hint.name, source)
        }));
        lines.extend(hints.added().iter().map(|name| format!("| `{}` | override |", name)));
        lines.extend([String::new(), "</details>".to_string()]);
    }

    let mut body = lines.join("\n");
    body.push('\n');
    body
}

fn headline_icon(history: &[ProgressEvent]) -> &'static str {
    match history.last().map(|e| e.phase) {
        Some(phase) if phase.is_failure() => "❌",
        Some(phase) if phase.is_terminal() => "✅",
        _ => "⏳",
    }
}

fn step_icon(phase: Phase) -> &'static str {
    if phase.is_failure() {
        "❌"
    } else if phase.is_terminal() {
        "✅"
    } else {
        "⏳"
    }
}

fn escape_cell(detail: &str) -> String {
    detail.replace('|', "\\|").replace('\n', " ")
}

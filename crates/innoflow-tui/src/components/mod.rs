pub mod dashboard;
pub mod idea_details;
pub mod idea_editor;
pub mod idea_list;
pub mod login;
pub mod task_list;
pub mod task_workspace;
pub mod user_admin;

use innoflow_core::idea::{IdeaStatus, Priority, StatusTone};
use ratatui::prelude::*;

pub fn status_style(status: IdeaStatus) -> Style {
    match status.tone() {
        StatusTone::Positive => Style::default().fg(Color::Green),
        StatusTone::Negative => Style::default().fg(Color::Red),
        StatusTone::Pending => Style::default().fg(Color::Yellow),
    }
}

pub fn priority_style(p: Option<Priority>) -> Style {
    match p {
        Some(Priority::High) => Style::default().fg(Color::LightRed).bold(),
        Some(Priority::Medium) => Style::default().fg(Color::Yellow),
        Some(Priority::Low) => Style::default().fg(Color::Blue),
        None => Style::default().fg(Color::DarkGray),
    }
}

/// Single-line text field with a focus marker.
pub fn field_line<'a>(label: &'a str, value: &'a str, focused: bool) -> Line<'a> {
    let marker = if focused { "> " } else { "  " };
    let label_style = if focused {
        Style::default().fg(Color::Cyan).bold()
    } else {
        Style::default().bold()
    };
    let mut spans = vec![
        Span::raw(marker),
        Span::styled(format!("{label}: "), label_style),
        Span::raw(value),
    ];
    if focused {
        spans.push(Span::styled("_", Style::default().fg(Color::Cyan)));
    }
    Line::from(spans)
}

pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

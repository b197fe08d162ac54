use innoflow_core::dashboard::DashboardStats;
use ratatui::prelude::*;
use ratatui::widgets::{Bar, BarChart, BarGroup, Block, Borders, Paragraph};

#[derive(Debug, Default)]
pub struct DashboardView {
    pub stats: Option<DashboardStats>,
    pub error: Option<String>,
    pub loading: bool,
}

impl DashboardView {
    pub fn set_stats(&mut self, stats: DashboardStats) {
        self.stats = Some(stats);
        self.error = None;
        self.loading = false;
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
        self.loading = false;
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().title(" Dashboard ").borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let Some(stats) = &self.stats else {
            let text = match (&self.error, self.loading) {
                (Some(err), _) => Span::styled(err.clone(), Style::default().fg(Color::Red)),
                (None, true) => Span::styled("Loading...", Style::default().fg(Color::DarkGray)),
                (None, false) => Span::raw("No statistics yet."),
            };
            frame.render_widget(Paragraph::new(Line::from(text)), inner);
            return;
        };

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(6), Constraint::Min(0)])
            .split(inner);

        let total = |label: &'static str, value: i64, color: Color| {
            Line::from(vec![
                Span::styled(format!("{label:<14}"), Style::default().bold()),
                Span::styled(value.to_string(), Style::default().fg(color).bold()),
            ])
        };
        let mut lines = vec![
            total("Total ideas", stats.total_ideas, Color::Cyan),
            total("In progress", stats.ideas_in_progress, Color::Yellow),
            total("Delivered", stats.ideas_realisee, Color::Green),
            total("Postponed", stats.ideas_ajournee, Color::Magenta),
        ];
        if let Some(err) = &self.error {
            lines.push(Line::from(Span::styled(
                err.clone(),
                Style::default().fg(Color::Red),
            )));
        }
        frame.render_widget(Paragraph::new(lines), chunks[0]);

        let bars: Vec<Bar> = stats
            .priority_stats
            .rows()
            .iter()
            .map(|(label, count)| {
                Bar::default()
                    .label(Line::from(*label))
                    .value((*count).max(0) as u64)
                    .style(bar_color(label))
            })
            .collect();
        let chart = BarChart::default()
            .block(
                Block::default()
                    .title(format!(" Priorities ({}) ", stats.priority_stats.total()))
                    .borders(Borders::TOP),
            )
            .data(BarGroup::default().bars(&bars))
            .bar_width(10)
            .bar_gap(2);
        frame.render_widget(chart, chunks[1]);
    }
}

fn bar_color(label: &str) -> Style {
    match label {
        "High" => Style::default().fg(Color::LightRed),
        "Medium" => Style::default().fg(Color::Yellow),
        "Low" => Style::default().fg(Color::Blue),
        _ => Style::default().fg(Color::DarkGray),
    }
}

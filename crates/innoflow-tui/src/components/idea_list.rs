use crossterm::event::{KeyCode, KeyEvent};
use innoflow_core::idea::{Idea, IdeaFilter};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

use super::{priority_style, status_style};

#[derive(Debug, Default)]
pub struct IdeaList {
    ideas: Vec<Idea>,
    list_state: ListState,
    pub filter: IdeaFilter,
    pub error: Option<String>,
    pub loading: bool,
}

impl IdeaList {
    pub fn ideas(&self) -> &[Idea] {
        &self.ideas
    }

    /// Replace the list wholesale, keeping the highlight on the same idea
    /// when it is still present.
    pub fn set_ideas(&mut self, ideas: Vec<Idea>) {
        let selected_id = self.selected().map(|i| i.id);
        self.ideas = self.filter.apply(ideas);
        self.error = None;
        self.loading = false;
        let idx = selected_id
            .and_then(|id| self.ideas.iter().position(|i| i.id == id))
            .or(if self.ideas.is_empty() { None } else { Some(0) });
        self.list_state.select(idx);
    }

    /// Prior data is left as it was.
    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
        self.loading = false;
    }

    pub fn selected(&self) -> Option<&Idea> {
        self.ideas.get(self.list_state.selected()?)
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        let len = self.ideas.len();
        if len == 0 {
            return;
        }
        let current = self.list_state.selected().unwrap_or(0);
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                if current + 1 < len {
                    self.list_state.select(Some(current + 1));
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.list_state.select(Some(current.saturating_sub(1)));
            }
            KeyCode::Char('g') => self.list_state.select(Some(0)),
            KeyCode::Char('G') => self.list_state.select(Some(len - 1)),
            _ => {}
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(0)])
            .split(area);

        let status = self
            .filter
            .status
            .map(|s| s.display_name())
            .unwrap_or("any");
        let priority = self.filter.priority.map(|p| p.as_str()).unwrap_or("any");
        let mut header = vec![
            Span::styled(" Status: ", Style::default().bold()),
            Span::styled(status, Style::default().fg(Color::Cyan)),
            Span::styled("  Priority: ", Style::default().bold()),
            Span::styled(priority, Style::default().fg(Color::Cyan)),
        ];
        if self.loading {
            header.push(Span::styled("  loading...", Style::default().fg(Color::DarkGray)));
        }
        if let Some(err) = &self.error {
            header.push(Span::styled(format!("  {err}"), Style::default().fg(Color::Red)));
        }
        frame.render_widget(Paragraph::new(Line::from(header)), chunks[0]);

        let title = format!(" Ideas ({}) ", self.ideas.len());
        let block = Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));

        if self.ideas.is_empty() {
            let empty = if self.filter.is_empty() {
                "No ideas yet."
            } else {
                "No ideas match the current filters."
            };
            frame.render_widget(
                Paragraph::new(Span::styled(empty, Style::default().fg(Color::DarkGray)))
                    .block(block),
                chunks[1],
            );
            return;
        }

        let items: Vec<ListItem> = self
            .ideas
            .iter()
            .map(|idea| {
                let badge = format!("[{}] ", idea.statut.display_name());
                let priority = idea.priority.map(|p| p.symbol()).unwrap_or(" ");
                ListItem::new(Line::from(vec![
                    Span::styled(format!("{priority:<3}"), priority_style(idea.priority)),
                    Span::styled(badge, status_style(idea.statut)),
                    Span::raw(idea.titre.clone()),
                    Span::styled(
                        format!("  by {}", idea.created_by),
                        Style::default().fg(Color::DarkGray),
                    ),
                ]))
            })
            .collect();

        let list = List::new(items)
            .block(block)
            .highlight_style(
                Style::default()
                    .bg(Color::Cyan)
                    .fg(Color::Black)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("> ");

        let mut state = self.list_state.clone();
        frame.render_stateful_widget(list, chunks[1], &mut state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use innoflow_core::idea::{IdeaStatus, Priority};

    fn idea(id: i64, statut: IdeaStatus, priority: Option<Priority>) -> Idea {
        Idea {
            id,
            titre: format!("Idea {id}"),
            description: "d".into(),
            statut,
            priority,
            created_by: "emma".into(),
            date_creation: None,
            motif_rejet: None,
        }
    }

    fn key(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
    }

    #[test]
    fn filter_is_applied_to_fetched_ideas() {
        let mut list = IdeaList::default();
        list.filter = IdeaFilter {
            status: Some(IdeaStatus::Validee),
            priority: Some(Priority::High),
        };
        list.set_ideas(vec![
            idea(1, IdeaStatus::Validee, Some(Priority::High)),
            idea(2, IdeaStatus::Validee, Some(Priority::Low)),
            idea(3, IdeaStatus::Rejetee, Some(Priority::High)),
        ]);
        assert_eq!(list.ideas().len(), 1);
        assert_eq!(list.selected().map(|i| i.id), Some(1));
    }

    #[test]
    fn selection_follows_the_idea_across_refreshes() {
        let mut list = IdeaList::default();
        let all = vec![
            idea(1, IdeaStatus::Validee, None),
            idea(2, IdeaStatus::Validee, None),
            idea(3, IdeaStatus::Validee, None),
        ];
        list.set_ideas(all.clone());
        list.handle_key(key('G'));
        assert_eq!(list.selected().map(|i| i.id), Some(3));

        list.set_ideas(all.into_iter().rev().collect());
        assert_eq!(list.selected().map(|i| i.id), Some(3));

        list.set_ideas(vec![idea(9, IdeaStatus::Validee, None)]);
        assert_eq!(list.selected().map(|i| i.id), Some(9));
    }

    #[test]
    fn error_keeps_previous_ideas() {
        let mut list = IdeaList::default();
        list.set_ideas(vec![idea(1, IdeaStatus::Validee, None)]);
        list.set_error("Failed to fetch ideas");
        assert_eq!(list.ideas().len(), 1);
        assert_eq!(list.error.as_deref(), Some("Failed to fetch ideas"));
    }
}

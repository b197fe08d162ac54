use crossterm::event::{KeyCode, KeyEvent};
use innoflow_core::dispatch::DispatchTable;
use innoflow_core::task::{TaskDetails, TaskPartition, TaskQuery};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pane {
    Assigned,
    Claimable,
}

/// "My tasks" and "group tasks" side by side, both cut from one fetch.
#[derive(Debug, Default)]
pub struct TaskList {
    partition: TaskPartition,
    active: usize,
    states: [ListState; 2],
    pub query: TaskQuery,
    pub error: Option<String>,
    pub loading: bool,
}

impl TaskList {
    pub fn partition(&self) -> &TaskPartition {
        &self.partition
    }

    pub fn set_tasks(&mut self, entries: Vec<TaskDetails>) {
        let previous: Vec<Option<String>> = (0..2)
            .map(|pane| self.selected_in(pane).map(|t| t.task.id.clone()))
            .collect();
        self.partition = TaskPartition::split(entries);
        self.error = None;
        self.loading = false;
        for (pane, prev) in previous.into_iter().enumerate() {
            let rows = self.rows(pane);
            let idx = prev
                .and_then(|id| rows.iter().position(|t| t.task.id == id))
                .or(if rows.is_empty() { None } else { Some(0) });
            self.states[pane].select(idx);
        }
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
        self.loading = false;
    }

    pub fn active_pane(&self) -> Pane {
        if self.active == 0 {
            Pane::Assigned
        } else {
            Pane::Claimable
        }
    }

    pub fn focus(&mut self, pane: Pane) {
        self.active = match pane {
            Pane::Assigned => 0,
            Pane::Claimable => 1,
        };
    }

    fn rows(&self, pane: usize) -> &[TaskDetails] {
        if pane == 0 {
            &self.partition.assigned
        } else {
            &self.partition.claimable
        }
    }

    fn selected_in(&self, pane: usize) -> Option<&TaskDetails> {
        self.rows(pane).get(self.states[pane].selected()?)
    }

    pub fn selected(&self) -> Option<&TaskDetails> {
        self.selected_in(self.active)
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Tab | KeyCode::Char('h') | KeyCode::Char('l') | KeyCode::Left
            | KeyCode::Right => {
                self.active = 1 - self.active;
            }
            KeyCode::Char('j') | KeyCode::Down => {
                let len = self.rows(self.active).len();
                let state = &mut self.states[self.active];
                let current = state.selected().unwrap_or(0);
                if current + 1 < len {
                    state.select(Some(current + 1));
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                let state = &mut self.states[self.active];
                if let Some(current) = state.selected() {
                    state.select(Some(current.saturating_sub(1)));
                }
            }
            _ => {}
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, table: &DispatchTable) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(0)])
            .split(area);

        let kind_label = self
            .query
            .task_definition_key
            .as_deref()
            .map(|key| table.resolve(key).display_name())
            .unwrap_or("any");
        let mut header = vec![
            Span::styled(" Idea: ", Style::default().bold()),
            Span::styled(
                if self.query.idea_name.is_empty() {
                    "*".to_string()
                } else {
                    self.query.idea_name.clone()
                },
                Style::default().fg(Color::Cyan),
            ),
            Span::styled("  Type: ", Style::default().bold()),
            Span::styled(kind_label, Style::default().fg(Color::Cyan)),
        ];
        if self.loading {
            header.push(Span::styled("  loading...", Style::default().fg(Color::DarkGray)));
        }
        if let Some(err) = &self.error {
            header.push(Span::styled(format!("  {err}"), Style::default().fg(Color::Red)));
        }
        frame.render_widget(Paragraph::new(Line::from(header)), chunks[0]);

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Ratio(1, 2), Constraint::Ratio(1, 2)])
            .split(chunks[1]);
        for (pane, title) in [(0, "My tasks"), (1, "Group tasks")] {
            self.render_pane(frame, columns[pane], pane, title, table);
        }
    }

    fn render_pane(
        &self,
        frame: &mut Frame,
        area: Rect,
        pane: usize,
        title: &str,
        table: &DispatchTable,
    ) {
        let rows = self.rows(pane);
        let is_active = pane == self.active;
        let border_style = if is_active {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let block = Block::default()
            .title(format!(" {title} ({}) ", rows.len()))
            .borders(Borders::ALL)
            .border_style(border_style);

        let items: Vec<ListItem> = rows
            .iter()
            .map(|entry| {
                let kind = table.resolve(&entry.task.task_definition_key);
                let mut lines = vec![Line::from(vec![
                    Span::styled(
                        format!("[{}] ", kind.display_name()),
                        Style::default().fg(Color::Yellow),
                    ),
                    Span::raw(entry.task.name.clone()),
                ])];
                let created = entry
                    .task
                    .created_at()
                    .map(|c| c.format(" %Y-%m-%d").to_string())
                    .unwrap_or_default();
                lines.push(Line::from(Span::styled(
                    format!("  {}{created}", entry.idea_title()),
                    Style::default().fg(Color::DarkGray),
                )));
                ListItem::new(lines)
            })
            .collect();

        let highlight = if is_active {
            Style::default()
                .bg(Color::Cyan)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().add_modifier(Modifier::BOLD)
        };
        let list = List::new(items)
            .block(block)
            .highlight_style(highlight)
            .highlight_symbol("> ");

        let mut state = self.states[pane].clone();
        frame.render_stateful_widget(list, area, &mut state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use innoflow_core::task::Task;

    fn entry(id: &str, assignee: Option<&str>) -> TaskDetails {
        TaskDetails::new(
            Task {
                id: id.into(),
                name: format!("Task {id}"),
                task_definition_key: "Activity_x".into(),
                assignee: assignee.map(String::from),
                process_instance_id: "p".into(),
                created: None,
            },
            None,
        )
    }

    fn press(list: &mut TaskList, code: KeyCode) {
        list.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    #[test]
    fn one_fetch_fills_both_panes() {
        let mut list = TaskList::default();
        list.set_tasks(vec![entry("a", Some("me")), entry("b", None), entry("c", None)]);
        assert_eq!(list.partition().assigned.len(), 1);
        assert_eq!(list.partition().claimable.len(), 2);
        assert_eq!(list.selected().map(|t| t.task.id.as_str()), Some("a"));

        press(&mut list, KeyCode::Tab);
        assert_eq!(list.active_pane(), Pane::Claimable);
        press(&mut list, KeyCode::Down);
        assert_eq!(list.selected().map(|t| t.task.id.as_str()), Some("c"));
    }

    #[test]
    fn claimed_task_moves_between_panes() {
        let mut list = TaskList::default();
        list.set_tasks(vec![entry("a", None)]);
        assert!(list.partition().assigned.is_empty());
        list.set_tasks(vec![entry("a", Some("me"))]);
        assert_eq!(list.partition().assigned.len(), 1);
        assert!(list.partition().claimable.is_empty());
        list.focus(Pane::Claimable);
        assert!(list.selected().is_none());
    }
}

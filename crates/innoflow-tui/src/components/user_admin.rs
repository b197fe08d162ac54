use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use innoflow_core::user::{Group, User, UserInput};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};

use super::idea_editor::EditorAction;
use super::{centered_rect, field_line};

#[derive(Debug, Default)]
pub struct UserList {
    users: Vec<User>,
    groups: Vec<Group>,
    list_state: ListState,
    pub error: Option<String>,
    pub loading: bool,
}

impl UserList {
    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn set_data(&mut self, users: Vec<User>, groups: Vec<Group>) {
        let selected_id = self.selected().map(|u| u.id.clone());
        self.users = users;
        self.groups = groups;
        self.error = None;
        self.loading = false;
        let idx = selected_id
            .and_then(|id| self.users.iter().position(|u| u.id == id))
            .or(if self.users.is_empty() { None } else { Some(0) });
        self.list_state.select(idx);
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
        self.loading = false;
    }

    pub fn selected(&self) -> Option<&User> {
        self.users.get(self.list_state.selected()?)
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        let len = self.users.len();
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
            _ => {}
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let mut title = format!(" Users ({}) ", self.users.len());
        if self.loading {
            title.push_str("loading... ");
        }
        let block = Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));

        if let Some(err) = &self.error {
            if self.users.is_empty() {
                frame.render_widget(
                    Paragraph::new(Span::styled(err.clone(), Style::default().fg(Color::Red)))
                        .block(block),
                    area,
                );
                return;
            }
        }

        let items: Vec<ListItem> = self
            .users
            .iter()
            .map(|user| {
                ListItem::new(Line::from(vec![
                    Span::styled(format!("{:<16}", user.id), Style::default().bold()),
                    Span::raw(user.full_name()),
                    Span::styled(
                        format!("  {}", user.email),
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
        frame.render_stateful_widget(list, area, &mut state);
    }
}

const TEXT_FIELDS: usize = 5;

/// Account form with a group checklist below the text fields.
#[derive(Debug, Clone, PartialEq)]
pub struct UserEditor {
    /// `Some` when editing; the id is then fixed.
    pub original: Option<User>,
    pub input: UserInput,
    pub groups: Vec<Group>,
    pub selected_groups: Vec<String>,
    /// 0..5 are text fields, 5.. index into `groups`.
    pub focus: usize,
    pub error: Option<String>,
    pub saving: bool,
    pub groups_loaded: bool,
}

impl UserEditor {
    pub fn create(groups: Vec<Group>) -> Self {
        Self {
            original: None,
            input: UserInput::default(),
            groups,
            selected_groups: Vec::new(),
            focus: 0,
            error: None,
            saving: false,
            groups_loaded: true,
        }
    }

    pub fn edit(user: &User, groups: Vec<Group>) -> Self {
        Self {
            original: Some(user.clone()),
            input: UserInput::from_user(user),
            focus: 1,
            groups_loaded: false,
            ..Self::create(groups)
        }
    }

    pub fn is_creating(&self) -> bool {
        self.original.is_none()
    }

    pub fn memberships_loaded(&mut self, current: Vec<Group>) {
        self.selected_groups = current.into_iter().map(|g| g.id).collect();
        self.groups_loaded = true;
    }

    fn field_count(&self) -> usize {
        TEXT_FIELDS + self.groups.len()
    }

    fn text_mut(&mut self) -> Option<&mut String> {
        match self.focus {
            0 if self.is_creating() => Some(&mut self.input.id),
            1 => Some(&mut self.input.first_name),
            2 => Some(&mut self.input.last_name),
            3 => Some(&mut self.input.email),
            4 => Some(&mut self.input.password),
            _ => None,
        }
    }

    fn toggle_group(&mut self) {
        let Some(group) = self.focus.checked_sub(TEXT_FIELDS).and_then(|i| self.groups.get(i))
        else {
            return;
        };
        if let Some(pos) = self.selected_groups.iter().position(|g| *g == group.id) {
            self.selected_groups.remove(pos);
        } else {
            self.selected_groups.push(group.id.clone());
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> EditorAction {
        if self.saving {
            return EditorAction::None;
        }
        if key.code == KeyCode::Char('s') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return match self.input.validate(self.is_creating()) {
                Ok(()) => {
                    self.error = None;
                    EditorAction::Save
                }
                Err(e) => {
                    self.error = Some(e.to_string());
                    EditorAction::None
                }
            };
        }
        let count = self.field_count();
        match key.code {
            KeyCode::Esc => return EditorAction::Cancel,
            KeyCode::Enter | KeyCode::Char(' ') if self.focus >= TEXT_FIELDS => {
                self.toggle_group();
            }
            KeyCode::Tab | KeyCode::Down | KeyCode::Enter => {
                self.focus = (self.focus + 1) % count;
            }
            KeyCode::BackTab | KeyCode::Up => self.focus = (self.focus + count - 1) % count,
            KeyCode::Backspace => {
                if let Some(text) = self.text_mut() {
                    text.pop();
                }
            }
            KeyCode::Char(c) => {
                if let Some(text) = self.text_mut() {
                    text.push(c);
                }
            }
            _ => {}
        }
        EditorAction::None
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let popup = centered_rect(60, 70, area);
        frame.render_widget(Clear, popup);

        let title = if self.is_creating() {
            " New User (Ctrl+S save, Esc cancel) "
        } else {
            " Edit User (Ctrl+S save, Esc cancel) "
        };
        let block = Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));

        let masked = "*".repeat(self.input.password.chars().count());
        let password_label = if self.is_creating() {
            "Password"
        } else {
            "Password (empty = unchanged)"
        };
        let mut lines = vec![
            field_line("User id", &self.input.id, self.focus == 0 && self.is_creating()),
            field_line("First name", &self.input.first_name, self.focus == 1),
            field_line("Last name", &self.input.last_name, self.focus == 2),
            field_line("Email", &self.input.email, self.focus == 3),
            field_line(password_label, &masked, self.focus == 4),
            Line::from(""),
            Line::from(Span::styled("Groups", Style::default().bold())),
        ];
        if !self.groups_loaded {
            lines.push(Line::from(Span::styled(
                "  loading memberships...",
                Style::default().fg(Color::DarkGray),
            )));
        }
        for (i, group) in self.groups.iter().enumerate() {
            let checked = self.selected_groups.iter().any(|g| *g == group.id);
            let style = if self.focus == TEXT_FIELDS + i {
                Style::default().fg(Color::Black).bg(Color::Cyan)
            } else {
                Style::default()
            };
            lines.push(Line::from(vec![
                Span::raw("  "),
                Span::styled(
                    format!(
                        "{} {} ({})",
                        if checked { "[x]" } else { "[ ]" },
                        group.name,
                        group.id
                    ),
                    style,
                ),
            ]));
        }
        lines.push(Line::from(""));
        if self.saving {
            lines.push(Line::from(Span::styled(
                "Saving...",
                Style::default().fg(Color::DarkGray),
            )));
        }
        if let Some(err) = &self.error {
            lines.push(Line::from(Span::styled(
                err.clone(),
                Style::default().fg(Color::Red),
            )));
        }
        frame.render_widget(
            Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
            popup,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn groups() -> Vec<Group> {
        ["EM", "CQ"]
            .iter()
            .map(|id| Group {
                id: id.to_string(),
                name: id.to_string(),
                kind: None,
            })
            .collect()
    }

    fn press(editor: &mut UserEditor, code: KeyCode) -> EditorAction {
        editor.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_str(editor: &mut UserEditor, s: &str) {
        for c in s.chars() {
            press(editor, KeyCode::Char(c));
        }
    }

    #[test]
    fn create_requires_password_and_collects_groups() {
        let mut editor = UserEditor::create(groups());
        type_str(&mut editor, "nina");
        press(&mut editor, KeyCode::Enter);
        type_str(&mut editor, "Nina");
        press(&mut editor, KeyCode::Tab);
        type_str(&mut editor, "Lopez");
        let save = editor.handle_key(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL));
        assert_eq!(save, EditorAction::None);
        assert_eq!(editor.error.as_deref(), Some("password is required"));

        press(&mut editor, KeyCode::Tab);
        press(&mut editor, KeyCode::Tab);
        type_str(&mut editor, "pw");
        press(&mut editor, KeyCode::Tab);
        assert_eq!(editor.focus, TEXT_FIELDS);
        press(&mut editor, KeyCode::Char(' '));
        assert_eq!(editor.selected_groups, vec!["EM".to_string()]);
        press(&mut editor, KeyCode::Enter);
        assert!(editor.selected_groups.is_empty());

        let save = editor.handle_key(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL));
        assert_eq!(save, EditorAction::Save);
        assert_eq!(editor.input.id, "nina");
        assert_eq!(editor.input.password, "pw");
    }

    #[test]
    fn edit_keeps_id_fixed_and_password_optional() {
        let user = User {
            id: "emma".into(),
            first_name: "Emma".into(),
            last_name: "Martin".into(),
            email: "emma@example.com".into(),
        };
        let mut editor = UserEditor::edit(&user, groups());
        assert!(!editor.groups_loaded);
        editor.focus = 0;
        type_str(&mut editor, "zz");
        assert_eq!(editor.input.id, "emma");

        editor.memberships_loaded(vec![groups().remove(1)]);
        assert_eq!(editor.selected_groups, vec!["CQ".to_string()]);
        let save = editor.handle_key(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL));
        assert_eq!(save, EditorAction::Save);
    }
}

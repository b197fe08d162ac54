use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use super::{centered_rect, field_line};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoginField {
    #[default]
    Username,
    Password,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub field: LoginField,
    pub error: Option<String>,
    pub submitting: bool,
}

impl LoginForm {
    pub fn with_error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Default::default()
        }
    }

    /// Returns the credentials when the form is submitted.
    pub fn handle_key(&mut self, key: KeyEvent) -> Option<(String, String)> {
        if self.submitting {
            return None;
        }
        match key.code {
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                self.field = match self.field {
                    LoginField::Username => LoginField::Password,
                    LoginField::Password => LoginField::Username,
                };
            }
            KeyCode::Enter => match self.field {
                LoginField::Username => self.field = LoginField::Password,
                LoginField::Password => {
                    if self.username.trim().is_empty() || self.password.is_empty() {
                        self.error = Some("Username and password are required.".into());
                        return None;
                    }
                    self.error = None;
                    self.submitting = true;
                    return Some((self.username.trim().to_string(), self.password.clone()));
                }
            },
            KeyCode::Backspace => {
                self.active_mut().pop();
            }
            KeyCode::Char(c) => self.active_mut().push(c),
            _ => {}
        }
        None
    }

    fn active_mut(&mut self) -> &mut String {
        match self.field {
            LoginField::Username => &mut self.username,
            LoginField::Password => &mut self.password,
        }
    }

    pub fn failed(&mut self, message: impl Into<String>) {
        self.submitting = false;
        self.password.clear();
        self.field = LoginField::Password;
        self.error = Some(message.into());
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let popup = centered_rect(50, 40, area);
        frame.render_widget(Clear, popup);

        let block = Block::default()
            .title(" Sign in ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));

        let masked = "*".repeat(self.password.chars().count());
        let mut lines = vec![
            Line::from(""),
            field_line("Username", &self.username, self.field == LoginField::Username),
            field_line("Password", &masked, self.field == LoginField::Password),
            Line::from(""),
        ];
        if self.submitting {
            lines.push(Line::from(Span::styled(
                "Signing in...",
                Style::default().fg(Color::DarkGray),
            )));
        }
        if let Some(err) = &self.error {
            lines.push(Line::from(Span::styled(
                err.clone(),
                Style::default().fg(Color::Red),
            )));
        }
        frame.render_widget(Paragraph::new(lines).block(block), popup);
    }
}

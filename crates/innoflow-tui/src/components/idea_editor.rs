use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use innoflow_core::idea::{Idea, IdeaInput};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use super::{centered_rect, field_line};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdeaField {
    Title,
    Description,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorAction {
    None,
    Cancel,
    Save,
}

/// Create/edit form. Only the submitter-owned fields are editable; status
/// and priority belong to the workflow.
#[derive(Debug, Clone, PartialEq)]
pub struct IdeaEditor {
    pub editing: Option<i64>,
    pub input: IdeaInput,
    pub field: IdeaField,
    pub error: Option<String>,
    pub saving: bool,
}

impl IdeaEditor {
    pub fn create() -> Self {
        Self {
            editing: None,
            input: IdeaInput::default(),
            field: IdeaField::Title,
            error: None,
            saving: false,
        }
    }

    pub fn edit(idea: &Idea) -> Self {
        Self {
            editing: Some(idea.id),
            input: IdeaInput::from_idea(idea),
            ..Self::create()
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> EditorAction {
        if self.saving {
            return EditorAction::None;
        }
        if key.code == KeyCode::Char('s') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return match self.input.validate() {
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
        let text = match self.field {
            IdeaField::Title => &mut self.input.titre,
            IdeaField::Description => &mut self.input.description,
        };
        match key.code {
            KeyCode::Esc => return EditorAction::Cancel,
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                self.field = match self.field {
                    IdeaField::Title => IdeaField::Description,
                    IdeaField::Description => IdeaField::Title,
                };
            }
            KeyCode::Enter => match self.field {
                IdeaField::Title => self.field = IdeaField::Description,
                IdeaField::Description => text.push('\n'),
            },
            KeyCode::Backspace => {
                text.pop();
            }
            KeyCode::Char(c) => text.push(c),
            _ => {}
        }
        EditorAction::None
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let popup = centered_rect(70, 60, area);
        frame.render_widget(Clear, popup);

        let title = if self.editing.is_some() {
            " Edit Idea (Ctrl+S save, Esc cancel) "
        } else {
            " New Idea (Ctrl+S submit, Esc cancel) "
        };
        let block = Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));

        let mut lines = vec![
            field_line("Title", &self.input.titre, self.field == IdeaField::Title),
            Line::from(""),
            field_line("Description", "", self.field == IdeaField::Description),
        ];
        for row in self.input.description.lines() {
            lines.push(Line::from(format!("    {row}")));
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

        let paragraph = Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: false });
        frame.render_widget(paragraph, popup);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(editor: &mut IdeaEditor, code: KeyCode) -> EditorAction {
        editor.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn ctrl_s(editor: &mut IdeaEditor) -> EditorAction {
        editor.handle_key(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL))
    }

    #[test]
    fn empty_fields_block_save() {
        let mut editor = IdeaEditor::create();
        assert_eq!(ctrl_s(&mut editor), EditorAction::None);
        assert_eq!(editor.error.as_deref(), Some("title is required"));

        for c in "Kiosks".chars() {
            press(&mut editor, KeyCode::Char(c));
        }
        press(&mut editor, KeyCode::Enter);
        assert_eq!(editor.field, IdeaField::Description);
        assert_eq!(ctrl_s(&mut editor), EditorAction::None);
        assert_eq!(editor.error.as_deref(), Some("description is required"));

        press(&mut editor, KeyCode::Char('x'));
        assert_eq!(ctrl_s(&mut editor), EditorAction::Save);
        assert!(editor.error.is_none());
        assert_eq!(editor.input.titre, "Kiosks");
    }

    #[test]
    fn keys_are_ignored_while_saving() {
        let mut editor = IdeaEditor::create();
        editor.saving = true;
        assert_eq!(press(&mut editor, KeyCode::Esc), EditorAction::None);
        assert_eq!(press(&mut editor, KeyCode::Char('a')), EditorAction::None);
        assert!(editor.input.titre.is_empty());
    }
}

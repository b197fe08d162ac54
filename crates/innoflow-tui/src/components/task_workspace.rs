use std::path::PathBuf;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use innoflow_core::dispatch::TaskKind;
use innoflow_core::document::Document;
use innoflow_core::forms::{Field, TaskForm};
use innoflow_core::modal::{ModalPhase, TaskModal};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use super::centered_rect;
use super::idea_details::{developpement_lines, document_lines, idea_lines, poc_lines};

#[derive(Debug, Clone, PartialEq)]
pub enum WorkspaceAction {
    None,
    Close,
    Submit,
    Upload(PathBuf),
    Download(Document),
    DeleteDocument(Document),
}

/// An open task: the modal state machine plus the document pane.
#[derive(Debug, Clone, PartialEq)]
pub struct Workspace {
    pub modal: TaskModal,
    pub doc_cursor: usize,
    /// Path being typed for an upload, when the prompt is open.
    pub upload_path: Option<String>,
}

impl Workspace {
    pub fn new(modal: TaskModal) -> Self {
        Self {
            modal,
            doc_cursor: 0,
            upload_path: None,
        }
    }

    pub fn task_id(&self) -> &str {
        &self.modal.details.task.id
    }

    /// Business plans are built by attaching files; other forms only show
    /// what is already there.
    pub fn documents_editable(&self) -> bool {
        self.modal.kind() == TaskKind::BusinessPlan
    }

    pub fn documents(&self) -> &[Document] {
        &self.modal.details.documents
    }

    pub fn set_documents(&mut self, documents: Vec<Document>) {
        self.modal.set_documents(documents);
        let len = self.documents().len();
        if self.doc_cursor >= len {
            self.doc_cursor = len.saturating_sub(1);
        }
    }

    fn selected_document(&self) -> Option<Document> {
        self.documents().get(self.doc_cursor).cloned()
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> WorkspaceAction {
        if let Some(path) = self.upload_path.as_mut() {
            match key.code {
                KeyCode::Esc => self.upload_path = None,
                KeyCode::Enter => {
                    let path = path.trim().to_string();
                    self.upload_path = None;
                    if !path.is_empty() {
                        return WorkspaceAction::Upload(PathBuf::from(path));
                    }
                }
                KeyCode::Backspace => {
                    path.pop();
                }
                KeyCode::Char(c) => path.push(c),
                _ => {}
            }
            return WorkspaceAction::None;
        }

        if key.code == KeyCode::Esc {
            return WorkspaceAction::Close;
        }
        if !self.modal.is_ready() {
            return WorkspaceAction::None;
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let field = self.modal.focused_field();
        match key.code {
            KeyCode::Char('s') if ctrl => return WorkspaceAction::Submit,
            KeyCode::Char('u') if ctrl => {
                if self.documents_editable() {
                    self.upload_path = Some(String::new());
                }
            }
            KeyCode::Char('o') if ctrl => {
                if let Some(doc) = self.selected_document() {
                    return WorkspaceAction::Download(doc);
                }
            }
            KeyCode::Char('d') | KeyCode::Delete if ctrl || key.code == KeyCode::Delete => {
                if self.documents_editable() {
                    if let Some(doc) = self.selected_document() {
                        return WorkspaceAction::DeleteDocument(doc);
                    }
                }
            }
            KeyCode::Tab => self.modal.focus_next(),
            KeyCode::BackTab => self.modal.focus_prev(),
            KeyCode::Left | KeyCode::Right => {
                if let Some(field) = field.filter(|f| !f.is_text()) {
                    self.modal.form.cycle(field, key.code == KeyCode::Right);
                }
            }
            KeyCode::Up | KeyCode::Down => {
                let down = key.code == KeyCode::Down;
                if field == Some(Field::Members) {
                    self.modal.form.cycle(Field::Members, down);
                } else if down {
                    if self.doc_cursor + 1 < self.documents().len() {
                        self.doc_cursor += 1;
                    }
                } else {
                    self.doc_cursor = self.doc_cursor.saturating_sub(1);
                }
            }
            KeyCode::Char(' ') if field == Some(Field::Members) => {
                self.modal.form.toggle(Field::Members);
            }
            KeyCode::Enter if field == Some(Field::Members) => {
                self.modal.form.toggle(Field::Members);
            }
            KeyCode::Backspace => {
                if let Some(field) = field.filter(|f| f.is_text()) {
                    self.modal.form.backspace(field);
                }
            }
            KeyCode::Char(c) if !ctrl => {
                if let Some(field) = field.filter(|f| f.is_text()) {
                    self.modal.form.input_char(field, c);
                }
            }
            _ => {}
        }
        WorkspaceAction::None
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let popup = centered_rect(80, 85, area);
        frame.render_widget(Clear, popup);

        let modal = &self.modal;
        let block = Block::default()
            .title(format!(
                " {} | {} ",
                modal.form.title(),
                modal.details.task.name
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));

        let mut lines: Vec<Line> = Vec::new();
        match &modal.details.idea {
            Some(idea) => lines.extend(idea_lines(idea)),
            None => lines.push(Line::from(Span::styled(
                "(idea details unavailable)",
                Style::default().fg(Color::DarkGray),
            ))),
        }
        if modal.kind() == TaskKind::MvpPresentation {
            if let Some(poc) = &modal.details.poc {
                lines.extend(poc_lines(poc));
            }
            if let Some(dev) = &modal.details.developpement {
                lines.extend(developpement_lines(dev));
            }
        }
        if let Some(notice) = &modal.notice {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                notice.clone(),
                Style::default().fg(Color::Yellow),
            )));
        }

        lines.push(Line::from(""));
        match modal.phase {
            ModalPhase::Idle | ModalPhase::Loading => {
                lines.push(Line::from(Span::styled(
                    "Loading...",
                    Style::default().fg(Color::DarkGray),
                )));
            }
            _ => lines.extend(self.form_lines()),
        }

        if !self.documents().is_empty() || self.documents_editable() {
            lines.extend(document_lines(self.documents(), Some(self.doc_cursor)));
        }
        if let Some(path) = &self.upload_path {
            lines.push(Line::from(vec![
                Span::styled("Upload file: ", Style::default().fg(Color::Cyan).bold()),
                Span::raw(path.clone()),
                Span::styled("_", Style::default().fg(Color::Cyan)),
            ]));
        }

        lines.push(Line::from(""));
        for warning in modal.form.warnings() {
            lines.push(Line::from(Span::styled(
                format!("! {warning}"),
                Style::default().fg(Color::Yellow),
            )));
        }
        if let Some(err) = &modal.error {
            lines.push(Line::from(Span::styled(
                err.clone(),
                Style::default().fg(Color::Red).bold(),
            )));
        }
        let action = if modal.phase == ModalPhase::Submitting {
            "Submitting...".to_string()
        } else {
            format!("[Ctrl+S] {}", modal.form.submit_label())
        };
        lines.push(Line::from(Span::styled(
            action,
            Style::default().fg(Color::Green).bold(),
        )));

        let paragraph = Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: false });
        frame.render_widget(paragraph, popup);
    }

    fn form_lines(&self) -> Vec<Line<'static>> {
        let modal = &self.modal;
        let focused = modal.focused_field();
        let mut lines = Vec::new();
        for field in modal.form.fields() {
            let is_focused = focused == Some(field);
            let marker = if is_focused { "> " } else { "  " };
            let label_style = if is_focused {
                Style::default().fg(Color::Cyan).bold()
            } else {
                Style::default().bold()
            };
            let label = Span::styled(format!("{}: ", field.label()), label_style);

            if field == Field::Members {
                lines.push(Line::from(vec![Span::raw(marker), label]));
                lines.extend(self.member_lines(is_focused));
                continue;
            }
            let value = if field.is_text() {
                let text = modal.form.text(field).unwrap_or_default().to_string();
                if is_focused {
                    format!("{text}_")
                } else {
                    text
                }
            } else {
                format!("< {} >", modal.form.choice(field).unwrap_or_default())
            };
            lines.push(Line::from(vec![Span::raw(marker), label, Span::raw(value)]));
        }
        if lines.is_empty() {
            let hint = match modal.kind() {
                TaskKind::BusinessPlan => "Attach the business plan documents, then submit.",
                TaskKind::BusinessPlanValidation => {
                    "Review the attached documents, then validate."
                }
                _ => "No input needed for this task.",
            };
            lines.push(Line::from(Span::styled(
                hint,
                Style::default().fg(Color::DarkGray),
            )));
        }
        lines
    }

    fn member_lines(&self, focused: bool) -> Vec<Line<'static>> {
        let TaskForm::TeamComposition(form) = &self.modal.form else {
            return Vec::new();
        };
        if form.candidates.is_empty() {
            return vec![Line::from(Span::styled(
                "    (no developers available)",
                Style::default().fg(Color::DarkGray),
            ))];
        }
        form.candidates
            .iter()
            .enumerate()
            .map(|(i, user)| {
                let check = if form.is_member(&user.id) { "[x]" } else { "[ ]" };
                let style = if focused && i == form.cursor {
                    Style::default().fg(Color::Black).bg(Color::Cyan)
                } else {
                    Style::default()
                };
                Line::from(vec![
                    Span::raw("    "),
                    Span::styled(format!("{check} {} ({})", user.full_name(), user.id), style),
                ])
            })
            .collect()
    }
}

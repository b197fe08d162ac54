use crossterm::event::{KeyCode, KeyEvent};
use innoflow_core::document::Document;
use innoflow_core::idea::Idea;
use innoflow_core::task::{Developpement, FullIdeaDetails, Poc};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use super::{centered_rect, priority_style, status_style};

/// Read-only recap of one idea and its phase records.
#[derive(Debug, Clone, PartialEq)]
pub struct IdeaDetailsView {
    pub idea: Idea,
    pub full: Option<FullIdeaDetails>,
    pub error: Option<String>,
    pub doc_cursor: usize,
    pub scroll: u16,
}

impl IdeaDetailsView {
    pub fn new(idea: Idea) -> Self {
        Self {
            idea,
            full: None,
            error: None,
            doc_cursor: 0,
            scroll: 0,
        }
    }

    pub fn loaded(&mut self, full: FullIdeaDetails) {
        self.idea = full.idea.clone();
        self.full = Some(full);
        self.error = None;
    }

    pub fn documents(&self) -> &[Document] {
        self.full.as_ref().map(|f| f.documents.as_slice()).unwrap_or(&[])
    }

    pub fn selected_document(&self) -> Option<&Document> {
        self.documents().get(self.doc_cursor)
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        let docs = self.documents().len();
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                if self.doc_cursor + 1 < docs {
                    self.doc_cursor += 1;
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.doc_cursor = self.doc_cursor.saturating_sub(1);
            }
            KeyCode::PageDown => self.scroll = self.scroll.saturating_add(5),
            KeyCode::PageUp => self.scroll = self.scroll.saturating_sub(5),
            _ => {}
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let popup = centered_rect(75, 80, area);
        frame.render_widget(Clear, popup);

        let block = Block::default()
            .title(format!(" Idea #{} ", self.idea.id))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));

        let mut lines = idea_lines(&self.idea);
        match (&self.full, &self.error) {
            (Some(full), _) => {
                if let Some(poc) = &full.poc {
                    lines.extend(poc_lines(poc));
                }
                if let Some(dev) = &full.developpement {
                    lines.extend(developpement_lines(dev));
                }
                lines.extend(document_lines(&full.documents, Some(self.doc_cursor)));
            }
            (None, Some(err)) => {
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled(
                    err.clone(),
                    Style::default().fg(Color::Red),
                )));
            }
            (None, None) => {
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled(
                    "Loading details...",
                    Style::default().fg(Color::DarkGray),
                )));
            }
        }

        let paragraph = Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: false })
            .scroll((self.scroll, 0));
        frame.render_widget(paragraph, popup);
    }
}

fn labeled(label: &str, value: impl Into<String>) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{label}: "), Style::default().bold()),
        Span::raw(value.into()),
    ])
}

fn heading(text: &str) -> Line<'static> {
    Line::from(Span::styled(
        text.to_string(),
        Style::default().fg(Color::Cyan).bold(),
    ))
}

pub fn idea_lines(idea: &Idea) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(Span::styled(idea.titre.clone(), Style::default().bold())),
        Line::from(vec![
            Span::styled("Status: ", Style::default().bold()),
            Span::styled(idea.statut.display_name(), status_style(idea.statut)),
            Span::styled("  Priority: ", Style::default().bold()),
            Span::styled(
                idea.priority.map(|p| p.as_str()).unwrap_or("unset"),
                priority_style(idea.priority),
            ),
        ]),
        labeled("Submitted by", idea.created_by.clone()),
    ];
    if let Some(created) = idea.date_creation {
        lines.push(labeled("Created", created.format("%Y-%m-%d %H:%M").to_string()));
    }
    if let Some(reason) = &idea.motif_rejet {
        lines.push(Line::from(vec![
            Span::styled("Rejection reason: ", Style::default().fg(Color::Red).bold()),
            Span::raw(reason.clone()),
        ]));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(idea.description.clone()));
    lines
}

pub fn poc_lines(poc: &Poc) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(""), heading("Proof of concept")];
    if let (Some(start), Some(end)) = (poc.date_debut, poc.date_fin) {
        lines.push(labeled("Period", format!("{start} to {end}")));
    }
    if let Some(model) = &poc.business_model {
        lines.push(labeled("Business model", model.clone()));
    }
    if let Some(load) = &poc.charge_estimee {
        lines.push(labeled("Estimated load", load.clone()));
    }
    if let Some(cost) = poc.cout_estime {
        lines.push(labeled("Estimated cost", format!("{cost:.2}")));
    }
    lines.push(labeled(
        "Conclusion",
        poc.conclusion.clone().unwrap_or_else(|| "(none)".into()),
    ));
    if let Some(decision) = &poc.decision {
        lines.push(labeled("Decision", decision.clone()));
    }
    lines
}

pub fn developpement_lines(dev: &Developpement) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(""), heading("Development")];
    if let Some(status) = &dev.statut_dev {
        lines.push(labeled("Status", status.clone()));
    }
    if let Some(start) = dev.date_lancement {
        lines.push(labeled("Started", start.to_string()));
    }
    lines.push(labeled(
        "Project lead",
        dev.chef_de_projet.clone().unwrap_or_else(|| "(unassigned)".into()),
    ));
    let members = dev.members();
    lines.push(labeled(
        "Team",
        if members.is_empty() {
            "(none)".to_string()
        } else {
            members.join(", ")
        },
    ));
    if let Some(feedback) = &dev.avis_negatif {
        lines.push(Line::from(vec![
            Span::styled("Negative feedback: ", Style::default().fg(Color::Red).bold()),
            Span::raw(feedback.clone()),
        ]));
    }
    lines
}

/// Document rows, highlighting `cursor` when given.
pub fn document_lines(documents: &[Document], cursor: Option<usize>) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(""),
        heading(&format!("Documents ({})", documents.len())),
    ];
    if documents.is_empty() {
        lines.push(Line::from(Span::styled(
            "  (none)",
            Style::default().fg(Color::DarkGray),
        )));
    }
    for (i, doc) in documents.iter().enumerate() {
        let selected = cursor == Some(i);
        let marker = if selected { "> " } else { "  " };
        let style = if selected {
            Style::default().fg(Color::Black).bg(Color::Cyan)
        } else {
            Style::default()
        };
        lines.push(Line::from(vec![
            Span::raw(marker),
            Span::styled(doc.display_name().to_string(), style),
            Span::styled(
                format!("  {}", doc.file_type.as_deref().unwrap_or("")),
                Style::default().fg(Color::DarkGray),
            ),
        ]));
    }
    lines
}

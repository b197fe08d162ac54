use crate::dispatch::{ContextNeed, DispatchTable, TaskKind};
use crate::document::Document;
use crate::forms::{Clock, CompletionCall, Field, TaskForm, TeamCompositionForm};
use crate::task::{FullIdeaDetails, TaskDetails};
use crate::user::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalPhase {
    Idle,
    Loading,
    Ready,
    Submitting,
    /// Terminal. The owner refreshes its lists and drops the modal.
    Completed,
}

/// Context delivered by the fetch a [`ContextNeed`] asked for.
#[derive(Debug, Clone, PartialEq)]
pub enum ModalContext {
    FullDetails(FullIdeaDetails),
    DevUsers(Vec<User>),
    Documents(Vec<Document>),
}

/// State of one open task workspace.
///
/// `Idle -> Loading -> Ready -> Submitting -> Completed`, where a failed
/// submission returns to `Ready` with an inline error.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskModal {
    pub details: TaskDetails,
    pub form: TaskForm,
    pub phase: ModalPhase,
    pub focus: usize,
    pub error: Option<String>,
    /// Shown while `Ready`; context that failed to load but did not block.
    pub notice: Option<String>,
}

impl TaskModal {
    pub fn open(details: TaskDetails, table: &DispatchTable) -> Self {
        let kind = table.resolve(&details.task.task_definition_key);
        Self {
            details,
            form: TaskForm::for_kind(kind),
            phase: ModalPhase::Idle,
            focus: 0,
            error: None,
            notice: None,
        }
    }

    pub fn kind(&self) -> TaskKind {
        self.form.kind()
    }

    /// What has to be fetched before the form can render. The MVP recap is
    /// skipped when the task carries no idea to look up.
    pub fn context_need(&self) -> ContextNeed {
        match self.kind().context() {
            ContextNeed::FullIdeaDetails if self.details.idea.is_none() => ContextNeed::None,
            need => need,
        }
    }

    /// Leave `Idle`. Returns the fetch to issue, or `ContextNeed::None`
    /// when the form is ready straight away.
    pub fn begin_loading(&mut self) -> ContextNeed {
        if self.phase != ModalPhase::Idle {
            return ContextNeed::None;
        }
        let need = self.context_need();
        self.phase = if need == ContextNeed::None {
            ModalPhase::Ready
        } else {
            ModalPhase::Loading
        };
        need
    }

    pub fn context_loaded(&mut self, context: ModalContext) {
        match context {
            ModalContext::FullDetails(full) => {
                self.details = self.details.clone().enrich(full);
            }
            ModalContext::DevUsers(users) => {
                if let TaskForm::TeamComposition(form) = &mut self.form {
                    *form = TeamCompositionForm::with_candidates(users);
                }
            }
            ModalContext::Documents(documents) => self.details.documents = documents,
        }
        if self.phase == ModalPhase::Loading {
            self.phase = ModalPhase::Ready;
        }
    }

    /// Context is never a hard requirement: render with what we have.
    pub fn context_failed(&mut self, notice: impl Into<String>) {
        self.notice = Some(notice.into());
        if self.phase == ModalPhase::Loading {
            self.phase = ModalPhase::Ready;
        }
    }

    pub fn is_ready(&self) -> bool {
        self.phase == ModalPhase::Ready
    }

    pub fn focused_field(&self) -> Option<Field> {
        let fields = self.form.fields();
        if fields.is_empty() {
            return None;
        }
        fields.get(self.focus.min(fields.len() - 1)).copied()
    }

    pub fn focus_next(&mut self) {
        let len = self.form.fields().len();
        if len > 0 {
            self.focus = (self.focus.min(len - 1) + 1) % len;
        }
    }

    pub fn focus_prev(&mut self) {
        let len = self.form.fields().len();
        if len > 0 {
            self.focus = (self.focus.min(len - 1) + len - 1) % len;
        }
    }

    /// Validate and move to `Submitting`. Returns the calls to run, or
    /// `None` if the modal is not ready or validation failed (the error is
    /// kept inline and nothing must be sent).
    pub fn submit(&mut self, clock: &Clock) -> Option<Vec<CompletionCall>> {
        if self.phase != ModalPhase::Ready {
            return None;
        }
        match self.form.plan(&self.details.task, clock) {
            Ok(calls) => {
                self.error = None;
                self.phase = ModalPhase::Submitting;
                Some(calls)
            }
            Err(e) => {
                self.error = Some(e.to_string());
                None
            }
        }
    }

    pub fn submission_failed(&mut self, message: impl Into<String>) {
        if self.phase == ModalPhase::Submitting {
            self.phase = ModalPhase::Ready;
            self.error = Some(message.into());
        }
    }

    pub fn submission_succeeded(&mut self) {
        if self.phase == ModalPhase::Submitting {
            self.phase = ModalPhase::Completed;
            self.error = None;
        }
    }

    pub fn set_documents(&mut self, documents: Vec<Document>) {
        self.details.documents = documents;
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::dispatch::{KEY_MVP_PRESENTATION, KEY_QUALIFICATION, KEY_TEAM_COMPOSITION};
    use crate::idea::{Idea, IdeaStatus};
    use crate::task::{Poc, Task};

    fn details(key: &str, with_idea: bool) -> TaskDetails {
        let task = Task {
            id: "t1".into(),
            name: "Task".into(),
            task_definition_key: key.into(),
            assignee: Some("me".into()),
            process_instance_id: "p1".into(),
            created: None,
        };
        let idea = with_idea.then(|| Idea {
            id: 4,
            titre: "Kiosks".into(),
            description: "d".into(),
            statut: IdeaStatus::EnDeveloppement,
            priority: None,
            created_by: "em".into(),
            date_creation: None,
            motif_rejet: None,
        });
        TaskDetails::new(task, idea)
    }

    fn clock() -> Clock {
        Clock::utc(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap())
    }

    #[test]
    fn plain_form_is_ready_immediately() {
        let mut modal = TaskModal::open(details(KEY_QUALIFICATION, true), &DispatchTable::default());
        assert_eq!(modal.phase, ModalPhase::Idle);
        assert_eq!(modal.begin_loading(), ContextNeed::None);
        assert!(modal.is_ready());
    }

    #[test]
    fn unknown_key_renders_generic_form() {
        let mut modal = TaskModal::open(details("Activity_new", true), &DispatchTable::default());
        assert_eq!(modal.kind(), TaskKind::Generic);
        modal.begin_loading();
        assert!(modal.is_ready());
        assert_eq!(modal.focused_field(), None);
        assert!(modal.submit(&clock()).is_some());
    }

    #[test]
    fn mvp_enriches_then_falls_back() {
        let table = DispatchTable::default();
        let mut modal = TaskModal::open(details(KEY_MVP_PRESENTATION, true), &table);
        assert_eq!(modal.begin_loading(), ContextNeed::FullIdeaDetails);
        assert_eq!(modal.phase, ModalPhase::Loading);

        let full = FullIdeaDetails {
            idea: modal.details.idea.clone().unwrap(),
            poc: Some(Poc {
                conclusion: Some("good".into()),
                ..Default::default()
            }),
            developpement: None,
            documents: Vec::new(),
        };
        modal.context_loaded(ModalContext::FullDetails(full));
        assert!(modal.is_ready());
        assert_eq!(modal.details.task.id, "t1");
        assert!(modal.details.poc.is_some());

        let mut modal = TaskModal::open(details(KEY_MVP_PRESENTATION, true), &table);
        modal.begin_loading();
        modal.context_failed("Could not load full idea details");
        assert!(modal.is_ready());
        assert_eq!(modal.details.idea.as_ref().map(|i| i.id), Some(4));
        assert!(modal.notice.is_some());
    }

    #[test]
    fn mvp_without_idea_skips_fetch() {
        let mut modal = TaskModal::open(
            details(KEY_MVP_PRESENTATION, false),
            &DispatchTable::default(),
        );
        assert_eq!(modal.begin_loading(), ContextNeed::None);
        assert!(modal.is_ready());
    }

    #[test]
    fn validation_error_stays_ready_and_sends_nothing() {
        let mut modal = TaskModal::open(details(KEY_TEAM_COMPOSITION, true), &DispatchTable::default());
        assert_eq!(modal.begin_loading(), ContextNeed::DevUsers);
        modal.context_loaded(ModalContext::DevUsers(vec![User {
            id: "dev".into(),
            first_name: "D".into(),
            last_name: "V".into(),
            email: String::new(),
        }]));
        assert!(modal.submit(&clock()).is_none());
        assert!(modal.is_ready());
        assert!(modal.error.is_some());

        modal.form.cycle(Field::ProjectLead, true);
        let calls = modal.submit(&clock()).unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(modal.phase, ModalPhase::Submitting);
        assert!(modal.error.is_none());
    }

    #[test]
    fn failed_submission_returns_to_ready() {
        let mut modal = TaskModal::open(details("x", true), &DispatchTable::default());
        modal.begin_loading();
        modal.submit(&clock()).unwrap();
        assert!(modal.submit(&clock()).is_none());

        modal.submission_failed("Failed to complete task");
        assert!(modal.is_ready());
        assert_eq!(modal.error.as_deref(), Some("Failed to complete task"));

        modal.submit(&clock()).unwrap();
        modal.submission_succeeded();
        assert_eq!(modal.phase, ModalPhase::Completed);
        assert!(modal.submit(&clock()).is_none());
    }

    #[test]
    fn focus_wraps_and_clamps() {
        let mut modal = TaskModal::open(details(KEY_QUALIFICATION, true), &DispatchTable::default());
        modal.begin_loading();
        modal.form.cycle(Field::Decision, false);
        assert_eq!(modal.form.fields().len(), 2);
        modal.focus_next();
        assert_eq!(modal.focused_field(), Some(Field::RejectionReason));
        modal.form.cycle(Field::Decision, true);
        assert_eq!(modal.focused_field(), Some(Field::Decision));
        modal.focus_prev();
        assert_eq!(modal.focused_field(), Some(Field::Decision));
    }
}

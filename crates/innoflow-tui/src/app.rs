use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use innoflow_core::dashboard::DashboardStats;
use innoflow_core::debounce::Debouncer;
use innoflow_core::dispatch::ContextNeed;
use innoflow_core::document::Document;
use innoflow_core::forms::Clock;
use innoflow_core::guard::RequestGuard;
use innoflow_core::idea::{Idea, IdeaFilter};
use innoflow_core::modal::{ModalContext, ModalPhase, TaskModal};
use innoflow_core::task::TaskDetails;
use innoflow_core::user::{Group, User, UserInput};
use innoflow_service::{execute_plan, ApiOp, ServiceError, Session, WorkflowApi};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use crate::components::centered_rect;
use crate::components::dashboard::DashboardView;
use crate::components::idea_details::IdeaDetailsView;
use crate::components::idea_editor::{EditorAction, IdeaEditor};
use crate::components::idea_list::IdeaList;
use crate::components::login::LoginForm;
use crate::components::task_list::{Pane, TaskList};
use crate::components::task_workspace::{Workspace, WorkspaceAction};
use crate::components::user_admin::{UserEditor, UserList};
use crate::config::Settings;
use crate::loader::{Envelope, Loader, Outcome, Slot, Ticket};

const SESSION_EXPIRED: &str = "Your session has expired. Please log in again.";
const LOGIN_FAILED: &str = "Invalid username or password.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Dashboard,
    Ideas,
    Tasks,
    Users,
}

impl Page {
    pub const ALL: [Page; 4] = [Page::Dashboard, Page::Ideas, Page::Tasks, Page::Users];

    pub fn title(&self) -> &'static str {
        match self {
            Page::Dashboard => "Dashboard",
            Page::Ideas => "Ideas",
            Page::Tasks => "My Tasks",
            Page::Users => "Users",
        }
    }

    fn slot(&self) -> Slot {
        match self {
            Page::Dashboard => Slot::Dashboard,
            Page::Ideas => Slot::Ideas,
            Page::Tasks => Slot::Tasks,
            Page::Users => Slot::Users,
        }
    }
}

/// What the app is currently doing
#[derive(Debug, Clone)]
pub enum Mode {
    /// Validating a stored token
    Booting,
    Login(LoginForm),
    /// Page navigation
    Normal,
    IdeaEditor(IdeaEditor),
    ConfirmDeleteIdea(Idea),
    IdeaDetails(Box<IdeaDetailsView>),
    /// An open task with its form
    TaskWorkspace(Box<Workspace>),
    /// Typing the idea-name filter on the task page
    TaskFilter,
    UserEditor(Box<UserEditor>),
    ConfirmDeleteUser(User),
}

#[derive(Debug, Default)]
struct Guards([RequestGuard; Slot::COUNT]);

impl Guards {
    fn issue(&mut self, slot: Slot) -> Ticket {
        Ticket {
            slot,
            generation: self.0[slot.index()].issue(),
        }
    }

    fn shared(&self, slot: Slot) -> Ticket {
        Ticket {
            slot,
            generation: self.0[slot.index()].current(),
        }
    }

    fn invalidate(&mut self, slot: Slot) {
        self.0[slot.index()].invalidate();
    }

    fn invalidate_all(&mut self) {
        for guard in self.0.iter_mut() {
            guard.invalidate();
        }
    }

    fn is_current(&self, ticket: Ticket) -> bool {
        self.0[ticket.slot.index()].is_current(ticket.generation)
    }
}

pub struct App {
    loader: Loader,
    settings: Settings,
    session: Option<Session>,
    mode: Mode,
    page: Page,
    status_message: Option<String>,
    guards: Guards,
    debouncer: Debouncer,
    dashboard: DashboardView,
    ideas: IdeaList,
    tasks: TaskList,
    users: UserList,
}

impl App {
    /// Starts at the login form, or validates the stored token first when
    /// there is one.
    pub fn new(api: Arc<dyn WorkflowApi>, settings: Settings) -> Result<Self> {
        let loader = Loader::new(api)?;
        let debouncer = Debouncer::new(settings.debounce);
        let mut app = Self {
            loader,
            settings,
            session: None,
            mode: Mode::Login(LoginForm::default()),
            page: Page::Dashboard,
            status_message: None,
            guards: Guards::default(),
            debouncer,
            dashboard: DashboardView::default(),
            ideas: IdeaList::default(),
            tasks: TaskList::default(),
            users: UserList::default(),
        };

        if let Some(token) = app.settings.token_store.load() {
            app.mode = Mode::Booting;
            let api = app.loader.api();
            app.issue(Slot::Session, async move {
                Outcome::Restored(Session::resume(api.as_ref(), token).await)
            });
        }
        Ok(app)
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn page(&self) -> Page {
        self.page
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn dashboard(&self) -> &DashboardView {
        &self.dashboard
    }

    pub fn ideas(&self) -> &IdeaList {
        &self.ideas
    }

    pub fn tasks(&self) -> &TaskList {
        &self.tasks
    }

    pub fn users(&self) -> &UserList {
        &self.users
    }

    pub fn is_input_mode(&self) -> bool {
        matches!(
            self.mode,
            Mode::Login(_)
                | Mode::IdeaEditor(_)
                | Mode::TaskWorkspace(_)
                | Mode::TaskFilter
                | Mode::UserEditor(_)
        )
    }

    fn can_manage_ideas(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.user.can_manage_ideas())
    }

    fn can_manage_users(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.user.can_manage_users())
    }

    // -- Requests --

    fn issue<F>(&mut self, slot: Slot, fut: F)
    where
        F: Future<Output = Outcome> + Send + 'static,
    {
        let ticket = self.guards.issue(slot);
        self.loader.spawn(ticket, fut);
    }

    /// Writes never supersede each other; they only die with the session.
    fn mutate<F>(&mut self, fut: F)
    where
        F: Future<Output = Outcome> + Send + 'static,
    {
        let ticket = self.guards.shared(Slot::Mutation);
        self.loader.spawn(ticket, fut);
    }

    fn authed(&self) -> Option<(Arc<dyn WorkflowApi>, String)> {
        self.session
            .as_ref()
            .map(|s| (self.loader.api(), s.token.clone()))
    }

    /// Debounce timer. Call between frames.
    pub fn tick(&mut self) {
        if self.debouncer.fire_if_due(Instant::now()) {
            self.fetch_tasks();
        }
    }

    /// Apply every response that has arrived.
    pub fn pump(&mut self) {
        for envelope in self.loader.drain() {
            self.apply(envelope);
        }
    }

    /// Tick and pump until nothing is in flight or pending. Returns false
    /// on timeout.
    pub fn settle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            self.tick();
            let idle = self.loader.is_idle();
            self.pump();
            if idle && self.loader.is_idle() && !self.debouncer.is_pending() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        false
    }

    fn fetch_page(&mut self) {
        match self.page {
            Page::Dashboard => self.fetch_dashboard(),
            Page::Ideas => self.fetch_ideas(),
            Page::Tasks => self.fetch_tasks(),
            Page::Users => self.fetch_users(),
        }
    }

    fn fetch_dashboard(&mut self) {
        let Some((api, token)) = self.authed() else {
            return;
        };
        self.dashboard.loading = true;
        self.issue(Slot::Dashboard, async move {
            Outcome::Dashboard(api.dashboard_stats(&token).await)
        });
    }

    fn fetch_ideas(&mut self) {
        let Some((api, token)) = self.authed() else {
            return;
        };
        let filter = self.ideas.filter;
        self.ideas.loading = true;
        self.issue(Slot::Ideas, async move {
            Outcome::Ideas(api.list_ideas(&token, &filter).await)
        });
    }

    fn fetch_tasks(&mut self) {
        let Some((api, token)) = self.authed() else {
            return;
        };
        self.debouncer.cancel();
        let query = self.tasks.query.clone();
        self.tasks.loading = true;
        self.issue(Slot::Tasks, async move {
            Outcome::Tasks(api.list_tasks(&token, &query).await)
        });
    }

    fn fetch_users(&mut self) {
        let Some((api, token)) = self.authed() else {
            return;
        };
        self.users.loading = true;
        self.issue(Slot::Users, async move {
            Outcome::Users(load_users(api.as_ref(), &token).await)
        });
    }

    fn fetch_workspace_documents(&mut self) {
        let Mode::TaskWorkspace(ws) = &self.mode else {
            return;
        };
        let pid = ws.modal.details.task.process_instance_id.clone();
        let Some((api, token)) = self.authed() else {
            return;
        };
        self.issue(Slot::Workspace, async move {
            Outcome::WorkspaceDocuments(api.list_documents(&token, &pid).await)
        });
    }

    // -- Session --

    fn start_session(&mut self, session: Session) {
        if let Err(e) = self.settings.token_store.save(&session.token) {
            tracing::warn!(error = %e, "failed to persist session token");
        }
        tracing::info!(user = %session.user.username, "session established");
        self.session = Some(session);
        self.guards.issue(Slot::Mutation);
        self.reset_views();
        self.page = Page::Dashboard;
        self.mode = Mode::Normal;
        self.fetch_page();
    }

    fn end_session(&mut self, notice: Option<&str>) {
        if let Err(e) = self.settings.token_store.clear() {
            tracing::warn!(error = %e, "failed to clear session token");
        }
        self.guards.invalidate_all();
        self.debouncer.cancel();
        self.session = None;
        self.reset_views();
        self.mode = Mode::Login(notice.map(LoginForm::with_error).unwrap_or_default());
    }

    fn reset_views(&mut self) {
        self.dashboard = DashboardView::default();
        self.ideas = IdeaList::default();
        self.tasks = TaskList::default();
        self.users = UserList::default();
    }

    /// Tears the session down on a rejected token. Returns true if it did.
    fn expired(&mut self, err: &ServiceError) -> bool {
        if !err.is_unauthorized() {
            return false;
        }
        tracing::warn!(op = ?err.op(), "token rejected, ending session");
        self.end_session(Some(SESSION_EXPIRED));
        self.status_message = Some(SESSION_EXPIRED.into());
        true
    }

    fn switch_page(&mut self, page: Page) {
        if page == Page::Users && !self.can_manage_users() {
            self.status_message = Some("User administration requires the admin group.".into());
            return;
        }
        if page != self.page {
            self.guards.invalidate(self.page.slot());
            self.guards.invalidate(Slot::Workspace);
            if self.page == Page::Tasks {
                self.debouncer.cancel();
            }
        }
        self.page = page;
        self.fetch_page();
    }

    // -- Responses --

    fn apply(&mut self, envelope: Envelope) {
        let Envelope { ticket, outcome } = envelope;
        if !self.guards.is_current(ticket) {
            tracing::debug!(
                slot = ?ticket.slot,
                generation = ticket.generation,
                "discarding stale response"
            );
            return;
        }

        match outcome {
            Outcome::LoggedIn(Ok(session)) | Outcome::Restored(Ok(session)) => {
                self.start_session(session)
            }
            Outcome::LoggedIn(Err(e)) => {
                tracing::warn!(error = ?e, "login failed");
                if let Mode::Login(form) = &mut self.mode {
                    form.failed(LOGIN_FAILED);
                }
            }
            Outcome::Restored(Err(e)) => {
                tracing::info!(error = ?e, "stored session rejected");
                self.end_session(None);
            }
            Outcome::Dashboard(result) => self.dashboard_loaded(result),
            Outcome::Ideas(result) => match result {
                Ok(ideas) => self.ideas.set_ideas(ideas),
                Err(e) => {
                    if !self.expired(&e) {
                        tracing::warn!(error = ?e, "idea list fetch failed");
                        self.ideas.set_error(e.to_string());
                    }
                }
            },
            Outcome::IdeaDetails(result) => self.idea_details_loaded(result),
            Outcome::Tasks(result) => match result {
                Ok(entries) => self.tasks.set_tasks(entries),
                Err(e) => {
                    if !self.expired(&e) {
                        tracing::warn!(error = ?e, "task list fetch failed");
                        self.tasks.set_error(e.to_string());
                    }
                }
            },
            Outcome::TaskDetails(initial, result) => match result {
                Ok(details) => self.start_workspace(details),
                Err(e) => {
                    if self.expired(&e) {
                        return;
                    }
                    tracing::warn!(error = ?e, "task details fetch failed, using list entry");
                    self.start_workspace(initial);
                    if let Mode::TaskWorkspace(ws) = &mut self.mode {
                        ws.modal.notice = Some(e.to_string());
                    }
                }
            },
            Outcome::ModalContext(result) => {
                if let Err(e) = &result {
                    if self.expired(e) {
                        return;
                    }
                    tracing::warn!(error = ?e, "task context fetch failed, rendering without it");
                }
                if let Mode::TaskWorkspace(ws) = &mut self.mode {
                    match result {
                        Ok(context) => ws.modal.context_loaded(context),
                        Err(e) => ws.modal.context_failed(e.to_string()),
                    }
                }
            }
            Outcome::WorkspaceDocuments(result) => match result {
                Ok(documents) => {
                    if let Mode::TaskWorkspace(ws) = &mut self.mode {
                        ws.set_documents(documents);
                    }
                }
                Err(e) => {
                    if !self.expired(&e) {
                        self.status_message = Some(e.to_string());
                    }
                }
            },
            Outcome::Plan { task_id, result } => self.plan_finished(task_id, result),
            Outcome::IdeaSaved(result) => match result {
                Ok(idea) => {
                    tracing::info!(idea = idea.id, "idea saved");
                    if matches!(self.mode, Mode::IdeaEditor(_)) {
                        self.mode = Mode::Normal;
                    }
                    self.status_message = Some("Idea saved.".into());
                    self.fetch_ideas();
                }
                Err(e) => {
                    if self.expired(&e) {
                        return;
                    }
                    tracing::warn!(error = ?e, "idea save failed");
                    if let Mode::IdeaEditor(editor) = &mut self.mode {
                        editor.saving = false;
                        editor.error = Some(e.to_string());
                    }
                    self.status_message = Some(e.to_string());
                }
            },
            Outcome::IdeaDeleted(result) => {
                self.mutation_done(result, "Idea deleted.", Self::fetch_ideas)
            }
            Outcome::Claimed(result) => {
                self.mutation_done(result, "Task claimed.", Self::fetch_tasks)
            }
            Outcome::Unclaimed(result) => {
                self.mutation_done(result, "Task released.", Self::fetch_tasks)
            }
            Outcome::Users(result) => match result {
                Ok((users, groups)) => self.users.set_data(users, groups),
                Err(e) => {
                    if !self.expired(&e) {
                        tracing::warn!(error = ?e, "user directory fetch failed");
                        self.users.set_error(e.to_string());
                    }
                }
            },
            Outcome::UserGroups { user_id, result } => {
                if let Err(e) = &result {
                    if self.expired(e) {
                        return;
                    }
                }
                if let Mode::UserEditor(editor) = &mut self.mode {
                    if editor.original.as_ref().is_some_and(|u| u.id == user_id) {
                        match result {
                            Ok(groups) => editor.memberships_loaded(groups),
                            Err(e) => editor.error = Some(e.to_string()),
                        }
                    }
                }
            }
            Outcome::UserSaved(result) => self.user_saved(result),
            Outcome::UserDeleted(result) => {
                self.mutation_done(result, "User deleted.", Self::fetch_users)
            }
            Outcome::Uploaded(result) => {
                self.mutation_done(result, "Document uploaded.", Self::fetch_workspace_documents)
            }
            Outcome::Downloaded(result) => match result {
                Ok(path) => {
                    self.status_message = Some(format!("Saved to {}", path.display()));
                }
                Err(e) => {
                    if !self.expired(&e) {
                        tracing::warn!(error = ?e, "download failed");
                        self.status_message = Some(e.to_string());
                    }
                }
            },
            Outcome::DocumentDeleted(result) => {
                self.mutation_done(result, "Document deleted.", Self::fetch_workspace_documents)
            }
        }
    }

    /// Refetch on success; on failure leave the lists alone and say so.
    fn mutation_done(
        &mut self,
        result: Result<(), ServiceError>,
        success: &str,
        refetch: fn(&mut Self),
    ) {
        match result {
            Ok(()) => {
                self.status_message = Some(success.into());
                refetch(self);
            }
            Err(e) => {
                if !self.expired(&e) {
                    tracing::warn!(error = ?e, "mutation failed");
                    self.status_message = Some(e.to_string());
                }
            }
        }
    }

    fn dashboard_loaded(&mut self, result: Result<DashboardStats, ServiceError>) {
        match result {
            Ok(stats) => self.dashboard.set_stats(stats),
            Err(e) => {
                if !self.expired(&e) {
                    tracing::warn!(error = ?e, "dashboard fetch failed");
                    self.dashboard.set_error(e.to_string());
                }
            }
        }
    }

    fn idea_details_loaded(
        &mut self,
        result: Result<innoflow_core::task::FullIdeaDetails, ServiceError>,
    ) {
        if let Err(e) = &result {
            if self.expired(e) {
                return;
            }
        }
        if let Mode::IdeaDetails(view) = &mut self.mode {
            match result {
                Ok(full) => view.loaded(full),
                Err(e) => view.error = Some(e.to_string()),
            }
        }
    }

    fn plan_finished(&mut self, task_id: String, result: Result<(), innoflow_service::PlanError>) {
        match result {
            Ok(()) => {
                tracing::info!(task = %task_id, "task completed");
                self.status_message = Some("Task completed.".into());
                if let Mode::TaskWorkspace(ws) = &mut self.mode {
                    if ws.task_id() == task_id {
                        ws.modal.submission_succeeded();
                    }
                }
                if matches!(&self.mode, Mode::TaskWorkspace(ws) if ws.modal.phase == ModalPhase::Completed)
                {
                    self.guards.invalidate(Slot::Workspace);
                    self.mode = Mode::Normal;
                }
                self.fetch_tasks();
            }
            Err(e) => {
                if self.expired(&e.source) {
                    return;
                }
                let message = e.user_message();
                tracing::warn!(task = %task_id, completed = e.completed, total = e.total, "task completion failed");
                if let Mode::TaskWorkspace(ws) = &mut self.mode {
                    if ws.task_id() == task_id {
                        ws.modal.submission_failed(message.clone());
                    }
                }
                self.status_message = Some(message);
            }
        }
    }

    fn user_saved(&mut self, result: Result<(), ServiceError>) {
        match result {
            Ok(()) => {
                if matches!(self.mode, Mode::UserEditor(_)) {
                    self.guards.invalidate(Slot::UserEditor);
                    self.mode = Mode::Normal;
                }
                self.status_message = Some("User saved.".into());
                self.fetch_users();
            }
            Err(e) => {
                if self.expired(&e) {
                    return;
                }
                tracing::warn!(error = ?e, "user save failed");
                if let Mode::UserEditor(editor) = &mut self.mode {
                    editor.saving = false;
                    editor.error = Some(e.to_string());
                    // The account exists now; a retry must update, not create.
                    if e.op() == ApiOp::SetUserGroups && editor.is_creating() {
                        editor.original = Some(User {
                            id: editor.input.id.clone(),
                            first_name: editor.input.first_name.clone(),
                            last_name: editor.input.last_name.clone(),
                            email: editor.input.email.clone(),
                        });
                    }
                }
                self.status_message = Some(e.to_string());
                self.fetch_users();
            }
        }
    }

    // -- Keys --

    pub fn handle_key(&mut self, key: KeyEvent) {
        self.status_message = None;

        match std::mem::replace(&mut self.mode, Mode::Normal) {
            Mode::Booting => self.mode = Mode::Booting,
            Mode::Login(form) => self.handle_login(key, form),
            Mode::Normal => self.handle_normal(key),
            Mode::IdeaEditor(editor) => self.handle_idea_editor(key, editor),
            Mode::ConfirmDeleteIdea(idea) => self.handle_confirm_delete_idea(key, idea),
            Mode::IdeaDetails(view) => self.handle_idea_details(key, view),
            Mode::TaskWorkspace(ws) => self.handle_workspace(key, ws),
            Mode::TaskFilter => self.handle_task_filter(key),
            Mode::UserEditor(editor) => self.handle_user_editor(key, editor),
            Mode::ConfirmDeleteUser(user) => self.handle_confirm_delete_user(key, user),
        }
    }

    fn handle_login(&mut self, key: KeyEvent, mut form: LoginForm) {
        if let Some((username, password)) = form.handle_key(key) {
            let api = self.loader.api();
            self.issue(Slot::Session, async move {
                Outcome::LoggedIn(Session::establish(api.as_ref(), &username, &password).await)
            });
        }
        self.mode = Mode::Login(form);
    }

    fn handle_normal(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('1') => self.switch_page(Page::Dashboard),
            KeyCode::Char('2') => self.switch_page(Page::Ideas),
            KeyCode::Char('3') => self.switch_page(Page::Tasks),
            KeyCode::Char('4') => self.switch_page(Page::Users),
            KeyCode::Char('r') => self.fetch_page(),
            KeyCode::Char('L') => {
                tracing::info!("logged out");
                self.end_session(None);
                self.status_message = Some("Logged out.".into());
            }
            _ => match self.page {
                Page::Dashboard => {}
                Page::Ideas => self.handle_ideas_key(key),
                Page::Tasks => self.handle_tasks_key(key),
                Page::Users => self.handle_users_key(key),
            },
        }
    }

    fn handle_ideas_key(&mut self, key: KeyEvent) {
        let can_manage = self.can_manage_ideas();
        match key.code {
            KeyCode::Char('n') if can_manage => {
                self.mode = Mode::IdeaEditor(IdeaEditor::create());
            }
            KeyCode::Char('e') if can_manage => {
                if let Some(idea) = self.ideas.selected() {
                    self.mode = Mode::IdeaEditor(IdeaEditor::edit(idea));
                }
            }
            KeyCode::Char('d') if can_manage => {
                if let Some(idea) = self.ideas.selected() {
                    self.mode = Mode::ConfirmDeleteIdea(idea.clone());
                }
            }
            KeyCode::Enter => {
                if let Some(idea) = self.ideas.selected().cloned() {
                    self.open_idea_details(idea);
                }
            }
            KeyCode::Char('s') => {
                self.ideas.filter.cycle_status();
                self.fetch_ideas();
            }
            KeyCode::Char('p') => {
                self.ideas.filter.cycle_priority();
                self.fetch_ideas();
            }
            KeyCode::Char('c') => {
                self.ideas.filter = IdeaFilter::default();
                self.fetch_ideas();
            }
            _ => self.ideas.handle_key(key),
        }
    }

    fn open_idea_details(&mut self, idea: Idea) {
        let Some((api, token)) = self.authed() else {
            return;
        };
        let id = idea.id;
        self.mode = Mode::IdeaDetails(Box::new(IdeaDetailsView::new(idea)));
        self.issue(Slot::IdeaDetails, async move {
            Outcome::IdeaDetails(api.idea_details(&token, id).await)
        });
    }

    fn handle_idea_details(&mut self, key: KeyEvent, mut view: Box<IdeaDetailsView>) {
        match key.code {
            KeyCode::Esc => {
                self.guards.invalidate(Slot::IdeaDetails);
                return;
            }
            KeyCode::Char('o') => {
                if let Some(doc) = view.selected_document().cloned() {
                    self.download(doc);
                }
            }
            _ => view.handle_key(key),
        }
        self.mode = Mode::IdeaDetails(view);
    }

    fn handle_idea_editor(&mut self, key: KeyEvent, mut editor: IdeaEditor) {
        match editor.handle_key(key) {
            EditorAction::Cancel => return,
            EditorAction::Save => {
                if let Some((api, token)) = self.authed() {
                    editor.saving = true;
                    let input = editor.input.clone();
                    let editing = editor.editing;
                    self.mutate(async move {
                        let result = match editing {
                            Some(id) => api.update_idea(&token, id, &input).await,
                            None => api.create_idea(&token, &input).await,
                        };
                        Outcome::IdeaSaved(result)
                    });
                }
            }
            EditorAction::None => {}
        }
        self.mode = Mode::IdeaEditor(editor);
    }

    fn handle_confirm_delete_idea(&mut self, key: KeyEvent, idea: Idea) {
        if key.code != KeyCode::Char('y') {
            return;
        }
        let Some((api, token)) = self.authed() else {
            return;
        };
        tracing::info!(idea = idea.id, "deleting idea");
        self.status_message = Some(format!("Deleting \"{}\"...", idea.titre));
        self.mutate(async move { Outcome::IdeaDeleted(api.delete_idea(&token, idea.id).await) });
    }

    fn handle_tasks_key(&mut self, key: KeyEvent) {
        let pane = self.tasks.active_pane();
        match key.code {
            KeyCode::Char('c') => {
                let Some(entry) = self.tasks.selected() else {
                    return;
                };
                if pane != Pane::Claimable {
                    self.status_message = Some("Only group tasks can be claimed.".into());
                    return;
                }
                let task_id = entry.task.id.clone();
                let Some((api, token)) = self.authed() else {
                    return;
                };
                self.status_message = Some("Claiming task...".into());
                self.mutate(async move { Outcome::Claimed(api.claim_task(&token, &task_id).await) });
            }
            KeyCode::Char('u') => {
                let Some(entry) = self.tasks.selected() else {
                    return;
                };
                if pane != Pane::Assigned {
                    self.status_message = Some("Only your own tasks can be released.".into());
                    return;
                }
                let task_id = entry.task.id.clone();
                let Some((api, token)) = self.authed() else {
                    return;
                };
                self.status_message = Some("Releasing task...".into());
                self.mutate(async move {
                    Outcome::Unclaimed(api.unclaim_task(&token, &task_id).await)
                });
            }
            KeyCode::Enter => {
                let Some(entry) = self.tasks.selected().cloned() else {
                    return;
                };
                if pane != Pane::Assigned {
                    self.status_message = Some("Claim the task before working on it.".into());
                    return;
                }
                self.open_task(entry);
            }
            KeyCode::Char('/') => self.mode = Mode::TaskFilter,
            KeyCode::Char('t') => {
                let keys: Vec<Option<String>> = std::iter::once(None)
                    .chain(
                        self.settings
                            .dispatch
                            .known_keys()
                            .into_iter()
                            .map(|(key, _)| Some(key)),
                    )
                    .collect();
                let current = keys
                    .iter()
                    .position(|k| *k == self.tasks.query.task_definition_key)
                    .unwrap_or(0);
                self.tasks.query.task_definition_key = keys[(current + 1) % keys.len()].clone();
                self.task_filter_changed();
            }
            _ => self.tasks.handle_key(key),
        }
    }

    /// Anything still in flight for the old filter is now stale; the
    /// debouncer decides when the new one goes out.
    fn task_filter_changed(&mut self) {
        self.guards.invalidate(Slot::Tasks);
        self.tasks.loading = true;
        self.debouncer.touch(Instant::now());
    }

    fn handle_task_filter(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter | KeyCode::Esc => return,
            KeyCode::Backspace => {
                self.tasks.query.idea_name.pop();
                self.task_filter_changed();
            }
            KeyCode::Char(c) => {
                self.tasks.query.idea_name.push(c);
                self.task_filter_changed();
            }
            _ => {}
        }
        self.mode = Mode::TaskFilter;
    }

    fn open_task(&mut self, entry: TaskDetails) {
        if entry.idea.is_some() {
            self.start_workspace(entry);
            return;
        }
        let Some((api, token)) = self.authed() else {
            return;
        };
        self.status_message = Some("Loading task details...".into());
        let task_id = entry.task.id.clone();
        self.issue(Slot::Workspace, async move {
            let result = api.task_details(&token, &task_id).await;
            Outcome::TaskDetails(entry, result)
        });
    }

    fn start_workspace(&mut self, details: TaskDetails) {
        let mut modal = TaskModal::open(details, &self.settings.dispatch);
        let need = modal.begin_loading();
        tracing::debug!(
            task = %modal.details.task.id,
            kind = modal.kind().as_str(),
            "opening task workspace"
        );
        let idea_id = modal.details.idea.as_ref().map(|i| i.id);
        let pid = modal.details.task.process_instance_id.clone();
        self.mode = Mode::TaskWorkspace(Box::new(Workspace::new(modal)));

        let Some((api, token)) = self.authed() else {
            return;
        };
        match (need, idea_id) {
            (ContextNeed::None, _) => {}
            (ContextNeed::FullIdeaDetails, Some(id)) => {
                self.issue(Slot::Workspace, async move {
                    let result = api.idea_details(&token, id).await;
                    Outcome::ModalContext(result.map(ModalContext::FullDetails))
                });
            }
            (ContextNeed::FullIdeaDetails, None) => {}
            (ContextNeed::DevUsers, _) => {
                self.issue(Slot::Workspace, async move {
                    let result = api.dev_users(&token).await;
                    Outcome::ModalContext(result.map(ModalContext::DevUsers))
                });
            }
            (ContextNeed::Documents, _) => {
                self.issue(Slot::Workspace, async move {
                    let result = api.list_documents(&token, &pid).await;
                    Outcome::ModalContext(result.map(ModalContext::Documents))
                });
            }
        }
    }

    fn handle_workspace(&mut self, key: KeyEvent, mut ws: Box<Workspace>) {
        match ws.handle_key(key) {
            WorkspaceAction::None => {}
            WorkspaceAction::Close => {
                self.guards.invalidate(Slot::Workspace);
                return;
            }
            WorkspaceAction::Submit => match ws.modal.submit(&Clock::system()) {
                Some(calls) => {
                    if let Some((api, token)) = self.authed() {
                        let task_id = ws.task_id().to_string();
                        tracing::info!(task = %task_id, steps = calls.len(), "submitting task");
                        self.mutate(async move {
                            let result = execute_plan(api.as_ref(), &token, &calls).await;
                            Outcome::Plan { task_id, result }
                        });
                    }
                }
                None => self.status_message = ws.modal.error.clone(),
            },
            WorkspaceAction::Upload(path) => {
                let pid = ws.modal.details.task.process_instance_id.clone();
                self.upload(pid, path);
            }
            WorkspaceAction::Download(doc) => self.download(doc),
            WorkspaceAction::DeleteDocument(doc) => {
                if let Some((api, token)) = self.authed() {
                    self.status_message = Some(format!("Deleting {}...", doc.display_name()));
                    self.mutate(async move {
                        Outcome::DocumentDeleted(api.delete_document(&token, doc.id).await)
                    });
                }
            }
        }
        self.mode = Mode::TaskWorkspace(ws);
    }

    fn upload(&mut self, process_instance_id: String, path: PathBuf) {
        let Some((api, token)) = self.authed() else {
            return;
        };
        self.status_message = Some(format!("Uploading {}...", path.display()));
        self.mutate(async move {
            Outcome::Uploaded(upload_file(api.as_ref(), &token, &process_instance_id, &path).await)
        });
    }

    fn download(&mut self, doc: Document) {
        let Some((api, token)) = self.authed() else {
            return;
        };
        let dir = self.settings.download_dir.clone();
        self.status_message = Some(format!("Downloading {}...", doc.display_name()));
        self.mutate(async move {
            Outcome::Downloaded(download_file(api.as_ref(), &token, &doc, &dir).await)
        });
    }

    fn handle_users_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('n') => {
                let groups = self.users.groups().to_vec();
                self.mode = Mode::UserEditor(Box::new(UserEditor::create(groups)));
            }
            KeyCode::Char('e') => {
                let Some(user) = self.users.selected().cloned() else {
                    return;
                };
                let Some((api, token)) = self.authed() else {
                    return;
                };
                let groups = self.users.groups().to_vec();
                self.mode = Mode::UserEditor(Box::new(UserEditor::edit(&user, groups)));
                let user_id = user.id;
                self.issue(Slot::UserEditor, async move {
                    let result = api.user_groups(&token, &user_id).await;
                    Outcome::UserGroups { user_id, result }
                });
            }
            KeyCode::Char('d') => {
                if let Some(user) = self.users.selected() {
                    self.mode = Mode::ConfirmDeleteUser(user.clone());
                }
            }
            _ => self.users.handle_key(key),
        }
    }

    fn handle_user_editor(&mut self, key: KeyEvent, mut editor: Box<UserEditor>) {
        match editor.handle_key(key) {
            EditorAction::Cancel => {
                self.guards.invalidate(Slot::UserEditor);
                return;
            }
            EditorAction::Save if !editor.groups_loaded => {
                editor.error = Some("Group memberships are still loading.".into());
            }
            EditorAction::Save => {
                if let Some((api, token)) = self.authed() {
                    editor.saving = true;
                    let input = editor.input.clone();
                    let groups = editor.selected_groups.clone();
                    let creating = editor.is_creating();
                    self.mutate(async move {
                        let result = save_user(api.as_ref(), &token, &input, &groups, creating).await;
                        Outcome::UserSaved(result)
                    });
                }
            }
            EditorAction::None => {}
        }
        self.mode = Mode::UserEditor(editor);
    }

    fn handle_confirm_delete_user(&mut self, key: KeyEvent, user: User) {
        if key.code != KeyCode::Char('y') {
            return;
        }
        let Some((api, token)) = self.authed() else {
            return;
        };
        tracing::info!(user = %user.id, "deleting user");
        self.status_message = Some(format!("Deleting {}...", user.id));
        self.mutate(async move { Outcome::UserDeleted(api.delete_user(&token, &user.id).await) });
    }

    // -- Rendering --

    pub fn render(&self, frame: &mut Frame) {
        let area = frame.area();

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(area);

        self.render_title_bar(frame, layout[0]);
        match &self.mode {
            Mode::Booting => {
                let text = Paragraph::new("Restoring session...")
                    .alignment(Alignment::Center)
                    .style(Style::default().fg(Color::DarkGray));
                frame.render_widget(text, layout[1]);
            }
            Mode::Login(_) => {}
            _ => match self.page {
                Page::Dashboard => self.dashboard.render(frame, layout[1]),
                Page::Ideas => self.ideas.render(frame, layout[1]),
                Page::Tasks => self.tasks.render(frame, layout[1], &self.settings.dispatch),
                Page::Users => self.users.render(frame, layout[1]),
            },
        }
        self.render_status_bar(frame, layout[2]);

        // Overlays
        match &self.mode {
            Mode::Booting | Mode::Normal => {}
            Mode::Login(form) => form.render(frame, area),
            Mode::IdeaEditor(editor) => editor.render(frame, area),
            Mode::ConfirmDeleteIdea(idea) => {
                self.render_confirm(frame, &format!("Delete idea \"{}\"?", idea.titre), area)
            }
            Mode::IdeaDetails(view) => view.render(frame, area),
            Mode::TaskWorkspace(ws) => ws.render(frame, area),
            Mode::TaskFilter => self.render_input_bar(
                frame,
                " Idea name filter ",
                &self.tasks.query.idea_name,
                area,
            ),
            Mode::UserEditor(editor) => editor.render(frame, area),
            Mode::ConfirmDeleteUser(user) => self.render_confirm(
                frame,
                &format!("Delete user \"{}\" ({})?", user.full_name(), user.id),
                area,
            ),
        }
    }

    fn render_title_bar(&self, frame: &mut Frame, area: Rect) {
        let mut spans = vec![Span::styled(
            " innoflow ",
            Style::default().bold().fg(Color::Cyan),
        )];
        if let Some(session) = &self.session {
            for (i, page) in Page::ALL.iter().enumerate() {
                if *page == Page::Users && !session.user.can_manage_users() {
                    continue;
                }
                let style = if *page == self.page {
                    Style::default().fg(Color::Black).bg(Color::Cyan).bold()
                } else {
                    Style::default().fg(Color::DarkGray)
                };
                spans.push(Span::raw(" "));
                spans.push(Span::styled(format!("{} {}", i + 1, page.title()), style));
            }
            spans.push(Span::raw(" | "));
            spans.push(Span::styled(
                session.user.username.clone(),
                Style::default().fg(Color::Yellow),
            ));
            if !session.user.groups.is_empty() {
                spans.push(Span::styled(
                    format!(" ({})", session.user.groups.join(", ")),
                    Style::default().fg(Color::DarkGray),
                ));
            }
        }
        frame.render_widget(Line::from(spans), area);
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        if let Some(ref msg) = self.status_message {
            let line = Line::from(Span::styled(
                format!(" {msg}"),
                Style::default().fg(Color::Green),
            ));
            frame.render_widget(line, area);
            return;
        }

        let hints = match &self.mode {
            Mode::Booting => vec![("q", "quit")],
            Mode::Login(_) => vec![("Tab", "field"), ("Enter", "sign in"), ("Ctrl+C", "quit")],
            Mode::Normal => self.page_hints(),
            Mode::IdeaEditor(_) | Mode::UserEditor(_) => {
                vec![("Tab", "field"), ("Ctrl+S", "save"), ("Esc", "cancel")]
            }
            Mode::ConfirmDeleteIdea(_) | Mode::ConfirmDeleteUser(_) => {
                vec![("y", "confirm"), ("any", "cancel")]
            }
            Mode::IdeaDetails(_) => vec![
                ("j/k", "documents"),
                ("o", "download"),
                ("PgUp/PgDn", "scroll"),
                ("Esc", "back"),
            ],
            Mode::TaskWorkspace(_) => vec![
                ("Tab", "field"),
                ("Left/Right", "choice"),
                ("Up/Down", "list"),
                ("Space", "toggle"),
                ("Ctrl+S", "submit"),
                ("Ctrl+U", "upload"),
                ("Ctrl+O", "download"),
                ("Del", "delete doc"),
                ("Esc", "close"),
            ],
            Mode::TaskFilter => vec![("type", "filter"), ("Enter", "done")],
        };

        let spans: Vec<Span> = hints
            .into_iter()
            .flat_map(|(key, desc)| {
                vec![
                    Span::styled(format!(" {key}"), Style::default().fg(Color::Yellow).bold()),
                    Span::raw(format!(" {desc} ")),
                ]
            })
            .collect();

        frame.render_widget(Line::from(spans), area);
    }

    fn page_hints(&self) -> Vec<(&'static str, &'static str)> {
        let mut hints = vec![("q", "quit"), ("1-4", "pages"), ("r", "refresh")];
        match self.page {
            Page::Dashboard => {}
            Page::Ideas => {
                hints.extend([("j/k", "ideas"), ("Enter", "details")]);
                if self.can_manage_ideas() {
                    hints.extend([("n", "new"), ("e", "edit"), ("d", "del")]);
                }
                hints.extend([("s", "status"), ("p", "priority"), ("c", "clear")]);
            }
            Page::Tasks => hints.extend([
                ("Tab", "pane"),
                ("c", "claim"),
                ("u", "release"),
                ("Enter", "open"),
                ("/", "idea"),
                ("t", "type"),
            ]),
            Page::Users => hints.extend([("j/k", "users"), ("n", "new"), ("e", "edit"), ("d", "del")]),
        }
        hints.push(("L", "logout"));
        hints
    }

    fn render_input_bar(&self, frame: &mut Frame, label: &str, input: &str, area: Rect) {
        let input_area = Rect {
            x: area.x,
            y: area.y + area.height.saturating_sub(3),
            width: area.width,
            height: 3,
        };
        frame.render_widget(Clear, input_area);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(label);
        let paragraph = Paragraph::new(format!("{input}_")).block(block);
        frame.render_widget(paragraph, input_area);
    }

    fn render_confirm(&self, frame: &mut Frame, question: &str, area: Rect) {
        let popup = centered_rect(50, 20, area);
        frame.render_widget(Clear, popup);

        let block = Block::default()
            .title(" Confirm Delete ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red));

        let text = format!("{question}\n\n(y)es / (any key) cancel");
        let paragraph = Paragraph::new(text)
            .block(block)
            .wrap(Wrap { trim: false })
            .alignment(Alignment::Center);
        frame.render_widget(paragraph, popup);
    }
}

async fn load_users(
    api: &dyn WorkflowApi,
    token: &str,
) -> Result<(Vec<User>, Vec<Group>), ServiceError> {
    let users = api.list_users(token).await?;
    let groups = api.list_groups(token).await?;
    Ok((users, groups))
}

/// Create or update, then replace the group memberships.
async fn save_user(
    api: &dyn WorkflowApi,
    token: &str,
    input: &UserInput,
    groups: &[String],
    creating: bool,
) -> Result<(), ServiceError> {
    if creating {
        api.create_user(token, input).await?;
    } else {
        api.update_user(token, &input.id, input).await?;
    }
    api.set_user_groups(token, &input.id, groups).await
}

async fn upload_file(
    api: &dyn WorkflowApi,
    token: &str,
    process_instance_id: &str,
    path: &Path,
) -> Result<(), ServiceError> {
    let content = tokio::fs::read(path)
        .await
        .map_err(|e| ServiceError::Transport {
            op: ApiOp::UploadDocument,
            detail: format!("{}: {e}", path.display()),
        })?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".into());
    api.upload_document(token, process_instance_id, &file_name, content)
        .await
}

async fn download_file(
    api: &dyn WorkflowApi,
    token: &str,
    doc: &Document,
    dir: &Path,
) -> Result<PathBuf, ServiceError> {
    let bytes = api.download_document(token, doc.id).await?;
    let name = Path::new(doc.display_name())
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| format!("document-{}", doc.id).into());
    let target = dir.join(name);
    let io_err = |e: std::io::Error| ServiceError::Transport {
        op: ApiOp::DownloadDocument,
        detail: e.to_string(),
    };
    tokio::fs::create_dir_all(dir).await.map_err(io_err)?;
    tokio::fs::write(&target, &bytes).await.map_err(io_err)?;
    Ok(target)
}

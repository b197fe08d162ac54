//! In-memory backing state: accounts, ideas and a small linear stand-in
//! for the process engine that creates the next task on completion.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use bytes::Bytes;
use chrono::{Local, Utc};
use innoflow_core::dashboard::{DashboardStats, PriorityStats};
use innoflow_core::dispatch::{
    KEY_BUSINESS_PLAN, KEY_BUSINESS_PLAN_FINAL, KEY_BUSINESS_PLAN_VALIDATION,
    KEY_MVP_PRESENTATION, KEY_POC_CONCLUSION, KEY_PRIORITIZATION, KEY_QUALIFICATION,
    KEY_TEAM_COMPOSITION,
};
use innoflow_core::document::Document;
use innoflow_core::idea::{Idea, IdeaInput, IdeaStatus, Priority};
use innoflow_core::task::{Developpement, FullIdeaDetails, Poc, Task, TaskDetails};
use innoflow_core::user::{CurrentUser, Group, TeamAssignment, User, UserInput, ADMIN_GROUP};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::auth::sha256_hex;

pub const GROUP_QUALIFICATION: &str = "CQ";
pub const GROUP_COMMITTEE: &str = "CI";
pub const GROUP_DEV: &str = "DEV";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    Forbidden(String),
    /// The engine refused the operation, e.g. a task already claimed.
    #[error("{0}")]
    Rejected(String),
    #[error("{0}")]
    Invalid(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

struct Account {
    user: User,
    password_hash: String,
    groups: BTreeSet<String>,
}

struct IdeaRecord {
    idea: Idea,
    process_instance_id: String,
    poc: Option<Poc>,
    developpement: Option<Developpement>,
}

struct TaskRecord {
    task: Task,
    candidate_group: String,
}

struct StoredDocument {
    document: Document,
    process_instance_id: String,
    content: Bytes,
}

/// A task completion as the engine received it.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRecord {
    pub task_id: String,
    pub task_definition_key: String,
    pub process_instance_id: String,
    pub completed_by: String,
    pub variables: Map<String, Value>,
}

#[derive(Default)]
pub struct Store {
    accounts: BTreeMap<String, Account>,
    groups: BTreeMap<String, Group>,
    sessions: HashMap<String, String>,
    ideas: BTreeMap<i64, IdeaRecord>,
    tasks: BTreeMap<String, TaskRecord>,
    documents: BTreeMap<i64, StoredDocument>,
    completions: Vec<CompletionRecord>,
    next_idea_id: i64,
    next_document_id: i64,
}

fn candidate_group_for(key: &str) -> &'static str {
    match key {
        KEY_QUALIFICATION | KEY_POC_CONCLUSION => GROUP_QUALIFICATION,
        KEY_BUSINESS_PLAN | KEY_BUSINESS_PLAN_FINAL | KEY_MVP_PRESENTATION => "EM",
        _ => GROUP_COMMITTEE,
    }
}

fn task_name_for(key: &str) -> &'static str {
    match key {
        KEY_PRIORITIZATION => "Prioritize idea",
        KEY_QUALIFICATION => "Validate, postpone or reject the idea",
        KEY_BUSINESS_PLAN => "Draft business plan and model",
        KEY_BUSINESS_PLAN_FINAL => "Finalize business model and plan",
        KEY_POC_CONCLUSION => "Enter POC conclusion",
        KEY_MVP_PRESENTATION => "Present MVP to pilot customers",
        KEY_TEAM_COMPOSITION => "Compose the team",
        KEY_BUSINESS_PLAN_VALIDATION => "Validate business plan",
        _ => "Review",
    }
}

fn str_var<'a>(vars: &'a Map<String, Value>, name: &str) -> Option<&'a str> {
    vars.get(name).and_then(Value::as_str)
}

impl Store {
    pub fn new() -> Self {
        Self {
            next_idea_id: 1,
            next_document_id: 1,
            ..Default::default()
        }
    }

    /// The workflow groups and a single administrator.
    pub fn bootstrap(admin_password: &str) -> Self {
        let mut store = Self::new();
        for (id, name) in [
            ("EM", "Emetteurs"),
            (GROUP_QUALIFICATION, "Qualification committee"),
            (GROUP_COMMITTEE, "Innovation committee"),
            (GROUP_DEV, "Developers"),
            (ADMIN_GROUP, "Administrators"),
        ] {
            store.add_group(id, name);
        }
        store.add_account("admin", "Ada", "Admin", admin_password, &[ADMIN_GROUP]);
        store
    }

    /// One account per role, passwords equal to usernames.
    pub fn with_demo_data() -> Self {
        let mut store = Self::bootstrap("admin");
        for (id, first, last, group) in [
            ("emma", "Emma", "Emetteur", "EM"),
            ("quentin", "Quentin", "Qualif", GROUP_QUALIFICATION),
            ("ines", "Ines", "Committee", GROUP_COMMITTEE),
            ("dev1", "Dana", "Dev", GROUP_DEV),
            ("dev2", "Dimitri", "Dev", GROUP_DEV),
        ] {
            store.add_account(id, first, last, id, &[group]);
        }
        store
    }

    /// A few ideas at different steps, for poking around locally.
    pub fn seed_demo_ideas(&mut self) -> StoreResult<()> {
        let samples = [
            ("Self-checkout kiosks", "Let customers scan and pay without queuing."),
            ("Drone delivery pilot", "Same-day delivery for small parcels in the city centre."),
            ("Paperless onboarding", "Digital signature for new client contracts."),
        ];
        for (titre, description) in samples {
            let input = IdeaInput {
                titre: titre.into(),
                description: description.into(),
            };
            self.create_idea(&input, "emma")?;
        }
        let pid = self
            .process_instance_of(1)
            .ok_or_else(|| StoreError::NotFound("idea 1".into()))?;
        self.prioritize(&pid, Priority::High, "ines")?;
        self.start_step(3, KEY_POC_CONCLUSION)?;
        Ok(())
    }

    // -- Accounts --

    pub fn add_group(&mut self, id: &str, name: &str) {
        self.groups.insert(
            id.to_string(),
            Group {
                id: id.to_string(),
                name: name.to_string(),
                kind: Some("WORKFLOW".to_string()),
            },
        );
    }

    pub fn add_account(&mut self, id: &str, first: &str, last: &str, password: &str, groups: &[&str]) {
        self.accounts.insert(
            id.to_string(),
            Account {
                user: User {
                    id: id.to_string(),
                    first_name: first.to_string(),
                    last_name: last.to_string(),
                    email: format!("{id}@innoflow.local"),
                },
                password_hash: sha256_hex(password),
                groups: groups.iter().map(|g| g.to_string()).collect(),
            },
        );
    }

    pub fn check_password(&self, username: &str, password: &str) -> bool {
        self.accounts
            .get(username)
            .is_some_and(|a| a.password_hash == sha256_hex(password))
    }

    pub fn open_session(&mut self, token: String, username: &str) {
        self.sessions.insert(token, username.to_string());
    }

    pub fn session_user(&self, token: &str) -> Option<CurrentUser> {
        let username = self.sessions.get(token)?;
        let account = self.accounts.get(username)?;
        Some(CurrentUser {
            username: username.clone(),
            groups: account.groups.iter().cloned().collect(),
        })
    }

    pub fn revoke_sessions(&mut self, username: &str) {
        self.sessions.retain(|_, u| u != username);
    }

    pub fn users(&self) -> Vec<User> {
        self.accounts.values().map(|a| a.user.clone()).collect()
    }

    pub fn users_in_group(&self, group: &str) -> Vec<User> {
        self.accounts
            .values()
            .filter(|a| a.groups.contains(group))
            .map(|a| a.user.clone())
            .collect()
    }

    pub fn groups(&self) -> Vec<Group> {
        self.groups.values().cloned().collect()
    }

    pub fn groups_of(&self, id: &str) -> StoreResult<Vec<Group>> {
        let account = self
            .accounts
            .get(id)
            .ok_or_else(|| StoreError::NotFound(format!("user {id}")))?;
        Ok(account
            .groups
            .iter()
            .filter_map(|g| self.groups.get(g).cloned())
            .collect())
    }

    pub fn create_user(&mut self, input: &UserInput) -> StoreResult<User> {
        if input.id.trim().is_empty() || input.password.is_empty() {
            return Err(StoreError::Invalid("id and password are required".into()));
        }
        if self.accounts.contains_key(&input.id) {
            return Err(StoreError::Rejected(format!("user {} already exists", input.id)));
        }
        self.add_account(&input.id, &input.first_name, &input.last_name, &input.password, &[]);
        let account = self
            .accounts
            .get_mut(&input.id)
            .ok_or_else(|| StoreError::NotFound(format!("user {}", input.id)))?;
        account.user.email = input.email.clone();
        Ok(account.user.clone())
    }

    pub fn update_user(&mut self, id: &str, input: &UserInput) -> StoreResult<()> {
        let account = self
            .accounts
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("user {id}")))?;
        account.user.first_name = input.first_name.clone();
        account.user.last_name = input.last_name.clone();
        account.user.email = input.email.clone();
        if !input.password.is_empty() {
            account.password_hash = sha256_hex(&input.password);
        }
        Ok(())
    }

    pub fn delete_user(&mut self, id: &str) -> StoreResult<()> {
        self.accounts
            .remove(id)
            .ok_or_else(|| StoreError::NotFound(format!("user {id}")))?;
        self.revoke_sessions(id);
        Ok(())
    }

    pub fn set_groups(&mut self, id: &str, group_ids: &[String]) -> StoreResult<()> {
        if let Some(unknown) = group_ids.iter().find(|g| !self.groups.contains_key(*g)) {
            return Err(StoreError::Invalid(format!("unknown group {unknown}")));
        }
        let account = self
            .accounts
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("user {id}")))?;
        account.groups = group_ids.iter().cloned().collect();
        Ok(())
    }

    // -- Ideas --

    pub fn ideas(&self) -> Vec<Idea> {
        self.ideas.values().map(|r| r.idea.clone()).collect()
    }

    pub fn idea(&self, id: i64) -> StoreResult<FullIdeaDetails> {
        let record = self
            .ideas
            .get(&id)
            .ok_or_else(|| StoreError::NotFound(format!("idea {id}")))?;
        Ok(FullIdeaDetails {
            idea: record.idea.clone(),
            poc: record.poc.clone(),
            developpement: record.developpement.clone(),
            documents: self.documents_for(&record.process_instance_id),
        })
    }

    pub fn process_instance_of(&self, idea_id: i64) -> Option<String> {
        self.ideas.get(&idea_id).map(|r| r.process_instance_id.clone())
    }

    /// Submit an idea and start its process at prioritization.
    pub fn create_idea(&mut self, input: &IdeaInput, created_by: &str) -> StoreResult<Idea> {
        if input.titre.trim().is_empty() {
            return Err(StoreError::Invalid("titre is required".into()));
        }
        let id = self.next_idea_id;
        self.next_idea_id += 1;
        let idea = Idea {
            id,
            titre: input.titre.clone(),
            description: input.description.clone(),
            statut: IdeaStatus::EnAttentePrequalification,
            priority: None,
            created_by: created_by.to_string(),
            date_creation: Some(Local::now().naive_local()),
            motif_rejet: None,
        };
        let process_instance_id = uuid::Uuid::new_v4().to_string();
        self.ideas.insert(
            id,
            IdeaRecord {
                idea: idea.clone(),
                process_instance_id: process_instance_id.clone(),
                poc: None,
                developpement: None,
            },
        );
        self.spawn_task(&process_instance_id, KEY_PRIORITIZATION);
        Ok(idea)
    }

    pub fn update_idea(&mut self, id: i64, input: &IdeaInput) -> StoreResult<Idea> {
        let record = self
            .ideas
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("idea {id}")))?;
        record.idea.titre = input.titre.clone();
        record.idea.description = input.description.clone();
        Ok(record.idea.clone())
    }

    pub fn delete_idea(&mut self, id: i64) -> StoreResult<()> {
        let record = self
            .ideas
            .remove(&id)
            .ok_or_else(|| StoreError::NotFound(format!("idea {id}")))?;
        let pid = record.process_instance_id;
        self.tasks.retain(|_, t| t.task.process_instance_id != pid);
        self.documents.retain(|_, d| d.process_instance_id != pid);
        Ok(())
    }

    fn record_for_process_mut(&mut self, pid: &str) -> StoreResult<&mut IdeaRecord> {
        self.ideas
            .values_mut()
            .find(|r| r.process_instance_id == pid)
            .ok_or_else(|| StoreError::NotFound(format!("process instance {pid}")))
    }

    fn idea_for_process(&self, pid: &str) -> Option<&Idea> {
        self.ideas
            .values()
            .find(|r| r.process_instance_id == pid)
            .map(|r| &r.idea)
    }

    /// Set the priority and complete the open prioritization task.
    pub fn prioritize(&mut self, pid: &str, priority: Priority, username: &str) -> StoreResult<Idea> {
        let task_id = self
            .tasks
            .values()
            .find(|t| {
                t.task.process_instance_id == pid && t.task.task_definition_key == KEY_PRIORITIZATION
            })
            .map(|t| t.task.id.clone())
            .ok_or_else(|| StoreError::NotFound(format!("prioritization task for {pid}")))?;
        self.record_for_process_mut(pid)?.idea.priority = Some(priority);
        let mut vars = Map::new();
        vars.insert("priority".into(), Value::String(priority.as_str().into()));
        self.finish_task(&task_id, username, vars)?;
        Ok(self.record_for_process_mut(pid)?.idea.clone())
    }

    pub fn dashboard(&self) -> DashboardStats {
        let count = |pred: &dyn Fn(&Idea) -> bool| {
            self.ideas.values().filter(|r| pred(&r.idea)).count() as i64
        };
        DashboardStats {
            total_ideas: self.ideas.len() as i64,
            ideas_in_progress: count(&|i| {
                matches!(
                    i.statut,
                    IdeaStatus::EnCoursDeQualification
                        | IdeaStatus::PocEnCours
                        | IdeaStatus::EnDeveloppement
                )
            }),
            ideas_realisee: count(&|i| i.statut == IdeaStatus::Realisee),
            ideas_ajournee: count(&|i| i.statut == IdeaStatus::Ajournee),
            priority_stats: PriorityStats {
                high: count(&|i| i.priority == Some(Priority::High)),
                medium: count(&|i| i.priority == Some(Priority::Medium)),
                low: count(&|i| i.priority == Some(Priority::Low)),
                unassigned: count(&|i| i.priority.is_none()),
            },
        }
    }

    // -- Tasks --

    pub fn spawn_task(&mut self, pid: &str, key: &str) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let task = Task {
            id: id.clone(),
            name: task_name_for(key).to_string(),
            task_definition_key: key.to_string(),
            assignee: None,
            process_instance_id: pid.to_string(),
            created: Some(Utc::now().format("%Y-%m-%dT%H:%M:%S%.3f%z").to_string()),
        };
        self.tasks.insert(
            id.clone(),
            TaskRecord {
                task,
                candidate_group: candidate_group_for(key).to_string(),
            },
        );
        id
    }

    fn details(&self, record: &TaskRecord) -> TaskDetails {
        let idea = self.idea_for_process(&record.task.process_instance_id).cloned();
        TaskDetails::new(record.task.clone(), idea)
    }

    /// Admins see every open task; everyone else sees their own plus
    /// unassigned tasks offered to one of their groups.
    pub fn tasks_for(
        &self,
        user: &CurrentUser,
        idea_name: Option<&str>,
        key: Option<&str>,
    ) -> Vec<TaskDetails> {
        let needle = idea_name.map(str::to_lowercase).filter(|n| !n.is_empty());
        self.tasks
            .values()
            .filter(|t| {
                user.is_admin()
                    || t.task.assignee.as_deref() == Some(user.username.as_str())
                    || (t.task.assignee.is_none() && user.in_group(&t.candidate_group))
            })
            .filter(|t| key.map_or(true, |k| k.is_empty() || t.task.task_definition_key == k))
            .map(|t| self.details(t))
            .filter(|d| match &needle {
                Some(n) => d
                    .idea
                    .as_ref()
                    .is_some_and(|i| i.titre.to_lowercase().contains(n)),
                None => true,
            })
            .collect()
    }

    pub fn task(&self, id: &str) -> StoreResult<TaskDetails> {
        self.tasks
            .get(id)
            .map(|t| self.details(t))
            .ok_or_else(|| StoreError::NotFound(format!("task {id}")))
    }

    pub fn claim(&mut self, id: &str, username: &str) -> StoreResult<()> {
        let record = self
            .tasks
            .get_mut(id)
            .ok_or_else(|| StoreError::Rejected(format!("Cannot find task {id}")))?;
        match record.task.assignee.as_deref() {
            Some(current) if current != username => Err(StoreError::Rejected(format!(
                "Task '{id}' is already claimed by someone else."
            ))),
            _ => {
                record.task.assignee = Some(username.to_string());
                Ok(())
            }
        }
    }

    pub fn unclaim(&mut self, id: &str, username: &str) -> StoreResult<()> {
        match self.tasks.get_mut(id) {
            Some(record) if record.task.assignee.as_deref() == Some(username) => {
                record.task.assignee = None;
                Ok(())
            }
            _ => Err(StoreError::Forbidden(
                "User is not the assignee of this task.".into(),
            )),
        }
    }

    pub fn complete(
        &mut self,
        id: &str,
        username: &str,
        variables: Map<String, Value>,
    ) -> StoreResult<()> {
        match self.tasks.get(id) {
            Some(record) if record.task.assignee.as_deref() == Some(username) => {}
            _ => {
                return Err(StoreError::Forbidden(
                    "User is not authorized to complete this task.".into(),
                ))
            }
        }
        if let Some(raw) = str_var(&variables, "dateEcheance") {
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
                .map_err(|_| StoreError::Invalid(format!("bad dateEcheance {raw}")))?;
        }
        self.finish_task(id, username, variables)
    }

    fn finish_task(
        &mut self,
        id: &str,
        username: &str,
        variables: Map<String, Value>,
    ) -> StoreResult<()> {
        let record = self
            .tasks
            .remove(id)
            .ok_or_else(|| StoreError::NotFound(format!("task {id}")))?;
        let key = record.task.task_definition_key.clone();
        let pid = record.task.process_instance_id.clone();
        self.completions.push(CompletionRecord {
            task_id: id.to_string(),
            task_definition_key: key.clone(),
            process_instance_id: pid.clone(),
            completed_by: username.to_string(),
            variables: variables.clone(),
        });
        if let Some(next) = self.advance(&pid, &key, &variables)? {
            self.spawn_task(&pid, next);
        }
        Ok(())
    }

    /// Apply a completed step to the idea and pick the next task, if any.
    fn advance(
        &mut self,
        pid: &str,
        key: &str,
        vars: &Map<String, Value>,
    ) -> StoreResult<Option<&'static str>> {
        let Ok(record) = self.record_for_process_mut(pid) else {
            return Ok(None);
        };
        let idea = &mut record.idea;
        let next = match key {
            KEY_PRIORITIZATION => {
                idea.statut = IdeaStatus::EnAttenteDeQualification;
                Some(KEY_QUALIFICATION)
            }
            KEY_QUALIFICATION => match str_var(vars, "resultatQualification") {
                Some("VALIDEE") => {
                    idea.statut = IdeaStatus::Validee;
                    Some(KEY_BUSINESS_PLAN)
                }
                Some("AJOURNEE") => {
                    idea.statut = IdeaStatus::Ajournee;
                    None
                }
                Some("REJETEE") => {
                    idea.statut = IdeaStatus::Rejetee;
                    idea.motif_rejet = str_var(vars, "motifRejet").map(String::from);
                    None
                }
                other => {
                    return Err(StoreError::Invalid(format!(
                        "unexpected resultatQualification {other:?}"
                    )))
                }
            },
            KEY_BUSINESS_PLAN => {
                idea.statut = IdeaStatus::PocEnCours;
                record.poc = Some(Poc {
                    date_debut: Some(Local::now().date_naive()),
                    ..Default::default()
                });
                Some(KEY_POC_CONCLUSION)
            }
            KEY_POC_CONCLUSION => {
                let poc = record.poc.get_or_insert_with(Poc::default);
                poc.conclusion = str_var(vars, "conclusion").map(String::from);
                poc.decision = str_var(vars, "avis").map(String::from);
                poc.date_fin = Some(Local::now().date_naive());
                if str_var(vars, "avis") == Some("favorable") {
                    record.idea.statut = IdeaStatus::PocTermineFavorable;
                    Some(KEY_BUSINESS_PLAN_FINAL)
                } else {
                    record.idea.statut = IdeaStatus::PocTermineDefavorable;
                    None
                }
            }
            KEY_BUSINESS_PLAN_FINAL => Some(KEY_BUSINESS_PLAN_VALIDATION),
            KEY_BUSINESS_PLAN_VALIDATION => {
                idea.statut = IdeaStatus::EnDeveloppement;
                record.developpement = Some(Developpement {
                    date_lancement: Some(Local::now().date_naive()),
                    statut_dev: Some("EN_COURS".into()),
                    ..Default::default()
                });
                Some(KEY_TEAM_COMPOSITION)
            }
            KEY_TEAM_COMPOSITION => Some(KEY_MVP_PRESENTATION),
            KEY_MVP_PRESENTATION => {
                let dev = record.developpement.get_or_insert_with(Developpement::default);
                if str_var(vars, "conclusion") == Some("ok") {
                    dev.statut_dev = Some("TERMINE".into());
                    record.idea.statut = IdeaStatus::Realisee;
                } else {
                    dev.avis_negatif = str_var(vars, "avisNegatif").map(String::from);
                    record.idea.statut = IdeaStatus::Archivee;
                }
                None
            }
            _ => None,
        };
        Ok(next)
    }

    pub fn completions(&self) -> &[CompletionRecord] {
        &self.completions
    }

    // -- Development --

    pub fn set_team(&mut self, pid: &str, team: &TeamAssignment) -> StoreResult<()> {
        let record = self.record_for_process_mut(pid)?;
        let dev = record.developpement.as_mut().ok_or_else(|| {
            StoreError::Rejected(format!("Developpement not found for process {pid}"))
        })?;
        dev.chef_de_projet = Some(team.chef_de_projet.clone());
        dev.membres_equipe = Some(team.membres_equipe.join(","));
        Ok(())
    }

    /// Jump an idea straight to a workflow step, creating the phase
    /// records that step expects. Returns the new task id.
    pub fn start_step(&mut self, idea_id: i64, key: &str) -> StoreResult<String> {
        let pid = self
            .process_instance_of(idea_id)
            .ok_or_else(|| StoreError::NotFound(format!("idea {idea_id}")))?;
        self.tasks.retain(|_, t| t.task.process_instance_id != pid);
        let record = self.record_for_process_mut(&pid)?;
        match key {
            KEY_POC_CONCLUSION => {
                record.idea.statut = IdeaStatus::PocEnCours;
                record.poc.get_or_insert_with(Poc::default);
            }
            KEY_TEAM_COMPOSITION | KEY_MVP_PRESENTATION => {
                record.idea.statut = IdeaStatus::EnDeveloppement;
                record.poc.get_or_insert_with(Poc::default);
                record.developpement.get_or_insert_with(Developpement::default);
            }
            _ => {}
        }
        Ok(self.spawn_task(&pid, key))
    }

    // -- Documents --

    pub fn documents_for(&self, pid: &str) -> Vec<Document> {
        self.documents
            .values()
            .filter(|d| d.process_instance_id == pid)
            .map(|d| d.document.clone())
            .collect()
    }

    pub fn add_document(
        &mut self,
        pid: &str,
        file_name: &str,
        file_type: Option<String>,
        content: Bytes,
    ) -> StoreResult<Document> {
        if self.idea_for_process(pid).is_none() {
            return Err(StoreError::NotFound(format!("process instance {pid}")));
        }
        let id = self.next_document_id;
        self.next_document_id += 1;
        let document = Document {
            id,
            file_name: format!("{}_{file_name}", uuid::Uuid::new_v4().simple()),
            file_type,
            upload_date: Some(Local::now().naive_local()),
        };
        self.documents.insert(
            id,
            StoredDocument {
                document: document.clone(),
                process_instance_id: pid.to_string(),
                content,
            },
        );
        Ok(document)
    }

    pub fn document_content(&self, id: i64) -> StoreResult<(Document, Bytes)> {
        self.documents
            .get(&id)
            .map(|d| (d.document.clone(), d.content.clone()))
            .ok_or_else(|| StoreError::NotFound(format!("document {id}")))
    }

    pub fn delete_document(&mut self, id: i64) -> StoreResult<()> {
        self.documents
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("document {id}")))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn user(name: &str, groups: &[&str]) -> CurrentUser {
        CurrentUser {
            username: name.into(),
            groups: groups.iter().map(|g| g.to_string()).collect(),
        }
    }

    fn vars(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    fn idea_input(title: &str) -> IdeaInput {
        IdeaInput {
            titre: title.into(),
            description: "d".into(),
        }
    }

    #[test]
    fn new_idea_waits_for_prioritization() {
        let mut store = Store::with_demo_data();
        let idea = store.create_idea(&idea_input("Kiosks"), "emma").unwrap();
        assert_eq!(idea.statut, IdeaStatus::EnAttentePrequalification);

        let committee = user("ines", &[GROUP_COMMITTEE]);
        let tasks = store.tasks_for(&committee, None, None);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].task.task_definition_key, KEY_PRIORITIZATION);
        assert_eq!(tasks[0].idea_title(), "Kiosks");

        assert!(store.tasks_for(&user("quentin", &[GROUP_QUALIFICATION]), None, None).is_empty());
    }

    #[test]
    fn second_claim_is_rejected() {
        let mut store = Store::with_demo_data();
        store.create_idea(&idea_input("Kiosks"), "emma").unwrap();
        let id = store.tasks_for(&user("admin", &[ADMIN_GROUP]), None, None)[0]
            .task
            .id
            .clone();
        store.claim(&id, "ines").unwrap();
        assert!(matches!(store.claim(&id, "admin"), Err(StoreError::Rejected(_))));
        assert!(matches!(store.unclaim(&id, "admin"), Err(StoreError::Forbidden(_))));
        store.unclaim(&id, "ines").unwrap();
        store.claim(&id, "admin").unwrap();
    }

    #[test]
    fn rejection_records_reason_and_ends_process() {
        let mut store = Store::with_demo_data();
        let idea = store.create_idea(&idea_input("Kiosks"), "emma").unwrap();
        let pid = store.process_instance_of(idea.id).unwrap();
        let task = store.start_step(idea.id, KEY_QUALIFICATION).unwrap();
        store.claim(&task, "quentin").unwrap();
        store
            .complete(
                &task,
                "quentin",
                vars(json!({"resultatQualification": "REJETEE", "motifRejet": "Budget"})),
            )
            .unwrap();
        let full = store.idea(idea.id).unwrap();
        assert_eq!(full.idea.statut, IdeaStatus::Rejetee);
        assert_eq!(full.idea.motif_rejet.as_deref(), Some("Budget"));
        assert!(store.tasks_for(&user("admin", &[ADMIN_GROUP]), None, None).is_empty());
        assert_eq!(store.completions()[0].process_instance_id, pid);
    }

    #[test]
    fn complete_requires_assignee() {
        let mut store = Store::with_demo_data();
        let idea = store.create_idea(&idea_input("Kiosks"), "emma").unwrap();
        let task = store.start_step(idea.id, "Activity_other").unwrap();
        assert!(matches!(
            store.complete(&task, "quentin", Map::new()),
            Err(StoreError::Forbidden(_))
        ));
    }

    #[test]
    fn name_filter_is_case_insensitive() {
        let mut store = Store::with_demo_data();
        store.create_idea(&idea_input("Self-checkout Kiosks"), "emma").unwrap();
        store.create_idea(&idea_input("Drone delivery"), "emma").unwrap();
        let admin = user("admin", &[ADMIN_GROUP]);
        assert_eq!(store.tasks_for(&admin, Some("KIOSK"), None).len(), 1);
        assert_eq!(store.tasks_for(&admin, None, Some(KEY_PRIORITIZATION)).len(), 2);
        assert!(store.tasks_for(&admin, None, Some(KEY_QUALIFICATION)).is_empty());
    }

    #[test]
    fn dashboard_counts() {
        let mut store = Store::with_demo_data();
        let a = store.create_idea(&idea_input("A"), "emma").unwrap();
        store.create_idea(&idea_input("B"), "emma").unwrap();
        let pid = store.process_instance_of(a.id).unwrap();
        store.prioritize(&pid, Priority::High, "ines").unwrap();
        let stats = store.dashboard();
        assert_eq!(stats.total_ideas, 2);
        assert_eq!(stats.priority_stats.high, 1);
        assert_eq!(stats.priority_stats.unassigned, 1);
    }

    #[test]
    fn demo_ideas_cover_several_steps() {
        let mut store = Store::with_demo_data();
        store.seed_demo_ideas().unwrap();
        let statuses: Vec<IdeaStatus> = store.ideas().iter().map(|i| i.statut).collect();
        assert_eq!(
            statuses,
            vec![
                IdeaStatus::EnAttenteDeQualification,
                IdeaStatus::EnAttentePrequalification,
                IdeaStatus::PocEnCours,
            ]
        );
        assert!(store.check_password("quentin", "quentin"));
        assert!(!store.check_password("quentin", "admin"));
    }
}

//! HttpService against the in-memory backend.
//!
//! Each test spawns the fixture on 127.0.0.1:0 seeded with the demo
//! accounts (password = username) and drives it through the client.

use chrono::{Duration, Local};
use innoflow_core::dispatch::{
    DispatchTable, KEY_MVP_PRESENTATION, KEY_QUALIFICATION, KEY_TEAM_COMPOSITION,
};
use innoflow_core::forms::{Clock, Field, TaskForm, TeamCompositionForm};
use innoflow_core::idea::{IdeaFilter, IdeaInput, IdeaStatus, Priority};
use innoflow_core::task::{TaskPartition, TaskQuery};
use innoflow_core::user::UserInput;
use innoflow_server::test_helpers::{spawn_test_server, TestServer};
use innoflow_service::{execute_plan, ApiOp, HttpService, ServiceError, Session, WorkflowApi};

async fn login(svc: &HttpService, who: &str) -> String {
    svc.login(who, who).await.unwrap()
}

fn idea(title: &str) -> IdeaInput {
    IdeaInput {
        titre: title.into(),
        description: format!("{title} description"),
    }
}

/// Submit an idea as emma and move it straight to `key`.
async fn idea_at_step(server: &TestServer, svc: &HttpService, title: &str, key: &str) -> i64 {
    let emma = login(svc, "emma").await;
    let created = svc.create_idea(&emma, &idea(title)).await.unwrap();
    server.state.store().start_step(created.id, key).unwrap();
    created.id
}

#[tokio::test]
async fn login_and_current_user() {
    let server = spawn_test_server().await;
    let svc = HttpService::new(&server.base_url);

    let session = Session::establish(&svc, "quentin", "quentin").await.unwrap();
    assert_eq!(session.user.username, "quentin");
    assert_eq!(session.user.groups, vec!["CQ".to_string()]);

    let err = svc.login("quentin", "wrong").await.unwrap_err();
    assert!(matches!(err, ServiceError::Failed(ApiOp::Login)));
    assert!(!err.is_unauthorized());
}

#[tokio::test]
async fn stale_token_is_unauthorized() {
    let server = spawn_test_server().await;
    let svc = HttpService::new(&server.base_url);

    let err = svc
        .list_ideas("inf_not-a-session", &IdeaFilter::default())
        .await
        .unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(err.op(), ApiOp::ListIdeas);

    let err = Session::resume(&svc, "inf_not-a-session".into())
        .await
        .unwrap_err();
    assert!(err.is_unauthorized());
}

#[tokio::test]
async fn idea_crud_and_local_filtering() {
    let server = spawn_test_server().await;
    let svc = HttpService::new(&server.base_url);
    let emma = login(&svc, "emma").await;

    let a = svc.create_idea(&emma, &idea("Kiosks")).await.unwrap();
    assert_eq!(a.statut, IdeaStatus::EnAttentePrequalification);
    assert_eq!(a.created_by, "emma");
    let b = svc.create_idea(&emma, &idea("Drones")).await.unwrap();

    let updated = svc
        .update_idea(&emma, a.id, &idea("Self-checkout kiosks"))
        .await
        .unwrap();
    assert_eq!(updated.titre, "Self-checkout kiosks");

    let pid = server.state.store().process_instance_of(b.id).unwrap();
    let ines = login(&svc, "ines").await;
    svc.prioritize_idea(&ines, &pid, Priority::High).await.unwrap();

    let filter = IdeaFilter {
        status: None,
        priority: Some(Priority::High),
    };
    let high = svc.list_ideas(&emma, &filter).await.unwrap();
    assert_eq!(high.len(), 1);
    assert_eq!(high[0].id, b.id);
    assert_eq!(high[0].statut, IdeaStatus::EnAttenteDeQualification);

    svc.delete_idea(&emma, a.id).await.unwrap();
    let all = svc.list_ideas(&emma, &IdeaFilter::default()).await.unwrap();
    assert_eq!(all.len(), 1);

    let err = svc.idea_details(&emma, a.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::Failed(ApiOp::IdeaDetails)));
}

#[tokio::test]
async fn only_submitters_manage_ideas() {
    let server = spawn_test_server().await;
    let svc = HttpService::new(&server.base_url);
    let quentin = login(&svc, "quentin").await;

    let err = svc.create_idea(&quentin, &idea("Nope")).await.unwrap_err();
    assert!(matches!(err, ServiceError::Failed(ApiOp::CreateIdea)));
    assert_eq!(err.to_string(), "Failed to submit idea");
}

#[tokio::test]
async fn task_visibility_follows_candidate_groups() {
    let server = spawn_test_server().await;
    let svc = HttpService::new(&server.base_url);
    idea_at_step(&server, &svc, "Kiosks", KEY_QUALIFICATION).await;
    idea_at_step(&server, &svc, "Drones", KEY_QUALIFICATION).await;

    let emma = login(&svc, "emma").await;
    assert!(svc.list_tasks(&emma, &TaskQuery::default()).await.unwrap().is_empty());

    let quentin = login(&svc, "quentin").await;
    let tasks = svc.list_tasks(&quentin, &TaskQuery::default()).await.unwrap();
    assert_eq!(tasks.len(), 2);
    assert!(tasks.iter().all(|t| t.idea.is_some()));

    let query = TaskQuery {
        idea_name: "kiosk".into(),
        task_definition_key: Some(KEY_QUALIFICATION.into()),
    };
    let filtered = svc.list_tasks(&quentin, &query).await.unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].idea_title(), "Kiosks");

    let task_id = filtered[0].task.id.clone();
    svc.claim_task(&quentin, &task_id).await.unwrap();
    let split = TaskPartition::split(svc.list_tasks(&quentin, &TaskQuery::default()).await.unwrap());
    assert_eq!(split.assigned.len(), 1);
    assert_eq!(split.claimable.len(), 1);

    let details = svc.task_details(&quentin, &task_id).await.unwrap();
    assert_eq!(details.task.assignee.as_deref(), Some("quentin"));

    svc.unclaim_task(&quentin, &task_id).await.unwrap();
    let split = TaskPartition::split(svc.list_tasks(&quentin, &TaskQuery::default()).await.unwrap());
    assert_eq!(split.claimable.len(), 2);
}

#[tokio::test]
async fn second_claim_loses_the_race() {
    let server = spawn_test_server().await;
    let svc = HttpService::new(&server.base_url);
    server
        .state
        .store()
        .add_account("quinn", "Quinn", "Qualif", "quinn", &["CQ"]);
    idea_at_step(&server, &svc, "Kiosks", KEY_QUALIFICATION).await;

    let quentin = login(&svc, "quentin").await;
    let quinn = login(&svc, "quinn").await;
    let task_id = svc.list_tasks(&quentin, &TaskQuery::default()).await.unwrap()[0]
        .task
        .id
        .clone();

    let (first, second) = tokio::join!(
        svc.claim_task(&quentin, &task_id),
        svc.claim_task(&quinn, &task_id)
    );
    assert!(first.is_ok() != second.is_ok(), "exactly one claim wins");
    let loser = if first.is_ok() { &quinn } else { &quentin };
    let err = first.err().or(second.err()).unwrap();
    assert!(matches!(err, ServiceError::Failed(ApiOp::ClaimTask)));

    let err = svc.unclaim_task(loser, &task_id).await.unwrap_err();
    assert!(matches!(err, ServiceError::Failed(ApiOp::UnclaimTask)));
}

#[tokio::test]
async fn rejection_sends_reason_and_closes_the_idea() {
    let server = spawn_test_server().await;
    let svc = HttpService::new(&server.base_url);
    let id = idea_at_step(&server, &svc, "Kiosks", KEY_QUALIFICATION).await;
    let quentin = login(&svc, "quentin").await;

    let entry = svc.list_tasks(&quentin, &TaskQuery::default()).await.unwrap().remove(0);
    svc.claim_task(&quentin, &entry.task.id).await.unwrap();

    let table = DispatchTable::default();
    let mut form = TaskForm::for_kind(table.resolve(&entry.task.task_definition_key));
    form.cycle(Field::Decision, false);
    for c in "Out of scope".chars() {
        form.input_char(Field::RejectionReason, c);
    }
    let calls = form.plan(&entry.task, &Clock::system()).unwrap();
    execute_plan(&svc, &quentin, &calls).await.unwrap();

    let completion = server.state.store().completions()[0].clone();
    assert_eq!(completion.completed_by, "quentin");
    assert_eq!(completion.variables["resultatQualification"], "REJETEE");
    assert_eq!(completion.variables["motifRejet"], "Out of scope");

    let full = svc.idea_details(&quentin, id).await.unwrap();
    assert_eq!(full.idea.statut, IdeaStatus::Rejetee);
    assert_eq!(full.idea.motif_rejet.as_deref(), Some("Out of scope"));
    assert!(svc.list_tasks(&quentin, &TaskQuery::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn postpone_sends_utc_deadline() {
    let server = spawn_test_server().await;
    let svc = HttpService::new(&server.base_url);
    let id = idea_at_step(&server, &svc, "Kiosks", KEY_QUALIFICATION).await;
    let quentin = login(&svc, "quentin").await;
    let entry = svc.list_tasks(&quentin, &TaskQuery::default()).await.unwrap().remove(0);
    svc.claim_task(&quentin, &entry.task.id).await.unwrap();

    let mut form = TaskForm::for_kind(DispatchTable::default().resolve(KEY_QUALIFICATION));
    form.cycle(Field::Decision, true);
    let deadline = (Local::now() + Duration::days(3)).format("%Y-%m-%d %H:%M").to_string();
    for c in deadline.chars() {
        form.input_char(Field::Deadline, c);
    }
    let calls = form.plan(&entry.task, &Clock::system()).unwrap();
    execute_plan(&svc, &quentin, &calls).await.unwrap();

    let completion = server.state.store().completions()[0].clone();
    assert_eq!(completion.variables["resultatQualification"], "AJOURNEE");
    assert_eq!(
        completion.variables["dateEcheance"].as_str().map(str::len),
        Some("2025-01-01T00:00:00".len())
    );
    assert_eq!(
        svc.idea_details(&quentin, id).await.unwrap().idea.statut,
        IdeaStatus::Ajournee
    );
}

#[tokio::test]
async fn team_plan_assigns_then_completes() {
    let server = spawn_test_server().await;
    let svc = HttpService::new(&server.base_url);
    let id = idea_at_step(&server, &svc, "Kiosks", KEY_TEAM_COMPOSITION).await;
    let ines = login(&svc, "ines").await;

    let entry = svc.list_tasks(&ines, &TaskQuery::default()).await.unwrap().remove(0);
    svc.claim_task(&ines, &entry.task.id).await.unwrap();

    let devs = svc.dev_users(&ines).await.unwrap();
    let ids: Vec<&str> = devs.iter().map(|u| u.id.as_str()).collect();
    assert_eq!(ids, vec!["dev1", "dev2"]);

    let mut form = TaskForm::TeamComposition(TeamCompositionForm::with_candidates(devs));
    form.cycle(Field::ProjectLead, true);
    form.cycle(Field::Members, true);
    form.toggle(Field::Members);
    let calls = form.plan(&entry.task, &Clock::system()).unwrap();
    assert_eq!(calls.len(), 2);
    execute_plan(&svc, &ines, &calls).await.unwrap();

    let full = svc.idea_details(&ines, id).await.unwrap();
    let dev = full.developpement.unwrap();
    assert_eq!(dev.chef_de_projet.as_deref(), Some("dev1"));
    assert_eq!(dev.members(), vec!["dev2"]);

    let emma = login(&svc, "emma").await;
    let next = svc.list_tasks(&emma, &TaskQuery::default()).await.unwrap();
    assert_eq!(next.len(), 1);
    assert_eq!(next[0].task.task_definition_key, KEY_MVP_PRESENTATION);
}

#[tokio::test]
async fn failed_completion_after_team_assignment_is_partial() {
    let server = spawn_test_server().await;
    let svc = HttpService::new(&server.base_url);
    let id = idea_at_step(&server, &svc, "Kiosks", KEY_TEAM_COMPOSITION).await;
    let ines = login(&svc, "ines").await;
    let entry = svc.list_tasks(&ines, &TaskQuery::default()).await.unwrap().remove(0);

    // Not claimed, so the completion step is refused.
    let mut form = TaskForm::TeamComposition(TeamCompositionForm::with_candidates(
        svc.dev_users(&ines).await.unwrap(),
    ));
    form.cycle(Field::ProjectLead, true);
    let calls = form.plan(&entry.task, &Clock::system()).unwrap();
    let err = execute_plan(&svc, &ines, &calls).await.unwrap_err();
    assert!(err.is_partial());
    assert_eq!((err.completed, err.total), (1, 2));
    assert_eq!(err.source.op(), ApiOp::CompleteTask);
    assert!(err.user_message().starts_with("Failed to complete task"));

    let full = svc.idea_details(&ines, id).await.unwrap();
    assert_eq!(
        full.developpement.unwrap().chef_de_projet.as_deref(),
        Some("dev1")
    );

    svc.claim_task(&ines, &entry.task.id).await.unwrap();
    execute_plan(&svc, &ines, &calls).await.unwrap();
}

#[tokio::test]
async fn document_lifecycle() {
    let server = spawn_test_server().await;
    let svc = HttpService::new(&server.base_url);
    let emma = login(&svc, "emma").await;
    let created = svc.create_idea(&emma, &idea("Kiosks")).await.unwrap();
    let pid = server.state.store().process_instance_of(created.id).unwrap();

    svc.upload_document(&emma, &pid, "plan.pdf", b"%PDF-1.4 body".to_vec())
        .await
        .unwrap();
    let docs = svc.list_documents(&emma, &pid).await.unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].display_name(), "plan.pdf");
    assert_ne!(docs[0].file_name, "plan.pdf");

    let bytes = svc.download_document(&emma, docs[0].id).await.unwrap();
    assert_eq!(&bytes[..], b"%PDF-1.4 body");

    let full = svc.idea_details(&emma, created.id).await.unwrap();
    assert_eq!(full.documents.len(), 1);

    svc.delete_document(&emma, docs[0].id).await.unwrap();
    assert!(svc.list_documents(&emma, &pid).await.unwrap().is_empty());
    let err = svc.download_document(&emma, docs[0].id).await.unwrap_err();
    assert!(matches!(err, ServiceError::Failed(ApiOp::DownloadDocument)));
}

#[tokio::test]
async fn dashboard_counts_ideas() {
    let server = spawn_test_server().await;
    let svc = HttpService::new(&server.base_url);
    idea_at_step(&server, &svc, "Kiosks", KEY_TEAM_COMPOSITION).await;
    let emma = login(&svc, "emma").await;
    svc.create_idea(&emma, &idea("Drones")).await.unwrap();

    let stats = svc.dashboard_stats(&emma).await.unwrap();
    assert_eq!(stats.total_ideas, 2);
    assert_eq!(stats.ideas_in_progress, 1);
    assert_eq!(stats.priority_stats.unassigned, 2);
}

#[tokio::test]
async fn user_administration() {
    let server = spawn_test_server().await;
    let svc = HttpService::new(&server.base_url);
    let admin = login(&svc, "admin").await;

    let input = UserInput {
        id: "jdoe".into(),
        first_name: "John".into(),
        last_name: "Doe".into(),
        email: "jdoe@example.com".into(),
        password: "secret".into(),
    };
    let user = svc.create_user(&admin, &input).await.unwrap();
    assert_eq!(user.id, "jdoe");
    svc.set_user_groups(&admin, "jdoe", &["EM".into(), "DEV".into()])
        .await
        .unwrap();
    let groups: Vec<String> = svc
        .user_groups(&admin, "jdoe")
        .await
        .unwrap()
        .into_iter()
        .map(|g| g.id)
        .collect();
    assert_eq!(groups, vec!["DEV".to_string(), "EM".to_string()]);
    assert_eq!(svc.list_groups(&admin).await.unwrap().len(), 5);

    let update = UserInput {
        last_name: "Dough".into(),
        password: String::new(),
        ..input.clone()
    };
    svc.update_user(&admin, "jdoe", &update).await.unwrap();
    let jdoe = svc.login("jdoe", "secret").await.unwrap();
    let me = svc.current_user(&jdoe).await.unwrap();
    assert!(me.can_manage_ideas());
    assert!(!me.can_manage_users());

    let err = svc.list_users(&jdoe).await.unwrap_err();
    assert_eq!(err.to_string(), "Could not fetch user data.");

    svc.delete_user(&admin, "jdoe").await.unwrap();
    assert!(svc.current_user(&jdoe).await.unwrap_err().is_unauthorized());
    assert!(!svc
        .list_users(&admin)
        .await
        .unwrap()
        .iter()
        .any(|u| u.id == "jdoe"));
}

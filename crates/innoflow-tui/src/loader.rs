//! Runs backend calls off the UI thread and hands the results back.
//!
//! The UI thread never blocks on the network: every request is spawned on
//! a small tokio runtime owned by the [`Loader`] and its result comes back
//! as an [`Envelope`] tagged with the [`Ticket`] it was issued under. The
//! app drains envelopes between frames and drops those whose ticket is no
//! longer current.

use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use anyhow::{Context, Result};
use innoflow_core::dashboard::DashboardStats;
use innoflow_core::document::Document;
use innoflow_core::idea::Idea;
use innoflow_core::modal::ModalContext;
use innoflow_core::task::{FullIdeaDetails, TaskDetails};
use innoflow_core::user::{Group, User};
use innoflow_service::{PlanError, ServiceError, Session, WorkflowApi};
use tokio::runtime::Runtime;

/// Request slots. Each has its own freshness guard in the app.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Session,
    Dashboard,
    Ideas,
    IdeaDetails,
    Tasks,
    Workspace,
    Users,
    UserEditor,
    /// Writes. They share one generation per session instead of
    /// superseding each other.
    Mutation,
}

impl Slot {
    pub const COUNT: usize = 9;

    pub fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub slot: Slot,
    pub generation: u64,
}

/// Result of one spawned request.
#[derive(Debug)]
pub enum Outcome {
    LoggedIn(Result<Session, ServiceError>),
    Restored(Result<Session, ServiceError>),
    Dashboard(Result<DashboardStats, ServiceError>),
    Ideas(Result<Vec<Idea>, ServiceError>),
    IdeaDetails(Result<FullIdeaDetails, ServiceError>),
    Tasks(Result<Vec<TaskDetails>, ServiceError>),
    TaskDetails(TaskDetails, Result<TaskDetails, ServiceError>),
    ModalContext(Result<ModalContext, ServiceError>),
    WorkspaceDocuments(Result<Vec<Document>, ServiceError>),
    Plan {
        task_id: String,
        result: Result<(), PlanError>,
    },
    IdeaSaved(Result<Idea, ServiceError>),
    IdeaDeleted(Result<(), ServiceError>),
    Claimed(Result<(), ServiceError>),
    Unclaimed(Result<(), ServiceError>),
    Users(Result<(Vec<User>, Vec<Group>), ServiceError>),
    UserGroups {
        user_id: String,
        result: Result<Vec<Group>, ServiceError>,
    },
    UserSaved(Result<(), ServiceError>),
    UserDeleted(Result<(), ServiceError>),
    Uploaded(Result<(), ServiceError>),
    Downloaded(Result<PathBuf, ServiceError>),
    DocumentDeleted(Result<(), ServiceError>),
}

#[derive(Debug)]
pub struct Envelope {
    pub ticket: Ticket,
    pub outcome: Outcome,
}

pub struct Loader {
    runtime: Runtime,
    api: Arc<dyn WorkflowApi>,
    tx: Sender<Envelope>,
    rx: Receiver<Envelope>,
    in_flight: Arc<AtomicUsize>,
}

impl Loader {
    pub fn new(api: Arc<dyn WorkflowApi>) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("innoflow-loader")
            .enable_all()
            .build()
            .context("failed to start the request runtime")?;
        let (tx, rx) = mpsc::channel();
        Ok(Self {
            runtime,
            api,
            tx,
            rx,
            in_flight: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn api(&self) -> Arc<dyn WorkflowApi> {
        Arc::clone(&self.api)
    }

    pub fn spawn<F>(&self, ticket: Ticket, fut: F)
    where
        F: Future<Output = Outcome> + Send + 'static,
    {
        tracing::debug!(slot = ?ticket.slot, generation = ticket.generation, "request issued");
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let tx = self.tx.clone();
        let in_flight = Arc::clone(&self.in_flight);
        self.runtime.spawn(async move {
            let outcome = fut.await;
            // The receiver only goes away with the app itself.
            let _ = tx.send(Envelope { ticket, outcome });
            in_flight.fetch_sub(1, Ordering::SeqCst);
        });
    }

    /// Everything that has arrived so far, in arrival order.
    pub fn drain(&self) -> Vec<Envelope> {
        self.rx.try_iter().collect()
    }

    /// No spawned request is still running. Results may still be queued.
    pub fn is_idle(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) == 0
    }
}

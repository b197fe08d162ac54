//! Runs the backend calls a submitted task form produced.

use innoflow_core::forms::CompletionCall;
use thiserror::Error;

use crate::{ServiceError, WorkflowApi};

/// A plan stopped part-way. Earlier calls are not rolled back.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct PlanError {
    /// Calls that succeeded before the failing one.
    pub completed: usize,
    pub total: usize,
    #[source]
    pub source: ServiceError,
}

impl PlanError {
    /// Some writes already landed on the backend.
    pub fn is_partial(&self) -> bool {
        self.completed > 0
    }

    pub fn user_message(&self) -> String {
        if self.is_partial() {
            format!(
                "{} ({} of {} steps were saved; submitting again is safe)",
                self.source, self.completed, self.total
            )
        } else {
            self.source.to_string()
        }
    }
}

/// Execute `calls` strictly in order, stopping at the first failure.
///
/// There is no atomicity across calls. A team assignment followed by a
/// failed completion leaves the team saved and the task open; re-running
/// the same plan re-sends the assignment, which overwrites rather than
/// appends, and then retries the completion.
pub async fn execute_plan(
    api: &dyn WorkflowApi,
    token: &str,
    calls: &[CompletionCall],
) -> Result<(), PlanError> {
    let total = calls.len();
    for (completed, call) in calls.iter().enumerate() {
        let result = match call {
            CompletionCall::SetPriority {
                process_instance_id,
                priority,
            } => api.prioritize_idea(token, process_instance_id, *priority).await,
            CompletionCall::AssignTeam {
                process_instance_id,
                team,
            } => api.assign_team(token, process_instance_id, team).await,
            CompletionCall::CompleteTask { task_id, variables } => {
                api.complete_task(token, task_id, variables).await
            }
        };
        if let Err(source) = result {
            tracing::warn!(step = call.describe(), completed, total, "completion plan failed");
            return Err(PlanError {
                completed,
                total,
                source,
            });
        }
    }
    Ok(())
}

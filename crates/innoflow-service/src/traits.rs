use async_trait::async_trait;
use bytes::Bytes;
use innoflow_core::dashboard::DashboardStats;
use innoflow_core::document::Document;
use innoflow_core::idea::{Idea, IdeaFilter, IdeaInput, Priority};
use innoflow_core::task::{FullIdeaDetails, TaskDetails, TaskQuery};
use innoflow_core::user::{CurrentUser, Group, TeamAssignment, User, UserInput};
use serde_json::{Map, Value};
use thiserror::Error;

/// Every backend operation the client performs. Each one has a fixed
/// failure message; status codes and response bodies are never shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiOp {
    Login,
    CurrentUser,
    ListIdeas,
    IdeaDetails,
    CreateIdea,
    UpdateIdea,
    DeleteIdea,
    SetPriority,
    ListTasks,
    TaskDetails,
    ClaimTask,
    UnclaimTask,
    CompleteTask,
    ListDocuments,
    UploadDocument,
    DownloadDocument,
    DeleteDocument,
    DashboardStats,
    ListUsers,
    CreateUser,
    UpdateUser,
    DeleteUser,
    ListGroups,
    UserGroups,
    SetUserGroups,
    DevUsers,
    AssignTeam,
}

impl ApiOp {
    pub fn failure_message(&self) -> &'static str {
        match self {
            ApiOp::Login => "Login failed",
            ApiOp::CurrentUser => "Failed to fetch user",
            ApiOp::ListIdeas => "Failed to fetch ideas",
            ApiOp::IdeaDetails => "Failed to fetch idea details",
            ApiOp::CreateIdea => "Failed to submit idea",
            ApiOp::UpdateIdea => "Failed to update idea",
            ApiOp::DeleteIdea => "Failed to delete idea",
            ApiOp::SetPriority => "Failed to set priority",
            ApiOp::ListTasks => "Failed to fetch tasks",
            ApiOp::TaskDetails => "Failed to fetch task details",
            ApiOp::ClaimTask => "Failed to claim task",
            ApiOp::UnclaimTask => "Failed to unclaim task",
            ApiOp::CompleteTask => "Failed to complete task",
            ApiOp::ListDocuments => "Failed to fetch documents",
            ApiOp::UploadDocument => "Failed to upload document",
            ApiOp::DownloadDocument => "Failed to download document",
            ApiOp::DeleteDocument => "Failed to delete document",
            ApiOp::DashboardStats => "Failed to fetch dashboard stats",
            ApiOp::ListUsers => "Could not fetch user data.",
            ApiOp::CreateUser => "Failed to create user",
            ApiOp::UpdateUser => "Failed to update user",
            ApiOp::DeleteUser => "Failed to delete user",
            ApiOp::ListGroups => "Could not fetch user data.",
            ApiOp::UserGroups => "Failed to fetch user groups",
            ApiOp::SetUserGroups => "Failed to update user groups",
            ApiOp::DevUsers => "Failed to fetch users",
            ApiOp::AssignTeam => "Failed to set team",
        }
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Non-2xx response.
    #[error("{}", .0.failure_message())]
    Failed(ApiOp),

    /// HTTP 401: the session token is no longer accepted.
    #[error("Your session has expired. Please log in again.")]
    Unauthorized(ApiOp),

    #[error("{}", .op.failure_message())]
    Transport { op: ApiOp, detail: String },

    #[error("{}", .op.failure_message())]
    Decode { op: ApiOp, detail: String },
}

impl ServiceError {
    pub fn op(&self) -> ApiOp {
        match self {
            ServiceError::Failed(op) | ServiceError::Unauthorized(op) => *op,
            ServiceError::Transport { op, .. } | ServiceError::Decode { op, .. } => *op,
        }
    }

    /// The session must be torn down and the user sent back to login.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ServiceError::Unauthorized(_))
    }
}

/// Abstraction over the workflow backend.
///
/// Every call takes the bearer token explicitly; the client keeps no
/// ambient session. Implementations must not retry, cache or deduplicate.
#[async_trait]
pub trait WorkflowApi: Send + Sync {
    // -- Session --
    async fn login(&self, username: &str, password: &str) -> Result<String, ServiceError>;
    async fn current_user(&self, token: &str) -> Result<CurrentUser, ServiceError>;

    // -- Ideas --
    async fn list_ideas(&self, token: &str, filter: &IdeaFilter)
        -> Result<Vec<Idea>, ServiceError>;
    async fn idea_details(&self, token: &str, id: i64) -> Result<FullIdeaDetails, ServiceError>;
    async fn create_idea(&self, token: &str, input: &IdeaInput) -> Result<Idea, ServiceError>;
    async fn update_idea(
        &self,
        token: &str,
        id: i64,
        input: &IdeaInput,
    ) -> Result<Idea, ServiceError>;
    async fn delete_idea(&self, token: &str, id: i64) -> Result<(), ServiceError>;
    async fn prioritize_idea(
        &self,
        token: &str,
        process_instance_id: &str,
        priority: Priority,
    ) -> Result<(), ServiceError>;

    // -- Tasks --
    async fn list_tasks(&self, token: &str, query: &TaskQuery)
        -> Result<Vec<TaskDetails>, ServiceError>;
    async fn task_details(&self, token: &str, task_id: &str) -> Result<TaskDetails, ServiceError>;
    async fn claim_task(&self, token: &str, task_id: &str) -> Result<(), ServiceError>;
    async fn unclaim_task(&self, token: &str, task_id: &str) -> Result<(), ServiceError>;
    async fn complete_task(
        &self,
        token: &str,
        task_id: &str,
        variables: &Map<String, Value>,
    ) -> Result<(), ServiceError>;

    // -- Documents --
    async fn list_documents(
        &self,
        token: &str,
        process_instance_id: &str,
    ) -> Result<Vec<Document>, ServiceError>;
    async fn upload_document(
        &self,
        token: &str,
        process_instance_id: &str,
        file_name: &str,
        content: Vec<u8>,
    ) -> Result<(), ServiceError>;
    async fn download_document(&self, token: &str, id: i64) -> Result<Bytes, ServiceError>;
    async fn delete_document(&self, token: &str, id: i64) -> Result<(), ServiceError>;

    // -- Dashboard --
    async fn dashboard_stats(&self, token: &str) -> Result<DashboardStats, ServiceError>;

    // -- Users --
    async fn list_users(&self, token: &str) -> Result<Vec<User>, ServiceError>;
    async fn create_user(&self, token: &str, input: &UserInput) -> Result<User, ServiceError>;
    async fn update_user(&self, token: &str, id: &str, input: &UserInput)
        -> Result<(), ServiceError>;
    async fn delete_user(&self, token: &str, id: &str) -> Result<(), ServiceError>;
    async fn list_groups(&self, token: &str) -> Result<Vec<Group>, ServiceError>;
    async fn user_groups(&self, token: &str, id: &str) -> Result<Vec<Group>, ServiceError>;
    async fn set_user_groups(
        &self,
        token: &str,
        id: &str,
        group_ids: &[String],
    ) -> Result<(), ServiceError>;

    // -- Development --
    async fn dev_users(&self, token: &str) -> Result<Vec<User>, ServiceError>;
    async fn assign_team(
        &self,
        token: &str,
        process_instance_id: &str,
        team: &TeamAssignment,
    ) -> Result<(), ServiceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_the_fixed_message() {
        assert_eq!(ServiceError::Failed(ApiOp::ClaimTask).to_string(), "Failed to claim task");
        let err = ServiceError::Transport {
            op: ApiOp::ListIdeas,
            detail: "connection refused".into(),
        };
        assert_eq!(err.to_string(), "Failed to fetch ideas");
        assert_eq!(err.op(), ApiOp::ListIdeas);
        assert!(!err.is_unauthorized());
        assert!(ServiceError::Unauthorized(ApiOp::ListTasks).is_unauthorized());
    }
}

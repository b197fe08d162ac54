use async_trait::async_trait;
use bytes::Bytes;
use innoflow_core::dashboard::DashboardStats;
use innoflow_core::document::Document;
use innoflow_core::idea::{Idea, IdeaFilter, IdeaInput, Priority};
use innoflow_core::task::{FullIdeaDetails, TaskDetails, TaskQuery};
use innoflow_core::user::{CurrentUser, Group, TeamAssignment, User, UserInput};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{json, Map, Value};

use crate::{ApiOp, ServiceError, WorkflowApi};

/// Async HTTP client implementation of [`WorkflowApi`].
pub struct HttpService {
    base_url: String,
    client: Client,
}

impl HttpService {
    pub fn new(base_url: &str) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        Self {
            base_url,
            client: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn with_auth(&self, builder: RequestBuilder, token: &str) -> RequestBuilder {
        builder.header("Authorization", format!("Bearer {token}"))
    }

    async fn send(
        &self,
        op: ApiOp,
        builder: RequestBuilder,
        token: &str,
    ) -> Result<reqwest::Response, ServiceError> {
        tracing::debug!(?op, "request");
        self.with_auth(builder, token)
            .send()
            .await
            .map_err(|e| ServiceError::Transport {
                op,
                detail: e.to_string(),
            })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        op: ApiOp,
        token: &str,
        path: &str,
    ) -> Result<T, ServiceError> {
        let builder = self.client.get(self.url(path));
        let resp = self.send(op, builder, token).await?;
        handle_response(op, resp).await
    }

    async fn get_json_query<T: serde::de::DeserializeOwned>(
        &self,
        op: ApiOp,
        token: &str,
        path: &str,
        query: &[(&'static str, String)],
    ) -> Result<T, ServiceError> {
        let builder = self.client.get(self.url(path)).query(query);
        let resp = self.send(op, builder, token).await?;
        handle_response(op, resp).await
    }

    async fn post_json<B: serde::Serialize, T: serde::de::DeserializeOwned>(
        &self,
        op: ApiOp,
        token: &str,
        path: &str,
        body: &B,
    ) -> Result<T, ServiceError> {
        let builder = self.client.post(self.url(path)).json(body);
        let resp = self.send(op, builder, token).await?;
        handle_response(op, resp).await
    }

    /// POST whose response body is ignored.
    async fn post_unit<B: serde::Serialize>(
        &self,
        op: ApiOp,
        token: &str,
        path: &str,
        body: &B,
    ) -> Result<(), ServiceError> {
        let builder = self.client.post(self.url(path)).json(body);
        let resp = self.send(op, builder, token).await?;
        check_status(op, resp.status())
    }

    async fn put_json<B: serde::Serialize, T: serde::de::DeserializeOwned>(
        &self,
        op: ApiOp,
        token: &str,
        path: &str,
        body: &B,
    ) -> Result<T, ServiceError> {
        let builder = self.client.put(self.url(path)).json(body);
        let resp = self.send(op, builder, token).await?;
        handle_response(op, resp).await
    }

    async fn delete_req(&self, op: ApiOp, token: &str, path: &str) -> Result<(), ServiceError> {
        let builder = self.client.delete(self.url(path));
        let resp = self.send(op, builder, token).await?;
        check_status(op, resp.status())
    }
}

async fn handle_response<T: serde::de::DeserializeOwned>(
    op: ApiOp,
    resp: reqwest::Response,
) -> Result<T, ServiceError> {
    check_status(op, resp.status())?;
    resp.json::<T>().await.map_err(|e| ServiceError::Decode {
        op,
        detail: e.to_string(),
    })
}

/// 401 ends the session; anything else non-2xx is a plain failure.
fn check_status(op: ApiOp, status: StatusCode) -> Result<(), ServiceError> {
    if status.is_success() {
        Ok(())
    } else if status == StatusCode::UNAUTHORIZED && op != ApiOp::Login {
        tracing::warn!(?op, "token rejected");
        Err(ServiceError::Unauthorized(op))
    } else {
        tracing::warn!(?op, %status, "request failed");
        Err(ServiceError::Failed(op))
    }
}

#[async_trait]
impl WorkflowApi for HttpService {
    async fn login(&self, username: &str, password: &str) -> Result<String, ServiceError> {
        let op = ApiOp::Login;
        let resp = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .map_err(|e| ServiceError::Transport {
                op,
                detail: e.to_string(),
            })?;
        let body: Value = handle_response(op, resp).await?;
        body["token"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| ServiceError::Decode {
                op,
                detail: "missing token in response".into(),
            })
    }

    async fn current_user(&self, token: &str) -> Result<CurrentUser, ServiceError> {
        self.get_json(ApiOp::CurrentUser, token, "/api/auth/me").await
    }

    async fn list_ideas(
        &self,
        token: &str,
        filter: &IdeaFilter,
    ) -> Result<Vec<Idea>, ServiceError> {
        let ideas: Vec<Idea> = self
            .get_json_query(ApiOp::ListIdeas, token, "/api/ideas", &filter.query_pairs())
            .await?;
        Ok(filter.apply(ideas))
    }

    async fn idea_details(&self, token: &str, id: i64) -> Result<FullIdeaDetails, ServiceError> {
        self.get_json(ApiOp::IdeaDetails, token, &format!("/api/ideas/{id}"))
            .await
    }

    async fn create_idea(&self, token: &str, input: &IdeaInput) -> Result<Idea, ServiceError> {
        self.post_json(ApiOp::CreateIdea, token, "/api/ideas", input)
            .await
    }

    async fn update_idea(
        &self,
        token: &str,
        id: i64,
        input: &IdeaInput,
    ) -> Result<Idea, ServiceError> {
        self.put_json(ApiOp::UpdateIdea, token, &format!("/api/ideas/{id}"), input)
            .await
    }

    async fn delete_idea(&self, token: &str, id: i64) -> Result<(), ServiceError> {
        self.delete_req(ApiOp::DeleteIdea, token, &format!("/api/ideas/{id}"))
            .await
    }

    async fn prioritize_idea(
        &self,
        token: &str,
        process_instance_id: &str,
        priority: Priority,
    ) -> Result<(), ServiceError> {
        self.post_unit(
            ApiOp::SetPriority,
            token,
            &format!("/api/ideas/{process_instance_id}/prioritize"),
            &json!({ "priority": priority.as_str() }),
        )
        .await
    }

    async fn list_tasks(
        &self,
        token: &str,
        query: &TaskQuery,
    ) -> Result<Vec<TaskDetails>, ServiceError> {
        self.get_json_query(ApiOp::ListTasks, token, "/api/tasks", &query.query_pairs())
            .await
    }

    async fn task_details(&self, token: &str, task_id: &str) -> Result<TaskDetails, ServiceError> {
        self.get_json(
            ApiOp::TaskDetails,
            token,
            &format!("/api/tasks/{task_id}/details"),
        )
        .await
    }

    async fn claim_task(&self, token: &str, task_id: &str) -> Result<(), ServiceError> {
        self.post_unit(
            ApiOp::ClaimTask,
            token,
            &format!("/api/tasks/{task_id}/claim"),
            &json!({}),
        )
        .await
    }

    async fn unclaim_task(&self, token: &str, task_id: &str) -> Result<(), ServiceError> {
        self.post_unit(
            ApiOp::UnclaimTask,
            token,
            &format!("/api/tasks/{task_id}/unclaim"),
            &json!({}),
        )
        .await
    }

    async fn complete_task(
        &self,
        token: &str,
        task_id: &str,
        variables: &Map<String, Value>,
    ) -> Result<(), ServiceError> {
        self.post_unit(
            ApiOp::CompleteTask,
            token,
            &format!("/api/tasks/{task_id}/complete"),
            variables,
        )
        .await
    }

    async fn list_documents(
        &self,
        token: &str,
        process_instance_id: &str,
    ) -> Result<Vec<Document>, ServiceError> {
        self.get_json(
            ApiOp::ListDocuments,
            token,
            &format!("/api/process-instances/{process_instance_id}/documents"),
        )
        .await
    }

    async fn upload_document(
        &self,
        token: &str,
        process_instance_id: &str,
        file_name: &str,
        content: Vec<u8>,
    ) -> Result<(), ServiceError> {
        let op = ApiOp::UploadDocument;
        let part = Part::bytes(content).file_name(file_name.to_string());
        let builder = self
            .client
            .post(self.url(&format!(
                "/api/process-instances/{process_instance_id}/documents"
            )))
            .multipart(Form::new().part("file", part));
        let resp = self.send(op, builder, token).await?;
        check_status(op, resp.status())
    }

    async fn download_document(&self, token: &str, id: i64) -> Result<Bytes, ServiceError> {
        let op = ApiOp::DownloadDocument;
        let builder = self
            .client
            .get(self.url(&format!("/api/documents/{id}/download")));
        let resp = self.send(op, builder, token).await?;
        check_status(op, resp.status())?;
        resp.bytes().await.map_err(|e| ServiceError::Transport {
            op,
            detail: e.to_string(),
        })
    }

    async fn delete_document(&self, token: &str, id: i64) -> Result<(), ServiceError> {
        self.delete_req(ApiOp::DeleteDocument, token, &format!("/api/documents/{id}"))
            .await
    }

    async fn dashboard_stats(&self, token: &str) -> Result<DashboardStats, ServiceError> {
        self.get_json(ApiOp::DashboardStats, token, "/api/dashboard/stats")
            .await
    }

    async fn list_users(&self, token: &str) -> Result<Vec<User>, ServiceError> {
        self.get_json(ApiOp::ListUsers, token, "/api/users").await
    }

    async fn create_user(&self, token: &str, input: &UserInput) -> Result<User, ServiceError> {
        self.post_json(ApiOp::CreateUser, token, "/api/users", input)
            .await
    }

    async fn update_user(
        &self,
        token: &str,
        id: &str,
        input: &UserInput,
    ) -> Result<(), ServiceError> {
        let op = ApiOp::UpdateUser;
        let builder = self
            .client
            .put(self.url(&format!("/api/users/{id}")))
            .json(input);
        let resp = self.send(op, builder, token).await?;
        check_status(op, resp.status())
    }

    async fn delete_user(&self, token: &str, id: &str) -> Result<(), ServiceError> {
        self.delete_req(ApiOp::DeleteUser, token, &format!("/api/users/{id}"))
            .await
    }

    async fn list_groups(&self, token: &str) -> Result<Vec<Group>, ServiceError> {
        self.get_json(ApiOp::ListGroups, token, "/api/users/groups")
            .await
    }

    async fn user_groups(&self, token: &str, id: &str) -> Result<Vec<Group>, ServiceError> {
        self.get_json(ApiOp::UserGroups, token, &format!("/api/users/{id}/groups"))
            .await
    }

    async fn set_user_groups(
        &self,
        token: &str,
        id: &str,
        group_ids: &[String],
    ) -> Result<(), ServiceError> {
        self.post_unit(
            ApiOp::SetUserGroups,
            token,
            &format!("/api/users/{id}/groups"),
            &group_ids,
        )
        .await
    }

    async fn dev_users(&self, token: &str) -> Result<Vec<User>, ServiceError> {
        self.get_json(ApiOp::DevUsers, token, "/api/developpements/users")
            .await
    }

    async fn assign_team(
        &self,
        token: &str,
        process_instance_id: &str,
        team: &TeamAssignment,
    ) -> Result<(), ServiceError> {
        self.post_unit(
            ApiOp::AssignTeam,
            token,
            &format!("/api/developpements/process-instances/{process_instance_id}/equipe"),
            team,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let svc = HttpService::new("http://localhost:8080/");
        assert_eq!(svc.base_url(), "http://localhost:8080");
        assert_eq!(svc.url("/api/ideas"), "http://localhost:8080/api/ideas");
    }

    #[test]
    fn unauthorized_is_distinguished_except_for_login() {
        assert!(matches!(
            check_status(ApiOp::ListIdeas, StatusCode::UNAUTHORIZED),
            Err(ServiceError::Unauthorized(ApiOp::ListIdeas))
        ));
        assert!(matches!(
            check_status(ApiOp::Login, StatusCode::UNAUTHORIZED),
            Err(ServiceError::Failed(ApiOp::Login))
        ));
        assert!(matches!(
            check_status(ApiOp::ClaimTask, StatusCode::INTERNAL_SERVER_ERROR),
            Err(ServiceError::Failed(ApiOp::ClaimTask))
        ));
        assert!(check_status(ApiOp::ClaimTask, StatusCode::NO_CONTENT).is_ok());
    }
}

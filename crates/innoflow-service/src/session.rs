use std::io;
use std::path::{Path, PathBuf};

use innoflow_core::user::CurrentUser;

use crate::{ServiceError, WorkflowApi};

/// An authenticated session. Created on login or restore, replaced
/// wholesale on the next login and dropped on logout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user: CurrentUser,
}

impl Session {
    pub async fn establish(
        api: &dyn WorkflowApi,
        username: &str,
        password: &str,
    ) -> Result<Self, ServiceError> {
        let token = api.login(username, password).await?;
        Self::resume(api, token).await
    }

    /// Validate a stored token by asking who it belongs to.
    pub async fn resume(api: &dyn WorkflowApi, token: String) -> Result<Self, ServiceError> {
        let user = api.current_user(&token).await?;
        Ok(Self { token, user })
    }
}

/// The only durable client state: the bearer token, in a single file.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config_dir>/innoflow/session`, or `./.innoflow-session` when the
    /// platform has no config directory.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("innoflow").join("session"))
            .unwrap_or_else(|| PathBuf::from(".innoflow-session"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Option<String> {
        let raw = std::fs::read_to_string(&self.path).ok()?;
        let token = raw.trim();
        (!token.is_empty()).then(|| token.to_string())
    }

    pub fn save(&self, token: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, token)
    }

    pub fn clear(&self) -> io::Result<()> {
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

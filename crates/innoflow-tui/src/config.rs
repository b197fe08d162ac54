use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use innoflow_core::dispatch::{DispatchTable, TaskKind};
use innoflow_service::TokenStore;
use serde::Deserialize;

#[derive(Parser, Debug, Clone)]
#[command(name = "innoflow", about = "Terminal client for the innovation workflow")]
pub struct Config {
    /// Backend base URL
    #[arg(long, env = "INNOFLOW_SERVER_URL", default_value = "http://127.0.0.1:8080")]
    pub server_url: String,

    /// Where the session token is kept between runs
    #[arg(long, env = "INNOFLOW_SESSION_FILE")]
    pub session_file: Option<PathBuf>,

    /// Quiet period before a task filter edit re-fetches (milliseconds)
    #[arg(long, env = "INNOFLOW_DEBOUNCE_MS", default_value = "400")]
    pub debounce_ms: u64,

    /// TOML file mapping extra task-definition keys to forms
    #[arg(long, env = "INNOFLOW_TASK_KEYS")]
    pub task_keys: Option<PathBuf>,

    /// Directory downloaded documents are written to
    #[arg(long, env = "INNOFLOW_DOWNLOAD_DIR")]
    pub download_dir: Option<PathBuf>,
}

/// `[keys]` table of a task-keys file:
///
/// ```toml
/// [keys]
/// "Activity_0xyz" = "qualification"
/// ```
#[derive(Debug, Default, Deserialize)]
struct TaskKeysFile {
    #[serde(default)]
    keys: HashMap<String, String>,
}

/// Everything the app needs at runtime, resolved from [`Config`].
#[derive(Debug, Clone)]
pub struct Settings {
    pub dispatch: DispatchTable,
    pub debounce: Duration,
    pub token_store: TokenStore,
    pub download_dir: PathBuf,
}

impl Config {
    pub fn settings(&self) -> Result<Settings> {
        let dispatch = match &self.task_keys {
            Some(path) => load_dispatch_table(path)?,
            None => DispatchTable::default(),
        };
        let session_file = self
            .session_file
            .clone()
            .unwrap_or_else(TokenStore::default_path);
        let download_dir = self
            .download_dir
            .clone()
            .or_else(dirs::download_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        Ok(Settings {
            dispatch,
            debounce: Duration::from_millis(self.debounce_ms),
            token_store: TokenStore::new(session_file),
            download_dir,
        })
    }
}

pub fn load_dispatch_table(path: &Path) -> Result<DispatchTable> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read task keys '{}'", path.display()))?;
    parse_dispatch_table(&contents)
        .with_context(|| format!("invalid task keys '{}'", path.display()))
}

fn parse_dispatch_table(contents: &str) -> Result<DispatchTable> {
    let file: TaskKeysFile = toml::from_str(contents)?;
    let overrides = file
        .keys
        .into_iter()
        .map(|(key, kind)| {
            TaskKind::from_str(&kind)
                .map(|k| (key.clone(), k))
                .ok_or_else(|| anyhow!("unknown form '{kind}' for key '{key}'"))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(DispatchTable::with_overrides(overrides))
}

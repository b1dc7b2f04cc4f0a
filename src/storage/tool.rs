//! Remote filesystem adapter shelling out to the external file tool.

use crate::storage::remote::{RemoteEntry, RemoteStorage, RemoteStorageError, join_remote_path};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

/// Invokes the configured file tool binary for listing and reads.
#[derive(Debug, Clone)]
pub struct FileToolRemoteStorage {
    binary_path: String,
    config_path: Option<String>,
}

impl FileToolRemoteStorage {
    /// Creates an adapter over the tool binary and its optional config
    /// file.
    #[must_use]
    pub fn new(binary_path: impl Into<String>, config_path: Option<String>) -> Self {
        Self {
            binary_path: binary_path.into(),
            config_path,
        }
    }

    async fn exec(&self, args: &[&str]) -> Result<Vec<u8>, RemoteStorageError> {
        let mut command = Command::new(&self.binary_path);
        if let Some(config_path) = &self.config_path {
            command.arg("--config").arg(config_path);
        }
        command.args(args);
        debug!(tool = %self.binary_path, ?args, "invoking file tool");

        let output = command
            .output()
            .await
            .map_err(|err| RemoteStorageError::Tool(err.to_string()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let last_line = stderr.lines().last().unwrap_or_default().to_owned();
            return Err(RemoteStorageError::Tool(last_line));
        }
        Ok(output.stdout)
    }
}

/// One entry of the tool's JSON listing output.
#[derive(Debug, Deserialize)]
struct ToolEntry {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Size", default)]
    size: Option<i64>,
    #[serde(rename = "MimeType", default)]
    mime_type: Option<String>,
    #[serde(rename = "ModTime", default)]
    mod_time: Option<String>,
    #[serde(rename = "IsDir", default)]
    is_dir: bool,
}

#[async_trait]
impl RemoteStorage for FileToolRemoteStorage {
    async fn list(&self, path: &str) -> Result<Vec<RemoteEntry>, RemoteStorageError> {
        let stdout = self.exec(&["lsjson", path]).await?;
        let entries: Vec<ToolEntry> = serde_json::from_slice(&stdout)
            .map_err(|err| RemoteStorageError::Tool(err.to_string()))?;

        Ok(entries
            .into_iter()
            .map(|entry| RemoteEntry {
                full_path: join_remote_path(path, &[entry.name.as_str()]),
                size: entry.size.and_then(|size| u64::try_from(size).ok()).unwrap_or(0),
                mime_type: entry.mime_type.unwrap_or_default(),
                mod_time: entry
                    .mod_time
                    .as_deref()
                    .and_then(|raw| raw.parse::<DateTime<Utc>>().ok()),
                is_dir: entry.is_dir,
                name: entry.name,
            })
            .collect())
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>, RemoteStorageError> {
        self.exec(&["cat", path]).await
    }
}

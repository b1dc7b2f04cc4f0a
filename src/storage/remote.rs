//! Remote filesystem abstraction: `remote:/path` syntax and the listing
//! port backed by the external file tool.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// A parsed remote path: an optional remote name plus an absolute path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemotePath {
    /// Remote name before the colon, when present.
    pub remote: Option<String>,
    /// Absolute path within the remote.
    pub path: String,
}

impl RemotePath {
    /// Parses a `remote:/absolute/path` string.
    ///
    /// A missing remote prefix yields `remote: None` with the path rooted
    /// at `/`.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.split_once(':') {
            Some((remote, rest)) => Self {
                remote: if remote.is_empty() {
                    None
                } else {
                    Some(remote.to_owned())
                },
                path: rooted(rest),
            },
            None => Self {
                remote: None,
                path: rooted(raw),
            },
        }
    }

    /// Returns the final path component, if the path names one.
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.path
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
    }
}

impl fmt::Display for RemotePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.remote {
            Some(remote) => write!(f, "{remote}:{}", self.path),
            None => write!(f, "{}", self.path),
        }
    }
}

fn rooted(path: &str) -> String {
    if path.starts_with('/') {
        path.to_owned()
    } else {
        format!("/{path}")
    }
}

/// Joins path segments under a remote root.
///
/// Segments starting with `.` are dropped (the relative-path computation
/// upstream yields `.` for files sitting directly in the common ancestor);
/// a final `"/"` segment keeps the result directory-shaped.
#[must_use]
pub fn join_remote_path(root: &str, segments: &[&str]) -> String {
    let parsed = RemotePath::parse(root);
    let mut joined = parsed.path.trim_end_matches('/').to_owned();
    let mut trailing_slash = false;

    for segment in segments {
        if segment.starts_with('.') {
            continue;
        }
        let trimmed = segment.trim_matches('/');
        if trimmed.is_empty() {
            trailing_slash = !segment.is_empty();
            continue;
        }
        joined.push('/');
        joined.push_str(trimmed);
        trailing_slash = segment.ends_with('/');
    }
    if joined.is_empty() {
        joined.push('/');
    }
    if trailing_slash && !joined.ends_with('/') {
        joined.push('/');
    }

    match parsed.remote {
        Some(remote) => format!("{remote}:{joined}"),
        None => joined,
    }
}

/// One entry of a remote directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntry {
    /// File or directory name within the listed directory.
    pub name: String,
    /// Full remote path of the entry.
    pub full_path: String,
    /// Size in bytes.
    pub size: u64,
    /// Reported MIME type.
    pub mime_type: String,
    /// Last modification time, when the remote reports one.
    pub mod_time: Option<DateTime<Utc>>,
    /// Whether the entry is a directory.
    pub is_dir: bool,
}

/// Errors surfaced by the remote filesystem tool.
#[derive(Debug, Clone, Error)]
pub enum RemoteStorageError {
    /// The listed or read path does not exist.
    #[error("remote path not found: {0}")]
    NotFound(String),

    /// The underlying tool failed.
    #[error("remote tool failed: {0}")]
    Tool(String),
}

/// Listing/read access to remote files, provided by an external tool.
///
/// The dispatcher treats this as an opaque remote filesystem; it never
/// implements the transfer itself.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteStorage: Send + Sync {
    /// Lists the entries of a remote directory.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteStorageError`] when the path is missing or the tool
    /// fails.
    async fn list(&self, path: &str) -> Result<Vec<RemoteEntry>, RemoteStorageError>;

    /// Reads a remote file's contents.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteStorageError`] when the path is missing or the tool
    /// fails.
    async fn read(&self, path: &str) -> Result<Vec<u8>, RemoteStorageError>;
}

/// Shared handle to a remote storage implementation.
pub type DynRemoteStorage = Arc<dyn RemoteStorage>;

#[cfg(test)]
mod tests {
    use super::{RemotePath, join_remote_path};

    #[test]
    fn parse_splits_remote_and_path() {
        let parsed = RemotePath::parse("storage:/r/example/1.mov");
        assert_eq!(parsed.remote.as_deref(), Some("storage"));
        assert_eq!(parsed.path, "/r/example/1.mov");
    }

    #[test]
    fn parse_without_remote_roots_the_path() {
        let parsed = RemotePath::parse("r/example");
        assert_eq!(parsed.remote, None);
        assert_eq!(parsed.path, "/r/example");
    }

    #[test]
    fn parse_with_empty_remote_yields_none() {
        let parsed = RemotePath::parse(":/r/example");
        assert_eq!(parsed.remote, None);
        assert_eq!(parsed.path, "/r/example");
    }

    #[test]
    fn display_round_trips() {
        let parsed = RemotePath::parse("storage:/r/example/");
        assert_eq!(parsed.to_string(), "storage:/r/example/");
    }

    #[test]
    fn file_name_ignores_trailing_slash() {
        let parsed = RemotePath::parse("storage:/r/example/1.mov");
        assert_eq!(parsed.file_name(), Some("1.mov"));
        let dir = RemotePath::parse("storage:/r/example/");
        assert_eq!(dir.file_name(), Some("example"));
    }

    #[test]
    fn join_appends_segments_with_trailing_slash() {
        assert_eq!(
            join_remote_path("storage:/orders", &["first", "/"]),
            "storage:/orders/first/"
        );
    }

    #[test]
    fn join_drops_dot_segments() {
        assert_eq!(
            join_remote_path("storage:/orders", &[".", "/"]),
            "storage:/orders/"
        );
    }

    #[test]
    fn join_without_remote_keeps_plain_path() {
        assert_eq!(join_remote_path("/orders", &["a"]), "/orders/a");
    }
}

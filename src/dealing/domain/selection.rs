//! File selections: the source sets orders expand from.

use super::{SelectionId, SelectionItemId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Broad media classification derived from a MIME type prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    /// `video/*` content.
    Video,
    /// `audio/*` content.
    Audio,
}

impl MediaKind {
    /// Classifies a MIME type, returning `None` for non-media kinds.
    #[must_use]
    pub fn from_mime_type(mime_type: &str) -> Option<Self> {
        if mime_type.starts_with("video/") {
            Some(Self::Video)
        } else if mime_type.starts_with("audio/") {
            Some(Self::Audio)
        } else {
            None
        }
    }
}

/// A single remote file captured in a selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSelectionItem {
    id: SelectionItemId,
    remote_path: String,
    mime_type: String,
    size: u64,
    removed: bool,
}

impl FileSelectionItem {
    /// Creates a selection item for a remote file.
    #[must_use]
    pub fn new(remote_path: impl Into<String>, mime_type: impl Into<String>, size: u64) -> Self {
        Self {
            id: SelectionItemId::new(),
            remote_path: remote_path.into(),
            mime_type: mime_type.into(),
            size,
            removed: false,
        }
    }

    /// Returns the item identifier.
    #[must_use]
    pub const fn id(&self) -> SelectionItemId {
        self.id
    }

    /// Returns the item's remote path.
    #[must_use]
    pub fn remote_path(&self) -> &str {
        &self.remote_path
    }

    /// Returns the item's MIME type.
    #[must_use]
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Returns the file size in bytes.
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// Returns whether the operator hid this item from expansion.
    #[must_use]
    pub const fn removed(&self) -> bool {
        self.removed
    }

    /// Hides or reveals the item.
    pub const fn set_removed(&mut self, removed: bool) {
        self.removed = removed;
    }

    /// Returns the media kind, if the MIME type names one.
    #[must_use]
    pub fn media_kind(&self) -> Option<MediaKind> {
        MediaKind::from_mime_type(&self.mime_type)
    }
}

/// A batch of remote files selected as order input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSelection {
    id: SelectionId,
    root_remote_path: Option<String>,
    items: Vec<FileSelectionItem>,
    created_at: DateTime<Utc>,
}

impl FileSelection {
    /// Creates a selection rooted at the given remote path.
    #[must_use]
    pub fn new(
        root_remote_path: Option<String>,
        items: Vec<FileSelectionItem>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: SelectionId::new(),
            root_remote_path,
            items,
            created_at,
        }
    }

    /// Returns the selection identifier.
    #[must_use]
    pub const fn id(&self) -> SelectionId {
        self.id
    }

    /// Returns the remote path the selection was built from, if recorded.
    #[must_use]
    pub fn root_remote_path(&self) -> Option<&str> {
        self.root_remote_path.as_deref()
    }

    /// Returns all items, including removed ones.
    #[must_use]
    pub fn items(&self) -> &[FileSelectionItem] {
        &self.items
    }

    /// Returns the items that still participate in expansion.
    pub fn active_items(&self) -> impl Iterator<Item = &FileSelectionItem> {
        self.items.iter().filter(|item| !item.removed())
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

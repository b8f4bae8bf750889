//! Conversation threads and snapshot persistence
//!
//! A thread is the ordered accumulator of conversation turns, owned by the
//! calling lab for its lifetime. Snapshots are versioned JSON files; loading
//! one restores the thread so a later run can resume with full prior context.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::providers::types::ChatMessage;

/// Ordered accumulator of conversation turns
#[derive(Debug, Clone)]
pub struct ConversationThread {
    id: String,
    created_at: DateTime<Utc>,
    messages: Vec<ChatMessage>,
}

impl ConversationThread {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            messages: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.messages.push(ChatMessage::user(text));
    }

    pub fn push_assistant(&mut self, text: impl Into<String>) {
        self.messages.push(ChatMessage::assistant(text));
    }

    /// Capture the thread's current state
    pub fn snapshot(&self) -> ThreadSnapshot {
        ThreadSnapshot {
            schema_version: ThreadSnapshot::SCHEMA_VERSION.to_string(),
            thread_id: self.id.clone(),
            created_at: self.created_at,
            saved_at: Utc::now(),
            messages: self.messages.clone(),
        }
    }

    /// Write a snapshot of this thread to `path`
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SnapshotError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(&self.snapshot()).map_err(|source| {
            SnapshotError::Serialize {
                path: path.display().to_string(),
                source,
            }
        })?;
        std::fs::write(path, json).map_err(|source| SnapshotError::Write {
            path: path.display().to_string(),
            source,
        })
    }

    /// Restore a thread from a snapshot written by [`ConversationThread::save`]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| SnapshotError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let snapshot: ThreadSnapshot =
            serde_json::from_str(&content).map_err(|source| SnapshotError::Parse {
                path: path.display().to_string(),
                source,
            })?;

        if !snapshot.is_compatible() {
            return Err(SnapshotError::Incompatible {
                path: path.display().to_string(),
                found: snapshot.schema_version,
                expected: ThreadSnapshot::SCHEMA_VERSION,
            });
        }

        Ok(Self {
            id: snapshot.thread_id,
            created_at: snapshot.created_at,
            messages: snapshot.messages,
        })
    }
}

impl Default for ConversationThread {
    fn default() -> Self {
        Self::new()
    }
}

/// Serialized form of a thread at a point in time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadSnapshot {
    /// Schema version for forward compatibility
    pub schema_version: String,
    pub thread_id: String,
    pub created_at: DateTime<Utc>,
    pub saved_at: DateTime<Utc>,
    pub messages: Vec<ChatMessage>,
}

impl ThreadSnapshot {
    /// Current schema version
    pub const SCHEMA_VERSION: &'static str = "1";

    /// Check if this snapshot can be loaded by the current schema
    pub fn is_compatible(&self) -> bool {
        self.schema_version == Self::SCHEMA_VERSION
    }
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to read snapshot {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write snapshot {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize snapshot {path}: {source}")]
    Serialize {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid snapshot JSON in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("snapshot {path} has schema version {found} (expected {expected})")]
    Incompatible {
        path: String,
        found: String,
        expected: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_thread_accumulates_turns_in_order() {
        let mut thread = ConversationThread::new();
        assert!(thread.is_empty());

        thread.push_user("first question");
        thread.push_assistant("first answer");
        thread.push_user("follow-up");

        assert_eq!(thread.len(), 3);
        assert_eq!(thread.messages()[0].text(), "first question");
        assert_eq!(thread.messages()[1].text(), "first answer");
        assert_eq!(thread.messages()[2].text(), "follow-up");
    }

    #[test]
    fn test_snapshot_roundtrip_via_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("thread.json");

        let mut thread = ConversationThread::new();
        thread.push_user("remember 47");
        thread.push_assistant("Got it: 47.");
        thread.save(&path).unwrap();

        let restored = ConversationThread::load(&path).unwrap();
        assert_eq!(restored.id(), thread.id());
        assert_eq!(restored.len(), 2);
        assert_eq!(restored.messages()[1].text(), "Got it: 47.");
    }

    #[test]
    fn test_load_rejects_incompatible_schema() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("thread.json");

        let mut snapshot = ConversationThread::new().snapshot();
        snapshot.schema_version = "99".to_string();
        std::fs::write(&path, serde_json::to_string(&snapshot).unwrap()).unwrap();

        let err = ConversationThread::load(&path).unwrap_err();
        assert!(matches!(err, SnapshotError::Incompatible { ref found, .. } if found == "99"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = ConversationThread::load("/nonexistent/thread.json").unwrap_err();
        assert!(matches!(err, SnapshotError::Read { .. }));
    }

    #[test]
    fn test_load_garbage_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("thread.json");
        std::fs::write(&path, "not json at all").unwrap();

        let err = ConversationThread::load(&path).unwrap_err();
        assert!(matches!(err, SnapshotError::Parse { .. }));
    }
}

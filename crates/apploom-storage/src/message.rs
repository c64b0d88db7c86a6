//! Message storage - persisted conversation turns per project.
//!
//! Keys are `project_id:created_at:id` so a prefix range scan returns a
//! project's messages in creation order.

use anyhow::Result;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::range_utils::prefix_range;

const MESSAGES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("messages");

/// Who authored a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageRole {
    #[serde(rename = "USER")]
    User,
    #[serde(rename = "ASSISTANT")]
    Assistant,
}

/// What kind of turn this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageKind {
    #[serde(rename = "PLAN")]
    Plan,
    #[serde(rename = "RESULT")]
    Result,
    #[serde(rename = "ERROR")]
    Error,
}

/// One persisted conversation turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: String,
    pub project_id: String,
    pub content: String,
    pub role: MessageRole,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub created_at: i64,
}

impl MessageRecord {
    pub fn new(
        project_id: impl Into<String>,
        content: impl Into<String>,
        role: MessageRole,
        kind: MessageKind,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            project_id: project_id.into(),
            content: content.into(),
            role,
            kind,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Message storage keyed for ordered per-project scans.
#[derive(Clone)]
pub struct MessageStorage {
    db: Arc<Database>,
}

impl MessageStorage {
    pub fn new(db: Arc<Database>) -> Result<Self> {
        let write_txn = db.begin_write()?;
        write_txn.open_table(MESSAGES_TABLE)?;
        write_txn.commit()?;

        Ok(Self { db })
    }

    fn row_key(record: &MessageRecord) -> String {
        // Zero-padded millis keep lexicographic order == chronological order.
        format!(
            "{}:{:016}:{}",
            record.project_id, record.created_at, record.id
        )
    }

    pub fn create(&self, record: &MessageRecord) -> Result<()> {
        let key = Self::row_key(record);
        let data = serde_json::to_vec(record)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(MESSAGES_TABLE)?;
            table.insert(key.as_str(), data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// All messages for a project in creation order.
    pub fn list(&self, project_id: &str) -> Result<Vec<MessageRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(MESSAGES_TABLE)?;

        let prefix = format!("{}:", project_id);
        let (start, end) = prefix_range(&prefix);

        let mut messages = Vec::new();
        for entry in table.range(start.as_str()..end.as_str())? {
            let entry = entry?;
            messages.push(serde_json::from_slice(entry.1.value())?);
        }
        Ok(messages)
    }

    /// The most recent `limit` messages for a project, oldest first, so the
    /// result can be fed straight back to an agent as history.
    pub fn find_recent(&self, project_id: &str, limit: usize) -> Result<Vec<MessageRecord>> {
        let mut messages = self.list(project_id)?;
        if messages.len() > limit {
            messages.drain(..messages.len() - limit);
        }
        Ok(messages)
    }
}

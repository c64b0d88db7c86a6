//! Fragment storage - the persisted output of one successful generation.
//!
//! Fragments are immutable once written: one per successful generation
//! turn, carrying the sandbox handle, public URL, title and the generated
//! file map.

use anyhow::Result;
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

const FRAGMENTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("fragments");

/// Persisted record of one successful generation's output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FragmentRecord {
    pub id: String,
    /// The RESULT message this fragment is attached to.
    pub message_id: String,
    pub sandbox_id: String,
    pub sandbox_url: String,
    pub title: String,
    pub files: BTreeMap<String, String>,
    pub created_at: i64,
}

impl FragmentRecord {
    pub fn new(
        message_id: impl Into<String>,
        sandbox_id: impl Into<String>,
        sandbox_url: impl Into<String>,
        title: impl Into<String>,
        files: BTreeMap<String, String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            message_id: message_id.into(),
            sandbox_id: sandbox_id.into(),
            sandbox_url: sandbox_url.into(),
            title: title.into(),
            files,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}

#[derive(Clone)]
pub struct FragmentStorage {
    db: Arc<Database>,
}

impl FragmentStorage {
    pub fn new(db: Arc<Database>) -> Result<Self> {
        let write_txn = db.begin_write()?;
        write_txn.open_table(FRAGMENTS_TABLE)?;
        write_txn.commit()?;

        Ok(Self { db })
    }

    pub fn create(&self, fragment: &FragmentRecord) -> Result<()> {
        let data = serde_json::to_vec(fragment)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(FRAGMENTS_TABLE)?;
            table.insert(fragment.id.as_str(), data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Option<FragmentRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(FRAGMENTS_TABLE)?;

        if let Some(data) = table.get(id)? {
            Ok(Some(serde_json::from_slice(data.value())?))
        } else {
            Ok(None)
        }
    }

    /// Fragments attached to a given message (0 or 1 in practice).
    pub fn find_by_message(&self, message_id: &str) -> Result<Vec<FragmentRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(FRAGMENTS_TABLE)?;

        let mut fragments = Vec::new();
        for entry in table.iter()? {
            let entry = entry?;
            let fragment: FragmentRecord = serde_json::from_slice(entry.1.value())?;
            if fragment.message_id == message_id {
                fragments.push(fragment);
            }
        }
        Ok(fragments)
    }

    pub fn count(&self) -> Result<usize> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(FRAGMENTS_TABLE)?;
        Ok(table.len()? as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_get_and_find_by_message() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db = Arc::new(Database::create(temp_dir.path().join("test.db")).unwrap());
        let storage = FragmentStorage::new(db).unwrap();

        let mut files = BTreeMap::new();
        files.insert("app/page.tsx".to_string(), "export default ...".to_string());
        let fragment = FragmentRecord::new("msg-1", "sb-1", "https://x.dev", "Landing", files);
        storage.create(&fragment).unwrap();

        let loaded = storage.get(&fragment.id).unwrap().unwrap();
        assert_eq!(loaded.sandbox_id, "sb-1");

        let by_message = storage.find_by_message("msg-1").unwrap();
        assert_eq!(by_message.len(), 1);
        assert!(storage.find_by_message("other").unwrap().is_empty());
        assert_eq!(storage.count().unwrap(), 1);
    }
}

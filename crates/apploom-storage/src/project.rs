//! Project storage - the top-level conversation container.

use anyhow::Result;
use redb::{Database, ReadableDatabase, TableDefinition};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const PROJECTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("projects");

/// One project owned by one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub created_at: i64,
}

impl ProjectRecord {
    pub fn new(user_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            name: name.into(),
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}

#[derive(Clone)]
pub struct ProjectStorage {
    db: Arc<Database>,
}

impl ProjectStorage {
    pub fn new(db: Arc<Database>) -> Result<Self> {
        let write_txn = db.begin_write()?;
        write_txn.open_table(PROJECTS_TABLE)?;
        write_txn.commit()?;

        Ok(Self { db })
    }

    pub fn upsert(&self, project: &ProjectRecord) -> Result<()> {
        let data = serde_json::to_vec(project)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(PROJECTS_TABLE)?;
            table.insert(project.id.as_str(), data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Option<ProjectRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PROJECTS_TABLE)?;

        if let Some(data) = table.get(id)? {
            Ok(Some(serde_json::from_slice(data.value())?))
        } else {
            Ok(None)
        }
    }
}

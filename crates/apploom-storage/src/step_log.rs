//! Durable workflow step log.
//!
//! Every named pipeline step records its serialized result under
//! `run_id:step_key`. When a run is resumed with the same run id, completed
//! steps replay their recorded result instead of re-executing side effects.

use anyhow::Result;
use parking_lot::Mutex;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use crate::range_utils::prefix_range;

const STEPS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("workflow_steps");

/// Byte-level storage for recorded step results.
#[derive(Clone)]
pub struct StepLogStorage {
    db: Arc<Database>,
}

impl StepLogStorage {
    pub fn new(db: Arc<Database>) -> Result<Self> {
        let write_txn = db.begin_write()?;
        write_txn.open_table(STEPS_TABLE)?;
        write_txn.commit()?;

        Ok(Self { db })
    }

    fn row_key(run_id: &str, step: &str) -> String {
        format!("{}:{}", run_id, step)
    }

    pub fn save(&self, run_id: &str, step: &str, data: &[u8]) -> Result<()> {
        let key = Self::row_key(run_id, step);
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(STEPS_TABLE)?;
            table.insert(key.as_str(), data)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn load(&self, run_id: &str, step: &str) -> Result<Option<Vec<u8>>> {
        let key = Self::row_key(run_id, step);
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(STEPS_TABLE)?;
        Ok(table.get(key.as_str())?.map(|v| v.value().to_vec()))
    }

    /// Delete every recorded step for a finished run.
    pub fn clear_run(&self, run_id: &str) -> Result<usize> {
        let prefix = format!("{}:", run_id);
        let (start, end) = prefix_range(&prefix);

        let keys: Vec<String> = {
            let read_txn = self.db.begin_read()?;
            let table = read_txn.open_table(STEPS_TABLE)?;
            let mut keys = Vec::new();
            for entry in table.range(start.as_str()..end.as_str())? {
                keys.push(entry?.0.value().to_string());
            }
            keys
        };

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(STEPS_TABLE)?;
            for key in &keys {
                table.remove(key.as_str())?;
            }
        }
        write_txn.commit()?;
        Ok(keys.len())
    }
}

/// Runs named steps for one workflow run, memoizing their results.
///
/// Repeated steps (tool invocations) are keyed `name#n` with a per-name
/// counter, so replay lines up as long as the recorded prefix of steps is
/// deterministic.
#[derive(Clone)]
pub struct StepRunner {
    log: StepLogStorage,
    run_id: String,
    counters: Arc<Mutex<HashMap<String, u64>>>,
}

impl StepRunner {
    pub fn new(log: StepLogStorage, run_id: impl Into<String>) -> Self {
        Self {
            log,
            run_id: run_id.into(),
            counters: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Execute a named step once per run. A recorded result short-circuits
    /// the future without polling it, so side effects are not repeated.
    pub async fn run<T, Fut>(&self, name: &str, fut: Fut) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(recorded) = self.log.load(&self.run_id, name)? {
            tracing::debug!(run_id = %self.run_id, step = name, "Replaying recorded step");
            return Ok(serde_json::from_slice(&recorded)?);
        }

        let value = fut.await?;
        self.log
            .save(&self.run_id, name, &serde_json::to_vec(&value)?)?;
        Ok(value)
    }

    /// Execute a step that may run multiple times per run (tool calls).
    pub async fn run_indexed<T, Fut>(&self, name: &str, fut: Fut) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        Fut: Future<Output = Result<T>>,
    {
        let seq = {
            let mut counters = self.counters.lock();
            let counter = counters.entry(name.to_string()).or_insert(0);
            *counter += 1;
            *counter
        };
        let key = format!("{}#{}", name, seq);
        self.run(&key, fut).await
    }
}

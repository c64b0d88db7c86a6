//! Apploom Storage - persistence layer on the redb embedded database.
//!
//! One table per entity type, byte values holding serde_json documents.
//! Composite `a:b` keys plus prefix-range scans provide ordered lookups
//! (messages by creation time, keys by user).
//!
//! # Tables
//!
//! - `projects` - project records
//! - `messages` - conversation turns, ordered per project
//! - `fragments` - successful generation outputs
//! - `ai_provider_keys` / `ai_settings` - encrypted credentials + defaults
//! - `workflow_steps` - durable step log for crash-consistent replay

pub mod encryption;
pub mod fragment;
pub mod message;
pub mod project;
pub mod step_log;
pub mod vault;

mod range_utils;

use anyhow::Result;
use redb::Database;
use std::path::Path;
use std::sync::Arc;

pub use encryption::{ApiKeyEncryptor, EncryptedApiKey, MASTER_KEY_ENV, MasterKey, VaultError};
pub use fragment::{FragmentRecord, FragmentStorage};
pub use message::{MessageKind, MessageRecord, MessageRole, MessageStorage};
pub use project::{ProjectRecord, ProjectStorage};
pub use step_log::{StepLogStorage, StepRunner};
pub use vault::{
    AiSettingsStorage, CredentialVault, ProviderKeyInfo, ProviderKeyStorage, ResolvedCredential,
};

/// Central storage manager that initializes all storage subsystems.
pub struct Storage {
    db: Arc<Database>,
    pub projects: ProjectStorage,
    pub messages: MessageStorage,
    pub fragments: FragmentStorage,
    pub provider_keys: ProviderKeyStorage,
    pub ai_settings: AiSettingsStorage,
    pub steps: StepLogStorage,
}

impl Storage {
    /// Create a new storage instance at the given path.
    ///
    /// Creates the database file if it doesn't exist and initializes all
    /// required tables.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let db = Arc::new(Database::create(path)?);
        Self::with_database(db)
    }

    /// Build a storage instance over an already-open database.
    pub fn with_database(db: Arc<Database>) -> Result<Self> {
        let projects = ProjectStorage::new(db.clone())?;
        let messages = MessageStorage::new(db.clone())?;
        let fragments = FragmentStorage::new(db.clone())?;
        let provider_keys = ProviderKeyStorage::new(db.clone())?;
        let ai_settings = AiSettingsStorage::new(db.clone())?;
        let steps = StepLogStorage::new(db.clone())?;

        Ok(Self {
            db,
            projects,
            messages,
            fragments,
            provider_keys,
            ai_settings,
            steps,
        })
    }

    /// Build the credential vault over this storage's key tables.
    pub fn vault(&self, master_key: &MasterKey) -> Result<CredentialVault> {
        let encryptor = ApiKeyEncryptor::new(master_key)?;
        Ok(CredentialVault::new(
            self.provider_keys.clone(),
            self.ai_settings.clone(),
            encryptor,
        ))
    }

    pub fn database(&self) -> Arc<Database> {
        self.db.clone()
    }
}

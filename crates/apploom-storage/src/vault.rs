//! Credential vault - encrypted per-user provider API keys.
//!
//! Keys are stored per (user, provider) as AES-GCM sealed records, plus a
//! per-user default-provider selector. Listing never returns plaintext,
//! only the provider and the display-only last4.

use anyhow::Result;
use apploom_traits::ProviderId;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::encryption::{ApiKeyEncryptor, EncryptedApiKey, VaultError, VaultResult};
use crate::range_utils::prefix_range;

const PROVIDER_KEYS_TABLE: TableDefinition<&str, &[u8]> =
    TableDefinition::new("ai_provider_keys");
const AI_SETTINGS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("ai_settings");

/// Provider key row as persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredProviderKey {
    pub provider: ProviderId,
    #[serde(flatten)]
    pub record: EncryptedApiKey,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Metadata-only view of a stored key, safe to hand to display layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderKeyInfo {
    pub provider: ProviderId,
    pub last4: String,
    pub updated_at: i64,
}

/// Per-user AI settings row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct AiSettings {
    default_provider: Option<ProviderId>,
}

/// A successfully resolved credential for one pipeline run.
#[derive(Debug, Clone)]
pub struct ResolvedCredential {
    pub provider: ProviderId,
    pub api_key: String,
}

/// Storage for encrypted provider key rows.
#[derive(Clone)]
pub struct ProviderKeyStorage {
    db: Arc<Database>,
}

impl ProviderKeyStorage {
    pub fn new(db: Arc<Database>) -> Result<Self> {
        let write_txn = db.begin_write()?;
        write_txn.open_table(PROVIDER_KEYS_TABLE)?;
        write_txn.commit()?;

        Ok(Self { db })
    }

    fn row_key(user_id: &str, provider: ProviderId) -> String {
        format!("{}:{}", user_id, provider.as_str())
    }

    /// Insert or replace the key row for (user, provider).
    pub fn upsert(&self, user_id: &str, row: &StoredProviderKey) -> Result<()> {
        let key = Self::row_key(user_id, row.provider);
        let data = serde_json::to_vec(row)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(PROVIDER_KEYS_TABLE)?;
            table.insert(key.as_str(), data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn get(&self, user_id: &str, provider: ProviderId) -> Result<Option<StoredProviderKey>> {
        let key = Self::row_key(user_id, provider);
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PROVIDER_KEYS_TABLE)?;

        if let Some(data) = table.get(key.as_str())? {
            Ok(Some(serde_json::from_slice(data.value())?))
        } else {
            Ok(None)
        }
    }

    pub fn delete(&self, user_id: &str, provider: ProviderId) -> Result<bool> {
        let key = Self::row_key(user_id, provider);
        let write_txn = self.db.begin_write()?;
        let existed = {
            let mut table = write_txn.open_table(PROVIDER_KEYS_TABLE)?;
            table.remove(key.as_str())?.is_some()
        };
        write_txn.commit()?;
        Ok(existed)
    }

    /// List a user's configured providers without exposing key material.
    pub fn list(&self, user_id: &str) -> Result<Vec<ProviderKeyInfo>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PROVIDER_KEYS_TABLE)?;

        let prefix = format!("{}:", user_id);
        let (start, end) = prefix_range(&prefix);

        let mut infos = Vec::new();
        for entry in table.range(start.as_str()..end.as_str())? {
            let entry = entry?;
            let row: StoredProviderKey = serde_json::from_slice(entry.1.value())?;
            infos.push(ProviderKeyInfo {
                provider: row.provider,
                last4: row.record.last4,
                updated_at: row.updated_at,
            });
        }
        Ok(infos)
    }

    pub fn count(&self, user_id: &str) -> Result<usize> {
        Ok(self.list(user_id)?.len())
    }
}

/// Storage for per-user AI settings.
#[derive(Clone)]
pub struct AiSettingsStorage {
    db: Arc<Database>,
}

impl AiSettingsStorage {
    pub fn new(db: Arc<Database>) -> Result<Self> {
        let write_txn = db.begin_write()?;
        write_txn.open_table(AI_SETTINGS_TABLE)?;
        write_txn.commit()?;

        Ok(Self { db })
    }

    pub fn default_provider(&self, user_id: &str) -> Result<Option<ProviderId>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(AI_SETTINGS_TABLE)?;

        if let Some(data) = table.get(user_id)? {
            let settings: AiSettings = serde_json::from_slice(data.value())?;
            Ok(settings.default_provider)
        } else {
            Ok(None)
        }
    }

    pub fn set_default_provider(&self, user_id: &str, provider: ProviderId) -> Result<()> {
        let settings = AiSettings {
            default_provider: Some(provider),
        };
        let data = serde_json::to_vec(&settings)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(AI_SETTINGS_TABLE)?;
            table.insert(user_id, data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }
}

/// Resolves and manages per-user provider credentials.
#[derive(Clone)]
pub struct CredentialVault {
    keys: ProviderKeyStorage,
    settings: AiSettingsStorage,
    encryptor: Arc<ApiKeyEncryptor>,
}

/// Provider used when a user has not picked one.
pub const FALLBACK_PROVIDER: ProviderId = ProviderId::Gemini;

impl CredentialVault {
    pub fn new(
        keys: ProviderKeyStorage,
        settings: AiSettingsStorage,
        encryptor: ApiKeyEncryptor,
    ) -> Self {
        Self {
            keys,
            settings,
            encryptor: Arc::new(encryptor),
        }
    }

    /// The user's default provider; falls back to a fixed provider when
    /// unset or unreadable. Never fails.
    pub fn default_provider(&self, user_id: &str) -> ProviderId {
        match self.settings.default_provider(user_id) {
            Ok(Some(provider)) => provider,
            Ok(None) => FALLBACK_PROVIDER,
            Err(err) => {
                tracing::warn!(user_id, error = %err, "Failed to read AI settings, using fallback provider");
                FALLBACK_PROVIDER
            }
        }
    }

    /// Resolve the user's default provider and decrypt its API key.
    pub fn resolve_api_key(&self, user_id: &str) -> VaultResult<ResolvedCredential> {
        let provider = self.default_provider(user_id);

        let row = self
            .keys
            .get(user_id, provider)
            .map_err(VaultError::Storage)?
            .ok_or_else(|| VaultError::MissingCredential {
                provider: provider.to_string(),
            })?;

        let api_key = self.encryptor.decrypt(&row.record)?;
        Ok(ResolvedCredential { provider, api_key })
    }

    /// Encrypt and store an API key; returns the display-only last4.
    pub fn store_api_key(
        &self,
        user_id: &str,
        provider: ProviderId,
        api_key: &str,
    ) -> VaultResult<String> {
        let record = self.encryptor.encrypt(api_key)?;
        let last4 = record.last4.clone();
        let now = chrono::Utc::now().timestamp_millis();

        let created_at = self
            .keys
            .get(user_id, provider)
            .map_err(VaultError::Storage)?
            .map(|existing| existing.created_at)
            .unwrap_or(now);

        self.keys
            .upsert(
                user_id,
                &StoredProviderKey {
                    provider,
                    record,
                    created_at,
                    updated_at: now,
                },
            )
            .map_err(VaultError::Storage)?;

        Ok(last4)
    }

    pub fn remove_api_key(&self, user_id: &str, provider: ProviderId) -> VaultResult<bool> {
        self.keys
            .delete(user_id, provider)
            .map_err(VaultError::Storage)
    }

    pub fn list_keys(&self, user_id: &str) -> VaultResult<Vec<ProviderKeyInfo>> {
        self.keys.list(user_id).map_err(VaultError::Storage)
    }

    pub fn has_any_key(&self, user_id: &str) -> VaultResult<bool> {
        Ok(self.keys.count(user_id).map_err(VaultError::Storage)? > 0)
    }

    pub fn set_default_provider(&self, user_id: &str, provider: ProviderId) -> VaultResult<()> {
        self.settings
            .set_default_provider(user_id, provider)
            .map_err(VaultError::Storage)
    }
}

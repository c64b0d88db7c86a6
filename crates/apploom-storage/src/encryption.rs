//! Authenticated encryption for stored provider API keys.
//!
//! Each key is sealed with AES-256-GCM under a server-held master key. The
//! nonce is freshly random per record, and the GCM tag is stored alongside
//! the ciphertext so tampering is detected at decrypt time. Only the
//! trailing four characters of the plaintext are kept in the clear, for
//! "configured, ends in XXXX" displays.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const NONCE_SIZE: usize = 12;
const TAG_SIZE: usize = 16;
const MASTER_KEY_LEN: usize = 32;

/// Environment variable holding the master key (64-char hex or base64).
pub const MASTER_KEY_ENV: &str = "APPLOOM_MASTER_KEY";

/// Errors raised by the credential vault.
#[derive(Error, Debug)]
pub enum VaultError {
    #[error("Master encryption key unavailable: {0}")]
    MasterKey(String),

    #[error("API key must not be empty")]
    InvalidInput,

    #[error("Failed to authenticate encrypted API key")]
    AuthenticationFailure,

    #[error("No API key configured for {provider}. Set one in Settings → API Keys.")]
    MissingCredential { provider: String },

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Result type alias for vault operations.
pub type VaultResult<T> = std::result::Result<T, VaultError>;

/// An encrypted API key record as persisted per (user, provider).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptedApiKey {
    pub iv: Vec<u8>,
    pub ciphertext: Vec<u8>,
    pub auth_tag: Vec<u8>,
    /// Trailing 4 characters of the trimmed plaintext, display only.
    pub last4: String,
}

/// The 32-byte master key protecting all stored API keys.
#[derive(Clone)]
pub struct MasterKey([u8; MASTER_KEY_LEN]);

impl MasterKey {
    /// Read the master key from the environment.
    pub fn from_env() -> VaultResult<Self> {
        let raw = std::env::var(MASTER_KEY_ENV)
            .map_err(|_| VaultError::MasterKey(format!("{MASTER_KEY_ENV} is not set")))?;
        Self::parse(&raw)
    }

    /// Parse a master key from its 64-char hex or base64 textual form.
    pub fn parse(raw: &str) -> VaultResult<Self> {
        let raw = raw.trim();
        let decoded = if raw.len() == 64 && raw.bytes().all(|b| b.is_ascii_hexdigit()) {
            hex::decode(raw).map_err(|e| VaultError::MasterKey(e.to_string()))?
        } else {
            STANDARD
                .decode(raw)
                .map_err(|e| VaultError::MasterKey(e.to_string()))?
        };

        Self::from_bytes(&decoded)
    }

    /// Build a master key from raw bytes, rejecting anything but 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> VaultResult<Self> {
        let key: [u8; MASTER_KEY_LEN] = bytes.try_into().map_err(|_| {
            VaultError::MasterKey(format!(
                "master key must decode to {MASTER_KEY_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(key))
    }
}

/// Seals and opens API keys under the master key.
pub struct ApiKeyEncryptor {
    cipher: Aes256Gcm,
}

impl ApiKeyEncryptor {
    pub fn new(master_key: &MasterKey) -> VaultResult<Self> {
        let cipher = Aes256Gcm::new_from_slice(&master_key.0)
            .map_err(|err| VaultError::MasterKey(format!("invalid master key: {err:?}")))?;
        Ok(Self { cipher })
    }

    /// Encrypt a plaintext API key with a fresh random nonce.
    pub fn encrypt(&self, api_key: &str) -> VaultResult<EncryptedApiKey> {
        let normalized = api_key.trim();
        if normalized.is_empty() {
            return Err(VaultError::InvalidInput);
        }

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let mut sealed = self
            .cipher
            .encrypt(nonce, normalized.as_bytes())
            .map_err(|_| VaultError::AuthenticationFailure)?;

        // aes-gcm appends the 16-byte tag to the ciphertext; store it apart.
        let auth_tag = sealed.split_off(sealed.len() - TAG_SIZE);
        let last4: String = {
            let chars: Vec<char> = normalized.chars().collect();
            chars[chars.len().saturating_sub(4)..].iter().collect()
        };

        Ok(EncryptedApiKey {
            iv: nonce_bytes.to_vec(),
            ciphertext: sealed,
            auth_tag,
            last4,
        })
    }

    /// Decrypt a stored record, verifying its authentication tag.
    pub fn decrypt(&self, record: &EncryptedApiKey) -> VaultResult<String> {
        if record.iv.len() != NONCE_SIZE || record.auth_tag.len() != TAG_SIZE {
            return Err(VaultError::AuthenticationFailure);
        }

        let nonce = Nonce::from_slice(&record.iv);
        let mut payload = Vec::with_capacity(record.ciphertext.len() + TAG_SIZE);
        payload.extend_from_slice(&record.ciphertext);
        payload.extend_from_slice(&record.auth_tag);

        let plaintext = self
            .cipher
            .decrypt(nonce, payload.as_slice())
            .map_err(|_| VaultError::AuthenticationFailure)?;

        String::from_utf8(plaintext).map_err(|_| VaultError::AuthenticationFailure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> MasterKey {
        MasterKey::from_bytes(&[0xAB; 32]).unwrap()
    }

    #[test]
    fn roundtrip() {
        let encryptor = ApiKeyEncryptor::new(&test_key()).unwrap();
        let record = encryptor.encrypt("sk-test-1234").unwrap();
        assert_eq!(encryptor.decrypt(&record).unwrap(), "sk-test-1234");
    }

    #[test]
    fn last4_comes_from_trimmed_plaintext() {
        let encryptor = ApiKeyEncryptor::new(&test_key()).unwrap();
        let record = encryptor.encrypt("  sk-live-abcd  ").unwrap();
        assert_eq!(record.last4, "abcd");
        assert_eq!(encryptor.decrypt(&record).unwrap(), "sk-live-abcd");
    }

    #[test]
    fn empty_and_whitespace_inputs_are_rejected() {
        let encryptor = ApiKeyEncryptor::new(&test_key()).unwrap();
        assert!(matches!(
            encryptor.encrypt(""),
            Err(VaultError::InvalidInput)
        ));
        assert!(matches!(
            encryptor.encrypt("   "),
            Err(VaultError::InvalidInput)
        ));
    }

    #[test]
    fn tampered_ciphertext_fails_authentication() {
        let encryptor = ApiKeyEncryptor::new(&test_key()).unwrap();
        let mut record = encryptor.encrypt("sk-secret").unwrap();
        record.ciphertext[0] ^= 0xFF;
        assert!(matches!(
            encryptor.decrypt(&record),
            Err(VaultError::AuthenticationFailure)
        ));
    }

    #[test]
    fn tampered_tag_fails_authentication() {
        let encryptor = ApiKeyEncryptor::new(&test_key()).unwrap();
        let mut record = encryptor.encrypt("sk-secret").unwrap();
        record.auth_tag[3] ^= 0x01;
        assert!(matches!(
            encryptor.decrypt(&record),
            Err(VaultError::AuthenticationFailure)
        ));
    }

    #[test]
    fn different_key_fails_authentication() {
        let encryptor_a = ApiKeyEncryptor::new(&test_key()).unwrap();
        let encryptor_b =
            ApiKeyEncryptor::new(&MasterKey::from_bytes(&[0x11; 32]).unwrap()).unwrap();
        let record = encryptor_a.encrypt("sk-secret").unwrap();
        assert!(matches!(
            encryptor_b.decrypt(&record),
            Err(VaultError::AuthenticationFailure)
        ));
    }

    #[test]
    fn nonce_is_unique_per_call() {
        let encryptor = ApiKeyEncryptor::new(&test_key()).unwrap();
        let a = encryptor.encrypt("same input").unwrap();
        let b = encryptor.encrypt("same input").unwrap();
        assert_ne!(a.iv, b.iv);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn master_key_length_is_validated() {
        assert!(matches!(
            MasterKey::from_bytes(&[0u8; 31]),
            Err(VaultError::MasterKey(_))
        ));
        assert!(matches!(
            MasterKey::from_bytes(&[0u8; 33]),
            Err(VaultError::MasterKey(_))
        ));
    }

    #[test]
    fn master_key_parses_hex_and_base64() {
        let hex_form = "ab".repeat(32);
        assert!(MasterKey::parse(&hex_form).is_ok());

        let b64_form = STANDARD.encode([0x42u8; 32]);
        assert!(MasterKey::parse(&b64_form).is_ok());

        assert!(matches!(
            MasterKey::parse("not a key"),
            Err(VaultError::MasterKey(_))
        ));
    }
}

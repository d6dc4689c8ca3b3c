//! Encrypted credential vault keyed by registry username.
//!
//! Usernames are trimmed on every entry point. Secrets are stored and
//! compared exactly as given; a blank secret counts as missing.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};

use crate::crypto::SecretCipher;
use crate::error::{RegistryError, Result};
use crate::store::{CredentialStore, SaveOutcome};

/// Result of checking a candidate secret against the vault.
///
/// Deliberately carries no reason: callers cannot tell an unknown user from
/// a wrong secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    /// The candidate matches the stored secret.
    Verified,
    /// No match, for whatever reason.
    Rejected,
}

impl Verification {
    /// Returns true for [`Verification::Verified`].
    #[must_use]
    pub const fn is_verified(self) -> bool {
        matches!(self, Self::Verified)
    }
}

/// A decrypted credential.
#[derive(Debug)]
pub struct Credential {
    /// Registry username.
    pub username: String,
    /// Decrypted access token.
    pub secret: SecretString,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the secret was last replaced.
    pub updated_at: DateTime<Utc>,
}

/// Stores registry access tokens encrypted at rest.
#[derive(Debug, Clone)]
pub struct CredentialVault {
    store: Arc<dyn CredentialStore>,
    cipher: Arc<SecretCipher>,
}

impl CredentialVault {
    /// Creates a vault over `store`, sealing secrets with `cipher`.
    #[must_use]
    pub fn new(store: Arc<dyn CredentialStore>, cipher: SecretCipher) -> Self {
        Self {
            store,
            cipher: Arc::new(cipher),
        }
    }

    /// Encrypts and stores `secret` for `username`.
    ///
    /// Updates the active record when one exists, inserts otherwise.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::Validation`] if either input is blank
    /// - [`RegistryError::Crypto`] if encryption fails
    /// - [`RegistryError::Persistence`] if the store fails
    pub async fn save(&self, username: &str, secret: &str) -> Result<SaveOutcome> {
        let username = require_username(username)?;
        if secret.trim().is_empty() {
            return Err(RegistryError::validation("secret must not be empty"));
        }

        let sealed = self.cipher.encrypt(secret.as_bytes())?;
        let outcome = self.store.upsert(username, &sealed).await?;

        tracing::info!(username, updated = outcome.is_update(), "Saved registry credentials");
        Ok(outcome)
    }

    /// Loads and decrypts the active credential for `username`.
    ///
    /// Returns `Ok(None)` when no active record exists.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::Persistence`] if the store fails
    /// - [`RegistryError::Crypto`] if the stored secret cannot be decrypted
    pub async fn get(&self, username: &str) -> Result<Option<Credential>> {
        let username = require_username(username)?;
        let Some(row) = self.store.find_active(username).await? else {
            return Ok(None);
        };

        let secret = self.cipher.decrypt_string(&row.encrypted_secret)?;
        Ok(Some(Credential {
            username: row.username,
            secret: SecretString::from(secret),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }))
    }

    /// Checks `candidate` against the stored secret for `username`.
    ///
    /// Never fails; lookup misses, store errors and decryption errors all
    /// yield [`Verification::Rejected`].
    pub async fn verify(&self, username: &str, candidate: &str) -> Verification {
        match self.get(username).await {
            Ok(Some(credential)) if credential.secret.expose_secret() == candidate => {
                Verification::Verified
            }
            Ok(Some(_)) => {
                tracing::debug!(username, "Credential check rejected: secret mismatch");
                Verification::Rejected
            }
            Ok(None) => {
                tracing::debug!(username, "Credential check rejected: no active record");
                Verification::Rejected
            }
            Err(e) => {
                tracing::debug!(username, error = %e, "Credential check rejected: lookup failed");
                Verification::Rejected
            }
        }
    }

    /// Soft-deactivates the active record for `username`.
    ///
    /// Returns true if a record was deactivated.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Persistence`] if the store fails.
    pub async fn deactivate(&self, username: &str) -> Result<bool> {
        let username = require_username(username)?;
        let changed = self.store.deactivate(username).await?;
        if changed {
            tracing::info!(username, "Deactivated registry credentials");
        }
        Ok(changed)
    }
}

fn require_username(username: &str) -> Result<&str> {
    let username = username.trim();
    if username.is_empty() {
        return Err(RegistryError::validation("username must not be empty"));
    }
    Ok(username)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::VaultKey;
    use crate::store::SqliteCredentialStore;

    fn vault() -> (CredentialVault, Arc<SqliteCredentialStore>) {
        let store = Arc::new(SqliteCredentialStore::in_memory().unwrap());
        let cipher = SecretCipher::new(&VaultKey::generate()).unwrap();
        (CredentialVault::new(store.clone(), cipher), store)
    }

    #[tokio::test]
    async fn test_save_then_get() {
        let (vault, _) = vault();
        let outcome = vault.save("alice", "dckr_pat_1").await.unwrap();
        assert_eq!(outcome, SaveOutcome::Inserted);

        let credential = vault.get("alice").await.unwrap().unwrap();
        assert_eq!(credential.username, "alice");
        assert_eq!(credential.secret.expose_secret(), "dckr_pat_1");
    }

    #[tokio::test]
    async fn test_secret_is_not_stored_in_clear() {
        let (vault, store) = vault();
        vault.save("alice", "dckr_pat_1").await.unwrap();
        let row = store.find_active("alice").await.unwrap().unwrap();
        assert!(!row.encrypted_secret.contains("dckr_pat_1"));
    }

    #[tokio::test]
    async fn test_second_save_updates_in_place() {
        let (vault, store) = vault();
        assert!(!vault.save("alice", "one").await.unwrap().is_update());
        assert!(vault.save("alice", "two").await.unwrap().is_update());
        assert_eq!(store.count_active("alice").await.unwrap(), 1);

        let credential = vault.get("alice").await.unwrap().unwrap();
        assert_eq!(credential.secret.expose_secret(), "two");
    }

    #[tokio::test]
    async fn test_get_unknown_user() {
        let (vault, _) = vault();
        assert!(vault.get("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_rejects_empty_inputs() {
        let (vault, _) = vault();
        assert!(matches!(
            vault.save("", "secret").await,
            Err(RegistryError::Validation { .. })
        ));
        assert!(matches!(
            vault.save("alice", "").await,
            Err(RegistryError::Validation { .. })
        ));
        assert!(matches!(
            vault.save("alice", "   ").await,
            Err(RegistryError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn test_username_trimmed_secret_kept() {
        let (vault, _) = vault();
        vault.save(" alice ", " spaced pat ").await.unwrap();

        let credential = vault.get("alice").await.unwrap().unwrap();
        assert_eq!(credential.username, "alice");
        assert_eq!(credential.secret.expose_secret(), " spaced pat ");
        assert!(vault.verify("alice ", " spaced pat ").await.is_verified());
        assert!(!vault.verify("alice", "spaced pat").await.is_verified());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_saves() {
        let (vault, store) = vault();
        let (a, b) = tokio::join!(vault.save("alice", "one"), vault.save("alice", "two"));
        let outcomes = [a.unwrap(), b.unwrap()];

        assert_eq!(outcomes.iter().filter(|o| !o.is_update()).count(), 1);
        assert_eq!(store.count_active("alice").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_verify_truth_table() {
        let (vault, _) = vault();
        vault.save("alice", "Secret").await.unwrap();

        assert_eq!(vault.verify("alice", "Secret").await, Verification::Verified);
        assert_eq!(vault.verify("alice", "secret").await, Verification::Rejected);
        assert_eq!(vault.verify("alice", "Secret ").await, Verification::Rejected);
        assert_eq!(vault.verify("bob", "Secret").await, Verification::Rejected);
        assert_eq!(vault.verify("", "Secret").await, Verification::Rejected);
    }

    #[tokio::test]
    async fn test_verify_after_overwrite() {
        let (vault, _) = vault();
        vault.save("alice", "old").await.unwrap();
        vault.save("alice", "new").await.unwrap();
        assert!(!vault.verify("alice", "old").await.is_verified());
        assert!(vault.verify("alice", "new").await.is_verified());
    }

    #[tokio::test]
    async fn test_verify_rejects_on_key_mismatch() {
        let store = Arc::new(SqliteCredentialStore::in_memory().unwrap());
        let writer = CredentialVault::new(
            store.clone(),
            SecretCipher::new(&VaultKey::generate()).unwrap(),
        );
        writer.save("alice", "secret").await.unwrap();

        let reader = CredentialVault::new(store, SecretCipher::new(&VaultKey::generate()).unwrap());
        assert_eq!(reader.verify("alice", "secret").await, Verification::Rejected);
        assert!(matches!(
            reader.get("alice").await,
            Err(RegistryError::Crypto { .. })
        ));
    }

    #[tokio::test]
    async fn test_deactivate() {
        let (vault, _) = vault();
        vault.save("alice", "secret").await.unwrap();
        assert!(vault.deactivate("alice").await.unwrap());
        assert!(vault.get("alice").await.unwrap().is_none());
        assert!(!vault.verify("alice", "secret").await.is_verified());

        // Saving again starts a fresh record.
        assert_eq!(
            vault.save("alice", "secret").await.unwrap(),
            SaveOutcome::Inserted
        );
    }
}

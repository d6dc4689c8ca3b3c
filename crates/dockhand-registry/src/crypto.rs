//! At-rest encryption for stored registry secrets.
//!
//! Secrets are sealed with AES-256-GCM. Each ciphertext carries its own
//! random nonce, so the encoded form is self-contained and two encryptions
//! of the same plaintext never match.
//!
//! The key has no built-in fallback: it must be supplied through
//! configuration (see [`ENCRYPTION_KEY_ENV`]).

use std::fmt;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::{rngs::OsRng, RngCore};
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};

use crate::error::{RegistryError, Result};

/// Environment variable holding the hex-encoded encryption key.
pub const ENCRYPTION_KEY_ENV: &str = "DOCKHAND_ENCRYPTION_KEY";

/// Length of the encryption key in bytes.
pub const KEY_LEN: usize = 32;

/// Symmetric key for the credential vault.
#[derive(Clone, PartialEq, Eq)]
pub struct VaultKey([u8; KEY_LEN]);

impl fmt::Debug for VaultKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("VaultKey(<redacted>)")
    }
}

impl VaultKey {
    /// Generates a random key.
    ///
    /// # Examples
    ///
    /// ```
    /// use dockhand_registry::VaultKey;
    ///
    /// let key = VaultKey::generate();
    /// assert_eq!(key.to_hex().len(), 64);
    /// ```
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Parses a key from 64 hex characters.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Config`] if the input is not exactly 32 hex-encoded bytes.
    pub fn from_hex(encoded: &str) -> Result<Self> {
        let bytes = hex::decode(encoded.trim())
            .map_err(|e| RegistryError::config(format!("encryption key is not valid hex: {e}")))?;
        let bytes: [u8; KEY_LEN] = bytes.try_into().map_err(|bytes: Vec<u8>| {
            RegistryError::config(format!(
                "encryption key must be {KEY_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(bytes))
    }

    /// Reads the key from [`ENCRYPTION_KEY_ENV`].
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Config`] if the variable is unset, empty, or malformed.
    pub fn from_env() -> Result<Self> {
        match std::env::var(ENCRYPTION_KEY_ENV) {
            Ok(value) if !value.trim().is_empty() => Self::from_hex(&value),
            _ => Err(RegistryError::config(format!(
                "{ENCRYPTION_KEY_ENV} must be set to a {}-character hex key",
                KEY_LEN * 2
            ))),
        }
    }

    /// Returns the hex encoding of the key.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

/// AES-256-GCM cipher bound to a [`VaultKey`].
pub struct SecretCipher {
    key: LessSafeKey,
}

impl fmt::Debug for SecretCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretCipher")
            .field("algorithm", &"AES-256-GCM")
            .finish_non_exhaustive()
    }
}

impl SecretCipher {
    /// Creates a cipher for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Crypto`] if the key material is rejected.
    pub fn new(key: &VaultKey) -> Result<Self> {
        let unbound = UnboundKey::new(&AES_256_GCM, &key.0)
            .map_err(|_| RegistryError::crypto("invalid key material"))?;
        Ok(Self {
            key: LessSafeKey::new(unbound),
        })
    }

    /// Encrypts `plaintext` and returns base64 of `nonce || ciphertext || tag`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Crypto`] if sealing fails.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<String> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);

        let mut in_out = plaintext.to_vec();
        self.key
            .seal_in_place_append_tag(
                Nonce::assume_unique_for_key(nonce_bytes),
                Aad::empty(),
                &mut in_out,
            )
            .map_err(|_| RegistryError::crypto("failed to encrypt secret"))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + in_out.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&in_out);
        Ok(BASE64.encode(sealed))
    }

    /// Decrypts a value produced by [`SecretCipher::encrypt`].
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Crypto`] if the input is not valid base64, is
    /// truncated, was sealed under another key, or was tampered with.
    pub fn decrypt(&self, encoded: &str) -> Result<Vec<u8>> {
        let sealed = BASE64
            .decode(encoded.trim())
            .map_err(|e| RegistryError::crypto(format!("ciphertext is not valid base64: {e}")))?;
        if sealed.len() < NONCE_LEN + AES_256_GCM.tag_len() {
            return Err(RegistryError::crypto("ciphertext is truncated"));
        }

        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
            .map_err(|_| RegistryError::crypto("invalid nonce"))?;
        let mut in_out = ciphertext.to_vec();
        let plaintext = self
            .key
            .open_in_place(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| RegistryError::crypto("failed to decrypt secret"))?;
        Ok(plaintext.to_vec())
    }

    /// Decrypts to a UTF-8 string.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Crypto`] if decryption fails or the plaintext is not UTF-8.
    pub fn decrypt_string(&self, encoded: &str) -> Result<String> {
        String::from_utf8(self.decrypt(encoded)?)
            .map_err(|_| RegistryError::crypto("decrypted secret is not valid UTF-8"))
    }
}

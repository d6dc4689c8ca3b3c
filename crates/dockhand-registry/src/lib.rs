//! # Dockhand Registry
//!
//! Query client for a public container registry, authenticating on behalf of
//! users whose access tokens are stored server-side, encrypted at rest.
//!
//! ## Features
//!
//! - **Catalog API**: repository search, details, tags, per-user listings
//! - **Registry API**: manifest lists and layer inspection with pull tokens
//! - **Credential Vault**: AES-256-GCM sealed tokens in SQLite
//! - **Response Cache**: in-memory, per-entry TTL, background sweeping
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use dockhand_registry::{
//!     CredentialVault, HubConfig, RegistryClient, SecretCipher, SqliteCredentialStore, VaultKey,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(SqliteCredentialStore::open("dockhand.db")?);
//!     let cipher = SecretCipher::new(&VaultKey::from_env()?)?;
//!     let client = RegistryClient::new(HubConfig::new(), CredentialVault::new(store, cipher))?;
//!
//!     let images = client.search("redis", Some(3), None, None).await?;
//!     println!("{} results", images.len());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    RegistryClient                           │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐  │
//! │  │ TokenBroker │  │ ExpiringCache│ │   oci (shaping)     │  │
//! │  └──────┬──────┘  └─────────────┘  └─────────────────────┘  │
//! │         ▼                                                   │
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │ CredentialVault (SecretCipher + CredentialStore)    │    │
//! │  └─────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │   Catalog API  ·  Token service  ·  Image registry          │
//! └─────────────────────────────────────────────────────────────┘
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod broker;
mod cache;
mod client;
mod config;
mod crypto;
mod error;
mod oci;
mod store;
mod vault;

pub use broker::{BearerToken, Realm, TokenBroker};
pub use cache::{
    CacheConfig, CacheKey, CachedValue, Clock, ExpiringCache, Identity, ManualClock,
    ResponseCache, SystemClock,
};
pub use client::{
    RegistryClient, DEFAULT_PAGE, DEFAULT_SEARCH_LIMIT, DEFAULT_TAG_LIMIT,
    REDACTED_REPOSITORY_FIELDS,
};
pub use config::{
    HubConfig, TtlConfig, DEFAULT_AUTH_URL, DEFAULT_HUB_URL, DEFAULT_REGISTRY_SERVICE,
    DEFAULT_REGISTRY_URL, OFFICIAL_NAMESPACE,
};
pub use crypto::{SecretCipher, VaultKey, ENCRYPTION_KEY_ENV, KEY_LEN};
pub use error::{RegistryError, Result};
pub use oci::{
    manifest_entries, validate_repository_name, ErrorResponse, ManifestSummary, MediaType,
    Reference, RegistryApiError, MAX_NAME_LEN, MAX_TAG_LEN, VERSION_ANNOTATION,
};
pub use store::{CredentialStore, SaveOutcome, SqliteCredentialStore, StoredCredential};
pub use vault::{Credential, CredentialVault, Verification};

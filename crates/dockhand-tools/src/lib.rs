//! # Dockhand Tools
//!
//! Tool surface over [`dockhand_registry::RegistryClient`]: definitions with
//! JSON input schemas, typed arguments, dispatch that renders every result
//! (including failures) as text, and a line-delimited JSON-RPC server that
//! keeps one client, and so one cache, alive across calls.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use dockhand_registry::{
//!     CredentialVault, HubConfig, RegistryClient, SecretCipher, SqliteCredentialStore, VaultKey,
//! };
//! use dockhand_tools::HubTools;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(SqliteCredentialStore::open("dockhand.db")?);
//!     let cipher = SecretCipher::new(&VaultKey::from_env()?)?;
//!     let client = RegistryClient::new(HubConfig::new(), CredentialVault::new(store, cipher))?;
//!     let tools = HubTools::new(client);
//!
//!     let output = tools.call("search_images", json!({ "query": "redis" })).await;
//!     println!("{}", output.text);
//!
//!     Ok(())
//! }
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod args;
mod definition;
mod error;
mod output;
mod server;
mod tools;

pub use args::{
    AnalyzeLayersArgs, ImageDetailsArgs, ListRepositoriesArgs, ListTagsArgs, ManifestArgs,
    SearchImagesArgs, VerifyCredentialsArgs,
};
pub use definition::{definitions, Tool, ToolDefinition};
pub use error::{Result, ToolError};
pub use output::ToolOutput;
pub use server::{ToolServer, PROTOCOL_VERSION, SERVER_NAME};
pub use tools::{HubTools, CREDENTIALS_VERIFIED};

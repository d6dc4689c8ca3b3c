//! CLI commands and argument parsing.

pub mod call;
pub mod credentials;
pub mod keygen;
pub mod serve;
pub mod tools;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use dockhand_registry::{
    CredentialVault, HubConfig, SecretCipher, SqliteCredentialStore, VaultKey,
    DEFAULT_AUTH_URL, DEFAULT_HUB_URL, DEFAULT_REGISTRY_URL, ENCRYPTION_KEY_ENV,
};

/// Dockhand - container registry queries as tools
#[derive(Parser)]
#[command(name = "dockhand")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Manage stored registry credentials
    Credentials(credentials::CredentialsArgs),

    /// List tool definitions as JSON
    Tools(tools::ToolsArgs),

    /// Invoke one tool and print its text
    Call(call::CallArgs),

    /// Serve tool calls as line-delimited JSON-RPC on stdin/stdout
    Serve(serve::ServeArgs),

    /// Generate a fresh encryption key
    Keygen(keygen::KeygenArgs),

    /// Print version information
    Version,
}

/// Credential vault location and key.
#[derive(Args, Debug, Clone)]
pub struct VaultArgs {
    /// Hex-encoded 32-byte encryption key
    #[arg(long, env = ENCRYPTION_KEY_ENV, hide_env_values = true)]
    pub encryption_key: Option<String>,

    /// Path to the credentials database
    #[arg(long, env = "DOCKHAND_DATABASE", default_value = "dockhand.db")]
    pub database: PathBuf,
}

impl VaultArgs {
    /// Opens the database and builds the vault.
    pub fn open(&self) -> Result<CredentialVault> {
        let Some(hex_key) = self.encryption_key.as_deref() else {
            anyhow::bail!(
                "No encryption key provided. Set {ENCRYPTION_KEY_ENV} or pass --encryption-key"
            );
        };
        let key = VaultKey::from_hex(hex_key).context("Invalid encryption key")?;
        let cipher = SecretCipher::new(&key)?;

        let store = SqliteCredentialStore::open(&self.database).with_context(|| {
            format!("Failed to open credentials database {}", self.database.display())
        })?;
        Ok(CredentialVault::new(Arc::new(store), cipher))
    }
}

/// Upstream endpoints.
#[derive(Args, Debug, Clone)]
pub struct HubArgs {
    /// Catalog API base URL
    #[arg(long, env = "DOCKHAND_HUB_URL", default_value = DEFAULT_HUB_URL)]
    pub hub_url: String,

    /// Token service base URL
    #[arg(long, env = "DOCKHAND_AUTH_URL", default_value = DEFAULT_AUTH_URL)]
    pub auth_url: String,

    /// Image registry base URL
    #[arg(long, env = "DOCKHAND_REGISTRY_URL", default_value = DEFAULT_REGISTRY_URL)]
    pub registry_url: String,

    /// Request timeout in seconds
    #[arg(long, env = "DOCKHAND_TIMEOUT", default_value = "30")]
    pub timeout: u64,
}

impl HubArgs {
    /// Builds the client configuration.
    pub fn config(&self) -> HubConfig {
        HubConfig::new()
            .with_hub_url(&self.hub_url)
            .with_auth_url(&self.auth_url)
            .with_registry_url(&self.registry_url)
            .with_timeout(Duration::from_secs(self.timeout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_hub_args_config() {
        let args = HubArgs {
            hub_url: "http://localhost:8080/".to_string(),
            auth_url: DEFAULT_AUTH_URL.to_string(),
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            timeout: 5,
        };
        let config = args.config();
        assert_eq!(config.hub_url, "http://localhost:8080");
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_vault_requires_key() {
        let dir = tempfile::tempdir().unwrap();
        let args = VaultArgs {
            encryption_key: None,
            database: dir.path().join("creds.db"),
        };
        let err = args.open().unwrap_err();
        assert!(err.to_string().contains(ENCRYPTION_KEY_ENV));

        let args = VaultArgs {
            encryption_key: Some("not-hex".to_string()),
            database: dir.path().join("creds.db"),
        };
        assert!(args.open().is_err());
    }

    #[test]
    fn test_vault_opens_with_key() {
        let dir = tempfile::tempdir().unwrap();
        let args = VaultArgs {
            encryption_key: Some(VaultKey::generate().to_hex()),
            database: dir.path().join("nested").join("creds.db"),
        };
        assert!(args.open().is_ok());
        assert!(args.database.exists());
    }
}

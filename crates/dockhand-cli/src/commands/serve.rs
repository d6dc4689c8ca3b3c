//! Serve command implementation.
//!
//! Runs the tool server on stdin/stdout for an agent host that spawns
//! Dockhand as a subprocess. Logs stay on stderr.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use dockhand_registry::{CacheConfig, RegistryClient, ResponseCache};
use dockhand_tools::{HubTools, ToolServer};
use tokio::io::BufReader;
use tracing::info;

use super::{HubArgs, VaultArgs};

/// Arguments for the serve command.
#[derive(Args)]
pub struct ServeArgs {
    /// Seconds between sweeps of expired cache entries
    #[arg(long, env = "DOCKHAND_SWEEP_INTERVAL", default_value = "300")]
    pub sweep_interval: u64,

    #[command(flatten)]
    pub vault: VaultArgs,

    #[command(flatten)]
    pub hub: HubArgs,
}

impl ServeArgs {
    fn cache_config(&self) -> Result<CacheConfig> {
        if self.sweep_interval == 0 {
            anyhow::bail!("--sweep-interval must be at least 1 second");
        }
        Ok(CacheConfig::default().with_sweep_interval(Duration::from_secs(self.sweep_interval)))
    }
}

/// Runs the serve command until stdin closes.
///
/// # Errors
///
/// Returns an error if the vault or client cannot be set up, or if reading
/// stdin or writing stdout fails.
pub async fn run(args: ServeArgs) -> Result<()> {
    let cache = Arc::new(ResponseCache::new(args.cache_config()?));
    let vault = args.vault.open()?;
    let client = RegistryClient::with_cache(args.hub.config(), vault, cache)
        .context("Failed to create registry client")?;
    info!(
        hub_url = %client.config().hub_url,
        sweeping = client.is_sweeping(),
        "Starting tool server on stdio"
    );

    let server = ToolServer::new(HubTools::new(client));
    server
        .serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await
        .context("Tool server I/O failed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use dockhand_registry::{DEFAULT_AUTH_URL, DEFAULT_HUB_URL, DEFAULT_REGISTRY_URL};

    fn args(sweep_interval: u64) -> ServeArgs {
        ServeArgs {
            sweep_interval,
            vault: VaultArgs {
                encryption_key: None,
                database: "unused.db".into(),
            },
            hub: HubArgs {
                hub_url: DEFAULT_HUB_URL.to_string(),
                auth_url: DEFAULT_AUTH_URL.to_string(),
                registry_url: DEFAULT_REGISTRY_URL.to_string(),
                timeout: 30,
            },
        }
    }

    #[test]
    fn test_cache_config_uses_sweep_interval() {
        let config = args(60).cache_config().unwrap();
        assert_eq!(config.sweep_interval, Duration::from_secs(60));
        assert!(args(0).cache_config().is_err());
    }

    #[tokio::test]
    async fn test_run_requires_encryption_key() {
        let err = run(args(60)).await.unwrap_err();
        assert!(err.to_string().contains("encryption key"));
    }
}

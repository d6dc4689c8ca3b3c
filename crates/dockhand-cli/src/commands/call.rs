//! Call command implementation.
//!
//! Runs a single tool call through the same dispatch an agent would use.

use anyhow::{Context, Result};
use clap::Args;
use dockhand_registry::RegistryClient;
use dockhand_tools::HubTools;
use serde_json::Value;
use tracing::info;

use super::{HubArgs, VaultArgs};

/// Arguments for the call command.
#[derive(Args)]
pub struct CallArgs {
    /// Tool name (see `dockhand tools`)
    pub tool: String,

    /// Tool arguments as a JSON object
    #[arg(long, default_value = "{}")]
    pub args: String,

    #[command(flatten)]
    pub vault: VaultArgs,

    #[command(flatten)]
    pub hub: HubArgs,
}

/// Runs the call command.
///
/// # Errors
///
/// Returns an error if the arguments are not JSON, the client cannot be
/// built, or the tool reports a failure.
pub async fn run(args: CallArgs) -> Result<()> {
    let arguments = parse_arguments(&args.args)?;
    let vault = args.vault.open()?;
    let client = RegistryClient::new(args.hub.config(), vault)
        .context("Failed to create registry client")?;
    let tools = HubTools::new(client);

    info!(tool = %args.tool, "Calling tool");
    let output = tools.call(&args.tool, arguments).await;
    if output.is_error {
        anyhow::bail!("{}", output.text);
    }

    println!("{}", output.text);
    Ok(())
}

fn parse_arguments(raw: &str) -> Result<Value> {
    let value: Value = serde_json::from_str(raw).context("--args must be valid JSON")?;
    if !value.is_object() {
        anyhow::bail!("--args must be a JSON object");
    }
    Ok(value)
}

//! Credentials command implementation.
//!
//! Saves, checks and deactivates the registry access tokens held in the
//! encrypted vault.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use dockhand_registry::{CredentialVault, SaveOutcome, Verification};
use tracing::info;

use super::VaultArgs;

/// Arguments for the credentials command.
#[derive(Args)]
pub struct CredentialsArgs {
    #[command(flatten)]
    pub vault: VaultArgs,

    #[command(subcommand)]
    pub action: CredentialsAction,
}

/// Credential operations.
///
/// Usernames are trimmed; tokens are used exactly as given.
#[derive(Subcommand)]
pub enum CredentialsAction {
    /// Encrypt and store an access token for a user
    Save {
        /// Registry username
        username: String,

        /// Personal access token
        #[arg(long, env = "DOCKHAND_PAT", hide_env_values = true)]
        pat: String,
    },

    /// Check an access token against the stored one
    Verify {
        /// Registry username
        username: String,

        /// Personal access token
        #[arg(long, env = "DOCKHAND_PAT", hide_env_values = true)]
        pat: String,
    },

    /// Deactivate the stored credentials of a user
    Deactivate {
        /// Registry username
        username: String,
    },
}

/// Runs the credentials command.
///
/// # Errors
///
/// Returns an error if the vault cannot be opened, the store fails, or a
/// verification is rejected.
pub async fn run(args: CredentialsArgs) -> Result<()> {
    let vault = args.vault.open()?;
    execute(&vault, args.action).await
}

async fn execute(vault: &CredentialVault, action: CredentialsAction) -> Result<()> {
    match action {
        CredentialsAction::Save { username, pat } => {
            info!(username = %username, "Saving credentials");
            let outcome = vault
                .save(&username, &pat)
                .await
                .context("Failed to save credentials")?;
            match outcome {
                SaveOutcome::Inserted => println!("Saved credentials for {}", username.trim()),
                SaveOutcome::Updated => println!("Updated credentials for {}", username.trim()),
            }
        }
        CredentialsAction::Verify { username, pat } => {
            match vault.verify(&username, &pat).await {
                Verification::Verified => println!("Credentials verified successfully"),
                Verification::Rejected => {
                    anyhow::bail!("Credentials verification failed for {}", username.trim())
                }
            }
        }
        CredentialsAction::Deactivate { username } => {
            if vault
                .deactivate(&username)
                .await
                .context("Failed to deactivate credentials")?
            {
                println!("Deactivated credentials for {}", username.trim());
            } else {
                println!("No active credentials for {}", username.trim());
            }
        }
    }
    Ok(())
}

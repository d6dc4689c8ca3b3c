//! Keygen command implementation.

use clap::Args;
use dockhand_registry::{VaultKey, ENCRYPTION_KEY_ENV};

/// Arguments for the keygen command.
#[derive(Args)]
pub struct KeygenArgs {
    /// Print as a shell `export` line
    #[arg(long)]
    pub export: bool,
}

/// Prints a fresh random encryption key.
pub fn run(args: &KeygenArgs) {
    println!("{}", render(&VaultKey::generate(), args.export));
}

fn render(key: &VaultKey, export: bool) -> String {
    if export {
        format!("export {ENCRYPTION_KEY_ENV}={}", key.to_hex())
    } else {
        key.to_hex()
    }
}

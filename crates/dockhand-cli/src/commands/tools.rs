//! Tools command implementation.

use anyhow::Result;
use clap::Args;
use dockhand_tools::{definitions, Tool};

/// Arguments for the tools command.
#[derive(Args)]
pub struct ToolsArgs {
    /// Only print tool names
    #[arg(long)]
    pub names_only: bool,
}

/// Prints the tool definitions.
///
/// # Errors
///
/// Returns an error if the definitions cannot be serialized.
pub fn run(args: &ToolsArgs) -> Result<()> {
    if args.names_only {
        for tool in Tool::ALL {
            println!("{tool}");
        }
        return Ok(());
    }

    println!("{}", serde_json::to_string_pretty(&definitions())?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_both_modes() {
        assert!(run(&ToolsArgs { names_only: true }).is_ok());
        assert!(run(&ToolsArgs { names_only: false }).is_ok());
    }
}

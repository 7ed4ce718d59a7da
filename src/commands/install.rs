//! # Install Command Implementation
//!
//! Installs every configured package plus the URLs given on the command
//! line, together with their dependencies. Problems with individual packages
//! are logged as they happen; the command fails at the end when any
//! requested package is not installed.

use anyhow::Result;
use clap::Args;

use super::{resolve, SystemArgs};

/// Install configured and given packages with their dependencies
#[derive(Args, Debug)]
pub struct InstallArgs {
    #[command(flatten)]
    pub system: SystemArgs,

    /// Only report failures.
    #[arg(short, long)]
    pub quiet: bool,
}

/// Execute the `install` command.
pub fn execute(args: InstallArgs) -> Result<()> {
    let resolved = resolve(&args.system)?;

    if !args.quiet {
        for (id, package) in resolved.system.packages() {
            if !package.is_installed() {
                continue;
            }
            let marker = if resolved.roots.iter().any(|(root, _)| *root == id) {
                ""
            } else {
                " (dependency)"
            };
            println!(
                "✅ {} -> {}{}",
                package.name(),
                package.installed_root().display(),
                marker
            );
        }
    }

    let failures = resolved.failures();
    if !failures.is_empty() {
        anyhow::bail!("Failed to install: {}", failures.join(", "));
    }
    Ok(())
}

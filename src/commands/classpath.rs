//! # Classpath Command Implementation
//!
//! Installs the requested packages and prints the class path they form:
//! artifacts in depth-first order from the roots, each listed once, joined
//! with the platform path separator.

use anyhow::Result;
use clap::Args;

use super::{resolve, SystemArgs};

/// Install packages and print their class path
#[derive(Args, Debug)]
pub struct ClasspathArgs {
    #[command(flatten)]
    pub system: SystemArgs,

    /// Print one entry per line instead of a joined class path.
    #[arg(long)]
    pub lines: bool,
}

/// Execute the `classpath` command.
pub fn execute(args: ClasspathArgs) -> Result<()> {
    let resolved = resolve(&args.system)?;

    let failures = resolved.failures();
    if !failures.is_empty() {
        anyhow::bail!("Failed to install: {}", failures.join(", "));
    }

    let roots = resolved.root_ids();
    if args.lines {
        for entry in resolved.system.class_path_entries(&roots) {
            println!("{}", entry.display());
        }
    } else {
        println!("{}", resolved.system.class_path_of(&roots));
    }
    Ok(())
}

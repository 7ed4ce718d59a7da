//! # List Command Implementation
//!
//! Lists the package records saved under the package root by earlier
//! installs. Nothing is fetched.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use repo_packages::metadata::{PackageRecord, PackageStore};

use super::{load_config, package_root};

/// List installed packages
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Path to the configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// The root directory for installed packages.
    #[arg(long, value_name = "DIR", env = "REPO_PACKAGES_ROOT")]
    pub package_root: Option<PathBuf>,

    /// Print the records as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Execute the `list` command.
pub fn execute(args: ListArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let root = package_root(args.package_root.as_deref(), &config);
    let records = PackageStore::for_root(&root).list();

    if args.json {
        let json = serde_json::to_string_pretty(&records)
            .context("Failed to serialize package records")?;
        println!("{}", json);
        return Ok(());
    }

    if records.is_empty() {
        println!("No packages installed under {}", root.display());
        return Ok(());
    }
    for record in &records {
        println!("{}", format_record(record));
    }
    Ok(())
}

fn format_record(record: &PackageRecord) -> String {
    let source = record
        .current_source
        .and_then(|index| record.sources.get(index))
        .map_or("-", |source| source.url.as_str());
    let mut line = format!("{}  {}", record.name, source);
    if !record.dependencies.is_empty() {
        line.push_str(&format!("  ({} dependencies)", record.dependencies.len()));
    }
    line
}

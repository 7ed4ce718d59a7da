//! # Repository Packages CLI
//!
//! This is the binary entry point for the `repo-packages` command-line tool.
//! It parses the command line with `clap` and hands the chosen subcommand to
//! `cli::Cli::execute`; the package logic lives in the `repo_packages`
//! library crate.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}

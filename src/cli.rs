//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands;

/// Repository Packages - Install and cache git, scp, URL and Maven packages
#[derive(Parser, Debug)]
#[command(name = "repo-packages")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Install configured and given packages with their dependencies
    Install(commands::install::InstallArgs),

    /// Install packages and print their class path
    Classpath(commands::classpath::ClasspathArgs),

    /// Install packages and display their dependency tree
    Tree(commands::tree::TreeArgs),

    /// List packages recorded under the package root
    List(commands::list::ListArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        // RUST_LOG takes precedence over --log-level when set.
        env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or(self.log_level.as_str()),
        )
        .format_timestamp(None)
        .try_init()
        .ok();

        match self.command {
            Commands::Install(args) => commands::install::execute(args),
            Commands::Classpath(args) => commands::classpath::execute(args),
            Commands::Tree(args) => commands::tree::execute(args),
            Commands::List(args) => commands::list::execute(args),
            Commands::Completions(args) => commands::completions::execute(args),
        }
    }
}

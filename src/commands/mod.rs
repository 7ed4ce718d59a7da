//! # CLI Command Implementations
//!
//! This module contains the implementation for each subcommand of the
//! `repo-packages` command-line tool. Each subcommand is defined in its own
//! file with an `Args` struct derived using `clap` and an `execute` function.
//!
//! The commands that resolve packages share `SystemArgs` and `resolve`, which
//! load the configuration file, apply the command-line overrides and build a
//! `RepositorySystem` with the requested packages added.

pub mod classpath;
pub mod completions;
pub mod install;
pub mod list;
pub mod tree;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use repo_packages::config::{self, Config, PackageSpec, DEFAULT_CONFIG_FILE};
use repo_packages::maven::MavenRepository;
use repo_packages::package::PackageId;
use repo_packages::system::RepositorySystem;

/// Options shared by the commands that resolve packages.
#[derive(Args, Debug, Clone, Default)]
pub struct SystemArgs {
    /// Path to the configuration file.
    ///
    /// Defaults to `repo-packages.yaml` in the current directory, which may
    /// be absent.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// The root directory for installed packages.
    ///
    /// If not provided, it defaults to `package_root` from the configuration
    /// file, then to the system's cache directory
    /// (e.g., `~/.cache/repo-packages` on Linux).
    #[arg(long, value_name = "DIR", env = "REPO_PACKAGES_ROOT")]
    pub package_root: Option<PathBuf>,

    /// Maven mirror base URL; repeat to try several in order.
    #[arg(long = "mirror", value_name = "URL")]
    pub mirrors: Vec<String>,

    /// Re-check every package with its repository and refresh it.
    #[arg(long)]
    pub update: bool,

    /// Package URLs to install in addition to the configured ones.
    #[arg(value_name = "URL")]
    pub urls: Vec<String>,
}

/// A system with the requested packages added.
pub struct Resolved {
    pub system: RepositorySystem,
    /// Root packages and whether each was meant to be installed.
    pub roots: Vec<(PackageId, bool)>,
}

impl Resolved {
    pub fn root_ids(&self) -> Vec<PackageId> {
        self.roots.iter().map(|(id, _)| *id).collect()
    }

    /// Names of requested packages that did not install.
    pub fn failures(&self) -> Vec<String> {
        self.roots
            .iter()
            .filter(|(_, install)| *install)
            .filter_map(|(id, _)| self.system.package(*id))
            .filter(|package| !package.is_installed())
            .map(|package| package.name().to_string())
            .collect()
    }
}

/// Load the configuration named by `path`, or the default file when it
/// exists.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => config::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => {
            let default = Path::new(DEFAULT_CONFIG_FILE);
            if default.exists() {
                config::from_file(default).with_context(|| {
                    format!("Failed to load config from {}", default.display())
                })
            } else {
                Ok(Config::default())
            }
        }
    }
}

/// Package root from the flag, the configuration, or the cache directory.
pub fn package_root(flag: Option<&Path>, config: &Config) -> PathBuf {
    flag.map(Path::to_path_buf)
        .or_else(|| config.package_root.clone())
        .unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from(".repo-packages-cache"))
                .join("repo-packages")
        })
}

/// Build the system and add (and install) every requested package.
pub fn resolve(args: &SystemArgs) -> Result<Resolved> {
    let config = load_config(args.config.as_deref())?;
    let root = package_root(args.package_root.as_deref(), &config);

    let mirrors = if args.mirrors.is_empty() {
        config.mirrors.clone()
    } else {
        args.mirrors.clone()
    };
    let mut system = RepositorySystem::with_default_managers(&root, MavenRepository::new(mirrors));
    system.set_update(args.update || config.update);
    system.set_layer(config.layer.clone());
    for name in &config.inactive {
        if let Some(manager) = system.manager_mut(name) {
            manager.set_active(false);
        }
    }

    let requested = config
        .packages
        .iter()
        .cloned()
        .chain(args.urls.iter().cloned().map(PackageSpec::Url));

    let mut roots = Vec::new();
    for spec in requested {
        if let Some(id) = system.add_package_with(spec.url(), &spec.options(), spec.install()) {
            if !roots.iter().any(|(existing, _)| *existing == id) {
                roots.push((id, spec.install()));
            }
        } else {
            anyhow::bail!("Could not resolve package url {}", spec.url());
        }
    }

    Ok(Resolved { system, roots })
}

//! # Configuration File
//!
//! A build lists its packages in `repo-packages.yaml`:
//!
//! ```yaml
//! package_root: .packages-cache
//! update: false
//! layer: app
//! mirrors:
//!   - https://repo1.maven.org/maven2
//! inactive: [scp]
//! packages:
//!   - mvn://junit/junit/4.12
//!   - url: url://downloads.example.com/tools/kit.zip
//!     file_name: kit
//!     unzip: true
//!     install: false
//! ```
//!
//! Packages are either a bare URL or a mapping with per-package options.
//! Every field is optional; command-line flags override the file.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::system::PackageOptions;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "repo-packages.yaml";

/// Schemes of the built-in repository managers.
pub const KNOWN_MANAGERS: [&str; 5] = ["file", "git", "scp", "url", "mvn"];

/// Parsed `repo-packages.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Root below which each manager keeps its packages.
    #[serde(default)]
    pub package_root: Option<PathBuf>,
    /// Re-check every package with its manager and refresh it.
    #[serde(default)]
    pub update: bool,
    /// Maven mirror base URLs, tried in order.
    #[serde(default)]
    pub mirrors: Vec<String>,
    /// Managers to disable for this run.
    #[serde(default)]
    pub inactive: Vec<String>,
    /// Name of the layer requesting the packages.
    #[serde(default)]
    pub layer: Option<String>,
    #[serde(default)]
    pub packages: Vec<PackageSpec>,
}

/// One entry of `packages`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PackageSpec {
    Url(String),
    Entry(PackageEntry),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageEntry {
    pub url: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub unzip: Option<bool>,
    /// Install the package, not only declare it.
    #[serde(default = "default_install")]
    pub install: bool,
}

fn default_install() -> bool {
    true
}

impl PackageSpec {
    pub fn url(&self) -> &str {
        match self {
            PackageSpec::Url(url) => url,
            PackageSpec::Entry(entry) => &entry.url,
        }
    }

    pub fn install(&self) -> bool {
        match self {
            PackageSpec::Url(_) => true,
            PackageSpec::Entry(entry) => entry.install,
        }
    }

    pub fn options(&self) -> PackageOptions {
        match self {
            PackageSpec::Url(_) => PackageOptions::default(),
            PackageSpec::Entry(entry) => PackageOptions {
                file_name: entry.file_name.clone(),
                unzip: entry.unzip,
            },
        }
    }
}

/// Parse configuration text.
pub fn parse(yaml_content: &str) -> Result<Config> {
    if yaml_content.trim().is_empty() {
        return Ok(Config::default());
    }
    let config: Config = serde_yaml::from_str(yaml_content)?;
    validate(&config)?;
    Ok(config)
}

/// Load and parse a configuration file.
pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = fs::read_to_string(path)?;
    parse(&content)
}

fn validate(config: &Config) -> Result<()> {
    for name in &config.inactive {
        if !KNOWN_MANAGERS.contains(&name.as_str()) {
            return Err(Error::ConfigParse {
                message: format!("Unknown repository manager '{}' in inactive", name),
                hint: Some(format!("Known managers: {}", KNOWN_MANAGERS.join(", "))),
            });
        }
    }

    let mut seen = HashSet::new();
    for package in &config.packages {
        let url = package.url();
        if !url.contains("://") {
            return Err(Error::ConfigParse {
                message: format!("Package '{}' is not a <scheme>://<location> url", url),
                hint: Some("For example: mvn://junit/junit/4.12".to_string()),
            });
        }
        if !seen.insert(url) {
            return Err(Error::ConfigParse {
                message: format!("Package '{}' is listed more than once", url),
                hint: None,
            });
        }
    }
    Ok(())
}

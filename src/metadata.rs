//! # Persisted Package Records
//!
//! Each installed package leaves one JSON record under
//! `<package_root>/.packages/`. A later run uses the record to adopt the
//! earlier install result (current source, class definitions, dependency
//! URLs) without asking the managers again.
//!
//! Records carry a schema version. A record that does not parse or whose
//! version differs from `SCHEMA_VERSION` is deleted and treated as absent.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::package::{RepositoryPackage, RepositorySource};

/// Version of the record layout written by this build.
pub const SCHEMA_VERSION: u32 = 1;

/// Directory below the package root holding the records.
pub const STORE_DIR: &str = ".packages";

/// Saved outcome of one package install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
    pub schema_version: u32,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    pub sources: Vec<RepositorySource>,
    pub current_source: Option<usize>,
    /// URLs of the packages this one depends on.
    #[serde(default)]
    pub dependencies: Vec<String>,
    pub defines_classes: bool,
}

impl PackageRecord {
    /// Snapshot an installed package with its dependency URLs.
    pub fn from_package(package: &RepositoryPackage, dependencies: Vec<String>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            name: package.name().to_string(),
            file_name: package.file_name().map(str::to_string),
            sources: package.sources().to_vec(),
            current_source: package.current_source_index(),
            dependencies,
            defines_classes: package.defines_classes(),
        }
    }

    /// True when the record describes the same declaration as `package`:
    /// same file name, and the declared sources are a prefix of the saved
    /// ones. A record without a current source never matches.
    pub fn matches(&self, package: &RepositoryPackage) -> bool {
        let declared = package.sources();
        self.current_source
            .is_some_and(|index| index < self.sources.len())
            && self.file_name.as_deref() == package.file_name()
            && declared.len() <= self.sources.len()
            && self.sources[..declared.len()] == *declared
    }
}

/// Directory of JSON package records.
#[derive(Debug, Clone)]
pub struct PackageStore {
    dir: PathBuf,
}

impl PackageStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The store belonging to a package root.
    pub fn for_root(package_root: &Path) -> Self {
        Self::new(package_root.join(STORE_DIR))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Record path for a package name. Maven names contain `/`; it is
    /// percent-encoded (as is `%` itself) so every record sits directly in
    /// the store directory and distinct names never share a file.
    pub fn record_path(&self, name: &str) -> PathBuf {
        let encoded = name.replace('%', "%25").replace('/', "%2F");
        self.dir.join(format!("{}.json", encoded))
    }

    /// Load the record for `name`. Unreadable, corrupt or outdated records
    /// are removed and reported as absent.
    pub fn load(&self, name: &str) -> Option<PackageRecord> {
        let path = self.record_path(name);
        let text = fs::read_to_string(&path).ok()?;

        match parse_record(&text) {
            Ok(record) if record.name == name => Some(record),
            Ok(record) => {
                self.discard(&path, &format!("record names package {}", record.name));
                None
            }
            Err(reason) => {
                self.discard(&path, &reason);
                None
            }
        }
    }

    pub fn save(&self, record: &PackageRecord) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.record_path(&record.name);
        let json = serde_json::to_string_pretty(record).map_err(|e| Error::Metadata {
            package: record.name.clone(),
            message: e.to_string(),
        })?;
        fs::write(&path, json)?;
        debug!("Saved package record {}", path.display());
        Ok(())
    }

    pub fn remove(&self, name: &str) {
        let path = self.record_path(name);
        if path.exists() {
            if let Err(e) = fs::remove_file(&path) {
                warn!("Could not remove package record {}: {}", path.display(), e);
            }
        }
    }

    /// Every valid record in the store, sorted by package name.
    pub fn list(&self) -> Vec<PackageRecord> {
        let mut records: Vec<PackageRecord> = WalkDir::new(&self.dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                entry.file_type().is_file()
                    && entry.path().extension().is_some_and(|ext| ext == "json")
            })
            .filter_map(|entry| {
                let text = fs::read_to_string(entry.path()).ok()?;
                parse_record(&text).ok()
            })
            .collect();
        records.sort_by(|a, b| a.name.cmp(&b.name));
        records
    }

    fn discard(&self, path: &Path, reason: &str) {
        warn!(
            "Discarding package record {}: {}",
            path.display(),
            reason
        );
        if let Err(e) = fs::remove_file(path) {
            warn!("Could not remove package record {}: {}", path.display(), e);
        }
    }
}

/// Check the schema version before binding the full record so an older
/// layout is reported as outdated rather than malformed.
fn parse_record(text: &str) -> std::result::Result<PackageRecord, String> {
    let value: serde_json::Value = serde_json::from_str(text).map_err(|e| e.to_string())?;
    match value.get("schema_version").and_then(|v| v.as_u64()) {
        Some(version) if version == u64::from(SCHEMA_VERSION) => {}
        Some(version) => return Err(format!("schema version {} is not supported", version)),
        None => return Err("missing schema version".to_string()),
    }
    serde_json::from_value(value).map_err(|e| e.to_string())
}

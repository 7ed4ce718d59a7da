//! # Packages and Sources
//!
//! A `RepositoryPackage` is a named unit of third-party code with one or more
//! candidate `RepositorySource`s. Sources are tried in declaration order; the
//! first one whose manager fetches it successfully becomes the package's
//! current source.
//!
//! Packages live in an arena owned by the `RepositorySystem` and refer to
//! each other through `PackageId`s, so dependency cycles are plain data.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::dependency::DependencyContext;
use crate::error::{Error, Result};

/// True when `segment` names a single entry directly below a directory.
pub fn is_valid_name_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains(['/', '\\', ':'])
}

/// True when every `/`-separated segment of `name` is valid, so joining
/// `name` onto a directory stays inside it.
pub fn is_valid_package_name(name: &str) -> bool {
    name.split('/').all(is_valid_name_segment)
}

/// Index of a package in its `RepositorySystem`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageId(pub usize);

/// One fetchable location of a package.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositorySource {
    /// Name of the manager that fetches this source.
    pub manager: String,
    pub url: String,
    /// Extract the fetched archive into the install root.
    pub unzip: bool,
}

impl RepositorySource {
    pub fn new(manager: impl Into<String>, url: impl Into<String>, unzip: bool) -> Self {
        Self {
            manager: manager.into(),
            url: url.into(),
            unzip,
        }
    }
}

/// A package and its install state.
#[derive(Debug, Clone)]
pub struct RepositoryPackage {
    name: String,
    file_name: Option<String>,
    sources: Vec<RepositorySource>,
    current_source: Option<usize>,
    installed_root: PathBuf,
    installed: bool,
    defines_classes: bool,
    /// Class-path artifact relative to the install root.
    artifact: Option<String>,
    dependencies: Vec<PackageId>,
    context: Option<Arc<DependencyContext>>,
}

impl RepositoryPackage {
    pub fn new(name: impl Into<String>, source: RepositorySource) -> Self {
        Self {
            name: name.into(),
            file_name: None,
            sources: vec![source],
            current_source: None,
            installed_root: PathBuf::new(),
            installed: false,
            defines_classes: false,
            artifact: None,
            dependencies: Vec::new(),
            context: None,
        }
    }

    /// Mark the package as providing a class-path artifact at `artifact`
    /// (relative to the install root).
    pub fn with_artifact(mut self, artifact: impl Into<String>) -> Self {
        self.artifact = Some(artifact.into());
        self.defines_classes = true;
        self
    }

    /// Override the unzip flag of every declared source.
    pub fn with_unzip(mut self, unzip: bool) -> Self {
        for source in &mut self.sources {
            source.unzip = unzip;
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directory name override for the install root.
    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn set_file_name(&mut self, file_name: Option<String>) {
        self.file_name = file_name;
    }

    pub fn sources(&self) -> &[RepositorySource] {
        &self.sources
    }

    /// Name of the manager owning the install root: the manager of the
    /// first declared source.
    pub fn owning_manager(&self) -> &str {
        self.sources
            .first()
            .map(|source| source.manager.as_str())
            .unwrap_or_default()
    }

    /// Append an alternative source. Returns `false` if an equal source was
    /// already declared.
    pub fn add_new_source(&mut self, source: RepositorySource) -> bool {
        if self.sources.contains(&source) {
            return false;
        }
        debug!("Package {} gains alternative source {}", self.name, source.url);
        self.sources.push(source);
        true
    }

    pub fn current_source(&self) -> Option<&RepositorySource> {
        self.current_source.and_then(|index| self.sources.get(index))
    }

    pub fn current_source_index(&self) -> Option<usize> {
        self.current_source
    }

    pub fn installed_root(&self) -> &Path {
        &self.installed_root
    }

    /// Recompute the install root from the owning manager's package root.
    pub fn update_installed_root(&mut self, package_root: &Path) {
        let dir = self.file_name.as_deref().unwrap_or(&self.name);
        self.installed_root = package_root.join(dir);
    }

    pub fn is_installed(&self) -> bool {
        self.installed
    }

    pub fn defines_classes(&self) -> bool {
        self.defines_classes
    }

    pub fn set_defines_classes(&mut self, defines_classes: bool) {
        self.defines_classes = defines_classes;
    }

    pub fn dependencies(&self) -> &[PackageId] {
        &self.dependencies
    }

    pub fn set_dependencies(&mut self, dependencies: Vec<PackageId>) {
        self.dependencies = dependencies;
    }

    pub fn context(&self) -> Option<&Arc<DependencyContext>> {
        self.context.as_ref()
    }

    /// Keep whichever of the current and the new request context has
    /// priority.
    pub fn merge_context(&mut self, context: &Arc<DependencyContext>) {
        self.context = Some(match &self.context {
            Some(existing) => DependencyContext::merge(existing, context),
            None => Arc::clone(context),
        });
    }

    /// Path contributed to the class path, once installed.
    pub fn class_path_entry(&self) -> Option<PathBuf> {
        if !self.installed || !self.defines_classes {
            return None;
        }
        Some(match &self.artifact {
            Some(artifact) => self.installed_root.join(artifact),
            None => self.installed_root.clone(),
        })
    }

    /// Try each source in order until `fetch` succeeds.
    ///
    /// `fetch` returns `None` for a source whose manager is inactive. On
    /// success the source becomes current and its value is returned; when
    /// every active source fails the per-source errors are combined.
    pub fn install<T, F>(&mut self, mut fetch: F) -> Result<T>
    where
        F: FnMut(&RepositorySource) -> Option<Result<T>>,
    {
        self.installed = false;
        self.current_source = None;
        let mut errors = Vec::new();

        for (index, source) in self.sources.iter().enumerate() {
            let Some(result) = fetch(source) else {
                debug!(
                    "Skipping source {} of {}: manager {} is inactive",
                    source.url, self.name, source.manager
                );
                continue;
            };
            match result {
                Ok(value) => {
                    self.current_source = Some(index);
                    self.installed = true;
                    return Ok(value);
                }
                Err(e) => errors.push(e.to_string()),
            }
        }

        let message = if errors.is_empty() {
            "no source has an active repository manager".to_string()
        } else {
            errors.join("; ")
        };
        Err(Error::Install {
            package: self.name.clone(),
            message,
        })
    }

    /// Adopt the result of an earlier install.
    pub(crate) fn restore(&mut self, current_source: usize, defines_classes: bool) {
        self.current_source = Some(current_source);
        self.installed = true;
        self.defines_classes = defines_classes;
    }
}

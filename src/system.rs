//! # Repository System
//!
//! The `RepositorySystem` owns everything one resolution run needs: the
//! registered managers (keyed by name, which is also the URL scheme), the
//! package arena with its name index, the persisted package records and the
//! message sink.
//!
//! ## Installing
//!
//! `install_package` is a no-op for packages already installed or currently
//! being installed; the in-progress set is what keeps dependency cycles from
//! recursing forever. A package is installed by:
//!
//! 1. Adopting the saved record when it matches the declaration, the
//!    install tag is still present and the recorded source's manager is
//!    active. Update mode always goes to the managers instead.
//! 2. Otherwise trying each source in order through its manager.
//! 3. Adding the dependencies the install reported one level deeper in the
//!    dependency graph, saving the record, and installing the dependencies.
//!
//! Failures are reported through the message sink and never abort the run.
//!
//! ## Class path
//!
//! The class path is a depth-first pre-order walk from the root packages.
//! Each installed package that defines classes contributes its artifact
//! once, at the position where it is first discovered.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use log::{debug, warn};

use crate::dependency::{DependencyCollection, DependencyContext};
use crate::error::{Error, Result};
use crate::manager::{InstallOutcome, RepositoryManager, Transport, INSTALL_TAG};
use crate::maven::MavenRepository;
use crate::message::{LogSink, Message, MessageSink};
use crate::metadata::{PackageRecord, PackageStore};
use crate::package::{is_valid_name_segment, PackageId, RepositoryPackage};

/// Separator between class-path entries on this platform.
pub const CLASS_PATH_SEPARATOR: &str = if cfg!(windows) { ";" } else { ":" };

/// Per-package overrides for `add_package_with`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageOptions {
    /// Directory name of the install root, instead of the package name.
    pub file_name: Option<String>,
    /// Override whether fetched archives are extracted.
    pub unzip: Option<bool>,
}

pub struct RepositorySystem {
    package_root: PathBuf,
    managers: IndexMap<String, RepositoryManager>,
    packages: Vec<RepositoryPackage>,
    by_name: HashMap<String, PackageId>,
    roots: Vec<PackageId>,
    installing: HashSet<PackageId>,
    store: PackageStore,
    sink: Box<dyn MessageSink>,
    update: bool,
    layer: Option<String>,
}

impl RepositorySystem {
    /// An empty system rooted at `package_root`, reporting to the log.
    pub fn new(package_root: impl Into<PathBuf>) -> Self {
        let package_root = package_root.into();
        Self {
            store: PackageStore::for_root(&package_root),
            package_root,
            managers: IndexMap::new(),
            packages: Vec::new(),
            by_name: HashMap::new(),
            roots: Vec::new(),
            installing: HashSet::new(),
            sink: Box::new(LogSink),
            update: false,
            layer: None,
        }
    }

    /// A system with the built-in `file`, `git`, `scp`, `url` and `mvn`
    /// managers, each using `<package_root>/<scheme>` as its package root.
    pub fn with_default_managers(package_root: impl Into<PathBuf>, maven: MavenRepository) -> Self {
        let mut system = Self::new(package_root);
        for transport in [
            Transport::Local,
            Transport::Git,
            Transport::Scp,
            Transport::Url,
            Transport::Maven(maven),
        ] {
            let root = system.package_root.join(transport.scheme());
            system.add_repository_manager(RepositoryManager::new(transport, root));
        }
        system
    }

    pub fn package_root(&self) -> &Path {
        &self.package_root
    }

    pub fn set_message_sink(&mut self, sink: Box<dyn MessageSink>) {
        self.sink = sink;
    }

    /// In update mode every install goes through the managers and is
    /// followed by a manager update.
    pub fn set_update(&mut self, update: bool) {
        self.update = update;
    }

    /// Name of the build layer requesting packages, used in diagnostics.
    pub fn set_layer(&mut self, layer: Option<String>) {
        self.layer = layer;
    }

    /// Register `manager` under its name, replacing a manager of the same
    /// name. Packages owned by that name get their install roots recomputed.
    pub fn add_repository_manager(&mut self, manager: RepositoryManager) {
        let name = manager.name().to_string();
        let root = manager.package_root().to_path_buf();
        debug!("Registering repository manager {} at {}", name, root.display());
        self.managers.insert(name.clone(), manager);

        for package in &mut self.packages {
            if package.owning_manager() == name {
                package.update_installed_root(&root);
            }
        }
    }

    pub fn manager(&self, name: &str) -> Option<&RepositoryManager> {
        self.managers.get(name)
    }

    pub fn manager_mut(&mut self, name: &str) -> Option<&mut RepositoryManager> {
        self.managers.get_mut(name)
    }

    pub fn managers(&self) -> impl Iterator<Item = &RepositoryManager> {
        self.managers.values()
    }

    /// Add the package named by `url` as a root of the build, optionally
    /// installing it. Returns `None` (after reporting) when the URL cannot be
    /// resolved.
    pub fn add_package(&mut self, url: &str, install: bool) -> Option<PackageId> {
        self.add_package_with(url, &PackageOptions::default(), install)
    }

    pub fn add_package_with(
        &mut self,
        url: &str,
        options: &PackageOptions,
        install: bool,
    ) -> Option<PackageId> {
        let id = self.add_package_in(url, options, &DependencyContext::root())?;
        if !self.roots.contains(&id) {
            self.roots.push(id);
        }
        if install {
            self.install_package(id);
        }
        Some(id)
    }

    fn add_package_in(
        &mut self,
        url: &str,
        options: &PackageOptions,
        context: &Arc<DependencyContext>,
    ) -> Option<PackageId> {
        let mut package = match self.create_package(url) {
            Ok(package) => package,
            Err(e) => {
                self.sink
                    .report(Message::error(format!("Could not add package: {}", e)).at(url));
                return None;
            }
        };
        if let Some(unzip) = options.unzip {
            package = package.with_unzip(unzip);
        }
        if let Some(file_name) = &options.file_name {
            if !is_valid_name_segment(file_name) {
                self.sink.report(
                    Message::error(format!(
                        "Could not add package: invalid file name '{}'",
                        file_name
                    ))
                    .at(url),
                );
                return None;
            }
            package.set_file_name(Some(file_name.clone()));
        }

        if let Some(&id) = self.by_name.get(package.name()) {
            let existing = &mut self.packages[id.0];
            for source in package.sources() {
                existing.add_new_source(source.clone());
            }
            existing.merge_context(context);
            return Some(id);
        }

        if let Some(manager) = self.managers.get(package.owning_manager()) {
            package.update_installed_root(manager.package_root());
        }
        package.merge_context(context);

        let id = PackageId(self.packages.len());
        debug!("Adding package {} as {:?}", package.name(), id);
        self.by_name.insert(package.name().to_string(), id);
        self.packages.push(package);
        Some(id)
    }

    fn create_package(&self, url: &str) -> Result<RepositoryPackage> {
        let scheme = url.split_once(':').map_or("", |(scheme, _)| scheme);
        let manager = self
            .managers
            .get(scheme)
            .filter(|_| !scheme.is_empty())
            .ok_or_else(|| Error::NoSuchRepository {
                scheme: scheme.to_string(),
                url: url.to_string(),
            })?;
        manager.create_package(url)
    }

    /// Install a package and, transitively, its dependencies. Returns
    /// whether the package is installed afterwards.
    pub fn install_package(&mut self, id: PackageId) -> bool {
        let Some(package) = self.packages.get(id.0) else {
            return false;
        };
        if package.is_installed() {
            return true;
        }
        if !self.installing.insert(id) {
            debug!("{} is already being installed", package.name());
            return false;
        }

        let restored = if self.update {
            None
        } else {
            self.restore_from_saved(id)
        };
        let result = match restored {
            Some(dependencies) => Ok(InstallOutcome {
                dependencies,
                defines_classes: None,
            }),
            None => self.fetch_package(id),
        };

        match result {
            Ok(outcome) => self.complete_install(id, outcome),
            Err(e) => self.report_failure(id, &e),
        }

        self.installing.remove(&id);
        self.packages[id.0].is_installed()
    }

    /// Adopt the saved record of `id`. Returns the recorded dependency URLs.
    fn restore_from_saved(&mut self, id: PackageId) -> Option<Vec<String>> {
        let package = &self.packages[id.0];
        let record = self.store.load(package.name())?;
        if !record.matches(package) {
            debug!("Saved record of {} no longer matches", package.name());
            return None;
        }
        let index = record.current_source?;
        let source = package.sources().get(index)?;
        if !self
            .managers
            .get(&source.manager)
            .is_some_and(RepositoryManager::is_active)
        {
            return None;
        }
        if !package.installed_root().join(INSTALL_TAG).exists() {
            return None;
        }

        debug!("Restoring {} from its saved record", package.name());
        self.packages[id.0].restore(index, record.defines_classes);
        Some(record.dependencies)
    }

    fn fetch_package(&mut self, id: PackageId) -> Result<InstallOutcome> {
        let managers = &self.managers;
        let sink = self.sink.as_ref();
        let package = &mut self.packages[id.0];
        let root = package.installed_root().to_path_buf();

        package.install(|source| match managers.get(&source.manager) {
            Some(manager) if !manager.is_active() => None,
            Some(manager) => Some(manager.install(&root, source, sink)),
            None => Some(Err(Error::NoSuchRepository {
                scheme: source.manager.clone(),
                url: source.url.clone(),
            })),
        })
    }

    fn complete_install(&mut self, id: PackageId, outcome: InstallOutcome) {
        if let Some(defines_classes) = outcome.defines_classes {
            self.packages[id.0].set_defines_classes(defines_classes);
        }

        let context = self.packages[id.0]
            .context()
            .cloned()
            .unwrap_or_else(DependencyContext::root);
        let child = DependencyContext::child(&context, id);
        let mut pending = DependencyCollection::new();
        for url in &outcome.dependencies {
            if let Some(dependency) = self.add_package_in(url, &PackageOptions::default(), &child) {
                pending.add_with_priority(dependency, Arc::clone(&child));
            }
        }
        let dependencies: Vec<PackageId> = pending.packages().collect();
        self.packages[id.0].set_dependencies(dependencies.clone());

        let record = PackageRecord::from_package(&self.packages[id.0], outcome.dependencies);
        if let Err(e) = self.store.save(&record) {
            warn!("Could not save record of {}: {}", record.name, e);
        }

        for dependency in dependencies {
            self.install_package(dependency);
        }

        if self.update {
            self.update_package(id);
        }
    }

    fn update_package(&self, id: PackageId) {
        let package = &self.packages[id.0];
        let Some(source) = package.current_source() else {
            return;
        };
        let Some(manager) = self.managers.get(&source.manager) else {
            return;
        };
        if let Err(e) = manager.update(package.installed_root(), source) {
            self.sink.report(
                Message::warning(format!("Could not update package {}: {}", package.name(), e))
                    .at(&source.url),
            );
        }
    }

    fn report_failure(&mut self, id: PackageId, error: &Error) {
        let package = &self.packages[id.0];
        let mut text = error.to_string();
        if let Some(from) = package
            .context()
            .and_then(|context| context.from_package())
        {
            text.push_str(&format!(" (required by {})", self.packages[from.0].name()));
        }
        if let Some(layer) = &self.layer {
            text.push_str(&format!(" (requested by layer {})", layer));
        }

        let mut message = Message::error(text);
        if let Some(source) = package.sources().first() {
            message = message.at(&source.url);
        }
        self.sink.report(message);
        self.store.remove(package.name());
    }

    pub fn package(&self, id: PackageId) -> Option<&RepositoryPackage> {
        self.packages.get(id.0)
    }

    pub fn find_package(&self, name: &str) -> Option<PackageId> {
        self.by_name.get(name).copied()
    }

    /// Every package known to this run, in insertion order.
    pub fn packages(&self) -> impl Iterator<Item = (PackageId, &RepositoryPackage)> {
        self.packages
            .iter()
            .enumerate()
            .map(|(index, package)| (PackageId(index), package))
    }

    /// Packages added directly by the build, in request order.
    pub fn roots(&self) -> &[PackageId] {
        &self.roots
    }

    /// Class-path artifacts reachable from `roots`, first discovery wins.
    pub fn class_path_entries(&self, roots: &[PackageId]) -> Vec<PathBuf> {
        let mut visited = HashSet::new();
        let mut entries = Vec::new();
        for &root in roots {
            self.collect_class_path(root, &mut visited, &mut entries);
        }
        entries
    }

    fn collect_class_path(
        &self,
        id: PackageId,
        visited: &mut HashSet<PackageId>,
        entries: &mut Vec<PathBuf>,
    ) {
        if !visited.insert(id) {
            return;
        }
        let Some(package) = self.packages.get(id.0) else {
            return;
        };
        if let Some(entry) = package.class_path_entry() {
            if !entries.contains(&entry) {
                entries.push(entry);
            }
        }
        for &dependency in package.dependencies() {
            self.collect_class_path(dependency, visited, entries);
        }
    }

    /// Class path of `roots` joined with the platform separator.
    pub fn class_path_of(&self, roots: &[PackageId]) -> String {
        self.class_path_entries(roots)
            .iter()
            .map(|entry| entry.display().to_string())
            .collect::<Vec<_>>()
            .join(CLASS_PATH_SEPARATOR)
    }

    /// Class path of every root package.
    pub fn class_path(&self) -> String {
        self.class_path_of(&self.roots)
    }
}

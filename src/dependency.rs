//! # Dependency Contexts
//!
//! A `DependencyContext` records how a package request reached the system:
//! the root of the build asks for packages at depth 0, and each package that
//! declares dependencies asks for them one level deeper. When the same
//! package is reachable through several paths, the context closest to the
//! root has priority.
//!
//! `DependencyCollection` is the queue of packages still waiting to be
//! installed. It keeps one entry per package in first-insertion order.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::package::PackageId;

/// Immutable link in the chain of requests that led to a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyContext {
    depth: usize,
    from_package: Option<PackageId>,
    parent: Option<Arc<DependencyContext>>,
}

impl DependencyContext {
    /// Context of a request made directly by the build.
    pub fn root() -> Arc<Self> {
        Arc::new(Self {
            depth: 0,
            from_package: None,
            parent: None,
        })
    }

    /// Context for the dependencies declared by `from_package`, which was
    /// itself requested in `parent`.
    pub fn child(parent: &Arc<Self>, from_package: PackageId) -> Arc<Self> {
        Arc::new(Self {
            depth: parent.depth + 1,
            from_package: Some(from_package),
            parent: Some(Arc::clone(parent)),
        })
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The package whose descriptor declared this request, if any.
    pub fn from_package(&self) -> Option<PackageId> {
        self.from_package
    }

    pub fn parent(&self) -> Option<&Arc<DependencyContext>> {
        self.parent.as_ref()
    }

    /// True when this context is at least as close to the root as `other`.
    pub fn has_priority(&self, other: &DependencyContext) -> bool {
        self.depth <= other.depth
    }

    /// Pick the context with priority; `a` wins ties.
    pub fn merge(a: &Arc<Self>, b: &Arc<Self>) -> Arc<Self> {
        if a.has_priority(b) {
            Arc::clone(a)
        } else {
            Arc::clone(b)
        }
    }

    /// Packages on the request path, nearest first.
    pub fn requested_by(&self) -> Vec<PackageId> {
        let mut chain = Vec::new();
        let mut current = Some(self);
        while let Some(context) = current {
            if let Some(package) = context.from_package {
                chain.push(package);
            }
            current = context.parent.as_deref();
        }
        chain
    }
}

/// Order-preserving set of packages awaiting installation.
#[derive(Debug, Clone, Default)]
pub struct DependencyCollection {
    entries: IndexMap<PackageId, Arc<DependencyContext>>,
}

impl DependencyCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a package if it is not already present. Returns `false` and
    /// leaves the existing context untouched otherwise.
    pub fn add(&mut self, package: PackageId, context: Arc<DependencyContext>) -> bool {
        if self.entries.contains_key(&package) {
            return false;
        }
        self.entries.insert(package, context);
        true
    }

    /// Add a package, replacing the context of an existing entry only when
    /// the new one is strictly closer to the root. The entry keeps its
    /// original position.
    pub fn add_with_priority(&mut self, package: PackageId, context: Arc<DependencyContext>) {
        match self.entries.get_mut(&package) {
            Some(existing) => *existing = DependencyContext::merge(existing, &context),
            None => {
                self.entries.insert(package, context);
            }
        }
    }

    pub fn contains(&self, package: PackageId) -> bool {
        self.entries.contains_key(&package)
    }

    pub fn context(&self, package: PackageId) -> Option<&Arc<DependencyContext>> {
        self.entries.get(&package)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn packages(&self) -> impl Iterator<Item = PackageId> + '_ {
        self.entries.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PackageId, &Arc<DependencyContext>)> {
        self.entries.iter().map(|(package, context)| (*package, context))
    }
}

impl IntoIterator for DependencyCollection {
    type Item = (PackageId, Arc<DependencyContext>);
    type IntoIter = indexmap::map::IntoIter<PackageId, Arc<DependencyContext>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

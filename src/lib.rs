//! # Repository Packages Library
//!
//! This library resolves, fetches and caches the third-party packages a build
//! depends on. Packages are named by URLs whose scheme selects a repository
//! manager: `file://`, `git://`, `scp://`, `url://` or `mvn://`. Maven
//! packages bring their POM's compile dependencies along, so one request can
//! install a whole dependency graph.
//!
//! ## Quick Example
//!
//! ```
//! use repo_packages::config;
//! use repo_packages::maven::MavenRepository;
//! use repo_packages::system::RepositorySystem;
//!
//! let config = config::parse(r#"
//! packages:
//!   - mvn://junit/junit/4.12
//! "#).unwrap();
//!
//! let root = std::env::temp_dir().join("repo-packages-doc");
//! let mut system = RepositorySystem::with_default_managers(&root, MavenRepository::default());
//! for package in &config.packages {
//!     // Declare only; `true` would install it right away.
//!     system.add_package_with(package.url(), &package.options(), false);
//! }
//!
//! let junit = system.find_package("junit/junit/4.12").unwrap();
//! assert!(!system.package(junit).unwrap().is_installed());
//! assert_eq!(system.class_path(), "");
//! ```
//!
//! ## Core Concepts
//!
//! - **Packages (`package`)**: a named unit with ordered alternative sources
//!   and its install state.
//! - **Managers (`manager`)**: one per transport. A manager turns a URL into a
//!   package, fetches a source into an install root and tags the root with the
//!   install time so unchanged packages are not fetched again.
//! - **Maven (`maven`)**: coordinates, the mirror list and POM parsing.
//! - **Dependency contexts (`dependency`)**: how deep in the dependency graph
//!   a package was requested; the request nearest to the root wins.
//! - **The system (`system`)**: the registry of managers and packages that
//!   drives installation and assembles the class path.
//! - **Records (`metadata`)**: per-package JSON records that let a later run
//!   reuse an earlier install.
//! - **Diagnostics (`message`)**: every problem found while resolving is
//!   reported to a `MessageSink` instead of aborting the build.

pub mod config;
pub mod dependency;
pub mod error;
pub mod manager;
pub mod maven;
pub mod message;
pub mod metadata;
pub mod package;
pub mod system;
pub mod transport;
pub mod xml;

#[cfg(test)]
mod dependency_proptest;

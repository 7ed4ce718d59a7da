//! # Maven Support
//!
//! Maven packages are named by `mvn://groupId/artifactId/version` URLs. The
//! Maven transport downloads the artifact's POM from the first mirror that
//! serves it, fetches the jar unless the POM declares `pom` packaging, and
//! reports the POM's compile-scope dependencies back to the
//! `RepositorySystem`, which adds them as packages one level deeper in the
//! dependency graph.
//!
//! - **`descriptor`**: coordinates and repository layout.
//! - **`repository`**: the ordered mirror list.
//! - **`pom`**: POM parsing and dependency extraction.

pub mod descriptor;
pub mod pom;
pub mod repository;

pub use descriptor::{MavenDescriptor, MAVEN_SCHEME};
pub use pom::{Pom, DEFAULT_SCOPE};
pub use repository::{MavenRepository, MAVEN_CENTRAL};

//! Shared test utilities for integration and E2E tests.
//!
//! This module provides fixtures, stub transports and helper functions to
//! reduce duplication across test files.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! let fixture = TestFixture::new().with_config(configs::EMPTY);
//! fixture.command().arg("list").assert().success();
//! ```

#![allow(dead_code)]

use assert_fs::prelude::*;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use repo_packages::error::{Error, Result};
use repo_packages::transport::{CommandOperations, HttpOperations};

/// Re-export commonly used test dependencies for convenience.
#[allow(unused_imports)]
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    pub use super::configs;
    pub use super::TestFixture;
}

/// Common configuration YAML snippets for testing.
pub mod configs {
    /// Configuration without packages.
    pub const EMPTY: &str = "# repo-packages configuration\npackages: []\n";

    /// Invalid YAML for error testing.
    pub const INVALID_YAML: &str = "invalid: yaml: content:";

    /// Configuration naming a manager that does not exist.
    pub const UNKNOWN_MANAGER: &str = "inactive: [svn]\n";
}

/// A temporary directory holding a `repo-packages.yaml` and local package
/// sources.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

impl TestFixture {
    /// Create a new test fixture with an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Add a `repo-packages.yaml` configuration file with the given content.
    pub fn with_config(self, content: &str) -> Self {
        self.temp_dir
            .child("repo-packages.yaml")
            .write_str(content)
            .expect("Failed to write config file");
        self
    }

    /// Add a file with the given path and content.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        if let Some(parent) = Path::new(path).parent() {
            fs::create_dir_all(self.temp_dir.path().join(parent))
                .expect("Failed to create parent directory");
        }
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    /// Get the path to the temporary directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Get the path to the config file.
    pub fn config_path(&self) -> PathBuf {
        self.temp_dir.path().join("repo-packages.yaml")
    }

    /// Package root used by commands run through `command`.
    pub fn package_root(&self) -> PathBuf {
        self.temp_dir.path().join("packages")
    }

    /// `file://` URL of a path inside the fixture.
    pub fn file_url(&self, path: &str) -> String {
        format!("file://{}", self.temp_dir.path().join(path).display())
    }

    /// Create a child path in the temp directory.
    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }

    /// A `repo-packages` command running in the fixture with its package
    /// root inside the fixture.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("repo-packages");
        cmd.current_dir(self.path())
            .env("REPO_PACKAGES_ROOT", self.package_root())
            .env_remove("RUST_LOG");
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// In-memory HTTP server: URL to body, everything else is a 404. Every
/// download attempt is recorded.
#[derive(Default)]
pub struct StubHttp {
    files: Mutex<HashMap<String, Vec<u8>>>,
    downloads: Mutex<Vec<String>>,
    modified: Mutex<Option<SystemTime>>,
}

impl StubHttp {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn serve(&self, url: &str, body: &str) {
        self.files
            .lock()
            .unwrap()
            .insert(url.to_string(), body.as_bytes().to_vec());
    }

    pub fn set_modified(&self, time: Option<SystemTime>) {
        *self.modified.lock().unwrap() = time;
    }

    pub fn downloads(&self) -> Vec<String> {
        self.downloads.lock().unwrap().clone()
    }

    /// Serve a POM (and its jar unless `packaging` is `pom`) under `mirror`.
    pub fn serve_artifact(
        &self,
        mirror: &str,
        coordinates: (&str, &str, &str),
        packaging: &str,
        dependencies: &[(&str, &str, &str)],
    ) {
        let (group, artifact, version) = coordinates;
        let base = format!(
            "{}/{}/{}/{}/{}-{}",
            mirror,
            group.replace('.', "/"),
            artifact,
            version,
            artifact,
            version
        );
        self.serve(
            &format!("{}.pom", base),
            &pom(coordinates, packaging, dependencies),
        );
        if packaging != "pom" {
            self.serve(&format!("{}.jar", base), "PK");
        }
    }
}

impl HttpOperations for StubHttp {
    fn download(&self, url: &str, dest: &Path) -> Result<()> {
        self.downloads.lock().unwrap().push(url.to_string());
        let body = self
            .files
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| Error::Http {
                url: url.to_string(),
                status: 404,
            })?;
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(dest, body)?;
        Ok(())
    }

    fn last_modified(&self, _url: &str) -> Result<Option<SystemTime>> {
        Ok(*self.modified.lock().unwrap())
    }
}

/// Records every command and simulates `git clone` by creating the target
/// directory. Remotes listed in `unreachable` fail.
#[derive(Default)]
pub struct StubCommands {
    calls: Mutex<Vec<Vec<String>>>,
    unreachable: Mutex<Vec<String>>,
}

impl StubCommands {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_for(&self, remote: &str) {
        self.unreachable.lock().unwrap().push(remote.to_string());
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

impl CommandOperations for StubCommands {
    fn run(&self, program: &str, args: &[String]) -> Result<()> {
        let mut call = vec![program.to_string()];
        call.extend(args.iter().cloned());
        self.calls.lock().unwrap().push(call);

        if args.iter().any(|arg| self.unreachable.lock().unwrap().contains(arg)) {
            return Err(Error::Command {
                command: program.to_string(),
                stderr: "Could not resolve host".to_string(),
            });
        }
        if program == "git" && args.first().map(String::as_str) == Some("clone") {
            let target = Path::new(&args[2]);
            fs::create_dir_all(target)?;
            fs::write(target.join("README"), "checkout")?;
        }
        Ok(())
    }
}

/// A minimal POM document.
pub fn pom(
    (group, artifact, version): (&str, &str, &str),
    packaging: &str,
    dependencies: &[(&str, &str, &str)],
) -> String {
    let dependencies: String = dependencies
        .iter()
        .map(|(g, a, v)| {
            format!(
                "    <dependency><groupId>{}</groupId><artifactId>{}</artifactId><version>{}</version></dependency>\n",
                g, a, v
            )
        })
        .collect();
    format!(
        "<project>\n  <groupId>{}</groupId>\n  <artifactId>{}</artifactId>\n  <version>{}</version>\n  <packaging>{}</packaging>\n  <dependencies>\n{}  </dependencies>\n</project>\n",
        group, artifact, version, packaging, dependencies
    )
}

//! # Repository Managers
//!
//! A `RepositoryManager` knows one transport: how to turn a package URL into a
//! `RepositoryPackage`, how to fetch a source into an install root, and
//! whether the remote copy changed since the last install.
//!
//! ## Install caching
//!
//! Every successful install writes `.scPackageInstalled` into the install
//! root holding the wall-clock time in epoch milliseconds. The next install
//! of the same root is skipped when:
//!
//! - the transport cannot report a modification time and the tag exists, or
//! - the tag's time is strictly later than the reported modification time.
//!
//! A failed fetch removes the tag so the next run retries.
//!
//! ## Design
//!
//! The transports form a closed enum. Subprocess and HTTP access go through
//! the `CommandOperations` and `HttpOperations` traits so tests can replace
//! the network and external tools with stubs.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, info, warn};

use crate::error::{Error, Result};
use crate::maven::{MavenDescriptor, MavenRepository, Pom, DEFAULT_SCOPE, MAVEN_SCHEME};
use crate::message::MessageSink;
use crate::package::{is_valid_package_name, RepositoryPackage, RepositorySource};
use crate::transport::{self, CommandOperations, HttpOperations, SystemCommands, UreqHttp};

/// Name of the install tag file inside each install root.
pub const INSTALL_TAG: &str = ".scPackageInstalled";

/// Split `scheme://location`. The scheme must be non-empty.
pub fn split_url(url: &str) -> Result<(&str, &str)> {
    let malformed = |message: &str| Error::MalformedUrl {
        url: url.to_string(),
        message: message.to_string(),
    };
    let (scheme, rest) = url
        .split_once(':')
        .ok_or_else(|| malformed("missing scheme"))?;
    if scheme.is_empty() {
        return Err(malformed("empty scheme"));
    }
    let location = rest
        .strip_prefix("//")
        .ok_or_else(|| malformed("expected <scheme>://<location>"))?;
    Ok((scheme, location))
}

/// The fetch mechanism behind a manager.
#[derive(Debug, Clone)]
pub enum Transport {
    /// Copy from the local filesystem (`file://`).
    Local,
    /// `git clone` (`git://`).
    Git,
    /// `scp` from a remote host (`scp://user@host:/path`).
    Scp,
    /// HTTP(S) download (`url://host/path`).
    Url,
    /// POM and jar from Maven mirrors (`mvn://group/artifact/version`).
    Maven(MavenRepository),
}

impl Transport {
    /// Default manager name, which is also the URL scheme.
    pub fn scheme(&self) -> &'static str {
        match self {
            Transport::Local => "file",
            Transport::Git => "git",
            Transport::Scp => "scp",
            Transport::Url => "url",
            Transport::Maven(_) => MAVEN_SCHEME,
        }
    }
}

/// Result of installing one source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallOutcome {
    /// URLs of packages the installed source depends on.
    pub dependencies: Vec<String>,
    /// Overrides whether the package contributes a class-path artifact.
    pub defines_classes: Option<bool>,
}

/// A named transport with its own package root.
pub struct RepositoryManager {
    name: String,
    transport: Transport,
    package_root: PathBuf,
    active: bool,
    commands: Arc<dyn CommandOperations>,
    http: Arc<dyn HttpOperations>,
}

impl std::fmt::Debug for RepositoryManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryManager")
            .field("name", &self.name)
            .field("transport", &self.transport)
            .field("package_root", &self.package_root)
            .field("active", &self.active)
            .finish()
    }
}

impl RepositoryManager {
    /// Creates a manager named after the transport's scheme, using the
    /// system `git`/`scp` binaries and a `ureq` HTTP client.
    pub fn new(transport: Transport, package_root: impl Into<PathBuf>) -> Self {
        Self {
            name: transport.scheme().to_string(),
            transport,
            package_root: package_root.into(),
            active: true,
            commands: Arc::new(SystemCommands),
            http: Arc::new(UreqHttp::new()),
        }
    }

    pub fn local(package_root: impl Into<PathBuf>) -> Self {
        Self::new(Transport::Local, package_root)
    }

    pub fn git(package_root: impl Into<PathBuf>) -> Self {
        Self::new(Transport::Git, package_root)
    }

    pub fn scp(package_root: impl Into<PathBuf>) -> Self {
        Self::new(Transport::Scp, package_root)
    }

    pub fn url(package_root: impl Into<PathBuf>) -> Self {
        Self::new(Transport::Url, package_root)
    }

    pub fn maven(package_root: impl Into<PathBuf>, repository: MavenRepository) -> Self {
        Self::new(Transport::Maven(repository), package_root)
    }

    /// Register under a different name (and so a different URL scheme).
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Replace the subprocess and HTTP implementations.
    ///
    /// This is primarily used for testing to inject stub operations.
    pub fn with_operations(
        mut self,
        commands: Arc<dyn CommandOperations>,
        http: Arc<dyn HttpOperations>,
    ) -> Self {
        self.commands = commands;
        self.http = http;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn package_root(&self) -> &Path {
        &self.package_root
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Build the package (with one source) named by `url`.
    pub fn create_package(&self, url: &str) -> Result<RepositoryPackage> {
        let (_, location) = split_url(url)?;
        let malformed = |message: &str| Error::MalformedUrl {
            url: url.to_string(),
            message: message.to_string(),
        };

        let package = match &self.transport {
            Transport::Maven(_) => {
                let descriptor = MavenDescriptor::from_coordinates(location)
                    .ok_or_else(|| malformed("expected groupId/artifactId/version"))?;
                let source = RepositorySource::new(&self.name, url, false);
                RepositoryPackage::new(descriptor.package_name(), source)
                    .with_artifact(descriptor.jar_file_name())
            }
            Transport::Git => {
                let segment = last_segment(location)
                    .ok_or_else(|| malformed("no repository name in url"))?;
                let name = segment.strip_suffix(".git").unwrap_or(segment);
                if name.is_empty() {
                    return Err(malformed("no repository name in url"));
                }
                let source = RepositorySource::new(&self.name, url, false);
                RepositoryPackage::new(name, source)
            }
            Transport::Scp | Transport::Url | Transport::Local => {
                if matches!(self.transport, Transport::Scp) && !location.contains(':') {
                    return Err(malformed("expected host:path"));
                }
                if matches!(self.transport, Transport::Url) {
                    url::Url::parse(&http_url(location))?;
                }
                let file = last_segment(location)
                    .ok_or_else(|| malformed("no file name in url"))?;
                let name = Path::new(file)
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .unwrap_or(file);
                let lower = file.to_ascii_lowercase();
                let source = RepositorySource::new(&self.name, url, lower.ends_with(".zip"));
                let package = RepositoryPackage::new(name, source);
                if lower.ends_with(".jar") {
                    package.with_artifact(file)
                } else {
                    package
                }
            }
        };

        if !is_valid_package_name(package.name()) {
            return Err(malformed("package name is not a plain directory name"));
        }
        Ok(package)
    }

    /// Install `source` into `root`, skipping the fetch when the install tag
    /// shows the root is current.
    pub fn install(
        &self,
        root: &Path,
        source: &RepositorySource,
        sink: &dyn MessageSink,
    ) -> Result<InstallOutcome> {
        let tag = root.join(INSTALL_TAG);
        let package_time = self.last_modified(source);
        let installed_time = read_install_tag(&tag);

        if is_up_to_date(installed_time, package_time) && self.has_local_copy(root, source) {
            debug!("{} is up to date in {}", source.url, root.display());
        } else {
            info!("Installing {} into {}", source.url, root.display());
            if let Err(e) = self.fetch(root, source) {
                remove_install_tag(&tag);
                return Err(e);
            }
            write_install_tag(&tag);
        }

        self.describe(root, source, sink).map_err(|e| {
            remove_install_tag(&tag);
            e
        })
    }

    /// Refresh an installed source in place. Only git checkouts support
    /// this; other transports re-fetch through the install tag instead.
    pub fn update(&self, root: &Path, source: &RepositorySource) -> Result<()> {
        match self.transport {
            Transport::Git => {
                debug!("Updating {} in {}", source.url, root.display());
                self.commands.run("git", &transport::git_pull_args(root))
            }
            _ => Ok(()),
        }
    }

    /// Modification time of the remote copy, `None` when unknown.
    pub fn last_modified(&self, source: &RepositorySource) -> Option<SystemTime> {
        let (_, location) = split_url(&source.url).ok()?;
        match self.transport {
            Transport::Local => transport::local_modified(Path::new(location)),
            Transport::Url => match self.http.last_modified(&http_url(location)) {
                Ok(time) => time,
                Err(e) => {
                    debug!("No modification time for {}: {}", source.url, e);
                    None
                }
            },
            Transport::Git | Transport::Scp | Transport::Maven(_) => None,
        }
    }

    fn fetch(&self, root: &Path, source: &RepositorySource) -> Result<()> {
        let (_, location) = split_url(&source.url)?;

        match &self.transport {
            Transport::Git => {
                transport::prepare_target_dir(root)?;
                let remote = git_remote(&source.url, location);
                self.commands
                    .run("git", &transport::git_clone_args(remote, root))
            }
            Transport::Scp => {
                let file = file_name_of(&source.url, location)?;
                if transport::is_archive(file) {
                    fs::create_dir_all(root)?;
                    let dest = root.join(file);
                    self.commands
                        .run("scp", &transport::scp_args(location, &dest, false))?;
                    if source.unzip {
                        transport::unzip(&dest, root)?;
                    }
                    Ok(())
                } else {
                    transport::prepare_target_dir(root)?;
                    self.commands
                        .run("scp", &transport::scp_args(location, root, true))
                }
            }
            Transport::Url => {
                let file = file_name_of(&source.url, location)?;
                fs::create_dir_all(root)?;
                let dest = root.join(file);
                self.http.download(&http_url(location), &dest)?;
                if source.unzip {
                    transport::unzip(&dest, root)?;
                }
                Ok(())
            }
            Transport::Local => {
                let path = Path::new(location);
                transport::copy_local(path, root)?;
                if source.unzip && path.is_file() {
                    let file = file_name_of(&source.url, location)?;
                    transport::unzip(&root.join(file), root)?;
                }
                Ok(())
            }
            Transport::Maven(repository) => {
                let descriptor = maven_descriptor(&source.url, location)?;
                fs::create_dir_all(root)?;
                let pom_path = root.join(descriptor.pom_file_name());
                let mirror =
                    repository.fetch(self.http.as_ref(), &descriptor.pom_path(), &pom_path, None)?;
                let pom = read_pom(&pom_path)?;
                if pom.packaging() != "pom" {
                    repository.fetch(
                        self.http.as_ref(),
                        &descriptor.jar_path(),
                        &root.join(descriptor.jar_file_name()),
                        Some(&mirror),
                    )?;
                }
                Ok(())
            }
        }
    }

    /// Whether the files `describe` reads are still in `root`. A Maven
    /// install whose POM was removed is fetched again despite its tag.
    fn has_local_copy(&self, root: &Path, source: &RepositorySource) -> bool {
        let Transport::Maven(_) = self.transport else {
            return true;
        };
        split_url(&source.url)
            .and_then(|(_, location)| maven_descriptor(&source.url, location))
            .is_ok_and(|descriptor| root.join(descriptor.pom_file_name()).is_file())
    }

    /// What an installed source contributes: Maven sources read their POM.
    fn describe(
        &self,
        root: &Path,
        source: &RepositorySource,
        sink: &dyn MessageSink,
    ) -> Result<InstallOutcome> {
        let Transport::Maven(_) = self.transport else {
            return Ok(InstallOutcome::default());
        };
        let (_, location) = split_url(&source.url)?;
        let descriptor = maven_descriptor(&source.url, location)?;
        let pom = read_pom(&root.join(descriptor.pom_file_name()))?;

        let dependencies = pom
            .dependencies(DEFAULT_SCOPE, sink)
            .into_iter()
            .map(|dependency| format!("{}://{}", self.name, dependency.package_name()))
            .collect();
        Ok(InstallOutcome {
            dependencies,
            defines_classes: Some(pom.packaging() != "pom"),
        })
    }
}

/// Parse a fetched POM, deleting it when it does not parse so the next
/// install downloads it again.
fn read_pom(path: &Path) -> Result<Pom> {
    Pom::from_file(path).map_err(|e| {
        if path.exists() {
            warn!("Removing unreadable POM {}", path.display());
            if let Err(remove_error) = fs::remove_file(path) {
                warn!("Could not remove {}: {}", path.display(), remove_error);
            }
        }
        e
    })
}

/// Skip policy for the install tag.
pub fn is_up_to_date(installed_millis: Option<u128>, package_time: Option<SystemTime>) -> bool {
    match (installed_millis, package_time) {
        (None, _) => false,
        (Some(_), None) => true,
        (Some(installed), Some(modified)) => installed > epoch_millis(modified),
    }
}

fn epoch_millis(time: SystemTime) -> u128 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

/// Install time recorded in a tag file.
pub fn read_install_tag(tag: &Path) -> Option<u128> {
    fs::read_to_string(tag).ok()?.trim().parse().ok()
}

fn write_install_tag(tag: &Path) {
    let now = epoch_millis(SystemTime::now());
    let result = tag
        .parent()
        .map_or(Ok(()), fs::create_dir_all)
        .and_then(|()| fs::write(tag, now.to_string()));
    if let Err(e) = result {
        warn!("Could not write install tag {}: {}", tag.display(), e);
    }
}

fn remove_install_tag(tag: &Path) {
    if tag.exists() {
        if let Err(e) = fs::remove_file(tag) {
            warn!("Could not remove install tag {}: {}", tag.display(), e);
        }
    }
}

fn last_segment(location: &str) -> Option<&str> {
    location
        .trim_end_matches('/')
        .rsplit(['/', ':'])
        .next()
        .filter(|segment| !segment.is_empty())
}

fn file_name_of<'a>(url: &str, location: &'a str) -> Result<&'a str> {
    last_segment(location).ok_or_else(|| Error::MalformedUrl {
        url: url.to_string(),
        message: "no file name in url".to_string(),
    })
}

fn maven_descriptor(url: &str, location: &str) -> Result<MavenDescriptor> {
    MavenDescriptor::from_coordinates(location).ok_or_else(|| Error::MalformedUrl {
        url: url.to_string(),
        message: "expected groupId/artifactId/version".to_string(),
    })
}

/// `url://host/path` downloads over HTTPS unless the location carries its
/// own scheme (`url://http://host/path`).
fn http_url(location: &str) -> String {
    if location.contains("://") {
        location.to_string()
    } else {
        format!("https://{}", location)
    }
}

/// The remote handed to `git clone`: the location itself when it is a full
/// URL or an scp-style `user@host:path`, otherwise the `git://` URL as given.
fn git_remote<'a>(url: &'a str, location: &'a str) -> &'a str {
    let scp_like = location
        .split_once(':')
        .is_some_and(|(host, _)| host.contains('@'));
    if location.contains("://") || scp_like {
        location
    } else {
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::CollectingSink;
    use std::collections::HashMap;
    use std::io::{Cursor, Write};
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    /// Records commands; simulates `git clone` by creating the target and
    /// `scp` by writing `scp_payload` (or a directory for `-r`).
    #[derive(Default)]
    struct StubCommands {
        calls: Mutex<Vec<Vec<String>>>,
        fail: bool,
        scp_payload: Vec<u8>,
    }

    impl CommandOperations for StubCommands {
        fn run(&self, program: &str, args: &[String]) -> Result<()> {
            let mut call = vec![program.to_string()];
            call.extend(args.iter().cloned());
            self.calls.lock().unwrap().push(call);
            if self.fail {
                return Err(Error::Command {
                    command: program.to_string(),
                    stderr: "fatal: repository not found".to_string(),
                });
            }
            if program == "git" && args[0] == "clone" {
                fs::create_dir_all(&args[2])?;
                fs::write(Path::new(&args[2]).join("README"), "cloned")?;
            }
            if program == "scp" {
                let target = Path::new(&args[args.len() - 1]);
                if args[0] == "-r" {
                    fs::create_dir_all(target)?;
                    fs::write(target.join("copied.txt"), "copied")?;
                } else {
                    fs::write(target, &self.scp_payload)?;
                }
            }
            Ok(())
        }
    }

    /// Serves files from memory with a fixed modification time.
    #[derive(Default)]
    struct StubHttp {
        files: HashMap<String, Vec<u8>>,
        modified: Option<SystemTime>,
        downloads: Mutex<Vec<String>>,
    }

    impl StubHttp {
        fn serving(files: &[(&str, &str)]) -> Self {
            Self {
                files: files
                    .iter()
                    .map(|(url, body)| (url.to_string(), body.as_bytes().to_vec()))
                    .collect(),
                ..Self::default()
            }
        }

        fn download_count(&self) -> usize {
            self.downloads.lock().unwrap().len()
        }
    }

    impl HttpOperations for StubHttp {
        fn download(&self, url: &str, dest: &Path) -> Result<()> {
            self.downloads.lock().unwrap().push(url.to_string());
            let body = self.files.get(url).ok_or_else(|| Error::Http {
                url: url.to_string(),
                status: 404,
            })?;
            fs::write(dest, body)?;
            Ok(())
        }

        fn last_modified(&self, _url: &str) -> Result<Option<SystemTime>> {
            Ok(self.modified)
        }
    }

    fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in entries {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn manager_with(
        transport: Transport,
        root: &Path,
        commands: Arc<StubCommands>,
        http: Arc<StubHttp>,
    ) -> RepositoryManager {
        RepositoryManager::new(transport, root).with_operations(commands, http)
    }

    #[test]
    fn test_split_url() {
        assert_eq!(
            split_url("git://github.com/a/b.git").unwrap(),
            ("git", "github.com/a/b.git")
        );
        assert!(split_url("no-scheme").is_err());
        assert!(split_url("://host/path").is_err());
        assert!(split_url("git:github.com/a/b.git").is_err());
    }

    #[test]
    fn test_create_package_names() {
        let root = Path::new("/packages");
        let git = RepositoryManager::git(root);
        let package = git.create_package("git://github.com/acme/widgets.git").unwrap();
        assert_eq!(package.name(), "widgets");
        assert_eq!(package.sources()[0].manager, "git");
        assert!(!package.defines_classes());

        let url = RepositoryManager::url(root);
        let package = url.create_package("url://downloads.example.com/tools/kit.zip").unwrap();
        assert_eq!(package.name(), "kit");
        assert!(package.sources()[0].unzip);

        let scp = RepositoryManager::scp(root);
        let package = scp.create_package("scp://deploy@build.example.com:/srv/lib/core.jar").unwrap();
        assert_eq!(package.name(), "core");
        assert!(!package.sources()[0].unzip);
        assert!(package.defines_classes());

        let maven = RepositoryManager::maven(root, MavenRepository::default());
        let package = maven.create_package("mvn://junit/junit/4.12").unwrap();
        assert_eq!(package.name(), "junit/junit/4.12");
        assert!(package.defines_classes());
    }

    #[test]
    fn test_create_package_rejects_malformed() {
        let root = Path::new("/packages");
        assert!(RepositoryManager::maven(root, MavenRepository::default())
            .create_package("mvn://junit/junit")
            .is_err());
        assert!(RepositoryManager::scp(root)
            .create_package("scp://no-host-path")
            .is_err());
        assert!(RepositoryManager::git(root).create_package("git://").is_err());
    }

    #[test]
    fn test_git_remote_selection() {
        assert_eq!(
            git_remote("git://github.com/a/b.git", "github.com/a/b.git"),
            "git://github.com/a/b.git"
        );
        assert_eq!(
            git_remote("git://https://github.com/a/b.git", "https://github.com/a/b.git"),
            "https://github.com/a/b.git"
        );
        assert_eq!(
            git_remote("git://git@github.com:a/b.git", "git@github.com:a/b.git"),
            "git@github.com:a/b.git"
        );
    }

    #[test]
    fn test_is_up_to_date_policy() {
        let modified = UNIX_EPOCH + Duration::from_millis(5_000);
        assert!(!is_up_to_date(None, None));
        assert!(!is_up_to_date(None, Some(modified)));
        assert!(is_up_to_date(Some(1), None));
        assert!(is_up_to_date(Some(5_001), Some(modified)));
        assert!(!is_up_to_date(Some(5_000), Some(modified)));
        assert!(!is_up_to_date(Some(4_000), Some(modified)));
    }

    #[test]
    fn test_git_install_skipped_when_tag_exists() {
        let temp = TempDir::new().unwrap();
        let commands = Arc::new(StubCommands::default());
        let http = Arc::new(StubHttp::default());
        let manager = manager_with(Transport::Git, temp.path(), commands.clone(), http);
        let package = manager.create_package("git://example.com/lib.git").unwrap();
        let root = temp.path().join("lib");
        let sink = CollectingSink::new();

        manager.install(&root, &package.sources()[0], &sink).unwrap();
        assert!(root.join(INSTALL_TAG).exists());
        assert!(root.join("README").exists());

        manager.install(&root, &package.sources()[0], &sink).unwrap();
        assert_eq!(commands.calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_url_install_refetches_when_remote_is_newer() {
        let temp = TempDir::new().unwrap();
        let commands = Arc::new(StubCommands::default());
        let mut stub = StubHttp::serving(&[("https://dl.example.com/kit.txt", "v1")]);
        stub.modified = Some(UNIX_EPOCH + Duration::from_secs(1_000));
        let http = Arc::new(stub);
        let manager = manager_with(Transport::Url, temp.path(), commands, http.clone());
        let source = RepositorySource::new("url", "url://dl.example.com/kit.txt", false);
        let root = temp.path().join("kit");
        let sink = CollectingSink::new();

        manager.install(&root, &source, &sink).unwrap();
        manager.install(&root, &source, &sink).unwrap();
        assert_eq!(http.download_count(), 1);
        assert_eq!(fs::read_to_string(root.join("kit.txt")).unwrap(), "v1");

        // Back-date the tag so the remote looks newer.
        fs::write(root.join(INSTALL_TAG), "10").unwrap();
        manager.install(&root, &source, &sink).unwrap();
        assert_eq!(http.download_count(), 2);
    }

    #[test]
    fn test_failed_fetch_removes_tag() {
        let temp = TempDir::new().unwrap();
        let commands = Arc::new(StubCommands::default());
        let mut stub = StubHttp::default();
        stub.modified = Some(SystemTime::now() + Duration::from_secs(3_600));
        let manager = manager_with(Transport::Url, temp.path(), commands, Arc::new(stub));
        let source = RepositorySource::new("url", "url://dl.example.com/gone.txt", false);
        let root = temp.path().join("gone");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join(INSTALL_TAG), "1").unwrap();

        let error = manager
            .install(&root, &source, &CollectingSink::new())
            .unwrap_err();
        assert!(error.to_string().contains("HTTP 404"));
        assert!(!root.join(INSTALL_TAG).exists());
    }

    #[test]
    fn test_failed_clone_reports_command_error() {
        let temp = TempDir::new().unwrap();
        let commands = Arc::new(StubCommands {
            fail: true,
            ..StubCommands::default()
        });
        let manager = manager_with(
            Transport::Git,
            temp.path(),
            commands,
            Arc::new(StubHttp::default()),
        );
        let source = RepositorySource::new("git", "git://example.com/lib.git", false);
        let error = manager
            .install(&temp.path().join("lib"), &source, &CollectingSink::new())
            .unwrap_err();
        assert!(error.to_string().contains("repository not found"));
    }

    #[test]
    fn test_maven_install_reports_dependencies() {
        let temp = TempDir::new().unwrap();
        let pom = r#"<project>
  <groupId>junit</groupId><artifactId>junit</artifactId><version>4.12</version>
  <dependencies>
    <dependency><groupId>org.hamcrest</groupId><artifactId>hamcrest-core</artifactId><version>1.3</version></dependency>
  </dependencies>
</project>"#;
        let http = Arc::new(StubHttp::serving(&[
            ("https://m.example/junit/junit/4.12/junit-4.12.pom", pom),
            ("https://m.example/junit/junit/4.12/junit-4.12.jar", "jar"),
        ]));
        let manager = manager_with(
            Transport::Maven(MavenRepository::new(["https://m.example"])),
            temp.path(),
            Arc::new(StubCommands::default()),
            http.clone(),
        );
        let source = RepositorySource::new("mvn", "mvn://junit/junit/4.12", false);
        let root = temp.path().join("junit/junit/4.12");

        let outcome = manager
            .install(&root, &source, &CollectingSink::new())
            .unwrap();
        assert_eq!(outcome.dependencies, vec!["mvn://org.hamcrest/hamcrest-core/1.3"]);
        assert_eq!(outcome.defines_classes, Some(true));
        assert!(root.join("junit-4.12.jar").exists());

        // The second install reads the local POM without downloading.
        let again = manager
            .install(&root, &source, &CollectingSink::new())
            .unwrap();
        assert_eq!(again, outcome);
        assert_eq!(http.download_count(), 2);
    }

    #[test]
    fn test_maven_refetches_when_pom_is_missing() {
        let temp = TempDir::new().unwrap();
        let http = Arc::new(StubHttp::serving(&[
            ("https://m.example/org/acme/lib/1.0/lib-1.0.pom", "<project/>"),
            ("https://m.example/org/acme/lib/1.0/lib-1.0.jar", "jar"),
        ]));
        let manager = manager_with(
            Transport::Maven(MavenRepository::new(["https://m.example"])),
            temp.path(),
            Arc::new(StubCommands::default()),
            http.clone(),
        );
        let source = RepositorySource::new("mvn", "mvn://org.acme/lib/1.0", false);
        let root = temp.path().join("org.acme/lib/1.0");
        let sink = CollectingSink::new();

        manager.install(&root, &source, &sink).unwrap();
        fs::remove_file(root.join("lib-1.0.pom")).unwrap();
        assert!(root.join(INSTALL_TAG).exists());

        let outcome = manager.install(&root, &source, &sink).unwrap();
        assert_eq!(outcome.defines_classes, Some(true));
        assert!(root.join("lib-1.0.pom").exists());
        assert!(root.join(INSTALL_TAG).exists());
        assert_eq!(http.download_count(), 4);
    }

    #[test]
    fn test_maven_pom_packaging_skips_jar() {
        let temp = TempDir::new().unwrap();
        let http = Arc::new(StubHttp::serving(&[(
            "https://m.example/org/acme/bom/1.0/bom-1.0.pom",
            "<project><packaging>pom</packaging></project>",
        )]));
        let manager = manager_with(
            Transport::Maven(MavenRepository::new(["https://m.example"])),
            temp.path(),
            Arc::new(StubCommands::default()),
            http.clone(),
        );
        let source = RepositorySource::new("mvn", "mvn://org.acme/bom/1.0", false);

        let outcome = manager
            .install(&temp.path().join("bom"), &source, &CollectingSink::new())
            .unwrap();
        assert_eq!(outcome.defines_classes, Some(false));
        assert_eq!(http.download_count(), 1);
    }

    #[test]
    fn test_local_install_copies_directory() {
        let temp = TempDir::new().unwrap();
        let source_dir = temp.path().join("vendor/tools");
        fs::create_dir_all(&source_dir).unwrap();
        fs::write(source_dir.join("run.sh"), "echo").unwrap();

        let manager = RepositoryManager::local(temp.path().join("packages"));
        let url = format!("file://{}", source_dir.display());
        let package = manager.create_package(&url).unwrap();
        assert_eq!(package.name(), "tools");

        let root = temp.path().join("packages/tools");
        manager
            .install(&root, &package.sources()[0], &CollectingSink::new())
            .unwrap();
        assert!(root.join("run.sh").exists());
        assert!(read_install_tag(&root.join(INSTALL_TAG)).is_some());
    }

    #[test]
    fn test_scp_archive_is_copied_as_a_file_and_unzipped() {
        let temp = TempDir::new().unwrap();
        let commands = Arc::new(StubCommands {
            scp_payload: zip_bytes(&[("bin/run.sh", "echo run"), ("VERSION", "1.2")]),
            ..StubCommands::default()
        });
        let manager = manager_with(
            Transport::Scp,
            temp.path(),
            commands.clone(),
            Arc::new(StubHttp::default()),
        );
        let package = manager
            .create_package("scp://deploy@build.example.com:/srv/dist/tools.zip")
            .unwrap();
        assert!(package.sources()[0].unzip);
        let root = temp.path().join("tools");

        manager
            .install(&root, &package.sources()[0], &CollectingSink::new())
            .unwrap();

        let calls = commands.calls.lock().unwrap();
        assert_eq!(
            *calls,
            vec![vec![
                "scp".to_string(),
                "deploy@build.example.com:/srv/dist/tools.zip".to_string(),
                root.join("tools.zip").display().to_string(),
            ]]
        );
        assert!(root.join("tools.zip").exists());
        assert_eq!(
            fs::read_to_string(root.join("bin/run.sh")).unwrap(),
            "echo run"
        );
        assert_eq!(fs::read_to_string(root.join("VERSION")).unwrap(), "1.2");
        assert!(root.join(INSTALL_TAG).exists());
    }

    #[test]
    fn test_scp_jar_is_copied_without_unzipping() {
        let temp = TempDir::new().unwrap();
        let commands = Arc::new(StubCommands {
            scp_payload: b"not a zip".to_vec(),
            ..StubCommands::default()
        });
        let manager = manager_with(
            Transport::Scp,
            temp.path(),
            commands.clone(),
            Arc::new(StubHttp::default()),
        );
        let package = manager
            .create_package("scp://deploy@build.example.com:/srv/lib/core.jar")
            .unwrap();
        let root = temp.path().join("core");

        manager
            .install(&root, &package.sources()[0], &CollectingSink::new())
            .unwrap();

        let calls = commands.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert!(!calls[0].contains(&"-r".to_string()));
        assert_eq!(fs::read(root.join("core.jar")).unwrap(), b"not a zip");
    }

    #[test]
    fn test_scp_directory_is_copied_recursively() {
        let temp = TempDir::new().unwrap();
        let commands = Arc::new(StubCommands::default());
        let manager = manager_with(
            Transport::Scp,
            temp.path(),
            commands.clone(),
            Arc::new(StubHttp::default()),
        );
        let package = manager
            .create_package("scp://deploy@build.example.com:/srv/dist/tools")
            .unwrap();
        assert!(!package.sources()[0].unzip);
        let root = temp.path().join("tools");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("stale.txt"), "old").unwrap();

        manager
            .install(&root, &package.sources()[0], &CollectingSink::new())
            .unwrap();

        let calls = commands.calls.lock().unwrap();
        assert_eq!(
            *calls,
            vec![vec![
                "scp".to_string(),
                "-r".to_string(),
                "deploy@build.example.com:/srv/dist/tools".to_string(),
                root.display().to_string(),
            ]]
        );
        assert!(root.join("copied.txt").exists());
        assert!(!root.join("stale.txt").exists());
    }

    #[test]
    fn test_url_zip_is_unzipped_after_download() {
        let temp = TempDir::new().unwrap();
        let http = Arc::new(StubHttp {
            files: HashMap::from([(
                "https://dl.example.com/tools/kit.zip".to_string(),
                zip_bytes(&[("docs/readme.txt", "read me")]),
            )]),
            ..StubHttp::default()
        });
        let manager = manager_with(
            Transport::Url,
            temp.path(),
            Arc::new(StubCommands::default()),
            http.clone(),
        );
        let package = manager
            .create_package("url://dl.example.com/tools/kit.zip")
            .unwrap();
        let root = temp.path().join("kit");

        manager
            .install(&root, &package.sources()[0], &CollectingSink::new())
            .unwrap();

        assert_eq!(http.download_count(), 1);
        assert!(root.join("kit.zip").exists());
        assert_eq!(
            fs::read_to_string(root.join("docs/readme.txt")).unwrap(),
            "read me"
        );
    }

    #[test]
    fn test_local_zip_is_unzipped_after_copy() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("vendor/bundle.zip");
        fs::create_dir_all(archive.parent().unwrap()).unwrap();
        fs::write(&archive, zip_bytes(&[("lib/util.txt", "util")])).unwrap();

        let manager = RepositoryManager::local(temp.path().join("packages"));
        let package = manager
            .create_package(&format!("file://{}", archive.display()))
            .unwrap();
        assert_eq!(package.name(), "bundle");
        let root = temp.path().join("packages/bundle");

        manager
            .install(&root, &package.sources()[0], &CollectingSink::new())
            .unwrap();

        assert!(root.join("bundle.zip").exists());
        assert_eq!(fs::read_to_string(root.join("lib/util.txt")).unwrap(), "util");
    }

    #[test]
    fn test_create_package_rejects_parent_dir_names() {
        let root = Path::new("/packages");
        for url in [
            "git://example.com/..",
            "git://example.com/repo/.",
            "git://example.com/...git",
        ] {
            assert!(
                matches!(
                    RepositoryManager::git(root).create_package(url),
                    Err(Error::MalformedUrl { .. })
                ),
                "{} should be rejected",
                url
            );
        }
        assert!(RepositoryManager::url(root)
            .create_package("url://dl.example.com/files/..")
            .is_err());
        assert!(RepositoryManager::scp(root)
            .create_package("scp://deploy@host:/srv/...")
            .is_err());
        assert!(RepositoryManager::maven(root, MavenRepository::default())
            .create_package("mvn://../../..")
            .is_err());
    }

    #[test]
    fn test_update_only_pulls_git() {
        let temp = TempDir::new().unwrap();
        let commands = Arc::new(StubCommands::default());
        let git = manager_with(
            Transport::Git,
            temp.path(),
            commands.clone(),
            Arc::new(StubHttp::default()),
        );
        let source = RepositorySource::new("git", "git://example.com/lib.git", false);
        git.update(&temp.path().join("lib"), &source).unwrap();

        let url = manager_with(
            Transport::Url,
            temp.path(),
            commands.clone(),
            Arc::new(StubHttp::default()),
        );
        url.update(&temp.path().join("lib"), &source).unwrap();

        let calls = commands.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0][0], "git");
        assert_eq!(calls[0].last().map(String::as_str), Some("pull"));
    }
}

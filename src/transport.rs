//! Blocking transport primitives: external commands (git, scp), HTTP
//! downloads, archive extraction and local copies.
//!
//! The two operation traits are the seams where tests substitute stubs for
//! the network and for subprocesses.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::process::Command;
use std::time::SystemTime;

use log::debug;
use walkdir::WalkDir;
use zip::ZipArchive;

use crate::error::{Error, Result};

/// Runs external programs.
pub trait CommandOperations: Send + Sync {
    /// Run `program` with `args` and wait for it to finish.
    fn run(&self, program: &str, args: &[String]) -> Result<()>;
}

/// Fetches bytes over HTTP(S).
pub trait HttpOperations: Send + Sync {
    /// Download `url` into the file at `dest`, replacing it.
    fn download(&self, url: &str, dest: &Path) -> Result<()>;

    /// Modification time the server reports for `url`, if any.
    fn last_modified(&self, url: &str) -> Result<Option<SystemTime>>;
}

/// `CommandOperations` backed by `std::process::Command`.
///
/// This uses the system binaries, so SSH keys, credential helpers and any
/// authentication configured for git or ssh apply unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemCommands;

impl CommandOperations for SystemCommands {
    fn run(&self, program: &str, args: &[String]) -> Result<()> {
        let command = format!("{} {}", program, args.join(" "));
        debug!("Running {}", command);

        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| Error::Command {
                command: command.clone(),
                stderr: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);

            // Provide helpful error message for common auth failures
            let stderr = if stderr.contains("Authentication failed")
                || stderr.contains("Permission denied")
                || stderr.contains("Could not read from remote repository")
            {
                format!(
                    "Authentication failed. Make sure you have access to the remote.\n\
                    Check that your SSH key is loaded in ssh-agent or that credentials are configured.\n\
                    Error: {}",
                    stderr.trim()
                )
            } else {
                stderr.trim().to_string()
            };

            return Err(Error::Command { command, stderr });
        }

        Ok(())
    }
}

/// `HttpOperations` backed by a blocking `ureq` agent.
#[derive(Clone)]
pub struct UreqHttp {
    agent: ureq::Agent,
}

impl UreqHttp {
    pub fn new() -> Self {
        Self {
            agent: ureq::AgentBuilder::new()
                .user_agent(concat!("repo-packages/", env!("CARGO_PKG_VERSION")))
                .build(),
        }
    }
}

impl Default for UreqHttp {
    fn default() -> Self {
        Self::new()
    }
}

fn map_ureq_error(url: &str, error: ureq::Error) -> Error {
    match error {
        ureq::Error::Status(status, _) => Error::Http {
            url: url.to_string(),
            status,
        },
        other => Error::Network {
            url: url.to_string(),
            message: other.to_string(),
        },
    }
}

impl HttpOperations for UreqHttp {
    fn download(&self, url: &str, dest: &Path) -> Result<()> {
        debug!("Downloading {} to {}", url, dest.display());
        let response = self
            .agent
            .get(url)
            .call()
            .map_err(|e| map_ureq_error(url, e))?;

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write next to the target first so an interrupted transfer never
        // leaves a truncated file under the final name.
        let partial = partial_path(dest);
        let mut file = fs::File::create(&partial)?;
        let mut reader = response.into_reader();
        if let Err(e) = io::copy(&mut reader, &mut file) {
            let _ = fs::remove_file(&partial);
            return Err(Error::Network {
                url: url.to_string(),
                message: e.to_string(),
            });
        }
        fs::rename(&partial, dest)?;
        Ok(())
    }

    fn last_modified(&self, url: &str) -> Result<Option<SystemTime>> {
        let response = self
            .agent
            .head(url)
            .call()
            .map_err(|e| map_ureq_error(url, e))?;
        Ok(response.header("Last-Modified").and_then(parse_http_date))
    }
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}

/// Parse an HTTP date header (`Wed, 21 Oct 2015 07:28:00 GMT`).
pub fn parse_http_date(value: &str) -> Option<SystemTime> {
    chrono::DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(SystemTime::from)
}

/// Arguments for `git clone <url> <target>`.
pub fn git_clone_args(url: &str, target_dir: &Path) -> Vec<String> {
    vec![
        "clone".to_string(),
        url.to_string(),
        target_dir.display().to_string(),
    ]
}

/// Arguments for `git -C <dir> pull`.
pub fn git_pull_args(dir: &Path) -> Vec<String> {
    vec!["-C".to_string(), dir.display().to_string(), "pull".to_string()]
}

/// Arguments for `scp [-r] <remote> <target>`.
pub fn scp_args(remote: &str, target: &Path, recursive: bool) -> Vec<String> {
    let mut args = Vec::new();
    if recursive {
        args.push("-r".to_string());
    }
    args.push(remote.to_string());
    args.push(target.display().to_string());
    args
}

/// True when `name` ends with an archive extension scp copies as one file.
pub fn is_archive(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.ends_with(".zip") || lower.ends_with(".jar")
}

/// Remove `dir` and create its parent so a tool can create `dir` itself.
pub fn prepare_target_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir)?;
    }
    if let Some(parent) = dir.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Extract every entry of the zip archive at `archive` into `dest`.
///
/// Entries whose names would escape `dest` are rejected.
pub fn unzip(archive: &Path, dest: &Path) -> Result<()> {
    let file = fs::File::open(archive)?;
    let mut zip = ZipArchive::new(file)?;
    fs::create_dir_all(dest)?;

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        let relative = safe_relative_path(Path::new(entry.name())).ok_or_else(|| {
            Error::Archive {
                path: archive.display().to_string(),
                message: format!("unsafe entry name {}", entry.name()),
            }
        })?;
        let out_path = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
        } else {
            if let Some(parent) = out_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out = fs::File::create(&out_path)?;
            io::copy(&mut entry, &mut out)?;
        }
    }
    Ok(())
}

fn safe_relative_path(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(segment) => out.push(segment),
            Component::CurDir => {}
            Component::Prefix(_) | Component::RootDir | Component::ParentDir => return None,
        }
    }
    Some(out)
}

/// Copy a file into `dest_dir`, or the contents of a directory into
/// `dest_dir`.
pub fn copy_local(source: &Path, dest_dir: &Path) -> Result<()> {
    fs::create_dir_all(dest_dir)?;

    if source.is_file() {
        let name = source.file_name().ok_or_else(|| Error::Transport {
            url: source.display().to_string(),
            message: "source has no file name".to_string(),
        })?;
        fs::copy(source, dest_dir.join(name))?;
        return Ok(());
    }

    if !source.is_dir() {
        return Err(Error::Transport {
            url: source.display().to_string(),
            message: "no such file or directory".to_string(),
        });
    }

    for entry in WalkDir::new(source).min_depth(1) {
        let entry = entry.map_err(|e| Error::Transport {
            url: source.display().to_string(),
            message: e.to_string(),
        })?;
        let Ok(relative) = entry.path().strip_prefix(source) else {
            continue;
        };
        let target = dest_dir.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Modification time of a local file or directory.
pub fn local_modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

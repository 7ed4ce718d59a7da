//! # Error Handling
//!
//! This module defines the centralized error type for the package
//! resolution subsystem. It uses `thiserror` to build one `Error` enum whose
//! variants carry enough context (URL, package, command, status) to produce a
//! useful diagnostic on their own.
//!
//! Most failures in this crate are not fatal to a build: a transport error
//! means "this package did not install". The `RepositorySystem` turns these
//! errors into messages for the active `MessageSink` and keeps resolving the
//! rest of the dependency graph. The error type is therefore mostly consumed
//! through its `Display` implementation.

use thiserror::Error;

/// Main error type for repository package operations
#[derive(Error, Debug)]
pub enum Error {
    /// The scheme of a package URL does not name a registered manager.
    #[error("No such repository: {scheme} (for url: {url})")]
    NoSuchRepository { scheme: String, url: String },

    /// A package URL could not be split into a scheme and a location, or the
    /// location is not meaningful for the manager.
    #[error("Malformed package url {url}: {message}")]
    MalformedUrl { url: String, message: String },

    /// A transport failed to fetch a source.
    #[error("Failed to fetch {url}: {message}")]
    Transport { url: String, message: String },

    /// An external command (git, scp) failed.
    #[error("Command failed: {command} - {stderr}")]
    Command { command: String, stderr: String },

    /// An HTTP request returned a non-success status.
    #[error("HTTP {status} for {url}")]
    Http { url: String, status: u16 },

    /// An HTTP request failed before a status was received.
    #[error("Network operation error: {url} - {message}")]
    Network { url: String, message: String },

    /// A POM descriptor could not be read or parsed.
    #[error("POM parsing error in {location}: {message}")]
    PomParse { location: String, message: String },

    /// A persisted package record is unreadable.
    #[error("Package metadata error for {package}: {message}")]
    Metadata { package: String, message: String },

    /// Unzipping a fetched archive failed.
    #[error("Archive error for {path}: {message}")]
    Archive { path: String, message: String },

    /// The configuration file is invalid.
    #[error("Configuration parsing error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ConfigParse {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// Every candidate source of a package failed.
    #[error("Failed to install package {package}: {message}")]
    Install { package: String, message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON error, wrapped from `serde_json::Error`.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A URL parsing error, wrapped from `url::ParseError`.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// A zip archive error, wrapped from `zip::result::ZipError`.
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

impl Error {
    /// True for HTTP "not found" responses, which a mirror list treats as
    /// "try the next mirror" rather than as a hard failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Http { status: 404, .. })
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

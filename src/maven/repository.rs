//! Ordered list of Maven repository mirrors.

use std::path::Path;

use log::debug;

use crate::error::{Error, Result};
use crate::transport::HttpOperations;

/// Maven Central, used when no mirror is configured.
pub const MAVEN_CENTRAL: &str = "https://repo1.maven.org/maven2";

/// Base URLs tried in order until one serves the requested file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MavenRepository {
    mirrors: Vec<String>,
}

impl MavenRepository {
    pub fn new<I, S>(mirrors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mirrors: Vec<String> = mirrors
            .into_iter()
            .map(|mirror| mirror.into().trim_end_matches('/').to_string())
            .filter(|mirror| !mirror.is_empty())
            .collect();
        if mirrors.is_empty() {
            return Self::default();
        }
        Self { mirrors }
    }

    pub fn mirrors(&self) -> &[String] {
        &self.mirrors
    }

    /// Download `relative_path` into `dest` from the first mirror that has
    /// it, optionally trying `preferred` first. Returns the mirror used.
    pub fn fetch(
        &self,
        http: &dyn HttpOperations,
        relative_path: &str,
        dest: &Path,
        preferred: Option<&str>,
    ) -> Result<String> {
        let ordered = preferred
            .into_iter()
            .chain(
                self.mirrors
                    .iter()
                    .map(String::as_str)
                    .filter(|mirror| Some(*mirror) != preferred),
            );

        let mut errors = Vec::new();
        for mirror in ordered {
            let url = format!("{}/{}", mirror, relative_path);
            match http.download(&url, dest) {
                Ok(()) => {
                    debug!("Fetched {} from {}", relative_path, mirror);
                    return Ok(mirror.to_string());
                }
                Err(e) if e.is_not_found() => {
                    debug!("{} not found on mirror {}", relative_path, mirror);
                    errors.push(e.to_string());
                }
                Err(e) => {
                    debug!("Mirror {} failed for {}: {}", mirror, relative_path, e);
                    errors.push(e.to_string());
                }
            }
        }

        Err(Error::Transport {
            url: relative_path.to_string(),
            message: if errors.is_empty() {
                "no Maven mirrors configured".to_string()
            } else {
                errors.join("; ")
            },
        })
    }
}

impl Default for MavenRepository {
    fn default() -> Self {
        Self {
            mirrors: vec![MAVEN_CENTRAL.to_string()],
        }
    }
}

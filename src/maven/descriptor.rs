//! Maven coordinates and the repository layout derived from them.

use std::fmt;

use crate::error::{Error, Result};
use crate::package::is_valid_name_segment;

/// Scheme of Maven package URLs.
pub const MAVEN_SCHEME: &str = "mvn";

/// `groupId/artifactId/version` of one artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MavenDescriptor {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
}

impl MavenDescriptor {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
        }
    }

    /// Parse `mvn://groupId/artifactId/version`.
    pub fn from_url(url: &str) -> Result<Self> {
        url.strip_prefix(MAVEN_SCHEME)
            .and_then(|rest| rest.strip_prefix("://"))
            .and_then(Self::from_coordinates)
            .ok_or_else(|| Error::MalformedUrl {
                url: url.to_string(),
                message: "expected mvn://groupId/artifactId/version".to_string(),
            })
    }

    /// Parse `groupId/artifactId/version`. Each coordinate must be usable
    /// as a single directory name.
    pub fn from_coordinates(location: &str) -> Option<Self> {
        let parts: Vec<&str> = location.trim_matches('/').split('/').collect();
        match parts.as_slice() {
            [group_id, artifact_id, version]
                if parts.iter().all(|part| is_valid_name_segment(part)) =>
            {
                Some(Self::new(*group_id, *artifact_id, *version))
            }
            _ => None,
        }
    }

    pub fn to_url(&self) -> String {
        format!("{}://{}", MAVEN_SCHEME, self.package_name())
    }

    /// Package name, also the install directory below the manager root.
    pub fn package_name(&self) -> String {
        format!("{}/{}/{}", self.group_id, self.artifact_id, self.version)
    }

    /// Directory of this version inside a repository.
    pub fn repository_dir(&self) -> String {
        format!(
            "{}/{}/{}",
            self.group_id.replace('.', "/"),
            self.artifact_id,
            self.version
        )
    }

    pub fn pom_file_name(&self) -> String {
        format!("{}-{}.pom", self.artifact_id, self.version)
    }

    pub fn jar_file_name(&self) -> String {
        format!("{}-{}.jar", self.artifact_id, self.version)
    }

    pub fn pom_path(&self) -> String {
        format!("{}/{}", self.repository_dir(), self.pom_file_name())
    }

    pub fn jar_path(&self) -> String {
        format!("{}/{}", self.repository_dir(), self.jar_file_name())
    }
}

impl fmt::Display for MavenDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)
    }
}

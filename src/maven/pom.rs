//! POM descriptor reading.
//!
//! Only what dependency discovery needs is interpreted: coordinates,
//! packaging, `<properties>` and the `<dependencies>` list. Inheritance from
//! a parent POM, dependency management, exclusions and version ranges are not
//! resolved.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use log::debug;
use regex::Regex;

use super::descriptor::MavenDescriptor;
use crate::error::{Error, Result};
use crate::message::{Message, MessageSink};
use crate::xml::{self, XmlElement};

/// Scope assumed for dependencies that do not declare one.
pub const DEFAULT_SCOPE: &str = "compile";

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("valid placeholder regex"))
}

/// A parsed POM file.
#[derive(Debug, Clone)]
pub struct Pom {
    root: XmlElement,
    location: String,
    properties: HashMap<String, String>,
}

impl Pom {
    /// Parse POM text. `location` names the file in diagnostics.
    pub fn parse(text: &str, location: &str) -> Result<Self> {
        let root = xml::parse_document(text).map_err(|message| Error::PomParse {
            location: location.to_string(),
            message,
        })?;
        let mut pom = Self {
            root,
            location: location.to_string(),
            properties: HashMap::new(),
        };
        pom.properties = pom.collect_properties();
        Ok(pom)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| Error::PomParse {
            location: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::parse(&text, &path.display().to_string())
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// The root tag name; a well-formed POM uses `project`.
    pub fn root_name(&self) -> &str {
        &self.root.name
    }

    pub fn group_id(&self) -> Option<&str> {
        self.root
            .child_text("groupId")
            .or_else(|| self.parent_text("groupId"))
    }

    pub fn artifact_id(&self) -> Option<&str> {
        self.root.child_text("artifactId")
    }

    pub fn version(&self) -> Option<&str> {
        self.root
            .child_text("version")
            .or_else(|| self.parent_text("version"))
    }

    /// `<packaging>`, defaulting to `jar`.
    pub fn packaging(&self) -> &str {
        self.root.child_text("packaging").unwrap_or("jar")
    }

    fn parent_text(&self, name: &str) -> Option<&str> {
        self.root.child("parent").and_then(|p| p.child_text(name))
    }

    fn collect_properties(&self) -> HashMap<String, String> {
        let mut properties = HashMap::new();
        if let Some(block) = self.root.child("properties") {
            for property in &block.children {
                properties.insert(property.name.clone(), property.text.trim().to_string());
            }
        }
        for (key, value) in [
            ("project.groupId", self.group_id()),
            ("project.artifactId", self.artifact_id()),
            ("project.version", self.version()),
            ("project.parent.version", self.parent_text("version")),
            ("project.parent.groupId", self.parent_text("groupId")),
        ] {
            if let Some(value) = value {
                properties.insert(key.to_string(), value.to_string());
            }
        }
        properties
    }

    /// Replace `${name}` placeholders from the POM's properties. Unknown
    /// placeholders are left in place.
    pub fn substitute(&self, value: &str) -> String {
        let mut current = value.to_string();
        // Properties may refer to other properties; bound the expansion.
        for _ in 0..8 {
            if !current.contains("${") {
                break;
            }
            let next = placeholder_regex()
                .replace_all(&current, |caps: &regex::Captures| {
                    self.properties
                        .get(&caps[1])
                        .cloned()
                        .unwrap_or_else(|| caps[0].to_string())
                })
                .into_owned();
            if next == current {
                break;
            }
            current = next;
        }
        current
    }

    /// Dependencies declared with `scope` (an omitted scope counts as
    /// `compile`).
    ///
    /// More than one `<dependencies>` block is reported and only the first is
    /// read. Optional dependencies and entries without complete coordinates
    /// are skipped with an informational message.
    pub fn dependencies(&self, scope: &str, sink: &dyn MessageSink) -> Vec<MavenDescriptor> {
        if self.root.name != "project" {
            sink.report(
                Message::warning(format!(
                    "Expected <project> as POM root tag, found <{}>",
                    self.root.name
                ))
                .at(&self.location),
            );
        }

        let mut blocks = self.root.children_named("dependencies");
        let Some(block) = blocks.next() else {
            return Vec::new();
        };
        if blocks.next().is_some() {
            sink.report(
                Message::warning("Multiple <dependencies> tags; using the first one")
                    .at(&self.location),
            );
        }

        let mut result = Vec::new();
        for child in &block.children {
            if child.name != "dependency" {
                sink.report(
                    Message::warning(format!(
                        "Unexpected tag <{}> inside <dependencies>",
                        child.name
                    ))
                    .at(&self.location),
                );
                continue;
            }

            let dependency_scope = child.child_text("scope").unwrap_or(DEFAULT_SCOPE);
            if dependency_scope != scope {
                continue;
            }
            if child.child_text("optional") == Some("true") {
                debug!("{}: skipping optional dependency", self.location);
                continue;
            }

            let group_id = child.child_text("groupId").map(|v| self.substitute(v));
            let artifact_id = child.child_text("artifactId").map(|v| self.substitute(v));
            let version = child.child_text("version").map(|v| self.substitute(v));

            match (group_id, artifact_id, version) {
                (Some(group_id), Some(artifact_id), Some(version))
                    if ![&group_id, &artifact_id, &version]
                        .iter()
                        .any(|v| v.contains("${")) =>
                {
                    result.push(MavenDescriptor::new(group_id, artifact_id, version));
                }
                (group_id, artifact_id, version) => {
                    sink.report(
                        Message::info(format!(
                            "Skipping dependency without resolvable coordinates: {}:{}:{}",
                            group_id.as_deref().unwrap_or("?"),
                            artifact_id.as_deref().unwrap_or("?"),
                            version.as_deref().unwrap_or("?"),
                        ))
                        .at(&self.location),
                    );
                }
            }
        }
        result
    }
}

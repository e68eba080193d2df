//! Artifact identifiers and graph nodes.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::path::{Dependency, Override, PathPolicy};
use crate::version::Version;

/// Fully-versioned artifact identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArtifactId {
    pub group: String,
    pub name: String,
    /// Artifact type, e.g. `jar` or `zip`.
    pub kind: String,
    pub version: Version,
}

impl ArtifactId {
    pub fn new(
        group: impl Into<String>,
        name: impl Into<String>,
        kind: impl Into<String>,
        version: Version,
    ) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
            kind: kind.into(),
            version,
        }
    }

    /// Parse `"group:name:kind:version"` shorthand.
    pub fn parse(s: &str) -> Result<Self, ModelError> {
        let parts: Vec<&str> = s.split(':').collect();
        let [group, name, kind, version] = parts.as_slice() else {
            return Err(ModelError::ArtifactId {
                input: s.to_string(),
            });
        };
        if group.is_empty() || name.is_empty() || kind.is_empty() {
            return Err(ModelError::ArtifactId {
                input: s.to_string(),
            });
        }
        Ok(Self {
            group: group.to_string(),
            name: name.to_string(),
            kind: kind.to_string(),
            version: Version::parse(version)?,
        })
    }

    /// The identity used for conflict bucketing.
    pub fn unversioned(&self) -> UnversionedId {
        UnversionedId {
            group: self.group.clone(),
            name: self.name.clone(),
            kind: self.kind.clone(),
        }
    }

    /// The same id at a different version.
    pub fn with_version(&self, version: Version) -> Self {
        Self {
            version,
            ..self.clone()
        }
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}:{}", self.group, self.name, self.kind, self.version)
    }
}

/// Artifact identity without the version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnversionedId {
    pub group: String,
    pub name: String,
    pub kind: String,
}

impl fmt::Display for UnversionedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.name, self.kind)
    }
}

/// How an artifact claims identity with another family beyond exact id
/// equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictKind {
    /// The declared artifact's payload is packaged inside this one.
    Bundled,
    /// This artifact used to ship under the declared id; the declared
    /// version is this same code under its old name.
    Renamed,
    /// Renamed with a version numbering restart, so no version of the old
    /// name can coexist.
    RenamedReset,
    /// Same payload published under a different id.
    Equivalent,
    /// The declared id is another name for this artifact.
    Alias,
}

/// Declares that this artifact clashes with another id or family even
/// without exact id equality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictDeclaration {
    pub kind: ConflictKind,
    pub id: ArtifactId,
}

impl ConflictDeclaration {
    pub fn new(kind: ConflictKind, id: ArtifactId) -> Self {
        Self { kind, id }
    }
}

/// A node of the artifact graph.
///
/// Artifacts are shared, read-only graph state; the resolver works on
/// owned clones handed out by the artifact source, so annotations made
/// during one resolution never leak into another.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub id: ArtifactId,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
    #[serde(default)]
    pub path_policies: Vec<PathPolicy>,
    /// Consulted in declaration order; the first match wins.
    #[serde(default)]
    pub overrides: Vec<Override>,
    #[serde(default)]
    pub conflicts: Vec<ConflictDeclaration>,
    /// Where a retrieved payload lives locally, if anywhere.
    #[serde(default)]
    pub local_copy: Option<PathBuf>,
    /// A stub carries no redistributable payload; resolving one requires
    /// explicit permission unless a local copy exists.
    #[serde(default)]
    pub stub: bool,
}

impl Artifact {
    pub fn new(id: ArtifactId) -> Self {
        Self {
            id,
            dependencies: Vec::new(),
            path_policies: Vec::new(),
            overrides: Vec::new(),
            conflicts: Vec::new(),
            local_copy: None,
            stub: false,
        }
    }

    /// The policy this artifact declares for a path, if any.
    pub fn path_policy(&self, path: &str) -> Option<&PathPolicy> {
        self.path_policies.iter().find(|p| p.id == path)
    }
}

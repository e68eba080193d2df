//! Path policies, path specs, dependencies, and overrides.
//!
//! A *path* is a named traversal policy ("runtime", "compile", ...). Each
//! dependency edge declares how it participates in a path through a
//! [`PathSpec`]: which path it joins (`to`), which path of the target feeds
//! the next level (`from`), whether the edge is mandatory, whether the walk
//! descends through it, and which optional selectors it carries.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::artifact::ArtifactId;
use crate::errors::ModelError;
use crate::version::{Version, VersionRangeUnion};
use crate::DEFAULT_PATH;

/// Named path definition on an artifact, supplying defaults for specs that
/// target it without setting their own flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathPolicy {
    pub id: String,
    #[serde(default = "default_true", rename = "descend-default")]
    pub descend_default: bool,
    #[serde(default, rename = "mandatory-default")]
    pub mandatory_default: bool,
}

fn default_true() -> bool {
    true
}

impl PathPolicy {
    pub fn new(id: impl Into<String>, descend_default: bool, mandatory_default: bool) -> Self {
        Self {
            id: id.into(),
            descend_default,
            mandatory_default,
        }
    }
}

/// One dependency edge's participation in a path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathSpec {
    /// The path this edge joins.
    pub to: String,
    /// The target's path feeding the next level; `None` means "runtime".
    #[serde(default)]
    pub from: Option<String>,
    /// A-la-carte selector expression activating optional dependencies.
    #[serde(default)]
    pub options: Option<String>,
    #[serde(default)]
    pub descend: Option<bool>,
    #[serde(default)]
    pub mandatory: Option<bool>,
}

impl PathSpec {
    pub fn new(to: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            from: None,
            options: None,
            descend: None,
            mandatory: None,
        }
    }

    /// Parse the compact form `to['+'|'?']['<'|'>']['(' options ')']`:
    /// `+` mandatory, `?` explicitly optional, `<` no descent, `>` descent.
    ///
    /// `"runtime?<"` is an optional edge the walk never descends through;
    /// `"runtime+(a,b(c))"` is a mandatory edge carrying selectors.
    pub fn parse(input: &str) -> Result<Self, ModelError> {
        let fail = |reason: &str| ModelError::PathSpec {
            input: input.to_string(),
            reason: reason.to_string(),
        };
        let (head, options) = match input.find('(') {
            Some(open) => {
                if !input.ends_with(')') {
                    return Err(fail("unterminated option list"));
                }
                (&input[..open], Some(input[open + 1..input.len() - 1].to_string()))
            }
            None => (input, None),
        };
        let name_end = head
            .find(|c| matches!(c, '+' | '?' | '<' | '>'))
            .unwrap_or(head.len());
        let to = &head[..name_end];
        if to.is_empty() {
            return Err(fail("missing path name"));
        }
        if !to
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        {
            return Err(fail("path names are alphanumeric with '.', '-', '_'"));
        }
        let mut spec = Self::new(to);
        spec.options = options;
        for flag in head[name_end..].chars() {
            match flag {
                '+' => spec.mandatory = Some(true),
                '?' => spec.mandatory = Some(false),
                '<' => spec.descend = Some(false),
                '>' => spec.descend = Some(true),
                other => return Err(fail(&format!("unexpected flag '{other}'"))),
            }
        }
        Ok(spec)
    }

    /// Fill unset flags from the path's policy and default the `from` side.
    pub fn merge_defaults(&mut self, policy: Option<&PathPolicy>) {
        let (descend, mandatory) = policy
            .map(|p| (p.descend_default, p.mandatory_default))
            .unwrap_or((true, false));
        if self.descend.is_none() {
            self.descend = Some(descend);
        }
        if self.mandatory.is_none() {
            self.mandatory = Some(mandatory);
        }
        if self.from.is_none() {
            self.from = Some(DEFAULT_PATH.to_string());
        }
    }

    pub fn from_path(&self) -> &str {
        self.from.as_deref().unwrap_or(DEFAULT_PATH)
    }

    pub fn descends(&self) -> bool {
        self.descend.unwrap_or(true)
    }

    pub fn is_mandatory(&self) -> bool {
        self.mandatory.unwrap_or(false)
    }
}

impl fmt::Display for PathSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to)?;
        match self.mandatory {
            Some(true) => f.write_str("+")?,
            Some(false) => f.write_str("?")?,
            None => {}
        }
        match self.descend {
            Some(false) => f.write_str("<")?,
            Some(true) => f.write_str(">")?,
            None => {}
        }
        if let Some(options) = &self.options {
            write!(f, "({options})")?;
        }
        Ok(())
    }
}

/// A dependency edge: the target artifact plus its path participations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dependency {
    pub target: ArtifactId,
    #[serde(default)]
    pub specs: Vec<PathSpec>,
}

impl Dependency {
    pub fn new(target: ArtifactId) -> Self {
        Self {
            target,
            specs: Vec::new(),
        }
    }

    pub fn with_spec(mut self, spec: PathSpec) -> Self {
        self.specs.push(spec);
        self
    }

    /// Specs joining the named path.
    pub fn specs_to<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a PathSpec> {
        self.specs.iter().filter(move |s| s.to == path)
    }
}

/// Replaces a matching dependency's version and/or path behavior within a
/// path scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Override {
    /// Path names this override is scoped to; `"*"` (or an empty list)
    /// applies everywhere.
    #[serde(default)]
    pub paths: Vec<String>,
    pub group: String,
    pub name: String,
    pub kind: String,
    pub range: VersionRangeUnion,
    #[serde(default, rename = "with-version")]
    pub with_version: Option<Version>,
    /// Replacement specs, merged field-wise onto the dependency's spec with
    /// the same effective `from`; unmatched replacements are added.
    #[serde(default, rename = "with-specs")]
    pub with_specs: Vec<PathSpec>,
}

impl Override {
    pub fn applies_to(&self, path: &str) -> bool {
        self.paths.is_empty() || self.paths.iter().any(|p| p == "*" || p == path)
    }

    pub fn matches(&self, target: &ArtifactId) -> bool {
        self.group == target.group
            && self.name == target.name
            && self.kind == target.kind
            && self.range.contains(&target.version)
    }

    /// The same override rescoped to all paths, for handing down to
    /// descendant levels once its original scope matched.
    pub fn broadened(&self) -> Self {
        Self {
            paths: vec!["*".to_string()],
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compact_spec_flags() {
        let spec = PathSpec::parse("runtime?<").unwrap();
        assert_eq!(spec.to, "runtime");
        assert_eq!(spec.mandatory, Some(false));
        assert_eq!(spec.descend, Some(false));
        assert!(spec.options.is_none());
    }

    #[test]
    fn compact_spec_options() {
        let spec = PathSpec::parse("root+(dep1_1(dep1_1_1),dep1_2)").unwrap();
        assert_eq!(spec.to, "root");
        assert_eq!(spec.mandatory, Some(true));
        assert_eq!(spec.options.as_deref(), Some("dep1_1(dep1_1_1),dep1_2"));
    }

    #[test]
    fn compact_spec_errors() {
        assert!(PathSpec::parse("").is_err());
        assert!(PathSpec::parse("+").is_err());
        assert!(PathSpec::parse("root(a,b").is_err());
        assert!(PathSpec::parse("root!").is_err());
    }

    #[test]
    fn compact_spec_display_round_trip() {
        for s in ["root", "root+", "root?<", "root+(a,b(c))"] {
            let spec = PathSpec::parse(s).unwrap();
            assert_eq!(PathSpec::parse(&spec.to_string()).unwrap(), spec);
        }
    }

    #[test]
    fn merge_defaults_from_policy() {
        let policy = PathPolicy::new("root", false, true);
        let mut spec = PathSpec::new("root");
        spec.merge_defaults(Some(&policy));
        assert_eq!(spec.descend, Some(false));
        assert_eq!(spec.mandatory, Some(true));
        assert_eq!(spec.from.as_deref(), Some(DEFAULT_PATH));
    }

    #[test]
    fn merge_defaults_keeps_explicit_flags() {
        let policy = PathPolicy::new("root", false, true);
        let mut spec = PathSpec::parse("root?>").unwrap();
        spec.merge_defaults(Some(&policy));
        assert_eq!(spec.descend, Some(true));
        assert_eq!(spec.mandatory, Some(false));
    }

    #[test]
    fn merge_defaults_without_policy() {
        let mut spec = PathSpec::new("root");
        spec.merge_defaults(None);
        assert_eq!(spec.descend, Some(true));
        assert_eq!(spec.mandatory, Some(false));
    }

    #[test]
    fn override_scope_and_match() {
        let id = ArtifactId::parse("g:n:jar:1.5").unwrap();
        let ov = Override {
            paths: vec!["root".to_string()],
            group: "g".to_string(),
            name: "n".to_string(),
            kind: "jar".to_string(),
            range: VersionRangeUnion::parse("[1.0,2.0)").unwrap(),
            with_version: None,
            with_specs: Vec::new(),
        };
        assert!(ov.applies_to("root"));
        assert!(!ov.applies_to("test"));
        assert!(ov.matches(&id));
        assert!(!ov.matches(&id.with_version(Version::parse("2.0").unwrap())));
        assert!(ov.broadened().applies_to("test"));
    }
}

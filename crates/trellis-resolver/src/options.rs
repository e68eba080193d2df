//! A-la-carte option selectors.
//!
//! A path spec's `options` string activates otherwise-optional
//! dependencies. Each selector follows
//! `['-']['group':]name['@'version]['(' nested ')']`; selectors are
//! separated by `,` or `;` at the top level only, so nested lists travel
//! intact to the next resolution level.

use std::fmt;

use trellis_core::artifact::ArtifactId;
use trellis_core::version::Version;

use crate::errors::ResolveError;

/// One parsed option selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    /// `-name` deactivates instead of activating.
    pub exclude: bool,
    pub group: Option<String>,
    pub name: String,
    /// Explicit version pin from `name@version`.
    pub version: Option<Version>,
    /// Unparsed selector list for the next level, from `name(...)`.
    pub nested: Option<String>,
}

impl Selector {
    /// Parse a full selector list, splitting at top level only.
    pub fn parse_list(input: &str) -> Result<Vec<Selector>, ResolveError> {
        split_top_level(input)?
            .iter()
            .map(|token| Selector::parse(token, input))
            .collect()
    }

    fn parse(token: &str, whole: &str) -> Result<Selector, ResolveError> {
        let fail = |reason: &str| ResolveError::InvalidOptionSyntax {
            input: whole.to_string(),
            reason: reason.to_string(),
        };
        let token = token.trim();
        let (exclude, rest) = match token.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, token),
        };
        let (head, nested) = match rest.find('(') {
            Some(open) => {
                if !rest.ends_with(')') {
                    return Err(fail("unterminated nested option list"));
                }
                (&rest[..open], Some(rest[open + 1..rest.len() - 1].to_string()))
            }
            None => (rest, None),
        };
        let (name_part, version) = match head.split_once('@') {
            Some((name, version)) => (name, Some(Version::parse(version)?)),
            None => (head, None),
        };
        let (group, name) = match name_part.split_once(':') {
            Some((group, name)) => (Some(group.to_string()), name.to_string()),
            None => (None, name_part.to_string()),
        };
        if name.is_empty() {
            return Err(fail("empty selector name"));
        }
        let valid =
            |s: &str| s.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'));
        if !valid(&name) || !group.as_deref().map(valid).unwrap_or(true) {
            return Err(fail("selector names are alphanumeric with '.', '-', '_'"));
        }
        Ok(Selector {
            exclude,
            group,
            name,
            version,
            nested,
        })
    }

    /// Whether this selector names the given dependency target.
    ///
    /// With a group the match is exact on group and name; without one it
    /// matches by name alone (ambiguity is the caller's concern).
    pub fn matches(&self, target: &ArtifactId) -> bool {
        match &self.group {
            Some(group) => *group == target.group && self.name == target.name,
            None => self.name == target.name,
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.exclude {
            f.write_str("-")?;
        }
        if let Some(group) = &self.group {
            write!(f, "{group}:")?;
        }
        f.write_str(&self.name)?;
        if let Some(version) = &self.version {
            write!(f, "@{version}")?;
        }
        if let Some(nested) = &self.nested {
            write!(f, "({nested})")?;
        }
        Ok(())
    }
}

/// Split a selector list at `,`/`;` outside any parentheses.
pub fn split_top_level(input: &str) -> Result<Vec<String>, ResolveError> {
    let fail = |reason: &str| ResolveError::InvalidOptionSyntax {
        input: input.to_string(),
        reason: reason.to_string(),
    };
    if input.trim().is_empty() {
        return Ok(Vec::new());
    }
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    for c in input.chars() {
        match c {
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth = depth.checked_sub(1).ok_or_else(|| fail("unbalanced ')'"))?;
                current.push(c);
            }
            ',' | ';' if depth == 0 => {
                if current.trim().is_empty() {
                    return Err(fail("empty selector"));
                }
                tokens.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    if depth != 0 {
        return Err(fail("unbalanced '('"));
    }
    if current.trim().is_empty() {
        return Err(fail("empty selector"));
    }
    tokens.push(current);
    Ok(tokens)
}

/// True when every selector is an exclusion (and there is at least one).
pub fn all_exclusions(selectors: &[Selector]) -> bool {
    !selectors.is_empty() && selectors.iter().all(|s| s.exclude)
}

/// True when the accumulated option strings activate nothing: no tokens at
/// all, or exclusion tokens only.
pub fn inert(options: &[String]) -> Result<bool, ResolveError> {
    for string in options {
        for token in split_top_level(string)? {
            if !token.trim().starts_with('-') {
                return Ok(false);
            }
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one(input: &str) -> Selector {
        let mut list = Selector::parse_list(input).unwrap();
        assert_eq!(list.len(), 1);
        list.pop().unwrap()
    }

    #[test]
    fn plain_name() {
        let sel = one("dep1_1");
        assert!(!sel.exclude);
        assert_eq!(sel.name, "dep1_1");
        assert!(sel.group.is_none() && sel.version.is_none() && sel.nested.is_none());
    }

    #[test]
    fn full_grammar() {
        let sel = one("-org.example:lib@2.0(inner,other(deep))");
        assert!(sel.exclude);
        assert_eq!(sel.group.as_deref(), Some("org.example"));
        assert_eq!(sel.name, "lib");
        assert_eq!(sel.version, Some(Version::parse("2.0").unwrap()));
        assert_eq!(sel.nested.as_deref(), Some("inner,other(deep)"));
    }

    #[test]
    fn top_level_split_skips_nested_commas() {
        let list = Selector::parse_list("a(b,c),d;e(f;g)").unwrap();
        let names: Vec<&str> = list.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["a", "d", "e"]);
        assert_eq!(list[0].nested.as_deref(), Some("b,c"));
        assert_eq!(list[2].nested.as_deref(), Some("f;g"));
    }

    #[test]
    fn nested_lists_parse_one_level_at_a_time() {
        let outer = one("a(b(c),d)");
        let inner = Selector::parse_list(outer.nested.as_deref().unwrap()).unwrap();
        assert_eq!(inner.len(), 2);
        assert_eq!(inner[0].nested.as_deref(), Some("c"));
    }

    #[test]
    fn syntax_errors() {
        assert!(Selector::parse_list("a(b").is_err());
        assert!(Selector::parse_list("a)b").is_err());
        assert!(Selector::parse_list("a,,b").is_err());
        assert!(Selector::parse_list("@1.0").is_err());
        assert!(Selector::parse_list("a/b").is_err());
    }

    #[test]
    fn matching_with_and_without_group() {
        let target = ArtifactId::parse("org.example:lib:jar:1.0").unwrap();
        assert!(one("lib").matches(&target));
        assert!(one("org.example:lib").matches(&target));
        assert!(!one("other:lib").matches(&target));
        assert!(!one("libx").matches(&target));
    }

    #[test]
    fn exclusion_classification() {
        let pool = Selector::parse_list("-a,-b").unwrap();
        assert!(all_exclusions(&pool));
        let mixed = Selector::parse_list("-a,b").unwrap();
        assert!(!all_exclusions(&mixed));
        assert!(!all_exclusions(&[]));
    }

    #[test]
    fn inert_pools() {
        assert!(inert(&[]).unwrap());
        assert!(inert(&["".to_string()]).unwrap());
        assert!(inert(&["-a,-b".to_string()]).unwrap());
        assert!(!inert(&["-a,b".to_string()]).unwrap());
        assert!(!inert(&["a".to_string()]).unwrap());
    }

    #[test]
    fn display_round_trip() {
        for s in ["lib", "-lib", "g:lib@2.0", "lib(a,b(c))"] {
            let sel = one(s);
            assert_eq!(sel.to_string(), s);
        }
    }
}

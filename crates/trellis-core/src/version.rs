//! Version parsing, comparison, and range matching.
//!
//! Build-tool versions use a dotted numeric form with an optional qualifier
//! and a repository counter, e.g. `1.2.3-beta~2`:
//! - up to four numeric fields `major.minor.micro.update`
//! - an optional `-qualifier` (letters, digits, dashes)
//! - an optional `~N` suffix counting republications of the same version
//!
//! Anything that does not fit the form is carried as an opaque non-standard
//! version. Non-standard versions order lexicographically among themselves
//! and below every standard version; an absent qualifier orders above any
//! qualifier (`1.0` > `1.0-beta`).

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

/// A parsed artifact version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Version {
    Standard {
        major: u32,
        minor: u32,
        micro: u32,
        update: u32,
        qualifier: Option<String>,
        repository: u32,
    },
    NonStandard(String),
}

impl Version {
    /// Parse a version string.
    ///
    /// Strips a trailing `~N` repository counter, then a `-qualifier`, then
    /// reads the dotted numeric fields. Inputs that do not fit fall back to
    /// an opaque non-standard version as long as they stay within the
    /// `[A-Za-z0-9.-]` alphabet.
    pub fn parse(input: &str) -> Result<Self, ModelError> {
        if let Some(v) = Self::parse_standard(input) {
            return Ok(v);
        }
        if input.is_empty()
            || !input
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
        {
            return Err(ModelError::Version {
                input: input.to_string(),
            });
        }
        Ok(Version::NonStandard(input.to_string()))
    }

    fn parse_standard(input: &str) -> Option<Self> {
        let (rest, repository) = match input.rsplit_once('~') {
            Some((head, tail)) => (head, tail.parse::<u32>().ok()?),
            None => (input, 0),
        };
        let (numeric, qualifier) = match rest.split_once('-') {
            Some((head, tail)) => {
                if tail.is_empty()
                    || !tail.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
                {
                    return None;
                }
                (head, Some(tail.to_string()))
            }
            None => (rest, None),
        };
        let parts: Vec<&str> = numeric.split('.').collect();
        if parts.is_empty() || parts.len() > 4 {
            return None;
        }
        let mut fields = [0u32; 4];
        for (i, part) in parts.iter().enumerate() {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            fields[i] = part.parse().ok()?;
        }
        Some(Version::Standard {
            major: fields[0],
            minor: fields[1],
            micro: fields[2],
            update: fields[3],
            qualifier,
            repository,
        })
    }

    pub fn is_standard(&self) -> bool {
        matches!(self, Version::Standard { .. })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Version::NonStandard(s) => f.write_str(s),
            Version::Standard {
                major,
                minor,
                micro,
                update,
                qualifier,
                repository,
            } => {
                write!(f, "{major}.{minor}")?;
                if *micro > 0 || *update > 0 {
                    write!(f, ".{micro}")?;
                }
                if *update > 0 {
                    write!(f, ".{update}")?;
                }
                if let Some(q) = qualifier {
                    write!(f, "-{q}")?;
                }
                if *repository > 0 {
                    write!(f, "~{repository}")?;
                }
                Ok(())
            }
        }
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Version::NonStandard(a), Version::NonStandard(b)) => a.cmp(b),
            (Version::NonStandard(_), Version::Standard { .. }) => Ordering::Less,
            (Version::Standard { .. }, Version::NonStandard(_)) => Ordering::Greater,
            (
                Version::Standard {
                    major: a1,
                    minor: a2,
                    micro: a3,
                    update: a4,
                    qualifier: aq,
                    repository: ar,
                },
                Version::Standard {
                    major: b1,
                    minor: b2,
                    micro: b3,
                    update: b4,
                    qualifier: bq,
                    repository: br,
                },
            ) => (a1, a2, a3, a4)
                .cmp(&(b1, b2, b3, b4))
                .then_with(|| compare_qualifiers(aq.as_deref(), bq.as_deref()))
                .then_with(|| ar.cmp(br)),
        }
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// An unqualified version is a release and orders above any qualified one.
fn compare_qualifiers(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => a.cmp(b),
    }
}

impl TryFrom<String> for Version {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Version::parse(&value)
    }
}

impl From<Version> for String {
    fn from(value: Version) -> Self {
        value.to_string()
    }
}

/// A single version interval.
///
/// `high = None` means unbounded above. A range whose low bound is a
/// non-standard version matches only that exact version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRange {
    pub low: Version,
    pub low_inclusive: bool,
    pub high: Option<Version>,
    pub high_inclusive: bool,
}

impl VersionRange {
    /// A range matching exactly one version.
    pub fn exact(version: Version) -> Self {
        Self {
            low: version.clone(),
            low_inclusive: true,
            high: Some(version),
            high_inclusive: true,
        }
    }

    /// Parse a single range token: `[1.0,2.0]`, `(1.0,2.0)`, mixed
    /// brackets, `[1.0,)` / `[1.0,]` for unbounded above, or a bare
    /// version for an exact match.
    pub fn parse(input: &str) -> Result<Self, ModelError> {
        let s = input.trim();
        let bracketed = s.starts_with('[') || s.starts_with('(');
        if !bracketed {
            let v = Version::parse(s)?;
            return Ok(Self::exact(v));
        }
        if s.len() < 2 || !(s.ends_with(']') || s.ends_with(')')) {
            return Err(ModelError::Range {
                input: input.to_string(),
                reason: "unterminated bracket".to_string(),
            });
        }
        let low_inclusive = s.starts_with('[');
        let high_inclusive = s.ends_with(']');
        let inner = &s[1..s.len() - 1];
        let (low, high) = inner.split_once(',').ok_or_else(|| ModelError::Range {
            input: input.to_string(),
            reason: "expected 'low,high'".to_string(),
        })?;
        let low = Version::parse(low.trim())?;
        let high = match high.trim() {
            "" => None,
            h => Some(Version::parse(h)?),
        };
        if !low.is_standard() && high.is_some() {
            return Err(ModelError::Range {
                input: input.to_string(),
                reason: "non-standard versions only support exact matches".to_string(),
            });
        }
        Ok(Self {
            low,
            low_inclusive,
            high,
            high_inclusive,
        })
    }

    /// Check whether a version lies within this range.
    pub fn contains(&self, version: &Version) -> bool {
        if !self.low.is_standard() {
            return *version == self.low;
        }
        let low = version.cmp(&self.low);
        if self.low_inclusive {
            if low == Ordering::Less {
                return false;
            }
        } else if low != Ordering::Greater {
            return false;
        }
        if let Some(ref high) = self.high {
            let cmp = version.cmp(high);
            if self.high_inclusive {
                if cmp == Ordering::Greater {
                    return false;
                }
            } else if cmp != Ordering::Less {
                return false;
            }
        }
        true
    }

    fn is_exact(&self) -> bool {
        self.low_inclusive
            && self.high_inclusive
            && self.high.as_ref() == Some(&self.low)
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_exact() {
            return write!(f, "{}", self.low);
        }
        write!(
            f,
            "{}{},{}{}",
            if self.low_inclusive { '[' } else { '(' },
            self.low,
            self.high
                .as_ref()
                .map(|h| h.to_string())
                .unwrap_or_default(),
            if self.high_inclusive { ']' } else { ')' },
        )
    }
}

/// An ordered union of ranges; a version matches if any member matches.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VersionRangeUnion {
    pub ranges: Vec<VersionRange>,
}

impl VersionRangeUnion {
    pub fn new(ranges: Vec<VersionRange>) -> Self {
        Self { ranges }
    }

    /// Parse a `;`-separated list of range tokens.
    pub fn parse(input: &str) -> Result<Self, ModelError> {
        let mut ranges = Vec::new();
        for token in input.split(';') {
            let token = token.trim();
            if token.is_empty() {
                return Err(ModelError::Range {
                    input: input.to_string(),
                    reason: "empty range in union".to_string(),
                });
            }
            ranges.push(VersionRange::parse(token)?);
        }
        Ok(Self { ranges })
    }

    pub fn contains(&self, version: &Version) -> bool {
        self.ranges.iter().any(|r| r.contains(version))
    }
}

impl fmt::Display for VersionRangeUnion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for range in &self.ranges {
            if !first {
                f.write_str(";")?;
            }
            write!(f, "{range}")?;
            first = false;
        }
        Ok(())
    }
}

//! Merging resolved paths with conflict-class-aware version checking.
//!
//! Two artifacts conflict when they contribute clashing entries to the
//! same unversioned family. Besides its own id, an artifact contributes
//! through its conflict declarations: a renamed artifact virtually
//! contains its old id at the renamed version, while bundled, equivalent,
//! reset-renamed, and aliased declarations claim the declared family at
//! every version.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use trellis_core::artifact::{ArtifactId, ConflictKind, UnversionedId};
use trellis_core::version::Version;

use crate::errors::ResolveError;
use crate::graph;
use crate::resolver::{ConflictMark, ResolvedEntry, ResolvedPath};

/// How an artifact's presence counts against a conflict bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
enum VersionClass {
    /// The artifact itself, at its resolved version.
    Exact(Version),
    /// Claims to contain the bucket's family at exactly this version.
    Declared(Version),
    /// Claims the bucket's family at every version.
    Any,
}

fn clashes(a: &VersionClass, b: &VersionClass) -> bool {
    use VersionClass::*;
    match (a, b) {
        (Exact(x), Exact(y)) => x != y,
        (Exact(x), Declared(v)) | (Declared(v), Exact(x)) => x == v,
        (Declared(x), Declared(y)) => x == y,
        (Any, _) | (_, Any) => true,
    }
}

/// Conflict-key contributions of one artifact.
fn contributions(entry: &ResolvedEntry) -> Vec<(UnversionedId, VersionClass)> {
    let mut out = vec![(
        entry.id.unversioned(),
        VersionClass::Exact(entry.id.version.clone()),
    )];
    for declaration in &entry.artifact.conflicts {
        let class = match declaration.kind {
            ConflictKind::Renamed => VersionClass::Declared(declaration.id.version.clone()),
            ConflictKind::Bundled
            | ConflictKind::RenamedReset
            | ConflictKind::Equivalent
            | ConflictKind::Alias => VersionClass::Any,
        };
        out.push((declaration.id.unversioned(), class));
    }
    out
}

/// Merge resolved paths into one deduplicated path.
///
/// On conflict, fails with the diagnostic forest of all input paths
/// pruned to the conflicting branches. On success the merged path keeps
/// one entry per exact id, in first-seen order, with provenance stripped
/// so a re-merge starts clean.
pub fn merge_paths(mut paths: Vec<ResolvedPath>) -> Result<ResolvedPath, ResolveError> {
    // stale marks from an earlier merge don't count
    for path in &mut paths {
        for entry in path.entries_mut() {
            entry.conflict = None;
        }
    }

    // one contribution set per distinct exact id; artifacts equal by id
    // are interchangeable
    let mut buckets: BTreeMap<UnversionedId, Vec<(ArtifactId, VersionClass)>> = BTreeMap::new();
    let mut seen: BTreeSet<ArtifactId> = BTreeSet::new();
    for path in &paths {
        for entry in path.entries() {
            if !seen.insert(entry.id.clone()) {
                continue;
            }
            for (key, class) in contributions(entry) {
                buckets.entry(key).or_default().push((entry.id.clone(), class));
            }
        }
    }

    let mut conflicts: Vec<BTreeSet<ArtifactId>> = Vec::new();
    for (key, entries) in &buckets {
        let mut clashing: BTreeSet<ArtifactId> = BTreeSet::new();
        for (i, (id_a, class_a)) in entries.iter().enumerate() {
            for (id_b, class_b) in &entries[i + 1..] {
                if id_a == id_b {
                    continue;
                }
                if clashes(class_a, class_b) {
                    clashing.insert(id_a.clone());
                    clashing.insert(id_b.clone());
                }
            }
        }
        if !clashing.is_empty() {
            tracing::warn!("version conflict on {key}: {} artifacts involved", clashing.len());
            conflicts.push(clashing);
        }
    }

    if !conflicts.is_empty() {
        for (index, ids) in conflicts.iter().enumerate() {
            for path in &mut paths {
                mark_bucket(path, ids, index + 1);
            }
        }
        for path in &mut paths {
            mark_ancestors(path);
        }
        let report = graph::format_paths(&paths, true);
        return Err(ResolveError::ConflictDetected { report });
    }

    let label = paths
        .iter()
        .map(|p| p.label().to_string())
        .collect::<Vec<_>>()
        .join("+");
    let mut merged = ResolvedPath::new(label);
    let mut included: BTreeSet<ArtifactId> = BTreeSet::new();
    for path in paths {
        for entry in path.into_entries() {
            if !included.insert(entry.id.clone()) {
                continue;
            }
            merged.push(ResolvedEntry {
                declared_by: None,
                conflict: None,
                ..entry
            });
        }
    }
    Ok(merged)
}

fn mark_bucket(path: &mut ResolvedPath, ids: &BTreeSet<ArtifactId>, bucket: usize) {
    for entry in path.entries_mut() {
        if entry.conflict.is_none() && ids.contains(&entry.id) {
            entry.conflict = Some(ConflictMark::Bucket(bucket));
        }
    }
}

/// Mark the `declared_by` chain above every conflicting entry so the
/// pruned tree keeps its context.
fn mark_ancestors(path: &mut ResolvedPath) {
    // parent of entry i = the latest earlier entry carrying its
    // declared_by id (the walk appends parents before children)
    let parents: Vec<Option<usize>> = {
        let entries = path.entries();
        let mut latest: HashMap<&ArtifactId, usize> = HashMap::new();
        let mut parents = Vec::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            parents.push(entry.declared_by.as_ref().and_then(|p| latest.get(p).copied()));
            latest.insert(&entry.id, i);
        }
        parents
    };
    let conflicted: Vec<usize> = path
        .entries()
        .iter()
        .enumerate()
        .filter(|(_, e)| matches!(e.conflict, Some(ConflictMark::Bucket(_))))
        .map(|(i, _)| i)
        .collect();
    let entries = path.entries_mut();
    for start in conflicted {
        let mut cursor = parents[start];
        while let Some(i) = cursor {
            if entries[i].conflict.is_some() {
                break;
            }
            entries[i].conflict = Some(ConflictMark::Parent);
            cursor = parents[i];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn exact_versions_clash_when_different() {
        assert!(clashes(
            &VersionClass::Exact(v("1.0")),
            &VersionClass::Exact(v("2.0"))
        ));
        assert!(!clashes(
            &VersionClass::Exact(v("1.0")),
            &VersionClass::Exact(v("1.0"))
        ));
    }

    #[test]
    fn declared_clashes_only_at_its_version() {
        assert!(clashes(
            &VersionClass::Exact(v("1.0")),
            &VersionClass::Declared(v("1.0"))
        ));
        assert!(!clashes(
            &VersionClass::Exact(v("2.0")),
            &VersionClass::Declared(v("1.0"))
        ));
        assert!(clashes(
            &VersionClass::Declared(v("1.0")),
            &VersionClass::Declared(v("1.0"))
        ));
        assert!(!clashes(
            &VersionClass::Declared(v("1.0")),
            &VersionClass::Declared(v("2.0"))
        ));
    }

    #[test]
    fn any_clashes_with_everything() {
        assert!(clashes(&VersionClass::Any, &VersionClass::Exact(v("1.0"))));
        assert!(clashes(&VersionClass::Any, &VersionClass::Declared(v("1.0"))));
        assert!(clashes(&VersionClass::Any, &VersionClass::Any));
    }
}

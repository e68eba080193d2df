//! The artifact lookup boundary between the resolver and repository
//! storage.

use std::collections::HashMap;

use trellis_core::artifact::{Artifact, ArtifactId};

use crate::errors::ResolveError;

/// Supplies artifacts to the resolver.
///
/// Implementations return an owned copy per call: the resolver annotates
/// and re-parents its copies freely, so the backing graph is never touched.
/// This is also what makes independent resolutions against one source safe
/// to run from separate threads.
pub trait ArtifactSource {
    /// Look up an artifact by id.
    ///
    /// `retrieve` asks the source to fetch the artifact payload into local
    /// storage as a side effect; sources without remote storage ignore it.
    fn lookup(&self, id: &ArtifactId, retrieve: bool) -> Result<Artifact, ResolveError>;
}

/// In-memory source backed by a map, for embedders that assemble the graph
/// up front and for tests.
#[derive(Debug, Default)]
pub struct MemorySource {
    artifacts: HashMap<ArtifactId, Artifact>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an artifact under its own id, replacing any previous entry.
    pub fn insert(&mut self, artifact: Artifact) {
        self.artifacts.insert(artifact.id.clone(), artifact);
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}

impl ArtifactSource for MemorySource {
    fn lookup(&self, id: &ArtifactId, _retrieve: bool) -> Result<Artifact, ResolveError> {
        self.artifacts
            .get(id)
            .cloned()
            .ok_or_else(|| ResolveError::UnresolvedArtifact { id: id.clone() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_returns_owned_copy() {
        let id = ArtifactId::parse("g:n:jar:1.0").unwrap();
        let mut source = MemorySource::new();
        source.insert(Artifact::new(id.clone()));

        let mut copy = source.lookup(&id, false).unwrap();
        copy.stub = true;
        // The stored artifact is unaffected by mutations of the copy.
        assert!(!source.lookup(&id, false).unwrap().stub);
    }

    #[test]
    fn lookup_unknown_id_fails() {
        let source = MemorySource::new();
        let id = ArtifactId::parse("g:n:jar:1.0").unwrap();
        match source.lookup(&id, true) {
            Err(ResolveError::UnresolvedArtifact { id: missing }) => assert_eq!(missing, id),
            other => panic!("expected UnresolvedArtifact, got {other:?}"),
        }
    }
}

use miette::Diagnostic;
use thiserror::Error;

use trellis_core::artifact::ArtifactId;
use trellis_core::errors::ModelError;
use trellis_core::version::Version;

/// Unified error type for resolution and merging.
#[derive(Debug, Error, Diagnostic)]
pub enum ResolveError {
    /// The artifact source could not produce the referenced artifact.
    #[error("unresolved artifact: {id}")]
    #[diagnostic(help("the artifact is not present in the configured source"))]
    UnresolvedArtifact { id: ArtifactId },

    /// Walk depth exceeded the configured safety bound.
    #[error("dependency cycle detected after {} artifacts: {}", .chain.len(), cycle_summary(.chain))]
    #[diagnostic(help("an artifact depends, possibly indirectly, on itself"))]
    CycleDetected { chain: Vec<ArtifactId> },

    /// An unqualified option name matched more than one sibling dependency.
    #[error("ambiguous option '{selector}' on {artifact}: candidates {}", .candidates.join(", "))]
    #[diagnostic(help("qualify the option with its group, e.g. 'group:name'"))]
    AmbiguousOption {
        artifact: ArtifactId,
        selector: String,
        candidates: Vec<String>,
    },

    /// Selectors were left over after every dependency was considered.
    #[error("option(s) [{}] on {artifact} match no dependency", .selectors.join(", "))]
    UnmatchedOption {
        artifact: ArtifactId,
        selectors: Vec<String>,
    },

    /// Two selectors pinned the same dependency to different versions.
    #[error("conflicting version pins for '{target}' on {artifact}: {first} vs {second}")]
    InconsistentOverrideVersion {
        artifact: ArtifactId,
        target: String,
        first: Version,
        second: Version,
    },

    #[error("invalid option syntax in {input:?}: {reason}")]
    InvalidOptionSyntax { input: String, reason: String },

    /// A non-redistributable stub was reached without explicit permission.
    #[error("artifact {id} is a stub and may not be redistributed")]
    #[diagnostic(help(
        "obtain the artifact under its own license and register a local copy, or resolve with stubs permitted"
    ))]
    StubArtifact { id: ArtifactId },

    /// Version conflicts across merged paths; the report shows the
    /// offending subtrees.
    #[error("conflicting artifact versions on merged paths:\n{report}")]
    ConflictDetected { report: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Model(#[from] ModelError),
}

/// The last few links of an overlong chain, oldest elided.
fn cycle_summary(chain: &[ArtifactId]) -> String {
    const SHOWN: usize = 4;
    let start = chain.len().saturating_sub(SHOWN);
    let tail = chain[start..]
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(" -> ");
    if start > 0 {
        format!("... -> {tail}")
    } else {
        tail
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_message_elides_long_chains() {
        let chain: Vec<ArtifactId> = (0..6)
            .map(|i| ArtifactId::parse(&format!("g:a{i}:jar:1.0")).unwrap())
            .collect();
        let err = ResolveError::CycleDetected { chain };
        let msg = err.to_string();
        assert!(msg.contains("after 6 artifacts"));
        assert!(msg.contains("... -> "));
        assert!(msg.contains("g:a5:jar:1.0"));
        assert!(!msg.contains("g:a0:jar:1.0"));
    }
}

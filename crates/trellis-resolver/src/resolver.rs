//! Recursive path-walking resolution: option accumulation, override
//! application, explicit version pins, cycle detection, and stub checks.

use std::collections::{BTreeSet, HashMap};

use trellis_core::artifact::{Artifact, ArtifactId};
use trellis_core::config::ResolverConfig;
use trellis_core::path::{Dependency, Override, PathSpec};
use trellis_core::version::Version;

use crate::errors::ResolveError;
use crate::options::{self, Selector};
use crate::source::ArtifactSource;
use crate::{graph, merge};

/// Conflict annotation attached by `merge`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictMark {
    /// Member of the numbered conflict bucket.
    Bucket(usize),
    /// Ancestor of a conflicting artifact, kept for tree context.
    Parent,
}

/// One artifact on a resolved path, with resolution-scoped provenance.
///
/// Provenance lives on the path's own entries, never on the shared graph
/// model, so concurrent resolutions of the same graph cannot observe each
/// other's annotations.
#[derive(Debug, Clone)]
pub struct ResolvedEntry {
    pub artifact: Artifact,
    /// The id the artifact resolved at, version overrides applied.
    pub id: ArtifactId,
    /// The declared version, when an override or pin replaced it.
    pub original_version: Option<Version>,
    /// Id of the artifact whose dependency pulled this one in; `None` for
    /// direct dependencies of the resolution root.
    pub declared_by: Option<ArtifactId>,
    pub conflict: Option<ConflictMark>,
}

/// An ordered bag of artifacts reached under one path's rules.
///
/// Entries appear in walk order: every artifact precedes the dependencies
/// it declared.
#[derive(Debug, Clone, Default)]
pub struct ResolvedPath {
    label: String,
    entries: Vec<ResolvedEntry>,
}

impl ResolvedPath {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            entries: Vec::new(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn entries(&self) -> &[ResolvedEntry] {
        &self.entries
    }

    pub(crate) fn entries_mut(&mut self) -> &mut [ResolvedEntry] {
        &mut self.entries
    }

    pub fn push(&mut self, entry: ResolvedEntry) {
        self.entries.push(entry);
    }

    pub fn into_entries(self) -> Vec<ResolvedEntry> {
        self.entries
    }

    pub fn contains(&self, id: &ArtifactId) -> bool {
        self.entries.iter().any(|e| e.id == *id)
    }

    pub fn ids(&self) -> Vec<ArtifactId> {
        self.entries.iter().map(|e| e.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One pending walk into a dependency target.
struct Step {
    target: ArtifactId,
    original_version: Option<Version>,
    spec: PathSpec,
    /// Option strings accumulated down the chain, still unsplit.
    options: Vec<String>,
    /// Set when a selector activated this target regardless of flags.
    force: bool,
    declared_by: Option<ArtifactId>,
}

/// Walks dependency paths against an artifact source.
pub struct Resolver<'a> {
    source: &'a dyn ArtifactSource,
    config: ResolverConfig,
}

impl<'a> Resolver<'a> {
    pub fn new(source: &'a dyn ArtifactSource) -> Self {
        Self::with_config(source, ResolverConfig::default())
    }

    pub fn with_config(source: &'a dyn ArtifactSource, config: ResolverConfig) -> Self {
        Self { source, config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve the configured default path of `root`.
    pub fn resolve(
        &self,
        root: &Artifact,
        retrieve: bool,
        permit_stubs: bool,
    ) -> Result<ResolvedPath, ResolveError> {
        let path_id = self.config.default_path.clone();
        self.resolve_path(&path_id, root, retrieve, permit_stubs)
    }

    /// Compute the transitive closure of artifacts reachable from `root`
    /// under the named path's rules.
    ///
    /// `retrieve` is passed through to the artifact source. Unless
    /// `permit_stubs` is set, reaching a stub without a local copy fails.
    pub fn resolve_path(
        &self,
        path_id: &str,
        root: &Artifact,
        retrieve: bool,
        permit_stubs: bool,
    ) -> Result<ResolvedPath, ResolveError> {
        tracing::debug!("resolving path '{path_id}' of {}", root.id);
        let mut path = ResolvedPath::new(path_id);
        let inherited = scoped_overrides(&root.overrides, path_id);
        let policy = root.path_policy(path_id);
        for dependency in &root.dependencies {
            let applied = apply_overrides(dependency, &inherited);
            for spec in applied.specs.iter().filter(|s| s.to == path_id) {
                let mut spec = spec.clone();
                spec.merge_defaults(policy);
                self.walk(
                    &mut path,
                    Step {
                        target: applied.target.clone(),
                        original_version: applied.original_version.clone(),
                        spec,
                        options: Vec::new(),
                        force: false,
                        declared_by: None,
                    },
                    &inherited,
                    retrieve,
                )?;
            }
        }
        if !permit_stubs {
            if let Some(entry) = path
                .entries
                .iter()
                .find(|e| e.artifact.stub && e.artifact.local_copy.is_none())
            {
                return Err(ResolveError::StubArtifact {
                    id: entry.id.clone(),
                });
            }
        }
        tracing::debug!("path '{path_id}' resolved {} artifacts", path.len());
        Ok(path)
    }

    /// Merge several resolved paths into one, failing with a diagnostic
    /// tree when versions conflict.
    pub fn merge(&self, paths: Vec<ResolvedPath>) -> Result<ResolvedPath, ResolveError> {
        merge::merge_paths(paths)
    }

    /// Render one resolved path as a diagnostic tree.
    pub fn format_path(path: &ResolvedPath, only_conflicted: bool) -> String {
        graph::format_path(path, only_conflicted)
    }

    /// Render several resolved paths back to back.
    pub fn format_paths(paths: &[ResolvedPath], only_conflicted: bool) -> String {
        graph::format_paths(paths, only_conflicted)
    }

    fn walk(
        &self,
        path: &mut ResolvedPath,
        mut step: Step,
        overrides: &[Override],
        retrieve: bool,
    ) -> Result<(), ResolveError> {
        if path.len() > self.config.cycle_limit {
            return Err(ResolveError::CycleDetected { chain: path.ids() });
        }
        if let Some(opts) = &step.spec.options {
            step.options.push(opts.clone());
        }
        let inert = options::inert(&step.options)?;
        if inert && !step.spec.is_mandatory() && !step.force {
            return Ok(());
        }

        let artifact = self.source.lookup(&step.target, retrieve)?;
        tracing::trace!("walking {} via '{}'", step.target, step.spec.to);
        path.push(ResolvedEntry {
            artifact: artifact.clone(),
            id: step.target.clone(),
            original_version: step.original_version.clone(),
            declared_by: step.declared_by.clone(),
            conflict: None,
        });

        if inert && !step.spec.descends() {
            return Ok(());
        }

        let mut pool: Vec<Selector> = Vec::new();
        for string in &step.options {
            pool.extend(Selector::parse_list(string)?);
        }

        let from = step.spec.from_path().to_string();
        let mut combined = overrides.to_vec();
        combined.extend(scoped_overrides(&artifact.overrides, &from));

        let policy = artifact.path_policy(&from);
        let mut candidates = Vec::new();
        for dependency in &artifact.dependencies {
            let applied = apply_overrides(dependency, &combined);
            for spec in applied.specs.iter().filter(|s| s.to == from) {
                let mut spec = spec.clone();
                spec.merge_defaults(policy);
                candidates.push(Candidate {
                    target: applied.target.clone(),
                    original_version: applied.original_version.clone(),
                    overridden: applied.overridden,
                    spec,
                });
            }
        }

        // sibling groups per name, to reject ambiguous unqualified options
        let mut groups_by_name: HashMap<&str, BTreeSet<&str>> = HashMap::new();
        for candidate in &candidates {
            groups_by_name
                .entry(candidate.target.name.as_str())
                .or_default()
                .insert(candidate.target.group.as_str());
        }

        for candidate in &candidates {
            let mut matching: Vec<Selector> = Vec::new();
            let mut pin: Option<Version> = None;
            let mut remaining = Vec::with_capacity(pool.len());
            for selector in pool.drain(..) {
                if !selector.matches(&candidate.target) {
                    remaining.push(selector);
                    continue;
                }
                if selector.group.is_none() {
                    let groups = &groups_by_name[candidate.target.name.as_str()];
                    if groups.len() > 1 {
                        return Err(ResolveError::AmbiguousOption {
                            artifact: artifact.id.clone(),
                            selector: selector.to_string(),
                            candidates: groups
                                .iter()
                                .map(|g| format!("{g}:{}", candidate.target.name))
                                .collect(),
                        });
                    }
                }
                if let Some(version) = &selector.version {
                    match &pin {
                        Some(existing) if existing != version => {
                            return Err(ResolveError::InconsistentOverrideVersion {
                                artifact: artifact.id.clone(),
                                target: candidate.target.name.clone(),
                                first: existing.clone(),
                                second: version.clone(),
                            });
                        }
                        _ => pin = Some(version.clone()),
                    }
                }
                matching.push(selector);
            }
            pool = remaining;

            // an explicit pin replaces the version unless an override
            // already did
            let (target, original_version) = match pin {
                Some(version) if !candidate.overridden => {
                    tracing::debug!("pinning {} to {version} by option", candidate.target);
                    (
                        candidate.target.with_version(version),
                        Some(candidate.target.version.clone()),
                    )
                }
                Some(version) => {
                    tracing::debug!(
                        "pin {version} for {} ignored: version already overridden",
                        candidate.target
                    );
                    (candidate.target.clone(), candidate.original_version.clone())
                }
                None => (candidate.target.clone(), candidate.original_version.clone()),
            };

            let excluded = options::all_exclusions(&matching);
            let descend = candidate.spec.descends();
            let recurse = (descend && (matching.is_empty() || !excluded))
                || (!descend && !matching.is_empty() && !excluded);
            if !recurse {
                continue;
            }
            let next_options: Vec<String> =
                matching.iter().filter_map(|s| s.nested.clone()).collect();
            self.walk(
                path,
                Step {
                    target,
                    original_version,
                    spec: candidate.spec.clone(),
                    options: next_options,
                    force: !matching.is_empty(),
                    declared_by: Some(step.target.clone()),
                },
                &combined,
                retrieve,
            )?;
        }

        if !pool.is_empty() {
            return Err(ResolveError::UnmatchedOption {
                artifact: artifact.id.clone(),
                selectors: pool.iter().map(|s| s.to_string()).collect(),
            });
        }
        Ok(())
    }
}

struct Candidate {
    target: ArtifactId,
    original_version: Option<Version>,
    overridden: bool,
    spec: PathSpec,
}

/// Overrides whose scope matches `path`, rescoped to all paths for the
/// levels below.
fn scoped_overrides(overrides: &[Override], path: &str) -> Vec<Override> {
    overrides
        .iter()
        .filter(|o| o.applies_to(path))
        .map(Override::broadened)
        .collect()
}

struct AppliedDependency {
    target: ArtifactId,
    original_version: Option<Version>,
    overridden: bool,
    specs: Vec<PathSpec>,
}

/// Apply the first matching override to a dependency; later matches are
/// ignored, declaration order decides.
fn apply_overrides(dependency: &Dependency, overrides: &[Override]) -> AppliedDependency {
    let Some(matched) = overrides.iter().find(|o| o.matches(&dependency.target)) else {
        return AppliedDependency {
            target: dependency.target.clone(),
            original_version: None,
            overridden: false,
            specs: dependency.specs.clone(),
        };
    };
    let (target, original_version) = match &matched.with_version {
        Some(version) => {
            tracing::debug!("overriding {} to {version}", dependency.target);
            (
                dependency.target.with_version(version.clone()),
                Some(dependency.target.version.clone()),
            )
        }
        None => (dependency.target.clone(), None),
    };
    let specs = if matched.with_specs.is_empty() {
        dependency.specs.clone()
    } else {
        overlay_specs(&dependency.specs, &matched.with_specs)
    };
    AppliedDependency {
        target,
        original_version,
        overridden: matched.with_version.is_some(),
        specs,
    }
}

/// Merge replacement specs onto the dependency's own, keyed by the
/// effective `from` path; replacements with no base are added as new specs.
fn overlay_specs(base: &[PathSpec], replacements: &[PathSpec]) -> Vec<PathSpec> {
    let mut merged: Vec<PathSpec> = base.to_vec();
    for replacement in replacements {
        match merged
            .iter_mut()
            .find(|s| s.from_path() == replacement.from_path())
        {
            Some(spec) => {
                spec.to = replacement.to.clone();
                if replacement.options.is_some() {
                    spec.options = replacement.options.clone();
                }
                if replacement.descend.is_some() {
                    spec.descend = replacement.descend;
                }
                if replacement.mandatory.is_some() {
                    spec.mandatory = replacement.mandatory;
                }
            }
            None => merged.push(replacement.clone()),
        }
    }
    merged
}

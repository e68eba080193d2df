//! Diagnostic forest over resolved paths, for tree printing and conflict
//! reporting.

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use trellis_core::artifact::ArtifactId;

use crate::resolver::{ConflictMark, ResolvedPath};

#[derive(Debug, Clone)]
struct DiagNode {
    id: ArtifactId,
    conflict: Option<ConflictMark>,
}

/// A provenance forest reconstructed from a path's entries.
pub struct DiagnosticGraph {
    graph: DiGraph<DiagNode, ()>,
    roots: Vec<NodeIndex>,
}

impl DiagnosticGraph {
    /// Rebuild the walk's forest: each entry hangs off the most recent
    /// earlier entry carrying its `declared_by` id; entries without one
    /// are roots.
    pub fn from_path(path: &ResolvedPath) -> Self {
        let mut graph = DiGraph::new();
        let mut roots = Vec::new();
        let mut latest: HashMap<ArtifactId, NodeIndex> = HashMap::new();
        for entry in path.entries() {
            let idx = graph.add_node(DiagNode {
                id: entry.id.clone(),
                conflict: entry.conflict,
            });
            match entry.declared_by.as_ref().and_then(|p| latest.get(p)) {
                Some(&parent) => {
                    graph.add_edge(parent, idx, ());
                }
                None => roots.push(idx),
            }
            latest.insert(entry.id.clone(), idx);
        }
        Self { graph, roots }
    }

    fn children(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        // petgraph iterates outgoing edges newest-first; reverse to get
        // insertion order back
        let mut children: Vec<NodeIndex> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| e.target())
            .collect();
        children.reverse();
        children
    }

    fn subtree_conflicted(&self, idx: NodeIndex) -> bool {
        self.graph[idx].conflict.is_some()
            || self
                .children(idx)
                .iter()
                .any(|&c| self.subtree_conflicted(c))
    }

    /// Render the forest with box-drawing connectors, optionally pruned
    /// to branches containing a conflict mark.
    pub fn render(&self, out: &mut String, only_conflicted: bool) {
        let roots: Vec<NodeIndex> = self
            .roots
            .iter()
            .copied()
            .filter(|&r| !only_conflicted || self.subtree_conflicted(r))
            .collect();
        let count = roots.len();
        for (i, root) in roots.iter().enumerate() {
            self.render_subtree(out, *root, "", i == count - 1, only_conflicted);
        }
    }

    fn render_subtree(
        &self,
        out: &mut String,
        idx: NodeIndex,
        prefix: &str,
        is_last: bool,
        only_conflicted: bool,
    ) {
        let connector = if is_last { "└── " } else { "├── " };
        let node = &self.graph[idx];
        let suffix = match node.conflict {
            Some(ConflictMark::Bucket(n)) => format!(" (conflict {n})"),
            _ => String::new(),
        };
        out.push_str(&format!("{prefix}{connector}{}{suffix}\n", node.id));

        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
        let children: Vec<NodeIndex> = self
            .children(idx)
            .into_iter()
            .filter(|&c| !only_conflicted || self.subtree_conflicted(c))
            .collect();
        let count = children.len();
        for (i, child) in children.iter().enumerate() {
            self.render_subtree(out, *child, &child_prefix, i == count - 1, only_conflicted);
        }
    }
}

/// Render one resolved path as a tree.
pub fn format_path(path: &ResolvedPath, only_conflicted: bool) -> String {
    let mut out = format!("path '{}'\n", path.label());
    DiagnosticGraph::from_path(path).render(&mut out, only_conflicted);
    out
}

/// Render several paths back to back.
pub fn format_paths(paths: &[ResolvedPath], only_conflicted: bool) -> String {
    paths
        .iter()
        .map(|p| format_path(p, only_conflicted))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::ResolvedEntry;
    use trellis_core::artifact::Artifact;

    fn entry(id: &str, declared_by: Option<&str>, conflict: Option<ConflictMark>) -> ResolvedEntry {
        let id = ArtifactId::parse(id).unwrap();
        ResolvedEntry {
            artifact: Artifact::new(id.clone()),
            id,
            original_version: None,
            declared_by: declared_by.map(|d| ArtifactId::parse(d).unwrap()),
            conflict,
        }
    }

    fn sample_path() -> ResolvedPath {
        let mut path = ResolvedPath::new("root");
        path.push(entry("g:a:jar:1.0", None, Some(ConflictMark::Parent)));
        path.push(entry(
            "g:b:jar:1.0",
            Some("g:a:jar:1.0"),
            Some(ConflictMark::Bucket(1)),
        ));
        path.push(entry("g:c:jar:1.0", Some("g:a:jar:1.0"), None));
        path.push(entry("g:d:jar:2.0", None, None));
        path
    }

    #[test]
    fn full_tree_shows_every_node() {
        let rendered = format_path(&sample_path(), false);
        assert!(rendered.contains("path 'root'"));
        assert!(rendered.contains("├── g:a:jar:1.0\n"));
        assert!(rendered.contains("│   ├── g:b:jar:1.0 (conflict 1)"));
        assert!(rendered.contains("│   └── g:c:jar:1.0"));
        assert!(rendered.contains("└── g:d:jar:2.0"));
    }

    #[test]
    fn pruned_tree_drops_clean_branches() {
        let rendered = format_path(&sample_path(), true);
        assert!(rendered.contains("g:a:jar:1.0"));
        assert!(rendered.contains("g:b:jar:1.0 (conflict 1)"));
        assert!(!rendered.contains("g:c:jar:1.0"));
        assert!(!rendered.contains("g:d:jar:2.0"));
    }

    #[test]
    fn parent_marks_render_without_suffix() {
        let rendered = format_path(&sample_path(), true);
        assert!(!rendered.contains("g:a:jar:1.0 (conflict"));
    }

    #[test]
    fn duplicate_ids_attach_to_most_recent_parent() {
        let mut path = ResolvedPath::new("root");
        path.push(entry("g:a:jar:1.0", None, None));
        path.push(entry("g:shared:jar:1.0", Some("g:a:jar:1.0"), None));
        path.push(entry("g:b:jar:1.0", None, None));
        path.push(entry("g:shared:jar:1.0", Some("g:b:jar:1.0"), None));
        let rendered = format_path(&path, false);
        // both occurrences render, each under its own declarer
        assert_eq!(rendered.matches("g:shared:jar:1.0").count(), 2);
    }
}

use anyhow::{Context, Result};
use schemascope_core::hierarchy;
use schemascope_core::{GraphIdentity, HierarchyTree, LineageGraph};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

use crate::util::config::IdentityMode;

/// Backend payloads as read from disk. Replaced wholesale on reload, never
/// edited in place.
#[derive(Debug, Default)]
pub struct Snapshot {
    pub tree: Option<HierarchyTree>,
    pub graph: Option<LineageGraph>,
    pub tree_path: Option<PathBuf>,
    pub graph_path: Option<PathBuf>,
    content_identity: Option<GraphIdentity>,
}

impl Snapshot {
    pub fn from_parts(tree: Option<HierarchyTree>, graph: Option<LineageGraph>) -> Self {
        let content_identity = graph.as_ref().map(GraphIdentity::content);
        Self {
            tree,
            graph,
            tree_path: None,
            graph_path: None,
            content_identity,
        }
    }

    pub fn load(tree_path: Option<PathBuf>, graph_path: Option<PathBuf>) -> Result<Self> {
        let tree = tree_path.as_deref().map(load_tree).transpose()?;
        let graph = graph_path.as_deref().map(load_graph).transpose()?;
        let mut snap = Self::from_parts(tree, graph);
        snap.tree_path = tree_path;
        snap.graph_path = graph_path;
        Ok(snap)
    }

    /// No payloads yet, but remembers where to reload them from.
    pub fn unloaded(tree_path: Option<PathBuf>, graph_path: Option<PathBuf>) -> Self {
        Self {
            tree_path,
            graph_path,
            ..Self::default()
        }
    }

    pub fn reload(&mut self) -> Result<()> {
        let fresh = Self::load(self.tree_path.clone(), self.graph_path.clone())?;
        *self = fresh;
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.tree.as_ref().map_or(true, HierarchyTree::is_empty)
            && self.graph.as_ref().map_or(true, LineageGraph::is_empty)
    }

    pub fn identity(&self, mode: IdentityMode) -> Option<GraphIdentity> {
        let graph = self.graph.as_ref()?;
        match mode {
            IdentityMode::Schema => Some(GraphIdentity::schema(graph)),
            IdentityMode::Content => self
                .content_identity
                .clone()
                .or_else(|| Some(GraphIdentity::content(graph))),
        }
    }
}

/// serde_json stops at 128 nested containers; each tree level spends two
/// (the node object and its `children` array).
const MAX_TREE_LEVELS: usize = 60;

fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read {what} {}", path.display()))?;
    serde_json::from_str(&data).map_err(|err| {
        let too_deep = err.to_string().starts_with("recursion limit exceeded");
        let err = anyhow::Error::new(err)
            .context(format!("failed to parse {what} {}", path.display()));
        if too_deep {
            err.context(format!(
                "{what} {} nests deeper than about {MAX_TREE_LEVELS} levels",
                path.display()
            ))
        } else {
            err
        }
    })
}

pub fn load_tree(path: &Path) -> Result<HierarchyTree> {
    let tree: HierarchyTree = read_json(path, "hierarchy tree")?;
    let report = hierarchy::inspect(&tree);
    for issue in &report.issues {
        tracing::warn!(schema_id = %tree.schema_id, %issue, "hierarchy tree inconsistency");
    }
    tracing::info!(
        path = %path.display(),
        schema_id = %tree.schema_id,
        roots = tree.root_nodes.len(),
        nodes = report.node_count,
        depth = report.depth,
        "hierarchy tree loaded"
    );
    Ok(tree)
}

pub fn load_graph(path: &Path) -> Result<LineageGraph> {
    let graph: LineageGraph = read_json(path, "lineage graph")?;
    let unpositioned = graph.nodes.iter().filter(|n| n.position.is_none()).count();
    tracing::info!(
        path = %path.display(),
        schema_id = %graph.schema_id,
        nodes = graph.nodes.len(),
        edges = graph.edges.len(),
        unpositioned,
        "lineage graph loaded"
    );
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn loads_both_payloads_and_tracks_paths() {
        let dir = tempdir().expect("tempdir");
        let tree_path = dir.path().join("tree.json");
        let graph_path = dir.path().join("graph.json");
        fs::write(
            &tree_path,
            r#"{"schema_id":"s1","root_nodes":[{"id":"A","name":"Animal","children":[{"id":"B","name":"Dog","level":1}]}],"max_depth":1,"total_nodes":2}"#,
        )
        .expect("write tree");
        fs::write(
            &graph_path,
            r#"{"schema_id":"s1","nodes":[{"id":"A","name":"Animal"}],"edges":[]}"#,
        )
        .expect("write graph");

        let snap = Snapshot::load(Some(tree_path.clone()), Some(graph_path)).expect("load");
        assert_eq!(snap.tree.as_ref().map(|t| t.root_nodes.len()), Some(1));
        assert_eq!(snap.graph.as_ref().map(|g| g.nodes.len()), Some(1));
        assert_eq!(snap.tree_path, Some(tree_path));
        assert!(!snap.is_empty());
    }

    #[test]
    fn reload_picks_up_new_content_but_keeps_schema_identity() {
        let dir = tempdir().expect("tempdir");
        let graph_path = dir.path().join("graph.json");
        fs::write(&graph_path, r#"{"schema_id":"s1","nodes":[{"id":"A"}]}"#).expect("write");

        let mut snap = Snapshot::load(None, Some(graph_path.clone())).expect("load");
        let schema_before = snap.identity(IdentityMode::Schema);
        let content_before = snap.identity(IdentityMode::Content);

        fs::write(&graph_path, r#"{"schema_id":"s1","nodes":[{"id":"A"},{"id":"B"}]}"#)
            .expect("write");
        snap.reload().expect("reload");

        assert_eq!(snap.identity(IdentityMode::Schema), schema_before);
        assert_ne!(snap.identity(IdentityMode::Content), content_before);
    }

    #[test]
    fn unreadable_or_invalid_files_are_errors() {
        let dir = tempdir().expect("tempdir");
        assert!(load_graph(&dir.path().join("missing.json")).is_err());

        let bad = dir.path().join("bad.json");
        fs::write(&bad, "{ not json").expect("write");
        assert!(load_tree(&bad).is_err());
    }

    #[test]
    fn unloaded_snapshot_can_be_reloaded_later() {
        let dir = tempdir().expect("tempdir");
        let graph_path = dir.path().join("graph.json");
        let mut snap = Snapshot::unloaded(None, Some(graph_path.clone()));
        assert!(snap.is_empty());

        fs::write(&graph_path, r#"{"schema_id":"s2","nodes":[{"id":"A"}]}"#).expect("write");
        snap.reload().expect("reload");
        assert_eq!(snap.graph.as_ref().map(|g| g.schema_id.as_str()), Some("s2"));
    }

    fn nested_tree_json(levels: usize) -> String {
        let mut node = r#"{"id":"leaf","name":"Leaf"}"#.to_string();
        for i in 0..levels {
            node = format!(r#"{{"id":"n{i}","name":"Link","children":[{node}]}}"#);
        }
        format!(r#"{{"schema_id":"deep","root_nodes":[{node}]}}"#)
    }

    #[test]
    fn overly_deep_tree_reports_the_nesting_limit() {
        let dir = tempdir().expect("tempdir");
        let ok = dir.path().join("ok.json");
        fs::write(&ok, nested_tree_json(40)).expect("write");
        assert!(load_tree(&ok).is_ok());

        let deep = dir.path().join("deep.json");
        fs::write(&deep, nested_tree_json(200)).expect("write");
        let err = load_tree(&deep).expect_err("too deep");
        assert!(format!("{err:#}").contains("nests deeper than about 60 levels"));
    }

    #[test]
    fn empty_snapshot_has_no_identity() {
        let snap = Snapshot::default();
        assert!(snap.is_empty());
        assert_eq!(snap.identity(IdentityMode::Content), None);
    }
}

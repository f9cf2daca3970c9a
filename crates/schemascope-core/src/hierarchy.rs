//! Search filtering, flattening and inspection of the class hierarchy forest.
//!
//! All traversals run on an explicit work-stack so deep or pathological trees
//! cannot exhaust the call stack.

use std::borrow::Cow;
use std::collections::HashMap;

use serde::Serialize;

use crate::model::{Attribute, DataType, HierarchyNode, HierarchyNodeType, HierarchyTree};

/// Normalized search text. Matching is a case-insensitive substring test.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Query {
    needle: String,
}

impl Query {
    pub fn new(raw: &str) -> Self {
        Self {
            needle: raw.trim().to_lowercase(),
        }
    }

    pub fn is_active(&self) -> bool {
        !self.needle.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.needle
    }

    pub fn matches_text(&self, text: &str) -> bool {
        self.is_active() && text.to_lowercase().contains(&self.needle)
    }

    /// Shared rule for tree and canvas search: the name, the display name, or
    /// any attribute name.
    pub fn matches_any(
        &self,
        name: &str,
        display_name: Option<&str>,
        attributes: &[Attribute],
    ) -> bool {
        self.matches_text(name)
            || display_name.is_some_and(|d| self.matches_text(d))
            || attributes.iter().any(|a| self.matches_text(&a.name))
    }
}

/// A node matches on its own name, its display name, or any attribute name.
pub fn node_matches(node: &HierarchyNode, query: &Query) -> bool {
    query.matches_any(&node.name, node.display_name.as_deref(), &node.attributes)
}

/// Keep every node that matches `query` together with its ancestor chain.
///
/// An inactive query returns the input slice itself.
pub fn filter<'a>(forest: &'a [HierarchyNode], query: &str) -> Cow<'a, [HierarchyNode]> {
    let query = Query::new(query);
    if !query.is_active() {
        return Cow::Borrowed(forest);
    }
    Cow::Owned(filter_with(forest, &query))
}

struct FilterFrame<'a> {
    node: &'a HierarchyNode,
    next_child: usize,
    matched: bool,
    kept: Vec<HierarchyNode>,
}

impl<'a> FilterFrame<'a> {
    fn enter(node: &'a HierarchyNode, query: &Query) -> Self {
        Self {
            node,
            next_child: 0,
            matched: node_matches(node, query),
            kept: Vec::new(),
        }
    }

    fn finish(self) -> Option<HierarchyNode> {
        if !self.matched && self.kept.is_empty() {
            return None;
        }
        let mut out = self.node.detached();
        out.children = self.kept;
        Some(out)
    }
}

pub fn filter_with(forest: &[HierarchyNode], query: &Query) -> Vec<HierarchyNode> {
    let mut roots = Vec::new();
    let mut stack: Vec<FilterFrame> = Vec::new();

    for root in forest {
        stack.push(FilterFrame::enter(root, query));

        while let Some(top) = stack.last_mut() {
            let node = top.node;
            if let Some(child) = node.children.get(top.next_child) {
                top.next_child += 1;
                stack.push(FilterFrame::enter(child, query));
                continue;
            }

            let Some(done) = stack.pop() else {
                break;
            };
            let Some(kept) = done.finish() else {
                continue;
            };
            match stack.last_mut() {
                Some(parent) => parent.kept.push(kept),
                None => roots.push(kept),
            }
        }
    }
    roots
}

// ---------------- Expansion side-table ----------------

/// Which nodes are expanded in the tree view. Overrides are keyed by node id;
/// nodes without an override fall back to their `collapsed` flag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpansionState {
    overrides: HashMap<String, bool>,
    expand_all: bool,
}

impl ExpansionState {
    pub fn all() -> Self {
        Self {
            overrides: HashMap::new(),
            expand_all: true,
        }
    }

    pub fn is_expanded(&self, node: &HierarchyNode) -> bool {
        if self.expand_all {
            return true;
        }
        self.overrides
            .get(&node.id)
            .copied()
            .unwrap_or(!node.collapsed)
    }

    pub fn set(&mut self, id: impl Into<String>, expanded: bool) {
        self.overrides.insert(id.into(), expanded);
    }

    pub fn expand_path<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for id in ids {
            self.set(id, true);
        }
    }

    pub fn clear(&mut self) {
        self.overrides.clear();
        self.expand_all = false;
    }
}

// ---------------- Flattening ----------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum TreeRowKind {
    Node {
        node_type: HierarchyNodeType,
        has_children: bool,
        expanded: bool,
        instance_count: Option<u64>,
        attribute_count: usize,
    },
    Attribute {
        parent_id: String,
        data_type: DataType,
        is_primary_key: bool,
        is_foreign_key: bool,
        is_nullable: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeRow {
    pub id: String,
    pub label: String,
    pub depth: usize,
    pub kind: TreeRowKind,
}

impl TreeRow {
    pub fn is_node(&self) -> bool {
        matches!(self.kind, TreeRowKind::Node { .. })
    }
}

enum FlattenWork<'a> {
    Node(&'a HierarchyNode, usize),
    Attribute(&'a HierarchyNode, usize, usize),
}

/// Visible rows in display order: a node, then its attributes (when shown),
/// then its child subtrees. Collapsed nodes contribute only their own row.
pub fn flatten(
    forest: &[HierarchyNode],
    expansion: &ExpansionState,
    show_attributes: bool,
) -> Vec<TreeRow> {
    let mut rows = Vec::new();
    let mut stack: Vec<FlattenWork> = forest
        .iter()
        .rev()
        .map(|n| FlattenWork::Node(n, 0))
        .collect();

    while let Some(work) = stack.pop() {
        match work {
            FlattenWork::Node(node, depth) => {
                let expanded = expansion.is_expanded(node);
                let has_children = !node.children.is_empty()
                    || (show_attributes && !node.attributes.is_empty());
                rows.push(TreeRow {
                    id: node.id.clone(),
                    label: node.label().to_string(),
                    depth,
                    kind: TreeRowKind::Node {
                        node_type: node.node_type,
                        has_children,
                        expanded,
                        instance_count: node.instance_count,
                        attribute_count: node.attributes.len(),
                    },
                });
                if !expanded {
                    continue;
                }
                for child in node.children.iter().rev() {
                    stack.push(FlattenWork::Node(child, depth + 1));
                }
                if show_attributes {
                    for idx in (0..node.attributes.len()).rev() {
                        stack.push(FlattenWork::Attribute(node, idx, depth + 1));
                    }
                }
            }
            FlattenWork::Attribute(parent, idx, depth) => {
                let attr = &parent.attributes[idx];
                rows.push(TreeRow {
                    id: attr.id.clone(),
                    label: attr.label().to_string(),
                    depth,
                    kind: TreeRowKind::Attribute {
                        parent_id: parent.id.clone(),
                        data_type: attr.data_type,
                        is_primary_key: attr.is_primary_key,
                        is_foreign_key: attr.is_foreign_key,
                        is_nullable: attr.is_nullable,
                    },
                });
            }
        }
    }
    rows
}

// ---------------- Inspection ----------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeIssue {
    LevelMismatch {
        id: String,
        expected: u32,
        found: u32,
    },
    ParentMismatch {
        id: String,
        expected: Option<String>,
        found: Option<String>,
    },
    TotalNodesMismatch {
        declared: u64,
        counted: u64,
    },
    MaxDepthMismatch {
        declared: u32,
        counted: u32,
    },
}

impl std::fmt::Display for TreeIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LevelMismatch {
                id,
                expected,
                found,
            } => write!(f, "node {id} has level {found}, expected {expected}"),
            Self::ParentMismatch {
                id,
                expected,
                found,
            } => write!(
                f,
                "node {id} has parent_id {found:?}, expected {expected:?}"
            ),
            Self::TotalNodesMismatch { declared, counted } => {
                write!(f, "total_nodes is {declared} but {counted} nodes are reachable")
            }
            Self::MaxDepthMismatch { declared, counted } => {
                write!(f, "max_depth is {declared} but the deepest level is {counted}")
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeReport {
    pub node_count: u64,
    /// Deepest level reached, roots being level 0.
    pub depth: u32,
    pub issues: Vec<TreeIssue>,
}

pub fn inspect(tree: &HierarchyTree) -> TreeReport {
    let mut report = TreeReport::default();
    let mut stack: Vec<(&HierarchyNode, u32, Option<&str>)> = tree
        .root_nodes
        .iter()
        .rev()
        .map(|n| (n, 0, None))
        .collect();

    while let Some((node, level, parent)) = stack.pop() {
        report.node_count += 1;
        report.depth = report.depth.max(level);
        if node.level != level {
            report.issues.push(TreeIssue::LevelMismatch {
                id: node.id.clone(),
                expected: level,
                found: node.level,
            });
        }
        // roots may omit parent_id; children that carry one must agree
        if let (Some(expected), Some(found)) = (parent, node.parent_id.as_deref()) {
            if expected != found {
                report.issues.push(TreeIssue::ParentMismatch {
                    id: node.id.clone(),
                    expected: Some(expected.to_string()),
                    found: Some(found.to_string()),
                });
            }
        } else if parent.is_none() && node.parent_id.is_some() {
            report.issues.push(TreeIssue::ParentMismatch {
                id: node.id.clone(),
                expected: None,
                found: node.parent_id.clone(),
            });
        }
        for child in node.children.iter().rev() {
            stack.push((child, level + 1, Some(node.id.as_str())));
        }
    }

    if tree.total_nodes != report.node_count {
        report.issues.push(TreeIssue::TotalNodesMismatch {
            declared: tree.total_nodes,
            counted: report.node_count,
        });
    }
    if report.node_count > 0 && tree.max_depth != report.depth {
        report.issues.push(TreeIssue::MaxDepthMismatch {
            declared: tree.max_depth,
            counted: report.depth,
        });
    }
    report
}

/// Ids from a root down to `id` inclusive.
pub fn ancestor_path(forest: &[HierarchyNode], id: &str) -> Option<Vec<String>> {
    let mut path: Vec<&str> = Vec::new();
    let mut stack: Vec<(&HierarchyNode, usize)> = forest.iter().rev().map(|n| (n, 0)).collect();

    while let Some((node, depth)) = stack.pop() {
        path.truncate(depth);
        path.push(node.id.as_str());
        if node.id == id {
            return Some(path.iter().map(|s| s.to_string()).collect());
        }
        for child in node.children.iter().rev() {
            stack.push((child, depth + 1));
        }
    }
    None
}

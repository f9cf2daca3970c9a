use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::hierarchy::Query;
use crate::model::{LineageGraph, LineageGraphEdge};

/// Transient emphasis overlaid on a projection. Never stored in the snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HighlightSet {
    pub nodes: HashSet<String>,
    pub edges: HashSet<String>,
}

impl HighlightSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn with_node(mut self, id: impl Into<String>) -> Self {
        self.nodes.insert(id.into());
        self
    }

    pub fn with_edge(mut self, id: impl Into<String>) -> Self {
        self.edges.insert(id.into());
        self
    }

    pub fn extend(&mut self, other: HighlightSet) {
        self.nodes.extend(other.nodes);
        self.edges.extend(other.edges);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceDirection {
    Upstream,
    Downstream,
    #[default]
    Both,
}

impl TraceDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Upstream => "upstream",
            Self::Downstream => "downstream",
            Self::Both => "both",
        }
    }
}

struct Adjacency<'a> {
    outgoing: HashMap<&'a str, Vec<&'a LineageGraphEdge>>,
    incoming: HashMap<&'a str, Vec<&'a LineageGraphEdge>>,
}

impl<'a> Adjacency<'a> {
    fn build(graph: &'a LineageGraph) -> Self {
        let mut outgoing: HashMap<&str, Vec<&LineageGraphEdge>> = HashMap::new();
        let mut incoming: HashMap<&str, Vec<&LineageGraphEdge>> = HashMap::new();
        for edge in &graph.edges {
            outgoing.entry(edge.source.as_str()).or_default().push(edge);
            incoming.entry(edge.target.as_str()).or_default().push(edge);
        }
        Self { outgoing, incoming }
    }
}

/// Nodes and edges reachable from `start` within `max_hops` edges.
///
/// `Both` is the union of the upstream and downstream walks; it does not turn
/// around mid-path, so siblings sharing a parent are not pulled in.
pub fn trace(
    graph: &LineageGraph,
    start: &str,
    direction: TraceDirection,
    max_hops: usize,
) -> HighlightSet {
    if graph.node(start).is_none() {
        return HighlightSet::default();
    }
    let adjacency = Adjacency::build(graph);
    let hops = max_hops.max(1);
    match direction {
        TraceDirection::Upstream => walk(&adjacency, start, hops, false),
        TraceDirection::Downstream => walk(&adjacency, start, hops, true),
        TraceDirection::Both => {
            let mut out = walk(&adjacency, start, hops, false);
            out.extend(walk(&adjacency, start, hops, true));
            out
        }
    }
}

fn walk(adjacency: &Adjacency<'_>, start: &str, hops: usize, downstream: bool) -> HighlightSet {
    let mut out = HighlightSet::default().with_node(start);
    let mut q: VecDeque<(&str, usize)> = VecDeque::new();
    q.push_back((start, 0));

    let index = if downstream {
        &adjacency.outgoing
    } else {
        &adjacency.incoming
    };

    while let Some((cur, depth)) = q.pop_front() {
        if depth >= hops {
            continue;
        }
        let Some(edges) = index.get(cur) else {
            continue;
        };
        for edge in edges {
            let next = if downstream {
                edge.target.as_str()
            } else {
                edge.source.as_str()
            };
            out.edges.insert(edge.id.clone());
            if out.nodes.insert(next.to_string()) {
                q.push_back((next, depth + 1));
            }
        }
    }
    out
}

/// Nodes whose name, display name or attribute names contain the query.
pub fn search_highlights(graph: &LineageGraph, query: &Query) -> HighlightSet {
    let mut out = HighlightSet::default();
    if !query.is_active() {
        return out;
    }
    for node in &graph.nodes {
        if query.matches_any(&node.name, node.display_name.as_deref(), &node.attributes) {
            out.nodes.insert(node.id.clone());
        }
    }
    out
}

/// An edge plus both of its endpoints.
pub fn edge_highlights(graph: &LineageGraph, edge_id: &str) -> HighlightSet {
    graph
        .edges
        .iter()
        .find(|e| e.id == edge_id)
        .map(|e| {
            HighlightSet::default()
                .with_edge(e.id.clone())
                .with_node(e.source.clone())
                .with_node(e.target.clone())
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Attribute, EdgeType, LineageGraphNode};

    // a -> b -> c -> d, and x -> b
    fn chain() -> LineageGraph {
        let mut g = LineageGraph::new("s");
        for id in ["a", "b", "c", "d", "x"] {
            g.nodes.push(LineageGraphNode::new(id, id.to_uppercase()));
        }
        g.edges.push(LineageGraphEdge::new("ab", "a", "b", EdgeType::Data));
        g.edges.push(LineageGraphEdge::new("bc", "b", "c", EdgeType::Data));
        g.edges.push(LineageGraphEdge::new("cd", "c", "d", EdgeType::Data));
        g.edges.push(LineageGraphEdge::new("xb", "x", "b", EdgeType::Data));
        g
    }

    fn sorted(set: &HashSet<String>) -> Vec<&str> {
        let mut v: Vec<&str> = set.iter().map(String::as_str).collect();
        v.sort();
        v
    }

    #[test]
    fn downstream_respects_hop_limit() {
        let g = chain();
        let out = trace(&g, "b", TraceDirection::Downstream, 1);
        assert_eq!(sorted(&out.nodes), vec!["b", "c"]);
        assert_eq!(sorted(&out.edges), vec!["bc"]);

        let out = trace(&g, "a", TraceDirection::Downstream, 10);
        assert_eq!(sorted(&out.nodes), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn upstream_follows_edges_backwards() {
        let g = chain();
        let out = trace(&g, "c", TraceDirection::Upstream, 5);
        assert_eq!(sorted(&out.nodes), vec!["a", "b", "c", "x"]);
        assert_eq!(sorted(&out.edges), vec!["ab", "bc", "xb"]);
    }

    #[test]
    fn both_does_not_pull_in_siblings() {
        let g = chain();
        let out = trace(&g, "a", TraceDirection::Both, 5);
        assert!(!out.nodes.contains("x"));
        assert!(out.nodes.contains("d"));
    }

    #[test]
    fn unknown_start_is_empty_and_zero_hops_means_one() {
        let g = chain();
        assert!(trace(&g, "nope", TraceDirection::Both, 3).is_empty());
        let out = trace(&g, "c", TraceDirection::Downstream, 0);
        assert_eq!(sorted(&out.nodes), vec!["c", "d"]);
    }

    #[test]
    fn search_highlights_match_attributes() {
        let mut g = chain();
        g.nodes[3].attributes.push(Attribute::new("d1", "email"));
        let out = search_highlights(&g, &Query::new("MAIL"));
        assert_eq!(sorted(&out.nodes), vec!["d"]);
        assert!(search_highlights(&g, &Query::new(" ")).is_empty());
    }

    #[test]
    fn canvas_search_agrees_with_tree_search() {
        use crate::hierarchy::node_matches;
        use crate::model::HierarchyNode;

        let mut class = HierarchyNode::new("p", "Person")
            .with_attributes(vec![Attribute::new("p.mail", "email")]);
        class.display_name = Some("Human".to_string());
        let mut lineage = LineageGraphNode::new("p", "Person");
        lineage.display_name = class.display_name.clone();
        lineage.attributes = class.attributes.clone();
        let mut g = LineageGraph::new("s");
        g.nodes.push(lineage);

        for raw in ["pers", "HUM", "mail", "zebra"] {
            let q = Query::new(raw);
            assert_eq!(
                node_matches(&class, &q),
                search_highlights(&g, &q).nodes.contains("p"),
                "{raw}"
            );
        }
    }

    #[test]
    fn edge_highlight_includes_endpoints() {
        let g = chain();
        let out = edge_highlights(&g, "xb");
        assert_eq!(sorted(&out.nodes), vec!["b", "x"]);
        assert_eq!(sorted(&out.edges), vec!["xb"]);
        assert!(edge_highlights(&g, "zz").is_empty());
    }
}

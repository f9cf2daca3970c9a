//! Conversion of a lineage graph into render-ready node and edge records.
//!
//! `project` is a pure function. `ProjectionSession` wraps it with the reload
//! guard (skip when the graph identity is unchanged), the highlight patch path
//! and the fit-view ticket check.

use std::collections::HashSet;

use serde::Serialize;
use thiserror::Error;

use crate::identity::GraphIdentity;
use crate::lineage::HighlightSet;
use crate::model::{
    Attribute, EdgeType, LineageGraph, LineageGraphEdge, LineageGraphNode, LineageNodeType,
    Metadata, Position,
};

pub const FALLBACK_X_SPACING: f64 = 250.0;
pub const FALLBACK_Y_SPACING: f64 = 150.0;

pub const DEFAULT_EDGE_COLOR: &str = "#b1b1b7";
pub const HIGHLIGHT_EDGE_COLOR: &str = "#3b82f6";
pub const DEFAULT_EDGE_WIDTH: f64 = 1.5;
pub const HIGHLIGHT_EDGE_WIDTH: f64 = 3.0;

const PLACEHOLDER_ID_CHARS: usize = 8;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProjectionError {
    #[error("node {node_id} has a non-finite position ({x}, {y})")]
    NonFinitePosition { node_id: String, x: f64, y: f64 },

    #[error("node id {node_id} appears more than once")]
    DuplicateNodeId { node_id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    Top,
    Bottom,
    Left,
    Right,
}

/// Source and target anchors: hierarchy edges run top to bottom, everything
/// else flows left to right.
pub fn anchors_for(edge_type: EdgeType) -> (Anchor, Anchor) {
    match edge_type {
        EdgeType::Hierarchy => (Anchor::Bottom, Anchor::Top),
        EdgeType::Schema | EdgeType::Data | EdgeType::AttributeFlow => {
            (Anchor::Right, Anchor::Left)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderNode {
    pub id: String,
    pub node_type: LineageNodeType,
    pub label: String,
    pub position: Position,
    pub level: u32,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub size: Option<f64>,
    pub attributes: Vec<Attribute>,
    pub instance_count: Option<u64>,
    pub has_upstream: bool,
    pub has_downstream: bool,
    pub data: Metadata,
    pub highlighted: bool,
}

/// Style hints copied from the source edge so highlight changes can be
/// re-resolved without the graph.
#[derive(Debug, Clone, Default, PartialEq)]
struct EdgeStyle {
    color: Option<String>,
    width: Option<f64>,
    animated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub edge_type: EdgeType,
    pub label: Option<String>,
    pub stroke_color: String,
    pub stroke_width: f64,
    pub animated: bool,
    pub highlighted: bool,
    pub source_anchor: Anchor,
    pub target_anchor: Anchor,
    pub cardinality: Option<String>,
    pub transformation_applied: Option<String>,
    #[serde(skip)]
    style: EdgeStyle,
}

impl RenderEdge {
    fn apply_highlight(&mut self, highlighted: bool) {
        self.highlighted = highlighted;
        self.stroke_color = if highlighted {
            HIGHLIGHT_EDGE_COLOR.to_string()
        } else {
            self.style
                .color
                .clone()
                .unwrap_or_else(|| DEFAULT_EDGE_COLOR.to_string())
        };
        self.stroke_width = if highlighted {
            HIGHLIGHT_EDGE_WIDTH
        } else {
            self.style.width.unwrap_or(DEFAULT_EDGE_WIDTH)
        };
        self.animated = highlighted || self.style.animated;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Position,
    pub max: Position,
}

impl Bounds {
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> Position {
        Position::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Projection {
    pub nodes: Vec<RenderNode>,
    pub edges: Vec<RenderEdge>,
}

impl Projection {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&RenderNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edge(&self, id: &str) -> Option<&RenderEdge> {
        self.edges.iter().find(|e| e.id == id)
    }

    /// Re-resolve the highlight-derived fields only.
    pub fn patch_highlights(&mut self, highlights: &HighlightSet) {
        for node in &mut self.nodes {
            node.highlighted = highlights.nodes.contains(&node.id);
        }
        for edge in &mut self.edges {
            let on = highlights.edges.contains(&edge.id);
            edge.apply_highlight(on);
        }
    }

    pub fn validate(&self) -> Result<(), ProjectionError> {
        let mut seen: HashSet<&str> = HashSet::with_capacity(self.nodes.len());
        for node in &self.nodes {
            if !node.position.is_finite() {
                return Err(ProjectionError::NonFinitePosition {
                    node_id: node.id.clone(),
                    x: node.position.x,
                    y: node.position.y,
                });
            }
            if !seen.insert(node.id.as_str()) {
                return Err(ProjectionError::DuplicateNodeId {
                    node_id: node.id.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn bounds(&self) -> Option<Bounds> {
        let mut it = self.nodes.iter().map(|n| n.position);
        let first = it.next()?;
        let mut b = Bounds {
            min: first,
            max: first,
        };
        for p in it {
            b.min.x = b.min.x.min(p.x);
            b.min.y = b.min.y.min(p.y);
            b.max.x = b.max.x.max(p.x);
            b.max.y = b.max.y.max(p.y);
        }
        Some(b)
    }
}

pub fn fallback_position(index: usize, level: u32) -> Position {
    Position::new(
        index as f64 * FALLBACK_X_SPACING,
        f64::from(level) * FALLBACK_Y_SPACING,
    )
}

/// `display_name`, then `name`, then a placeholder built from the id.
pub fn resolve_label(node: &LineageGraphNode) -> String {
    if let Some(d) = node.display_name.as_deref().filter(|d| !d.trim().is_empty()) {
        return d.to_string();
    }
    if !node.name.trim().is_empty() {
        return node.name.clone();
    }
    let short: String = node.id.chars().take(PLACEHOLDER_ID_CHARS).collect();
    if short.is_empty() {
        "Node".to_string()
    } else {
        format!("Node {short}")
    }
}

fn project_node(
    index: usize,
    node: &LineageGraphNode,
    highlights: &HighlightSet,
    show_attributes: bool,
) -> RenderNode {
    RenderNode {
        id: node.id.clone(),
        node_type: node.node_type,
        label: resolve_label(node),
        position: node
            .position
            .unwrap_or_else(|| fallback_position(index, node.level)),
        level: node.level,
        color: node.color.clone(),
        icon: node.icon.clone(),
        size: node.size,
        attributes: if show_attributes {
            node.attributes.clone()
        } else {
            Vec::new()
        },
        instance_count: node.instance_count,
        has_upstream: node.has_upstream,
        has_downstream: node.has_downstream,
        data: node.data.clone(),
        highlighted: highlights.nodes.contains(&node.id),
    }
}

fn project_edge(edge: &LineageGraphEdge, highlights: &HighlightSet) -> RenderEdge {
    let (source_anchor, target_anchor) = anchors_for(edge.edge_type);
    let mut out = RenderEdge {
        id: edge.id.clone(),
        source: edge.source.clone(),
        target: edge.target.clone(),
        edge_type: edge.edge_type,
        label: edge.label.clone(),
        stroke_color: String::new(),
        stroke_width: 0.0,
        animated: false,
        highlighted: false,
        source_anchor,
        target_anchor,
        cardinality: edge.cardinality.clone(),
        transformation_applied: edge.transformation_applied.clone(),
        style: EdgeStyle {
            color: edge.color.clone(),
            width: edge.width,
            animated: edge.animated,
        },
    };
    out.apply_highlight(highlights.edges.contains(&edge.id));
    out
}

/// Project `graph` into render records and validate the result.
pub fn project(
    graph: &LineageGraph,
    highlights: &HighlightSet,
    show_attributes: bool,
) -> Result<Projection, ProjectionError> {
    let projection = Projection {
        nodes: graph
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| project_node(i, n, highlights, show_attributes))
            .collect(),
        edges: graph
            .edges
            .iter()
            .map(|e| project_edge(e, highlights))
            .collect(),
    };
    projection.validate()?;
    Ok(projection)
}

// ---------------- Session ----------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Projected,
    Patched,
    Unchanged,
}

/// Handed to deferred viewport work; it stays valid only until the next full
/// projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FitTicket {
    pub identity: GraphIdentity,
    pub generation: u64,
}

#[derive(Debug)]
struct Loaded {
    identity: GraphIdentity,
    show_attributes: bool,
    highlights: HighlightSet,
    projection: Projection,
}

#[derive(Debug, Default)]
enum SessionState {
    #[default]
    Empty,
    Loaded(Loaded),
    Rejected {
        identity: GraphIdentity,
        show_attributes: bool,
        error: ProjectionError,
    },
}

#[derive(Debug, Default)]
pub struct ProjectionSession {
    state: SessionState,
    generation: u64,
}

impl ProjectionSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sync(
        &mut self,
        identity: GraphIdentity,
        graph: &LineageGraph,
        highlights: &HighlightSet,
        show_attributes: bool,
    ) -> Result<SyncOutcome, ProjectionError> {
        match &mut self.state {
            SessionState::Loaded(loaded)
                if loaded.identity == identity && loaded.show_attributes == show_attributes =>
            {
                if loaded.highlights == *highlights {
                    return Ok(SyncOutcome::Unchanged);
                }
                loaded.projection.patch_highlights(highlights);
                loaded.highlights = highlights.clone();
                return Ok(SyncOutcome::Patched);
            }
            SessionState::Rejected {
                identity: rejected,
                show_attributes: rejected_attrs,
                error,
            } if *rejected == identity && *rejected_attrs == show_attributes => {
                return Err(error.clone());
            }
            _ => {}
        }

        self.generation += 1;
        match project(graph, highlights, show_attributes) {
            Ok(projection) => {
                self.state = SessionState::Loaded(Loaded {
                    identity,
                    show_attributes,
                    highlights: highlights.clone(),
                    projection,
                });
                Ok(SyncOutcome::Projected)
            }
            Err(error) => {
                self.state = SessionState::Rejected {
                    identity,
                    show_attributes,
                    error: error.clone(),
                };
                Err(error)
            }
        }
    }

    pub fn projection(&self) -> Option<&Projection> {
        match &self.state {
            SessionState::Loaded(loaded) => Some(&loaded.projection),
            _ => None,
        }
    }

    pub fn identity(&self) -> Option<&GraphIdentity> {
        match &self.state {
            SessionState::Loaded(loaded) => Some(&loaded.identity),
            SessionState::Rejected { identity, .. } => Some(identity),
            SessionState::Empty => None,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn reset(&mut self) {
        self.state = SessionState::Empty;
        self.generation += 1;
    }

    pub fn fit_ticket(&self) -> Option<FitTicket> {
        match &self.state {
            SessionState::Loaded(loaded) => Some(FitTicket {
                identity: loaded.identity.clone(),
                generation: self.generation,
            }),
            _ => None,
        }
    }

    pub fn is_current(&self, ticket: &FitTicket) -> bool {
        match &self.state {
            SessionState::Loaded(loaded) => {
                ticket.generation == self.generation && ticket.identity == loaded.identity
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Attribute, LineageGraphNode};

    fn sample() -> LineageGraph {
        let mut g = LineageGraph::new("orders");
        let mut customer = LineageGraphNode::new("customer", "Customer").at(0.0, 0.0);
        customer.color = Some("#ff0000".to_string());
        customer.has_downstream = true;
        customer.attributes.push(Attribute::new("c-email", "email"));
        g.nodes.push(customer);

        let mut order = LineageGraphNode::new("order", "Order");
        order.level = 1;
        g.nodes.push(order);

        let mut item = LineageGraphNode::new("line-item-0001", "");
        item.level = 2;
        g.nodes.push(item);

        let mut e1 = LineageGraphEdge::new("e1", "customer", "order", EdgeType::Hierarchy);
        e1.color = Some("#00ff00".to_string());
        e1.width = Some(2.0);
        g.edges.push(e1);
        let mut e2 = LineageGraphEdge::new("e2", "order", "line-item-0001", EdgeType::Data);
        e2.animated = true;
        g.edges.push(e2);
        g.edges
            .push(LineageGraphEdge::new("e3", "customer", "line-item-0001", EdgeType::AttributeFlow));
        g
    }

    fn highlight_fields(p: &Projection) -> Vec<(bool, String, f64, bool)> {
        p.edges
            .iter()
            .map(|e| (e.highlighted, e.stroke_color.clone(), e.stroke_width, e.animated))
            .collect()
    }

    #[test]
    fn positions_fall_back_deterministically() {
        let g = sample();
        let a = project(&g, &HighlightSet::new(), false).expect("project");
        let b = project(&g, &HighlightSet::new(), false).expect("project");
        assert_eq!(a, b);
        assert_eq!(a.nodes[0].position, Position::new(0.0, 0.0));
        assert_eq!(
            a.nodes[1].position,
            Position::new(FALLBACK_X_SPACING, FALLBACK_Y_SPACING)
        );
        assert_eq!(
            a.nodes[2].position,
            Position::new(2.0 * FALLBACK_X_SPACING, 2.0 * FALLBACK_Y_SPACING)
        );
    }

    #[test]
    fn labels_are_never_empty() {
        let mut g = sample();
        g.nodes[1].display_name = Some("Purchase Order".to_string());
        g.nodes.push(LineageGraphNode::new("", ""));
        let p = project(&g, &HighlightSet::new(), false).expect("project");
        assert_eq!(p.nodes[0].label, "Customer");
        assert_eq!(p.nodes[1].label, "Purchase Order");
        assert_eq!(p.nodes[2].label, "Node line-ite");
        assert_eq!(p.nodes[3].label, "Node");
    }

    #[test]
    fn attributes_only_when_requested() {
        let g = sample();
        let hidden = project(&g, &HighlightSet::new(), false).expect("project");
        assert!(hidden.nodes[0].attributes.is_empty());
        let shown = project(&g, &HighlightSet::new(), true).expect("project");
        assert_eq!(shown.nodes[0].attributes.len(), 1);
        assert_eq!(g.nodes[0].attributes.len(), 1);
    }

    #[test]
    fn pass_through_fields_survive() {
        let g = sample();
        let p = project(&g, &HighlightSet::new(), false).expect("project");
        assert_eq!(p.nodes[0].color.as_deref(), Some("#ff0000"));
        assert!(p.nodes[0].has_downstream);
        assert_eq!(p.nodes[2].level, 2);
    }

    #[test]
    fn edge_styling_resolves_from_highlight_then_hints_then_defaults() {
        let g = sample();
        let h = HighlightSet::new().with_edge("e3").with_node("order");
        let p = project(&g, &h, false).expect("project");

        assert_eq!(p.edges[0].stroke_color, "#00ff00");
        assert_eq!(p.edges[0].stroke_width, 2.0);
        assert!(!p.edges[0].animated);

        assert_eq!(p.edges[1].stroke_color, DEFAULT_EDGE_COLOR);
        assert_eq!(p.edges[1].stroke_width, DEFAULT_EDGE_WIDTH);
        assert!(p.edges[1].animated);

        assert!(p.edges[2].highlighted);
        assert_eq!(p.edges[2].stroke_color, HIGHLIGHT_EDGE_COLOR);
        assert_eq!(p.edges[2].stroke_width, HIGHLIGHT_EDGE_WIDTH);
        assert!(p.edges[2].animated);

        assert!(p.nodes[1].highlighted);
        assert!(!p.nodes[0].highlighted);
    }

    #[test]
    fn anchors_follow_edge_type() {
        let g = sample();
        let p = project(&g, &HighlightSet::new(), false).expect("project");
        assert_eq!((p.edges[0].source_anchor, p.edges[0].target_anchor), (Anchor::Bottom, Anchor::Top));
        assert_eq!((p.edges[1].source_anchor, p.edges[1].target_anchor), (Anchor::Right, Anchor::Left));
        assert_eq!(anchors_for(EdgeType::Schema), (Anchor::Right, Anchor::Left));
    }

    #[test]
    fn patch_matches_full_reprojection() {
        let g = sample();
        let h1 = HighlightSet::new().with_edge("e1").with_node("customer");
        let h2 = HighlightSet::new().with_edge("e2").with_edge("e3").with_node("order");

        let mut patched = project(&g, &h1, true).expect("project");
        patched.patch_highlights(&h2);
        let fresh = project(&g, &h2, true).expect("project");

        assert_eq!(highlight_fields(&patched), highlight_fields(&fresh));
        assert_eq!(patched, fresh);
    }

    #[test]
    fn non_finite_position_is_rejected() {
        let mut g = sample();
        g.nodes[1].position = Some(Position::new(f64::NAN, 0.0));
        let err = project(&g, &HighlightSet::new(), false).expect_err("rejected");
        assert!(matches!(err, ProjectionError::NonFinitePosition { ref node_id, .. } if node_id == "order"));

        g.nodes[1].position = Some(Position::new(0.0, f64::INFINITY));
        assert!(project(&g, &HighlightSet::new(), false).is_err());
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut g = sample();
        g.nodes.push(LineageGraphNode::new("order", "Again"));
        assert_eq!(
            project(&g, &HighlightSet::new(), false),
            Err(ProjectionError::DuplicateNodeId {
                node_id: "order".to_string()
            })
        );
    }

    #[test]
    fn session_skips_reprojection_for_same_schema_id() {
        let g1 = sample();
        let mut g2 = sample();
        g2.nodes.truncate(1);
        g2.edges.clear();

        let mut session = ProjectionSession::new();
        let h = HighlightSet::new();
        let first = session
            .sync(GraphIdentity::schema(&g1), &g1, &h, false)
            .expect("sync");
        assert_eq!(first, SyncOutcome::Projected);
        let snapshot = session.projection().cloned().expect("projection");

        let second = session
            .sync(GraphIdentity::schema(&g2), &g2, &h, false)
            .expect("sync");
        assert_eq!(second, SyncOutcome::Unchanged);
        assert_eq!(session.projection(), Some(&snapshot));
        assert_eq!(session.projection().map(|p| p.nodes.len()), Some(3));
    }

    #[test]
    fn versioned_identity_forces_reprojection() {
        let g1 = sample();
        let mut g2 = sample();
        g2.nodes.truncate(1);

        let mut session = ProjectionSession::new();
        let h = HighlightSet::new();
        session
            .sync(GraphIdentity::versioned("orders", 1), &g1, &h, false)
            .expect("sync");
        let out = session
            .sync(GraphIdentity::versioned("orders", 2), &g2, &h, false)
            .expect("sync");
        assert_eq!(out, SyncOutcome::Projected);
        assert_eq!(session.projection().map(|p| p.nodes.len()), Some(1));
    }

    #[test]
    fn content_identity_reprojects_when_only_key_flags_change() {
        let g1 = sample();
        let mut g2 = sample();
        g2.nodes[0].attributes[0].is_primary_key = true;
        g2.nodes[0]
            .data
            .insert("owner".to_string(), serde_json::json!("x"));

        let mut session = ProjectionSession::new();
        let h = HighlightSet::new();
        session
            .sync(GraphIdentity::content(&g1), &g1, &h, true)
            .expect("sync");
        let out = session
            .sync(GraphIdentity::content(&g2), &g2, &h, true)
            .expect("sync");

        assert_eq!(out, SyncOutcome::Projected);
        let fresh = project(&g2, &h, true).expect("project");
        assert_eq!(session.projection(), Some(&fresh));
    }

    #[test]
    fn session_patches_when_only_highlights_change() {
        let g = sample();
        let mut session = ProjectionSession::new();
        let id = GraphIdentity::schema(&g);
        session
            .sync(id.clone(), &g, &HighlightSet::new(), false)
            .expect("sync");
        let generation = session.generation();

        let h = HighlightSet::new().with_edge("e2");
        let out = session.sync(id.clone(), &g, &h, false).expect("sync");
        assert_eq!(out, SyncOutcome::Patched);
        assert_eq!(session.generation(), generation);
        assert_eq!(session.projection(), Some(&project(&g, &h, false).expect("project")));

        let out = session.sync(id.clone(), &g, &h, true).expect("sync");
        assert_eq!(out, SyncOutcome::Projected);
    }

    #[test]
    fn session_remembers_rejection_until_identity_changes() {
        let mut g = sample();
        g.nodes[0].position = Some(Position::new(f64::NAN, 0.0));
        let mut session = ProjectionSession::new();
        let h = HighlightSet::new();
        assert!(session.sync(GraphIdentity::versioned("orders", 1), &g, &h, false).is_err());
        assert!(session.projection().is_none());
        let generation = session.generation();
        assert!(session.sync(GraphIdentity::versioned("orders", 1), &g, &h, false).is_err());
        assert_eq!(session.generation(), generation);

        let fixed = sample();
        let out = session
            .sync(GraphIdentity::versioned("orders", 2), &fixed, &h, false)
            .expect("sync");
        assert_eq!(out, SyncOutcome::Projected);
    }

    #[test]
    fn stale_fit_ticket_is_not_current() {
        let g = sample();
        let h = HighlightSet::new();
        let mut session = ProjectionSession::new();
        assert!(session.fit_ticket().is_none());

        session
            .sync(GraphIdentity::versioned("orders", 1), &g, &h, false)
            .expect("sync");
        let old = session.fit_ticket().expect("ticket");
        assert!(session.is_current(&old));

        session
            .sync(GraphIdentity::versioned("orders", 1), &g, &h.clone().with_node("order"), false)
            .expect("sync");
        assert!(session.is_current(&old));

        session
            .sync(GraphIdentity::versioned("orders", 2), &g, &h, false)
            .expect("sync");
        assert!(!session.is_current(&old));
        assert!(session.is_current(&session.fit_ticket().expect("ticket")));

        session.reset();
        assert!(!session.is_current(&old));
        assert!(session.projection().is_none());
    }

    #[test]
    fn bounds_cover_all_nodes() {
        let g = sample();
        let p = project(&g, &HighlightSet::new(), false).expect("project");
        let b = p.bounds().expect("bounds");
        assert_eq!(b.min, Position::new(0.0, 0.0));
        assert_eq!(
            b.max,
            Position::new(2.0 * FALLBACK_X_SPACING, 2.0 * FALLBACK_Y_SPACING)
        );
        assert!(Projection::default().bounds().is_none());
    }
}

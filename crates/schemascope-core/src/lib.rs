pub mod hierarchy;
pub mod identity;
pub mod intent;
pub mod lineage;
pub mod model;
pub mod projection;

pub use hierarchy::{ExpansionState, Query, TreeRow, TreeRowKind};
pub use identity::GraphIdentity;
pub use intent::{Intent, IntentSink};
pub use lineage::{HighlightSet, TraceDirection};
pub use model::{
    Attribute, DataType, EdgeType, HierarchyNode, HierarchyNodeType, HierarchyTree,
    LineageGraph, LineageGraphEdge, LineageGraphNode, LineageNodeType, Position,
};
pub use projection::{
    Anchor, FitTicket, Projection, ProjectionError, ProjectionSession, RenderEdge, RenderNode,
    SyncOutcome,
};

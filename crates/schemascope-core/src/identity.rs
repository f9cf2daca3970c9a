use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::model::{Attribute, LineageGraph};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Revision {
    /// Identity is the schema id alone.
    Unversioned,
    Version(u64),
    Content(u64),
}

/// Identity the projection session compares to decide whether a graph must be
/// projected again.
///
/// `schema` reproduces the historical behavior: two different payloads that
/// share a `schema_id` are treated as the same graph. Callers that can tell
/// payloads apart should use `versioned` or `content`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphIdentity {
    pub schema_id: String,
    pub revision: Revision,
}

impl GraphIdentity {
    pub fn schema(graph: &LineageGraph) -> Self {
        Self {
            schema_id: graph.schema_id.clone(),
            revision: Revision::Unversioned,
        }
    }

    pub fn versioned(schema_id: impl Into<String>, version: u64) -> Self {
        Self {
            schema_id: schema_id.into(),
            revision: Revision::Version(version),
        }
    }

    pub fn content(graph: &LineageGraph) -> Self {
        Self {
            schema_id: graph.schema_id.clone(),
            revision: Revision::Content(fingerprint(graph)),
        }
    }
}

impl fmt::Display for GraphIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.revision {
            Revision::Unversioned => write!(f, "{}", self.schema_id),
            Revision::Version(v) => write!(f, "{}@v{v}", self.schema_id),
            Revision::Content(h) => write!(f, "{}#{:08x}", self.schema_id, h & 0xFFFF_FFFF),
        }
    }
}

/// Hash over everything the projector reads from the graph.
pub fn fingerprint(graph: &LineageGraph) -> u64 {
    let mut h = DefaultHasher::new();
    graph.schema_id.hash(&mut h);

    graph.nodes.len().hash(&mut h);
    for node in &graph.nodes {
        node.id.hash(&mut h);
        node.node_type.hash(&mut h);
        node.name.hash(&mut h);
        node.display_name.hash(&mut h);
        node.position
            .map(|p| (p.x.to_bits(), p.y.to_bits()))
            .hash(&mut h);
        node.parent_id.hash(&mut h);
        node.level.hash(&mut h);
        node.color.hash(&mut h);
        node.icon.hash(&mut h);
        node.size.map(f64::to_bits).hash(&mut h);
        node.instance_count.hash(&mut h);
        node.has_upstream.hash(&mut h);
        node.has_downstream.hash(&mut h);
        hash_json(&node.data, &mut h);
        hash_attributes(&node.attributes, &mut h);
    }

    graph.edges.len().hash(&mut h);
    for edge in &graph.edges {
        edge.id.hash(&mut h);
        edge.source.hash(&mut h);
        edge.target.hash(&mut h);
        edge.edge_type.hash(&mut h);
        edge.label.hash(&mut h);
        edge.color.hash(&mut h);
        edge.width.map(f64::to_bits).hash(&mut h);
        edge.animated.hash(&mut h);
        edge.cardinality.hash(&mut h);
        edge.transformation_applied.hash(&mut h);
    }
    h.finish()
}

fn hash_attributes(attributes: &[Attribute], h: &mut DefaultHasher) {
    attributes.len().hash(h);
    for attr in attributes {
        attr.id.hash(h);
        attr.name.hash(h);
        attr.display_name.hash(h);
        attr.data_type.hash(h);
        attr.is_primary_key.hash(h);
        attr.is_foreign_key.hash(h);
        attr.is_nullable.hash(h);
        attr.position.hash(h);
        hash_json(&attr.sample_values, h);
        hash_json(&attr.metadata, h);
    }
}

// serde_json maps are key-ordered, so the text form is canonical.
fn hash_json<T: Serialize>(value: &T, h: &mut DefaultHasher) {
    if let Ok(text) = serde_json::to_string(value) {
        text.hash(h);
    }
}

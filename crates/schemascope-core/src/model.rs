use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

pub type Metadata = Map<String, Value>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    #[default]
    String,
    Number,
    Boolean,
    Date,
    Json,
    Binary,
}

impl DataType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Json => "json",
            Self::Binary => "binary",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HierarchyNodeType {
    #[default]
    Class,
    Subclass,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineageNodeType {
    #[default]
    Class,
    Attribute,
    Instance,
    AttributeValue,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    Schema,
    #[default]
    Data,
    AttributeFlow,
    Hierarchy,
}

/// Leaf descriptor owned by a hierarchy or lineage node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub data_type: DataType,
    #[serde(default)]
    pub is_primary_key: bool,
    #[serde(default)]
    pub is_foreign_key: bool,
    #[serde(default)]
    pub is_nullable: bool,
    #[serde(default)]
    pub position: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_values: Option<Vec<Value>>,
    #[serde(default, deserialize_with = "lenient_map")]
    pub metadata: Metadata,
}

impl Attribute {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn label(&self) -> &str {
        non_empty_label(self.display_name.as_deref(), &self.name, &self.id)
    }
}

/// A class or subclass in the hierarchy forest. Children are owned exclusively
/// by their parent and kept in display order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HierarchyNode {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(rename = "type", default)]
    pub node_type: HierarchyNodeType,
    #[serde(default)]
    pub level: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub children: Vec<HierarchyNode>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub attributes: Vec<Attribute>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_count: Option<u64>,
    #[serde(default)]
    pub collapsed: bool,
}

impl HierarchyNode {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let mut node = Self::default();
        node.id = id.into();
        node.name = name.into();
        node
    }

    pub fn with_children(mut self, children: Vec<HierarchyNode>) -> Self {
        self.children = children;
        self
    }

    pub fn with_attributes(mut self, attributes: Vec<Attribute>) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn label(&self) -> &str {
        non_empty_label(self.display_name.as_deref(), &self.name, &self.id)
    }

    /// Copy of this node without its children.
    pub fn detached(&self) -> Self {
        Self {
            id: self.id.clone(),
            name: self.name.clone(),
            display_name: self.display_name.clone(),
            node_type: self.node_type,
            level: self.level,
            parent_id: self.parent_id.clone(),
            children: Vec::new(),
            attributes: self.attributes.clone(),
            instance_count: self.instance_count,
            collapsed: self.collapsed,
        }
    }
}

// Children are released from a flat worklist so that dropping a deep chain
// does not recurse once per level.
impl Drop for HierarchyNode {
    fn drop(&mut self) {
        if self.children.is_empty() {
            return;
        }
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HierarchyTree {
    #[serde(default, deserialize_with = "lenient_string")]
    pub schema_id: String,
    #[serde(default, alias = "roots", deserialize_with = "lenient_vec")]
    pub root_nodes: Vec<HierarchyNode>,
    #[serde(default)]
    pub max_depth: u32,
    #[serde(default)]
    pub total_nodes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl HierarchyTree {
    pub fn is_empty(&self) -> bool {
        self.root_nodes.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    fn from_value(value: &Value) -> Option<Self> {
        let x = value.get("x")?.as_f64()?;
        let y = value.get("y")?.as_f64()?;
        Some(Self { x, y })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineageGraphNode {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(rename = "type", default)]
    pub node_type: LineageNodeType,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    // absent or malformed positions decode as None
    #[serde(
        default,
        deserialize_with = "lenient_position",
        skip_serializing_if = "Option::is_none"
    )]
    pub position: Option<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub level: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    #[serde(default)]
    pub collapsed: bool,
    #[serde(default)]
    pub selected: bool,
    #[serde(default)]
    pub highlighted: bool,
    #[serde(default, deserialize_with = "lenient_map")]
    pub data: Metadata,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub attributes: Vec<Attribute>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_count: Option<u64>,
    #[serde(default)]
    pub has_upstream: bool,
    #[serde(default)]
    pub has_downstream: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl LineageGraphNode {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position = Some(Position::new(x, y));
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineageGraphEdge {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub source: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub target: String,
    #[serde(rename = "type", default)]
    pub edge_type: EdgeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default)]
    pub animated: bool,
    #[serde(default)]
    pub highlighted: bool,
    #[serde(default)]
    pub selected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cardinality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transformation_applied: Option<String>,
}

impl LineageGraphEdge {
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
        edge_type: EdgeType,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            edge_type,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineageGraph {
    #[serde(default, deserialize_with = "lenient_string")]
    pub schema_id: String,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub nodes: Vec<LineageGraphNode>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub edges: Vec<LineageGraphEdge>,
    #[serde(default, deserialize_with = "lenient_map")]
    pub metadata: Metadata,
}

impl LineageGraph {
    pub fn new(schema_id: impl Into<String>) -> Self {
        Self {
            schema_id: schema_id.into(),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&LineageGraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

fn non_empty_label<'a>(display_name: Option<&'a str>, name: &'a str, id: &'a str) -> &'a str {
    match display_name {
        Some(d) if !d.trim().is_empty() => d,
        _ if !name.trim().is_empty() => name,
        _ => id,
    }
}

// ----- lenient decoding -----

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    })
}

fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

fn lenient_map<'de, D>(deserializer: D) -> Result<Metadata, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Object(map) => map,
        _ => Metadata::new(),
    })
}

fn lenient_position<'de, D>(deserializer: D) -> Result<Option<Position>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(Position::from_value(&value))
}

use serde::{Deserialize, Serialize};

/// User intent forwarded from the views to whoever owns the backend. The core
/// never acts on these itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Intent {
    SelectNode { id: String },
    ToggleExpand { id: String, expanded: bool },
    AttributeClicked { node_id: String, attribute_id: String },
    AddClass { parent_id: Option<String> },
    EditClass { id: String },
    DeleteClass { id: String },
    EdgeClicked { id: String },
}

impl Intent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SelectNode { .. } => "select_node",
            Self::ToggleExpand { .. } => "toggle_expand",
            Self::AttributeClicked { .. } => "attribute_clicked",
            Self::AddClass { .. } => "add_class",
            Self::EditClass { .. } => "edit_class",
            Self::DeleteClass { .. } => "delete_class",
            Self::EdgeClicked { .. } => "edge_clicked",
        }
    }
}

pub trait IntentSink {
    fn dispatch(&mut self, intent: &Intent);
}

impl<F> IntentSink for F
where
    F: FnMut(&Intent),
{
    fn dispatch(&mut self, intent: &Intent) {
        self(intent)
    }
}

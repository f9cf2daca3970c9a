use anyhow::{Context, Result};
use schemascope_core::hierarchy::{self, Query};
use schemascope_core::lineage;
use schemascope_core::projection;
use schemascope_core::{ExpansionState, HighlightSet, Projection, TreeRow};
use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::graph::Snapshot;
use crate::util::config::ViewerConfig;

/// What `--export` writes: the projection as the canvas would draw it, plus
/// the filtered tree rows when a query was given.
#[derive(Debug, Serialize)]
pub struct ExportDocument {
    pub identity: Option<String>,
    pub projection: Option<Projection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tree_rows: Option<Vec<TreeRow>>,
}

pub fn build_export(
    snapshot: &Snapshot,
    cfg: &ViewerConfig,
    query: Option<&str>,
) -> Result<ExportDocument> {
    let q = Query::new(query.unwrap_or_default());

    let projection = match snapshot.graph.as_ref() {
        Some(graph) => {
            let highlights = if q.is_active() {
                lineage::search_highlights(graph, &q)
            } else {
                HighlightSet::default()
            };
            let p = projection::project(graph, &highlights, cfg.show_attributes)
                .with_context(|| format!("failed to project lineage graph {}", graph.schema_id))?;
            Some(p)
        }
        None => None,
    };

    let tree_rows = query.map(|raw| {
        snapshot.tree.as_ref().map_or_else(Vec::new, |tree| {
            let forest = hierarchy::filter(&tree.root_nodes, raw);
            hierarchy::flatten(&forest, &ExpansionState::all(), cfg.show_attributes)
        })
    });

    Ok(ExportDocument {
        identity: snapshot
            .identity(cfg.identity_mode)
            .map(|id| id.to_string()),
        projection,
        query: query.map(str::to_string),
        tree_rows,
    })
}

pub fn write_export(path: &Path, doc: &ExportDocument) -> Result<()> {
    let data = serde_json::to_string_pretty(doc).context("failed to serialize export")?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create export directory {}", parent.display()))?;
    }
    fs::write(path, data).with_context(|| format!("failed to write export {}", path.display()))?;
    tracing::info!(
        path = %path.display(),
        nodes = doc.projection.as_ref().map_or(0, |p| p.nodes.len()),
        edges = doc.projection.as_ref().map_or(0, |p| p.edges.len()),
        "projection exported"
    );
    Ok(())
}

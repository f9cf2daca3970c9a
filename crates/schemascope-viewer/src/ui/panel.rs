use bevy::prelude::{EventWriter, ResMut};
use bevy_egui::{egui, EguiContexts};
use schemascope_core::hierarchy::{self, Query};
use schemascope_core::{ExpansionState, Intent, TraceDirection, TreeRow, TreeRowKind};
use std::time::Instant;

use crate::app::events::IntentEvent;
use crate::graph::ViewerState;
use crate::util::colors;
use crate::util::config::{self, IdentityMode};

const INDENT: f32 = 14.0;
const TOGGLE_W: f32 = 18.0;

enum PanelAction {
    Toggle(String, bool),
    Select(String),
    Emit(Intent),
    Reload,
    Fit,
    Clear,
    SaveSettings,
}

/// Rows shown in the tree: the filtered forest, fully expanded while a search
/// is active.
pub fn visible_rows(st: &ViewerState) -> Vec<TreeRow> {
    let Some(tree) = st.snapshot.tree.as_ref() else {
        return Vec::new();
    };
    let forest = hierarchy::filter(&tree.root_nodes, &st.ui.query);
    if Query::new(&st.ui.query).is_active() {
        hierarchy::flatten(&forest, &ExpansionState::all(), st.cfg.show_attributes)
    } else {
        hierarchy::flatten(&forest, &st.ui.expansion, st.cfg.show_attributes)
    }
}

fn class_menu(ui: &mut egui::Ui, id: &str, actions: &mut Vec<PanelAction>) {
    if ui.button("Add subclass").clicked() {
        actions.push(PanelAction::Emit(Intent::AddClass {
            parent_id: Some(id.to_string()),
        }));
        ui.close_menu();
    }
    if ui.button("Edit class").clicked() {
        actions.push(PanelAction::Emit(Intent::EditClass { id: id.to_string() }));
        ui.close_menu();
    }
    if ui.button("Delete class").clicked() {
        actions.push(PanelAction::Emit(Intent::DeleteClass { id: id.to_string() }));
        ui.close_menu();
    }
}

fn tree_row(
    ui: &mut egui::Ui,
    row: &TreeRow,
    selected: bool,
    query: &Query,
    actions: &mut Vec<PanelAction>,
) {
    ui.horizontal(|ui| {
        ui.add_space(row.depth as f32 * INDENT);
        match &row.kind {
            TreeRowKind::Node {
                has_children,
                expanded,
                instance_count,
                ..
            } => {
                // every row is expanded while searching
                if *has_children && !query.is_active() {
                    let icon = if *expanded { "▾" } else { "▸" };
                    if ui.small_button(icon).clicked() {
                        actions.push(PanelAction::Toggle(row.id.clone(), !expanded));
                    }
                } else {
                    ui.add_space(TOGGLE_W);
                }

                let mut text = egui::RichText::new(&row.label);
                if query.is_active() && query.matches_text(&row.label) {
                    text = text.color(colors::MATCH_TEXT);
                }
                let resp = ui.selectable_label(selected, text);
                if resp.clicked() {
                    actions.push(PanelAction::Select(row.id.clone()));
                }
                resp.context_menu(|ui| class_menu(ui, &row.id, actions));
                if let Some(count) = instance_count {
                    ui.weak(format!("({count})"));
                }
            }
            TreeRowKind::Attribute {
                parent_id,
                data_type,
                is_primary_key,
                is_foreign_key,
                is_nullable,
            } => {
                ui.add_space(TOGGLE_W);
                let marker = if *is_primary_key {
                    "🔑 "
                } else if *is_foreign_key {
                    "🔗 "
                } else {
                    ""
                };
                let nullable = if *is_nullable { "?" } else { "" };
                let label = format!("{marker}{} : {}{nullable}", row.label, data_type.as_str());
                if ui.selectable_label(false, egui::RichText::new(label).small()).clicked() {
                    actions.push(PanelAction::Emit(Intent::AttributeClicked {
                        node_id: parent_id.clone(),
                        attribute_id: row.id.clone(),
                    }));
                }
            }
        }
    });
}

pub fn ui_panel(
    mut contexts: EguiContexts,
    mut st: ResMut<ViewerState>,
    mut intents: EventWriter<IntentEvent>,
) {
    let mut actions: Vec<PanelAction> = Vec::new();
    let panel_width = st.cfg.panel_width;

    egui::SidePanel::left("left")
        .default_width(panel_width)
        .show(contexts.ctx_mut(), |ui| {
            ui.heading("SchemaScope");
            if let Some(tree) = &st.snapshot.tree {
                ui.label(format!("schema: {}", tree.schema_id));
                ui.label(format!(
                    "classes: {} (depth {})",
                    tree.total_nodes, tree.max_depth
                ));
            }
            if let Some(graph) = &st.snapshot.graph {
                ui.label(format!(
                    "lineage: {} nodes / {} edges",
                    graph.nodes.len(),
                    graph.edges.len()
                ));
            }
            if let Some(err) = &st.status.error {
                ui.colored_label(egui::Color32::LIGHT_RED, err);
            }
            ui.separator();

            ui.horizontal(|ui| {
                ui.label("Search:");
                ui.text_edit_singleline(&mut st.ui.query);
                if !st.ui.query.is_empty() && ui.small_button("x").clicked() {
                    st.ui.query.clear();
                }
            });
            ui.add_space(4.0);
            if ui.button("Add class").clicked() {
                actions.push(PanelAction::Emit(Intent::AddClass { parent_id: None }));
            }

            ui.add_space(6.0);
            let rows = visible_rows(&st);
            let query = Query::new(&st.ui.query);
            egui::ScrollArea::vertical()
                .id_source("hierarchy")
                .max_height(ui.available_height() * 0.6)
                .show(ui, |ui| {
                    if st.snapshot.tree.is_none() {
                        ui.weak("No hierarchy loaded (--tree <path>)");
                    } else if rows.is_empty() {
                        ui.weak("No matching classes");
                    }
                    for row in &rows {
                        let selected = st.ui.selected_node() == Some(row.id.as_str());
                        tree_row(ui, row, selected, &query, &mut actions);
                    }
                });

            ui.add_space(8.0);
            ui.separator();
            ui.heading("Lineage");
            ui.horizontal(|ui| {
                ui.label("Trace:");
                ui.selectable_value(&mut st.cfg.trace_direction, TraceDirection::Upstream, "Upstream");
                ui.selectable_value(
                    &mut st.cfg.trace_direction,
                    TraceDirection::Downstream,
                    "Downstream",
                );
                ui.selectable_value(&mut st.cfg.trace_direction, TraceDirection::Both, "Both");
            });
            ui.add(egui::Slider::new(&mut st.cfg.trace_hops, 1..=10).text("hops"));
            ui.checkbox(&mut st.cfg.show_attributes, "Show attributes");
            ui.checkbox(&mut st.cfg.show_edge_labels, "Edge labels");

            ui.add_space(8.0);
            ui.separator();
            ui.heading("Refresh");
            ui.horizontal(|ui| {
                ui.label("Identity:");
                ui.selectable_value(&mut st.cfg.identity_mode, IdentityMode::Schema, "Schema");
                ui.selectable_value(&mut st.cfg.identity_mode, IdentityMode::Content, "Content");
            });
            ui.add(egui::Slider::new(&mut st.cfg.fit_delay_ms, 0..=2000).text("fit delay (ms)"));

            ui.add_space(8.0);
            ui.horizontal(|ui| {
                if ui.button("Reload").clicked() {
                    actions.push(PanelAction::Reload);
                }
                if ui.button("Fit view").clicked() {
                    actions.push(PanelAction::Fit);
                }
                if ui.button("Save settings").clicked() {
                    actions.push(PanelAction::SaveSettings);
                }
            });
            ui.add_space(6.0);
            ui.separator();
            if ui.button("Clear").clicked() {
                actions.push(PanelAction::Clear);
            }
        });

    for action in actions {
        match action {
            PanelAction::Toggle(id, expanded) => {
                st.ui.expansion.set(id.clone(), expanded);
                intents.send(IntentEvent(Intent::ToggleExpand { id, expanded }));
            }
            PanelAction::Select(id) => {
                st.select_node(&id);
                intents.send(IntentEvent(Intent::SelectNode { id }));
            }
            PanelAction::Emit(intent) => {
                intents.send(IntentEvent(intent));
            }
            PanelAction::Reload => {
                if let Err(err) = st.reload() {
                    tracing::error!(error = %err, "reload failed");
                }
            }
            PanelAction::Fit => st.request_fit(Instant::now()),
            PanelAction::Clear => st.clear(),
            PanelAction::SaveSettings => match config::save(&st.cfg) {
                Ok(path) => tracing::info!(path = %path.display(), "viewer settings saved"),
                Err(err) => tracing::error!(error = %err, "failed to save viewer settings"),
            },
        }
    }
}

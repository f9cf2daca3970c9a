use bevy::prelude::Res;
use bevy_egui::{egui, EguiContexts};
use schemascope_core::SyncOutcome;

use crate::graph::ViewerState;

const HUD_PANEL_GAP: f32 = 12.0;
const HUD_EDGE_PADDING: f32 = 10.0;

fn outcome_label(outcome: Option<SyncOutcome>) -> &'static str {
    match outcome {
        None => "idle",
        Some(SyncOutcome::Projected) => "projected",
        Some(SyncOutcome::Patched) => "patched",
        Some(SyncOutcome::Unchanged) => "unchanged",
    }
}

pub fn hud_overlay(mut contexts: EguiContexts, st: Res<ViewerState>) {
    let ctx = contexts.ctx_mut();
    let screen = ctx.screen_rect();
    let x = screen.max.x - HUD_EDGE_PADDING;
    let y = screen.min.y + HUD_EDGE_PADDING;

    egui::Area::new(egui::Id::new("hud"))
        .order(egui::Order::Foreground)
        .anchor(egui::Align2::RIGHT_TOP, egui::vec2(-HUD_EDGE_PADDING, HUD_EDGE_PADDING))
        .default_pos(egui::pos2(x, y))
        .interactable(false)
        .show(ctx, |ui| {
            ui.set_max_width((screen.width() - st.cfg.panel_width - HUD_PANEL_GAP).max(160.0));
            ui.group(|ui| {
                match st.session.identity() {
                    Some(id) => ui.label(format!("Graph: {id}")),
                    None => ui.label("Graph: (none)"),
                };
                ui.label(format!(
                    "Generation: {} ({})",
                    st.session.generation(),
                    outcome_label(st.status.last_outcome)
                ));
                ui.label(format!(
                    "Projections / patches / stale fits: {} / {} / {}",
                    st.status.projections, st.status.patches, st.status.stale_fits
                ));
                if let Some(p) = st.session.projection() {
                    let lit_nodes = p.nodes.iter().filter(|n| n.highlighted).count();
                    let lit_edges = p.edges.iter().filter(|e| e.highlighted).count();
                    ui.label(format!(
                        "Visible: {} nodes / {} edges",
                        p.nodes.len(),
                        p.edges.len()
                    ));
                    ui.label(format!("Highlighted: {lit_nodes} nodes / {lit_edges} edges"));
                }
                ui.label(format!("Zoom: {:.2}", st.canvas.zoom));

                if !st.recent_intents.is_empty() {
                    ui.separator();
                    ui.label("Recent intents:");
                    for intent in st.recent_intents.iter().rev().take(5) {
                        ui.monospace(intent.name());
                    }
                }
            });
        });
}

use bevy::prelude::ResMut;
use bevy_egui::{egui, EguiContexts};

use crate::graph::ViewerState;

pub fn help_overlay(mut contexts: EguiContexts, mut st: ResMut<ViewerState>) {
    if !st.ui.help_open {
        return;
    }

    let mut open = true;
    egui::Window::new("Help / Shortcuts")
        .collapsible(false)
        .resizable(false)
        .open(&mut open)
        .show(contexts.ctx_mut(), |ui| {
            ui.label("Esc: clear selection and search, close overlays");
            ui.label("F: fit view to graph");
            ui.label("A: toggle attribute rows");
            ui.label("R: reload input files");
            ui.label("?: toggle help");
            ui.separator();
            ui.label("Click a node to trace its lineage.");
            ui.label("Click an edge to highlight it and its endpoints.");
            ui.label("Right click a node for class actions.");
            ui.label("Drag to pan, scroll to zoom.");
        });
    if !open {
        st.ui.help_open = false;
    }
}

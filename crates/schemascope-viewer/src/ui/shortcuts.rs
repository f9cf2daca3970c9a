use bevy::prelude::ResMut;
use bevy_egui::{egui, EguiContexts};
use std::time::Instant;

use crate::graph::ViewerState;

pub fn handle_shortcuts(mut contexts: EguiContexts, mut st: ResMut<ViewerState>) {
    let ctx = contexts.ctx_mut();
    let esc_pressed = ctx.input(|i| i.key_pressed(egui::Key::Escape));
    let wants_keyboard = ctx.wants_keyboard_input();

    if esc_pressed {
        st.ui.help_open = false;
        if st.ui.selection.is_some() || st.ui.context_target.is_some() {
            st.clear_selection();
        } else if !st.ui.query.is_empty() {
            st.ui.query.clear();
        }
    }

    if wants_keyboard {
        return;
    }

    if ctx.input(|i| i.key_pressed(egui::Key::Questionmark)) {
        st.ui.help_open = !st.ui.help_open;
    }
    if ctx.input(|i| i.key_pressed(egui::Key::F)) {
        st.request_fit(Instant::now());
    }
    if ctx.input(|i| i.key_pressed(egui::Key::A)) {
        st.cfg.show_attributes = !st.cfg.show_attributes;
    }
    if ctx.input(|i| i.key_pressed(egui::Key::R)) {
        if let Err(err) = st.reload() {
            tracing::error!(error = %err, "reload failed");
        }
    }
}

pub mod canvas;

use bevy::prelude::{Camera2dBundle, Commands, ResMut};
use std::time::Instant;

use crate::graph::ViewerState;

pub use canvas::draw_canvas;

pub fn setup_camera(mut commands: Commands) {
    commands.spawn(Camera2dBundle::default());
}

/// Runs the deferred fit-view once it is due, unless the projection it was
/// requested for has since been replaced.
pub fn apply_pending_fit(mut st: ResMut<ViewerState>) {
    if st.take_due_fit(Instant::now()).is_some() {
        st.fit_view();
    }
}

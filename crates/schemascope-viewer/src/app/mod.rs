use bevy::prelude::*;

use crate::app::events::IntentEvent;
use crate::app::resources::IntentSinks;
use crate::graph::ViewerState;

pub mod events;
pub mod resources;
pub mod sinks;

pub struct SchemaScopeViewerPlugin;

impl Plugin for SchemaScopeViewerPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<IntentEvent>()
            .add_systems(Startup, crate::render::setup_camera)
            .add_systems(
                Update,
                (
                    crate::ui::handle_shortcuts,
                    crate::ui::ui_panel,
                    crate::graph::sync_projection,
                    crate::render::draw_canvas,
                    crate::ui::hud_overlay,
                    crate::ui::help_overlay,
                    crate::render::apply_pending_fit,
                    dispatch_intents,
                )
                    .chain(),
            );
    }
}

fn dispatch_intents(
    mut events: EventReader<IntentEvent>,
    mut sinks: ResMut<IntentSinks>,
    mut st: ResMut<ViewerState>,
) {
    for IntentEvent(intent) in events.read() {
        for sink in sinks.0.iter_mut() {
            sink.dispatch(intent);
        }
        st.record_intent(intent.clone());
    }
}

pub mod snapshot;
pub mod state;

use bevy::prelude::ResMut;
use std::time::Instant;

pub use snapshot::Snapshot;
pub use state::ViewerState;

pub fn sync_projection(mut st: ResMut<ViewerState>) {
    st.sync_projection(Instant::now());
}

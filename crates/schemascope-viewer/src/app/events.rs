use bevy::prelude::Event;
use schemascope_core::Intent;

#[derive(Event, Debug, Clone)]
pub struct IntentEvent(pub Intent);

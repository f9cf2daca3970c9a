use bevy::prelude::Resource;
use schemascope_core::IntentSink;

use crate::app::sinks::{JsonLinesSink, TracingSink};

#[derive(Resource, Default)]
pub struct IntentSinks(pub Vec<Box<dyn IntentSink + Send + Sync>>);

impl IntentSinks {
    pub fn from_flags(emit_json: bool) -> Self {
        let mut sinks: Vec<Box<dyn IntentSink + Send + Sync>> = vec![Box::new(TracingSink)];
        if emit_json {
            sinks.push(Box::new(JsonLinesSink::new(std::io::stdout())));
        }
        Self(sinks)
    }
}

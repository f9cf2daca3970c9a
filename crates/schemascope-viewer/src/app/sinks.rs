use schemascope_core::{Intent, IntentSink};
use std::io::Write;

pub struct TracingSink;

impl IntentSink for TracingSink {
    fn dispatch(&mut self, intent: &Intent) {
        tracing::debug!(kind = intent.name(), ?intent, "intent");
    }
}

/// One JSON document per line, for a host process reading our stdout.
pub struct JsonLinesSink<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> IntentSink for JsonLinesSink<W> {
    fn dispatch(&mut self, intent: &Intent) {
        let res = serde_json::to_writer(&mut self.out, intent)
            .map_err(std::io::Error::from)
            .and_then(|_| self.out.write_all(b"\n"))
            .and_then(|_| self.out.flush());
        if let Err(err) = res {
            tracing::warn!(error = %err, kind = intent.name(), "failed to emit intent");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_one_line_per_intent() {
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.dispatch(&Intent::SelectNode { id: "a".to_string() });
        sink.dispatch(&Intent::AddClass { parent_id: Some("a".to_string()) });

        let text = String::from_utf8(sink.into_inner()).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let back: Intent = serde_json::from_str(lines[1]).expect("parse");
        assert_eq!(back, Intent::AddClass { parent_id: Some("a".to_string()) });
    }
}

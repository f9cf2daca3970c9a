mod app;
mod export;
mod graph;
mod render;
mod ui;
mod util;

use anyhow::Result;
use bevy::prelude::*;
use bevy_egui::EguiPlugin;
use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use app::resources::IntentSinks;
use app::SchemaScopeViewerPlugin;
use graph::{Snapshot, ViewerState};
use util::{cli, config};

const LOG_ENV: &str = "SCHEMASCOPE_LOG";

fn log_subscriber<W>(filter: EnvFilter, writer: W) -> impl Subscriber + Send + Sync + 'static
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .finish()
}

/// Logs go to stderr; stdout is reserved for the `--emit-intents` stream.
fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = log_subscriber(filter, std::io::stderr).try_init();
}

fn main() -> Result<()> {
    init_tracing();
    let args = cli::parse_args()?;
    if args.help {
        print!("{}", cli::USAGE);
        return Ok(());
    }

    let mut cfg = config::load_or_default();
    cfg.emit_intents |= args.emit_intents;

    if let Some(out) = args.export.as_deref() {
        let snapshot = Snapshot::load(args.tree.clone(), args.graph.clone())?;
        let doc = export::build_export(&snapshot, &cfg, args.query.as_deref())?;
        export::write_export(out, &doc)?;
        return Ok(());
    }

    let snapshot = match Snapshot::load(args.tree.clone(), args.graph.clone()) {
        Ok(snapshot) => snapshot,
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "failed to load snapshot, starting empty");
            Snapshot::unloaded(args.tree, args.graph)
        }
    };
    let sinks = IntentSinks::from_flags(cfg.emit_intents);

    App::new()
        .add_plugins(
            DefaultPlugins
                .set(WindowPlugin {
                    primary_window: Some(Window {
                        title: "SchemaScope".into(),
                        ..default()
                    }),
                    ..default()
                })
                .disable::<bevy::log::LogPlugin>(),
        )
        .add_plugins(EguiPlugin)
        .insert_resource(ViewerState::new(cfg, snapshot))
        .insert_resource(sinks)
        .add_plugins(SchemaScopeViewerPlugin)
        .run();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use app::sinks::{JsonLinesSink, TracingSink};
    use schemascope_core::{Intent, IntentSink};
    use std::io::{self, Write};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().expect("lock").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().expect("lock").clone()).expect("utf8")
        }
    }

    #[test]
    fn intent_stream_carries_no_log_lines() {
        let logs = SharedBuf::default();
        let intents = SharedBuf::default();
        let log_writer = logs.clone();
        let subscriber = log_subscriber(EnvFilter::new("debug"), move || log_writer.clone());

        tracing::subscriber::with_default(subscriber, || {
            let mut sinks: Vec<Box<dyn IntentSink>> = vec![
                Box::new(TracingSink),
                Box::new(JsonLinesSink::new(intents.clone())),
            ];
            tracing::info!(nodes = 3, "lineage graph projected");
            for intent in [
                Intent::SelectNode { id: "a".to_string() },
                Intent::EdgeClicked { id: "e1".to_string() },
            ] {
                for sink in sinks.iter_mut() {
                    sink.dispatch(&intent);
                }
            }
        });

        let stream = intents.text();
        let lines: Vec<&str> = stream.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            serde_json::from_str::<Intent>(line).expect("only intents on the stream");
        }
        let logged = logs.text();
        assert!(logged.contains("lineage graph projected"));
        assert!(logged.contains("intent"));
    }
}

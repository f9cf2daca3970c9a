use bevy::prelude::Resource;
use bevy_egui::egui;
use schemascope_core::hierarchy::{self, Query};
use schemascope_core::lineage;
use schemascope_core::{
    ExpansionState, FitTicket, HighlightSet, Intent, Position, ProjectionSession, SyncOutcome,
};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::graph::snapshot::Snapshot;
use crate::util::config::ViewerConfig;

const RECENT_INTENTS: usize = 12;
const FIT_MARGIN: f32 = 32.0;
const MIN_ZOOM: f32 = 0.1;
const MAX_ZOOM: f32 = 2.5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Node(String),
    Edge(String),
}

#[derive(Default)]
pub struct UiState {
    pub query: String,
    pub selection: Option<Selection>,
    pub expansion: ExpansionState,
    pub hovered: Option<String>,
    pub context_target: Option<String>,
    pub help_open: bool,
}

impl UiState {
    pub fn selected_node(&self) -> Option<&str> {
        match &self.selection {
            Some(Selection::Node(id)) => Some(id),
            _ => None,
        }
    }

    pub fn selected_edge(&self) -> Option<&str> {
        match &self.selection {
            Some(Selection::Edge(id)) => Some(id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PendingFit {
    pub ticket: FitTicket,
    pub due: Instant,
}

pub struct CanvasState {
    pub pan: egui::Vec2,
    pub zoom: f32,
    /// Screen rect the canvas occupied last frame.
    pub rect: egui::Rect,
    pub pending_fit: Option<PendingFit>,
}

impl Default for CanvasState {
    fn default() -> Self {
        Self {
            pan: egui::Vec2::ZERO,
            zoom: 1.0,
            rect: egui::Rect::NOTHING,
            pending_fit: None,
        }
    }
}

impl CanvasState {
    pub fn to_screen(&self, p: Position) -> egui::Pos2 {
        self.rect.min + self.pan + egui::vec2(p.x as f32, p.y as f32) * self.zoom
    }

    pub fn zoom_around(&mut self, pivot: egui::Pos2, factor: f32) {
        let new_zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        let origin = self.rect.min + self.pan;
        let world = (pivot - origin) / self.zoom;
        self.zoom = new_zoom;
        self.pan = pivot - self.rect.min - world * new_zoom;
    }
}

#[derive(Debug, Default)]
pub struct SyncStatus {
    pub last_outcome: Option<SyncOutcome>,
    pub error: Option<String>,
    pub projections: u64,
    pub patches: u64,
    pub stale_fits: u64,
}

#[derive(Resource)]
pub struct ViewerState {
    pub snapshot: Snapshot,
    pub session: ProjectionSession,
    pub ui: UiState,
    pub canvas: CanvasState,
    pub cfg: ViewerConfig,
    pub status: SyncStatus,
    pub recent_intents: VecDeque<Intent>,
}

impl ViewerState {
    pub fn new(cfg: ViewerConfig, snapshot: Snapshot) -> Self {
        Self {
            snapshot,
            session: ProjectionSession::new(),
            ui: UiState::default(),
            canvas: CanvasState::default(),
            cfg,
            status: SyncStatus::default(),
            recent_intents: VecDeque::new(),
        }
    }

    /// Selection wins over search; with neither, nothing is highlighted.
    pub fn current_highlights(&self) -> HighlightSet {
        let Some(graph) = self.snapshot.graph.as_ref() else {
            return HighlightSet::default();
        };
        match &self.ui.selection {
            Some(Selection::Node(id)) => {
                lineage::trace(graph, id, self.cfg.trace_direction, self.cfg.trace_hops)
            }
            Some(Selection::Edge(id)) => lineage::edge_highlights(graph, id),
            None => lineage::search_highlights(graph, &Query::new(&self.ui.query)),
        }
    }

    pub fn sync_projection(&mut self, now: Instant) {
        let Some(graph) = self.snapshot.graph.as_ref() else {
            if self.session.identity().is_some() {
                self.session.reset();
                self.canvas.pending_fit = None;
            }
            self.status.error = None;
            return;
        };
        let Some(identity) = self.snapshot.identity(self.cfg.identity_mode) else {
            return;
        };
        let highlights = self.current_highlights();

        match self
            .session
            .sync(identity, graph, &highlights, self.cfg.show_attributes)
        {
            Ok(outcome) => {
                self.status.last_outcome = Some(outcome);
                match outcome {
                    SyncOutcome::Projected => {
                        self.status.projections += 1;
                        self.status.error = None;
                        if let (Some(p), Some(id)) =
                            (self.session.projection(), self.session.identity())
                        {
                            tracing::info!(
                                identity = %id,
                                nodes = p.nodes.len(),
                                edges = p.edges.len(),
                                "lineage graph projected"
                            );
                        }
                        let delay = Duration::from_millis(self.cfg.fit_delay_ms);
                        self.canvas.pending_fit = self
                            .session
                            .fit_ticket()
                            .map(|ticket| PendingFit {
                                ticket,
                                due: now + delay,
                            });
                    }
                    SyncOutcome::Patched => self.status.patches += 1,
                    SyncOutcome::Unchanged => {}
                }
            }
            Err(err) => {
                let msg = err.to_string();
                if self.status.error.as_deref() != Some(msg.as_str()) {
                    tracing::error!(error = %err, "projection rejected");
                }
                self.status.error = Some(msg);
            }
        }
    }

    pub fn request_fit(&mut self, now: Instant) {
        self.canvas.pending_fit = self
            .session
            .fit_ticket()
            .map(|ticket| PendingFit { ticket, due: now });
    }

    /// A due fit request whose projection is still the current one.
    pub fn take_due_fit(&mut self, now: Instant) -> Option<FitTicket> {
        if self.canvas.pending_fit.as_ref()?.due > now {
            return None;
        }
        let pending = self.canvas.pending_fit.take()?;
        if self.session.is_current(&pending.ticket) {
            Some(pending.ticket)
        } else {
            self.status.stale_fits += 1;
            tracing::debug!(
                identity = %pending.ticket.identity,
                generation = pending.ticket.generation,
                "skipping stale fit request"
            );
            None
        }
    }

    pub fn fit_view(&mut self) {
        let Some(bounds) = self.session.projection().and_then(|p| p.bounds()) else {
            return;
        };
        let rect = self.canvas.rect;
        if !rect.is_positive() {
            return;
        }
        let world_w = bounds.width() as f32 + self.cfg.node_width;
        let world_h = bounds.height() as f32 + self.cfg.node_height;
        let avail_w = (rect.width() - 2.0 * FIT_MARGIN).max(1.0);
        let avail_h = (rect.height() - 2.0 * FIT_MARGIN).max(1.0);
        let zoom = (avail_w / world_w).min(avail_h / world_h).clamp(MIN_ZOOM, 1.0);

        let world_center = egui::vec2(
            bounds.min.x as f32 + world_w / 2.0,
            bounds.min.y as f32 + world_h / 2.0,
        );
        self.canvas.zoom = zoom;
        self.canvas.pan = (rect.center() - rect.min) - world_center * zoom;
    }

    pub fn select_node(&mut self, id: &str) {
        if let Some(tree) = self.snapshot.tree.as_ref() {
            if let Some(mut path) = hierarchy::ancestor_path(&tree.root_nodes, id) {
                path.pop();
                self.ui.expansion.expand_path(path);
            }
        }
        self.ui.selection = Some(Selection::Node(id.to_string()));
    }

    pub fn select_edge(&mut self, id: &str) {
        self.ui.selection = Some(Selection::Edge(id.to_string()));
    }

    pub fn clear_selection(&mut self) {
        self.ui.selection = None;
        self.ui.hovered = None;
        self.ui.context_target = None;
    }

    pub fn reload(&mut self) -> anyhow::Result<()> {
        self.snapshot.reload()?;
        if let Some(id) = self.snapshot.identity(self.cfg.identity_mode) {
            tracing::info!(
                identity = %id,
                mode = self.cfg.identity_mode.as_str(),
                "snapshot reloaded"
            );
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.snapshot = Snapshot::default();
        self.session.reset();
        self.clear_selection();
        self.ui.expansion.clear();
        self.canvas.pending_fit = None;
        self.status = SyncStatus::default();
    }

    pub fn record_intent(&mut self, intent: Intent) {
        if self.recent_intents.len() >= RECENT_INTENTS {
            self.recent_intents.pop_front();
        }
        self.recent_intents.push_back(intent);
    }
}

use bevy::prelude::{EventWriter, ResMut};
use bevy_egui::{egui, EguiContexts};
use schemascope_core::projection::HIGHLIGHT_EDGE_COLOR;
use schemascope_core::{Anchor, Intent, Projection, RenderNode};
use std::collections::HashMap;
use std::time::Instant;

use crate::app::events::IntentEvent;
use crate::graph::state::CanvasState;
use crate::graph::ViewerState;
use crate::ui::tooltips::render_tooltip;
use crate::util::colors;
use crate::util::config::ViewerConfig;

const ATTR_ROW_H: f32 = 18.0;
const EDGE_HIT_PX: f32 = 6.0;
const ARROW_PX: f32 = 9.0;
const ZOOM_SPEED: f32 = 0.0015;
const MIN_TEXT_ZOOM: f32 = 0.3;

/// Screen geometry of one projected node for the current frame.
#[derive(Debug, Clone, Copy)]
pub struct NodeBox<'a> {
    pub node: &'a RenderNode,
    pub rect: egui::Rect,
    pub header_h: f32,
    pub row_h: f32,
}

impl NodeBox<'_> {
    /// Index of the attribute row under `pos`, if any.
    pub fn attribute_at(&self, pos: egui::Pos2) -> Option<usize> {
        if !self.rect.contains(pos) || self.node.attributes.is_empty() {
            return None;
        }
        let dy = pos.y - self.rect.min.y - self.header_h;
        if dy < 0.0 {
            return None;
        }
        let idx = (dy / self.row_h) as usize;
        (idx < self.node.attributes.len()).then_some(idx)
    }
}

pub fn layout_nodes<'a>(
    projection: &'a Projection,
    canvas: &CanvasState,
    cfg: &ViewerConfig,
) -> Vec<NodeBox<'a>> {
    projection
        .nodes
        .iter()
        .map(|node| {
            // size hint scales the box
            let scale = node.size.map_or(1.0, |s| (s as f32).clamp(0.5, 3.0));
            let header_h = cfg.node_height * scale * canvas.zoom;
            let row_h = ATTR_ROW_H * canvas.zoom;
            let size = egui::vec2(
                cfg.node_width * scale * canvas.zoom,
                header_h + row_h * node.attributes.len() as f32,
            );
            NodeBox {
                node,
                rect: egui::Rect::from_min_size(canvas.to_screen(node.position), size),
                header_h,
                row_h,
            }
        })
        .collect()
}

pub fn anchor_point(rect: egui::Rect, anchor: Anchor) -> egui::Pos2 {
    match anchor {
        Anchor::Top => rect.center_top(),
        Anchor::Bottom => rect.center_bottom(),
        Anchor::Left => rect.left_center(),
        Anchor::Right => rect.right_center(),
    }
}

pub fn distance_to_segment(p: egui::Pos2, a: egui::Pos2, b: egui::Pos2) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_sq();
    if len_sq <= f32::EPSILON {
        return (p - a).length();
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    (p - (a + ab * t)).length()
}

/// Topmost node under `pos`; later nodes are drawn above earlier ones.
pub fn hit_node<'b, 'a>(boxes: &'b [NodeBox<'a>], pos: egui::Pos2) -> Option<&'b NodeBox<'a>> {
    boxes.iter().rev().find(|b| b.rect.contains(pos))
}

fn edge_segments<'a>(
    projection: &'a Projection,
    rects: &HashMap<&str, egui::Rect>,
) -> Vec<(&'a schemascope_core::RenderEdge, egui::Pos2, egui::Pos2)> {
    projection
        .edges
        .iter()
        .filter_map(|edge| {
            // dangling endpoints are not drawn
            let a = rects.get(edge.source.as_str())?;
            let b = rects.get(edge.target.as_str())?;
            Some((
                edge,
                anchor_point(*a, edge.source_anchor),
                anchor_point(*b, edge.target_anchor),
            ))
        })
        .collect()
}

enum CanvasAction {
    SelectNode(String),
    SelectEdge(String),
    Clear,
    Fit,
    Emit(Intent),
}

fn placeholder(ui: &mut egui::Ui, title: &str, detail: &str) {
    ui.centered_and_justified(|ui| {
        ui.vertical_centered(|ui| {
            ui.heading(title);
            ui.label(detail);
        });
    });
}

pub fn draw_canvas(
    mut contexts: EguiContexts,
    mut st: ResMut<ViewerState>,
    mut intents: EventWriter<IntentEvent>,
) {
    let ctx = contexts.ctx_mut();
    let mut actions: Vec<CanvasAction> = Vec::new();
    let st = &mut *st;

    egui::CentralPanel::default()
        .frame(egui::Frame::none().fill(colors::CANVAS_BG))
        .show(ctx, |ui| {
            let ViewerState {
                session,
                canvas,
                cfg,
                ui: view,
                status,
                ..
            } = &mut *st;

            if let Some(err) = &status.error {
                placeholder(ui, "Projection rejected", err);
                return;
            }
            let Some(projection) = session.projection() else {
                placeholder(ui, "Nothing to display", "Load a lineage graph with --graph <path>");
                return;
            };
            if projection.is_empty() {
                placeholder(ui, "Nothing to display", "The lineage graph has no nodes");
                return;
            }

            let (response, painter) =
                ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
            canvas.rect = response.rect;

            if response.dragged() {
                canvas.pan += response.drag_delta();
            }
            if response.hovered() {
                let scroll = ui.input(|i| i.smooth_scroll_delta.y);
                if scroll != 0.0 {
                    if let Some(pivot) = response.hover_pos() {
                        canvas.zoom_around(pivot, (1.0 + scroll * ZOOM_SPEED).max(0.1));
                    }
                }
            }

            let boxes = layout_nodes(projection, canvas, cfg);
            let rects: HashMap<&str, egui::Rect> =
                boxes.iter().map(|b| (b.node.id.as_str(), b.rect)).collect();
            let segments = edge_segments(projection, &rects);
            let zoom = canvas.zoom;
            let show_text = zoom >= MIN_TEXT_ZOOM;

            // ---- edges ----
            for (edge, a, b) in &segments {
                let color = colors::stroke_color(&edge.stroke_color);
                let stroke = egui::Stroke::new(edge.stroke_width as f32, color);
                if view.selected_edge() == Some(edge.id.as_str()) {
                    painter.line_segment(
                        [*a, *b],
                        egui::Stroke::new(edge.stroke_width as f32 + 5.0, color.gamma_multiply(0.35)),
                    );
                }
                if edge.animated {
                    painter.extend(egui::Shape::dashed_line(&[*a, *b], stroke, 8.0, 5.0));
                } else {
                    painter.line_segment([*a, *b], stroke);
                }
                let dir = (*b - *a).normalized();
                if dir.is_finite() && dir != egui::Vec2::ZERO {
                    let back = *b - dir * ARROW_PX;
                    let side = dir.rot90() * (ARROW_PX * 0.5);
                    painter.add(egui::Shape::convex_polygon(
                        vec![*b, back + side, back - side],
                        color,
                        egui::Stroke::NONE,
                    ));
                }
                if cfg.show_edge_labels && show_text {
                    if let Some(label) = &edge.label {
                        painter.text(
                            *a + (*b - *a) * 0.5,
                            egui::Align2::CENTER_BOTTOM,
                            label,
                            egui::FontId::proportional(11.0),
                            egui::Color32::LIGHT_GRAY,
                        );
                    }
                }
            }

            // ---- nodes ----
            let highlight = colors::stroke_color(HIGHLIGHT_EDGE_COLOR);
            for nb in &boxes {
                let node = nb.node;
                let fill = colors::node_fill(node.node_type, node.color.as_deref());
                let border = if view.selected_node() == Some(node.id.as_str()) {
                    egui::Stroke::new(2.5, colors::SELECTED_BORDER)
                } else if node.highlighted {
                    egui::Stroke::new(2.0, highlight)
                } else {
                    egui::Stroke::new(1.0, colors::NODE_BORDER)
                };
                painter.rect(nb.rect, 6.0 * zoom, fill, border);

                if node.has_upstream {
                    painter.circle_filled(nb.rect.left_center(), 3.5 * zoom, colors::NODE_TEXT);
                }
                if node.has_downstream {
                    painter.circle_filled(nb.rect.right_center(), 3.5 * zoom, colors::NODE_TEXT);
                }
                if !show_text {
                    continue;
                }

                let title = match &node.icon {
                    Some(icon) => format!("{icon} {}", node.label),
                    None => node.label.clone(),
                };
                painter.text(
                    nb.rect.center_top() + egui::vec2(0.0, nb.header_h / 2.0),
                    egui::Align2::CENTER_CENTER,
                    title,
                    egui::FontId::proportional(13.0 * zoom),
                    colors::NODE_TEXT,
                );
                if let Some(count) = node.instance_count {
                    painter.text(
                        nb.rect.min + egui::vec2(nb.rect.width() - 6.0 * zoom, nb.header_h - 4.0 * zoom),
                        egui::Align2::RIGHT_BOTTOM,
                        count.to_string(),
                        egui::FontId::proportional(10.0 * zoom),
                        colors::NODE_TEXT,
                    );
                }
                for (i, attr) in node.attributes.iter().enumerate() {
                    let key = if attr.is_primary_key {
                        "🔑 "
                    } else if attr.is_foreign_key {
                        "🔗 "
                    } else {
                        ""
                    };
                    painter.text(
                        nb.rect.min
                            + egui::vec2(8.0 * zoom, nb.header_h + (i as f32 + 0.5) * nb.row_h),
                        egui::Align2::LEFT_CENTER,
                        format!("{key}{} : {}", attr.label(), attr.data_type.as_str()),
                        egui::FontId::proportional(11.0 * zoom),
                        colors::NODE_TEXT,
                    );
                }
            }

            // ---- interaction ----
            let hovered = response.hover_pos().and_then(|p| hit_node(&boxes, p));
            view.hovered = hovered.map(|b| b.node.id.clone());

            if response.clicked() {
                if let Some(pos) = response.interact_pointer_pos() {
                    if let Some(nb) = hit_node(&boxes, pos) {
                        if let Some(idx) = nb.attribute_at(pos) {
                            actions.push(CanvasAction::Emit(Intent::AttributeClicked {
                                node_id: nb.node.id.clone(),
                                attribute_id: nb.node.attributes[idx].id.clone(),
                            }));
                        }
                        actions.push(CanvasAction::SelectNode(nb.node.id.clone()));
                    } else if let Some((edge, _, _)) = segments
                        .iter()
                        .find(|(_, a, b)| distance_to_segment(pos, *a, *b) <= EDGE_HIT_PX)
                    {
                        actions.push(CanvasAction::SelectEdge(edge.id.clone()));
                    } else {
                        actions.push(CanvasAction::Clear);
                    }
                }
            }

            if response.secondary_clicked() {
                view.context_target = response
                    .interact_pointer_pos()
                    .and_then(|p| hit_node(&boxes, p))
                    .map(|b| b.node.id.clone());
            }
            let target = view.context_target.clone();
            response.context_menu(|ui| match &target {
                Some(id) => {
                    if ui.button("Add subclass").clicked() {
                        actions.push(CanvasAction::Emit(Intent::AddClass {
                            parent_id: Some(id.clone()),
                        }));
                        ui.close_menu();
                    }
                    if ui.button("Edit class").clicked() {
                        actions.push(CanvasAction::Emit(Intent::EditClass { id: id.clone() }));
                        ui.close_menu();
                    }
                    if ui.button("Delete class").clicked() {
                        actions.push(CanvasAction::Emit(Intent::DeleteClass { id: id.clone() }));
                        ui.close_menu();
                    }
                }
                None => {
                    if ui.button("Add class").clicked() {
                        actions.push(CanvasAction::Emit(Intent::AddClass { parent_id: None }));
                        ui.close_menu();
                    }
                    if ui.button("Fit view").clicked() {
                        actions.push(CanvasAction::Fit);
                        ui.close_menu();
                    }
                }
            });

            if let Some(nb) = hovered {
                if !response.dragged() {
                    if let Some(pos) = response.hover_pos() {
                        render_tooltip(
                            ui.ctx(),
                            "node_tooltip",
                            pos + egui::vec2(14.0, 14.0),
                            node_tooltip_lines(nb.node),
                        );
                    }
                }
            }
        });

    for action in actions {
        match action {
            CanvasAction::SelectNode(id) => {
                st.select_node(&id);
                intents.send(IntentEvent(Intent::SelectNode { id }));
            }
            CanvasAction::SelectEdge(id) => {
                st.select_edge(&id);
                intents.send(IntentEvent(Intent::EdgeClicked { id }));
            }
            CanvasAction::Clear => {
                if st.ui.selection.is_some() {
                    st.clear_selection();
                }
            }
            CanvasAction::Fit => st.request_fit(Instant::now()),
            CanvasAction::Emit(intent) => {
                intents.send(IntentEvent(intent));
            }
        }
    }
}

pub fn node_tooltip_lines(node: &RenderNode) -> Vec<String> {
    let mut out = vec![format!("{} ({})", node.label, node.id)];
    out.push(format!("type: {:?}, level {}", node.node_type, node.level));
    if let Some(count) = node.instance_count {
        out.push(format!("instances: {count}"));
    }
    match (node.has_upstream, node.has_downstream) {
        (true, true) => out.push("upstream + downstream lineage".to_string()),
        (true, false) => out.push("upstream lineage".to_string()),
        (false, true) => out.push("downstream lineage".to_string()),
        (false, false) => {}
    }
    if !node.attributes.is_empty() {
        out.push(format!("{} attributes", node.attributes.len()));
    }
    out
}

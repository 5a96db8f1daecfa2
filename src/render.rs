//! Drawing surface abstraction and the per-frame draw pass
//!
//! The core never issues raw platform drawing calls: everything goes
//! through [`DrawSurface`], which a canvas/wgpu backend implements outside
//! this crate. The draw pass doubles as the hit-test recording pass, so
//! [`NullSurface`] lets the whole pipeline (hit testing included) run in
//! tests without a display.

use crate::constants::{editor as editor_box, hit, menu as menu_metrics, node as metrics};
use crate::graph::layout::pin_corner;
use crate::graph::store::{GraphStore, PortDirection, PortId};
use crate::interact::hit::{HitTarget, HitTester};
use crate::interact::state::{InteractionState, Operation};
use crate::interpreter::RunReport;
use crate::types::{PreviewKind, TypeRegistry};
use crate::value::Value;
use egui::{Color32, Pos2, Rect, Vec2};

/// Draw primitives provided by the rendering collaborator.
pub trait DrawSurface {
    fn draw_rect(&mut self, rect: Rect, color: Color32);
    fn draw_line(&mut self, from: Pos2, to: Pos2, color: Color32, width: f32);
    fn draw_bezier(&mut self, p0: Pos2, p1: Pos2, p2: Pos2, p3: Pos2, color: Color32, width: f32);
    /// Textured nine-slice panel; margins are left/top/right/bottom
    fn nine_slice(&mut self, rect: Rect, texture: &str, margins: [f32; 4], tint: Option<Color32>);
    fn sprite(&mut self, pos: Pos2, texture: &str, tint: Option<Color32>);
    fn draw_text(&mut self, rect: Rect, text: &str, color: Color32);
}

/// Surface that draws nothing. Used by headless tests and the demo binary.
#[derive(Debug, Default)]
pub struct NullSurface;

impl DrawSurface for NullSurface {
    fn draw_rect(&mut self, _: Rect, _: Color32) {}
    fn draw_line(&mut self, _: Pos2, _: Pos2, _: Color32, _: f32) {}
    fn draw_bezier(&mut self, _: Pos2, _: Pos2, _: Pos2, _: Pos2, _: Color32, _: f32) {}
    fn nine_slice(&mut self, _: Rect, _: &str, _: [f32; 4], _: Option<Color32>) {}
    fn sprite(&mut self, _: Pos2, _: &str, _: Option<Color32>) {}
    fn draw_text(&mut self, _: Rect, _: &str, _: Color32) {}
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Point on a cubic bezier at parameter `t`.
fn bezier_point(t: f32, p0: Pos2, p1: Pos2, p2: Pos2, p3: Pos2) -> Pos2 {
    let a = Pos2::new(lerp(p0.x, p1.x, t), lerp(p0.y, p1.y, t));
    let b = Pos2::new(lerp(p1.x, p2.x, t), lerp(p1.y, p2.y, t));
    let c = Pos2::new(lerp(p2.x, p3.x, t), lerp(p2.y, p3.y, t));
    let ab = Pos2::new(lerp(a.x, b.x, t), lerp(a.y, b.y, t));
    let bc = Pos2::new(lerp(b.x, c.x, t), lerp(b.y, c.y, t));
    Pos2::new(lerp(ab.x, bc.x, t), lerp(ab.y, bc.y, t))
}

/// Background grid.
pub fn draw_grid(surface: &mut dyn DrawSurface, size: Vec2) {
    surface.draw_rect(
        Rect::from_min_size(Pos2::ZERO, size),
        Color32::from_rgb(0x2a, 0x2a, 0x2a),
    );
    let cell = 16.0;
    let minor = Color32::from_rgb(0x35, 0x35, 0x35);
    let major = Color32::from_rgb(0x1c, 0x1c, 0x1c);
    let mut i = 0.0;
    while i < size.x.max(size.y) {
        let color = if (i as i32) % (8 * cell as i32) != 0 {
            minor
        } else {
            major
        };
        surface.draw_line(Pos2::new(i, 0.0), Pos2::new(i, size.y), color, 1.0);
        surface.draw_line(Pos2::new(0.0, i), Pos2::new(size.x, i), color, 1.0);
        i += cell;
    }
}

fn port_hit_rect(store: &GraphStore, port: PortId) -> Rect {
    Rect::from_center_size(
        store.port_pos(port),
        Vec2::splat(hit::PORT_BOX_SIZE),
    )
}

/// Rectangle of the inline value editor belonging to a port's row.
pub fn editor_rect(store: &GraphStore, port: PortId) -> Rect {
    let node = store.port_owner(port);
    let pos = store.node_pos(node);
    let width = store.node_size(node).x;
    let pin = store.port_pos(port);
    Rect::from_min_size(
        Pos2::new(pos.x + editor_box::BOX_LEFT, pin.y - editor_box::BOX_HEIGHT / 2.0),
        Vec2::new(
            width - editor_box::BOX_LEFT - editor_box::BOX_RIGHT_MARGIN,
            editor_box::BOX_HEIGHT,
        ),
    )
}

fn hot_target(hits: &HitTester) -> Option<HitTarget> {
    hits.result().map(|h| h.target)
}

/// Draws every live node with its ports, inline editors and preview, and
/// records the frame's node/port/editor hit candidates.
pub fn draw_nodes(
    store: &GraphStore,
    registry: &TypeRegistry,
    state: &InteractionState,
    hits: &mut HitTester,
    report: &RunReport,
    surface: &mut dyn DrawSurface,
) {
    for node in store.live_nodes() {
        let def = registry.by_id(store.node_type_id(node));
        let rect = store.node_rect(node);
        hits.record(HitTarget::Node(node), rect);

        let shadow = if hot_target(hits) == Some(HitTarget::Node(node)) {
            "assets/RegularNode_shadow_selected.png"
        } else {
            "assets/RegularNode_shadow.png"
        };
        surface.nine_slice(rect.expand(13.0), shadow, [21.0, 21.0, 21.0, 21.0], None);
        surface.nine_slice(rect, "assets/RegularNode_body.png", [14.0, 14.0, 14.0, 14.0], None);

        let title_rect =
            Rect::from_min_size(rect.min, Vec2::new(rect.width(), metrics::TITLE_HEIGHT));
        surface.nine_slice(
            title_rect,
            "assets/RegularNode_title_gloss.png",
            [7.0, 7.0, 7.0, 7.0],
            None,
        );
        surface.nine_slice(
            title_rect,
            "assets/RegularNode_color_spill.png",
            [6.0, 6.0, 1.0, 1.0],
            Some(def.color),
        );
        surface.draw_text(title_rect, &def.title, Color32::WHITE);

        for port in store.node_ports(node) {
            draw_port(store, def, state, hits, surface, port);
        }

        draw_preview(store, def, report, surface, node, rect);
    }
}

fn draw_port(
    store: &GraphStore,
    def: &crate::types::NodeTypeDef,
    state: &InteractionState,
    hits: &mut HitTester,
    surface: &mut dyn DrawSurface,
    port: PortId,
) {
    hits.record(HitTarget::Port(port), port_hit_rect(store, port));

    let connected = match store.port_direction(port) {
        PortDirection::Input => store.connected_to(port).is_some(),
        PortDirection::Output => store.num_connections(port) > 0,
    };
    let texture = if connected {
        "assets/Pin_connected_VarA.png"
    } else {
        "assets/Pin_disconnected_VarA.png"
    };
    surface.sprite(pin_corner(store, port), texture, Some(def.color));

    let pin = store.port_pos(port);
    let node_rect = store.node_rect(store.port_owner(port));
    let label_rect = match store.port_direction(port) {
        PortDirection::Input => Rect::from_min_size(
            Pos2::new(node_rect.min.x + 25.0, pin.y - 6.0),
            Vec2::new(node_rect.width() - 25.0, 12.0),
        ),
        PortDirection::Output => Rect::from_min_size(
            Pos2::new(node_rect.min.x + 8.0, pin.y - 6.0),
            Vec2::new(node_rect.width() - 30.0, 12.0),
        ),
    };
    surface.draw_text(label_rect, store.port_label(port), Color32::LIGHT_GRAY);

    // Inline editor box for editable ports
    let template = &def.ports[store.port_order(port)];
    if template.editor {
        let rect = editor_rect(store, port);
        hits.record(HitTarget::Editor(port), rect);

        let hot = hot_target(hits) == Some(HitTarget::Editor(port));
        let fill = if hot {
            Color32::from_white_alpha(50)
        } else {
            Color32::from_white_alpha(25)
        };
        surface.draw_rect(rect, fill);

        match &state.editing {
            Some(edit) if edit.port == port => {
                // The text-input widget renders the caret and selection;
                // the core just shows the live buffer
                surface.draw_text(rect, &edit.buffer, Color32::LIGHT_GREEN);
            }
            _ => {
                let text = store.port_value(port).map(Value::display).unwrap_or_default();
                surface.draw_text(rect, &text, Color32::LIGHT_GREEN);
            }
        }
    }
}

fn draw_preview(
    store: &GraphStore,
    def: &crate::types::NodeTypeDef,
    report: &RunReport,
    surface: &mut dyn DrawSurface,
    node: usize,
    rect: Rect,
) {
    if def.preview == PreviewKind::None {
        return;
    }
    let area = Rect::from_min_max(
        Pos2::new(rect.min.x + 6.0, rect.max.y - def.preview.height()),
        Pos2::new(rect.max.x - 6.0, rect.max.y - 6.0),
    );

    if !report.is_evaluated(node) {
        surface.draw_text(area, "not ready", Color32::from_rgb(0xe0, 0x60, 0x60));
        return;
    }
    let first_input = def.inputs().next().map(|t| t.label.as_str());
    let value = first_input.and_then(|label| store.get_port_value(node, label));

    match (def.preview, value) {
        (PreviewKind::Number, Some(value)) => {
            surface.draw_text(area, &value.display(), Color32::LIGHT_GREEN);
        }
        (PreviewKind::Plot, Some(Value::FloatArray(values))) if values.len() > 1 => {
            let (lo, hi) = values.iter().fold((f32::MAX, f32::MIN), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
            let span = (hi - lo).max(1e-6);
            let mut prev: Option<Pos2> = None;
            for (i, &v) in values.iter().enumerate() {
                let x = area.min.x + area.width() * i as f32 / (values.len() - 1) as f32;
                let y = area.max.y - area.height() * (v - lo) / span;
                let point = Pos2::new(x, y);
                if let Some(prev) = prev {
                    surface.draw_line(prev, point, Color32::LIGHT_GREEN, 1.0);
                }
                prev = Some(point);
            }
        }
        (_, Some(value)) => {
            surface.draw_text(area, &value.display(), Color32::LIGHT_GREEN);
        }
        (_, None) => {
            surface.draw_text(area, "-", Color32::GRAY);
        }
    }
}

/// Horizontal overhang of a connection wire. Heuristic tuned so wires leave
/// their pins horizontally and still look reasonable when the input sits
/// left of the output.
fn wire_offsets(store: &GraphStore, from: PortId, to: PortId) -> (f32, f32) {
    let dir_from = match store.port_direction(from) {
        PortDirection::Output => 1.0,
        PortDirection::Input => -1.0,
    };
    let dir_to = -dir_from;
    let p1 = store.port_pos(from);
    let p2 = store.port_pos(to);

    let dx = (-(p1.x * dir_from + p2.x * dir_to)).max(0.0);
    let h = 100.0;
    let mut offset = h;
    if dx <= h / 2.0 {
        offset = h + (h * h - 2.0 * h * dx).max(0.0).sqrt();
    }
    (dir_from * offset, dir_to * offset)
}

fn draw_wire(
    store: &GraphStore,
    hits: &HitTester,
    surface: &mut dyn DrawSurface,
    from: PortId,
    to: PortId,
    time_ms: f64,
) {
    let p1 = store.port_pos(from);
    let p2 = store.port_pos(to);
    let (offset1, offset2) = wire_offsets(store, from, to);
    let c1 = Pos2::new(p1.x + offset1, p1.y);
    let c2 = Pos2::new(p2.x + offset2, p2.y);

    // Highlight the wire ends the pointer is over, with a marker running
    // along the curve
    let mut color = Color32::WHITE;
    match hot_target(hits) {
        Some(HitTarget::Port(p)) if p == to => color = Color32::GREEN,
        Some(HitTarget::Port(p)) if p == from => color = Color32::RED,
        _ => {}
    }
    if color != Color32::WHITE {
        let t = (time_ms % 1000.0) as f32 / 1000.0;
        let marker = bezier_point(t, p1, c1, c2, p2);
        surface.draw_rect(
            Rect::from_center_size(marker, Vec2::splat(7.0)),
            color,
        );
    }

    surface.draw_bezier(p1, c1, c2, p2, color, 3.0);
}

/// Draws all existing connections plus the one currently being dragged.
pub fn draw_connections(
    store: &GraphStore,
    state: &InteractionState,
    hits: &HitTester,
    surface: &mut dyn DrawSurface,
    time_ms: f64,
) {
    for port in store.live_ports() {
        if let Some(upstream) = store.connected_to(port) {
            draw_wire(store, hits, surface, upstream, port, time_ms);
        }
    }

    if let Operation::Connecting { anchor } = state.operation {
        match hot_target(hits) {
            Some(HitTarget::Port(target)) if store.ports_compatible(anchor, target) => {
                draw_wire(store, hits, surface, anchor, target, time_ms);
            }
            _ => {
                surface.draw_line(hits.mouse, store.port_pos(anchor), Color32::RED, 1.0);
            }
        }
    }
}

/// Add-node menu model. Opened by clicking empty canvas; clicking an entry
/// places a node of that type at the menu position.
#[derive(Debug, Default)]
pub struct MenuState {
    pub open: bool,
    pub pos: Pos2,
    pub filter: String,
}

/// Draws the add-node menu and records its row hit candidates. Rows are
/// filtered by title against the menu's search string.
pub fn draw_menu(
    menu: &MenuState,
    registry: &TypeRegistry,
    hits: &mut HitTester,
    surface: &mut dyn DrawSurface,
) {
    if !menu.open {
        return;
    }
    let row = Vec2::new(menu_metrics::WIDTH, menu_metrics::ROW_HEIGHT);
    let search_rect = Rect::from_min_size(menu.pos, row);
    surface.draw_rect(search_rect, Color32::from_rgb(20, 20, 60));
    surface.draw_text(search_rect, &menu.filter, Color32::WHITE);

    let mut cy = menu.pos.y + menu_metrics::ROW_HEIGHT;
    for (index, def) in registry.iter().enumerate() {
        if !menu.filter.is_empty() && !def.title.contains(&menu.filter) {
            continue;
        }
        let rect = Rect::from_min_size(Pos2::new(menu.pos.x, cy), row);
        hits.record(HitTarget::MenuItem(index), rect);
        let hot = hot_target(hits) == Some(HitTarget::MenuItem(index));
        let fill = if hot {
            Color32::from_rgb(40, 40, 160)
        } else {
            Color32::from_rgb(25, 25, 90)
        };
        surface.draw_rect(rect, fill);
        surface.draw_text(rect, &def.title, Color32::WHITE);
        cy += menu_metrics::ROW_HEIGHT;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bezier_endpoints() {
        let p0 = Pos2::new(0.0, 0.0);
        let p1 = Pos2::new(10.0, 0.0);
        let p2 = Pos2::new(20.0, 10.0);
        let p3 = Pos2::new(30.0, 10.0);
        assert_eq!(bezier_point(0.0, p0, p1, p2, p3), p0);
        assert_eq!(bezier_point(1.0, p0, p1, p2, p3), p3);
    }

    #[test]
    fn test_wire_overhang_grows_when_input_is_left_of_output() {
        let registry = crate::catalog::builtin_registry();
        let mut store = GraphStore::new();
        let (nid, ndef) = registry.get("number").unwrap();
        let (did, ddef) = registry.get("displayNumber").unwrap();
        // Display sits to the right: small horizontal gap
        let number = store.add_node(nid, ndef, 0.0, 0.0);
        let display = store.add_node(did, ddef, 400.0, 0.0);
        crate::graph::layout::layout_ports(&mut store);

        let out = store.find_port_by_label(number, "value").unwrap();
        let input = store.find_port_by_label(display, "value").unwrap();
        let (forward, _) = wire_offsets(&store, out, input);

        // Moving the display to the left of the source stretches the wire
        store.set_node_pos(display, Pos2::new(-400.0, 0.0));
        crate::graph::layout::layout_ports(&mut store);
        let (backward, _) = wire_offsets(&store, out, input);
        assert!(backward >= forward);
    }
}

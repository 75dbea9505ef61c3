//! Integration tests: end-to-end tool scenarios (tb-editor).
//!
//! Drives a `ToolSystem` purely through its public input handlers, the way
//! a browser host would, and checks the resulting store, selection and
//! viewport.

use pretty_assertions::assert_eq;
use std::collections::HashMap;
use tb_core::id::AnnotationId;
use tb_core::model::{Annotation, AnnotationKind};
use tb_core::transform::{Bounds, CanvasRect, Point, Viewport, screen_to_world, world_to_screen};
use tb_editor::{EngineEvent, KeyEvent, MouseButton, ToolKind, ToolSystem};

/// Canvas offset from the page origin, so screen ≠ world even at scale 1.
const RECT: CanvasRect = CanvasRect::new(20.0, 60.0, 1024.0, 768.0);

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn engine() -> ToolSystem {
    init_logging();
    let mut sys = ToolSystem::default();
    sys.set_current_image("scenarios/street.jpg");
    sys
}

/// Screen position of a world point under the current viewport.
fn at(sys: &ToolSystem, x: f32, y: f32) -> Point {
    world_to_screen(Point::new(x, y), &sys.viewport(), RECT)
}

fn click_world(sys: &mut ToolSystem, x: f32, y: f32) {
    let p = at(sys, x, y);
    sys.handle_mouse_down(MouseButton::Primary, p, RECT);
    sys.handle_mouse_up(MouseButton::Primary, p, RECT);
}

fn add(sys: &mut ToolSystem, x0: f32, y0: f32, x1: f32, y1: f32) -> AnnotationId {
    let a = Annotation::rectangle("Default", Point::new(x0, y0), Point::new(x1, y1));
    let id = a.id();
    assert!(sys.add_annotation(a));
    id
}

// ─── Rectangle ──────────────────────────────────────────────────────────

#[test]
fn rectangle_click_move_click() {
    let mut sys = engine();
    assert_eq!(sys.active_tool(), ToolKind::Rectangle);

    click_world(&mut sys, 10.0, 10.0);
    let p = at(&sys, 50.0, 40.0);
    sys.handle_mouse_move(p, RECT);
    click_world(&mut sys, 50.0, 40.0);

    let anns = sys.annotations().unwrap();
    assert_eq!(anns.len(), 1);
    let ann = anns.iter().next().unwrap();
    assert_eq!(ann.kind, AnnotationKind::Rectangle);
    assert_eq!(ann.kind.as_str(), "rectangle");
    assert_eq!(
        ann.bounds,
        Bounds::new(Point::new(10.0, 10.0), Point::new(50.0, 40.0))
    );
    assert!(sys.drawing().is_none());
}

#[test]
fn rectangle_under_zoomed_viewport() {
    let mut sys = engine();
    sys.set_viewport(Viewport::new(-100.0, -50.0, 2.5));

    click_world(&mut sys, 120.0, 80.0);
    click_world(&mut sys, 200.0, 140.0);

    let ann = sys.annotations().unwrap().iter().next().unwrap().clone();
    let r = ann.rect();
    assert!((r.min_x - 120.0).abs() < 1e-3);
    assert!((r.max_y - 140.0).abs() < 1e-3);
}

#[test]
fn rectangle_leave_while_anchored_leaves_no_artifact() {
    let mut sys = engine();
    click_world(&mut sys, 10.0, 10.0);
    assert_eq!(sys.annotations().unwrap().len(), 1);
    sys.handle_mouse_leave();
    assert!(sys.annotations().unwrap().is_empty());
}

// ─── Selector ───────────────────────────────────────────────────────────

#[test]
fn selector_picks_all_overlapping() {
    let mut sys = engine();
    let a = add(&mut sys, 0.0, 0.0, 100.0, 100.0);
    let b = add(&mut sys, 50.0, 50.0, 150.0, 150.0);
    sys.set_current_tool(ToolKind::Selector);
    sys.take_events();

    click_world(&mut sys, 75.0, 75.0);
    let mut selected = sys.selection().to_vec();
    selected.sort_by_key(|id| id.as_str().to_string());
    let mut expected = vec![a, b];
    expected.sort_by_key(|id| id.as_str().to_string());
    assert_eq!(selected, expected);

    assert_eq!(
        sys.take_events(),
        vec![EngineEvent::SelectionChanged {
            ids: sys.selection().to_vec()
        }]
    );
}

#[test]
fn selector_delete_key_removes_selection() {
    let mut sys = engine();
    let a = add(&mut sys, 0.0, 0.0, 100.0, 100.0);
    let b = add(&mut sys, 50.0, 50.0, 150.0, 150.0);
    sys.handle_key_down(&KeyEvent::new("s"));
    assert_eq!(sys.active_tool(), ToolKind::Selector);

    click_world(&mut sys, 10.0, 10.0);
    assert_eq!(sys.selection(), &[a]);
    sys.handle_key_down(&KeyEvent::new("Backspace"));

    let anns = sys.annotations().unwrap();
    assert_eq!(anns.ids(), &[b]);
}

// ─── Pan ────────────────────────────────────────────────────────────────

#[test]
fn pan_drag_at_scale_two() {
    let mut sys = engine();
    sys.set_viewport(Viewport::new(0.0, 0.0, 2.0));
    sys.set_current_tool(ToolKind::Pan);

    let start = Point::new(300.0, 300.0);
    sys.handle_mouse_down(MouseButton::Primary, start, RECT);
    sys.handle_mouse_move(Point::new(310.0, 305.0), RECT);
    sys.handle_mouse_up(MouseButton::Primary, Point::new(310.0, 305.0), RECT);

    assert_eq!(sys.viewport(), Viewport::new(5.0, 2.5, 2.0));
}

#[test]
fn pan_scroll_keeps_cursor_point_fixed() {
    let mut sys = engine();
    sys.set_current_tool(ToolKind::Pan);
    let cursor = Point::new(412.0, 377.0);

    for delta in [-100.0, -100.0, -3.0, 240.0, -1.0] {
        let before = screen_to_world(cursor, &sys.viewport(), RECT);
        sys.handle_scroll(delta, cursor, RECT);
        let after = screen_to_world(cursor, &sys.viewport(), RECT);
        assert!(
            (before.x - after.x).abs() < 1e-3 && (before.y - after.y).abs() < 1e-3,
            "{before:?} moved to {after:?}"
        );
    }
}

// ─── Keybinds ───────────────────────────────────────────────────────────

#[test]
fn bound_key_switches_then_forwards() {
    let mut sys = engine();
    sys.set_current_tool(ToolKind::Pan);
    sys.take_events();

    sys.handle_key_down(&KeyEvent::new("R"));
    assert_eq!(sys.active_tool(), ToolKind::Rectangle);
    assert_eq!(
        sys.take_events(),
        vec![EngineEvent::ToolChanged {
            tool: ToolKind::Rectangle
        }]
    );

    // Escape reaches the rectangle tool's own handler.
    click_world(&mut sys, 5.0, 5.0);
    sys.handle_key_down(&KeyEvent::new("Escape"));
    assert!(sys.annotations().unwrap().is_empty());
}

#[test]
fn updated_keybinds_replace_defaults() {
    let mut sys = engine();
    let names: HashMap<String, String> = [("p".to_string(), "Pan".to_string())]
        .into_iter()
        .collect();
    sys.update_keybinds(&names);

    sys.handle_key_down(&KeyEvent::new("h"));
    assert_eq!(sys.active_tool(), ToolKind::Rectangle);
    sys.handle_key_down(&KeyEvent::new("p"));
    assert_eq!(sys.active_tool(), ToolKind::Pan);
}

// ─── Associator ─────────────────────────────────────────────────────────

#[test]
fn associator_links_and_delete_scrubs() {
    let mut sys = engine();
    let a = add(&mut sys, 0.0, 0.0, 40.0, 40.0);
    let b = add(&mut sys, 100.0, 100.0, 140.0, 140.0);
    sys.handle_key_down(&KeyEvent::new("a"));

    click_world(&mut sys, 20.0, 20.0);
    assert_eq!(sys.pending_associations(), &[a]);
    click_world(&mut sys, 120.0, 120.0);

    let anns = sys.annotations().unwrap();
    assert!(anns.get(a).unwrap().is_associated_with(b));
    assert!(anns.get(b).unwrap().is_associated_with(a));

    assert!(sys.remove_annotation(b));
    assert!(
        sys.annotations()
            .unwrap()
            .get(a)
            .unwrap()
            .associations
            .is_empty()
    );
}

// ─── Ids ────────────────────────────────────────────────────────────────

#[test]
fn drawn_ids_are_unique() {
    let mut sys = engine();
    for i in 0..50 {
        let x = i as f32 * 10.0;
        click_world(&mut sys, x, 0.0);
        click_world(&mut sys, x + 5.0, 5.0);
    }
    let anns = sys.annotations().unwrap();
    assert_eq!(anns.len(), 50);
    let mut ids: Vec<&str> = anns.ids().iter().map(|id| id.as_str()).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 50);
}

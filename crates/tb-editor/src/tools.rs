//! Tool system for canvas interactions.
//!
//! Each tool interprets pointer and keyboard input while it is active and
//! calls back into `EditorState` for every mutation. Tools never keep their
//! own copy of the store, viewport or selection; the only state they own is
//! the transient gesture state listed below.
//!
//! | Tool | Transient state | Primary click | Secondary click | Keys |
//! |------|-----------------|---------------|-----------------|------|
//! | Rectangle | in-progress annotation | anchor / commit | cancel draw | Esc cancels |
//! | Selector | - | select all under cursor | - | Del removes, Esc clears |
//! | Pan | drag anchor | start drag | - | - |
//! | Associator | pending sources | pick sources / link targets | unlink | Esc clears |

use crate::engine::EditorState;
use crate::input::{KeyEvent, MouseButton};
use serde::{Deserialize, Serialize};
use tb_core::id::AnnotationId;
use tb_core::model::{Annotation, AnnotationKind};
use tb_core::transform::{Bounds, CanvasRect, Point};

/// The closed set of tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToolKind {
    Rectangle,
    Selector,
    Pan,
    Associator,
}

impl ToolKind {
    /// Toolbar order.
    pub const ALL: [ToolKind; 4] = [
        ToolKind::Rectangle,
        ToolKind::Pan,
        ToolKind::Selector,
        ToolKind::Associator,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::Rectangle => "Rectangle",
            ToolKind::Selector => "Selector",
            ToolKind::Pan => "Pan",
            ToolKind::Associator => "Associator",
        }
    }

    /// Case-insensitive lookup by display name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name.trim()))
    }

    pub fn default_key(&self) -> &'static str {
        match self {
            ToolKind::Rectangle => "r",
            ToolKind::Selector => "s",
            ToolKind::Pan => "h",
            ToolKind::Associator => "a",
        }
    }
}

/// Callbacks every tool implements. All handlers default to no-ops.
///
/// `pos` is always in screen space; tools convert with
/// `EditorState::screen_to_world` using the `rect` passed alongside.
pub trait Tool {
    fn kind(&self) -> ToolKind;

    /// The tool just became active.
    fn on_tool_selected(&mut self, _state: &mut EditorState) {}

    /// Abandon any in-progress gesture. Called when the tool is switched
    /// away from and when the current image changes.
    fn cancel(&mut self, _state: &mut EditorState) {}

    fn on_mouse_down(
        &mut self,
        _state: &mut EditorState,
        _button: MouseButton,
        _pos: Point,
        _rect: CanvasRect,
    ) {
    }

    fn on_mouse_up(
        &mut self,
        _state: &mut EditorState,
        _button: MouseButton,
        _pos: Point,
        _rect: CanvasRect,
    ) {
    }

    fn on_mouse_move(&mut self, _state: &mut EditorState, _pos: Point, _rect: CanvasRect) {}

    fn on_scroll(&mut self, _state: &mut EditorState, _delta_y: f32, _pos: Point, _rect: CanvasRect) {
    }

    fn on_key_down(&mut self, _state: &mut EditorState, _key: &KeyEvent) {}

    fn on_key_up(&mut self, _state: &mut EditorState, _key: &KeyEvent) {}

    fn on_mouse_leave(&mut self, _state: &mut EditorState) {}
}

// ─── Rectangle Tool ──────────────────────────────────────────────────────

/// Click-move-click rectangle drawing.
///
/// The first primary click inserts a zero-size annotation at the anchor so
/// the renderer can preview it; moves drag its second corner; the second
/// click commits. Leaving the canvas or cancelling removes the preview.
#[derive(Debug, Default)]
pub struct RectangleTool {
    drawing: Option<AnnotationId>,
}

impl RectangleTool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of the in-progress annotation, if anchored.
    pub fn drawing(&self) -> Option<AnnotationId> {
        self.drawing
    }

    fn anchor(&mut self, state: &mut EditorState, world: Point) {
        let annotation = Annotation::new(
            AnnotationKind::Rectangle,
            state.current_class(),
            Bounds::at(world),
        );
        let id = annotation.id();
        if state.add_annotation(annotation) {
            log::trace!("rectangle: anchored {id} at ({}, {})", world.x, world.y);
            self.drawing = Some(id);
        }
    }

    fn commit(&mut self, state: &mut EditorState, id: AnnotationId, world: Point) {
        self.drawing = None;
        if !state.set_bounds_end(id, world) {
            // Removed underneath us (e.g. image switch raced the click).
            return;
        }
        let degenerate = state
            .annotation(id)
            .is_none_or(|a| a.bounds.is_degenerate());
        if degenerate {
            log::debug!("rectangle: dropped zero-area {id}");
            state.remove_annotation(id);
        } else {
            log::debug!("rectangle: committed {id}");
        }
    }
}

impl Tool for RectangleTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Rectangle
    }

    fn on_tool_selected(&mut self, state: &mut EditorState) {
        self.cancel(state);
    }

    fn cancel(&mut self, state: &mut EditorState) {
        if let Some(id) = self.drawing.take() {
            log::debug!("rectangle: retracted {id}");
            state.remove_annotation(id);
        }
    }

    fn on_mouse_down(
        &mut self,
        state: &mut EditorState,
        button: MouseButton,
        pos: Point,
        rect: CanvasRect,
    ) {
        match button {
            MouseButton::Primary => {
                let world = state.screen_to_world(pos, rect);
                match self.drawing {
                    None => self.anchor(state, world),
                    Some(id) => self.commit(state, id, world),
                }
            }
            MouseButton::Secondary => self.cancel(state),
            MouseButton::Middle => {}
        }
    }

    fn on_mouse_move(&mut self, state: &mut EditorState, pos: Point, rect: CanvasRect) {
        if let Some(id) = self.drawing {
            let world = state.screen_to_world(pos, rect);
            if !state.set_bounds_end(id, world) {
                self.drawing = None;
            }
        }
    }

    fn on_key_down(&mut self, state: &mut EditorState, key: &KeyEvent) {
        if key.is("Escape") {
            self.cancel(state);
        }
    }

    fn on_mouse_leave(&mut self, state: &mut EditorState) {
        self.cancel(state);
    }
}

// ─── Selector Tool ───────────────────────────────────────────────────────

/// Point selection. A click selects every annotation under the cursor,
/// not only the topmost one; clicking empty space clears the selection.
#[derive(Debug, Default)]
pub struct SelectorTool;

impl SelectorTool {
    pub fn new() -> Self {
        Self
    }
}

impl Tool for SelectorTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Selector
    }

    fn on_mouse_down(
        &mut self,
        state: &mut EditorState,
        button: MouseButton,
        pos: Point,
        rect: CanvasRect,
    ) {
        if button != MouseButton::Primary || state.current_image().is_none() {
            return;
        }
        let world = state.screen_to_world(pos, rect);
        let hits = state.hits_at(world);
        state.select_annotations(&hits);
    }

    fn on_key_down(&mut self, state: &mut EditorState, key: &KeyEvent) {
        if key.is("Delete") || key.is("Backspace") {
            let selected = state.selection().to_vec();
            for id in selected {
                state.remove_annotation(id);
            }
        } else if key.is("Escape") && !state.selection().is_empty() {
            state.select_annotations(&[]);
        }
    }
}

// ─── Pan Tool ────────────────────────────────────────────────────────────

/// Primary-drag panning and cursor-anchored wheel zoom.
#[derive(Debug, Default)]
pub struct PanTool {
    last: Option<Point>,
}

impl PanTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        self.last.is_some()
    }
}

impl Tool for PanTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Pan
    }

    fn on_tool_selected(&mut self, _state: &mut EditorState) {
        self.last = None;
    }

    fn cancel(&mut self, _state: &mut EditorState) {
        self.last = None;
    }

    fn on_mouse_down(
        &mut self,
        _state: &mut EditorState,
        button: MouseButton,
        pos: Point,
        _rect: CanvasRect,
    ) {
        if button == MouseButton::Primary {
            self.last = Some(pos);
        }
    }

    fn on_mouse_up(
        &mut self,
        _state: &mut EditorState,
        button: MouseButton,
        _pos: Point,
        _rect: CanvasRect,
    ) {
        if button == MouseButton::Primary {
            self.last = None;
        }
    }

    fn on_mouse_move(&mut self, state: &mut EditorState, pos: Point, _rect: CanvasRect) {
        if let Some(last) = self.last {
            state.pan_by(pos.x - last.x, pos.y - last.y);
            self.last = Some(pos);
        }
    }

    fn on_scroll(&mut self, state: &mut EditorState, delta_y: f32, pos: Point, rect: CanvasRect) {
        state.zoom_at(delta_y, pos, rect);
    }

    fn on_mouse_leave(&mut self, _state: &mut EditorState) {
        self.last = None;
    }
}

// ─── Associator Tool ─────────────────────────────────────────────────────

/// Two-click linking.
///
/// The first primary click records every annotation under the cursor as a
/// pending source. The second links each pending source to each annotation
/// under the cursor, in both directions, and clears the pending set. A
/// second click on empty space just clears it. A secondary click removes
/// all links of the annotations under the cursor.
#[derive(Debug, Default)]
pub struct AssociatorTool {
    pending: Vec<AnnotationId>,
}

impl AssociatorTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> &[AnnotationId] {
        &self.pending
    }
}

impl Tool for AssociatorTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Associator
    }

    fn on_tool_selected(&mut self, _state: &mut EditorState) {
        self.pending.clear();
    }

    fn cancel(&mut self, _state: &mut EditorState) {
        self.pending.clear();
    }

    fn on_mouse_down(
        &mut self,
        state: &mut EditorState,
        button: MouseButton,
        pos: Point,
        rect: CanvasRect,
    ) {
        if state.current_image().is_none() {
            return;
        }
        let world = state.screen_to_world(pos, rect);
        let hits = state.hits_at(world);

        match button {
            MouseButton::Primary if self.pending.is_empty() => {
                log::trace!("associator: {} pending sources", hits.len());
                self.pending = hits;
            }
            MouseButton::Primary => {
                let sources = std::mem::take(&mut self.pending);
                let mut linked = 0;
                for &source in &sources {
                    for &target in &hits {
                        if state.associate(source, target) {
                            linked += 1;
                        }
                    }
                }
                log::debug!("associator: linked {linked} pairs");
            }
            MouseButton::Secondary => {
                for id in hits {
                    state.dissociate_all(id);
                }
            }
            MouseButton::Middle => {}
        }
    }

    fn on_key_down(&mut self, _state: &mut EditorState, key: &KeyEvent) {
        if key.is("Escape") {
            self.pending.clear();
        }
    }
}

// ─── Tool set ────────────────────────────────────────────────────────────

/// One instance of every tool, created at start-up and kept for the whole
/// session.
#[derive(Debug, Default)]
pub struct ToolSet {
    pub rectangle: RectangleTool,
    pub selector: SelectorTool,
    pub pan: PanTool,
    pub associator: AssociatorTool,
}

impl ToolSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: ToolKind) -> &dyn Tool {
        match kind {
            ToolKind::Rectangle => &self.rectangle,
            ToolKind::Selector => &self.selector,
            ToolKind::Pan => &self.pan,
            ToolKind::Associator => &self.associator,
        }
    }

    pub fn get_mut(&mut self, kind: ToolKind) -> &mut dyn Tool {
        match kind {
            ToolKind::Rectangle => &mut self.rectangle,
            ToolKind::Selector => &mut self.selector,
            ToolKind::Pan => &mut self.pan,
            ToolKind::Associator => &mut self.associator,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tb_core::transform::Viewport;

    const RECT: CanvasRect = CanvasRect::new(0.0, 0.0, 800.0, 600.0);

    fn state_with_image() -> EditorState {
        let mut state = EditorState::default();
        state.set_current_image_key(tb_core::id::ImageKey::intern("tools/test.png"));
        state
    }

    fn click(tool: &mut dyn Tool, state: &mut EditorState, x: f32, y: f32) {
        tool.on_mouse_down(state, MouseButton::Primary, Point::new(x, y), RECT);
        tool.on_mouse_up(state, MouseButton::Primary, Point::new(x, y), RECT);
    }

    fn add_rect(state: &mut EditorState, x0: f32, y0: f32, x1: f32, y1: f32) -> AnnotationId {
        let a = Annotation::rectangle("obj", Point::new(x0, y0), Point::new(x1, y1));
        let id = a.id();
        assert!(state.add_annotation(a));
        id
    }

    #[test]
    fn tool_names_roundtrip() {
        for kind in ToolKind::ALL {
            assert_eq!(ToolKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(ToolKind::from_name("pan"), Some(ToolKind::Pan));
        assert_eq!(ToolKind::from_name("Brush"), None);
    }

    #[test]
    fn rectangle_previews_then_commits() {
        let mut state = state_with_image();
        let mut tool = RectangleTool::new();

        click(&mut tool, &mut state, 10.0, 10.0);
        let id = tool.drawing().expect("anchored");
        let preview = state.annotation(id).unwrap();
        assert_eq!(preview.bounds, Bounds::at(Point::new(10.0, 10.0)));

        tool.on_mouse_move(&mut state, Point::new(30.0, 25.0), RECT);
        assert_eq!(state.annotation(id).unwrap().bounds.end(), Point::new(30.0, 25.0));

        click(&mut tool, &mut state, 50.0, 40.0);
        assert!(tool.drawing().is_none());
        let committed = state.annotation(id).unwrap();
        assert_eq!(
            committed.bounds,
            Bounds::new(Point::new(10.0, 10.0), Point::new(50.0, 40.0))
        );
    }

    #[test]
    fn rectangle_second_click_on_anchor_is_discarded() {
        let mut state = state_with_image();
        let mut tool = RectangleTool::new();
        click(&mut tool, &mut state, 10.0, 10.0);
        click(&mut tool, &mut state, 10.0, 10.0);
        assert!(state.annotations().unwrap().is_empty());
    }

    #[test]
    fn rectangle_mouse_leave_retracts_preview() {
        let mut state = state_with_image();
        let mut tool = RectangleTool::new();
        click(&mut tool, &mut state, 10.0, 10.0);
        tool.on_mouse_move(&mut state, Point::new(60.0, 60.0), RECT);
        tool.on_mouse_leave(&mut state);
        assert!(tool.drawing().is_none());
        assert!(state.annotations().unwrap().is_empty());
    }

    #[test]
    fn retracted_preview_id_is_not_reused() {
        let mut state = state_with_image();
        let mut tool = RectangleTool::new();
        click(&mut tool, &mut state, 10.0, 10.0);
        let retracted = tool.drawing().expect("anchored");
        tool.on_mouse_leave(&mut state);

        click(&mut tool, &mut state, 10.0, 10.0);
        let next = tool.drawing().expect("anchored again");
        assert_ne!(next, retracted);
        assert!(state.annotation(retracted).is_none());
        assert_eq!(AnnotationId::lookup(retracted.as_str()), Some(retracted));
    }

    #[test]
    fn rectangle_escape_and_right_click_cancel() {
        let mut state = state_with_image();
        let mut tool = RectangleTool::new();

        click(&mut tool, &mut state, 10.0, 10.0);
        tool.on_key_down(&mut state, &KeyEvent::new("Escape"));
        assert!(state.annotations().unwrap().is_empty());

        click(&mut tool, &mut state, 10.0, 10.0);
        tool.on_mouse_down(&mut state, MouseButton::Secondary, Point::new(5.0, 5.0), RECT);
        assert!(state.annotations().unwrap().is_empty());
        assert!(tool.drawing().is_none());
    }

    #[test]
    fn rectangle_without_image_is_noop() {
        let mut state = EditorState::default();
        let mut tool = RectangleTool::new();
        click(&mut tool, &mut state, 10.0, 10.0);
        assert!(tool.drawing().is_none());
    }

    #[test]
    fn rectangle_uses_current_class() {
        let mut state = state_with_image();
        let mut tool = RectangleTool::new();
        click(&mut tool, &mut state, 0.0, 0.0);
        click(&mut tool, &mut state, 5.0, 5.0);
        let ann = state.annotations().unwrap().iter().next().unwrap();
        assert_eq!(ann.name, state.current_class());
    }

    #[test]
    fn selector_selects_all_overlapping() {
        let mut state = state_with_image();
        let a = add_rect(&mut state, 0.0, 0.0, 100.0, 100.0);
        let b = add_rect(&mut state, 50.0, 50.0, 150.0, 150.0);
        let mut tool = SelectorTool::new();

        click(&mut tool, &mut state, 75.0, 75.0);
        assert_eq!(state.selection(), &[a, b]);

        click(&mut tool, &mut state, 10.0, 10.0);
        assert_eq!(state.selection(), &[a]);

        click(&mut tool, &mut state, 400.0, 400.0);
        assert!(state.selection().is_empty());
    }

    #[test]
    fn selector_delete_removes_selected() {
        let mut state = state_with_image();
        let a = add_rect(&mut state, 0.0, 0.0, 100.0, 100.0);
        let b = add_rect(&mut state, 200.0, 200.0, 300.0, 300.0);
        let mut tool = SelectorTool::new();

        click(&mut tool, &mut state, 20.0, 20.0);
        tool.on_key_down(&mut state, &KeyEvent::new("Delete"));
        assert!(state.annotation(a).is_none());
        assert!(state.annotation(b).is_some());
        assert!(state.selection().is_empty());
    }

    #[test]
    fn pan_drag_divides_by_scale() {
        let mut state = state_with_image();
        state.set_viewport(Viewport::new(0.0, 0.0, 2.0));
        let mut tool = PanTool::new();

        tool.on_mouse_down(&mut state, MouseButton::Primary, Point::new(100.0, 100.0), RECT);
        tool.on_mouse_move(&mut state, Point::new(110.0, 105.0), RECT);
        assert_eq!(state.viewport(), Viewport::new(5.0, 2.5, 2.0));

        tool.on_mouse_up(&mut state, MouseButton::Primary, Point::new(110.0, 105.0), RECT);
        tool.on_mouse_move(&mut state, Point::new(200.0, 200.0), RECT);
        assert_eq!(state.viewport(), Viewport::new(5.0, 2.5, 2.0));
    }

    #[test]
    fn pan_leave_stops_drag() {
        let mut state = state_with_image();
        let mut tool = PanTool::new();
        tool.on_mouse_down(&mut state, MouseButton::Primary, Point::new(0.0, 0.0), RECT);
        assert!(tool.is_dragging());
        tool.on_mouse_leave(&mut state);
        assert!(!tool.is_dragging());
    }

    #[test]
    fn pan_secondary_does_not_drag() {
        let mut state = state_with_image();
        let mut tool = PanTool::new();
        tool.on_mouse_down(&mut state, MouseButton::Secondary, Point::new(0.0, 0.0), RECT);
        tool.on_mouse_move(&mut state, Point::new(50.0, 50.0), RECT);
        assert_eq!(state.viewport(), Viewport::default());
    }

    #[test]
    fn associator_links_sources_to_targets() {
        let mut state = state_with_image();
        let a = add_rect(&mut state, 0.0, 0.0, 100.0, 100.0);
        let b = add_rect(&mut state, 50.0, 50.0, 150.0, 150.0);
        let c = add_rect(&mut state, 300.0, 300.0, 400.0, 400.0);
        let mut tool = AssociatorTool::new();

        click(&mut tool, &mut state, 75.0, 75.0);
        assert_eq!(tool.pending(), &[a, b]);

        click(&mut tool, &mut state, 350.0, 350.0);
        assert!(tool.pending().is_empty());
        let ann_c = state.annotation(c).unwrap();
        assert!(ann_c.is_associated_with(a));
        assert!(ann_c.is_associated_with(b));
        assert!(state.annotation(a).unwrap().is_associated_with(c));
        assert!(!state.annotation(a).unwrap().is_associated_with(b));
    }

    #[test]
    fn associator_empty_click_clears_pending() {
        let mut state = state_with_image();
        let a = add_rect(&mut state, 0.0, 0.0, 100.0, 100.0);
        let mut tool = AssociatorTool::new();

        click(&mut tool, &mut state, 50.0, 50.0);
        assert_eq!(tool.pending(), &[a]);
        click(&mut tool, &mut state, 500.0, 500.0);
        assert!(tool.pending().is_empty());
        assert!(state.annotation(a).unwrap().associations.is_empty());
    }

    #[test]
    fn associator_secondary_click_unlinks() {
        let mut state = state_with_image();
        let a = add_rect(&mut state, 0.0, 0.0, 10.0, 10.0);
        let b = add_rect(&mut state, 20.0, 20.0, 30.0, 30.0);
        assert!(state.associate(a, b));

        let mut tool = AssociatorTool::new();
        tool.on_mouse_down(&mut state, MouseButton::Secondary, Point::new(5.0, 5.0), RECT);
        assert!(state.annotation(a).unwrap().associations.is_empty());
        assert!(state.annotation(b).unwrap().associations.is_empty());
    }

    #[test]
    fn tool_set_dispatches_by_kind() {
        let mut set = ToolSet::new();
        for kind in ToolKind::ALL {
            assert_eq!(set.get(kind).kind(), kind);
            assert_eq!(set.get_mut(kind).kind(), kind);
        }
    }
}

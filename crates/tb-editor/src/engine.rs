//! Interaction engine: the single owner of annotation, viewport and
//! selection state.
//!
//! `ToolSystem` routes host input to the active tool. Tools receive a
//! `&mut EditorState` and mutate through its methods only, so there is never
//! a second copy of "what is selected" or "where the viewport is".
//!
//! Every observable change is queued as an [`EngineEvent`]; the host drains
//! the queue with [`ToolSystem::take_events`] after each input callback and
//! redraws from a [`RenderSnapshot`].

use crate::input::{KeyEvent, MouseButton};
use crate::keybinds::KeybindMap;
use crate::snapshot::RenderSnapshot;
use crate::tools::{Tool, ToolKind, ToolSet};
use serde::Serialize;
use std::collections::HashMap;
use tb_core::config::{ClassPalette, ProjectConfig};
use tb_core::detect::Detection;
use tb_core::export::{ExportManifest, ExportScope, ImageSize};
use tb_core::id::{AnnotationId, ImageKey};
use tb_core::model::Annotation;
use tb_core::store::{AnnotationStore, ImageAnnotations};
use tb_core::transform::{CanvasRect, Point, Viewport, ZoomLimits, screen_to_world};

// ─── Events ──────────────────────────────────────────────────────────────

/// Change notifications for the host.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EngineEvent {
    ImageChanged { image: ImageKey },
    SelectionChanged { ids: Vec<AnnotationId> },
    ToolChanged { tool: ToolKind },
    ViewportChanged { viewport: Viewport },
    AnnotationsChanged { image: ImageKey },
    ClassChanged { class: String },
}

/// Undrained events past this are dropped oldest first.
const MAX_QUEUED_EVENTS: usize = 64;

impl EngineEvent {
    /// Whether `self` makes a queued `older` event stale. Each variant is
    /// one slot, except `AnnotationsChanged` which has one slot per image.
    fn supersedes(&self, older: &EngineEvent) -> bool {
        match (self, older) {
            (Self::AnnotationsChanged { image: a }, Self::AnnotationsChanged { image: b }) => {
                a == b
            }
            _ => std::mem::discriminant(self) == std::mem::discriminant(older),
        }
    }
}

// ─── Editor state ────────────────────────────────────────────────────────

/// State shared by every tool. Only the engine owns one.
#[derive(Debug, Clone)]
pub struct EditorState {
    store: AnnotationStore,
    current_image: Option<ImageKey>,
    selection: Vec<AnnotationId>,
    viewport: Viewport,
    zoom: ZoomLimits,
    palette: ClassPalette,
    current_class: String,
    events: Vec<EngineEvent>,
    revision: u64,
}

impl Default for EditorState {
    fn default() -> Self {
        Self::with_palette(ProjectConfig::default().classes)
    }
}

impl EditorState {
    pub fn with_palette(palette: ClassPalette) -> Self {
        let current_class = palette.default_class().to_string();
        Self {
            store: AnnotationStore::new(),
            current_image: None,
            selection: Vec::new(),
            viewport: Viewport::default(),
            zoom: ZoomLimits::default(),
            palette,
            current_class,
            events: Vec::new(),
            revision: 0,
        }
    }

    // ── Queries ──

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn current_image(&self) -> Option<ImageKey> {
        self.current_image
    }

    /// Annotations of the current image.
    pub fn annotations(&self) -> Option<&ImageAnnotations> {
        self.store.image(self.current_image?)
    }

    pub fn annotation(&self, id: AnnotationId) -> Option<&Annotation> {
        self.annotations()?.get(id)
    }

    /// Ids under the world-space point `p`; empty without a current image.
    pub fn hits_at(&self, p: Point) -> Vec<AnnotationId> {
        self.annotations()
            .map(|anns| anns.hits_at(p))
            .unwrap_or_default()
    }

    pub fn selection(&self) -> &[AnnotationId] {
        &self.selection
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn palette(&self) -> &ClassPalette {
        &self.palette
    }

    /// Class assigned to newly drawn rectangles.
    pub fn current_class(&self) -> &str {
        &self.current_class
    }

    pub fn screen_to_world(&self, p: Point, rect: CanvasRect) -> Point {
        screen_to_world(p, &self.viewport, rect)
    }

    // ── Image context ──

    /// Make `key` the current image, creating its annotation map on first
    /// use. The selection is cleared and listeners are told so.
    pub fn set_current_image_key(&mut self, key: ImageKey) {
        self.store.ensure_image(key);
        self.current_image = Some(key);
        self.selection.clear();
        self.emit(EngineEvent::ImageChanged { image: key });
        self.emit(EngineEvent::SelectionChanged { ids: Vec::new() });
    }

    // ── Annotation mutations ──

    /// Insert into the current image. Returns `false` (and drops the
    /// annotation) when no image is current.
    ///
    /// # Panics
    ///
    /// Panics if an annotation with the same id is already stored.
    pub fn add_annotation(&mut self, annotation: Annotation) -> bool {
        let Some(image) = self.current_image else {
            log::trace!("add_annotation: no current image, ignored");
            return false;
        };
        self.store.ensure_image(image).insert(annotation);
        self.emit(EngineEvent::AnnotationsChanged { image });
        true
    }

    /// Remove from the current image, scrubbing associations and the
    /// selection.
    pub fn remove_annotation(&mut self, id: AnnotationId) -> Option<Annotation> {
        let image = self.current_image?;
        let removed = self.store.image_mut(image)?.remove(id)?;
        if self.selection.contains(&id) {
            self.selection.retain(|s| *s != id);
            let ids = self.selection.clone();
            self.emit(EngineEvent::SelectionChanged { ids });
        }
        self.emit(EngineEvent::AnnotationsChanged { image });
        Some(removed)
    }

    /// Move the second corner of `id`. Returns `false` if it no longer
    /// exists in the current image.
    pub fn set_bounds_end(&mut self, id: AnnotationId, p: Point) -> bool {
        let Some(image) = self.current_image else {
            return false;
        };
        let Some(annotation) = self.store.image_mut(image).and_then(|a| a.get_mut(id)) else {
            return false;
        };
        annotation.bounds.set_end(p);
        self.emit(EngineEvent::AnnotationsChanged { image });
        true
    }

    pub fn associate(&mut self, a: AnnotationId, b: AnnotationId) -> bool {
        self.with_current_image(|anns| anns.associate(a, b))
    }

    pub fn dissociate_all(&mut self, id: AnnotationId) -> bool {
        self.with_current_image(|anns| anns.dissociate_all(id))
    }

    fn with_current_image(&mut self, f: impl FnOnce(&mut ImageAnnotations) -> bool) -> bool {
        let Some(image) = self.current_image else {
            return false;
        };
        let changed = self.store.image_mut(image).is_some_and(f);
        if changed {
            self.emit(EngineEvent::AnnotationsChanged { image });
        }
        changed
    }

    // ── Selection ──

    /// Replace the selection. Ids not in the current image are dropped,
    /// duplicates collapse. Listeners are always notified.
    pub fn select_annotations(&mut self, ids: &[AnnotationId]) {
        let mut selection = Vec::with_capacity(ids.len());
        if let Some(anns) = self.annotations() {
            for &id in ids {
                if anns.contains(id) && !selection.contains(&id) {
                    selection.push(id);
                }
            }
        }
        self.selection = selection;
        let ids = self.selection.clone();
        self.emit(EngineEvent::SelectionChanged { ids });
    }

    // ── Viewport ──

    /// Replace the viewport, clamping the scale. Non-finite or non-positive
    /// viewports are rejected.
    pub fn set_viewport(&mut self, viewport: Viewport) -> bool {
        if !viewport.is_valid() {
            log::warn!("set_viewport: rejected {viewport:?}");
            return false;
        }
        let clamped = Viewport {
            scale: self.zoom.clamp(viewport.scale),
            ..viewport
        };
        self.update_viewport(clamped);
        true
    }

    /// Pan by a screen-space delta.
    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        let next = self.viewport.panned_by(dx, dy);
        self.update_viewport(next);
    }

    /// One scroll tick of cursor-anchored zoom.
    pub fn zoom_at(&mut self, delta_y: f32, cursor: Point, rect: CanvasRect) {
        let next = self.viewport.zoomed_at(delta_y, cursor, rect, &self.zoom);
        self.update_viewport(next);
    }

    fn update_viewport(&mut self, next: Viewport) {
        if next == self.viewport || !next.is_valid() {
            return;
        }
        self.viewport = next;
        self.emit(EngineEvent::ViewportChanged { viewport: next });
    }

    // ── Classes ──

    /// Switch the class for new rectangles. Only configured classes are
    /// accepted.
    pub fn set_current_class(&mut self, name: &str) -> bool {
        if !self.palette.contains(name) {
            log::warn!("set_current_class: unknown class '{name}'");
            return false;
        }
        if self.current_class != name {
            self.current_class = name.to_string();
            self.emit(EngineEvent::ClassChanged {
                class: self.current_class.clone(),
            });
        }
        true
    }

    /// Replace the palette. The current class survives if the new palette
    /// still has it; otherwise it resets to the palette's default.
    pub fn set_palette(&mut self, palette: ClassPalette) {
        self.palette = palette;
        if !self.palette.contains(&self.current_class) {
            self.current_class = self.palette.default_class().to_string();
            self.emit(EngineEvent::ClassChanged {
                class: self.current_class.clone(),
            });
        }
    }

    // ── Events ──

    /// Queue an event, replacing any queued event it supersedes. A host
    /// that never drains still holds at most [`MAX_QUEUED_EVENTS`].
    pub(crate) fn emit(&mut self, event: EngineEvent) {
        self.revision += 1;
        self.events.retain(|queued| !event.supersedes(queued));
        if self.events.len() >= MAX_QUEUED_EVENTS {
            log::debug!("events: queue full, dropping oldest");
            self.events.remove(0);
        }
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    /// Bumped on every change, drained or not.
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

// ─── Tool system ─────────────────────────────────────────────────────────

/// Toolbar entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolInfo {
    pub kind: ToolKind,
    pub name: &'static str,
    /// Key currently bound to the tool, if any.
    pub key: Option<String>,
}

/// The interaction engine. Construct one per canvas and pass it by
/// reference to whatever needs it.
#[derive(Debug)]
pub struct ToolSystem {
    state: EditorState,
    tools: ToolSet,
    active: ToolKind,
    keybinds: KeybindMap,
}

impl Default for ToolSystem {
    fn default() -> Self {
        Self::new(&ProjectConfig::default())
    }
}

impl ToolSystem {
    /// Create an engine with Rectangle active.
    pub fn new(config: &ProjectConfig) -> Self {
        let mut sys = Self {
            state: EditorState::with_palette(config.classes.clone()),
            tools: ToolSet::new(),
            active: ToolKind::Rectangle,
            keybinds: KeybindMap::from_names(&config.keybinds),
        };
        sys.tools.get_mut(sys.active).on_tool_selected(&mut sys.state);
        sys.state.emit(EngineEvent::ToolChanged { tool: sys.active });
        sys
    }

    /// Apply a reloaded configuration: palette and keybinds.
    pub fn apply_config(&mut self, config: &ProjectConfig) {
        self.state.set_palette(config.classes.clone());
        self.update_keybinds(&config.keybinds);
    }

    /// Replace the `{key → tool name}` table.
    pub fn update_keybinds(&mut self, names: &HashMap<String, String>) {
        self.keybinds = KeybindMap::from_names(names);
        log::debug!("keybinds: {} bindings", self.keybinds.len());
    }

    pub fn store(&self) -> &AnnotationStore {
        self.state.store()
    }

    // ─── Image context ───────────────────────────────────────────────────

    /// Switch to `key`. The active tool's gesture is cancelled first, so an
    /// in-progress rectangle never leaks into the next image.
    pub fn set_current_image(&mut self, key: &str) {
        self.set_current_image_key(ImageKey::intern(key));
    }

    pub fn set_current_image_key(&mut self, key: ImageKey) {
        self.tools.get_mut(self.active).cancel(&mut self.state);
        log::debug!("image: {key}");
        self.state.set_current_image_key(key);
    }

    pub fn current_image(&self) -> Option<ImageKey> {
        self.state.current_image()
    }

    // ─── Annotations ─────────────────────────────────────────────────────

    pub fn add_annotation(&mut self, annotation: Annotation) -> bool {
        self.state.add_annotation(annotation)
    }

    pub fn remove_annotation(&mut self, id: AnnotationId) -> bool {
        self.state.remove_annotation(id).is_some()
    }

    pub fn annotations(&self) -> Option<&ImageAnnotations> {
        self.state.annotations()
    }

    /// Insert detector results into the current image. Boxes with zero area,
    /// non-finite coordinates or a score under `min_score` are skipped.
    /// Returns how many annotations were added.
    pub fn add_detections(&mut self, detections: &[Detection], min_score: Option<f32>) -> usize {
        let threshold = min_score.unwrap_or(f32::NEG_INFINITY);
        let mut added = 0;
        for detection in detections {
            if detection.score < threshold {
                continue;
            }
            let Some(annotation) = detection.to_annotation() else {
                log::trace!("detections: skipped box {:?}", detection.bbox);
                continue;
            };
            if !self.state.add_annotation(annotation) {
                break;
            }
            added += 1;
        }
        log::debug!("detections: added {added} of {}", detections.len());
        added
    }

    // ─── Selection ───────────────────────────────────────────────────────

    pub fn select_annotations(&mut self, ids: &[AnnotationId]) {
        self.state.select_annotations(ids);
    }

    pub fn selection(&self) -> &[AnnotationId] {
        self.state.selection()
    }

    /// Remove every selected annotation. Returns how many were removed.
    pub fn delete_selected(&mut self) -> usize {
        let selected = self.state.selection().to_vec();
        selected
            .into_iter()
            .filter(|id| self.state.remove_annotation(*id).is_some())
            .count()
    }

    // ─── Tools ───────────────────────────────────────────────────────────

    pub fn active_tool(&self) -> ToolKind {
        self.active
    }

    /// Activate `kind`. The outgoing tool cancels its gesture first.
    /// Re-selecting the active tool does nothing.
    pub fn set_current_tool(&mut self, kind: ToolKind) {
        if kind == self.active {
            return;
        }
        self.tools.get_mut(self.active).cancel(&mut self.state);
        log::debug!("tool: {} -> {}", self.active.name(), kind.name());
        self.active = kind;
        self.tools.get_mut(kind).on_tool_selected(&mut self.state);
        self.state.emit(EngineEvent::ToolChanged { tool: kind });
    }

    /// Activate a tool by display name (case-insensitive).
    pub fn set_current_tool_by_name(&mut self, name: &str) -> bool {
        match ToolKind::from_name(name) {
            Some(kind) => {
                self.set_current_tool(kind);
                true
            }
            None => false,
        }
    }

    /// Every tool in toolbar order with its bound key.
    pub fn tools(&self) -> Vec<ToolInfo> {
        ToolKind::ALL
            .into_iter()
            .map(|kind| ToolInfo {
                kind,
                name: kind.name(),
                key: self.keybinds.key_for(kind).map(str::to_string),
            })
            .collect()
    }

    /// Sources picked by the Associator, waiting for a target click.
    pub fn pending_associations(&self) -> &[AnnotationId] {
        self.tools.associator.pending()
    }

    /// The Rectangle tool's in-progress annotation.
    pub fn drawing(&self) -> Option<AnnotationId> {
        self.tools.rectangle.drawing()
    }

    fn active_mut(&mut self) -> (&mut dyn Tool, &mut EditorState) {
        (self.tools.get_mut(self.active), &mut self.state)
    }

    // ─── Input dispatch ──────────────────────────────────────────────────

    pub fn handle_mouse_down(&mut self, button: MouseButton, pos: Point, rect: CanvasRect) {
        let (tool, state) = self.active_mut();
        tool.on_mouse_down(state, button, pos, rect);
    }

    pub fn handle_mouse_up(&mut self, button: MouseButton, pos: Point, rect: CanvasRect) {
        let (tool, state) = self.active_mut();
        tool.on_mouse_up(state, button, pos, rect);
    }

    pub fn handle_mouse_move(&mut self, pos: Point, rect: CanvasRect) {
        let (tool, state) = self.active_mut();
        tool.on_mouse_move(state, pos, rect);
    }

    pub fn handle_scroll(&mut self, delta_y: f32, pos: Point, rect: CanvasRect) {
        let (tool, state) = self.active_mut();
        tool.on_scroll(state, delta_y, pos, rect);
    }

    /// A bound key switches tools before the key reaches the (new) active
    /// tool. Chords with Ctrl/⌘ are left to the host and never switch.
    pub fn handle_key_down(&mut self, key: &KeyEvent) {
        if !key.modifiers.command() {
            if let Some(kind) = self.keybinds.resolve(&key.key) {
                self.set_current_tool(kind);
            }
        }
        let (tool, state) = self.active_mut();
        tool.on_key_down(state, key);
    }

    pub fn handle_key_up(&mut self, key: &KeyEvent) {
        let (tool, state) = self.active_mut();
        tool.on_key_up(state, key);
    }

    pub fn handle_mouse_leave(&mut self) {
        let (tool, state) = self.active_mut();
        tool.on_mouse_leave(state);
    }

    // ─── Classes ─────────────────────────────────────────────────────────

    pub fn current_class(&self) -> &str {
        self.state.current_class()
    }

    pub fn set_current_class(&mut self, name: &str) -> bool {
        self.state.set_current_class(name)
    }

    pub fn palette(&self) -> &ClassPalette {
        self.state.palette()
    }

    // ─── Viewport ────────────────────────────────────────────────────────

    pub fn viewport(&self) -> Viewport {
        self.state.viewport()
    }

    pub fn set_viewport(&mut self, viewport: Viewport) -> bool {
        self.state.set_viewport(viewport)
    }

    pub fn reset_viewport(&mut self) {
        self.state.set_viewport(Viewport::default());
    }

    // ─── Output ──────────────────────────────────────────────────────────

    pub fn snapshot(&self) -> RenderSnapshot {
        RenderSnapshot::capture(
            &self.state,
            self.active,
            self.pending_associations(),
            self.drawing(),
        )
    }

    pub fn take_events(&mut self) -> Vec<EngineEvent> {
        self.state.take_events()
    }

    pub fn revision(&self) -> u64 {
        self.state.revision()
    }

    /// Export manifest for `scope`. A rectangle that is still being drawn
    /// is left out.
    pub fn export_manifest(
        &self,
        scope: ExportScope,
        sizes: &HashMap<ImageKey, ImageSize>,
    ) -> ExportManifest {
        let mut manifest = ExportManifest::build(self.store(), self.palette(), sizes, scope);
        if let Some(drawing) = self.drawing() {
            for image in &mut manifest.images {
                image.annotations.retain(|a| a.record.id != drawing);
            }
        }
        manifest
    }
}

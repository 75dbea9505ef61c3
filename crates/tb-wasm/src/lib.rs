//! WASM bridge for Tagbox: exposes the annotation engine to JavaScript.
//!
//! Compiled via `wasm-pack build --target web`. The page owns the canvas,
//! image decoding and the detector; it forwards DOM events here and redraws
//! from `snapshot_json()` whenever a handler reports a change. Draining
//! `take_events_json()` is optional; undrained events collapse to the
//! latest per kind.
//!
//! Fallible calls answer with `{"ok":true,…}` or `{"ok":false,"error":"…"}`.

use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::fmt::Display;
use tb_core::config::ProjectConfig;
use tb_core::detect::parse_detections;
use tb_core::export::{ExportManifest, ExportScope, ImageSize};
use tb_core::id::{AnnotationId, ImageKey};
use tb_core::transform::{CanvasRect, Point, Viewport};
use tb_editor::ToolSystem;
use tb_editor::input::{KeyEvent, Modifiers, MouseButton};
use tb_editor::tools::ToolKind;
use wasm_bindgen::prelude::*;

/// The canvas controller handed to JavaScript.
#[wasm_bindgen]
pub struct TbCanvas {
    engine: ToolSystem,
    /// Decoded image dimensions, reported by the page for export clipping.
    image_sizes: HashMap<ImageKey, ImageSize>,
}

impl Default for TbCanvas {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl TbCanvas {
    /// Create a controller with the stock configuration.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        console_error_panic_hook_setup();
        Self {
            engine: ToolSystem::default(),
            image_sizes: HashMap::new(),
        }
    }

    /// Apply a project configuration (classes + keybinds).
    pub fn set_config_json(&mut self, json: &str) -> String {
        match ProjectConfig::from_json(json) {
            Ok(config) => {
                self.engine.apply_config(&config);
                ok_json()
            }
            Err(e) => {
                log::warn!("config rejected: {e}");
                error_json(e)
            }
        }
    }

    // ─── Image context ───────────────────────────────────────────────────

    pub fn set_current_image(&mut self, key: &str) {
        self.engine.set_current_image(key);
    }

    pub fn set_image_size(&mut self, key: &str, width: u32, height: u32) {
        self.image_sizes
            .insert(ImageKey::intern(key), ImageSize { width, height });
    }

    pub fn current_image(&self) -> Option<String> {
        self.engine.current_image().map(|k| k.as_str().to_string())
    }

    // ─── Pointer & keyboard ──────────────────────────────────────────────
    //
    // Every handler takes the pointer position plus the canvas'
    // `getBoundingClientRect()` and returns `true` when something changed.

    #[allow(clippy::too_many_arguments)]
    pub fn handle_mouse_down(
        &mut self,
        button: i16,
        x: f32,
        y: f32,
        left: f32,
        top: f32,
        width: f32,
        height: f32,
    ) -> bool {
        let Some(button) = MouseButton::from_id(button) else {
            return false;
        };
        let rect = CanvasRect::new(left, top, width, height);
        let revision = self.engine.revision();
        self.engine.handle_mouse_down(button, Point::new(x, y), rect);
        self.changed_since(revision)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn handle_mouse_up(
        &mut self,
        button: i16,
        x: f32,
        y: f32,
        left: f32,
        top: f32,
        width: f32,
        height: f32,
    ) -> bool {
        let Some(button) = MouseButton::from_id(button) else {
            return false;
        };
        let rect = CanvasRect::new(left, top, width, height);
        let revision = self.engine.revision();
        self.engine.handle_mouse_up(button, Point::new(x, y), rect);
        self.changed_since(revision)
    }

    pub fn handle_mouse_move(
        &mut self,
        x: f32,
        y: f32,
        left: f32,
        top: f32,
        width: f32,
        height: f32,
    ) -> bool {
        let rect = CanvasRect::new(left, top, width, height);
        let revision = self.engine.revision();
        self.engine.handle_mouse_move(Point::new(x, y), rect);
        self.changed_since(revision)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn handle_scroll(
        &mut self,
        delta_y: f32,
        x: f32,
        y: f32,
        left: f32,
        top: f32,
        width: f32,
        height: f32,
    ) -> bool {
        let rect = CanvasRect::new(left, top, width, height);
        let revision = self.engine.revision();
        self.engine.handle_scroll(delta_y, Point::new(x, y), rect);
        self.changed_since(revision)
    }

    pub fn handle_mouse_leave(&mut self) -> bool {
        let revision = self.engine.revision();
        self.engine.handle_mouse_leave();
        self.changed_since(revision)
    }

    pub fn handle_key_down(
        &mut self,
        key: &str,
        ctrl: bool,
        shift: bool,
        alt: bool,
        meta: bool,
    ) -> bool {
        let event = KeyEvent::with_modifiers(
            key,
            Modifiers {
                shift,
                ctrl,
                alt,
                meta,
            },
        );
        let revision = self.engine.revision();
        self.engine.handle_key_down(&event);
        self.changed_since(revision)
    }

    pub fn handle_key_up(&mut self, key: &str) -> bool {
        let revision = self.engine.revision();
        self.engine.handle_key_up(&KeyEvent::new(key));
        self.changed_since(revision)
    }

    // ─── Tools ───────────────────────────────────────────────────────────

    /// Switch tool by name. Returns `false` for unknown names.
    pub fn set_tool(&mut self, name: &str) -> bool {
        self.engine.set_current_tool_by_name(name)
    }

    pub fn get_tool_name(&self) -> String {
        self.engine.active_tool().name().to_string()
    }

    /// Toolbar entries: `[{"kind","name","key"}]`.
    pub fn tools_json(&self) -> String {
        to_json_or_error(&self.engine.tools())
    }

    pub fn set_current_class(&mut self, name: &str) -> bool {
        self.engine.set_current_class(name)
    }

    pub fn current_class(&self) -> String {
        self.engine.current_class().to_string()
    }

    // ─── Selection & annotations ─────────────────────────────────────────

    /// Replace the selection from a JSON array of annotation ids. Unknown
    /// ids are ignored.
    pub fn select_ids(&mut self, json: &str) -> String {
        let raw: Vec<String> = match serde_json::from_str(json) {
            Ok(ids) => ids,
            Err(e) => return error_json(e),
        };
        let ids: Vec<AnnotationId> = raw
            .iter()
            .filter_map(|s| AnnotationId::lookup(s))
            .collect();
        self.engine.select_annotations(&ids);
        json!({ "ok": true, "selected": self.engine.selection().len() }).to_string()
    }

    pub fn get_selected_ids(&self) -> String {
        to_json_or_error(&self.engine.selection())
    }

    /// Delete every selected annotation. Returns how many were removed.
    pub fn delete_selected(&mut self) -> usize {
        self.engine.delete_selected()
    }

    /// Add detector output (`[{bbox:[x,y,w,h], class, score?}]`) to the
    /// current image. Pass a negative `min_score` to keep everything.
    pub fn import_detections_json(&mut self, json: &str, min_score: f32) -> String {
        let detections = match parse_detections(json) {
            Ok(d) => d,
            Err(e) => return error_json(e),
        };
        if self.engine.current_image().is_none() {
            return error_json("no current image");
        }
        let threshold = (min_score >= 0.0).then_some(min_score);
        let added = self.engine.add_detections(&detections, threshold);
        json!({ "ok": true, "added": added }).to_string()
    }

    // ─── Viewport ────────────────────────────────────────────────────────

    pub fn set_viewport(&mut self, x: f32, y: f32, scale: f32) -> bool {
        self.engine.set_viewport(Viewport::new(x, y, scale))
    }

    pub fn reset_viewport(&mut self) {
        self.engine.reset_viewport();
    }

    // ─── Output ──────────────────────────────────────────────────────────

    /// Everything the renderer needs for one frame.
    pub fn snapshot_json(&self) -> String {
        to_json_or_error(&self.engine.snapshot())
    }

    /// Drain queued change notifications as a JSON array.
    pub fn take_events_json(&mut self) -> String {
        to_json_or_error(&self.engine.take_events())
    }

    /// Export manifest as JSON. `image` limits it to one image; `None`
    /// exports every image with annotations.
    pub fn export_json(&self, image: Option<String>) -> String {
        match self.manifest(image.as_deref()).to_json() {
            Ok(json) => json,
            Err(e) => error_json(e),
        }
    }

    /// Export manifest as MessagePack bytes.
    pub fn export_msgpack(&self, image: Option<String>) -> Result<js_sys::Uint8Array, JsValue> {
        let bytes = self
            .manifest(image.as_deref())
            .to_msgpack()
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(js_sys::Uint8Array::from(bytes.as_slice()))
    }
}

impl TbCanvas {
    fn changed_since(&self, revision: u64) -> bool {
        self.engine.revision() != revision
    }

    fn manifest(&self, image: Option<&str>) -> ExportManifest {
        let scope = match image {
            Some(key) => ExportScope::Image(ImageKey::intern(key)),
            None => ExportScope::All,
        };
        self.engine.export_manifest(scope, &self.image_sizes)
    }
}

// ─── JSON helpers ────────────────────────────────────────────────────────

fn ok_json() -> String {
    r#"{"ok":true}"#.to_string()
}

fn error_json(e: impl Display) -> String {
    json!({ "ok": false, "error": e.to_string() }).to_string()
}

fn to_json_or_error<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| error_json(format!("Serialization error: {e}")))
}

// ─── Panic hook for WASM debugging ───────────────────────────────────────

fn console_error_panic_hook_setup() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static SET_HOOK: Once = Once::new();
        SET_HOOK.call_once(|| {
            std::panic::set_hook(Box::new(|info| {
                let msg = format!("Tagbox WASM panic: {info}");
                web_sys::console::error_1(&msg.into());
            }));
        });
    }
}

// ─── Standalone functions (no canvas needed) ─────────────────────────────

/// Validate a project configuration. Returns `{"ok":true,"classes":n}` or
/// `{"ok":false,"error":"..."}`.
#[wasm_bindgen]
pub fn validate_config(json: &str) -> String {
    match ProjectConfig::from_json(json) {
        Ok(config) => {
            let unknown: Vec<&str> = config
                .keybinds
                .values()
                .map(String::as_str)
                .filter(|name| ToolKind::from_name(name).is_none())
                .collect();
            json!({
                "ok": true,
                "classes": config.classes.len(),
                "unknownTools": unknown,
            })
            .to_string()
        }
        Err(e) => error_json(e),
    }
}

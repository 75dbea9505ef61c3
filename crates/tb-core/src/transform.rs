//! Screen ↔ world coordinate transform and axis-aligned hit testing.
//!
//! World space is the pixel grid of the loaded image. Screen space is the
//! pointer position reported by the host, in the same units as the canvas'
//! on-screen bounding rectangle. The viewport maps one to the other:
//!
//! ```text
//! screen = (world + offset) * scale + canvas_origin
//! ```
//!
//! Everything here is pure; the engine owns the only mutable `Viewport`.

use serde::{Deserialize, Serialize};

// ─── Points & rectangles ─────────────────────────────────────────────────

/// A 2D point. Used for both screen and world positions; which one is
/// meant is always clear from the function it's passed to.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Two opposite corners of an axis-aligned rectangle, in drawing order.
///
/// Corners are kept exactly as the user placed them; consumers normalize
/// with [`Bounds::normalized`] when they need min/max.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bounds(pub [Point; 2]);

impl Bounds {
    pub const fn new(p0: Point, p1: Point) -> Self {
        Self([p0, p1])
    }

    /// Zero-area bounds with both corners on `p` (start of a draw).
    pub const fn at(p: Point) -> Self {
        Self([p, p])
    }

    pub fn start(&self) -> Point {
        self.0[0]
    }

    pub fn end(&self) -> Point {
        self.0[1]
    }

    pub fn set_end(&mut self, p: Point) {
        self.0[1] = p;
    }

    /// Corners swapped. Describes the same rectangle.
    pub fn reversed(&self) -> Self {
        Self([self.0[1], self.0[0]])
    }

    pub fn normalized(&self) -> Rect {
        let [a, b] = self.0;
        Rect {
            min_x: a.x.min(b.x),
            min_y: a.y.min(b.y),
            max_x: a.x.max(b.x),
            max_y: a.y.max(b.y),
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.normalized().is_degenerate()
    }

    pub fn contains(&self, p: Point) -> bool {
        point_in_bounds(p, self)
    }
}

/// Normalized axis-aligned rectangle (`min <= max` on both axes).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Rect {
    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }

    /// Closed containment: points on the edge are inside.
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min_x && p.x <= self.max_x && p.y >= self.min_y && p.y <= self.max_y
    }

    pub fn is_degenerate(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }
}

/// The canvas element's on-screen bounding rectangle (like a DOMRect).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CanvasRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl CanvasRect {
    pub const fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }
}

// ─── Viewport ────────────────────────────────────────────────────────────

/// Zoom bounds and per-tick factor for the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomLimits {
    pub min_scale: f32,
    pub max_scale: f32,
    /// Geometric step applied per scroll tick (scale is multiplied or
    /// divided by this).
    pub step: f32,
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self {
            min_scale: 0.05,
            max_scale: 10.0,
            step: 1.1,
        }
    }
}

impl ZoomLimits {
    pub fn clamp(&self, scale: f32) -> f32 {
        scale.clamp(self.min_scale, self.max_scale)
    }
}

/// Pan offset (world units) and zoom scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub scale: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            scale: 1.0,
        }
    }
}

impl Viewport {
    pub const fn new(x: f32, y: f32, scale: f32) -> Self {
        Self { x, y, scale }
    }

    /// Pan by a screen-space pointer delta. The delta is divided by the
    /// current scale so content tracks the pointer at any zoom.
    pub fn panned_by(&self, dx: f32, dy: f32) -> Self {
        Self {
            x: self.x + dx / self.scale,
            y: self.y + dy / self.scale,
            scale: self.scale,
        }
    }

    /// Apply one scroll tick of zoom anchored at `cursor`.
    ///
    /// Negative `delta_y` (wheel up) zooms in, positive zooms out, zero is a
    /// no-op. The offset is re-solved so the world point under the cursor
    /// stays under the cursor.
    pub fn zoomed_at(
        &self,
        delta_y: f32,
        cursor: Point,
        rect: CanvasRect,
        limits: &ZoomLimits,
    ) -> Self {
        if delta_y == 0.0 || !delta_y.is_finite() {
            return *self;
        }
        let target = if delta_y < 0.0 {
            self.scale * limits.step
        } else {
            self.scale / limits.step
        };
        self.with_scale_at(limits.clamp(target), cursor, rect)
    }

    /// Set the scale to `new_scale`, keeping the world point under `cursor`
    /// fixed on screen.
    pub fn with_scale_at(&self, new_scale: f32, cursor: Point, rect: CanvasRect) -> Self {
        let anchor = screen_to_world(cursor, self, rect);
        let px = cursor.x - rect.left;
        let py = cursor.y - rect.top;
        Self {
            x: px / new_scale - anchor.x,
            y: py / new_scale - anchor.y,
            scale: new_scale,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.scale.is_finite() && self.scale > 0.0
    }
}

// ─── Transform functions ─────────────────────────────────────────────────

/// Map a pointer position to world space.
pub fn screen_to_world(p: Point, viewport: &Viewport, rect: CanvasRect) -> Point {
    Point {
        x: (p.x - rect.left) / viewport.scale - viewport.x,
        y: (p.y - rect.top) / viewport.scale - viewport.y,
    }
}

/// Map a world position to screen space. Inverse of [`screen_to_world`].
pub fn world_to_screen(w: Point, viewport: &Viewport, rect: CanvasRect) -> Point {
    Point {
        x: (w.x + viewport.x) * viewport.scale + rect.left,
        y: (w.y + viewport.y) * viewport.scale + rect.top,
    }
}

/// Closed-rectangle hit test against two unordered corners. This is the
/// only hit test the tools use.
pub fn point_in_bounds(point: Point, bounds: &Bounds) -> bool {
    bounds.normalized().contains(point)
}

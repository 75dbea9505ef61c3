//! Annotation data model.
//!
//! An annotation is a labeled rectangle over one image plus a set of
//! association edges to other annotations on the same image. Edges are
//! stored as ids on both endpoints; the store keeps the two halves in step
//! and scrubs them on delete.

use crate::id::AnnotationId;
use crate::transform::{Bounds, Point, Rect};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

// ─── Colors ──────────────────────────────────────────────────────────────

/// RGBA color. Stored as 4 × f32 [0.0, 1.0].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

fn hex_val(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl Color {
    pub const RED: Color = Color::rgba(1.0, 0.0, 0.0, 1.0);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Parse `#RGB`, `#RGBA`, `#RRGGBB` or `#RRGGBBAA` (leading `#` optional).
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        let bytes = hex.as_bytes();

        let short = |i: usize| hex_val(bytes[i]).map(|v| (v * 17) as f32 / 255.0);
        let long = |i: usize| {
            let hi = hex_val(bytes[i])?;
            let lo = hex_val(bytes[i + 1])?;
            Some((hi << 4 | lo) as f32 / 255.0)
        };

        match bytes.len() {
            3 => Some(Self::rgba(short(0)?, short(1)?, short(2)?, 1.0)),
            4 => Some(Self::rgba(short(0)?, short(1)?, short(2)?, short(3)?)),
            6 => Some(Self::rgba(long(0)?, long(2)?, long(4)?, 1.0)),
            8 => Some(Self::rgba(long(0)?, long(2)?, long(4)?, long(6)?)),
            _ => None,
        }
    }

    /// `#RRGGBB`, or `#RRGGBBAA` when not fully opaque.
    pub fn to_hex(&self) -> String {
        let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        let (r, g, b, a) = (channel(self.r), channel(self.g), channel(self.b), channel(self.a));
        if a == 255 {
            format!("#{r:02X}{g:02X}{b:02X}")
        } else {
            format!("#{r:02X}{g:02X}{b:02X}{a:02X}")
        }
    }
}

// ─── Annotation ──────────────────────────────────────────────────────────

/// Shape discriminator. Only rectangles exist today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationKind {
    #[default]
    Rectangle,
}

impl AnnotationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnnotationKind::Rectangle => "rectangle",
        }
    }
}

/// Association edges of one annotation. Most annotations link to a
/// handful of others, so the ids stay inline.
pub type Associations = SmallVec<[AnnotationId; 4]>;

/// One labeled region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    id: AnnotationId,
    #[serde(rename = "type")]
    pub kind: AnnotationKind,
    /// Class label; the color is resolved from the class palette.
    pub name: String,
    pub bounds: Bounds,
    #[serde(default)]
    pub associations: Associations,
}

impl Annotation {
    /// Create an annotation with a freshly generated id.
    pub fn new(kind: AnnotationKind, name: impl Into<String>, bounds: Bounds) -> Self {
        Self {
            id: AnnotationId::generate(),
            kind,
            name: name.into(),
            bounds,
            associations: SmallVec::new(),
        }
    }

    pub fn rectangle(name: impl Into<String>, p0: Point, p1: Point) -> Self {
        Self::new(AnnotationKind::Rectangle, name, Bounds::new(p0, p1))
    }

    pub fn id(&self) -> AnnotationId {
        self.id
    }

    pub fn rect(&self) -> Rect {
        self.bounds.normalized()
    }

    pub fn contains(&self, p: Point) -> bool {
        self.bounds.contains(p)
    }

    /// Add a one-way edge to `other`. Idempotent; self-edges are ignored.
    /// Returns `true` if the edge was new.
    pub fn add_association(&mut self, other: AnnotationId) -> bool {
        if other == self.id || self.associations.contains(&other) {
            return false;
        }
        self.associations.push(other);
        true
    }

    /// Drop the edge to `other`. Idempotent. Returns `true` if it existed.
    pub fn remove_association(&mut self, other: AnnotationId) -> bool {
        let before = self.associations.len();
        self.associations.retain(|id| *id != other);
        self.associations.len() != before
    }

    pub fn is_associated_with(&self, other: AnnotationId) -> bool {
        self.associations.contains(&other)
    }

    /// Serializable record used by export. `color` is the resolved class
    /// color as hex.
    pub fn save(&self, color: Color) -> AnnotationRecord {
        AnnotationRecord {
            id: self.id,
            kind: self.kind,
            name: self.name.clone(),
            color: color.to_hex(),
            bounds: self.bounds,
            associations: self.associations.to_vec(),
        }
    }
}

/// Flat, serializable form of an annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    pub id: AnnotationId,
    #[serde(rename = "type")]
    pub kind: AnnotationKind,
    pub name: String,
    pub color: String,
    pub bounds: Bounds,
    pub associations: Vec<AnnotationId>,
}

//! Export manifest: the read-only view of the store handed to the archive
//! exporter.
//!
//! For every annotation the manifest carries its saved record plus the
//! integer pixel rectangle to crop. Cropping and archiving happen in the
//! host; the manifest is serialized as JSON or MessagePack.

use crate::config::ClassPalette;
use crate::id::{AnnotationId, ImageKey};
use crate::model::{Annotation, AnnotationRecord};
use crate::store::{AnnotationStore, ImageAnnotations};
use crate::transform::Rect;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

pub const MANIFEST_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("MessagePack encode error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("MessagePack decode error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
}

/// Pixel dimensions of a decoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

/// Integer crop rectangle in image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    /// Pixel rectangle covering `rect` (outward rounding), clipped to the
    /// image when its size is known. `None` if nothing is left.
    pub fn covering(rect: Rect, size: Option<ImageSize>) -> Option<Self> {
        let (max_w, max_h) = size
            .map(|s| (s.width as f32, s.height as f32))
            .unwrap_or((f32::MAX, f32::MAX));
        let x0 = rect.min_x.floor().clamp(0.0, max_w);
        let y0 = rect.min_y.floor().clamp(0.0, max_h);
        let x1 = rect.max_x.ceil().clamp(0.0, max_w);
        let y1 = rect.max_y.ceil().clamp(0.0, max_h);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(Self {
            x: x0 as u32,
            y: y0 as u32,
            width: (x1 - x0) as u32,
            height: (y1 - y0) as u32,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedAnnotation {
    pub record: AnnotationRecord,
    /// `None` when the annotation lies entirely outside the image.
    pub crop: Option<CropRect>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedImage {
    pub image: ImageKey,
    pub size: Option<ImageSize>,
    pub annotations: Vec<ExportedAnnotation>,
    /// Connected groups of associated annotations.
    pub groups: Vec<Vec<AnnotationId>>,
}

/// Which part of the store to export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportScope {
    Image(ImageKey),
    All,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportManifest {
    pub version: u32,
    pub images: Vec<ExportedImage>,
}

impl ExportManifest {
    /// Build a manifest. `All` skips images without annotations; `Image`
    /// always yields that image (empty if it was never opened).
    pub fn build(
        store: &AnnotationStore,
        palette: &ClassPalette,
        sizes: &HashMap<ImageKey, ImageSize>,
        scope: ExportScope,
    ) -> Self {
        let images = match scope {
            ExportScope::Image(key) => {
                let empty = ImageAnnotations::new();
                let anns = store.image(key).unwrap_or(&empty);
                vec![export_image(key, anns, palette, sizes.get(&key).copied())]
            }
            ExportScope::All => store
                .images()
                .filter(|(_, anns)| !anns.is_empty())
                .map(|(key, anns)| export_image(key, anns, palette, sizes.get(&key).copied()))
                .collect(),
        };
        log::debug!(
            "export: {} images, {} annotations",
            images.len(),
            images.iter().map(|i| i.annotations.len()).sum::<usize>()
        );
        Self {
            version: MANIFEST_VERSION,
            images,
        }
    }

    pub fn annotation_count(&self) -> usize {
        self.images.iter().map(|i| i.annotations.len()).sum()
    }

    pub fn to_json(&self) -> Result<String, ExportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_msgpack(&self) -> Result<Vec<u8>, ExportError> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    pub fn from_msgpack(bytes: &[u8]) -> Result<Self, ExportError> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

fn export_image(
    key: ImageKey,
    anns: &ImageAnnotations,
    palette: &ClassPalette,
    size: Option<ImageSize>,
) -> ExportedImage {
    ExportedImage {
        image: key,
        size,
        annotations: anns
            .iter()
            .map(|a| export_annotation(a, palette, size))
            .collect(),
        groups: anns.association_groups(),
    }
}

fn export_annotation(
    annotation: &Annotation,
    palette: &ClassPalette,
    size: Option<ImageSize>,
) -> ExportedAnnotation {
    ExportedAnnotation {
        record: annotation.save(palette.color_of(&annotation.name)),
        crop: CropRect::covering(annotation.rect(), size),
    }
}

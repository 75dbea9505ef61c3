//! Read-only view of the engine for the renderer.
//!
//! A snapshot carries everything needed to draw one frame: the viewport,
//! the current image's annotations with their normalized rectangles and
//! resolved colors, and the transient tool state worth highlighting.

use crate::engine::EditorState;
use crate::tools::ToolKind;
use serde::Serialize;
use tb_core::id::{AnnotationId, ImageKey};
use tb_core::transform::{Rect, Viewport};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotAnnotation {
    pub id: AnnotationId,
    pub name: String,
    /// Class color as `#RRGGBB[AA]`.
    pub color: String,
    /// World-space rectangle, min/max normalized.
    pub rect: Rect,
    pub associations: Vec<AnnotationId>,
    pub selected: bool,
    /// Picked as an Associator source.
    pub pending: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderSnapshot {
    pub image: Option<ImageKey>,
    pub viewport: Viewport,
    pub tool: ToolKind,
    pub annotations: Vec<SnapshotAnnotation>,
    pub selection: Vec<AnnotationId>,
    pub pending: Vec<AnnotationId>,
    /// In-progress rectangle, drawn as a preview.
    pub drawing: Option<AnnotationId>,
}

impl RenderSnapshot {
    pub fn capture(
        state: &EditorState,
        tool: ToolKind,
        pending: &[AnnotationId],
        drawing: Option<AnnotationId>,
    ) -> Self {
        let selection = state.selection();
        let annotations = state
            .annotations()
            .map(|anns| {
                anns.iter()
                    .map(|a| SnapshotAnnotation {
                        id: a.id(),
                        name: a.name.clone(),
                        color: state.palette().color_of(&a.name).to_hex(),
                        rect: a.rect(),
                        associations: a.associations.to_vec(),
                        selected: selection.contains(&a.id()),
                        pending: pending.contains(&a.id()),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            image: state.current_image(),
            viewport: state.viewport(),
            tool,
            annotations,
            selection: selection.to_vec(),
            pending: pending.to_vec(),
            drawing,
        }
    }

    pub fn annotation(&self, id: AnnotationId) -> Option<&SnapshotAnnotation> {
        self.annotations.iter().find(|a| a.id == id)
    }
}

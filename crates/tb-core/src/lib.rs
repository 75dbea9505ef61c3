pub mod config;
pub mod detect;
pub mod export;
pub mod id;
pub mod model;
pub mod store;
pub mod transform;

pub use config::{ClassPalette, ConfigError, ProjectConfig};
pub use detect::Detection;
pub use export::{ExportError, ExportManifest, ExportScope, ImageSize};
pub use id::{AnnotationId, ImageKey};
pub use model::*;
pub use store::{AnnotationStore, ImageAnnotations};
pub use transform::{
    Bounds, CanvasRect, Point, Rect, Viewport, ZoomLimits, point_in_bounds, screen_to_world,
    world_to_screen,
};

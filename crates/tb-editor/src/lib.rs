pub mod engine;
pub mod input;
pub mod keybinds;
pub mod snapshot;
pub mod tools;

pub use engine::{EditorState, EngineEvent, ToolInfo, ToolSystem};
pub use input::{KeyEvent, Modifiers, MouseButton};
pub use keybinds::KeybindMap;
pub use snapshot::{RenderSnapshot, SnapshotAnnotation};
pub use tools::{Tool, ToolKind, ToolSet};

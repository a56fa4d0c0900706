//! Slate Scene Library
//!
//! Retained scene graph and interaction layer for the Slate canvas engine:
//! scene sync against store snapshots, the node pool, the four drawing
//! surfaces with per-frame redraw coalescing, the text overlay bridge, the
//! selection transform widget, and the per-canvas engine context object.

pub mod engine;
pub mod input;
pub mod node;
pub mod pool;
pub mod surface;
pub mod sync;
pub mod text_bridge;
pub mod transform;

pub use engine::{CanvasEngine, HIT_TOLERANCE};
pub use input::{ClickTracker, Modifiers, PointerButton};
pub use node::{NodeKind, NodeTag, SceneNode};
pub use pool::{NodePool, PoolKind};
pub use surface::{FrameScheduler, Surface};
pub use sync::{SceneSync, SyncStats};
pub use text_bridge::{SizeConstraints, TextCommit, TextOverlayBridge, COMMIT_GUARD, TEXT_PADDING};
pub use transform::{
    Corner, Handle, TransformController, TransformHandle, HANDLE_HIT_TOLERANCE, HANDLE_SIZE,
};

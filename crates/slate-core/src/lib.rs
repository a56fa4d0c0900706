//! Slate Core Library
//!
//! Serializable data model and state for the Slate canvas engine: elements,
//! edges, the element store with undo history, spatial index, viewport and
//! connector engine. Everything here is plain data plus synchronous logic;
//! rendering and interaction live in `slate-scene`.

pub mod connect;
pub mod edge;
pub mod element;
pub mod selection;
pub mod spatial;
pub mod store;
pub mod viewport;

pub use connect::{ConnectorDraft, ConnectorEngine, DraftCommit, SNAP_RADIUS, UNSNAP_FACTOR};
pub use edge::{Anchor, AnchorRef, Edge, EdgeEnd, EdgeId};
pub use element::{
    Element, ElementId, ElementPatch, ElementStyle, GroupId, Rgba,
};
pub use selection::Selection;
pub use spatial::SpatialIndex;
pub use store::{
    Document, ElementStore, ElementUpdate, Snapshot, StoreError, UpdateOptions, MAX_HISTORY,
};
pub use viewport::{Viewport, MAX_SCALE, MIN_SCALE};

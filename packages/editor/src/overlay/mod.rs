//! # Direct-Manipulation Overlay
//!
//! Interactive layers composed over the rendered document:
//!
//! - `floating`: session-only images (drag, resize, rotate)
//! - `handles`: resize handles for the focused text region
//! - `marquee`: rectangle selection of editable regions
//! - `clipboard`: copy / paste / delete of structural elements
//! - `gesture`: the single active pointer gesture
//!
//! Layout is never computed here; boxes come from a `LayoutProvider`.

pub mod clipboard;
pub mod floating;
pub mod geometry;
pub mod gesture;
pub mod handles;
pub mod layout;
pub mod marquee;

pub use clipboard::{clean_options, ElementClipboard, SELECTED_MARKER};
pub use floating::{AspectMode, FloatingImage, FloatingImageId, FloatingLayer, MIN_IMAGE_SIZE};
pub use geometry::{Point, Rect, Size};
pub use gesture::{Gesture, GestureMachine, GestureOutcome, PointerTarget};
pub use handles::{commit_region_resize, handle_points, HandlePosition, ResizePreview};
pub use layout::{LayoutProvider, StaticLayout};
pub use marquee::marquee_hits;

//! # Vellum Editor
//!
//! In-canvas editing engine for HTML visual templates.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ parser: raw template → Template + live Dom  │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: EditSession                         │
//! │  - bindings: regions / charts / bars        │
//! │  - selection + formatting                   │
//! │  - overlay: images, handles, marquee,       │
//! │    element clipboard, gestures              │
//! │  - pipeline: sync → Snapshot → History      │
//! │  - debounced autosave to a KeyValueStore    │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ compiler-html: standalone template output   │
//! │ export: RenderTarget → host Exporter        │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Text is the source of truth**: chart arcs and bar spans are
//!    derived from the numbers a user types
//! 2. **Bindings are recomputed, never patched**: node identity does not
//!    survive a reparse, so discovery runs after every change
//! 3. **One commit path**: every change reaches history through the
//!    pipeline, as a whole snapshot
//! 4. **Races are no-ops**: stale ids and detached nodes never error
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vellum_editor::{EditSession, FormatOp, SessionConfig, ToggleFormat};
//!
//! let mut session = EditSession::open("report.html", &raw, SessionConfig::default());
//! session.set_selection(range);
//! session.apply_format(&FormatOp::Toggle { format: ToggleFormat::Bold });
//! session.undo();
//! let html = session.save_as_template(Default::default())?;
//! ```

pub mod bindings;
pub mod config;
pub mod debounce;
mod errors;
pub mod export;
pub mod formatting;
pub mod history;
pub mod overlay;
pub mod pipeline;
mod session;
pub mod selection;
pub mod storage;
pub mod style;
pub mod sync;

pub use bindings::{discover, BarBinding, Bindings, ChartBinding, EditableRegion, RegionId, RegionKind};
pub use config::SessionConfig;
pub use debounce::{Clock, Debouncer, ManualClock, SystemClock};
pub use errors::EditorError;
pub use export::{Background, ExportError, ExportOptions, ExportScale, Exporter, PlacedImage, RenderTarget};
pub use formatting::{
    CaseTransform, FontSizeChange, FormatLimits, FormatOp, FormatOutcome, FormatSummary, ToggleFormat, FONT_FAMILIES,
};
pub use history::{History, PushOutcome, Snapshot};
pub use pipeline::{CommitResult, Pipeline};
pub use selection::{SelectionState, TextPosition, TextRange};
pub use session::{Concern, EditSession, ExportJob, ExportKind, Notification, NotificationLevel};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
pub use style::{Alignment, ComputedStyle};
pub use sync::{ChartSyncReport, Derivation, SyncEngine};

// Re-export common types for convenience
pub use vellum_compiler_html::CompileOptions;
pub use vellum_parser::{Dom, NodeId, Template};

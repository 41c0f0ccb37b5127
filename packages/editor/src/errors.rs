//! Error types for the editor

use crate::export::ExportError;
use crate::storage::StorageError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Compile error: {0}")]
    Compile(#[from] vellum_compiler_html::CompileError),

    #[error("An export is already in progress")]
    ExportBusy,

    #[error("Style engine is not ready")]
    StyleEngineNotReady,

    #[error("Unknown color variable: {0}")]
    UnknownColorVariable(String),

    #[error("Invalid color value: {0}")]
    InvalidColor(String),

    #[error("No saved state to restore")]
    NoSavedState,
}

//! Error types for Flowmark operations.
//!
//! [`FlowmarkError`] is the library boundary error; each stage keeps its own
//! narrower error type and converts into it with `?`.

use std::io;

use thiserror::Error;

use flowmark_core::document::DocumentError;

use crate::{engine::EngineError, export::ExportError, host::FullscreenError, view::ClipboardError};

/// The main error type for Flowmark operations.
#[derive(Debug, Error)]
pub enum FlowmarkError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Clipboard error: {0}")]
    Clipboard(#[from] ClipboardError),

    #[error("Fullscreen error: {0}")]
    Fullscreen(#[from] FullscreenError),
}

impl From<EngineError> for FlowmarkError {
    fn from(error: EngineError) -> Self {
        Self::Render(error.to_string())
    }
}

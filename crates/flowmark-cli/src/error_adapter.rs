//! Error adapter for converting FlowmarkError to miette diagnostics.
//!
//! This module provides the bridge between the library's standard error types
//! and miette's rich diagnostic formatting used in the CLI.

use std::fmt;

use miette::Diagnostic as MietteDiagnostic;

use flowmark::FlowmarkError;

/// Adapter exposing a [`FlowmarkError`] as a miette diagnostic.
pub struct ErrorAdapter<'a>(pub &'a FlowmarkError);

impl fmt::Debug for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for ErrorAdapter<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl MietteDiagnostic for ErrorAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let code = match &self.0 {
            FlowmarkError::Io(_) => "flowmark::io",
            FlowmarkError::Config(_) => "flowmark::config",
            FlowmarkError::Render(_) => "flowmark::render",
            FlowmarkError::Document(_) => "flowmark::document",
            FlowmarkError::Export(_) => "flowmark::export",
            FlowmarkError::Clipboard(_) => "flowmark::clipboard",
            FlowmarkError::Fullscreen(_) => "flowmark::fullscreen",
        };
        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let help = match &self.0 {
            FlowmarkError::Render(_) => {
                "check that the drawing engine command in [render.engine] is installed"
            }
            FlowmarkError::Config(_) => "see the [render], [overlay] and [export] config tables",
            _ => return None,
        };
        Some(Box::new(help))
    }
}

/// Collect the reportable diagnostics for an error.
///
/// Library errors carry no source spans, so each error yields exactly one
/// reportable.
pub fn to_reportables(err: &FlowmarkError) -> Vec<ErrorAdapter<'_>> {
    vec![ErrorAdapter(err)]
}

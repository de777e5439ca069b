//! Text processing for Flowmark diagram sources.
//!
//! Three pure, total functions live here:
//!
//! - [`sanitize`] repairs label defects that commonly break AI-generated
//!   flowchart sources before they reach the drawing engine.
//! - [`extract_outline`] turns a source into a [`WorkflowOutline`] of
//!   sections and steps.
//! - [`summarize`] condenses a free-text description into a short synopsis.
//!
//! None of them fail: malformed input degrades to fewer repairs, fewer
//! steps, or an unchanged description.
//!
//! ```
//! use flowmark_parser::{extract_outline, sanitize};
//!
//! let source = "flowchart TD\n  a[Load: config]\n";
//! assert!(sanitize(source).contains(r#"a["Load: config"]"#));
//!
//! let outline = extract_outline(source);
//! assert_eq!(outline.step_count(), 1);
//! ```
//!
//! [`WorkflowOutline`]: flowmark_core::outline::WorkflowOutline

mod outline;
mod sanitize;
mod summary;

pub use outline::extract_outline;
pub use sanitize::sanitize;
pub use summary::summarize;

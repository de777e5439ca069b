//! Flowmark Core Types and Definitions
//!
//! This crate provides the foundational types shared by the Flowmark
//! crates. It includes:
//!
//! - **Outline**: Extracted workflow steps grouped into sections ([`outline`] module)
//! - **Status**: Per-step test-execution status and overlay inputs ([`status`] module)
//! - **Summary**: Condensed description summaries ([`summary`] module)
//! - **Theme**: Light/dark theme-variable tables ([`theme`] module)
//! - **Colors**: CSS color handling ([`color::Color`])
//! - **View**: Zoom, fullscreen and tab state ([`view`] module)
//! - **Document**: Mutable SVG element tree ([`document`] module)

pub mod color;
pub mod document;
pub mod outline;
pub mod status;
pub mod summary;
pub mod theme;
pub mod view;

//! Configuration types for Flowmark rendering, overlays and export.
//!
//! All types implement [`serde::Deserialize`] with every field defaulted, so a
//! partial (or empty) configuration file is always valid.
//!
//! # Overview
//!
//! - [`AppConfig`] - Top-level configuration combining the sections below.
//! - [`RenderConfig`] - Default theme and the drawing engine command.
//! - [`OverlayConfig`] - Identifier scheme used to join steps to rendered nodes.
//! - [`ExportConfig`] - Raster scale and the fallback surface size.
//!
//! # Example
//!
//! ```
//! # use flowmark::config::AppConfig;
//! let config = AppConfig::default();
//! assert_eq!(config.render().engine().command(), "mmdc");
//! assert_eq!(config.overlay().id_prefix(), "flowchart-");
//! ```

use serde::Deserialize;

use flowmark_core::theme::ThemeMode;

use crate::overlay::IdScheme;

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    render: RenderConfig,

    #[serde(default)]
    overlay: OverlayConfig,

    #[serde(default)]
    export: ExportConfig,
}

impl AppConfig {
    /// Creates a new [`AppConfig`] from its sections.
    pub fn new(render: RenderConfig, overlay: OverlayConfig, export: ExportConfig) -> Self {
        Self {
            render,
            overlay,
            export,
        }
    }

    pub fn render(&self) -> &RenderConfig {
        &self.render
    }

    pub fn overlay(&self) -> &OverlayConfig {
        &self.overlay
    }

    pub fn export(&self) -> &ExportConfig {
        &self.export
    }
}

/// Rendering defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RenderConfig {
    /// Theme used when the caller does not pick one.
    #[serde(default)]
    theme: ThemeMode,

    #[serde(default)]
    engine: EngineConfig,
}

impl RenderConfig {
    pub fn new(theme: ThemeMode, engine: EngineConfig) -> Self {
        Self { theme, engine }
    }

    pub fn theme(&self) -> ThemeMode {
        self.theme
    }

    pub fn engine(&self) -> &EngineConfig {
        &self.engine
    }
}

/// External drawing engine invocation.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Executable name or path.
    #[serde(default = "default_engine_command")]
    command: String,

    /// Extra arguments placed before the input/output flags.
    #[serde(default)]
    args: Vec<String>,
}

fn default_engine_command() -> String {
    "mmdc".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            command: default_engine_command(),
            args: Vec::new(),
        }
    }
}

impl EngineConfig {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

/// Identifier scheme settings.
#[derive(Debug, Clone, Deserialize)]
pub struct OverlayConfig {
    #[serde(default = "default_id_prefix")]
    id_prefix: String,

    #[serde(default = "default_id_scheme_version")]
    id_scheme_version: u32,
}

fn default_id_prefix() -> String {
    IdScheme::MERMAID_PREFIX.to_string()
}

fn default_id_scheme_version() -> u32 {
    IdScheme::MERMAID_VERSION
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            id_prefix: default_id_prefix(),
            id_scheme_version: default_id_scheme_version(),
        }
    }
}

impl OverlayConfig {
    pub fn id_prefix(&self) -> &str {
        &self.id_prefix
    }

    pub fn id_scheme_version(&self) -> u32 {
        self.id_scheme_version
    }

    /// Builds the [`IdScheme`] described by this section.
    pub fn id_scheme(&self) -> IdScheme {
        IdScheme::new(self.id_scheme_version, self.id_prefix.clone())
    }
}

/// Raster export settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    /// Multiplier applied to the measured size of the document.
    #[serde(default = "default_raster_scale")]
    raster_scale: f32,

    /// Width used when the document carries no usable size.
    #[serde(default = "default_fallback_width")]
    fallback_width: u32,

    /// Height used when the document carries no usable size.
    #[serde(default = "default_fallback_height")]
    fallback_height: u32,
}

fn default_raster_scale() -> f32 {
    4.0
}

fn default_fallback_width() -> u32 {
    800
}

fn default_fallback_height() -> u32 {
    600
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            raster_scale: default_raster_scale(),
            fallback_width: default_fallback_width(),
            fallback_height: default_fallback_height(),
        }
    }
}

impl ExportConfig {
    pub fn new(raster_scale: f32, fallback_width: u32, fallback_height: u32) -> Self {
        Self {
            raster_scale,
            fallback_width,
            fallback_height,
        }
    }

    pub fn raster_scale(&self) -> f32 {
        self.raster_scale
    }

    pub fn fallback_width(&self) -> u32 {
        self.fallback_width
    }

    pub fn fallback_height(&self) -> u32 {
        self.fallback_height
    }
}

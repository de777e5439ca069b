//! Theme-variable tables for the drawing engine.
//!
//! Each [`ThemeMode`] selects a fixed [`ThemeVariables`] palette. The values
//! are fallbacks handed to the engine as configuration; style directives in
//! the diagram source itself take precedence over them.
//!
//! ```
//! # use flowmark_core::theme::{ThemeMode, ThemeVariables};
//! let dark = ThemeVariables::for_mode(ThemeMode::Dark);
//! let light = ThemeVariables::for_mode(ThemeMode::Light);
//! assert_ne!(dark.background(), light.background());
//! assert_eq!(ThemeMode::Dark.toggled(), ThemeMode::Light);
//! ```

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::color::{Color, palette};

/// Host color scheme.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    Light,
    Dark,
}

impl ThemeMode {
    /// Returns the opposite mode.
    pub fn toggled(self) -> Self {
        match self {
            ThemeMode::Light => ThemeMode::Dark,
            ThemeMode::Dark => ThemeMode::Light,
        }
    }

    pub fn is_dark(self) -> bool {
        matches!(self, ThemeMode::Dark)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ThemeMode::Light => "light",
            ThemeMode::Dark => "dark",
        }
    }
}

impl fmt::Display for ThemeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThemeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            other => Err(format!("unknown theme mode `{other}`, expected `light` or `dark`")),
        }
    }
}

/// Palette and font metrics handed to the drawing engine.
///
/// Serializes with the engine's camel-case variable names.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeVariables {
    background: Color,
    primary_color: Color,
    primary_text_color: Color,
    primary_border_color: Color,
    secondary_color: Color,
    tertiary_color: Color,
    line_color: Color,
    #[serde(rename = "mainBkg")]
    node_fill: Color,
    node_border: Color,
    #[serde(rename = "clusterBkg")]
    cluster_fill: Color,
    cluster_border: Color,
    edge_label_background: Color,
    font_family: String,
    font_size: String,
}

const FONT_FAMILY: &str = "Inter, ui-sans-serif, system-ui, sans-serif";
const FONT_SIZE: &str = "14px";

impl ThemeVariables {
    /// Selects the table for `mode`.
    pub fn for_mode(mode: ThemeMode) -> Self {
        match mode {
            ThemeMode::Light => Self::light(),
            ThemeMode::Dark => Self::dark(),
        }
    }

    fn light() -> Self {
        Self {
            background: palette("#ffffff"),
            primary_color: palette("#eef2ff"),
            primary_text_color: palette("#1e293b"),
            primary_border_color: palette("#6366f1"),
            secondary_color: palette("#f0fdf4"),
            tertiary_color: palette("#fefce8"),
            line_color: palette("#64748b"),
            node_fill: palette("#eef2ff"),
            node_border: palette("#6366f1"),
            cluster_fill: palette("#f8fafc"),
            cluster_border: palette("#cbd5e1"),
            edge_label_background: palette("#ffffff"),
            font_family: FONT_FAMILY.to_string(),
            font_size: FONT_SIZE.to_string(),
        }
    }

    fn dark() -> Self {
        Self {
            background: palette("#0f172a"),
            primary_color: palette("#1e1b4b"),
            primary_text_color: palette("#e2e8f0"),
            primary_border_color: palette("#818cf8"),
            secondary_color: palette("#052e16"),
            tertiary_color: palette("#422006"),
            line_color: palette("#94a3b8"),
            node_fill: palette("#1e1b4b"),
            node_border: palette("#818cf8"),
            cluster_fill: palette("#1e293b"),
            cluster_border: palette("#475569"),
            edge_label_background: palette("#1e293b"),
            font_family: FONT_FAMILY.to_string(),
            font_size: FONT_SIZE.to_string(),
        }
    }

    pub fn background(&self) -> Color {
        self.background
    }

    pub fn primary_text_color(&self) -> Color {
        self.primary_text_color
    }

    pub fn line_color(&self) -> Color {
        self.line_color
    }

    pub fn node_fill(&self) -> Color {
        self.node_fill
    }

    pub fn node_border(&self) -> Color {
        self.node_border
    }

    pub fn cluster_fill(&self) -> Color {
        self.cluster_fill
    }

    pub fn cluster_border(&self) -> Color {
        self.cluster_border
    }

    pub fn font_family(&self) -> &str {
        &self.font_family
    }

    pub fn font_size(&self) -> &str {
        &self.font_size
    }
}

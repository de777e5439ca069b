//! Color handling for Flowmark theme tables
//!
//! This module provides the [`Color`] type which wraps the `DynamicColor` type
//! from the color crate. Theme palettes are expressed in [`Color`] values so
//! every entry is a validated CSS color before it reaches the drawing engine.

use std::{fmt, str::FromStr};

use color::{DynamicColor, Srgb};
use serde::{Serialize, Serializer};

/// Wrapper around the `DynamicColor` type from the color crate
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Color {
    color: DynamicColor,
}

impl Color {
    /// Create a new `Color` from a string
    /// This will parse CSS color strings such as "#ff0000", "rgb(255, 0, 0)", "red", etc.
    ///
    /// # Examples
    ///
    /// ```
    /// use flowmark_core::color::Color;
    ///
    /// let red = Color::new("#ff0000").unwrap();
    /// let blue = Color::new("blue").unwrap();
    /// ```
    pub fn new(color_str: &str) -> Result<Self, String> {
        match DynamicColor::from_str(color_str) {
            Ok(color) => Ok(Self { color }),
            Err(err) => Err(format!("invalid color `{color_str}`: {err}")),
        }
    }

    /// Converts the color to 8-bit sRGB components `[r, g, b, a]`.
    ///
    /// Used when painting opaque raster backgrounds.
    ///
    /// ```
    /// use flowmark_core::color::Color;
    ///
    /// let white = Color::new("#ffffff").unwrap();
    /// assert_eq!(white.to_rgba8(), [255, 255, 255, 255]);
    /// ```
    pub fn to_rgba8(self) -> [u8; 4] {
        let rgba = self.color.to_alpha_color::<Srgb>().to_rgba8();
        [rgba.r, rgba.g, rgba.b, rgba.a]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::new("black").expect("'black' is a valid CSS color")
    }
}

/// Formats as `#rrggbb`, or `#rrggbbaa` when the color is translucent.
///
/// The drawing engine's theming only understands hex notation.
impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b, a] = self.to_rgba8();
        if a == u8::MAX {
            write!(f, "#{r:02x}{g:02x}{b:02x}")
        } else {
            write!(f, "#{r:02x}{g:02x}{b:02x}{a:02x}")
        }
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Expands a palette literal into a [`Color`].
///
/// Only used for the built-in theme tables, whose literals are covered by
/// tests, so a parse failure falls back to the default color.
pub(crate) fn palette(color_str: &str) -> Color {
    Color::new(color_str).unwrap_or_default()
}

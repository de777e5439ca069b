//! Ephemeral view state of a diagram component.
//!
//! [`ViewState`] holds the zoom factor, fullscreen flag, active tab and
//! code-panel visibility. It lives exactly as long as the component that
//! owns it and is never shared across components.

use std::fmt;

/// Smallest allowed zoom factor.
pub const MIN_ZOOM: f32 = 0.25;
/// Largest allowed zoom factor.
pub const MAX_ZOOM: f32 = 3.0;
/// Increment applied by zoom-in / zoom-out.
pub const ZOOM_STEP: f32 = 0.25;

/// The views a diagram component can show.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActiveTab {
    #[default]
    Diagram,
    Code,
    Steps,
}

impl fmt::Display for ActiveTab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActiveTab::Diagram => write!(f, "diagram"),
            ActiveTab::Code => write!(f, "code"),
            ActiveTab::Steps => write!(f, "steps"),
        }
    }
}

/// Component-local UI state.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    zoom: f32,
    fullscreen: bool,
    active_tab: ActiveTab,
    code_panel_visible: bool,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            fullscreen: false,
            active_tab: ActiveTab::default(),
            code_panel_visible: false,
        }
    }
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Sets the zoom factor, clamped to [`MIN_ZOOM`]..=[`MAX_ZOOM`].
    ///
    /// Non-finite values reset the zoom to 1.0.
    pub fn set_zoom(&mut self, zoom: f32) {
        self.zoom = if zoom.is_finite() {
            zoom.clamp(MIN_ZOOM, MAX_ZOOM)
        } else {
            1.0
        };
    }

    pub fn zoom_in(&mut self) {
        self.set_zoom(self.zoom + ZOOM_STEP);
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.zoom - ZOOM_STEP);
    }

    pub fn reset_zoom(&mut self) {
        self.zoom = 1.0;
    }

    pub fn can_zoom_in(&self) -> bool {
        self.zoom < MAX_ZOOM
    }

    pub fn can_zoom_out(&self) -> bool {
        self.zoom > MIN_ZOOM
    }

    /// CSS-equivalent transform for the rendered document.
    ///
    /// The transform origin is the top-left corner.
    pub fn transform(&self) -> String {
        format!("scale({})", self.zoom)
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    pub fn set_fullscreen(&mut self, fullscreen: bool) {
        self.fullscreen = fullscreen;
    }

    pub fn active_tab(&self) -> ActiveTab {
        self.active_tab
    }

    pub fn set_active_tab(&mut self, tab: ActiveTab) {
        self.active_tab = tab;
    }

    pub fn is_code_panel_visible(&self) -> bool {
        self.code_panel_visible
    }

    pub fn toggle_code_panel(&mut self) {
        self.code_panel_visible = !self.code_panel_visible;
    }
}

//! Per-step test-execution status.
//!
//! The caller owns the status mapping and the highlighted step; this module
//! only defines their shape ([`StepOverlay`]) and the marker class names the
//! overlay applies to rendered elements.

use std::{fmt, str::FromStr};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Class applied to an element whose step is the highlighted one.
pub const HIGHLIGHT_CLASS: &str = "step-highlighted";

/// Class applied to the shape primitive of a highlighted node group.
pub const SHAPE_HIGHLIGHT_CLASS: &str = "step-shape-highlighted";

/// Class applied to shape sub-nodes that dispatch click events.
pub const CLICKABLE_CLASS: &str = "step-clickable";

const STATUS_CLASS_PREFIX: &str = "step-status-";
const SHAPE_STATUS_CLASS_PREFIX: &str = "step-shape-status-";

/// Test-execution state of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Running,
    Passed,
    Failed,
    Skipped,
}

impl StepStatus {
    pub const ALL: [StepStatus; 5] = [
        StepStatus::Pending,
        StepStatus::Running,
        StepStatus::Passed,
        StepStatus::Failed,
        StepStatus::Skipped,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::Running => "running",
            StepStatus::Passed => "passed",
            StepStatus::Failed => "failed",
            StepStatus::Skipped => "skipped",
        }
    }

    /// Marker class for elements that carry the step id directly.
    pub fn marker_class(&self) -> String {
        format!("{STATUS_CLASS_PREFIX}{}", self.as_str())
    }

    /// Marker class for the shape primitive inside a node group.
    pub fn shape_marker_class(&self) -> String {
        format!("{SHAPE_STATUS_CLASS_PREFIX}{}", self.as_str())
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "passed" => Ok(Self::Passed),
            "failed" => Ok(Self::Failed),
            "skipped" => Ok(Self::Skipped),
            other => Err(format!("unknown step status `{other}`")),
        }
    }
}

/// Returns `true` for any class name the overlay may have applied.
///
/// Used to clear stale markers before a new synchronization pass.
pub fn is_marker_class(class: &str) -> bool {
    class.starts_with(STATUS_CLASS_PREFIX)
        || class.starts_with(SHAPE_STATUS_CLASS_PREFIX)
        || class == HIGHLIGHT_CLASS
        || class == SHAPE_HIGHLIGHT_CLASS
        || class == CLICKABLE_CLASS
}

/// Mapping from step id to status, in caller order.
pub type StatusMap = IndexMap<String, StepStatus>;

/// Caller-supplied overlay inputs.
///
/// `test_mode` gates status and highlight classes; with it off, the overlay
/// still clears stale markers and binds click targets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepOverlay {
    statuses: StatusMap,
    highlighted: Option<String>,
    test_mode: bool,
}

impl StepOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_statuses(mut self, statuses: StatusMap) -> Self {
        self.statuses = statuses;
        self
    }

    pub fn with_highlighted(mut self, highlighted: Option<String>) -> Self {
        self.highlighted = highlighted;
        self
    }

    pub fn with_test_mode(mut self, test_mode: bool) -> Self {
        self.test_mode = test_mode;
        self
    }

    pub fn statuses(&self) -> &StatusMap {
        &self.statuses
    }

    pub fn set_statuses(&mut self, statuses: StatusMap) {
        self.statuses = statuses;
    }

    pub fn set_status(&mut self, id: impl Into<String>, status: StepStatus) {
        self.statuses.insert(id.into(), status);
    }

    pub fn status(&self, id: &str) -> Option<StepStatus> {
        self.statuses.get(id).copied()
    }

    pub fn highlighted(&self) -> Option<&str> {
        self.highlighted.as_deref()
    }

    pub fn set_highlighted(&mut self, highlighted: Option<String>) {
        self.highlighted = highlighted;
    }

    pub fn is_highlighted(&self, id: &str) -> bool {
        self.highlighted.as_deref() == Some(id)
    }

    pub fn test_mode(&self) -> bool {
        self.test_mode
    }

    pub fn set_test_mode(&mut self, test_mode: bool) {
        self.test_mode = test_mode;
    }
}

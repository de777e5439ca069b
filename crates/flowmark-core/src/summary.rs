//! Description summary types.

use serde::Serialize;

/// One numbered segment of a description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SummarySection {
    pub title: String,
    pub items: Vec<String>,
}

/// Short synopsis derived from a free-text description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedDescriptionSummary {
    pub summary: String,
    pub sections: Vec<SummarySection>,
}

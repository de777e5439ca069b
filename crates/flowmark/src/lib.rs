//! Flowmark - flowchart rendering with live step-status overlays.
//!
//! Renders untrusted flowchart sources through an external drawing engine,
//! repairs the label defects that commonly break AI-generated sources,
//! extracts a sectioned step outline, and overlays per-step test-execution
//! status onto the rendered diagram without redrawing it.
//!
//! [`FlowmarkBuilder`] covers one-shot use (the CLI); [`view::DiagramView`]
//! is the long-lived component that tracks source edits, host theme changes
//! and status updates.

pub mod config;
pub mod engine;
pub mod export;
pub mod host;
pub mod overlay;
pub mod render;
pub mod view;

mod error;

pub use flowmark_core::{color, document, outline, status, summary, theme};

pub use error::FlowmarkError;

use std::sync::Arc;

use log::{debug, info};

use flowmark_core::{
    document::SvgDocument, outline::WorkflowOutline, status::StepOverlay,
    summary::ParsedDescriptionSummary, theme::ThemeMode,
};

use config::AppConfig;
use engine::{DrawingEngine, MermaidCli};
use export::{Download, RasterContext};
use overlay::{OverlayReport, OverlaySynchronizer};
use render::{RenderOutcome, RenderPipeline};

/// Builder for sanitizing, outlining, rendering and exporting flowcharts.
///
/// # Examples
///
/// ```rust,no_run
/// use flowmark::{FlowmarkBuilder, config::AppConfig, status::StepOverlay, theme::ThemeMode};
///
/// # async fn run() -> Result<(), flowmark::FlowmarkError> {
/// let builder = FlowmarkBuilder::new(AppConfig::default());
/// let source = "flowchart TD\n  a[Load: input] --> b[Done]";
///
/// let outline = builder.outline(source);
/// let (document, _report) = builder
///     .render(source, ThemeMode::Light, &StepOverlay::new())
///     .await?;
/// let svg = builder.export_svg(&document, "Pipeline")?;
/// # Ok(())
/// # }
/// ```
pub struct FlowmarkBuilder {
    config: AppConfig,
    engine: Arc<dyn DrawingEngine>,
}

impl Default for FlowmarkBuilder {
    fn default() -> Self {
        Self::new(AppConfig::default())
    }
}

impl FlowmarkBuilder {
    /// Create a builder that draws with the configured mermaid command.
    pub fn new(config: AppConfig) -> Self {
        let engine: Arc<dyn DrawingEngine> = Arc::new(MermaidCli::new(config.render().engine()));
        Self { config, engine }
    }

    /// Create a builder with a custom drawing engine.
    pub fn with_engine(config: AppConfig, engine: Arc<dyn DrawingEngine>) -> Self {
        Self { config, engine }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Shared handle to the drawing engine, for building views.
    pub fn engine(&self) -> Arc<dyn DrawingEngine> {
        Arc::clone(&self.engine)
    }

    pub fn sanitize(&self, source: &str) -> String {
        flowmark_parser::sanitize(source)
    }

    pub fn outline(&self, source: &str) -> WorkflowOutline {
        flowmark_parser::extract_outline(source)
    }

    pub fn summarize(&self, description: &str) -> ParsedDescriptionSummary {
        flowmark_parser::summarize(description)
    }

    /// Render `source` and apply `overlay` to the result.
    ///
    /// # Errors
    ///
    /// Returns [`FlowmarkError::Render`] when the engine fails and
    /// [`FlowmarkError::Document`] when its output cannot be read.
    pub async fn render(
        &self,
        source: &str,
        theme: ThemeMode,
        overlay: &StepOverlay,
    ) -> Result<(SvgDocument, OverlayReport), FlowmarkError> {
        info!(theme = theme.as_str(); "Rendering flowchart");
        let pipeline = RenderPipeline::new(self.engine());

        let result = match pipeline.render(source, theme).await {
            RenderOutcome::Applied(result) => result,
            RenderOutcome::Discarded => {
                return Err(FlowmarkError::Render("render was superseded".to_string()));
            }
        };
        if let Some(error) = result.error() {
            return Err(FlowmarkError::Render(error.to_string()));
        }

        let mut document = SvgDocument::parse(result.visual_document())?;
        debug!(render_id = result.render_id(); "Rendered document parsed");

        let outline = self.outline(source);
        let known: Vec<&str> = outline.steps().map(|step| step.id()).collect();
        let synchronizer = OverlaySynchronizer::new(self.config.overlay().id_scheme());
        let report = synchronizer.sync(&mut document, overlay, &known, false);

        Ok((document, report))
    }

    pub fn export_svg(&self, document: &SvgDocument, title: &str) -> Result<Download, FlowmarkError> {
        Ok(export::export_vector(Some(document), title)?)
    }

    pub async fn export_png(
        &self,
        document: &SvgDocument,
        title: &str,
        theme: ThemeMode,
    ) -> Result<Download, FlowmarkError> {
        let context = RasterContext::new(theme, self.config.export().clone());
        Ok(export::export_raster(Some(document), title, &context).await?)
    }
}

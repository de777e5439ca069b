//! The diagram view component.
//!
//! [`DiagramView`] owns everything a single embedded diagram needs: the
//! source, title and description, the zoom/fullscreen/tab state, the overlay
//! inputs, the current rendered document, and the outline and summary derived
//! from the source and description. It wires the render pipeline, overlay
//! synchronizer, export pipeline and host subscriptions together.

use std::{fmt, path::PathBuf, sync::Arc};

use log::{debug, info, warn};
use thiserror::Error;

use flowmark_core::{
    document::{NodeId, SvgDocument},
    outline::WorkflowOutline,
    status::{StatusMap, StepOverlay},
    summary::ParsedDescriptionSummary,
    theme::ThemeMode,
    view::ViewState,
};

use crate::{
    FlowmarkError,
    config::{AppConfig, ExportConfig},
    engine::DrawingEngine,
    export::{self, DownloadSink, RasterContext},
    host::{FullscreenWatcher, Host, ThemeWatcher},
    overlay::{OverlayReport, OverlaySynchronizer},
    render::{RenderOutcome, RenderPipeline},
};

/// Callback invoked with the step id of a clicked node.
pub type ClickHandler = Arc<dyn Fn(&str) + Send + Sync>;

/// Clipboard write failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("clipboard write failed: {reason}")]
pub struct ClipboardError {
    reason: String,
}

impl ClipboardError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// System clipboard access.
pub trait Clipboard: Send + Sync {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError>;
}

/// User-facing success and failure notifications.
pub trait Notifier: Send + Sync {
    fn success(&self, message: &str);
    fn failure(&self, message: &str);
}

/// [`Notifier`] that writes to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn success(&self, message: &str) {
        info!(message; "Notification");
    }

    fn failure(&self, message: &str) {
        warn!(message; "Notification");
    }
}

/// A host change observed by [`DiagramView::next_host_event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    /// The color scheme changed and the diagram was re-rendered.
    ColorScheme(ThemeMode),
    Fullscreen(bool),
}

/// One embedded diagram.
pub struct DiagramView {
    source: String,
    title: String,
    description: Option<String>,
    state: ViewState,
    theme: ThemeMode,
    pipeline: RenderPipeline,
    synchronizer: OverlaySynchronizer,
    export_config: ExportConfig,
    overlay: StepOverlay,
    on_click: Option<ClickHandler>,
    document: Option<SvgDocument>,
    report: OverlayReport,
    render_error: Option<String>,
    outline: WorkflowOutline,
    summary: Option<ParsedDescriptionSummary>,
    theme_watcher: Option<ThemeWatcher>,
    fullscreen_watcher: Option<FullscreenWatcher>,
}

impl fmt::Debug for DiagramView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagramView")
            .field("title", &self.title)
            .field("theme", &self.theme)
            .field("state", &self.state)
            .field("has_document", &self.document.is_some())
            .field("render_error", &self.render_error)
            .finish_non_exhaustive()
    }
}

impl DiagramView {
    pub fn new(engine: Arc<dyn DrawingEngine>, config: &AppConfig) -> Self {
        Self {
            source: String::new(),
            title: String::new(),
            description: None,
            state: ViewState::new(),
            theme: config.render().theme(),
            pipeline: RenderPipeline::new(engine),
            synchronizer: OverlaySynchronizer::new(config.overlay().id_scheme()),
            export_config: config.export().clone(),
            overlay: StepOverlay::new(),
            on_click: None,
            document: None,
            report: OverlayReport::default(),
            render_error: None,
            outline: WorkflowOutline::new(),
            summary: None,
            theme_watcher: None,
            fullscreen_watcher: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.set_description(Some(description.into()));
        self
    }

    pub fn with_overlay(mut self, overlay: StepOverlay) -> Self {
        self.overlay = overlay;
        self
    }

    pub fn with_click_handler(mut self, handler: ClickHandler) -> Self {
        self.on_click = Some(handler);
        self
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Subscribes to host notifications and adopts the host color scheme.
    pub fn mount(&mut self, host: &Host) {
        self.theme = host.color_scheme();
        self.state.set_fullscreen(host.is_fullscreen());
        self.theme_watcher = Some(host.watch_color_scheme());
        self.fullscreen_watcher = Some(host.watch_fullscreen());
        debug!(theme = self.theme.as_str(); "Diagram view mounted");
    }

    /// Releases both host subscriptions.
    pub fn unmount(&mut self) {
        if let Some(mut watcher) = self.theme_watcher.take() {
            watcher.unsubscribe();
        }
        if let Some(mut watcher) = self.fullscreen_watcher.take() {
            watcher.unsubscribe();
        }
        debug!("Diagram view unmounted");
    }

    pub fn is_mounted(&self) -> bool {
        self.theme_watcher.is_some() || self.fullscreen_watcher.is_some()
    }

    /// Waits for the next host notification and applies it.
    ///
    /// A color-scheme change re-renders the current source with the new
    /// theme. Returns `None` when the view holds no live subscription.
    pub async fn next_host_event(&mut self) -> Option<HostEvent> {
        let theme_watcher = self.theme_watcher.as_mut();
        let fullscreen_watcher = self.fullscreen_watcher.as_mut();

        let event = tokio::select! {
            Some(mode) = async move {
                match theme_watcher {
                    Some(watcher) => watcher.changed().await,
                    None => None,
                }
            } => HostEvent::ColorScheme(mode),
            Some(fullscreen) = async move {
                match fullscreen_watcher {
                    Some(watcher) => watcher.changed().await,
                    None => None,
                }
            } => HostEvent::Fullscreen(fullscreen),
            else => return None,
        };

        match event {
            HostEvent::ColorScheme(mode) => {
                if mode != self.theme {
                    self.theme = mode;
                    self.rerender().await;
                }
            }
            HostEvent::Fullscreen(fullscreen) => self.state.set_fullscreen(fullscreen),
        }
        Some(event)
    }

    // =========================================================================
    // Source and rendering
    // =========================================================================

    /// Replaces the source, refreshes the outline and re-renders.
    pub async fn set_source(&mut self, source: impl Into<String>) {
        self.source = source.into();
        self.outline = flowmark_parser::extract_outline(&self.source);
        self.rerender().await;
    }

    pub fn set_description(&mut self, description: Option<String>) {
        self.summary = description.as_deref().map(flowmark_parser::summarize);
        self.description = description;
    }

    /// Renders the current source with the current theme.
    ///
    /// A failed render clears the previous diagram and records the message.
    /// A render superseded by a newer one changes nothing.
    pub async fn rerender(&mut self) {
        let outcome = self.pipeline.render(&self.source, self.theme).await;
        let RenderOutcome::Applied(result) = outcome else {
            return;
        };

        if let Some(error) = result.error() {
            self.document = None;
            self.report = OverlayReport::default();
            self.render_error = Some(error.to_string());
            return;
        }

        match SvgDocument::parse(result.visual_document()) {
            Ok(document) => {
                self.document = Some(document);
                self.render_error = None;
                self.sync_overlay();
            }
            Err(err) => {
                warn!(render_id = result.render_id(), err:%; "Rendered markup is unreadable");
                self.document = None;
                self.report = OverlayReport::default();
                self.render_error = Some(err.to_string());
            }
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn theme(&self) -> ThemeMode {
        self.theme
    }

    pub fn document(&self) -> Option<&SvgDocument> {
        self.document.as_ref()
    }

    pub fn render_error(&self) -> Option<&str> {
        self.render_error.as_deref()
    }

    pub async fn is_loading(&self) -> bool {
        self.pipeline.is_loading().await
    }

    pub fn outline(&self) -> &WorkflowOutline {
        &self.outline
    }

    pub fn summary(&self) -> Option<&ParsedDescriptionSummary> {
        self.summary.as_ref()
    }

    // =========================================================================
    // Overlay
    // =========================================================================

    pub fn set_statuses(&mut self, statuses: StatusMap) {
        self.overlay.set_statuses(statuses);
        self.sync_overlay();
    }

    pub fn set_highlighted(&mut self, highlighted: Option<String>) {
        self.overlay.set_highlighted(highlighted);
        self.sync_overlay();
    }

    pub fn set_test_mode(&mut self, test_mode: bool) {
        self.overlay.set_test_mode(test_mode);
        self.sync_overlay();
    }

    pub fn set_click_handler(&mut self, handler: Option<ClickHandler>) {
        self.on_click = handler;
        self.sync_overlay();
    }

    pub fn overlay(&self) -> &StepOverlay {
        &self.overlay
    }

    pub fn overlay_report(&self) -> &OverlayReport {
        &self.report
    }

    /// Dispatches a click on `node` to the click handler.
    ///
    /// Returns the step id the node is bound to, if the click was handled.
    pub fn click(&self, node: NodeId) -> Option<&str> {
        let handler = self.on_click.as_ref()?;
        let step_id = self.report.step_for(node)?;
        handler(step_id);
        Some(step_id)
    }

    fn sync_overlay(&mut self) {
        let Some(document) = self.document.as_mut() else {
            return;
        };
        let known: Vec<&str> = self.outline.steps().map(|step| step.id()).collect();
        self.report = self
            .synchronizer
            .sync(document, &self.overlay, &known, self.on_click.is_some());
    }

    // =========================================================================
    // View state
    // =========================================================================

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut ViewState {
        &mut self.state
    }

    pub fn zoom_in(&mut self) {
        self.state.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.state.zoom_out();
    }

    pub fn reset_zoom(&mut self) {
        self.state.reset_zoom();
    }

    /// Transform applied to the diagram, with a top-left origin.
    pub fn transform(&self) -> String {
        self.state.transform()
    }

    /// Enters or leaves fullscreen through the host.
    ///
    /// # Errors
    ///
    /// Returns [`FlowmarkError::Fullscreen`] when the host refuses; the
    /// fullscreen flag is left unchanged.
    pub fn toggle_fullscreen(
        &mut self,
        host: &Host,
        notifier: &dyn Notifier,
    ) -> Result<(), FlowmarkError> {
        let entering = !self.state.is_fullscreen();
        let result = if entering {
            host.request_fullscreen()
        } else {
            host.exit_fullscreen()
        };

        match result {
            Ok(()) => {
                self.state.set_fullscreen(entering);
                Ok(())
            }
            Err(err) => {
                notifier.failure(&err.to_string());
                Err(err.into())
            }
        }
    }

    // =========================================================================
    // Clipboard and downloads
    // =========================================================================

    /// Copies the raw source.
    pub fn copy_source(
        &self,
        clipboard: &dyn Clipboard,
        notifier: &dyn Notifier,
    ) -> Result<(), FlowmarkError> {
        match clipboard.write_text(&self.source) {
            Ok(()) => {
                notifier.success("Diagram source copied to clipboard");
                Ok(())
            }
            Err(err) => {
                notifier.failure(&err.to_string());
                Err(err.into())
            }
        }
    }

    /// Saves the current document as `<slug>.svg`.
    pub fn download_svg(
        &self,
        sink: &dyn DownloadSink,
        notifier: &dyn Notifier,
    ) -> Result<PathBuf, FlowmarkError> {
        let saved = export::export_vector(self.document.as_ref(), &self.title)
            .and_then(|download| sink.save(&download));
        report_download(saved, "SVG", notifier)
    }

    /// Saves a raster image of the current document as `<slug>.png`.
    pub async fn download_png(
        &self,
        sink: &dyn DownloadSink,
        notifier: &dyn Notifier,
    ) -> Result<PathBuf, FlowmarkError> {
        let context = RasterContext::new(self.theme, self.export_config.clone());
        let saved = match export::export_raster(self.document.as_ref(), &self.title, &context).await
        {
            Ok(download) => sink.save(&download),
            Err(err) => Err(err),
        };
        report_download(saved, "PNG", notifier)
    }
}

impl Drop for DiagramView {
    fn drop(&mut self) {
        self.unmount();
    }
}

fn report_download(
    saved: Result<PathBuf, export::ExportError>,
    format: &str,
    notifier: &dyn Notifier,
) -> Result<PathBuf, FlowmarkError> {
    match saved {
        Ok(path) => {
            notifier.success(&format!("{format} downloaded"));
            Ok(path)
        }
        Err(err) => {
            notifier.failure(&format!("{format} export failed: {err}"));
            Err(err.into())
        }
    }
}

//! The asynchronous render pipeline.
//!
//! Each call to [`RenderPipeline::render`] sanitizes the source, picks the
//! theme table, and awaits the drawing engine. Requests may overlap: a user
//! typing into the source pane, or a color-scheme change arriving mid-render,
//! starts a new request before the previous one finishes. Every request takes
//! a key from a monotonically increasing counter, and a completion whose key
//! is no longer the latest is discarded without touching the pipeline state.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{SystemTime, UNIX_EPOCH},
};

use log::{debug, info, warn};
use rand::distr::{Alphanumeric, Distribution};
use tokio::sync::Mutex;

use flowmark_core::theme::{ThemeMode, ThemeVariables};

use crate::engine::{DrawRequest, DrawingEngine};

const RENDER_ID_PREFIX: &str = "flowmark";
const RENDER_ID_SUFFIX_LEN: usize = 6;

/// Outcome of one finished draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderResult {
    render_id: String,
    theme: ThemeMode,
    visual_document: String,
    error: Option<String>,
}

impl RenderResult {
    pub fn render_id(&self) -> &str {
        &self.render_id
    }

    pub fn theme(&self) -> ThemeMode {
        self.theme
    }

    /// Serialized SVG markup; empty when the draw failed.
    pub fn visual_document(&self) -> &str {
        &self.visual_document
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Whether a finished request became the current result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    Applied(RenderResult),
    /// A newer request was issued while this one was in flight.
    Discarded,
}

#[derive(Debug, Default)]
struct State {
    latest_key: u64,
    loading: bool,
    current: Option<RenderResult>,
}

/// Drives the drawing engine and keeps the current [`RenderResult`].
pub struct RenderPipeline {
    engine: Arc<dyn DrawingEngine>,
    next_key: AtomicU64,
    state: Mutex<State>,
}

impl RenderPipeline {
    pub fn new(engine: Arc<dyn DrawingEngine>) -> Self {
        Self {
            engine,
            next_key: AtomicU64::new(0),
            state: Mutex::new(State::default()),
        }
    }

    /// Renders `source` with the `theme` table.
    ///
    /// Engine failures are not returned as errors: they become the current
    /// result with [`RenderResult::error`] set, and the previous diagram is
    /// not retained.
    pub async fn render(&self, source: &str, theme: ThemeMode) -> RenderOutcome {
        let key = self.next_key.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut state = self.state.lock().await;
            state.latest_key = key;
            state.loading = true;
        }

        let render_id = new_render_id();
        let sanitized = flowmark_parser::sanitize(source);
        let variables = ThemeVariables::for_mode(theme);
        info!(render_id = render_id.as_str(), key, theme = theme.as_str(); "Rendering diagram");

        let request = DrawRequest::new(&render_id, &sanitized, &variables);
        let drawn = self.engine.draw(&request).await;

        let mut state = self.state.lock().await;
        if key != state.latest_key {
            debug!(render_id = render_id.as_str(), key, latest = state.latest_key; "Discarding stale render");
            return RenderOutcome::Discarded;
        }

        let result = match drawn {
            Ok(visual_document) => RenderResult {
                render_id,
                theme,
                visual_document,
                error: None,
            },
            Err(err) => {
                warn!(render_id = render_id.as_str(), err:%; "Diagram render failed");
                RenderResult {
                    render_id,
                    theme,
                    visual_document: String::new(),
                    error: Some(err.to_string()),
                }
            }
        };

        state.loading = false;
        state.current = Some(result.clone());
        RenderOutcome::Applied(result)
    }

    /// `true` while the latest request is in flight.
    pub async fn is_loading(&self) -> bool {
        self.state.lock().await.loading
    }

    pub async fn current(&self) -> Option<RenderResult> {
        self.state.lock().await.current.clone()
    }
}

/// `flowmark-<unix millis>-<6 alphanumerics>`.
fn new_render_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default();
    let suffix: String = Alphanumeric
        .sample_iter(rand::rng())
        .take(RENDER_ID_SUFFIX_LEN)
        .map(char::from)
        .collect();
    format!("{RENDER_ID_PREFIX}-{millis}-{suffix}")
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use async_trait::async_trait;

    use super::*;
    use crate::engine::EngineError;

    struct EchoEngine;

    #[async_trait]
    impl DrawingEngine for EchoEngine {
        async fn draw(&self, request: &DrawRequest<'_>) -> Result<String, EngineError> {
            Ok(format!("<svg id=\"{}\"><!--{}--></svg>", request.render_id(), request.source()))
        }
    }

    struct FailingEngine;

    #[async_trait]
    impl DrawingEngine for FailingEngine {
        async fn draw(&self, _request: &DrawRequest<'_>) -> Result<String, EngineError> {
            Err(EngineError::EmptyOutput)
        }
    }

    #[test]
    fn test_render_id_format() {
        let id = new_render_id();
        let parts: Vec<&str> = id.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "flowmark");
        assert!(parts[1].parse::<u128>().is_ok());
        assert_eq!(parts[2].len(), 6);
        assert!(parts[2].chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_render_ids_are_unique() {
        let ids: HashSet<String> = (0..64).map(|_| new_render_id()).collect();
        assert_eq!(ids.len(), 64);
    }

    #[tokio::test]
    async fn test_engine_receives_sanitized_source() {
        let pipeline = RenderPipeline::new(Arc::new(EchoEngine));
        let outcome = pipeline.render("A[Revenue/Cost]", ThemeMode::Light).await;

        let RenderOutcome::Applied(result) = outcome else {
            panic!("render should apply");
        };
        assert!(result.visual_document().contains(r#"A["Revenue/Cost"]"#));
        assert!(result.visual_document().contains(result.render_id()));
        assert!(!pipeline.is_loading().await);
    }

    #[tokio::test]
    async fn test_engine_failure_becomes_result_error() {
        let pipeline = RenderPipeline::new(Arc::new(FailingEngine));
        let outcome = pipeline.render("flowchart TD", ThemeMode::Dark).await;

        let RenderOutcome::Applied(result) = outcome else {
            panic!("render should apply");
        };
        assert!(!result.is_success());
        assert!(result.visual_document().is_empty());
        assert_eq!(result.theme(), ThemeMode::Dark);
        assert_eq!(pipeline.current().await, Some(result));
        assert!(!pipeline.is_loading().await);
    }
}

//! Integration tests for render ordering and the public builder API.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use tokio::sync::oneshot;

use flowmark::{
    FlowmarkBuilder, FlowmarkError,
    config::AppConfig,
    engine::{DrawRequest, DrawingEngine, EngineError},
    render::{RenderOutcome, RenderPipeline},
    status::{StatusMap, StepOverlay, StepStatus},
    theme::ThemeMode,
};

const V1: &str = "flowchart TD\n  v1[Version one]";
const V2: &str = "flowchart TD\n  v2[Version two]";

/// Engine whose draws can be held back until the test releases them.
#[derive(Default)]
struct ScriptedEngine {
    gates: Mutex<HashMap<String, oneshot::Receiver<()>>>,
}

impl ScriptedEngine {
    fn hold(&self, source: &str) -> oneshot::Sender<()> {
        let (release, gate) = oneshot::channel();
        self.gates.lock().unwrap().insert(source.to_string(), gate);
        release
    }
}

#[async_trait]
impl DrawingEngine for ScriptedEngine {
    async fn draw(&self, request: &DrawRequest<'_>) -> Result<String, EngineError> {
        let gate = self.gates.lock().unwrap().remove(request.source());
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        if request.source().contains("fail") {
            return Err(EngineError::EmptyOutput);
        }

        let nodes: String = declared_ids(request.source())
            .iter()
            .enumerate()
            .map(|(n, id)| format!(r#"<g class="node" id="flowchart-{id}-{n}"><rect/></g>"#))
            .collect();
        Ok(format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" id="{}" viewBox="0 0 200 100"><desc>{}</desc>{nodes}</svg>"#,
            request.render_id(),
            request.source().lines().last().unwrap_or_default().trim(),
        ))
    }
}

/// Node ids declared as `id[...]` on their own line.
fn declared_ids(source: &str) -> Vec<String> {
    source
        .lines()
        .filter_map(|line| line.trim().split_once('['))
        .map(|(id, _)| id.to_string())
        .collect()
}

#[tokio::test]
async fn test_stale_render_never_overwrites_newer_one() {
    let engine = Arc::new(ScriptedEngine::default());
    let release_v1 = engine.hold(V1);
    let pipeline = RenderPipeline::new(engine.clone());

    let (first, second) = tokio::join!(pipeline.render(V1, ThemeMode::Light), async {
        let outcome = pipeline.render(V2, ThemeMode::Light).await;
        release_v1.send(()).unwrap();
        outcome
    });

    assert_eq!(first, RenderOutcome::Discarded);
    let RenderOutcome::Applied(applied) = second else {
        panic!("newest render should apply");
    };
    assert!(applied.visual_document().contains("Version two"));

    let current = pipeline.current().await.unwrap();
    assert_eq!(current, applied);
    assert!(!pipeline.is_loading().await);
}

#[tokio::test]
async fn test_loading_until_latest_render_completes() {
    let engine = Arc::new(ScriptedEngine::default());
    let release = engine.hold(V1);
    let pipeline = RenderPipeline::new(engine.clone());

    let (outcome, was_loading) = tokio::join!(pipeline.render(V1, ThemeMode::Dark), async {
        let loading = pipeline.is_loading().await;
        release.send(()).unwrap();
        loading
    });

    assert!(was_loading);
    assert!(matches!(outcome, RenderOutcome::Applied(_)));
    assert!(!pipeline.is_loading().await);
}

#[tokio::test]
async fn test_builder_renders_with_overlay() {
    let builder = FlowmarkBuilder::with_engine(AppConfig::default(), Arc::new(ScriptedEngine::default()));
    let source = "flowchart TD\nn1[Validate]\nn2[Ship]";
    let statuses: StatusMap = [
        ("n1".to_string(), StepStatus::Passed),
        ("n2".to_string(), StepStatus::Failed),
    ]
    .into_iter()
    .collect();
    let overlay = StepOverlay::new().with_statuses(statuses).with_test_mode(true);

    let (document, report) = builder.render(source, ThemeMode::Light, &overlay).await.unwrap();

    let markup = document.to_markup();
    assert_eq!(markup.matches("step-status-passed").count(), 1);
    assert_eq!(markup.matches("step-status-failed").count(), 1);
    assert!(report.applied >= 2);

    let svg = builder.export_svg(&document, "Release Flow").unwrap();
    assert_eq!(svg.file_name(), "release-flow.svg");
}

#[tokio::test]
async fn test_builder_reports_engine_failure() {
    let builder = FlowmarkBuilder::with_engine(AppConfig::default(), Arc::new(ScriptedEngine::default()));

    let result = builder
        .render("flowchart TD\n fail[Boom]", ThemeMode::Light, &StepOverlay::new())
        .await;

    assert!(matches!(result, Err(FlowmarkError::Render(_))));
}

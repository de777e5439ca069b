//! The drawing-engine seam.
//!
//! Layout and drawing of the flowchart are delegated to an external engine
//! behind the [`DrawingEngine`] trait. The engine receives sanitized source
//! and a theme-variable table and returns serialized SVG markup.
//!
//! [`MermaidCli`] drives the mermaid command-line renderer (`mmdc`) as a
//! subprocess. Tests substitute in-process engines.

use std::{io, path::Path, process::Stdio};

use async_trait::async_trait;
use log::{debug, info};
use serde::Serialize;
use thiserror::Error;
use tokio::{fs, process::Command};

use flowmark_core::theme::ThemeVariables;

use crate::config::EngineConfig;

/// Script handling requested from the engine.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityLevel {
    /// Diagram content may not execute scripts or bind click callbacks.
    #[default]
    Strict,
}

/// One drawing request.
#[derive(Debug, Clone, Copy)]
pub struct DrawRequest<'a> {
    render_id: &'a str,
    source: &'a str,
    theme: &'a ThemeVariables,
    security: SecurityLevel,
}

impl<'a> DrawRequest<'a> {
    pub fn new(render_id: &'a str, source: &'a str, theme: &'a ThemeVariables) -> Self {
        Self {
            render_id,
            source,
            theme,
            security: SecurityLevel::Strict,
        }
    }

    /// Unique id the engine should stamp on the root element.
    pub fn render_id(&self) -> &str {
        self.render_id
    }

    /// Sanitized diagram source.
    pub fn source(&self) -> &str {
        self.source
    }

    pub fn theme(&self) -> &ThemeVariables {
        self.theme
    }

    pub fn security(&self) -> SecurityLevel {
        self.security
    }
}

/// Errors reported by a [`DrawingEngine`].
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to start drawing engine `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("drawing engine exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("drawing engine produced no output")]
    EmptyOutput,

    #[error("drawing engine I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Produces SVG markup from sanitized flowchart source.
#[async_trait]
pub trait DrawingEngine: Send + Sync {
    async fn draw(&self, request: &DrawRequest<'_>) -> Result<String, EngineError>;
}

/// Engine configuration file contents understood by `mmdc -c`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MermaidConfig<'a> {
    theme: &'static str,
    theme_variables: &'a ThemeVariables,
    security_level: SecurityLevel,
    start_on_load: bool,
    flowchart: FlowchartConfig,
}

/// Flowchart options of the engine configuration.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FlowchartConfig {
    /// Labels must be SVG `<text>`; raster export cannot draw `<foreignObject>`.
    html_labels: bool,
}

impl<'a> MermaidConfig<'a> {
    fn new(request: &DrawRequest<'a>) -> Self {
        Self {
            theme: "base",
            theme_variables: request.theme,
            security_level: request.security,
            start_on_load: false,
            flowchart: FlowchartConfig { html_labels: false },
        }
    }
}

/// Drawing engine backed by the mermaid command-line renderer.
#[derive(Debug, Clone)]
pub struct MermaidCli {
    command: String,
    args: Vec<String>,
}

impl MermaidCli {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            command: config.command().to_string(),
            args: config.args().to_vec(),
        }
    }

    async fn write_inputs(dir: &Path, request: &DrawRequest<'_>) -> Result<(), EngineError> {
        fs::write(dir.join("input.mmd"), request.source()).await?;

        let json = serde_json::to_vec_pretty(&MermaidConfig::new(request)).map_err(io::Error::other)?;
        fs::write(dir.join("config.json"), json).await?;
        Ok(())
    }
}

impl Default for MermaidCli {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

#[async_trait]
impl DrawingEngine for MermaidCli {
    async fn draw(&self, request: &DrawRequest<'_>) -> Result<String, EngineError> {
        let workdir = tempfile::tempdir()?;
        Self::write_inputs(workdir.path(), request).await?;

        let output_path = workdir.path().join("output.svg");
        info!(command = self.command.as_str(), render_id = request.render_id(); "Invoking drawing engine");

        let output = Command::new(&self.command)
            .args(&self.args)
            .arg("-i")
            .arg(workdir.path().join("input.mmd"))
            .arg("-o")
            .arg(&output_path)
            .arg("-c")
            .arg(workdir.path().join("config.json"))
            .arg("--svgId")
            .arg(request.render_id())
            .arg("--quiet")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| EngineError::Spawn {
                command: self.command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(EngineError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let markup = match fs::read_to_string(&output_path).await {
            Ok(markup) => markup,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Err(EngineError::EmptyOutput),
            Err(err) => return Err(err.into()),
        };
        if markup.trim().is_empty() {
            return Err(EngineError::EmptyOutput);
        }

        debug!(render_id = request.render_id(), bytes = markup.len(); "Drawing engine finished");
        Ok(markup)
    }
}

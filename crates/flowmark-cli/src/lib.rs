//! CLI logic for the Flowmark flowchart tool.
//!
//! Each subcommand reads one input file, runs it through the matching
//! [`FlowmarkBuilder`] operation and writes the result to a file or stdout.

pub mod error_adapter;

mod args;
mod config;

pub use args::{Args, Command};

use std::{
    fs,
    io::{self, Write},
    path::Path,
};

use log::{debug, info};

use flowmark::{
    FlowmarkBuilder, FlowmarkError,
    outline::WorkflowOutline,
    overlay::marker_stylesheet,
    status::{StatusMap, StepOverlay},
    summary::ParsedDescriptionSummary,
    theme::ThemeMode,
};

/// Run the Flowmark CLI application
///
/// # Errors
///
/// Returns `FlowmarkError` for:
/// - File I/O errors
/// - Configuration loading errors
/// - Drawing engine failures
/// - Export errors
pub fn run(args: &Args) -> Result<(), FlowmarkError> {
    let app_config = config::load_config(args.config.as_ref())?;
    let builder = FlowmarkBuilder::new(app_config);

    match &args.command {
        Command::Sanitize { input, output } => {
            info!(input_path = input; "Sanitizing flowchart");
            let source = fs::read_to_string(input)?;
            write_output(output.as_deref(), &builder.sanitize(&source))
        }
        Command::Outline {
            input,
            json,
            output,
        } => {
            info!(input_path = input; "Extracting outline");
            let source = fs::read_to_string(input)?;
            let outline = builder.outline(&source);
            debug!(sections = outline.len(), steps = outline.step_count(); "Outline extracted");

            let text = if *json {
                serde_json::to_string_pretty(&outline).map_err(io::Error::other)?
            } else {
                format_outline(&outline)
            };
            write_output(output.as_deref(), &text)
        }
        Command::Summarize { input, output } => {
            info!(input_path = input; "Summarizing description");
            let description = fs::read_to_string(input)?;
            write_output(
                output.as_deref(),
                &format_summary(&builder.summarize(&description)),
            )
        }
        Command::Render {
            input,
            output,
            png,
            theme,
            title,
            status,
            highlight,
        } => {
            let theme = theme.unwrap_or(builder.config().render().theme());
            let title = title.clone().unwrap_or_else(|| title_from_path(input));
            info!(input_path = input, output_path = output, theme = theme.as_str(); "Rendering flowchart");

            let source = fs::read_to_string(input)?;
            let statuses = status.as_deref().map(load_statuses).transpose()?;
            let test_mode = statuses.is_some() || highlight.is_some();
            let overlay = StepOverlay::new()
                .with_statuses(statuses.unwrap_or_default())
                .with_highlighted(highlight.clone())
                .with_test_mode(test_mode);

            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            runtime.block_on(render(&builder, &source, theme, &title, &overlay, output, png.as_deref()))
        }
    }
}

async fn render(
    builder: &FlowmarkBuilder,
    source: &str,
    theme: ThemeMode,
    title: &str,
    overlay: &StepOverlay,
    output: &str,
    png: Option<&str>,
) -> Result<(), FlowmarkError> {
    let (mut document, report) = builder.render(source, theme, overlay).await?;
    debug!(cleared = report.cleared, applied = report.applied; "Overlay applied");

    if overlay.test_mode() {
        let root = document.root();
        let style = document.append_element(root, "style");
        document.append_text(style, &marker_stylesheet(theme));
    }

    let svg = builder.export_svg(&document, title)?;
    fs::write(output, svg.bytes())?;
    info!(output_file = output; "SVG exported successfully");

    if let Some(png) = png {
        let raster = builder.export_png(&document, title, theme).await?;
        fs::write(png, raster.bytes())?;
        info!(output_file = png; "PNG exported successfully");
    }

    Ok(())
}

fn load_statuses(path: &str) -> Result<StatusMap, FlowmarkError> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|err| FlowmarkError::Config(format!("invalid status file {path}: {err}")))
}

fn title_from_path(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "diagram".to_string())
}

fn write_output(output: Option<&str>, text: &str) -> Result<(), FlowmarkError> {
    match output {
        Some(path) => {
            fs::write(path, text)?;
            info!(output_file = path; "Output written");
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(text.as_bytes())?;
            if !text.ends_with('\n') {
                stdout.write_all(b"\n")?;
            }
        }
    }
    Ok(())
}

fn format_outline(outline: &WorkflowOutline) -> String {
    if outline.is_empty() {
        "No steps found.\n".to_string()
    } else {
        outline.to_string()
    }
}

fn format_summary(summary: &ParsedDescriptionSummary) -> String {
    let mut text = String::new();
    if !summary.summary.is_empty() {
        text.push_str(&summary.summary);
        text.push('\n');
    }
    for section in &summary.sections {
        text.push('\n');
        text.push_str(&section.title);
        text.push('\n');
        for item in &section.items {
            text.push_str(&format!("  - {item}\n"));
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    use flowmark::outline::{Section, Step, StepKind};

    #[test]
    fn test_format_outline_numbers_steps_per_section() {
        let mut outline = WorkflowOutline::new();
        let mut section = Section::new("Intake");
        section.push(Step::new("n1", "Validate Input", StepKind::Process));
        section.push(Step::new("d1", "Valid?", StepKind::Decision));
        outline.push_section(section);

        assert_eq!(
            format_outline(&outline),
            "Intake\n  1. Validate Input [process] n1\n  2. Valid? [decision] d1\n"
        );
    }

    #[test]
    fn test_format_empty_outline() {
        assert_eq!(format_outline(&WorkflowOutline::new()), "No steps found.\n");
    }

    #[test]
    fn test_title_from_path_uses_file_stem() {
        assert_eq!(title_from_path("demos/order-intake.mmd"), "order-intake");
    }

    #[test]
    fn test_status_file_is_parsed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("status.json");
        fs::write(&path, r#"{"n1": "passed", "n2": "running"}"#).unwrap();

        let statuses = load_statuses(path.to_str().unwrap()).unwrap();

        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses.keys().next().map(String::as_str), Some("n1"));
    }

    #[test]
    fn test_invalid_status_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("status.json");
        fs::write(&path, r#"{"n1": "exploded"}"#).unwrap();

        let err = load_statuses(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, FlowmarkError::Config(message) if message.contains("status.json")));
    }
}

//! SVG and PNG export of rendered diagrams.
//!
//! [`export_vector`] serializes the live document as-is. [`export_raster`]
//! works on a clone: computed styles are inlined so the image does not depend
//! on the host page, the clone is sized from the measured live document, and
//! it is rasterized with `resvg` onto an opaque background.
//!
//! Exports produce a [`Download`]; a [`DownloadSink`] decides where it goes.

mod style;

use std::{
    fs, io,
    io::Write as _,
    path::{Path, PathBuf},
};

use log::{debug, info};
use resvg::{tiny_skia, usvg};
use thiserror::Error;

use flowmark_core::{
    document::{NodeId, SvgDocument},
    theme::{ThemeMode, ThemeVariables},
};

use crate::{config::ExportConfig, overlay::marker_stylesheet};

use style::StyleSheet;

const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";
const SVG_MIME: &str = "image/svg+xml";
const PNG_MIME: &str = "image/png";
const DATA_URI_PREFIX: &str = "data:image/svg+xml;charset=utf-8,";
const DEFAULT_SLUG: &str = "process-map";

/// Errors raised while exporting a diagram.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no rendered diagram to export")]
    MissingDocument,

    #[error("cannot allocate a {width}x{height} raster surface")]
    SurfaceUnsupported { width: u32, height: u32 },

    #[error("failed to load diagram image: {0}")]
    Load(String),

    #[error("failed to encode PNG: {0}")]
    Encode(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// An exported file, ready to hand to a [`DownloadSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    file_name: String,
    mime: &'static str,
    bytes: Vec<u8>,
}

impl Download {
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn mime(&self) -> &'static str {
        self.mime
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Destination for exported files.
pub trait DownloadSink: Send + Sync {
    /// Stores `download`, returning where it ended up.
    fn save(&self, download: &Download) -> Result<PathBuf, ExportError>;
}

/// Writes downloads into a directory.
///
/// Files are written to a temporary file in the same directory and then
/// renamed into place, so a failed write never leaves a partial file.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DownloadSink for DirectorySink {
    fn save(&self, download: &Download) -> Result<PathBuf, ExportError> {
        fs::create_dir_all(&self.dir)?;
        let mut temp_file = tempfile::NamedTempFile::new_in(&self.dir)?;
        temp_file.write_all(download.bytes())?;
        temp_file.flush()?;

        let target = self.dir.join(download.file_name());
        temp_file.persist(&target).map_err(|err| err.error)?;
        info!(path:% = target.display(), bytes = download.bytes().len(); "Saved download");
        Ok(target)
    }
}

/// Inputs to [`export_raster`] beyond the document itself.
#[derive(Debug, Clone)]
pub struct RasterContext {
    theme: ThemeMode,
    host_stylesheet: String,
    config: ExportConfig,
}

impl RasterContext {
    /// Context whose host stylesheet is the marker stylesheet for `theme`.
    pub fn new(theme: ThemeMode, config: ExportConfig) -> Self {
        Self {
            theme,
            host_stylesheet: marker_stylesheet(theme),
            config,
        }
    }

    /// Appends extra host CSS after the marker stylesheet.
    pub fn with_host_stylesheet(mut self, css: &str) -> Self {
        self.host_stylesheet.push('\n');
        self.host_stylesheet.push_str(css);
        self
    }

    pub fn theme(&self) -> ThemeMode {
        self.theme
    }
}

/// Lower-case `title`, runs of other characters replaced by `-`.
///
/// ```
/// # use flowmark::export::slugify;
/// assert_eq!(slugify("Order Intake: v2!"), "order-intake-v2");
/// assert_eq!(slugify("  ***  "), "process-map");
/// ```
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            slug.push(c);
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        DEFAULT_SLUG.to_string()
    } else {
        slug.to_string()
    }
}

/// Serializes the document unchanged as `<slug>.svg`.
pub fn export_vector(document: Option<&SvgDocument>, title: &str) -> Result<Download, ExportError> {
    let document = document.ok_or(ExportError::MissingDocument)?;
    Ok(Download {
        file_name: format!("{}.svg", slugify(title)),
        mime: SVG_MIME,
        bytes: document.to_markup().into_bytes(),
    })
}

/// Rasterizes a styled clone of the document as `<slug>.png`.
///
/// The output is `raster_scale` times the measured size of the document,
/// painted over the theme background.
pub async fn export_raster(
    document: Option<&SvgDocument>,
    title: &str,
    context: &RasterContext,
) -> Result<Download, ExportError> {
    let document = document.ok_or(ExportError::MissingDocument)?;
    let (width, height) = measure(document, &context.config);
    debug!(width, height; "Measured diagram");

    let mut styled = document.clone();
    let mut sheet = StyleSheet::default();
    for style in styled.elements_by_name("style") {
        sheet.add(&styled.text_content(style));
    }
    sheet.add(&context.host_stylesheet);
    style::inline_computed_styles(&mut styled, &sheet);

    let root = styled.root();
    styled.set_attr(root, "width", format_length(width));
    styled.set_attr(root, "height", format_length(height));
    if styled.attr(root, "xmlns").is_none() {
        styled.set_attr(root, "xmlns", SVG_NAMESPACE);
    }

    let data_uri = format!(
        "{DATA_URI_PREFIX}{}",
        urlencoding::encode(&styled.to_markup())
    );
    let scale = context.config.raster_scale();
    let background = ThemeVariables::for_mode(context.theme).background().to_rgba8();

    let png = tokio::task::spawn_blocking(move || {
        rasterize(&data_uri, width, height, scale, background)
    })
    .await
    .map_err(io::Error::other)??;

    info!(bytes = png.len(); "Exported raster image");
    Ok(Download {
        file_name: format!("{}.png", slugify(title)),
        mime: PNG_MIME,
        bytes: png,
    })
}

/// Size of the document: `viewBox`, else numeric `width`/`height`, else the
/// configured fallback.
fn measure(document: &SvgDocument, config: &ExportConfig) -> (f32, f32) {
    let root = document.root();
    view_box_size(document, root)
        .or_else(|| {
            let width = parse_length(document.attr(root, "width")?)?;
            let height = parse_length(document.attr(root, "height")?)?;
            Some((width, height))
        })
        .unwrap_or((
            config.fallback_width() as f32,
            config.fallback_height() as f32,
        ))
}

fn view_box_size(document: &SvgDocument, root: NodeId) -> Option<(f32, f32)> {
    let values: Vec<f32> = document
        .attr(root, "viewBox")?
        .split([' ', ','])
        .filter(|part| !part.is_empty())
        .map(str::parse)
        .collect::<Result<_, _>>()
        .ok()?;
    match values[..] {
        [_, _, width, height] if is_usable(width) && is_usable(height) => Some((width, height)),
        _ => None,
    }
}

fn parse_length(value: &str) -> Option<f32> {
    let value = value.trim();
    let number = value.strip_suffix("px").unwrap_or(value).trim();
    number.parse().ok().filter(|&length| is_usable(length))
}

fn is_usable(length: f32) -> bool {
    length.is_finite() && length > 0.0
}

fn format_length(length: f32) -> String {
    format!("{length}")
}

fn rasterize(
    data_uri: &str,
    width: f32,
    height: f32,
    scale: f32,
    background: [u8; 4],
) -> Result<Vec<u8>, ExportError> {
    let encoded = data_uri
        .strip_prefix(DATA_URI_PREFIX)
        .ok_or_else(|| ExportError::Load("unexpected image reference".to_string()))?;
    let markup = urlencoding::decode(encoded).map_err(|err| ExportError::Load(err.to_string()))?;

    let mut options = usvg::Options::default();
    options.fontdb_mut().load_system_fonts();
    let tree =
        usvg::Tree::from_str(&markup, &options).map_err(|err| ExportError::Load(err.to_string()))?;

    let target_width = (width * scale).ceil();
    let target_height = (height * scale).ceil();
    let unsupported = || ExportError::SurfaceUnsupported {
        width: target_width as u32,
        height: target_height as u32,
    };
    if !is_usable(target_width) || !is_usable(target_height) || target_width > u32::MAX as f32 {
        return Err(unsupported());
    }
    let mut pixmap =
        tiny_skia::Pixmap::new(target_width as u32, target_height as u32).ok_or_else(unsupported)?;

    let [r, g, b, _] = background;
    pixmap.fill(tiny_skia::Color::from_rgba8(r, g, b, 255));

    let size = tree.size();
    let transform = tiny_skia::Transform::from_scale(
        target_width / size.width(),
        target_height / size.height(),
    );
    resvg::render(&tree, transform, &mut pixmap.as_mut());

    pixmap
        .encode_png()
        .map_err(|err| ExportError::Encode(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(markup: &str) -> SvgDocument {
        SvgDocument::parse(markup).unwrap()
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Order Processing"), "order-processing");
        assert_eq!(slugify("--Déjà vu--"), "déjà-vu");
        assert_eq!(slugify(""), "process-map");
    }

    #[test]
    fn test_export_vector() {
        let doc = document(r#"<svg viewBox="0 0 10 10"><rect/></svg>"#);
        let download = export_vector(Some(&doc), "Checkout Flow").unwrap();

        assert_eq!(download.file_name(), "checkout-flow.svg");
        assert_eq!(download.mime(), "image/svg+xml");
        assert_eq!(download.bytes(), doc.to_markup().as_bytes());
    }

    #[test]
    fn test_missing_document() {
        assert!(matches!(
            export_vector(None, "x"),
            Err(ExportError::MissingDocument)
        ));
    }

    #[test]
    fn test_measure_prefers_view_box() {
        let config = ExportConfig::default();
        let doc = document(r#"<svg viewBox="0,0,320,200" width="100%" height="50"/>"#);
        assert_eq!(measure(&doc, &config), (320.0, 200.0));

        let doc = document(r#"<svg width="120px" height="80"/>"#);
        assert_eq!(measure(&doc, &config), (120.0, 80.0));
    }

    #[test]
    fn test_measure_falls_back_to_configured_size() {
        let config = ExportConfig::default();
        let doc = document(r#"<svg width="100%" height="auto"/>"#);
        assert_eq!(measure(&doc, &config), (800.0, 600.0));

        let doc = document(r#"<svg viewBox="0 0 0 0"/>"#);
        assert_eq!(measure(&doc, &config), (800.0, 600.0));
    }

    #[tokio::test]
    async fn test_export_raster_produces_scaled_png() {
        let doc = document(
            r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 20 10"><rect width="20" height="10" fill="#ff0000"/></svg>"##,
        );
        let context = RasterContext::new(ThemeMode::Light, ExportConfig::default());

        let download = export_raster(Some(&doc), "Tiny", &context).await.unwrap();

        assert_eq!(download.file_name(), "tiny.png");
        assert_eq!(download.mime(), "image/png");
        let pixmap = tiny_skia::Pixmap::decode_png(download.bytes()).unwrap();
        assert_eq!((pixmap.width(), pixmap.height()), (80, 40));
    }

    #[tokio::test]
    async fn test_export_raster_without_size_uses_fallback() {
        let doc = document(r#"<svg><rect width="10" height="10"/></svg>"#);
        let context = RasterContext::new(ThemeMode::Dark, ExportConfig::new(1.0, 800, 600));

        let download = export_raster(Some(&doc), "", &context).await.unwrap();

        assert_eq!(download.file_name(), "process-map.png");
        let pixmap = tiny_skia::Pixmap::decode_png(download.bytes()).unwrap();
        assert_eq!((pixmap.width(), pixmap.height()), (800, 600));
        let [r, g, b, _] = ThemeVariables::for_mode(ThemeMode::Dark).background().to_rgba8();
        let corner = pixmap.pixel(799, 599).unwrap();
        assert_eq!((corner.red(), corner.green(), corner.blue()), (r, g, b));
    }

    #[test]
    fn test_directory_sink_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path());
        let download = Download {
            file_name: "diagram.svg".to_string(),
            mime: SVG_MIME,
            bytes: b"<svg/>".to_vec(),
        };

        let path = sink.save(&download).unwrap();

        assert_eq!(path, dir.path().join("diagram.svg"));
        assert_eq!(fs::read(&path).unwrap(), b"<svg/>");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}

//! Locating, reading and checking the CLI's TOML configuration.
//!
//! The first configuration found wins:
//!
//! | Source   | Path                                       |
//! |----------|--------------------------------------------|
//! | explicit | `--config <path>` (must exist)             |
//! | local    | `flowmark/config.toml` in the working dir  |
//! | system   | `<platform config dir>/flowmark/config.toml` |
//!
//! With none of them present the built-in defaults are used. A loaded file is
//! checked before use: the engine command must be non-empty, and the raster
//! scale and fallback surface must be positive.

use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use log::{debug, info};
use thiserror::Error;

use flowmark::{FlowmarkError, config::AppConfig};

const LOCAL_CONFIG: &str = "flowmark/config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("configuration file {0} does not exist")]
    MissingFile(PathBuf),

    #[error("invalid setting in {path}: {message}")]
    Invalid { path: PathBuf, message: String },
}

impl From<ConfigError> for FlowmarkError {
    fn from(err: ConfigError) -> Self {
        FlowmarkError::Config(err.to_string())
    }
}

/// Where a configuration file came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigSource {
    Explicit,
    Local,
    System,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConfigSource::Explicit => "explicit",
            ConfigSource::Local => "local",
            ConfigSource::System => "system",
        })
    }
}

/// Loads the first configuration found, or the defaults.
///
/// # Errors
///
/// Returns [`FlowmarkError::Config`] when an explicit path does not exist,
/// or when the selected file cannot be parsed or holds an invalid setting.
pub fn load_config(explicit_path: Option<impl AsRef<Path>>) -> Result<AppConfig, FlowmarkError> {
    let explicit = explicit_path.map(|path| path.as_ref().to_path_buf());
    let Some((source, path)) = locate(explicit) else {
        debug!("No configuration file found, using defaults");
        return Ok(AppConfig::default());
    };

    info!(source:% = source, path:% = path.display(); "Loading configuration");
    let config = read_config(&path)?;
    validate(&config, &path)?;
    Ok(config)
}

fn locate(explicit: Option<PathBuf>) -> Option<(ConfigSource, PathBuf)> {
    if let Some(path) = explicit {
        return Some((ConfigSource::Explicit, path));
    }

    let local = PathBuf::from(LOCAL_CONFIG);
    if local.is_file() {
        return Some((ConfigSource::Local, local));
    }

    let system = ProjectDirs::from("com", "flowmark", "flowmark")
        .map(|dirs| dirs.config_dir().join("config.toml"));
    match system {
        Some(path) if path.is_file() => Some((ConfigSource::System, path)),
        Some(path) => {
            debug!(path:% = path.display(); "No system configuration file");
            None
        }
        None => None,
    }
}

fn read_config(path: &Path) -> Result<AppConfig, FlowmarkError> {
    if !path.exists() {
        return Err(ConfigError::MissingFile(path.to_path_buf()).into());
    }

    let content = fs::read_to_string(path)?;
    toml::from_str(&content).map_err(|err| {
        FlowmarkError::from(ConfigError::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
    })
}

fn validate(config: &AppConfig, path: &Path) -> Result<(), ConfigError> {
    let invalid = |message: &str| ConfigError::Invalid {
        path: path.to_path_buf(),
        message: message.to_string(),
    };

    if config.render().engine().command().trim().is_empty() {
        return Err(invalid("render.engine.command is empty"));
    }
    let export = config.export();
    let scale = export.raster_scale();
    if !scale.is_finite() || scale <= 0.0 {
        return Err(invalid("export.raster_scale must be a positive number"));
    }
    if export.fallback_width() == 0 || export.fallback_height() == 0 {
        return Err(invalid("export.fallback_width and fallback_height must be non-zero"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use flowmark::theme::ThemeMode;

    fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_explicit_config_is_loaded() {
        let (_dir, path) = write_config(
            "[render]\ntheme = \"dark\"\n\n[render.engine]\ncommand = \"/opt/mmdc\"\n\n[export]\nraster_scale = 2.0\n",
        );

        let config = load_config(Some(&path)).unwrap();

        assert_eq!(config.render().theme(), ThemeMode::Dark);
        assert_eq!(config.render().engine().command(), "/opt/mmdc");
        assert!((config.export().raster_scale() - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_explicit_path_wins_over_discovery() {
        let path = PathBuf::from("custom.toml");
        assert_eq!(
            locate(Some(path.clone())),
            Some((ConfigSource::Explicit, path))
        );
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        let err = load_config(Some(&path)).unwrap_err();

        assert!(matches!(err, FlowmarkError::Config(message) if message.contains("absent.toml")));
    }

    #[test]
    fn test_invalid_toml_names_the_file() {
        let (_dir, path) = write_config("[render\ntheme = ");

        let err = load_config(Some(&path)).unwrap_err();

        assert!(matches!(err, FlowmarkError::Config(message) if message.contains("config.toml")));
    }

    #[test]
    fn test_empty_engine_command_is_rejected() {
        let (_dir, path) = write_config("[render.engine]\ncommand = \"  \"\n");

        let err = load_config(Some(&path)).unwrap_err();

        assert!(matches!(err, FlowmarkError::Config(message) if message.contains("render.engine.command")));
    }

    #[test]
    fn test_non_positive_raster_scale_is_rejected() {
        let (_dir, path) = write_config("[export]\nraster_scale = 0.0\n");

        assert!(matches!(load_config(Some(&path)), Err(FlowmarkError::Config(_))));
    }
}

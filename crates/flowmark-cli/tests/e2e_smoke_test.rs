use std::{fs, path::PathBuf};

use log::LevelFilter;
use tempfile::tempdir;

use flowmark::FlowmarkError;
use flowmark_cli::{Args, Command, run};

fn demos_dir() -> PathBuf {
    // Demos are at workspace root, relative to workspace not the crate
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .join("demos")
}

/// Collects all files with the given extension from a directory
fn collect_files(dir: PathBuf, extension: &str) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = fs::read_dir(&dir)
        .map(|entries| {
            entries
                .flatten()
                .map(|entry| entry.path())
                .filter(|path| {
                    path.is_file() && path.extension().and_then(|s| s.to_str()) == Some(extension)
                })
                .collect()
        })
        .unwrap_or_default();

    files.sort();
    files
}

fn args(command: Command) -> Args {
    Args {
        command,
        config: None,
        log_level: LevelFilter::Off,
    }
}

fn path_string(path: &std::path::Path) -> String {
    path.to_string_lossy().to_string()
}

#[test]
fn e2e_smoke_test_sanitize_and_outline_demos() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let demos = collect_files(demos_dir(), "mmd");
    assert!(!demos.is_empty(), "No demos found in demos/");

    for demo in &demos {
        let stem = demo.file_stem().unwrap().to_string_lossy().to_string();
        let sanitized = temp_dir.path().join(format!("{stem}.sanitized.mmd"));
        let outline = temp_dir.path().join(format!("{stem}.outline.json"));

        run(&args(Command::Sanitize {
            input: path_string(demo),
            output: Some(path_string(&sanitized)),
        }))
        .unwrap_or_else(|err| panic!("sanitize failed for {}: {err}", demo.display()));

        // Sanitizing is idempotent on its own output.
        let once = fs::read_to_string(&sanitized).unwrap();
        run(&args(Command::Sanitize {
            input: path_string(&sanitized),
            output: Some(path_string(&sanitized)),
        }))
        .unwrap();
        assert_eq!(fs::read_to_string(&sanitized).unwrap(), once);

        run(&args(Command::Outline {
            input: path_string(demo),
            json: true,
            output: Some(path_string(&outline)),
        }))
        .unwrap_or_else(|err| panic!("outline failed for {}: {err}", demo.display()));
        let json = fs::read_to_string(&outline).unwrap();
        assert!(json.trim_start().starts_with('['), "{json}");
        assert!(json.contains("\"title\""), "{json}");
    }
}

#[test]
fn e2e_order_intake_outline_groups_steps() {
    let temp_dir = tempdir().unwrap();
    let output = temp_dir.path().join("outline.txt");

    run(&args(Command::Outline {
        input: path_string(&demos_dir().join("order-intake.mmd")),
        json: false,
        output: Some(path_string(&output)),
    }))
    .unwrap();

    let text = fs::read_to_string(&output).unwrap();
    assert!(text.starts_with("Intake\n  1. Receive Order [start] n1\n"), "{text}");
    assert!(text.contains("Fulfilment\n"), "{text}");
    assert!(text.contains("[data] n4"), "{text}");
    assert!(text.contains("[end] n6"), "{text}");
}

#[test]
fn e2e_summarize_demo_description() {
    let temp_dir = tempdir().unwrap();
    let output = temp_dir.path().join("summary.txt");

    run(&args(Command::Summarize {
        input: path_string(&demos_dir().join("order-intake.txt")),
        output: Some(path_string(&output)),
    }))
    .unwrap();

    let text = fs::read_to_string(&output).unwrap();
    assert!(
        text.starts_with("Key steps: Intake, Payment, Fulfilment.\n"),
        "{text}"
    );
}

#[test]
fn e2e_render_with_missing_engine_fails() {
    let temp_dir = tempdir().unwrap();
    let config = temp_dir.path().join("config.toml");
    fs::write(
        &config,
        "[render.engine]\ncommand = \"flowmark-missing-engine-for-tests\"\n",
    )
    .unwrap();
    let output = temp_dir.path().join("out.svg");

    let result = run(&Args {
        command: Command::Render {
            input: path_string(&demos_dir().join("order-intake.mmd")),
            output: path_string(&output),
            png: None,
            theme: None,
            title: None,
            status: None,
            highlight: None,
        },
        config: Some(path_string(&config)),
        log_level: LevelFilter::Off,
    });

    assert!(matches!(result, Err(FlowmarkError::Render(_))), "{result:?}");
    assert!(!output.exists());
}

#[test]
fn e2e_missing_input_is_io_error() {
    let result = run(&args(Command::Sanitize {
        input: "does/not/exist.mmd".to_string(),
        output: None,
    }));

    assert!(matches!(result, Err(FlowmarkError::Io(_))));
}

#[test]
fn e2e_messy_labels_outline_keeps_declared_nodes() {
    let temp_dir = tempdir().unwrap();
    let output = temp_dir.path().join("messy.outline.json");

    run(&args(Command::Outline {
        input: path_string(&demos_dir().join("messy-labels.mmd")),
        json: true,
        output: Some(path_string(&output)),
    }))
    .unwrap();

    let json = fs::read_to_string(&output).unwrap();
    for label in [
        "Load config (v2)",
        "Retry? [max 3]",
        "Parse input / output",
        "See [docs/api] first",
    ] {
        assert!(json.contains(label), "missing {label:?} in {json}");
    }
}

#[test]
fn e2e_every_crate_readme_exists() {
    let crates_dir = demos_dir().parent().unwrap().join("crates");
    let manifests: Vec<PathBuf> = fs::read_dir(&crates_dir)
        .unwrap()
        .flatten()
        .map(|entry| entry.path().join("Cargo.toml"))
        .filter(|manifest| manifest.is_file())
        .collect();
    assert_eq!(manifests.len(), 4);

    for manifest in &manifests {
        let table: toml::Table = toml::from_str(&fs::read_to_string(manifest).unwrap()).unwrap();
        let Some(readme) = table["package"].get("readme").and_then(|value| value.as_str()) else {
            continue;
        };
        let path = manifest.parent().unwrap().join(readme);
        assert!(path.is_file(), "{} names missing {}", manifest.display(), path.display());
    }
}

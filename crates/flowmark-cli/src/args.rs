//! Command-line argument definitions for the Flowmark CLI.
//!
//! This module defines the [`Args`] structure parsed from the command line
//! using [`clap`]. Each [`Command`] maps onto one library operation; the
//! global flags select the configuration file and logging verbosity.

use clap::{Parser, Subcommand};
use log::LevelFilter;

use flowmark::theme::ThemeMode;

/// Command-line arguments for the Flowmark flowchart tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "warn", global = true)]
    pub log_level: LevelFilter,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Repair label defects in a flowchart source
    Sanitize {
        /// Path to the flowchart source
        input: String,

        /// Write the sanitized source here instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },

    /// List the sections and steps declared by a flowchart source
    Outline {
        /// Path to the flowchart source
        input: String,

        /// Emit the outline as JSON
        #[arg(long)]
        json: bool,

        /// Write the outline here instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Summarize a free-text workflow description
    Summarize {
        /// Path to the description text
        input: String,

        /// Write the summary here instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Render a flowchart to SVG and optionally PNG
    Render {
        /// Path to the flowchart source
        input: String,

        /// Path to the output SVG file
        #[arg(short, long, default_value = "out.svg")]
        output: String,

        /// Also export a PNG to this path
        #[arg(long)]
        png: Option<String>,

        /// Theme mode (light or dark); defaults to the configured theme
        #[arg(long)]
        theme: Option<ThemeMode>,

        /// Diagram title, used for download file names
        #[arg(long)]
        title: Option<String>,

        /// Path to a JSON object mapping step ids to statuses
        #[arg(long)]
        status: Option<String>,

        /// Step id to highlight
        #[arg(long)]
        highlight: Option<String>,
    },
}

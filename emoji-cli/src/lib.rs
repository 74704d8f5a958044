//! # Emoji Art CLI
//!
//! Command-line host for emoji art documents. It stands in for the document
//! chooser and the gesture layer: it creates and names documents, places
//! and edits glyphs, sets backgrounds, and prints grid layouts.
//!
//! ## Components
//!
//! - `CliArgs` - Command-line arguments parsed with clap
//! - `CliConfig` - Runtime settings derived from the arguments
//! - `App` - Executes one command against a document registry

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod commands;

pub use commands::{App, PALETTES_SLOT};

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use emoji_runtime::{AutosaveConfig, ControllerConfig, FetchConfig};

/// Command-line arguments for emoji-art.
#[derive(Debug, Clone, Parser)]
#[command(name = "emoji-art")]
#[command(about = "Create and edit emoji art documents")]
#[command(version)]
pub struct CliArgs {
    /// Directory holding documents and palettes
    #[arg(long, env = "EMOJI_ART_DATA_DIR", default_value = ".emoji-art")]
    pub data_dir: PathBuf,

    /// Give up on a background fetch after this many seconds
    #[arg(long, default_value = "30")]
    pub fetch_timeout_secs: u64,

    /// How long `background` waits for the image before returning
    #[arg(long, default_value = "10")]
    pub wait_secs: u64,

    /// What to do
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Create a document
    New {
        /// Display name; defaults to "Untitled", "Untitled 2", ...
        name: Option<String>,
    },
    /// List documents
    List,
    /// Rename a document
    Rename {
        /// Document id or name
        document: String,
        /// New name
        name: String,
    },
    /// Delete a document
    Delete {
        /// Document id or name
        document: String,
    },
    /// Print a document
    Show {
        /// Document id or name
        document: String,
        /// Print the stored JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
    /// Place a glyph, offset from the canvas center
    Add {
        /// Document id or name
        document: String,
        /// The glyph
        glyph: String,
        /// Horizontal offset
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        x: i64,
        /// Vertical offset
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        y: i64,
        /// Font size
        #[arg(long, default_value = "40")]
        size: i64,
    },
    /// Move a placed glyph
    Move {
        /// Document id or name
        document: String,
        /// Placement id
        id: u64,
        /// Horizontal offset
        #[arg(allow_hyphen_values = true)]
        dx: i64,
        /// Vertical offset
        #[arg(allow_hyphen_values = true)]
        dy: i64,
    },
    /// Scale a placed glyph
    Scale {
        /// Document id or name
        document: String,
        /// Placement id
        id: u64,
        /// Size multiplier
        factor: f64,
    },
    /// Set or clear the background image
    Background {
        /// Document id or name
        document: String,
        /// Image URL (http, https, file or data); omit to clear
        url: Option<String>,
    },
    /// Print the grid layout for a number of items
    Layout {
        /// Number of items
        count: usize,
        /// Available width
        width: f64,
        /// Available height
        height: f64,
        /// Item width / height
        #[arg(long, default_value = "1.0")]
        aspect: f64,
    },
    /// Manage glyph palettes
    #[command(subcommand)]
    Palette(PaletteCommand),
}

/// Palette commands. Palettes are addressed by name or by their glyphs.
#[derive(Debug, Clone, Subcommand)]
pub enum PaletteCommand {
    /// List palettes
    List,
    /// Add a palette
    Add {
        /// Glyphs
        glyphs: String,
        /// Display name
        name: String,
    },
    /// Rename a palette
    Rename {
        /// Palette name or glyphs
        palette: String,
        /// New name
        name: String,
    },
    /// Append glyphs to a palette
    AddGlyphs {
        /// Palette name or glyphs
        palette: String,
        /// Glyphs to append
        glyphs: String,
    },
    /// Remove one glyph from a palette
    RemoveGlyph {
        /// Palette name or glyphs
        palette: String,
        /// Glyph to remove
        glyph: String,
    },
    /// Print where each glyph of a palette would be drawn
    Layout {
        /// Palette name or glyphs
        palette: String,
        /// Available width
        #[arg(long, default_value = "300")]
        width: f64,
        /// Available height
        #[arg(long, default_value = "200")]
        height: f64,
    },
}

/// Runtime settings for the CLI.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Directory holding documents and palettes.
    pub data_dir: PathBuf,
    /// Background transport settings.
    pub fetch: FetchConfig,
    /// How long to wait for a background to load.
    pub wait: Duration,
    /// Autosave settings.
    pub autosave: AutosaveConfig,
    /// Controller settings.
    pub controller: ControllerConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".emoji-art"),
            fetch: FetchConfig::default(),
            wait: Duration::from_secs(10),
            autosave: AutosaveConfig::default(),
            controller: ControllerConfig::default(),
        }
    }
}

impl From<&CliArgs> for CliConfig {
    fn from(args: &CliArgs) -> Self {
        Self {
            data_dir: args.data_dir.clone(),
            fetch: FetchConfig {
                timeout: Some(Duration::from_secs(args.fetch_timeout_secs)),
                ..FetchConfig::default()
            },
            wait: Duration::from_secs(args.wait_secs),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_add_with_negative_offsets() {
        let args = CliArgs::try_parse_from([
            "emoji-art", "add", "Beach", "👙", "--x", "-20", "--y", "15",
        ])
        .expect("parse");
        match args.command {
            Command::Add {
                document,
                glyph,
                x,
                y,
                size,
            } => {
                assert_eq!(document, "Beach");
                assert_eq!(glyph, "👙");
                assert_eq!((x, y, size), (-20, 15, 40));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_move_with_negative_delta() {
        let args = CliArgs::try_parse_from(["emoji-art", "move", "Beach", "3", "-5", "7"])
            .expect("parse");
        assert!(matches!(
            args.command,
            Command::Move { id: 3, dx: -5, dy: 7, .. }
        ));
    }

    #[test]
    fn test_config_from_args() {
        let args = CliArgs::try_parse_from([
            "emoji-art",
            "--data-dir",
            "/tmp/art",
            "--fetch-timeout-secs",
            "5",
            "--wait-secs",
            "2",
            "list",
        ])
        .expect("parse");
        let config = CliConfig::from(&args);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/art"));
        assert_eq!(config.fetch.timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.wait, Duration::from_secs(2));
    }

    #[test]
    fn test_background_without_url_clears() {
        let args =
            CliArgs::try_parse_from(["emoji-art", "background", "Beach"]).expect("parse");
        assert!(matches!(args.command, Command::Background { url: None, .. }));
    }

    #[test]
    fn test_palette_subcommands() {
        let args = CliArgs::try_parse_from(["emoji-art", "palette", "add-glyphs", "Wardrobe", "🧦"])
            .expect("parse");
        assert!(matches!(
            args.command,
            Command::Palette(PaletteCommand::AddGlyphs { .. })
        ));
    }
}

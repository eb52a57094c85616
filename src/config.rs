//! Configuration management for the HTML editor.
//!
//! Handles:
//! - Command-line argument parsing
//! - The optional TOML settings file
//! - Template lookup locations

use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;

pub const DEFAULT_EDITOR_PORT: u16 = 8080;
pub const DEFAULT_PREVIEW_PORT: u16 = 8081;
pub const DEFAULT_PORT_ATTEMPTS: u16 = 20;
pub const DEFAULT_FILENAME: &str = "edited.html";

const APP_DIR: &str = "html-edit";

/// Command-line arguments for the HTML editor
#[derive(Debug, Parser)]
#[command(name = "html-edit")]
#[command(about = "Browser-based HTML editor with live preview")]
#[command(version)]
pub struct Args {
    /// HTML file to open
    pub file: Option<PathBuf>,

    #[arg(long, help = "First port to try for the editor (default 8080)")]
    pub editor_port: Option<u16>,

    #[arg(long, help = "First port to try for the preview (default 8081)")]
    pub preview_port: Option<u16>,

    #[arg(long, help = "Consecutive ports to try per service (default 20)")]
    pub port_attempts: Option<u16>,

    #[arg(long, help = "Address to listen on (default 127.0.0.1)")]
    pub bind: Option<IpAddr>,

    /// Template for new documents
    #[arg(long)]
    pub template: Option<PathBuf>,

    /// Settings file to use instead of the per-user one
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Do not open a browser tab on startup")]
    pub no_browser: bool,

    #[arg(
        long,
        default_value = "info",
        help = "Log level (trace, debug, info, warn, error)"
    )]
    pub log_level: String,
}

/// Contents of `config.toml`
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub editor_port: Option<u16>,
    pub preview_port: Option<u16>,
    pub port_attempts: Option<u16>,
    pub bind_address: Option<IpAddr>,
    pub open_browser: Option<bool>,
    pub template: Option<PathBuf>,
    pub default_filename: Option<PathBuf>,
}

impl Settings {
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("invalid settings")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("in {}", path.display()))
    }

    /// Per-user settings file, if one exists
    pub fn user_file() -> Option<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR).join("config.toml"))
            .filter(|path| path.is_file())
    }
}

/// Combined configuration from all sources
#[derive(Debug, Clone)]
pub struct Config {
    /// File named on the command line
    pub file: Option<PathBuf>,
    pub bind_address: IpAddr,
    pub editor_port: u16,
    pub preview_port: u16,
    pub port_attempts: u16,
    pub open_browser: bool,
    /// Backing path assigned on first save
    pub default_filename: PathBuf,
    /// Template locations, highest priority first
    pub template_candidates: Vec<PathBuf>,
    pub log_level: String,
}

impl Config {
    /// Create configuration from command-line arguments
    pub fn from_args_and_env() -> Result<Self> {
        Self::from_args(Args::parse())
    }

    /// Create configuration from explicit arguments (useful for testing)
    pub fn from_args(args: Args) -> Result<Self> {
        let settings = match args.config.as_deref() {
            Some(path) => Settings::load(path)?,
            None => match Settings::user_file() {
                Some(path) => Settings::load(&path)?,
                None => Settings::default(),
            },
        };

        Ok(Self::merge(args, settings))
    }

    /// Command line wins over settings, settings over defaults
    pub fn merge(args: Args, settings: Settings) -> Self {
        let mut template_candidates = Vec::new();

        if let Some(path) = args.template {
            template_candidates.push(path);
        }
        if let Some(path) = settings.template {
            template_candidates.push(path);
        }
        if let Some(config_dir) = dirs::config_dir() {
            template_candidates.push(config_dir.join(APP_DIR).join("template.html"));
        }
        if let Some(home_dir) = dirs::home_dir() {
            template_candidates.push(home_dir.join(".html-edit").join("template.html"));
        }

        Config {
            file: args.file,
            bind_address: args
                .bind
                .or(settings.bind_address)
                .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST)),
            editor_port: args
                .editor_port
                .or(settings.editor_port)
                .unwrap_or(DEFAULT_EDITOR_PORT),
            preview_port: args
                .preview_port
                .or(settings.preview_port)
                .unwrap_or(DEFAULT_PREVIEW_PORT),
            port_attempts: args
                .port_attempts
                .or(settings.port_attempts)
                .unwrap_or(DEFAULT_PORT_ATTEMPTS),
            open_browser: !args.no_browser && settings.open_browser.unwrap_or(true),
            default_filename: settings
                .default_filename
                .unwrap_or_else(|| PathBuf::from(DEFAULT_FILENAME)),
            template_candidates,
            log_level: args.log_level,
        }
    }

    /// Ports the preview scan may try. A preview starting inside the editor's
    /// window stops at the same upper port; otherwise it gets a full window.
    pub fn preview_attempts(&self) -> u16 {
        if self.editor_port == 0 {
            return self.port_attempts;
        }
        match self.preview_port.checked_sub(self.editor_port) {
            Some(offset) if offset > 0 && offset < self.port_attempts => {
                self.port_attempts - offset
            }
            _ => self.port_attempts,
        }
    }
}

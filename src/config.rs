use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::analysis::{TrailingFrame, DEFAULT_FRAME_SIZE, DEFAULT_NUM_BARS};

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub analysis: AnalysisSection,
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default = "default_crf")]
    pub crf: u32,
    #[serde(default = "default_codec")]
    pub codec: String,
    #[serde(default = "default_pix_fmt")]
    pub pix_fmt: String,
    #[serde(default)]
    pub font: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct AnalysisSection {
    #[serde(default = "default_frame_size")]
    pub frame_size: usize,
    #[serde(default = "default_num_bars")]
    pub num_bars: usize,
    #[serde(default = "default_magnitude_gain")]
    pub magnitude_gain: f64,
    #[serde(default = "default_height_scale")]
    pub height_scale: f64,
    #[serde(default)]
    pub trailing: TrailingFrame,
    #[serde(default)]
    pub lazy: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            fps: default_fps(),
            crf: default_crf(),
            codec: default_codec(),
            pix_fmt: default_pix_fmt(),
            font: None,
        }
    }
}

impl Default for AnalysisSection {
    fn default() -> Self {
        Self {
            frame_size: default_frame_size(),
            num_bars: default_num_bars(),
            magnitude_gain: default_magnitude_gain(),
            height_scale: default_height_scale(),
            trailing: TrailingFrame::default(),
            lazy: false,
        }
    }
}

fn default_width() -> u32 { 1920 }
fn default_height() -> u32 { 1080 }
fn default_fps() -> u32 { 60 }
fn default_crf() -> u32 { 18 }
fn default_codec() -> String { "libx264".into() }
fn default_pix_fmt() -> String { "yuv420p".into() }
fn default_frame_size() -> usize { DEFAULT_FRAME_SIZE }
fn default_num_bars() -> usize { DEFAULT_NUM_BARS }
fn default_magnitude_gain() -> f64 { 100.0 }
fn default_height_scale() -> f64 { 10.0 }

/// Explicit path first, then `./musvis.toml`, then the user config dirs.
pub fn find_config(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from("musvis.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("musvis").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("musvis").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}

pub fn parse_config(content: &str) -> Result<Config, toml::de::Error> {
    toml::from_str(content)
}

pub fn load_config(path: &Path) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    match parse_config(&content) {
        Ok(cfg) => Some(cfg),
        Err(err) => {
            log::warn!("Invalid config {}: {}", path.display(), err);
            None
        }
    }
}

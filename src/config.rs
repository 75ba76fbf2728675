use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::cli::Cli;
use crate::history::DEFAULT_CAPACITY;
use crate::meter::{WeightingMode, DEFAULT_SMOOTHING};
use crate::regulation::RegulationTable;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub meter: MeterConfig,
    #[serde(default)]
    pub regulation: RegulationTable,
    #[serde(default)]
    pub history: HistoryConfig,
}

#[derive(Debug, Deserialize)]
pub struct MeterConfig {
    #[serde(default)]
    pub weighting: WeightingMode,
    #[serde(default = "default_offset")]
    pub offset: f64,
    #[serde(default = "default_smoothing")]
    pub smoothing: f64,
    #[serde(default = "default_fft_size")]
    pub fft_size: usize,
    #[serde(default = "default_fps")]
    pub fps: u32,
}

#[derive(Debug, Deserialize)]
pub struct HistoryConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            weighting: WeightingMode::default(),
            offset: default_offset(),
            smoothing: default_smoothing(),
            fft_size: default_fft_size(),
            fps: default_fps(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: None,
            capacity: default_capacity(),
        }
    }
}

impl MeterConfig {
    /// Replaces values with any given explicitly on the command line.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(weighting) = cli.weighting { self.weighting = weighting; }
        if let Some(offset) = cli.offset { self.offset = offset; }
        if let Some(smoothing) = cli.smoothing { self.smoothing = smoothing; }
        if let Some(fft_size) = cli.fft_size { self.fft_size = fft_size; }
        if let Some(fps) = cli.fps { self.fps = fps; }
    }
}

fn default_offset() -> f64 { 90.0 }
fn default_smoothing() -> f64 { DEFAULT_SMOOTHING }
fn default_fft_size() -> usize { 2048 }
fn default_fps() -> u32 { 60 }
fn default_capacity() -> usize { DEFAULT_CAPACITY }

pub fn load_config(path: &Path) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(err) => {
            log::warn!("Invalid config {}: {}", path.display(), err);
            None
        }
    }
}

/// `./decibel.toml`, then `<config_dir>/decibel/config.toml`.
pub fn find_config() -> Option<PathBuf> {
    let local = PathBuf::from("decibel.toml");
    if local.exists() {
        return Some(local);
    }
    dirs::config_dir()
        .map(|dir| dir.join("decibel").join("config.toml"))
        .filter(|p| p.exists())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.meter.weighting, WeightingMode::A);
        assert_eq!(config.meter.offset, 90.0);
        assert_eq!(config.meter.smoothing, 0.08);
        assert_eq!(config.meter.fft_size, 2048);
        assert_eq!(config.history.capacity, 10);
        assert_eq!(config.regulation.day_limit, 60.0);
    }

    #[test]
    fn parses_all_sections() {
        let config: Config = toml::from_str(
            r#"
            [meter]
            weighting = "C"
            offset = 94.5
            fft_size = 4096

            [regulation]
            night_limit = 45.0

            [history]
            path = "/tmp/levels.json"
            capacity = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.meter.weighting, WeightingMode::C);
        assert_eq!(config.meter.offset, 94.5);
        assert_eq!(config.meter.fft_size, 4096);
        assert_eq!(config.meter.fps, 60);
        assert_eq!(config.regulation.night_limit, 45.0);
        assert_eq!(config.history.path, Some(PathBuf::from("/tmp/levels.json")));
        assert_eq!(config.history.capacity, 5);
    }

    #[test]
    fn lowercase_weighting_is_accepted() {
        let config: Config = toml::from_str("[meter]\nweighting = \"z\"").unwrap();
        assert_eq!(config.meter.weighting, WeightingMode::Z);
    }

    #[test]
    fn explicit_cli_values_win_even_at_defaults() {
        use clap::Parser;

        let mut meter: MeterConfig =
            toml::from_str("weighting = \"C\"\noffset = 94.0\nfps = 30").unwrap();
        let cli = Cli::parse_from(["decibel", "-w", "a", "--offset", "90", "x.wav"]);
        meter.apply_cli(&cli);
        assert_eq!(meter.weighting, WeightingMode::A);
        assert_eq!(meter.offset, 90.0);
        // Not given on the command line
        assert_eq!(meter.fps, 30);
        assert_eq!(meter.fft_size, 2048);
    }

    #[test]
    fn unreadable_config_is_none() {
        assert!(load_config(Path::new("/nonexistent/decibel.toml")).is_none());
    }
}

use clap::Parser;
use std::path::PathBuf;

use crate::meter::WeightingMode;

#[derive(Parser, Debug)]
#[command(name = "decibel", about = "Sound level meter: weighted SPL, Leq and peak from audio recordings")]
pub struct Cli {
    /// Input audio files (WAV, MP3, FLAC, OGG), measured in order
    pub inputs: Vec<PathBuf>,

    // Meter options left unset fall back to the config file, then to
    // the defaults in `config::MeterConfig`.

    /// Frequency weighting (a, c, z) [default: a]
    #[arg(short, long)]
    pub weighting: Option<WeightingMode>,

    /// Calibration offset in dB, added to every reading [default: 90]
    #[arg(short, long, allow_negative_numbers = true)]
    pub offset: Option<f64>,

    /// Display smoothing factor (0.0-1.0], higher = more responsive [default: 0.08]
    #[arg(long)]
    pub smoothing: Option<f64>,

    /// FFT size (power of two, 32-32768) [default: 2048]
    #[arg(long)]
    pub fft_size: Option<usize>,

    /// Meter frames per second [default: 60]
    #[arg(long)]
    pub fps: Option<u32>,

    /// Start a fresh session (reset Leq and peak) for each input file
    #[arg(long)]
    pub reset_between: bool,

    /// Print a readout line for every frame
    #[arg(long)]
    pub trace: bool,

    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,

    /// Save the final reading to the measurement history
    #[arg(long)]
    pub save: bool,

    /// Print the measurement history and exit
    #[arg(long)]
    pub history: bool,

    /// Config file (defaults to ./decibel.toml or the user config directory)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = Cli::parse_from(["decibel", "street.wav"]);
        assert_eq!(cli.inputs, vec![PathBuf::from("street.wav")]);
        assert_eq!(cli.weighting, None);
        assert_eq!(cli.offset, None);
        assert_eq!(cli.fft_size, None);
        assert!(!cli.reset_between);
    }

    #[test]
    fn parses_weighting_and_negative_offset() {
        let cli = Cli::parse_from(["decibel", "-w", "C", "--offset", "-3.5", "a.wav", "b.wav"]);
        assert_eq!(cli.weighting, Some(WeightingMode::C));
        assert_eq!(cli.offset, Some(-3.5));
        assert_eq!(cli.inputs.len(), 2);
    }

    #[test]
    fn rejects_unknown_weighting() {
        assert!(Cli::try_parse_from(["decibel", "-w", "b", "a.wav"]).is_err());
    }
}

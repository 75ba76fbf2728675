use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::{MeterError, MeterResult};
use super::{MAX_FFT_SIZE, MIN_FFT_SIZE};

/// Normalizes the A curve to 0 dB at 1 kHz.
const A_OFFSET: f64 = 2.0;
/// Normalizes the C curve to 0 dB at 1 kHz.
const C_OFFSET: f64 = 0.06;
/// Correction reported for the DC bin (and any non-positive frequency).
pub const DC_SENTINEL_DB: f32 = -100.0;

// IEC 61672-1 pole frequencies (Hz)
const F1: f64 = 20.6;
const F2: f64 = 107.7;
const F3: f64 = 737.9;
const F4: f64 = 12194.0;

/// Frequency weighting applied before level aggregation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeightingMode {
    #[default]
    #[serde(alias = "a")]
    A,
    #[serde(alias = "c")]
    C,
    /// No weighting (flat, "Z").
    #[serde(alias = "z", alias = "none", alias = "None")]
    Z,
}

impl WeightingMode {
    pub fn unit(self) -> &'static str {
        match self {
            WeightingMode::A => "dB(A)",
            WeightingMode::C => "dB(C)",
            WeightingMode::Z => "dB(Z)",
        }
    }
}

impl fmt::Display for WeightingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WeightingMode::A => "A",
            WeightingMode::C => "C",
            WeightingMode::Z => "Z",
        };
        f.write_str(s)
    }
}

impl FromStr for WeightingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "a" => Ok(WeightingMode::A),
            "c" => Ok(WeightingMode::C),
            "z" | "none" | "flat" => Ok(WeightingMode::Z),
            other => Err(format!(
                "Unknown weighting '{}'. Valid values: a, c, z",
                other
            )),
        }
    }
}

/// A-weighting correction in dB at frequency `f` (Hz).
pub fn a_weighting_db(f: f64) -> f64 {
    if f <= 0.0 {
        return DC_SENTINEL_DB as f64;
    }
    let f2 = f * f;
    let ra = (F4 * F4 * f2 * f2)
        / ((f2 + F1 * F1) * ((f2 + F2 * F2) * (f2 + F3 * F3)).sqrt() * (f2 + F4 * F4));
    20.0 * ra.log10() + A_OFFSET
}

/// C-weighting correction in dB at frequency `f` (Hz).
pub fn c_weighting_db(f: f64) -> f64 {
    if f <= 0.0 {
        return DC_SENTINEL_DB as f64;
    }
    let f2 = f * f;
    let rc = (F4 * F4 * f2) / ((f2 + F1 * F1) * (f2 + F4 * F4));
    20.0 * rc.log10() + C_OFFSET
}

/// Centre frequency of bin `index` for a transform of `fft_size` points.
pub fn bin_frequency(index: usize, sample_rate: u32, fft_size: usize) -> f64 {
    index as f64 * sample_rate as f64 / fft_size as f64
}

/// Rejects configurations no curve (or spectrum) can be built for.
pub fn validate_transform(sample_rate: u32, fft_size: usize) -> MeterResult<()> {
    if sample_rate == 0 {
        return Err(MeterError::InvalidSampleRate(sample_rate));
    }
    if !fft_size.is_power_of_two() || !(MIN_FFT_SIZE..=MAX_FFT_SIZE).contains(&fft_size) {
        return Err(MeterError::InvalidTransformSize(fft_size));
    }
    Ok(())
}

/// Per-bin dB corrections, one per bin of a `fft_size / 2` spectrum.
#[derive(Clone, Debug, PartialEq)]
pub struct WeightingCurve {
    values: Vec<f32>,
}

impl WeightingCurve {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }
}

/// Builds the correction curve for `mode`. `Z` has no curve.
pub fn build_curve(
    sample_rate: u32,
    fft_size: usize,
    mode: WeightingMode,
) -> MeterResult<Option<WeightingCurve>> {
    validate_transform(sample_rate, fft_size)?;

    let formula: fn(f64) -> f64 = match mode {
        WeightingMode::A => a_weighting_db,
        WeightingMode::C => c_weighting_db,
        WeightingMode::Z => return Ok(None),
    };

    let values = (0..fft_size / 2)
        .map(|i| formula(bin_frequency(i, sample_rate, fft_size)) as f32)
        .collect();

    Ok(Some(WeightingCurve { values }))
}

/// Both weighting curves precomputed for one (sample rate, transform size) pair.
#[derive(Clone, Debug)]
pub struct WeightingModel {
    sample_rate: u32,
    fft_size: usize,
    a: WeightingCurve,
    c: WeightingCurve,
}

impl WeightingModel {
    pub fn new(sample_rate: u32, fft_size: usize) -> MeterResult<Self> {
        let missing = || MeterError::InvalidTransformSize(fft_size);
        let a = build_curve(sample_rate, fft_size, WeightingMode::A)?.ok_or_else(missing)?;
        let c = build_curve(sample_rate, fft_size, WeightingMode::C)?.ok_or_else(missing)?;

        log::debug!(
            "Built weighting curves: {} bins, {}Hz, fft_size={}",
            a.len(),
            sample_rate,
            fft_size
        );

        Ok(Self {
            sample_rate,
            fft_size,
            a,
            c,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    pub fn curve(&self, mode: WeightingMode) -> Option<&WeightingCurve> {
        match mode {
            WeightingMode::A => Some(&self.a),
            WeightingMode::C => Some(&self.c),
            WeightingMode::Z => None,
        }
    }
}

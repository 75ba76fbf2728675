use thiserror::Error;

pub type MeterResult<T> = Result<T, MeterError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MeterError {
    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(u32),

    #[error("Invalid transform size: {0} (expected a power of two between {min} and {max})", min = super::MIN_FFT_SIZE, max = super::MAX_FFT_SIZE)]
    InvalidTransformSize(usize),

    #[error("Spectrum length mismatch: expected {expected} bins, got {actual}")]
    SpectrumLength { expected: usize, actual: usize },

    #[error("Invalid calibration offset: {0} (must be finite)")]
    InvalidOffset(f64),

    #[error("Invalid smoothing factor: {0} (must be in (0, 1])")]
    InvalidSmoothingFactor(f64),
}

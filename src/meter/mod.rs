//! Sound level measurement: frequency weighting, SPL/Leq/peak aggregation
//! and display smoothing. Pure computation over in-memory spectra.

pub mod aggregator;
pub mod error;
pub mod smoothing;
pub mod weighting;

pub use aggregator::LevelAggregator;
pub use smoothing::{DisplaySmoother, DEFAULT_SMOOTHING};
pub use weighting::WeightingMode;

/// Smallest supported transform size.
pub const MIN_FFT_SIZE: usize = 32;
/// Largest supported transform size.
pub const MAX_FFT_SIZE: usize = 32768;

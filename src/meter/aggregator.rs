use super::error::{MeterError, MeterResult};
use super::weighting::{WeightingMode, WeightingModel};

/// Lower bound on mean linear power before conversion back to dB.
const POWER_FLOOR: f64 = 1e-10;

#[inline]
fn db_to_power(db: f64) -> f64 {
    10f64.powf(db / 10.0)
}

#[inline]
fn power_to_db(power: f64) -> f64 {
    10.0 * power.log10()
}

/// Session accumulator behind Leq and peak.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AggregationState {
    /// Sum of per-frame linear power.
    pub energy_sum: f64,
    pub sample_count: u64,
    /// `None` until the first frame of the session.
    pub peak: Option<f64>,
}

impl AggregationState {
    fn record(&mut self, spl: f64) {
        if self.peak.map_or(true, |p| spl > p) {
            self.peak = Some(spl);
        }
        self.energy_sum += db_to_power(spl);
        self.sample_count += 1;
    }
}

/// Turns dB magnitude spectra into weighted SPL and tracks Leq/peak.
///
/// One instance per measurement session. Not meant to be shared across
/// threads; frames are processed one at a time, in order.
#[derive(Clone, Debug)]
pub struct LevelAggregator {
    weighting: WeightingModel,
    state: AggregationState,
}

impl LevelAggregator {
    pub fn new(sample_rate: u32, fft_size: usize) -> MeterResult<Self> {
        Ok(Self::with_model(WeightingModel::new(sample_rate, fft_size)?))
    }

    pub fn with_model(weighting: WeightingModel) -> Self {
        Self {
            weighting,
            state: AggregationState::default(),
        }
    }

    pub fn weighting(&self) -> &WeightingModel {
        &self.weighting
    }

    pub fn state(&self) -> &AggregationState {
        &self.state
    }

    /// Instantaneous weighted SPL for one frame, folded into Leq and peak.
    ///
    /// `spectrum` must hold exactly `fft_size / 2` dB magnitudes and the
    /// offset must be finite; rejected calls leave the session untouched.
    /// Non-finite corrected bin values contribute no power.
    pub fn process_frame(
        &mut self,
        spectrum: &[f32],
        mode: WeightingMode,
        calibration_offset: f64,
    ) -> MeterResult<f64> {
        let expected = self.weighting.bin_count();
        if spectrum.len() != expected {
            return Err(MeterError::SpectrumLength {
                expected,
                actual: spectrum.len(),
            });
        }
        if !calibration_offset.is_finite() {
            return Err(MeterError::InvalidOffset(calibration_offset));
        }

        let total: f64 = match self.weighting.curve(mode) {
            Some(curve) => spectrum
                .iter()
                .zip(curve.as_slice())
                .map(|(&m, &w)| bin_power(m as f64 + w as f64))
                .sum(),
            None => spectrum.iter().map(|&m| bin_power(m as f64)).sum(),
        };

        let mean = total / expected as f64;
        let spl = power_to_db(mean.max(POWER_FLOOR)) + calibration_offset;

        self.state.record(spl);
        log::trace!(
            "frame {}: spl={:.2} {} (offset {:.1})",
            self.state.sample_count,
            spl,
            mode.unit(),
            calibration_offset
        );

        Ok(spl)
    }

    /// Energy-averaged level over the session, 0 before the first frame.
    pub fn leq(&self) -> f64 {
        if self.state.sample_count == 0 {
            return 0.0;
        }
        power_to_db(self.state.energy_sum / self.state.sample_count as f64)
    }

    /// Highest instantaneous SPL of the session, 0 before the first frame.
    pub fn peak(&self) -> f64 {
        self.state.peak.unwrap_or(0.0)
    }

    pub fn frames(&self) -> u64 {
        self.state.sample_count
    }

    pub fn reset(&mut self) {
        self.state = AggregationState::default();
    }
}

fn bin_power(db: f64) -> f64 {
    if db.is_finite() {
        db_to_power(db)
    } else {
        // -inf is silence; NaN and +inf carry no usable level
        0.0
    }
}

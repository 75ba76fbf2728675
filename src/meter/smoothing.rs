use super::error::{MeterError, MeterResult};

/// Display smoothing used by the meter readout.
pub const DEFAULT_SMOOTHING: f64 = 0.08;

/// Single-pole exponential filter for the displayed level.
///
/// Holds its own state and never feeds back into Leq or peak.
#[derive(Clone, Debug)]
pub struct DisplaySmoother {
    factor: f64,
    value: f64,
}

impl DisplaySmoother {
    pub fn new(factor: f64) -> MeterResult<Self> {
        if !(factor > 0.0 && factor <= 1.0) {
            return Err(MeterError::InvalidSmoothingFactor(factor));
        }
        Ok(Self { factor, value: 0.0 })
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Moves the displayed value toward `spl` and returns it.
    pub fn update(&mut self, spl: f64) -> f64 {
        self.value += (spl - self.value) * self.factor;
        self.value
    }
}

impl Default for DisplaySmoother {
    fn default() -> Self {
        Self {
            factor: DEFAULT_SMOOTHING,
            value: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn single_step() {
        let mut s = DisplaySmoother::new(0.08).unwrap();
        assert_abs_diff_eq!(s.update(80.0), 6.4, epsilon = 1e-9);
    }

    #[test]
    fn converges_to_constant_input() {
        let mut s = DisplaySmoother::default();
        for _ in 0..500 {
            s.update(80.0);
        }
        assert_abs_diff_eq!(s.value(), 80.0, epsilon = 1e-6);
    }

    #[test]
    fn factor_one_tracks_immediately() {
        let mut s = DisplaySmoother::new(1.0).unwrap();
        assert_eq!(s.update(42.0), 42.0);
        assert_eq!(s.update(-3.0), -3.0);
    }

    #[test]
    fn rejects_out_of_range_factor() {
        for bad in [0.0, -0.5, 1.5, f64::NAN] {
            assert!(DisplaySmoother::new(bad).is_err(), "{} accepted", bad);
        }
    }
}

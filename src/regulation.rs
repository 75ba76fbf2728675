//! Community noise limits by time of day (category 2 area, dB(A)).

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Period {
    Day,
    Evening,
    Night,
}

impl Period {
    /// Day 07:00-20:00, evening 20:00-23:00, night 23:00-07:00.
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            7..=19 => Period::Day,
            20..=22 => Period::Evening,
            _ => Period::Night,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Period::Day => "Day (07:00-20:00)",
            Period::Evening => "Evening (20:00-23:00)",
            Period::Night => "Night (23:00-07:00)",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Limit per period, in dB.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct RegulationTable {
    #[serde(default = "default_day_limit")]
    pub day_limit: f64,
    #[serde(default = "default_evening_limit")]
    pub evening_limit: f64,
    #[serde(default = "default_night_limit")]
    pub night_limit: f64,
}

impl Default for RegulationTable {
    fn default() -> Self {
        Self {
            day_limit: default_day_limit(),
            evening_limit: default_evening_limit(),
            night_limit: default_night_limit(),
        }
    }
}

fn default_day_limit() -> f64 { 60.0 }
fn default_evening_limit() -> f64 { 50.0 }
fn default_night_limit() -> f64 { 50.0 }

impl RegulationTable {
    pub fn for_hour(&self, hour: u32) -> Regulation {
        let period = Period::from_hour(hour);
        let limit = match period {
            Period::Day => self.day_limit,
            Period::Evening => self.evening_limit,
            Period::Night => self.night_limit,
        };
        Regulation { period, limit }
    }

    pub fn current(&self) -> Regulation {
        use chrono::Timelike;
        self.for_hour(chrono::Local::now().hour())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Regulation {
    pub period: Period,
    pub limit: f64,
}

impl Regulation {
    pub fn is_violation(&self, level: f64) -> bool {
        level > self.limit
    }
}

/// Coarse loudness class of a displayed level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum NoiseBand {
    Quiet,
    Moderate,
    Loud,
}

impl NoiseBand {
    pub fn classify(level: f64) -> Self {
        if level < 50.0 {
            NoiseBand::Quiet
        } else if level < 75.0 {
            NoiseBand::Moderate
        } else {
            NoiseBand::Loud
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_boundaries() {
        assert_eq!(Period::from_hour(6), Period::Night);
        assert_eq!(Period::from_hour(7), Period::Day);
        assert_eq!(Period::from_hour(19), Period::Day);
        assert_eq!(Period::from_hour(20), Period::Evening);
        assert_eq!(Period::from_hour(22), Period::Evening);
        assert_eq!(Period::from_hour(23), Period::Night);
        assert_eq!(Period::from_hour(0), Period::Night);
    }

    #[test]
    fn default_limits() {
        let table = RegulationTable::default();
        assert_eq!(table.for_hour(12).limit, 60.0);
        assert_eq!(table.for_hour(21).limit, 50.0);
        assert_eq!(table.for_hour(3).limit, 50.0);
    }

    #[test]
    fn violation_is_strictly_above_limit() {
        let reg = RegulationTable::default().for_hour(12);
        assert!(!reg.is_violation(60.0));
        assert!(reg.is_violation(60.1));
        assert!(!reg.is_violation(42.0));
    }

    #[test]
    fn partial_table_from_toml() {
        let table: RegulationTable = toml::from_str("day_limit = 65.0").unwrap();
        assert_eq!(table.day_limit, 65.0);
        assert_eq!(table.night_limit, 50.0);
    }

    #[test]
    fn bands() {
        assert_eq!(NoiseBand::classify(49.9), NoiseBand::Quiet);
        assert_eq!(NoiseBand::classify(50.0), NoiseBand::Moderate);
        assert_eq!(NoiseBand::classify(74.9), NoiseBand::Moderate);
        assert_eq!(NoiseBand::classify(75.0), NoiseBand::Loud);
    }
}

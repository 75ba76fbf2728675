use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::meter::WeightingMode;

pub const DEFAULT_CAPACITY: usize = 10;

/// One saved meter reading. Levels are rounded to whole dB.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    pub id: String,
    pub db: i64,
    pub leq: i64,
    pub peak: i64,
    pub weighting: WeightingMode,
    /// Where the reading came from (input file)
    #[serde(default)]
    pub source: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl MeasurementRecord {
    pub fn new(
        db: f64,
        leq: f64,
        peak: f64,
        weighting: WeightingMode,
        source: Option<String>,
    ) -> Self {
        let timestamp = Utc::now();
        Self {
            id: format!("local-{}", timestamp.timestamp_millis()),
            db: db.round() as i64,
            leq: leq.round() as i64,
            peak: peak.round() as i64,
            weighting,
            source,
            timestamp,
        }
    }
}

/// The latest `capacity` records, newest first, kept in a JSON file.
pub struct HistoryStore {
    path: PathBuf,
    capacity: usize,
    records: Vec<MeasurementRecord>,
}

impl HistoryStore {
    pub fn open(path: &Path, capacity: usize) -> Result<Self> {
        let mut records = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read history: {}", path.display()))?;
            match serde_json::from_str::<Vec<MeasurementRecord>>(&content) {
                Ok(records) => records,
                Err(err) => {
                    log::warn!("Ignoring corrupt history {}: {}", path.display(), err);
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        records.truncate(capacity);

        Ok(Self {
            path: path.to_path_buf(),
            capacity,
            records,
        })
    }

    pub fn records(&self) -> &[MeasurementRecord] {
        &self.records
    }

    /// Prepends `record`, drops the oldest beyond capacity, and writes the file.
    pub fn push(&mut self, record: MeasurementRecord) -> Result<()> {
        self.records.insert(0, record);
        self.records.truncate(self.capacity);
        self.save()
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create history directory: {}", parent.display())
                })?;
            }
        }
        let json = serde_json::to_string_pretty(&self.records)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write history: {}", self.path.display()))?;
        log::debug!("Saved {} record(s) to {}", self.records.len(), self.path.display());
        Ok(())
    }
}

/// `<data_dir>/decibel/history.json`, or the working directory as a fallback.
pub fn default_history_path() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("decibel").join("history.json"))
        .unwrap_or_else(|| PathBuf::from("decibel-history.json"))
}

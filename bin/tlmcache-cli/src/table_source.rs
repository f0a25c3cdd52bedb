//! File-backed telemetry source
//!
//! Reads a JSON-lines telemetry table, one serialized `FrameSample` per
//! line. Blank lines are skipped.

use chrono::{DateTime, Utc};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tlmcache::{SourceResult, TelemetrySource};
use tlmcache_common::FrameSample;
use tracing::debug;

pub struct TableSource {
    path: PathBuf,
    samples: Option<Vec<FrameSample>>,
}

impl TableSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            samples: None,
        }
    }

    fn load(path: &Path) -> SourceResult<Vec<FrameSample>> {
        let reader = BufReader::new(File::open(path)?);
        let mut samples = Vec::new();
        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let sample: FrameSample = serde_json::from_str(&line)
                .map_err(|e| format!("{}:{}: {}", path.display(), lineno + 1, e))?;
            samples.push(sample);
        }
        Ok(samples)
    }
}

impl TelemetrySource for TableSource {
    fn name(&self) -> &str {
        "telemetry-table"
    }

    fn connect(&mut self) -> SourceResult<()> {
        let samples = Self::load(&self.path)?;
        debug!(path = %self.path.display(), samples = samples.len(), "Loaded telemetry table");
        self.samples = Some(samples);
        Ok(())
    }

    fn disconnect(&mut self) -> SourceResult<()> {
        self.samples = None;
        Ok(())
    }

    fn get_samples_in_range(
        &mut self,
        start: DateTime<Utc>,
        stop: DateTime<Utc>,
    ) -> SourceResult<Vec<FrameSample>> {
        let samples = self
            .samples
            .as_ref()
            .ok_or("telemetry table source is not connected")?;

        let mut found = Vec::new();
        for sample in samples {
            let ert = sample.ert_time()?;
            if start <= ert && ert < stop {
                found.push(sample.clone());
            }
        }
        Ok(found)
    }
}

// ============================================================
// Layer 6 - Metrics Logger
// ============================================================
// Records one CSV row per finished epoch so learning curves can
// be plotted after the run.
//
// Output file: <output_dir>/metrics.csv
//
// Example CSV output:
//   epoch,average_loss,duration_secs,global_step
//   0,41.238100,0.812000,23
//   1,39.904400,0.797000,46
//   ...
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::Result;
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::PathBuf,
};

use crate::ml::observer::{EpochRecord, TrainingObserver};

/// Appends epoch records to a CSV file.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the CSV header if the file doesn't exist yet, so repeated
    /// runs into the same directory append to one log.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "epoch,average_loss,duration_secs,global_step")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, r: &EpochRecord) -> Result<()> {
        let mut f = OpenOptions::new().append(true).open(&self.csv_path)?;
        writeln!(
            f,
            "{},{:.6},{:.6},{}",
            r.epoch,
            r.average_loss,
            r.duration.as_secs_f64(),
            r.global_step,
        )?;
        Ok(())
    }
}

impl TrainingObserver for MetricsLogger {
    fn on_epoch_complete(&mut self, record: &EpochRecord) {
        if let Err(e) = self.log(record) {
            tracing::warn!("Could not append to '{}': {e:#}", self.csv_path.display());
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn record(epoch: usize, loss: f64) -> EpochRecord {
        EpochRecord {
            epoch,
            average_loss: loss,
            duration:     Duration::from_millis(250),
            global_step:  (epoch as u64 + 1) * 2,
        }
    }

    #[test]
    fn test_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let mut logger = MetricsLogger::new(dir.path()).unwrap();
        logger.on_epoch_complete(&record(0, 3.5));
        logger.on_epoch_complete(&record(1, 2.25));

        let csv = fs::read_to_string(dir.path().join("metrics.csv")).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "epoch,average_loss,duration_secs,global_step");
        assert_eq!(lines[1], "0,3.500000,0.250000,2");
        assert_eq!(lines[2], "1,2.250000,0.250000,4");
    }

    #[test]
    fn test_reopening_appends() {
        let dir = tempfile::tempdir().unwrap();
        MetricsLogger::new(dir.path()).unwrap().log(&record(0, 1.0)).unwrap();
        MetricsLogger::new(dir.path()).unwrap().log(&record(1, 0.5)).unwrap();
        let csv = fs::read_to_string(dir.path().join("metrics.csv")).unwrap();
        assert_eq!(csv.lines().count(), 3);
    }
}

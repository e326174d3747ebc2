// ============================================================
// Layer 5 - Training Events
// ============================================================
// The training loop never prints. It reports through two hooks:
//
//   TrainingObserver   → per-step loss and per-epoch summary
//                        (logging, CSV metrics, tests)
//   ReconstructionSink → a host copy of the last batch's output
//                        after each epoch (audio artifacts)
//
// plus a CancelToken it polls before starting each epoch.

use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::Result;

/// Summary of one finished epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochRecord {
    pub epoch:        usize,
    pub average_loss: f64,
    pub duration:     Duration,
    /// Steps taken since training started, after this epoch.
    pub global_step:  u64,
}

impl fmt::Display for EpochRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Epoch {}: loss = {:.2} ({:.3} sec)",
            self.epoch,
            self.average_loss,
            self.duration.as_secs_f64()
        )
    }
}

pub trait TrainingObserver {
    fn on_batch_complete(&mut self, _global_step: u64, _loss: f64) {}

    fn on_epoch_complete(&mut self, record: &EpochRecord);
}

/// Fan out to several observers in order.
impl TrainingObserver for Vec<Box<dyn TrainingObserver>> {
    fn on_batch_complete(&mut self, global_step: u64, loss: f64) {
        for o in self.iter_mut() {
            o.on_batch_complete(global_step, loss);
        }
    }

    fn on_epoch_complete(&mut self, record: &EpochRecord) {
        for o in self.iter_mut() {
            o.on_epoch_complete(record);
        }
    }
}

/// Writes each epoch summary through `tracing`.
#[derive(Debug, Default)]
pub struct LogObserver;

impl TrainingObserver for LogObserver {
    fn on_batch_complete(&mut self, global_step: u64, loss: f64) {
        tracing::trace!(global_step, loss, "batch complete");
    }

    fn on_epoch_complete(&mut self, record: &EpochRecord) {
        tracing::info!(global_step = record.global_step, "{record}");
    }
}

/// Reconstruction of the last batch of an epoch, copied to the host.
#[derive(Debug, Clone)]
pub struct ReconstructedBatch {
    pub epoch:      usize,
    pub batch_size: usize,
    pub max_frames: usize,
    pub num_coeffs: usize,
    /// Row-major [batch, L_max, D].
    pub values:     Vec<f32>,
}

impl ReconstructedBatch {
    /// Flattened (L_max × D) features of one example.
    pub fn example(&self, index: usize) -> &[f32] {
        let width = self.max_frames * self.num_coeffs;
        &self.values[index * width..(index + 1) * width]
    }
}

pub trait ReconstructionSink {
    fn on_reconstruction(&mut self, batch: &ReconstructedBatch) -> Result<()>;
}

/// Cooperative stop flag; clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_record_format() {
        let r = EpochRecord {
            epoch:        4,
            average_loss: 12.3456,
            duration:     Duration::from_millis(1500),
            global_step:  20,
        };
        assert_eq!(r.to_string(), "Epoch 4: loss = 12.35 (1.500 sec)");
    }

    #[test]
    fn test_cancel_token_shared_between_clones() {
        let token = CancelToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());
        token.cancel();
        assert!(other.is_cancelled());
    }

    #[test]
    fn test_reconstructed_example_slices() {
        let batch = ReconstructedBatch {
            epoch:      0,
            batch_size: 2,
            max_frames: 2,
            num_coeffs: 2,
            values:     (0..8).map(|v| v as f32).collect(),
        };
        assert_eq!(batch.example(1), &[4.0, 5.0, 6.0, 7.0]);
    }
}

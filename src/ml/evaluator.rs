// ============================================================
// Layer 5 - Evaluator
// ============================================================
// Scores a trained autoencoder on a dataset without touching
// its weights.
//
//   VoiceDataset ──frame_loader──▶ FrameBatch ──forward_loss──▶ loss
//                                                                │
//                                            mean over batches ◀─┘
//
// Runs on a plain (non-autodiff) backend, the same way the
// training loop's validation pass uses model.valid(). The score
// is the average masked MSE per batch, which is exactly what the
// training loop reports per epoch, so the two are comparable.
//
// Reference: Burn Book §5 (Training - validation loop)

use std::sync::Arc;

use burn::{prelude::*, tensor::ElementConversion};

use crate::data::batcher::frame_loader;
use crate::data::dataset::VoiceDataset;
use crate::domain::error::PipelineError;
use crate::ml::model::StackedAutoencoder;

pub fn evaluate<B: Backend>(
    model:      &StackedAutoencoder<B>,
    dataset:    Arc<VoiceDataset>,
    batch_size: usize,
    device:     B::Device,
) -> Result<f64, PipelineError> {
    if dataset.is_empty() {
        return Err(PipelineError::EmptyDataset { attempted: 0, skipped: 0 });
    }
    if dataset.max_frames() != model.max_frames || dataset.num_coeffs() != model.num_coeffs {
        return Err(PipelineError::shape(format!(
            "dataset is {} × {} but the model expects {} × {}",
            dataset.max_frames(),
            dataset.num_coeffs(),
            model.max_frames,
            model.num_coeffs
        )));
    }

    let loader = frame_loader::<B>(dataset, batch_size, device)?;

    let mut loss_sum    = 0.0f64;
    let mut num_batches = 0usize;
    for frames in loader.iter() {
        let (loss, _) = model.forward_loss(frames.corrupted, frames.targets, frames.target_weights);
        loss_sum    += loss.into_scalar().elem::<f64>();
        num_batches += 1;
    }

    let average = loss_sum / num_batches.max(1) as f64;
    tracing::debug!("Evaluated {} batches, average loss {:.6}", num_batches, average);
    Ok(average)
}

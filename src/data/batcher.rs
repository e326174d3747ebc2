// ============================================================
// Layer 4 - Minibatching
// ============================================================
// Burn's DataLoader walks the VoiceDataset and hands each group
// of at most `batch_size` examples to FrameBatcher, which stacks
// them into tensors of shape [batch, L_max, D].
//
//   VoiceDataset ──(DataLoader, dataset order)──▶ Vec<PairedExample>
//                                                        │
//                                                        ▼
//                                   FrameBatcher::batch → FrameBatch
//
// The loader is built without `.shuffle(..)`, so batches are
// contiguous, in dataset order, the last one holds the remainder,
// and every pass yields exactly the same batches. The only
// shuffle happens once, in the DatasetBuilder.
//
// All examples are already padded to L_max, so stacking is a
// plain concatenation of the row-major buffers.
//
// Reference: Burn Book §4 (Batcher and DataLoader)

use std::{marker::PhantomData, sync::Arc};

use burn::{
    data::dataloader::{batcher::Batcher, DataLoader, DataLoaderBuilder},
    prelude::*,
    tensor::TensorData,
};

use crate::data::dataset::{PairedExample, VoiceDataset};
use crate::domain::error::PipelineError;

// ─── FrameBatch ───────────────────────────────────────────────────────────────
/// Tensors for one training step.
#[derive(Debug, Clone)]
pub struct FrameBatch<B: Backend> {
    /// Corpus positions of the examples, in batch order.
    pub pair_indices: Vec<usize>,

    /// Corrupted source fed to the encoder, [batch, L_max, D]
    pub corrupted: Tensor<B, 3>,

    /// Warped target, [batch, L_max, D]
    pub targets: Tensor<B, 3>,

    /// Target mask broadcast over coefficients: 1 = real frame, 0 = padding.
    /// Shape [batch, L_max, D].
    pub target_weights: Tensor<B, 3>,
}

// ─── FrameBatcher ─────────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct FrameBatcher<B: Backend> {
    max_frames: usize,
    num_coeffs: usize,
    _backend:   PhantomData<B>,
}

impl<B: Backend> FrameBatcher<B> {
    pub fn new(max_frames: usize, num_coeffs: usize) -> Self {
        Self { max_frames, num_coeffs, _backend: PhantomData }
    }
}

// ─── Burn Batcher Trait Implementation ────────────────────────────────────────
// The DataLoader calls .batch(items, device) once per minibatch.
impl<B: Backend> Batcher<B, PairedExample, FrameBatch<B>> for FrameBatcher<B> {
    fn batch(&self, items: Vec<PairedExample>, device: &B::Device) -> FrameBatch<B> {
        let shape = [items.len(), self.max_frames, self.num_coeffs];

        let stack = |pick: fn(&PairedExample) -> &[f32]| -> Tensor<B, 3> {
            let flat: Vec<f32> = items.iter().flat_map(|e| pick(e).iter().copied()).collect();
            Tensor::from_data(TensorData::new(flat, shape), device)
        };

        let corrupted = stack(|e| e.corrupted.as_slice());
        let targets   = stack(|e| e.target.as_slice());

        // Repeat each frame's mask bit D times.
        let weights: Vec<f32> = items
            .iter()
            .flat_map(|e| e.target_mask.iter())
            .flat_map(|&valid| std::iter::repeat(if valid { 1.0 } else { 0.0 }).take(self.num_coeffs))
            .collect();
        let target_weights = Tensor::from_data(TensorData::new(weights, shape), device);

        let pair_indices = items.iter().map(|e| e.pair_index).collect();

        FrameBatch { pair_indices, corrupted, targets, target_weights }
    }
}

/// Build an in-order loader over `dataset`. A zero batch size is a ConfigError.
pub fn frame_loader<B: Backend>(
    dataset:    Arc<VoiceDataset>,
    batch_size: usize,
    device:     B::Device,
) -> Result<Arc<dyn DataLoader<B, FrameBatch<B>>>, PipelineError> {
    if batch_size == 0 {
        return Err(PipelineError::config("batch size must be at least 1"));
    }
    let batcher = FrameBatcher::<B>::new(dataset.max_frames(), dataset.num_coeffs());
    Ok(DataLoaderBuilder::new(batcher)
        .batch_size(batch_size)
        .set_device(device)
        .build(dataset))
}

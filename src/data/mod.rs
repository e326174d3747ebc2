// ============================================================
// Layer 4 - Data Pipeline
// ============================================================
// Everything between raw feature sequences and tensor batches.
//
//   feature corpus (JSON)
//       │
//       ▼
//   JsonCorpusLoader  → reads source/target feature sequences
//       │
//       ▼
//   SequenceAligner   → FastDTW, warps each pair to equal length
//       │
//       ▼
//   Corruptor         → masking / salt-and-pepper on the source
//       │
//       ▼
//   pad_to_length     → fixed L_max frames + validity mask
//       │
//       ▼
//   DatasetBuilder    → five parallel parts per example, one shuffle
//       │
//       ▼
//   frame_loader      → Burn DataLoader, dataset order, no shuffle
//       │
//       ▼
//   FrameBatcher      → [batch, L_max, D] tensors
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads the feature corpus written by the external extractor
pub mod loader;

/// FastDTW alignment of source/target pairs
pub mod aligner;

/// Denoising corruption of the source features
pub mod corruptor;

/// Truncation / zero padding with validity masks
pub mod padding;

/// Paired examples and the dataset builder
pub mod dataset;

/// Minibatch iteration and tensor stacking
pub mod batcher;

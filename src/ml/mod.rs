// ============================================================
// Layer 5 - ML / Model Layer (Burn)
// ============================================================
// All Burn model and optimisation code lives here.
//
//   model.rs      - The stacked denoising autoencoder
//                   flatten → 3 ReLU encoders → ReLU decoder
//                   → reshape, trained with a masked MSE
//
//   trainer.rs    - The epoch/batch loop with SGD, divergence
//                   detection and cooperative cancellation
//
//   observer.rs   - Progress events, cancel token and the
//                   reconstruction side channel
//
//   synthesis.rs  - Turns reconstructions into normalised
//                   waveforms through injected collaborators
//
//   evaluator.rs  - Average masked MSE of a trained model,
//                   no autodiff
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Vincent et al. (2010) Stacked Denoising Autoencoders

/// Stacked autoencoder architecture and masked loss
pub mod model;

/// Training loop
pub mod trainer;

/// Training events and cancellation
pub mod observer;

/// Waveform artifacts from reconstructions
pub mod synthesis;

/// Scoring a trained model
pub mod evaluator;

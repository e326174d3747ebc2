// ============================================================
// Layer 4 - Padding / Masking
// ============================================================
// The autoencoder takes a fixed (L_max × D) matrix, so every
// warped utterance is forced to exactly L_max frames:
//
//   N ≥ L_max → keep the first L_max frames, mask all true
//   N < L_max → append L_max - N zero frames,
//               mask = [true; N] ++ [false; L_max - N]
//
// Pure and total: no error path, no randomness.

use crate::domain::features::{FeatureSequence, PaddedExample};

pub fn pad_to_length(features: &FeatureSequence, max_frames: usize) -> PaddedExample {
    let d = features.num_coeffs();
    let kept = features.num_frames().min(max_frames);

    let mut frames = FeatureSequence::zeros(max_frames, d);
    frames.as_mut_slice()[..kept * d].copy_from_slice(&features.as_slice()[..kept * d]);

    let mut mask = vec![true; kept];
    mask.resize(max_frames, false);

    PaddedExample { frames, mask }
}

// ============================================================
// Layer 3 - Core Traits (Collaborator Seams)
// ============================================================
// The pipeline touches three things it does not own:
//
//   FeatureSource        → where paired feature sequences come from
//                          (feature extraction happens elsewhere)
//   WaveformSynthesizer  → turns predicted coefficients back into
//                          audio (an external vocoder)
//   WaveformWriter       → persists a normalised waveform
//
// Training code only sees these traits, so it has no compile-time
// dependency on any synthesis engine and tests can pass stubs.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;

use crate::domain::features::FeatureSequence;

/// Source/target sequence pairs, in corpus order.
pub struct FeaturePairs {
    pub source: Vec<FeatureSequence>,
    pub target: Vec<FeatureSequence>,
}

// ─── FeatureSource ────────────────────────────────────────────────────────────
/// Anything that can hand over the two speakers' feature sequences.
///
/// Implementations:
///   - JsonCorpusLoader → reads a JSON corpus file
pub trait FeatureSource {
    fn load_pairs(&self) -> Result<FeaturePairs>;
}

// ─── WaveformSynthesizer ──────────────────────────────────────────────────────
/// Inverts a flattened (frames × coefficients) feature matrix into samples.
pub trait WaveformSynthesizer {
    fn synthesize(
        &self,
        features:    &[f32],
        sample_rate: f64,
        num_coeffs:  usize,
    ) -> Result<Vec<f32>>;
}

impl<T: WaveformSynthesizer + ?Sized> WaveformSynthesizer for Box<T> {
    fn synthesize(&self, features: &[f32], sample_rate: f64, num_coeffs: usize) -> Result<Vec<f32>> {
        (**self).synthesize(features, sample_rate, num_coeffs)
    }
}

// ─── WaveformWriter ───────────────────────────────────────────────────────────
/// Persists one synthesized, already normalised waveform.
pub trait WaveformWriter {
    fn write(&mut self, epoch: usize, index: usize, samples: &[f32]) -> Result<()>;
}

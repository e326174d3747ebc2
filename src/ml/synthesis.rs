// ============================================================
// Layer 5 - Listening to the Reconstruction
// ============================================================
// After each epoch the trainer can hand the last batch's output
// to a SynthesisHook, which for every example:
//
//   1. asks the external WaveformSynthesizer to invert the
//      (L_max × D) coefficients into samples
//   2. rescales the samples to [-1, 1]
//   3. passes them to a WaveformWriter
//
// None of this feeds back into training.

use anyhow::{Context, Result};

use crate::domain::traits::{WaveformSynthesizer, WaveformWriter};
use crate::ml::observer::{ReconstructedBatch, ReconstructionSink};

/// Min-max rescale into [-1, 1]. A constant signal maps to silence.
pub fn normalize_amplitude(samples: &[f32]) -> Vec<f32> {
    let (lo, hi) = samples
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &s| (lo.min(s), hi.max(s)));
    let span = hi - lo;
    if !span.is_finite() || span <= 0.0 {
        return vec![0.0; samples.len()];
    }
    samples.iter().map(|&s| ((s - lo) / span - 0.5) * 2.0).collect()
}

pub struct SynthesisHook<S, W> {
    synthesizer: S,
    writer:      W,
    sample_rate: f64,
}

impl<S: WaveformSynthesizer, W: WaveformWriter> SynthesisHook<S, W> {
    pub fn new(synthesizer: S, writer: W, sample_rate: f64) -> Self {
        Self { synthesizer, writer, sample_rate }
    }
}

impl<S: WaveformSynthesizer, W: WaveformWriter> ReconstructionSink for SynthesisHook<S, W> {
    fn on_reconstruction(&mut self, batch: &ReconstructedBatch) -> Result<()> {
        for index in 0..batch.batch_size {
            let raw = self
                .synthesizer
                .synthesize(batch.example(index), self.sample_rate, batch.num_coeffs)
                .with_context(|| format!("synthesizing example {index} of epoch {}", batch.epoch))?;
            let samples = normalize_amplitude(&raw);
            self.writer.write(batch.epoch, index, &samples)?;
        }
        tracing::debug!("Epoch {}: wrote {} waveform artifacts", batch.epoch, batch.batch_size);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{cell::RefCell, rc::Rc};

    /// Echoes the features back as samples.
    struct EchoSynth;

    impl WaveformSynthesizer for EchoSynth {
        fn synthesize(&self, features: &[f32], _sample_rate: f64, _num_coeffs: usize) -> Result<Vec<f32>> {
            Ok(features.to_vec())
        }
    }

    /// Shares its log with the test so it can be inspected after the hook runs.
    #[derive(Default, Clone)]
    struct MemoryWriter {
        written: Rc<RefCell<Vec<(usize, usize, Vec<f32>)>>>,
    }

    impl WaveformWriter for MemoryWriter {
        fn write(&mut self, epoch: usize, index: usize, samples: &[f32]) -> Result<()> {
            self.written.borrow_mut().push((epoch, index, samples.to_vec()));
            Ok(())
        }
    }

    #[test]
    fn test_normalize_maps_to_unit_range() {
        let out = normalize_amplitude(&[2.0, 4.0, 6.0]);
        assert_eq!(out, vec![-1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_normalize_constant_and_empty() {
        assert_eq!(normalize_amplitude(&[0.3; 4]), vec![0.0; 4]);
        assert!(normalize_amplitude(&[]).is_empty());
    }

    #[test]
    fn test_hook_writes_one_waveform_per_example() {
        let writer = MemoryWriter::default();
        let mut hook = SynthesisHook::new(EchoSynth, writer.clone(), 16_000.0);
        let batch = ReconstructedBatch {
            epoch:      3,
            batch_size: 2,
            max_frames: 1,
            num_coeffs: 2,
            values:     vec![0.0, 1.0, 5.0, 7.0],
        };
        hook.on_reconstruction(&batch).unwrap();

        let written = writer.written.borrow();
        assert_eq!(written.len(), 2);
        assert_eq!(written[0], (3, 0, vec![-1.0, 1.0]));
        assert_eq!(written[1], (3, 1, vec![-1.0, 1.0]));
    }
}

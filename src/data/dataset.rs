// ============================================================
// Layer 4 - Paired Dataset
// ============================================================
// Turns raw (source, target) feature pairs into training
// examples, one pair at a time:
//
//   align (FastDTW) → corrupt warped source → pad all three
//
// Each example keeps the five parallel pieces together:
//   input, corrupted input, input mask, target, target mask
// so a shuffle can only ever move them as a unit.
//
// A pair whose alignment fails is logged and skipped. Shape
// problems abort the whole build, and so does a build where no
// pair survived.
//
// Reference: Burn Book §4 (Datasets)
//            rand crate documentation (SliceRandom)

use burn::data::dataset::Dataset;
use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};

use crate::data::aligner::SequenceAligner;
use crate::data::corruptor::Corruptor;
use crate::data::padding::pad_to_length;
use crate::domain::error::PipelineError;
use crate::domain::features::FeatureSequence;
use crate::domain::traits::FeaturePairs;

/// One training example, all matrices shaped (L_max × D).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairedExample {
    /// Position of the pair in the corpus before shuffling.
    pub pair_index:  usize,
    pub input:       FeatureSequence,
    /// Shares `input_mask`; corruption never changes length.
    pub corrupted:   FeatureSequence,
    pub input_mask:  Vec<bool>,
    pub target:      FeatureSequence,
    pub target_mask: Vec<bool>,
}

#[derive(Debug)]
pub struct VoiceDataset {
    examples:   Vec<PairedExample>,
    max_frames: usize,
    num_coeffs: usize,
}

impl VoiceDataset {
    /// Wrap prebuilt examples. Every matrix must be (max_frames × num_coeffs)
    /// and every mask max_frames long.
    pub fn from_examples(
        examples:   Vec<PairedExample>,
        max_frames: usize,
        num_coeffs: usize,
    ) -> Result<Self, PipelineError> {
        for ex in &examples {
            let shapes_ok = [&ex.input, &ex.corrupted, &ex.target]
                .iter()
                .all(|m| m.num_frames() == max_frames && m.num_coeffs() == num_coeffs);
            let masks_ok = ex.input_mask.len() == max_frames && ex.target_mask.len() == max_frames;
            if !shapes_ok || !masks_ok {
                return Err(PipelineError::shape(format!(
                    "example for pair {} is not {max_frames} × {num_coeffs}",
                    ex.pair_index
                )));
            }
        }
        Ok(Self { examples, max_frames, num_coeffs })
    }

    pub fn examples(&self) -> &[PairedExample] { &self.examples }

    pub fn max_frames(&self) -> usize { self.max_frames }

    pub fn num_coeffs(&self) -> usize { self.num_coeffs }

    pub fn is_empty(&self) -> bool { self.examples.is_empty() }
}

impl Dataset<PairedExample> for VoiceDataset {
    fn get(&self, index: usize) -> Option<PairedExample> {
        self.examples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.examples.len()
    }
}

/// Counts reported after a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildSummary {
    pub attempted: usize,
    pub kept:      usize,
    pub skipped:   usize,
}

pub struct DatasetBuilder {
    aligner:    SequenceAligner,
    corruptor:  Corruptor,
    max_frames: usize,
    num_coeffs: usize,
}

impl DatasetBuilder {
    pub fn new(
        aligner:    SequenceAligner,
        corruptor:  Corruptor,
        max_frames: usize,
        num_coeffs: usize,
    ) -> Self {
        Self { aligner, corruptor, max_frames, num_coeffs }
    }

    /// Build and shuffle the dataset. The same RNG drives corruption and
    /// the final permutation, so one seed reproduces the whole build.
    pub fn build<R: Rng + ?Sized>(
        &self,
        pairs: &FeaturePairs,
        rng:   &mut R,
    ) -> Result<(VoiceDataset, BuildSummary), PipelineError> {
        if pairs.source.len() != pairs.target.len() {
            return Err(PipelineError::config(format!(
                "{} source sequences but {} target sequences",
                pairs.source.len(),
                pairs.target.len()
            )));
        }

        let attempted = pairs.source.len();
        let mut examples = Vec::with_capacity(attempted);
        let mut skipped = 0usize;

        for (index, (source, target)) in pairs.source.iter().zip(&pairs.target).enumerate() {
            self.check_dim(index, "source", source)?;
            self.check_dim(index, "target", target)?;

            let aligned = match self.aligner.align(index, source, target) {
                Ok(a) => a,
                Err(e) if e.is_recoverable() => {
                    tracing::warn!("Skipping pair {index}: {e}");
                    skipped += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };

            let corrupted = self.corruptor.corrupt(&aligned.source, rng);

            let input     = pad_to_length(&aligned.source, self.max_frames);
            let corrupted = pad_to_length(&corrupted, self.max_frames);
            let target    = pad_to_length(&aligned.target, self.max_frames);

            examples.push(PairedExample {
                pair_index:  index,
                input:       input.frames,
                corrupted:   corrupted.frames,
                input_mask:  input.mask,
                target:      target.frames,
                target_mask: target.mask,
            });
        }

        if examples.is_empty() {
            return Err(PipelineError::EmptyDataset { attempted, skipped });
        }

        examples.shuffle(rng);

        let summary = BuildSummary { attempted, kept: examples.len(), skipped };
        tracing::info!(
            "Built dataset: {} examples ({} skipped), {} × {} frames",
            summary.kept,
            summary.skipped,
            self.max_frames,
            self.num_coeffs
        );
        let dataset = VoiceDataset::from_examples(examples, self.max_frames, self.num_coeffs)?;
        Ok((dataset, summary))
    }

    fn check_dim(&self, index: usize, side: &str, seq: &FeatureSequence) -> Result<(), PipelineError> {
        if seq.num_coeffs() != self.num_coeffs {
            return Err(PipelineError::shape(format!(
                "pair {index}: {side} has {} coefficients, expected {}",
                seq.num_coeffs(),
                self.num_coeffs
            )));
        }
        Ok(())
    }
}

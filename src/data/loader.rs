// ============================================================
// Layer 4 - Feature Corpus Loader
// ============================================================
// Feature extraction (cepstral analysis of the wav files) runs
// outside this program. Its output is a single JSON file:
//
//   {
//     "source": [ [[c0, c1, ..., c12], ...], ... ],   ← speaker A
//     "target": [ [[c0, c1, ..., c12], ...], ... ]    ← speaker B
//   }
//
// source[k] and target[k] are recordings of the same sentence.
// Every frame must have exactly `num_coeffs` values.
//
// Reference: serde_json crate documentation
//            Rust Book §9 (Error Handling)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

use crate::domain::error::PipelineError;
use crate::domain::features::FeatureSequence;
use crate::domain::traits::{FeaturePairs, FeatureSource};

/// On-disk layout of a feature corpus.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureCorpus {
    pub source: Vec<Vec<Vec<f32>>>,
    pub target: Vec<Vec<Vec<f32>>>,
}

impl FeatureCorpus {
    /// Validate shapes and convert to feature sequences.
    pub fn into_pairs(self, num_coeffs: usize) -> Result<FeaturePairs, PipelineError> {
        if self.source.len() != self.target.len() {
            return Err(PipelineError::config(format!(
                "corpus has {} source utterances but {} target utterances",
                self.source.len(),
                self.target.len()
            )));
        }
        let convert = |side: &str, seqs: Vec<Vec<Vec<f32>>>| {
            seqs.into_iter()
                .enumerate()
                .map(|(i, frames)| {
                    FeatureSequence::from_frames_with_dim(frames, num_coeffs).map_err(|e| {
                        PipelineError::shape(format!("{side} utterance {i}: {e}"))
                    })
                })
                .collect::<Result<Vec<_>, _>>()
        };
        Ok(FeaturePairs {
            source: convert("source", self.source)?,
            target: convert("target", self.target)?,
        })
    }
}

/// Loads a `FeatureCorpus` JSON file.
pub struct JsonCorpusLoader {
    path:       PathBuf,
    num_coeffs: usize,
}

impl JsonCorpusLoader {
    pub fn new(path: impl Into<PathBuf>, num_coeffs: usize) -> Self {
        Self { path: path.into(), num_coeffs }
    }
}

impl FeatureSource for JsonCorpusLoader {
    fn load_pairs(&self) -> Result<FeaturePairs> {
        let json = fs::read_to_string(&self.path)
            .with_context(|| format!("Cannot read feature corpus '{}'", self.path.display()))?;
        let corpus: FeatureCorpus = serde_json::from_str(&json)
            .with_context(|| format!("Malformed feature corpus '{}'", self.path.display()))?;

        tracing::debug!(
            "Read {} source / {} target utterances from '{}'",
            corpus.source.len(),
            corpus.target.len(),
            self.path.display()
        );
        Ok(corpus.into_pairs(self.num_coeffs)?)
    }
}

// ============================================================
// Layer 2 - AlignUseCase
// ============================================================
// Runs only the alignment stage over a corpus and reports, per
// pair, how far apart the two speakers are and how long the
// warped sequences become. Handy for choosing L_max before a
// training run: any warped length above it will be truncated.
//
// Reference: Salvador & Chan (2007) FastDTW

use anyhow::{Context, Result};

use crate::data::{
    aligner::{AlignmentPolicy, SequenceAligner},
    loader::JsonCorpusLoader,
};
use crate::domain::traits::FeatureSource;

#[derive(Debug, Clone, PartialEq)]
pub struct PairReport {
    pub index:         usize,
    pub source_frames: usize,
    pub target_frames: usize,
    pub distance:      f64,
    pub path_len:      usize,
    pub warped_frames: usize,
}

pub struct AlignUseCase {
    corpus_path: String,
    num_coeffs:  usize,
    aligner:     SequenceAligner,
}

impl AlignUseCase {
    pub fn new(
        corpus_path: impl Into<String>,
        num_coeffs:  usize,
        radius:      usize,
        policy:      AlignmentPolicy,
    ) -> Result<Self> {
        Ok(Self {
            corpus_path: corpus_path.into(),
            num_coeffs,
            aligner: SequenceAligner::new(radius, policy)?,
        })
    }

    /// Pairs that cannot be aligned are logged and left out of the report.
    pub fn execute(&self) -> Result<Vec<PairReport>> {
        let pairs = JsonCorpusLoader::new(&self.corpus_path, self.num_coeffs)
            .load_pairs()
            .context("preprocessing")?;

        let mut reports = Vec::with_capacity(pairs.source.len());
        for (index, (source, target)) in pairs.source.iter().zip(&pairs.target).enumerate() {
            let aligned = match self.aligner.align(index, source, target) {
                Ok(a) => a,
                Err(e) if e.is_recoverable() => {
                    tracing::warn!("Skipping pair {index}: {e}");
                    continue;
                }
                Err(e) => return Err(e).context("preprocessing"),
            };
            reports.push(PairReport {
                index,
                source_frames: source.num_frames(),
                target_frames: target.num_frames(),
                distance:      aligned.distance,
                path_len:      aligned.path.len(),
                warped_frames: aligned.source.num_frames(),
            });
        }
        Ok(reports)
    }
}

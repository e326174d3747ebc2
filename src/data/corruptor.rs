// ============================================================
// Layer 4 - Input Corruptor
// ============================================================
// Denoising autoencoders learn robust features by reconstructing
// a clean target from a damaged input. Two kinds of damage:
//
//   masking          → chosen cells are set to 0
//   salt-and-pepper  → chosen cells are set to the matrix min or
//                      max, each with probability 1/2
//
// The chosen cells are ⌊fraction · rows · cols⌋ positions drawn
// uniformly without replacement. The RNG is always passed in by
// the caller, so a fixed seed reproduces the exact same noise.
//
// Reference: Vincent et al. (2008) Denoising Autoencoders
//            rand crate documentation (seq::index::sample)

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::domain::error::PipelineError;
use crate::domain::features::FeatureSequence;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum CorruptionKind {
    None,
    #[default]
    Masking,
    SaltAndPepper,
}

#[derive(Debug, Clone, Copy)]
pub struct Corruptor {
    kind:     CorruptionKind,
    fraction: f64,
}

impl Corruptor {
    /// Fails if `fraction` is outside [0, 1].
    pub fn new(kind: CorruptionKind, fraction: f64) -> Result<Self, PipelineError> {
        if !(0.0..=1.0).contains(&fraction) {
            return Err(PipelineError::config(format!(
                "corruption fraction must be within [0, 1], got {fraction}"
            )));
        }
        Ok(Self { kind, fraction })
    }

    /// Number of cells that will be corrupted in a matrix of `cells` values.
    pub fn positions_for(&self, cells: usize) -> usize {
        ((self.fraction * cells as f64).floor() as usize).min(cells)
    }

    /// Return a corrupted copy of `features`; the input is never modified.
    pub fn corrupt<R: Rng + ?Sized>(&self, features: &FeatureSequence, rng: &mut R) -> FeatureSequence {
        let mut out = features.clone();
        let cells = out.as_slice().len();
        let count = self.positions_for(cells);
        if count == 0 {
            return out;
        }

        match self.kind {
            CorruptionKind::None => {}
            CorruptionKind::Masking => {
                let values = out.as_mut_slice();
                for p in rand::seq::index::sample(rng, cells, count) {
                    values[p] = 0.0;
                }
            }
            CorruptionKind::SaltAndPepper => {
                // count > 0, so the matrix has at least one value
                let Some((lo, hi)) = features.value_range() else {
                    return out;
                };
                let positions = rand::seq::index::sample(rng, cells, count);
                let values = out.as_mut_slice();
                for p in positions {
                    values[p] = if rng.gen_bool(0.5) { lo } else { hi };
                }
            }
        }
        out
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn sample() -> FeatureSequence {
        let data = (1..=40).map(|v| v as f32 * 0.25).collect();
        FeatureSequence::new(4, data).unwrap()
    }

    #[test]
    fn test_zero_fraction_is_identity() {
        let mut rng = StdRng::seed_from_u64(1);
        for kind in [CorruptionKind::Masking, CorruptionKind::SaltAndPepper, CorruptionKind::None] {
            let c = Corruptor::new(kind, 0.0).unwrap();
            let x = sample();
            let y = c.corrupt(&x, &mut rng);
            let same = x.as_slice().iter().zip(y.as_slice()).all(|(a, b)| a.to_bits() == b.to_bits());
            assert!(same);
        }
    }

    #[test]
    fn test_kind_none_leaves_input_at_any_fraction() {
        let mut rng = StdRng::seed_from_u64(5);
        let c = Corruptor::new(CorruptionKind::None, 1.0).unwrap();
        let x = sample();
        assert_eq!(c.corrupt(&x, &mut rng), x);
    }

    #[test]
    fn test_full_masking_zeroes_everything() {
        let mut rng = StdRng::seed_from_u64(2);
        let c = Corruptor::new(CorruptionKind::Masking, 1.0).unwrap();
        let y = c.corrupt(&sample(), &mut rng);
        assert!(y.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_masking_count_is_floor_of_fraction() {
        let mut rng = StdRng::seed_from_u64(3);
        let c = Corruptor::new(CorruptionKind::Masking, 0.33).unwrap();
        let y = c.corrupt(&sample(), &mut rng);
        // sample() has no zeros, so every zero was written by the corruptor
        let zeros = y.as_slice().iter().filter(|&&v| v == 0.0).count();
        assert_eq!(zeros, 13); // ⌊0.33 · 40⌋
    }

    #[test]
    fn test_salt_and_pepper_uses_extremes() {
        let mut rng = StdRng::seed_from_u64(4);
        let c = Corruptor::new(CorruptionKind::SaltAndPepper, 0.5).unwrap();
        let x = sample();
        let y = c.corrupt(&x, &mut rng);
        let changed: Vec<f32> = x
            .as_slice()
            .iter()
            .zip(y.as_slice())
            .filter(|(a, b)| a != b)
            .map(|(_, &b)| b)
            .collect();
        assert!(!changed.is_empty());
        assert!(changed.iter().all(|&v| v == 0.25 || v == 10.0));
        assert_eq!(y.num_frames(), x.num_frames());
    }

    #[test]
    fn test_same_seed_same_noise() {
        let c = Corruptor::new(CorruptionKind::Masking, 0.5).unwrap();
        let a = c.corrupt(&sample(), &mut StdRng::seed_from_u64(9));
        let b = c.corrupt(&sample(), &mut StdRng::seed_from_u64(9));
        assert_eq!(a, b);
    }

    #[test]
    fn test_out_of_range_fraction_rejected() {
        for f in [-0.1, 1.5, f64::NAN] {
            assert!(matches!(
                Corruptor::new(CorruptionKind::Masking, f),
                Err(PipelineError::Config { .. })
            ));
        }
    }
}

// ============================================================
// Layer 3 - Feature Sequences
// ============================================================
// A FeatureSequence is one utterance after cepstral analysis:
// an ordered list of frames, every frame holding the same
// number of coefficients (D, usually 13).
//
// Storage is a single row-major Vec<f32>:
//   [f0_c0, f0_c1, ..., f0_cD, f1_c0, ..., fN_cD]
// which is exactly the layout the model flattens to, so
// batching never needs to re-pack frames.
//
// Reference: Rust Book §8 (Vectors), §5 (Structs)

use serde::{Deserialize, Serialize};

use crate::domain::error::PipelineError;

/// An immutable (frames × coefficients) matrix of acoustic features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSequence {
    num_frames: usize,
    num_coeffs: usize,
    data:       Vec<f32>,
}

impl FeatureSequence {
    /// Wrap an already row-major buffer.
    /// Fails with a ShapeError if `data` is not a whole number of frames.
    pub fn new(num_coeffs: usize, data: Vec<f32>) -> Result<Self, PipelineError> {
        if num_coeffs == 0 {
            return Err(PipelineError::shape("feature dimensionality must be at least 1"));
        }
        if data.len() % num_coeffs != 0 {
            return Err(PipelineError::shape(format!(
                "{} values do not divide into frames of {} coefficients",
                data.len(),
                num_coeffs
            )));
        }
        Ok(Self { num_frames: data.len() / num_coeffs, num_coeffs, data })
    }

    /// Build from nested frames, as they arrive from JSON. The width is
    /// explicit so that an empty utterance still knows its dimensionality.
    pub fn from_frames_with_dim(
        frames:     Vec<Vec<f32>>,
        num_coeffs: usize,
    ) -> Result<Self, PipelineError> {
        let mut data = Vec::with_capacity(frames.len() * num_coeffs);
        for (i, frame) in frames.into_iter().enumerate() {
            if frame.len() != num_coeffs {
                return Err(PipelineError::shape(format!(
                    "frame {i} has {} coefficients, expected {num_coeffs}",
                    frame.len()
                )));
            }
            data.extend(frame);
        }
        Self::new(num_coeffs, data)
    }

    /// An all-zero sequence, used as the write target for alignment and padding.
    pub fn zeros(num_frames: usize, num_coeffs: usize) -> Self {
        Self { num_frames, num_coeffs, data: vec![0.0; num_frames * num_coeffs] }
    }

    pub fn num_frames(&self) -> usize { self.num_frames }

    pub fn num_coeffs(&self) -> usize { self.num_coeffs }

    pub fn is_empty(&self) -> bool { self.num_frames == 0 }

    /// One frame as a slice of D coefficients.
    pub fn frame(&self, index: usize) -> &[f32] {
        let start = index * self.num_coeffs;
        &self.data[start..start + self.num_coeffs]
    }

    /// The raw row-major buffer.
    pub fn as_slice(&self) -> &[f32] { &self.data }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [f32] { &mut self.data }

    pub(crate) fn frame_mut(&mut self, index: usize) -> &mut [f32] {
        let start = index * self.num_coeffs;
        &mut self.data[start..start + self.num_coeffs]
    }

    /// Smallest and largest coefficient in the whole matrix.
    pub fn value_range(&self) -> Option<(f32, f32)> {
        self.data.iter().copied().fold(None, |acc, v| match acc {
            None             => Some((v, v)),
            Some((lo, hi))   => Some((lo.min(v), hi.max(v))),
        })
    }
}

/// A sequence forced to exactly `L_max` frames, plus a validity mask.
///
/// The mask is `true` for real frames and `false` for zero padding;
/// the `true`s always form a prefix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaddedExample {
    pub frames: FeatureSequence,
    pub mask:   Vec<bool>,
}

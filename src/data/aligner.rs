// ============================================================
// Layer 4 - Sequence Aligner (FastDTW)
// ============================================================
// Warps a source and a target utterance onto a common time axis.
//
// Full dynamic time warping fills an N × M cost table, which is
// too slow for the ~700-frame utterances in the corpus. FastDTW
// (Salvador & Chan, 2007) works multi-resolution instead:
//
//   1. Halve both sequences (average neighbouring frames)
//   2. Align the halves recursively
//   3. Project the coarse path back onto the full grid, widened
//      by `radius` cells on each side
//   4. Run DTW only inside that window
//
// Below `radius + 2` frames the recursion bottoms out in plain DTW.
//
// The warping path uses the usual step set (1,0), (0,1), (1,1)
// so its length is always in [max(N,M), N+M-1].
//
// Reference: Salvador & Chan (2007) FastDTW
//            Rust Book §8 (Vectors)

use serde::{Deserialize, Serialize};

use crate::domain::error::PipelineError;
use crate::domain::features::FeatureSequence;

/// How warped frames are written into the output arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentPolicy {
    /// Path step k fills output row k on both sides, so row k of the
    /// source and row k of the target are matched frames.
    #[default]
    PathOrder,
    /// Source frame i is written at row i and target frame j at row j.
    /// Repeated indices overwrite themselves; rows past the original
    /// length stay zero.
    IndexOverwrite,
}

/// Result of aligning one pair.
#[derive(Debug, Clone)]
pub struct Alignment {
    /// Warping path, (source index, target index), from (0,0) to (N-1,M-1).
    pub path:     Vec<(usize, usize)>,
    /// Sum of Euclidean frame distances along the path.
    pub distance: f64,
    pub source:   FeatureSequence,
    pub target:   FeatureSequence,
}

#[derive(Debug, Clone)]
pub struct SequenceAligner {
    radius: usize,
    policy: AlignmentPolicy,
}

impl SequenceAligner {
    pub fn new(radius: usize, policy: AlignmentPolicy) -> Result<Self, PipelineError> {
        if radius == 0 {
            return Err(PipelineError::config("DTW radius must be at least 1"));
        }
        Ok(Self { radius, policy })
    }

    /// Align one pair. `index` is only used to label errors.
    pub fn align(
        &self,
        index:  usize,
        source: &FeatureSequence,
        target: &FeatureSequence,
    ) -> Result<Alignment, PipelineError> {
        if source.num_coeffs() != target.num_coeffs() {
            return Err(PipelineError::shape(format!(
                "pair {index}: source has {} coefficients, target has {}",
                source.num_coeffs(),
                target.num_coeffs()
            )));
        }
        if source.is_empty() || target.is_empty() {
            return Err(PipelineError::alignment(
                index,
                format!(
                    "cannot warp an empty sequence (source {} frames, target {} frames)",
                    source.num_frames(),
                    target.num_frames()
                ),
            ));
        }

        let (distance, path) = fast_dtw(source, target, self.radius);
        let (source, target) = match self.policy {
            AlignmentPolicy::PathOrder      => warp_by_path(source, target, &path),
            AlignmentPolicy::IndexOverwrite => warp_by_index(source, target, &path),
        };

        tracing::debug!(
            "pair {index}: DTW distance {distance:.3}, {} warped frames",
            path.len()
        );
        Ok(Alignment { path, distance, source, target })
    }
}

fn warp_by_path(
    source: &FeatureSequence,
    target: &FeatureSequence,
    path:   &[(usize, usize)],
) -> (FeatureSequence, FeatureSequence) {
    let d = source.num_coeffs();
    let mut src_out = FeatureSequence::zeros(path.len(), d);
    let mut tgt_out = FeatureSequence::zeros(path.len(), d);
    for (k, &(i, j)) in path.iter().enumerate() {
        src_out.frame_mut(k).copy_from_slice(source.frame(i));
        tgt_out.frame_mut(k).copy_from_slice(target.frame(j));
    }
    (src_out, tgt_out)
}

fn warp_by_index(
    source: &FeatureSequence,
    target: &FeatureSequence,
    path:   &[(usize, usize)],
) -> (FeatureSequence, FeatureSequence) {
    let d = source.num_coeffs();
    let mut src_out = FeatureSequence::zeros(path.len(), d);
    let mut tgt_out = FeatureSequence::zeros(path.len(), d);
    for &(i, j) in path {
        src_out.frame_mut(i).copy_from_slice(source.frame(i));
        tgt_out.frame_mut(j).copy_from_slice(target.frame(j));
    }
    (src_out, tgt_out)
}

fn euclidean(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| {
            let d = x as f64 - y as f64;
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

/// Approximate DTW. Returns (distance, path).
pub fn fast_dtw(
    x:      &FeatureSequence,
    y:      &FeatureSequence,
    radius: usize,
) -> (f64, Vec<(usize, usize)>) {
    let min_size = radius + 2;
    if x.num_frames() < min_size || y.num_frames() < min_size {
        return dtw(x, y, &Window::full(x.num_frames(), y.num_frames()));
    }

    let x_half = reduce_by_half(x);
    let y_half = reduce_by_half(y);
    let (_, coarse_path) = fast_dtw(&x_half, &y_half, radius);

    let window = Window::expand(&coarse_path, x.num_frames(), y.num_frames(), radius);
    dtw_in_window_or_full(x, y, window)
}

/// DTW restricted to `window`. Runs over the full grid instead when there is
/// no window or the window does not connect (0,0) to (N-1,M-1).
fn dtw_in_window_or_full(
    x:      &FeatureSequence,
    y:      &FeatureSequence,
    window: Option<Window>,
) -> (f64, Vec<(usize, usize)>) {
    if let Some(window) = window {
        let (distance, path) = dtw(x, y, &window);
        if distance.is_finite() {
            return (distance, path);
        }
        tracing::debug!("projected window disconnected, falling back to full DTW");
    }
    dtw(x, y, &Window::full(x.num_frames(), y.num_frames()))
}

/// Average each pair of neighbouring frames; an odd trailing frame is dropped.
fn reduce_by_half(seq: &FeatureSequence) -> FeatureSequence {
    let d = seq.num_coeffs();
    let half = seq.num_frames() / 2;
    let mut out = FeatureSequence::zeros(half, d);
    for i in 0..half {
        let (a, b) = (seq.frame(2 * i), seq.frame(2 * i + 1));
        for (o, (&p, &q)) in out.frame_mut(i).iter_mut().zip(a.iter().zip(b)) {
            *o = (p + q) / 2.0;
        }
    }
    out
}

/// Inclusive column range [lo, hi] allowed in each row of the cost table.
struct Window {
    rows: Vec<(usize, usize)>,
}

impl Window {
    fn full(n: usize, m: usize) -> Self {
        Self { rows: vec![(0, m - 1); n] }
    }

    /// Widen a coarse path by `radius` and project it onto an n × m grid.
    /// Returns None if some fine row is not covered.
    fn expand(coarse: &[(usize, usize)], n: usize, m: usize, radius: usize) -> Option<Self> {
        let r = radius as isize;
        let mut rows: Vec<Option<(usize, usize)>> = vec![None; n];

        for &(ci, cj) in coarse {
            for di in -r..=r {
                let i = ci as isize + di;
                if i < 0 {
                    continue;
                }
                let j_lo = (cj as isize - r).max(0) as usize;
                let j_hi = (cj as isize + r) as usize;
                for fine_i in [2 * i as usize, 2 * i as usize + 1] {
                    if fine_i >= n || 2 * j_lo >= m {
                        continue;
                    }
                    let lo = 2 * j_lo;
                    let hi = (2 * j_hi + 1).min(m - 1);
                    rows[fine_i] = Some(match rows[fine_i] {
                        None           => (lo, hi),
                        Some((a, b))   => (a.min(lo), b.max(hi)),
                    });
                }
            }
        }

        let rows: Option<Vec<_>> = rows.into_iter().collect();
        let rows = rows?;
        if rows[0].0 != 0 || rows[n - 1].1 != m - 1 {
            return None;
        }
        Some(Self { rows })
    }

    fn contains(&self, i: usize, j: usize) -> bool {
        let (lo, hi) = self.rows[i];
        j >= lo && j <= hi
    }
}

// Backpointer codes
const FROM_UP:   u8 = 0; // (i-1, j)
const FROM_LEFT: u8 = 1; // (i, j-1)
const FROM_DIAG: u8 = 2; // (i-1, j-1)
const START:     u8 = 3;

/// Windowed DTW with backtracking.
fn dtw(x: &FeatureSequence, y: &FeatureSequence, window: &Window) -> (f64, Vec<(usize, usize)>) {
    let n = x.num_frames();
    let m = y.num_frames();

    // Row-compressed cost and backpointer tables.
    let mut offsets = Vec::with_capacity(n);
    let mut total = 0usize;
    for &(lo, hi) in &window.rows {
        offsets.push(total);
        total += hi - lo + 1;
    }
    let mut cost = vec![f64::INFINITY; total];
    let mut bp = vec![START; total];

    let at = |i: usize, j: usize| -> Option<usize> {
        window.contains(i, j).then(|| offsets[i] + (j - window.rows[i].0))
    };

    for i in 0..n {
        let (lo, hi) = window.rows[i];
        for j in lo..=hi {
            let here = offsets[i] + (j - lo);
            let dist = euclidean(x.frame(i), y.frame(j));
            if i == 0 && j == 0 {
                cost[here] = dist;
                continue;
            }

            let mut best = f64::INFINITY;
            let mut step = START;
            let candidates = [
                (i.checked_sub(1).map(|pi| (pi, j)), FROM_UP),
                (j.checked_sub(1).map(|pj| (i, pj)), FROM_LEFT),
                (i.checked_sub(1).zip(j.checked_sub(1)), FROM_DIAG),
            ];
            for (prev, code) in candidates {
                if let Some(idx) = prev.and_then(|(pi, pj)| at(pi, pj)) {
                    if cost[idx] < best {
                        best = cost[idx];
                        step = code;
                    }
                }
            }
            cost[here] = best + dist;
            bp[here] = step;
        }
    }

    let Some(last) = at(n - 1, m - 1) else {
        return (f64::INFINITY, Vec::new());
    };
    let distance = cost[last];
    if !distance.is_finite() {
        return (distance, Vec::new());
    }

    let mut path = Vec::with_capacity(n + m);
    let (mut i, mut j) = (n - 1, m - 1);
    loop {
        path.push((i, j));
        let Some(idx) = at(i, j) else { break };
        match bp[idx] {
            FROM_UP   => i -= 1,
            FROM_LEFT => j -= 1,
            FROM_DIAG => { i -= 1; j -= 1; }
            _         => break,
        }
    }
    path.reverse();
    (distance, path)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn seq(values: &[f32]) -> FeatureSequence {
        FeatureSequence::new(1, values.to_vec()).unwrap()
    }

    fn ramp(n: usize, d: usize, scale: f32) -> FeatureSequence {
        let data = (0..n * d).map(|k| (k / d) as f32 * scale + (k % d) as f32).collect();
        FeatureSequence::new(d, data).unwrap()
    }

    fn assert_valid_path(path: &[(usize, usize)], n: usize, m: usize) {
        assert_eq!(path.first(), Some(&(0, 0)));
        assert_eq!(path.last(), Some(&(n - 1, m - 1)));
        for w in path.windows(2) {
            let (a, b) = (w[0], w[1]);
            let di = b.0 - a.0;
            let dj = b.1 - a.1;
            assert!(di <= 1 && dj <= 1 && di + dj >= 1, "bad step {a:?} -> {b:?}");
        }
        assert!(path.len() >= n.max(m));
        assert!(path.len() <= n + m - 1);
    }

    #[test]
    fn test_identical_sequences_align_diagonally() {
        let s = seq(&[0.0, 1.0, 2.0, 3.0, 4.0]);
        let (distance, path) = fast_dtw(&s, &s, 1);
        assert_eq!(distance, 0.0);
        assert_eq!(path, (0..5).map(|i| (i, i)).collect::<Vec<_>>());
    }

    #[test]
    fn test_stretched_sequence_has_zero_cost() {
        let x = seq(&[0.0, 1.0, 2.0]);
        let y = seq(&[0.0, 0.0, 1.0, 1.0, 2.0, 2.0]);
        let (distance, path) = fast_dtw(&x, &y, 1);
        assert_eq!(distance, 0.0);
        assert_valid_path(&path, 3, 6);
    }

    #[test]
    fn test_long_sequences_recurse_and_stay_valid() {
        for (n, m) in [(40, 57), (64, 64), (33, 9), (101, 150)] {
            let x = ramp(n, 3, 1.0);
            let y = ramp(m, 3, n as f32 / m as f32);
            let (distance, path) = fast_dtw(&x, &y, 1);
            assert!(distance.is_finite());
            assert_valid_path(&path, n, m);
        }
    }

    #[test]
    fn test_fast_dtw_close_to_exact_on_smooth_input() {
        let x = ramp(80, 2, 0.5);
        let y = ramp(60, 2, 0.5 * 80.0 / 60.0);
        let (exact, _) = dtw(&x, &y, &Window::full(80, 60));
        let (approx, _) = fast_dtw(&x, &y, 2);
        assert!(approx >= exact - 1e-9);
        assert!(approx <= exact * 1.5 + 1e-6);
    }

    #[test]
    fn test_aligned_lengths_match_and_are_bounded() {
        let aligner = SequenceAligner::new(1, AlignmentPolicy::PathOrder).unwrap();
        let src = ramp(12, 2, 1.0);
        let tgt = ramp(19, 2, 0.6);
        let a = aligner.align(0, &src, &tgt).unwrap();
        assert_eq!(a.source.num_frames(), a.target.num_frames());
        assert_eq!(a.source.num_frames(), a.path.len());
        assert!(a.path.len() >= 19 && a.path.len() <= 12 + 19 - 1);
    }

    #[test]
    fn test_path_order_pairs_matched_frames() {
        let aligner = SequenceAligner::new(1, AlignmentPolicy::PathOrder).unwrap();
        let src = seq(&[0.0, 5.0]);
        let tgt = seq(&[0.0, 0.0, 5.0]);
        let a = aligner.align(0, &src, &tgt).unwrap();
        assert_eq!(a.path, vec![(0, 0), (0, 1), (1, 2)]);
        assert_eq!(a.source.as_slice(), &[0.0, 0.0, 5.0]);
        assert_eq!(a.target.as_slice(), &[0.0, 0.0, 5.0]);
    }

    #[test]
    fn test_index_overwrite_keeps_original_positions() {
        let aligner = SequenceAligner::new(1, AlignmentPolicy::IndexOverwrite).unwrap();
        let src = seq(&[0.0, 5.0]);
        let tgt = seq(&[0.0, 0.0, 5.0]);
        let a = aligner.align(0, &src, &tgt).unwrap();
        // source frames stay at rows 0 and 1; row 2 is never written
        assert_eq!(a.source.as_slice(), &[0.0, 5.0, 0.0]);
        assert_eq!(a.target.as_slice(), &[0.0, 0.0, 5.0]);
    }

    #[test]
    fn test_empty_sequence_is_alignment_error() {
        let aligner = SequenceAligner::new(1, AlignmentPolicy::default()).unwrap();
        let err = aligner.align(3, &FeatureSequence::zeros(0, 1), &seq(&[1.0])).unwrap_err();
        assert!(matches!(err, PipelineError::Alignment { index: 3, .. }));
    }

    #[test]
    fn test_dimension_mismatch_is_shape_error() {
        let aligner = SequenceAligner::new(1, AlignmentPolicy::default()).unwrap();
        let err = aligner.align(0, &ramp(3, 2, 1.0), &ramp(3, 3, 1.0)).unwrap_err();
        assert!(matches!(err, PipelineError::Shape { .. }));
    }

    #[test]
    fn test_expand_rejects_windows_that_miss_rows_or_corners() {
        // a single coarse cell only reaches fine rows 0..4
        assert!(Window::expand(&[(0, 0)], 6, 6, 1).is_none());
        // every row covered, but column 5 is never reachable in the last row
        assert!(Window::expand(&[(0, 0), (1, 0), (2, 0)], 6, 6, 1).is_none());

        let w = Window::expand(&[(0, 0), (1, 1), (2, 2)], 6, 6, 1).unwrap();
        assert_eq!(w.rows[0].0, 0);
        assert_eq!(w.rows[5].1, 5);
    }

    #[test]
    fn test_disconnected_window_falls_back_to_full_grid() {
        let x = seq(&[0.0, 1.0]);
        let y = seq(&[0.0, 1.0, 2.0]);
        let full = dtw(&x, &y, &Window::full(2, 3));
        assert_eq!(full.0, 1.0);
        assert_eq!(full.1, vec![(0, 0), (1, 1), (1, 2)]);

        // (1,2) has no neighbour inside this window
        let gap = Window { rows: vec![(0, 0), (2, 2)] };
        assert!(dtw(&x, &y, &gap).0.is_infinite());

        let gap = Window { rows: vec![(0, 0), (2, 2)] };
        assert_eq!(dtw_in_window_or_full(&x, &y, Some(gap)), full);
        assert_eq!(dtw_in_window_or_full(&x, &y, None), full);
    }

    #[test]
    fn test_zero_radius_rejected() {
        assert!(matches!(
            SequenceAligner::new(0, AlignmentPolicy::default()),
            Err(PipelineError::Config { .. })
        ));
    }
}

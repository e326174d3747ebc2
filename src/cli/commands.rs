// ============================================================
// Layer 1 - CLI Commands and Arguments
// ============================================================
// Defines the subcommands `train`, `align` and `evaluate`, and
// all their flags. Train defaults match TrainConfig::default().
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};

use crate::application::train_use_case::TrainConfig;
use crate::data::{aligner::AlignmentPolicy, corruptor::CorruptionKind};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Align, corrupt and pad a feature corpus, then train the autoencoder
    Train(TrainArgs),

    /// Report DTW distance and warped length for every corpus pair
    Align(AlignArgs),

    /// Reload a finished run and report its masked reconstruction loss
    Evaluate(EvaluateArgs),
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// JSON feature corpus: {"source": [[[f32]]], "target": [[[f32]]]}
    #[arg(long, default_value = "data/features.json")]
    pub corpus: String,

    /// Directory for weights, config, loss history, metrics and WAVs
    #[arg(long, default_value = "runs")]
    pub output_dir: String,

    /// Frames per example after truncation / zero padding (L_max)
    #[arg(long, default_value_t = 706)]
    pub max_frames: usize,

    /// Coefficients per frame (D)
    #[arg(long, default_value_t = 13)]
    pub num_coeffs: usize,

    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 50)]
    pub epochs: usize,

    /// SGD learning rate
    #[arg(long, default_value_t = 1e-5)]
    pub lr: f64,

    #[arg(long, default_value_t = 50)]
    pub hidden_1: usize,

    #[arg(long, default_value_t = 50)]
    pub hidden_2: usize,

    #[arg(long, default_value_t = 75)]
    pub hidden_3: usize,

    #[arg(long, value_enum, default_value_t = CorruptionKind::Masking)]
    pub corruption: CorruptionKind,

    /// Fraction of source cells to corrupt, in [0, 1]
    #[arg(long, default_value_t = 0.5)]
    pub corruption_frac: f64,

    #[arg(long, value_enum, default_value_t = AlignmentPolicy::PathOrder)]
    pub alignment_policy: AlignmentPolicy,

    /// FastDTW search radius
    #[arg(long, default_value_t = 1)]
    pub dtw_radius: usize,

    /// Sample rate of synthesized WAV artifacts, in Hz
    #[arg(long, default_value_t = 16_000)]
    pub sample_rate: u32,

    /// Seeds corruption, shuffling and weight initialisation
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            corpus_path:      a.corpus,
            output_dir:       a.output_dir,
            max_frames:       a.max_frames,
            num_coeffs:       a.num_coeffs,
            batch_size:       a.batch_size,
            epochs:           a.epochs,
            lr:               a.lr,
            hidden_1:         a.hidden_1,
            hidden_2:         a.hidden_2,
            hidden_3:         a.hidden_3,
            corruption:       a.corruption,
            corruption_frac:  a.corruption_frac,
            alignment_policy: a.alignment_policy,
            dtw_radius:       a.dtw_radius,
            sample_rate:      a.sample_rate,
            seed:             a.seed,
        }
    }
}

#[derive(Args, Debug)]
pub struct AlignArgs {
    #[arg(long, default_value = "data/features.json")]
    pub corpus: String,

    #[arg(long, default_value_t = 13)]
    pub num_coeffs: usize,

    #[arg(long, default_value_t = 1)]
    pub dtw_radius: usize,

    #[arg(long, value_enum, default_value_t = AlignmentPolicy::PathOrder)]
    pub alignment_policy: AlignmentPolicy,
}

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Output directory of a previous `train` run
    #[arg(long, default_value = "runs")]
    pub run_dir: String,

    /// Score on this corpus instead of the one the run trained on
    #[arg(long)]
    pub corpus: Option<String>,
}

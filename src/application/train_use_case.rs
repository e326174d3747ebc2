// ============================================================
// Layer 2 - TrainUseCase
// ============================================================
// Orchestrates a full training run in order:
//
//   Step 1: Validate the configuration     (fail before any work)
//   Step 2: Load the feature corpus        (Layer 4 - data)
//   Step 3: Align, corrupt, pad, shuffle   (Layer 4 - data)
//   Step 4: Initialise the autoencoder     (Layer 5 - ml)
//   Step 5: Save config                    (Layer 6 - infra)
//   Step 6: Run the training loop          (Layer 5 - ml)
//   Step 7: Save weights and loss history  (Layer 6 - infra)
//
// One StdRng seeded from `seed` drives corruption, the dataset
// shuffle and weight initialisation, in that order, so a run is
// reproducible from its train_config.json alone.
//
// Reference: Rust Book §13 (Iterators and Closures)
//            Burn Book §5 (Training)

use anyhow::{Context, Result};
use burn::{
    backend::{Autodiff, NdArray},
    module::AutodiffModule,
};
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, sync::Arc};

use crate::data::{
    aligner::{AlignmentPolicy, SequenceAligner},
    corruptor::{CorruptionKind, Corruptor},
    dataset::{BuildSummary, DatasetBuilder, VoiceDataset},
    loader::JsonCorpusLoader,
};
use crate::domain::{
    error::PipelineError,
    traits::{FeatureSource, WaveformSynthesizer},
};
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::MetricsLogger,
    wav_writer::WavArtifactWriter,
};
use crate::ml::{
    model::AutoencoderConfig,
    observer::{CancelToken, LogObserver, ReconstructionSink, TrainingObserver},
    synthesis::SynthesisHook,
    trainer::{StopReason, Trainer, TrainingSettings, TrainingState},
};

type TrainBackend = Autodiff<NdArray>;

// ─── Training Configuration ──────────────────────────────────────────────────
// Every knob of a run. Saved as train_config.json next to the
// weights so the model can be rebuilt and the run repeated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub corpus_path:      String,
    pub output_dir:       String,
    pub max_frames:       usize,
    pub num_coeffs:       usize,
    pub batch_size:       usize,
    pub epochs:           usize,
    pub lr:               f64,
    pub hidden_1:         usize,
    pub hidden_2:         usize,
    pub hidden_3:         usize,
    pub corruption:       CorruptionKind,
    pub corruption_frac:  f64,
    pub alignment_policy: AlignmentPolicy,
    pub dtw_radius:       usize,
    pub sample_rate:      u32,
    pub seed:             u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            corpus_path:      "data/features.json".to_string(),
            output_dir:       "runs".to_string(),
            max_frames:       706,
            num_coeffs:       13,
            batch_size:       32,
            epochs:           50,
            lr:               1e-5,
            hidden_1:         50,
            hidden_2:         50,
            hidden_3:         75,
            corruption:       CorruptionKind::Masking,
            corruption_frac:  0.5,
            alignment_policy: AlignmentPolicy::PathOrder,
            dtw_radius:       1,
            sample_rate:      16_000,
            seed:             42,
        }
    }
}

impl TrainConfig {
    /// Reject anything that would only fail later, after preprocessing.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let counts = [
            ("max_frames",  self.max_frames),
            ("num_coeffs",  self.num_coeffs),
            ("batch_size",  self.batch_size),
            ("epochs",      self.epochs),
            ("hidden_1",    self.hidden_1),
            ("hidden_2",    self.hidden_2),
            ("hidden_3",    self.hidden_3),
            ("dtw_radius",  self.dtw_radius),
            ("sample_rate", self.sample_rate as usize),
        ];
        if let Some((name, _)) = counts.iter().find(|(_, value)| *value == 0) {
            return Err(PipelineError::config(format!("{name} must be at least 1")));
        }
        if !(0.0..=1.0).contains(&self.corruption_frac) {
            return Err(PipelineError::config(format!(
                "corruption_frac must be within [0, 1], got {}",
                self.corruption_frac
            )));
        }
        if !self.lr.is_finite() || self.lr <= 0.0 {
            return Err(PipelineError::config(format!(
                "lr must be a positive number, got {}",
                self.lr
            )));
        }
        Ok(())
    }

    pub fn model_config(&self) -> AutoencoderConfig {
        AutoencoderConfig::new(self.max_frames, self.num_coeffs)
            .with_hidden_1(self.hidden_1)
            .with_hidden_2(self.hidden_2)
            .with_hidden_3(self.hidden_3)
    }

    pub fn training_settings(&self) -> TrainingSettings {
        TrainingSettings {
            epochs:        self.epochs,
            batch_size:    self.batch_size,
            learning_rate: self.lr,
        }
    }
}

/// What a finished (or cancelled) run reports back to the CLI.
#[derive(Debug, Clone)]
pub struct TrainReport {
    pub summary: BuildSummary,
    pub state:   TrainingState,
    pub stop:    StopReason,
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config:      TrainConfig,
    synthesizer: Option<Box<dyn WaveformSynthesizer>>,
    cancel:      CancelToken,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config, synthesizer: None, cancel: CancelToken::new() }
    }

    /// With a synthesizer attached, every epoch writes the last batch's
    /// reconstruction to `<output_dir>/wavs/learned_wav{i}.wav`.
    pub fn with_synthesizer(mut self, synthesizer: Box<dyn WaveformSynthesizer>) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    /// Handle that stops the run at the next epoch boundary.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn execute(self) -> Result<TrainReport> {
        let TrainUseCase { config, synthesizer, cancel } = self;
        let cfg = &config;

        // ── Step 1: Validate ──────────────────────────────────────────────────
        cfg.validate()?;

        // ── Steps 2-3: Preprocess ─────────────────────────────────────────────
        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let (dataset, summary) = preprocess(cfg, &mut rng).context("preprocessing")?;

        // ── Step 4: Model ─────────────────────────────────────────────────────
        let device = Default::default();
        let model = cfg.model_config().init::<TrainBackend, _>(&device, &mut rng);
        tracing::info!(
            "Autoencoder: {} → {} → {} → {} → {}",
            cfg.max_frames * cfg.num_coeffs,
            cfg.hidden_1,
            cfg.hidden_2,
            cfg.hidden_3,
            cfg.max_frames * cfg.num_coeffs
        );

        // ── Step 5: Save config ───────────────────────────────────────────────
        let ckpt = CheckpointManager::new(&cfg.output_dir)?;
        ckpt.save_config(cfg)?;

        // ── Step 6: Train ─────────────────────────────────────────────────────
        let mut observers: Vec<Box<dyn TrainingObserver>> = vec![
            Box::new(LogObserver),
            Box::new(MetricsLogger::new(&cfg.output_dir)?),
        ];

        let mut hook = match synthesizer {
            Some(synth) => {
                let writer = WavArtifactWriter::new(
                    PathBuf::from(&cfg.output_dir).join("wavs"),
                    cfg.sample_rate,
                )?;
                Some(SynthesisHook::new(synth, writer, cfg.sample_rate as f64))
            }
            None => None,
        };
        let sink = hook.as_mut().map(|h| h as &mut dyn ReconstructionSink);

        let trainer = Trainer::<TrainBackend>::new(cfg.training_settings(), device)?
            .with_cancel_token(cancel);

        let outcome = match trainer.run(model, Arc::new(dataset), &mut observers, sink) {
            Ok(outcome) => outcome,
            Err(e) => {
                if let PipelineError::Divergence { history, .. } = &e {
                    if let Err(save_err) = ckpt.save_history(history) {
                        tracing::warn!("Could not save partial loss history: {save_err:#}");
                    }
                }
                return Err(anyhow::Error::new(e).context("training"));
            }
        };

        // ── Step 7: Persist ───────────────────────────────────────────────────
        ckpt.save_model(&outcome.model.valid(), outcome.state.epochs_completed)?;
        ckpt.save_history(&outcome.state.losses)?;
        tracing::info!("Saved model and loss history to '{}'", cfg.output_dir);

        Ok(TrainReport { summary, state: outcome.state, stop: outcome.stop })
    }
}

/// Load, align, corrupt, pad and shuffle. Draws from `rng` exactly as a
/// training run does, so the same seed rebuilds the same dataset.
pub(crate) fn preprocess(cfg: &TrainConfig, rng: &mut StdRng) -> Result<(VoiceDataset, BuildSummary)> {
    tracing::info!("Loading feature corpus from '{}'", cfg.corpus_path);
    let pairs = JsonCorpusLoader::new(&cfg.corpus_path, cfg.num_coeffs).load_pairs()?;
    tracing::info!("Loaded {} utterance pairs", pairs.source.len());

    let aligner   = SequenceAligner::new(cfg.dtw_radius, cfg.alignment_policy)?;
    let corruptor = Corruptor::new(cfg.corruption, cfg.corruption_frac)?;
    let builder   = DatasetBuilder::new(aligner, corruptor, cfg.max_frames, cfg.num_coeffs);
    Ok(builder.build(&pairs, rng)?)
}

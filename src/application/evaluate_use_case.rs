// ============================================================
// Layer 2 - EvaluateUseCase
// ============================================================
// Reloads a finished training run and scores it:
//
//   Step 1: Read train_config.json          (Layer 6 - infra)
//   Step 2: Rebuild the dataset             (Layer 4 - data)
//   Step 3: Rebuild the model, load weights (Layer 5 + 6)
//   Step 4: Average masked MSE              (Layer 5 - ml)
//
// The dataset is rebuilt from the saved seed, so with the run's
// own corpus the examples (corruption included) are the ones the
// model was trained on. Pointing at another corpus scores the
// model on unseen pairs.
//
// Reference: Rust Book §9 (Error Handling)

use anyhow::{Context, Result};
use burn::backend::NdArray;
use rand::{rngs::StdRng, SeedableRng};
use std::sync::Arc;

use crate::application::train_use_case::preprocess;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::evaluator::evaluate;

type EvalBackend = NdArray;

#[derive(Debug, Clone)]
pub struct EvaluateReport {
    pub examples:            usize,
    pub skipped:             usize,
    pub average_loss:        f64,
    pub epochs_trained:      usize,
    pub final_training_loss: Option<f64>,
}

pub struct EvaluateUseCase {
    run_dir: String,
    corpus:  Option<String>,
}

impl EvaluateUseCase {
    pub fn new(run_dir: impl Into<String>, corpus: Option<String>) -> Self {
        Self { run_dir: run_dir.into(), corpus }
    }

    pub fn execute(&self) -> Result<EvaluateReport> {
        // ── Step 1: Config ────────────────────────────────────────────────────
        let ckpt = CheckpointManager::new(&self.run_dir)?;
        let mut cfg = ckpt.load_config()?;
        if let Some(corpus) = &self.corpus {
            cfg.corpus_path = corpus.clone();
        }
        cfg.validate()?;

        // ── Step 2: Dataset ───────────────────────────────────────────────────
        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let (dataset, summary) = preprocess(&cfg, &mut rng).context("preprocessing")?;

        // ── Step 3: Model ─────────────────────────────────────────────────────
        // Freshly initialised weights are only a template for the record.
        let device = Default::default();
        let template = cfg.model_config().init::<EvalBackend, _>(&device, &mut rng);
        let model = ckpt.load_model(template, &device)?;

        // ── Step 4: Score ─────────────────────────────────────────────────────
        let average_loss = evaluate(&model, Arc::new(dataset), cfg.batch_size, device)
            .context("evaluation")?;
        let history = ckpt.load_history()?;
        tracing::info!("Evaluated '{}': average loss {:.6}", self.run_dir, average_loss);

        Ok(EvaluateReport {
            examples:            summary.kept,
            skipped:             summary.skipped,
            average_loss,
            epochs_trained:      history.len(),
            final_training_loss: history.last().copied(),
        })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::{TrainConfig, TrainUseCase};
    use crate::data::loader::FeatureCorpus;
    use std::{fs, path::Path};

    fn utterance(frames: usize, offset: f32) -> Vec<Vec<f32>> {
        (0..frames).map(|i| vec![offset + i as f32 * 0.1, offset - i as f32 * 0.05]).collect()
    }

    fn write_corpus(dir: &Path, name: &str, offset: f32) -> String {
        let corpus = FeatureCorpus {
            source: vec![utterance(3, offset), utterance(5, offset + 0.2)],
            target: vec![utterance(4, offset + 0.1), utterance(4, offset + 0.3)],
        };
        let path = dir.join(name);
        fs::write(&path, serde_json::to_string(&corpus).unwrap()).unwrap();
        path.to_string_lossy().into_owned()
    }

    fn train(dir: &Path) -> (String, Vec<f64>) {
        let cfg = TrainConfig {
            corpus_path: write_corpus(dir, "corpus.json", 0.2),
            output_dir:  dir.join("run").to_string_lossy().into_owned(),
            max_frames:  4,
            num_coeffs:  2,
            batch_size:  2,
            epochs:      3,
            lr:          1e-3,
            hidden_1:    3,
            hidden_2:    3,
            hidden_3:    3,
            ..TrainConfig::default()
        };
        let out = cfg.output_dir.clone();
        let losses = TrainUseCase::new(cfg).execute().unwrap().state.losses;
        (out, losses)
    }

    #[test]
    fn test_evaluate_reloads_finished_run() {
        let dir = tempfile::tempdir().unwrap();
        let (run_dir, losses) = train(dir.path());

        let report = EvaluateUseCase::new(&run_dir, None).execute().unwrap();
        assert_eq!(report.examples, 2);
        assert_eq!(report.skipped, 0);
        assert_eq!(report.epochs_trained, 3);
        assert_eq!(report.final_training_loss, losses.last().copied());
        assert!(report.average_loss.is_finite() && report.average_loss >= 0.0);
    }

    #[test]
    fn test_evaluate_is_repeatable() {
        let dir = tempfile::tempdir().unwrap();
        let (run_dir, _) = train(dir.path());
        let first = EvaluateUseCase::new(&run_dir, None).execute().unwrap();
        let second = EvaluateUseCase::new(&run_dir, None).execute().unwrap();
        assert_eq!(first.average_loss, second.average_loss);
    }

    #[test]
    fn test_other_corpus_scores_differently() {
        let dir = tempfile::tempdir().unwrap();
        let (run_dir, _) = train(dir.path());
        let other = write_corpus(dir.path(), "other.json", 2.0);

        let own = EvaluateUseCase::new(&run_dir, None).execute().unwrap();
        let unseen = EvaluateUseCase::new(&run_dir, Some(other)).execute().unwrap();
        assert_ne!(own.average_loss, unseen.average_loss);
    }

    #[test]
    fn test_directory_without_run_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(EvaluateUseCase::new(dir.path().to_string_lossy(), None).execute().is_err());
    }
}

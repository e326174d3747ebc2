// ============================================================
// Layer 6 - Checkpoint Manager
// ============================================================
// Persists everything a finished run produces, using Burn's
// full-precision MessagePack recorder for the weights and
// serde_json for the rest. Weights are stored as f32, so a
// reloaded model is bit-for-bit the trained one.
//
// Directory layout:
//   <output_dir>/
//     model_epoch_50.mpk.gz   ← autoencoder weights
//     latest_epoch.json       ← number of epochs the weights saw
//     train_config.json       ← full run configuration
//     loss_history.json       ← average loss per epoch
//
// The config is stored next to the weights because the layer
// widths and L_max are needed to rebuild the model before the
// record can be loaded into it.
//
// Reference: Burn Book §5 (Records and Checkpointing)
//            Rust Book §9 (Error Handling)

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkGzFileRecorder, Recorder},
};
use std::{fs, path::PathBuf};

use crate::application::train_use_case::TrainConfig;
use crate::ml::model::StackedAutoencoder;

type WeightRecorder = NamedMpkGzFileRecorder<FullPrecisionSettings>;

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    /// Record the weights as `model_epoch_{epoch}` (the recorder adds the
    /// extension) and point `latest_epoch.json` at them.
    pub fn save_model<B: Backend>(&self, model: &StackedAutoencoder<B>, epoch: usize) -> Result<()> {
        let path = self.dir.join(format!("model_epoch_{epoch}"));

        WeightRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        let latest_path = self.dir.join("latest_epoch.json");
        fs::write(&latest_path, serde_json::to_string(&epoch)?)
            .with_context(|| "Failed to write latest_epoch.json")?;

        tracing::debug!("Saved checkpoint: epoch {}", epoch);
        Ok(())
    }

    /// Load the latest weights into `model`, which must have been built
    /// from the same AutoencoderConfig.
    pub fn load_model<B: Backend>(
        &self,
        model:  StackedAutoencoder<B>,
        device: &B::Device,
    ) -> Result<StackedAutoencoder<B>> {
        let epoch = self.latest_epoch()?;
        let path  = self.dir.join(format!("model_epoch_{epoch}"));

        tracing::info!("Loading checkpoint from epoch {}", epoch);

        let record = WeightRecorder::new()
            .load(path.clone(), device)
            .with_context(|| format!("Cannot load checkpoint '{}'", path.display()))?;

        Ok(model.load_record(record))
    }

    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join("train_config.json");
        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join("train_config.json");
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read config from '{}'", path.display()))?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn save_history(&self, losses: &[f64]) -> Result<()> {
        let path = self.dir.join("loss_history.json");
        fs::write(&path, serde_json::to_string_pretty(losses)?)
            .with_context(|| format!("Cannot write loss history to '{}'", path.display()))?;
        Ok(())
    }

    pub fn load_history(&self) -> Result<Vec<f64>> {
        let path = self.dir.join("loss_history.json");
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read loss history from '{}'", path.display()))?;
        Ok(serde_json::from_str(&json)?)
    }

    fn latest_epoch(&self) -> Result<usize> {
        let path = self.dir.join("latest_epoch.json");
        let s = fs::read_to_string(&path)
            .with_context(|| "Cannot find 'latest_epoch.json'. Has a training run finished here?")?;
        Ok(serde_json::from_str::<usize>(&s)?)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::AutoencoderConfig;
    use burn::backend::NdArray;
    use rand::{rngs::StdRng, SeedableRng};

    type B = NdArray;

    fn small_config() -> AutoencoderConfig {
        AutoencoderConfig::new(3, 2).with_hidden_1(4).with_hidden_2(4).with_hidden_3(5)
    }

    fn weights(model: &StackedAutoencoder<B>) -> Vec<f32> {
        model.encode_1.weight.val().into_data().convert::<f32>().to_vec::<f32>().unwrap()
    }

    #[test]
    fn test_model_round_trips_through_recorder() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path()).unwrap();
        let device = Default::default();

        let trained = small_config().init::<B, _>(&device, &mut StdRng::seed_from_u64(1));
        manager.save_model(&trained, 7).unwrap();

        let fresh = small_config().init::<B, _>(&device, &mut StdRng::seed_from_u64(2));
        assert_ne!(weights(&fresh), weights(&trained));

        let restored = manager.load_model(fresh, &device).unwrap();
        assert_eq!(weights(&restored), weights(&trained));
        assert_eq!(fs::read_to_string(dir.path().join("latest_epoch.json")).unwrap(), "7");
    }

    #[test]
    fn test_config_and_history_are_json() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path()).unwrap();

        let cfg = TrainConfig { epochs: 3, ..TrainConfig::default() };
        manager.save_config(&cfg).unwrap();
        assert_eq!(manager.load_config().unwrap().epochs, 3);

        manager.save_history(&[2.5, 1.25]).unwrap();
        assert_eq!(manager.load_history().unwrap(), vec![2.5, 1.25]);
    }

    #[test]
    fn test_load_without_checkpoint_fails() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path()).unwrap();
        let device = Default::default();
        let model = small_config().init::<B, _>(&device, &mut StdRng::seed_from_u64(0));
        assert!(manager.load_model(model, &device).is_err());
    }
}

// ============================================================
// Layer 5 - Training Loop
// ============================================================
// Plain minibatch gradient descent over a fixed dataset order.
//
// Per epoch:
//   - check the cancel token
//   - for every batch: forward, masked MSE, backward, SGD step,
//     bump the global step counter
//   - average the batch losses; a non-finite average stops
//     training with a Divergence error carrying the history
//   - report the EpochRecord to the observer
//   - if a reconstruction sink is attached, re-run the updated
//     model on the last batch and hand the result over
//
// Key Burn insight:
//   - Training uses Autodiff<NdArray> for gradients
//   - model.valid() returns the model on the inner backend, used
//     for the artifact pass so it never touches the autodiff graph
//
// Reference: Burn Book §5 (Training)

use std::{sync::Arc, time::Instant};

use burn::{
    module::AutodiffModule,
    optim::{GradientsParams, Optimizer, SgdConfig},
    prelude::*,
    tensor::{backend::AutodiffBackend, ElementConversion},
};
use serde::{Deserialize, Serialize};

use crate::data::batcher::frame_loader;
use crate::data::dataset::VoiceDataset;
use crate::domain::error::PipelineError;
use crate::ml::model::StackedAutoencoder;
use crate::ml::observer::{
    CancelToken, EpochRecord, ReconstructedBatch, ReconstructionSink, TrainingObserver,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSettings {
    pub epochs:        usize,
    pub batch_size:    usize,
    pub learning_rate: f64,
}

impl TrainingSettings {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.epochs == 0 {
            return Err(PipelineError::config("epoch count must be at least 1"));
        }
        if self.batch_size == 0 {
            return Err(PipelineError::config("batch size must be at least 1"));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(PipelineError::config(format!(
                "learning rate must be a positive number, got {}",
                self.learning_rate
            )));
        }
        Ok(())
    }
}

/// Progress accumulated over a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingState {
    pub epochs_completed: usize,
    /// Average loss of each completed epoch, in order.
    pub losses:           Vec<f64>,
    pub global_step:      u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Completed,
    Cancelled,
}

pub struct TrainingOutcome<B: AutodiffBackend> {
    pub model: StackedAutoencoder<B>,
    pub state: TrainingState,
    pub stop:  StopReason,
}

pub struct Trainer<B: AutodiffBackend> {
    settings: TrainingSettings,
    device:   B::Device,
    cancel:   CancelToken,
}

impl<B: AutodiffBackend> Trainer<B> {
    pub fn new(settings: TrainingSettings, device: B::Device) -> Result<Self, PipelineError> {
        settings.validate()?;
        Ok(Self { settings, device, cancel: CancelToken::new() })
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn run(
        &self,
        model:    StackedAutoencoder<B>,
        dataset:  Arc<VoiceDataset>,
        observer: &mut dyn TrainingObserver,
        mut sink: Option<&mut dyn ReconstructionSink>,
    ) -> Result<TrainingOutcome<B>, PipelineError> {
        if dataset.is_empty() {
            return Err(PipelineError::EmptyDataset { attempted: 0, skipped: 0 });
        }
        if dataset.max_frames() != model.max_frames || dataset.num_coeffs() != model.num_coeffs {
            return Err(PipelineError::shape(format!(
                "dataset is {} × {} but the model expects {} × {}",
                dataset.max_frames(),
                dataset.num_coeffs(),
                model.max_frames,
                model.num_coeffs
            )));
        }

        let cfg = &self.settings;
        let loader = frame_loader::<B>(dataset, cfg.batch_size, self.device.clone())?;

        // θ = θ - lr * ∇θ
        let mut optim = SgdConfig::new().init();
        let mut model = model;
        let mut state = TrainingState::default();

        // ── Epoch loop ────────────────────────────────────────────────────────
        for epoch in 0..cfg.epochs {
            if self.cancel.is_cancelled() {
                tracing::info!("Training cancelled before epoch {epoch}");
                return Ok(TrainingOutcome { model, state, stop: StopReason::Cancelled });
            }

            let started = Instant::now();
            let mut loss_sum = 0.0f64;
            let mut num_batches = 0usize;
            let mut last_input: Option<Tensor<B, 3>> = None;

            for frames in loader.iter() {
                if sink.is_some() {
                    last_input = Some(frames.corrupted.clone());
                }

                let (loss, _) = model.forward_loss(frames.corrupted, frames.targets, frames.target_weights);
                let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
                loss_sum += loss_val;
                num_batches += 1;

                // Backward pass + SGD update
                let grads = loss.backward();
                let grads = GradientsParams::from_grads(grads, &model);
                model = optim.step(cfg.learning_rate, model, grads);

                state.global_step += 1;
                observer.on_batch_complete(state.global_step, loss_val);
            }

            let average_loss = loss_sum / num_batches as f64;
            if !average_loss.is_finite() {
                tracing::error!("Epoch {epoch}: loss is {average_loss}, stopping");
                return Err(PipelineError::Divergence {
                    epoch,
                    loss:    average_loss,
                    history: state.losses,
                });
            }

            state.losses.push(average_loss);
            state.epochs_completed = epoch + 1;
            let record = EpochRecord {
                epoch,
                average_loss,
                duration:    started.elapsed(),
                global_step: state.global_step,
            };
            observer.on_epoch_complete(&record);

            if let (Some(sink), Some(input)) = (sink.as_deref_mut(), last_input) {
                emit_reconstruction(&model, input, epoch, sink);
            }
        }

        tracing::info!("Training complete after {} epochs", state.epochs_completed);
        Ok(TrainingOutcome { model, state, stop: StopReason::Completed })
    }
}

/// Artifact side channel: failures are logged and never stop training.
fn emit_reconstruction<B: AutodiffBackend>(
    model: &StackedAutoencoder<B>,
    input: Tensor<B, 3>,
    epoch: usize,
    sink:  &mut dyn ReconstructionSink,
) {
    let [batch_size, max_frames, num_coeffs] = input.dims();
    let output = model.valid().forward(input.inner());
    let values = match output.into_data().convert::<f32>().to_vec::<f32>() {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!("Epoch {epoch}: cannot read reconstruction: {e:?}");
            return;
        }
    };
    let batch = ReconstructedBatch { epoch, batch_size, max_frames, num_coeffs, values };
    if let Err(e) = sink.on_reconstruction(&batch) {
        tracing::warn!("Epoch {epoch}: reconstruction artifact failed: {e:#}");
    }
}

// ============================================================
// Layer 6 - Infrastructure Layer
// ============================================================
// Everything that touches the filesystem on behalf of a run:
//
//   checkpoint.rs  - Model weights via Burn's full-precision
//                    MessagePack recorder, plus the run config and loss history as
//                    JSON next to them.
//
//   metrics.rs     - One CSV row per epoch, plugged into the
//                    trainer as a TrainingObserver.
//
//   wav_writer.rs  - Writes reconstructed waveforms as
//                    learned_wav{i}.wav files with hound.
//
// Reference: Rust Book §7 (Modules)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;

/// WAV files for reconstructed examples
pub mod wav_writer;

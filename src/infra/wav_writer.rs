// ============================================================
// Layer 6 - WAV Artifact Writer
// ============================================================
// Writes each normalised waveform as a mono 32-bit float WAV:
//
//   <dir>/learned_wav0.wav
//   <dir>/learned_wav1.wav
//   ...
//
// One file per example slot; every epoch overwrites the
// previous epoch's files so the directory always holds the
// latest reconstruction.
//
// Reference: hound crate documentation

use anyhow::{Context, Result};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::{fs, path::PathBuf};

use crate::domain::traits::WaveformWriter;

pub struct WavArtifactWriter {
    dir:         PathBuf,
    sample_rate: u32,
}

impl WavArtifactWriter {
    pub fn new(dir: impl Into<PathBuf>, sample_rate: u32) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create artifact directory '{}'", dir.display()))?;
        Ok(Self { dir, sample_rate })
    }

    pub fn path_for(&self, index: usize) -> PathBuf {
        self.dir.join(format!("learned_wav{index}.wav"))
    }
}

impl WaveformWriter for WavArtifactWriter {
    fn write(&mut self, epoch: usize, index: usize, samples: &[f32]) -> Result<()> {
        let spec = WavSpec {
            channels:        1,
            sample_rate:     self.sample_rate,
            bits_per_sample: 32,
            sample_format:   SampleFormat::Float,
        };
        let path = self.path_for(index);
        let mut writer = WavWriter::create(&path, spec)
            .with_context(|| format!("Cannot create '{}'", path.display()))?;
        for &s in samples {
            writer.write_sample(s)?;
        }
        writer.finalize()?;
        tracing::debug!("Epoch {epoch}: wrote {} samples to '{}'", samples.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_readable_float_wav() {
        let dir = tempfile::tempdir().unwrap();
        let mut w = WavArtifactWriter::new(dir.path().join("wavs"), 16_000).unwrap();
        w.write(0, 2, &[-1.0, 0.0, 0.5, 1.0]).unwrap();

        let mut reader = hound::WavReader::open(w.path_for(2)).unwrap();
        assert_eq!(reader.spec().sample_rate, 16_000);
        assert_eq!(reader.spec().channels, 1);
        let samples: Vec<f32> = reader.samples::<f32>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![-1.0, 0.0, 0.5, 1.0]);
    }
}

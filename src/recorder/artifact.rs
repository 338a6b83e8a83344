//! Finalized recordings.

use anyhow::Result;
use chrono::{DateTime, Local};
use hound::WavWriter;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_ARTIFACT_ID: AtomicU64 = AtomicU64::new(1);

/// Immutable recorded audio (i16 PCM mono).
///
/// Cloning shares the sample buffer, so the playback surface, the visualizer
/// and the transport can all hold the same recording without copying it.
#[derive(Debug, Clone)]
pub struct AudioArtifact {
    id: u64,
    samples: Arc<[i16]>,
    sample_rate: u32,
    created_at: DateTime<Local>,
}

impl AudioArtifact {
    /// Wraps finalized samples into a new artifact with a fresh id.
    pub fn new(samples: Vec<i16>, sample_rate: u32) -> Self {
        Self {
            id: NEXT_ARTIFACT_ID.fetch_add(1, Ordering::Relaxed),
            samples: samples.into(),
            sample_rate,
            created_at: Local::now(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Returns a shared handle to the sample buffer.
    pub fn shared_samples(&self) -> Arc<[i16]> {
        Arc::clone(&self.samples)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn created_at(&self) -> DateTime<Local> {
        self.created_at
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Exact length in seconds.
    pub fn duration_secs_f64(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Length in whole seconds, rounded down. This seeds the playback timer.
    pub fn duration_secs(&self) -> u64 {
        self.duration_secs_f64().floor() as u64
    }

    fn wav_spec(&self) -> hound::WavSpec {
        hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        }
    }

    /// Writes the artifact as a 16-bit mono WAV file.
    pub fn write_wav(&self, path: &Path) -> Result<()> {
        let mut writer = WavWriter::create(path, self.wav_spec())?;
        for &sample in self.samples.iter() {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
        tracing::debug!("Artifact {} written to {}", self.id, path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_rounds_down() {
        let artifact = AudioArtifact::new(vec![0; 25_000], 10_000);
        assert_eq!(artifact.duration_secs(), 2);
        assert!((artifact.duration_secs_f64() - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_ids_are_unique() {
        let a = AudioArtifact::new(vec![], 16_000);
        let b = AudioArtifact::new(vec![], 16_000);
        assert_ne!(a.id(), b.id());
        assert!(a.is_empty());
        assert_eq!(a.duration_secs(), 0);
    }

    #[test]
    fn test_clone_shares_samples() {
        let artifact = AudioArtifact::new(vec![1, 2, 3], 16_000);
        let clone = artifact.clone();
        assert!(Arc::ptr_eq(&artifact.shared_samples(), &clone.shared_samples()));
        assert_eq!(clone.id(), artifact.id());
    }

    #[test]
    fn test_write_wav_decodes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memo.wav");
        let artifact = AudioArtifact::new(vec![0, 1000, -1000, 32767], 8_000);
        artifact.write_wav(&path).unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, 8_000);
        assert_eq!(reader.spec().channels, 1);
        let decoded: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(decoded, vec![0, 1000, -1000, 32767]);
    }
}

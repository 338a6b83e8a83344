//! Playback of finished recordings.
//!
//! `CpalPlayer` plays the mono artifact on every channel of an output device,
//! stepping through the samples at the ratio between the recording rate and
//! the device rate. Pausing drops the output stream; the read position lives
//! outside the stream so playback resumes where it stopped.

use super::artifact::AudioArtifact;
use super::capture::suppress_alsa_warnings;
use super::error::{classify_backend_error, RecorderError};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SampleFormat, SizedSample};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Output side of the recorder: plays, pauses and scrubs one artifact.
pub trait PlaybackSurface {
    /// Loads a new artifact at position 0, replacing any previous one.
    fn load(&mut self, artifact: &AudioArtifact) -> Result<(), RecorderError>;

    /// Starts or resumes playback from the current position.
    fn play(&mut self) -> Result<(), RecorderError>;

    fn pause(&mut self);

    /// Moves the read position to `fraction` of the artifact.
    fn seek(&mut self, fraction: f64);

    /// Stops playback and forgets the artifact.
    fn unload(&mut self);

    /// Read position as a fraction of the artifact (0.0 to 1.0).
    fn progress(&self) -> f64;

    /// Returns true once after playback runs off the end of the artifact.
    fn take_finished(&mut self) -> bool;
}

/// Read position shared between the player and the device callback.
#[derive(Debug, Default)]
struct PlayHead {
    position: AtomicUsize,
    finished: AtomicBool,
}

/// Playback surface on a cpal output device.
pub struct CpalPlayer {
    device_spec: String,
    artifact: Option<AudioArtifact>,
    head: Arc<PlayHead>,
    stream: Option<cpal::Stream>,
}

impl CpalPlayer {
    /// `device_spec` is "default", an output device index, or its name.
    pub fn new(device_spec: String) -> Self {
        Self {
            device_spec,
            artifact: None,
            head: Arc::new(PlayHead::default()),
            stream: None,
        }
    }

    fn open_device(&self) -> Result<cpal::Device, RecorderError> {
        suppress_alsa_warnings(|| {
            let host = cpal::default_host();
            if self.device_spec == "default" {
                return host.default_output_device().ok_or_else(|| {
                    RecorderError::Playback("no default output device".to_string())
                });
            }

            let mut devices = host
                .output_devices()
                .map_err(|e| RecorderError::Playback(format!("Failed to enumerate devices: {e}")))?;
            let found = match self.device_spec.parse::<usize>() {
                Ok(index) => devices.nth(index),
                Err(_) => devices.find(|d| {
                    d.name().map(|name| name == self.device_spec).unwrap_or(false)
                }),
            };
            found.ok_or_else(|| {
                RecorderError::Playback(format!("output device '{}' not found", self.device_spec))
            })
        })
    }

    fn start_stream(&self, artifact: &AudioArtifact) -> Result<cpal::Stream, RecorderError> {
        let device = self.open_device()?;
        let supported = device
            .default_output_config()
            .map_err(|e| playback_error(&e.to_string()))?;
        let config: cpal::StreamConfig = supported.clone().into();
        let source = PlaybackSource {
            samples: artifact.shared_samples(),
            step: artifact.sample_rate() as f64 / config.sample_rate.0 as f64,
            channels: config.channels as usize,
            head: Arc::clone(&self.head),
        };

        tracing::debug!(
            "Playback on {}Hz, {} channels, {:?} (step {:.3})",
            config.sample_rate.0,
            config.channels,
            supported.sample_format(),
            source.step
        );

        let stream = match supported.sample_format() {
            SampleFormat::F32 => build_playback_stream::<f32>(&device, &config, source),
            SampleFormat::I16 => build_playback_stream::<i16>(&device, &config, source),
            SampleFormat::U16 => build_playback_stream::<u16>(&device, &config, source),
            other => Err(RecorderError::Playback(format!(
                "unsupported output sample format {other:?}"
            ))),
        }?;
        stream.play().map_err(|e| playback_error(&e.to_string()))?;
        Ok(stream)
    }
}

impl PlaybackSurface for CpalPlayer {
    fn load(&mut self, artifact: &AudioArtifact) -> Result<(), RecorderError> {
        self.unload();
        self.artifact = Some(artifact.clone());
        tracing::debug!("Artifact {} loaded for playback", artifact.id());
        Ok(())
    }

    fn play(&mut self) -> Result<(), RecorderError> {
        let Some(artifact) = self.artifact.clone() else {
            return Err(RecorderError::Playback("nothing loaded".to_string()));
        };
        if self.head.position.load(Ordering::Acquire) >= artifact.samples().len() {
            self.head.position.store(0, Ordering::Release);
        }
        self.head.finished.store(false, Ordering::Release);
        self.stream = Some(self.start_stream(&artifact)?);
        Ok(())
    }

    fn pause(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                tracing::debug!("Pausing output stream failed: {}", e);
            }
        }
    }

    fn seek(&mut self, fraction: f64) {
        let len = self.artifact.as_ref().map_or(0, |a| a.samples().len());
        let fraction = if fraction.is_finite() {
            fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let position = ((len as f64) * fraction) as usize;
        self.head.position.store(position.min(len), Ordering::Release);
    }

    fn unload(&mut self) {
        self.pause();
        self.artifact = None;
        self.head.position.store(0, Ordering::Release);
        self.head.finished.store(false, Ordering::Release);
    }

    fn progress(&self) -> f64 {
        match &self.artifact {
            Some(artifact) if !artifact.is_empty() => {
                let position = self.head.position.load(Ordering::Acquire);
                (position as f64 / artifact.samples().len() as f64).min(1.0)
            }
            _ => 0.0,
        }
    }

    fn take_finished(&mut self) -> bool {
        let finished = self.head.finished.swap(false, Ordering::AcqRel);
        if finished {
            self.pause();
        }
        finished
    }
}

/// Everything the output callback needs, moved into the stream.
struct PlaybackSource {
    samples: Arc<[i16]>,
    /// Source samples consumed per output frame
    step: f64,
    channels: usize,
    head: Arc<PlayHead>,
}

impl PlaybackSource {
    /// Fills one interleaved output buffer and advances the shared position.
    fn fill(&self, out: &mut [f32], frac: &mut f64) {
        let mut position = self.head.position.load(Ordering::Acquire);
        let channels = self.channels.max(1);

        for frame in out.chunks_mut(channels) {
            let value = match self.samples.get(position) {
                Some(&sample) => sample as f32 / 32768.0,
                None => 0.0,
            };
            frame.iter_mut().for_each(|slot| *slot = value);

            if position < self.samples.len() {
                *frac += self.step;
                let advance = frac.floor();
                *frac -= advance;
                position = (position + advance as usize).min(self.samples.len());
            }
        }

        self.head.position.store(position, Ordering::Release);
        if position >= self.samples.len() {
            self.head.finished.store(true, Ordering::Release);
        }
    }
}

fn build_playback_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    source: PlaybackSource,
) -> Result<cpal::Stream, RecorderError>
where
    T: SizedSample + FromSample<f32>,
{
    let mut frac = 0.0f64;
    let mut scratch: Vec<f32> = Vec::new();
    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                scratch.resize(data.len(), 0.0);
                source.fill(&mut scratch, &mut frac);
                for (slot, &value) in data.iter_mut().zip(scratch.iter()) {
                    *slot = T::from_sample(value);
                }
            },
            |err| {
                tracing::error!("Playback stream error: {}", err);
            },
            None,
        )
        .map_err(|e| playback_error(&e.to_string()))
}

/// Output failures keep the permission distinction but are reported as playback errors.
fn playback_error(message: &str) -> RecorderError {
    match classify_backend_error(message) {
        RecorderError::PermissionDenied => RecorderError::PermissionDenied,
        _ => RecorderError::Playback(message.to_string()),
    }
}

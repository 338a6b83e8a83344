//! Recording and playback state machine.
//!
//! State transitions:
//! - Idle -> Recording (start_recording)
//! - Recording -> Ready (stop_recording, produces an AudioArtifact)
//! - Ready | Paused -> Playing (play)
//! - Playing -> Paused (pause, play again, or end of artifact)
//! - Ready | Playing | Paused -> Idle (clear)
//! - Ready | Playing | Paused -> Recording (start_recording replaces the artifact)
//!
//! Operations that are not valid in the current state return
//! `InvalidTransition` and change nothing. A failed `start_recording` leaves
//! the previous state and artifact in place.

use super::artifact::AudioArtifact;
use super::cursor::PlaybackCursor;
use super::error::RecorderError;
use super::playback::PlaybackSurface;
use super::session::{CaptureSession, Microphone, StreamConstraints};
use super::timer::{CountdownTimer, Tick};
use super::transport::Transport;
use super::visualizations::{Visualizer, WaveformSurface};
use std::fmt;
use std::time::Instant;

/// Controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    /// Nothing recorded yet, or the last recording was cleared
    Idle,
    /// Capturing from the microphone
    Recording,
    /// A recording exists and has not been played yet
    Ready,
    Playing,
    Paused,
}

impl RecorderState {
    pub fn has_artifact(&self) -> bool {
        matches!(
            self,
            RecorderState::Ready | RecorderState::Playing | RecorderState::Paused
        )
    }
}

impl fmt::Display for RecorderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Recording => write!(f, "recording"),
            Self::Ready => write!(f, "ready"),
            Self::Playing => write!(f, "playing"),
            Self::Paused => write!(f, "paused"),
        }
    }
}

/// Owns the capture lifecycle, the current artifact and both clocks.
pub struct RecorderController<V: Visualizer = WaveformSurface> {
    state: RecorderState,
    constraints: StreamConstraints,
    microphone: Box<dyn Microphone>,
    player: Box<dyn PlaybackSurface>,
    transport: Box<dyn Transport>,
    visualizer: V,
    live_view: bool,
    session: Option<CaptureSession>,
    artifact: Option<AudioArtifact>,
    cursor: PlaybackCursor,
    elapsed: CountdownTimer,
    remaining: CountdownTimer,
}

impl<V: Visualizer> RecorderController<V> {
    pub fn new(
        constraints: StreamConstraints,
        microphone: Box<dyn Microphone>,
        player: Box<dyn PlaybackSurface>,
        transport: Box<dyn Transport>,
        visualizer: V,
    ) -> Self {
        Self {
            state: RecorderState::Idle,
            constraints,
            microphone,
            player,
            transport,
            visualizer,
            live_view: false,
            session: None,
            artifact: None,
            cursor: PlaybackCursor::empty(),
            elapsed: CountdownTimer::new(0),
            remaining: CountdownTimer::new(0)
                .with_on_finish(|| tracing::debug!("Playback clock reached 0:00")),
        }
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn artifact(&self) -> Option<&AudioArtifact> {
        self.artifact.as_ref()
    }

    pub fn cursor(&self) -> PlaybackCursor {
        self.cursor
    }

    pub fn visualizer(&self) -> &V {
        &self.visualizer
    }

    pub fn visualizer_mut(&mut self) -> &mut V {
        &mut self.visualizer
    }

    /// Clock for the current state: elapsed while recording, remaining otherwise.
    pub fn timer(&self) -> &CountdownTimer {
        if self.state == RecorderState::Recording {
            &self.elapsed
        } else {
            &self.remaining
        }
    }

    /// Whether the playback countdown is running. The recording clock is not
    /// included; it runs exactly while the state is `Recording`.
    pub fn is_playback_clock_running(&self) -> bool {
        self.remaining.is_running()
    }

    /// Opens a capture session and starts the elapsed clock.
    ///
    /// # Errors
    /// - `InvalidTransition` if already recording
    /// - `PermissionDenied` / `DeviceUnavailable` from stream acquisition; the
    ///   controller keeps its previous state so the user can retry
    pub fn start_recording(&mut self) -> Result<(), RecorderError> {
        if self.state == RecorderState::Recording {
            return Err(self.invalid("start recording"));
        }

        let session = CaptureSession::open(self.microphone.as_mut(), &self.constraints)
            .map_err(|e| {
                tracing::error!("Failed to start recording: {}", e);
                e
            })?;

        if self.artifact.is_some() {
            tracing::debug!("New recording replaces the current artifact");
            self.discard_artifact();
        }

        self.live_view = match self.visualizer.begin_live(session.sample_rate()) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Live waveform disabled: {}", e);
                false
            }
        };

        let now = Instant::now();
        self.elapsed.restart_from(0, now);
        self.elapsed.set_running(true, now);
        self.session = Some(session);
        self.transition(RecorderState::Recording);
        Ok(())
    }

    /// Finalizes the capture into an artifact and releases the input stream.
    pub fn stop_recording(&mut self) -> Result<&AudioArtifact, RecorderError> {
        if self.state != RecorderState::Recording {
            return Err(self.invalid("stop recording"));
        }
        let Some(mut session) = self.session.take() else {
            return Err(self.invalid("stop recording"));
        };

        self.feed_live_view(session.drain_live());
        tracing::debug!(
            "Finishing capture after {:.1}s ({} chunks buffered)",
            session.elapsed().as_secs_f64(),
            session.chunk_count()
        );
        let artifact = session.finish();
        self.elapsed.set_running(false, Instant::now());
        self.live_view = false;

        if let Err(e) = self.player.load(&artifact) {
            tracing::warn!("Playback surface rejected the recording: {}", e);
        }
        if let Err(e) = self.visualizer.load(&artifact) {
            tracing::warn!("Static waveform unavailable: {}", e);
        }

        self.cursor = PlaybackCursor::at_start(artifact.duration_secs());
        self.remaining
            .restart_from(self.cursor.remaining_secs, Instant::now());
        self.transition(RecorderState::Ready);
        Ok(&*self.artifact.insert(artifact))
    }

    /// Starts playback, or pauses if already playing.
    pub fn play(&mut self) -> Result<(), RecorderError> {
        match self.state {
            RecorderState::Playing => return self.pause(),
            RecorderState::Ready | RecorderState::Paused => {}
            _ => return Err(self.invalid("play")),
        }

        let now = Instant::now();
        if self.cursor.position >= 1.0 || self.cursor.remaining_secs == 0 {
            tracing::debug!("Play from the end restarts at the beginning");
            self.cursor.rewind();
            self.player.seek(0.0);
            self.visualizer.set_progress(0.0);
            self.remaining.restart_from(self.cursor.remaining_secs, now);
        }
        if !self.cursor.seek_derived {
            self.cursor.remaining_secs = self.cursor.duration_secs;
            self.remaining.set_start(self.cursor.remaining_secs, now);
        }

        self.player.play()?;
        self.remaining.set_running(true, now);
        self.transition(RecorderState::Playing);
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), RecorderError> {
        match self.state {
            RecorderState::Playing => {}
            RecorderState::Ready | RecorderState::Paused => return Ok(()),
            _ => return Err(self.invalid("pause")),
        }

        self.player.pause();
        self.remaining.set_running(false, Instant::now());
        self.cursor.position = self.player.progress();
        self.cursor.remaining_secs = self.remaining.value();
        self.transition(RecorderState::Paused);
        Ok(())
    }

    /// Scrubs to `fraction` of the artifact. Playing or paused stays as it was.
    pub fn seek(&mut self, fraction: f64) -> Result<(), RecorderError> {
        if !self.state.has_artifact() {
            return Err(self.invalid("seek"));
        }

        self.cursor.seek(fraction);
        self.player.seek(self.cursor.position);
        self.visualizer.set_progress(self.cursor.position);
        self.remaining
            .restart_from(self.cursor.remaining_secs, Instant::now());
        tracing::debug!(
            "Seek to {:.0}% ({}s remaining)",
            self.cursor.position * 100.0,
            self.cursor.remaining_secs
        );
        Ok(())
    }

    /// Seeks relative to the current position.
    pub fn seek_by(&mut self, delta: f64) -> Result<(), RecorderError> {
        let position = if self.state == RecorderState::Playing {
            self.player.progress()
        } else {
            self.cursor.position
        };
        self.seek(position + delta)
    }

    /// Discards the artifact and resets playback.
    ///
    /// Rejected while recording; stop first.
    pub fn clear(&mut self) -> Result<(), RecorderError> {
        if !self.state.has_artifact() {
            return Err(self.invalid("clear"));
        }
        self.discard_artifact();
        self.transition(RecorderState::Idle);
        Ok(())
    }

    /// Hands the current artifact to the transport. Local state is unchanged.
    pub fn send(&mut self) -> Result<String, RecorderError> {
        let Some(artifact) = self.artifact.as_ref().filter(|_| self.state.has_artifact()) else {
            return Err(self.invalid("send"));
        };
        tracing::info!(
            "Sending artifact #{} via {} transport",
            artifact.id(),
            self.transport.name()
        );
        self.transport.deliver(artifact)
    }

    /// Advances everything driven by time: live waveform, clocks, end of playback.
    ///
    /// Called once per UI frame.
    pub fn pump(&mut self, now: Instant) {
        if let Some(session) = self.session.as_mut() {
            let chunks = session.drain_live();
            self.feed_live_view(chunks);
        }

        if let Tick::Advanced(seconds) = self.elapsed.poll(now) {
            if seconds % 60 == 0 {
                tracing::debug!("Recording: {}s recorded", seconds);
            }
        }
        self.remaining.poll(now);

        if self.state == RecorderState::Playing {
            let progress = self.player.progress();
            self.cursor.position = progress;
            self.visualizer.set_progress(progress);
            if self.player.take_finished() {
                self.finish_playback(now);
            }
        }
    }

    /// Stops an in-progress capture without keeping the audio, and halts playback.
    pub fn shutdown(&mut self) {
        if let Some(session) = self.session.take() {
            let artifact = session.finish();
            tracing::info!(
                "Discarding unfinished recording ({:.2}s) on exit",
                artifact.duration_secs_f64()
            );
        }
        self.player.pause();
        let now = Instant::now();
        self.elapsed.set_running(false, now);
        self.remaining.set_running(false, now);
    }

    fn finish_playback(&mut self, now: Instant) {
        tracing::debug!("Playback reached the end of the recording");
        self.player.seek(0.0);
        self.visualizer.set_progress(0.0);
        self.cursor.rewind();
        self.remaining.set_running(false, now);
        self.remaining.restart_from(self.cursor.remaining_secs, now);
        self.transition(RecorderState::Paused);
    }

    fn discard_artifact(&mut self) {
        self.player.unload();
        self.visualizer.clear();
        self.artifact = None;
        self.cursor = PlaybackCursor::empty();
        let now = Instant::now();
        self.remaining.set_running(false, now);
        self.remaining.restart_from(0, now);
    }

    fn feed_live_view(&mut self, chunks: Vec<Vec<i16>>) {
        if !self.live_view || chunks.is_empty() {
            return;
        }
        let samples: Vec<i16> = chunks.into_iter().flatten().collect();
        if let Err(e) = self.visualizer.feed_live(&samples) {
            tracing::warn!("Live waveform disabled: {}", e);
            self.live_view = false;
        }
    }

    fn transition(&mut self, to: RecorderState) {
        tracing::debug!("Recorder state {} -> {}", self.state, to);
        self.state = to;
    }

    fn invalid(&self, operation: &'static str) -> RecorderError {
        tracing::debug!("Rejected '{}' while {}", operation, self.state);
        RecorderError::InvalidTransition {
            operation,
            state: self.state,
        }
    }
}

impl<V: Visualizer> Drop for RecorderController<V> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

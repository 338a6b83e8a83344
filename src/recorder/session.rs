//! Capture sessions and the microphone seam.
//!
//! A `CaptureSession` exclusively owns the live input stream and the chunk
//! buffer for one recording. `finish` releases the stream before flushing the
//! buffer into an `AudioArtifact`; dropping an unfinished session releases the
//! stream as well.

use super::artifact::AudioArtifact;
use super::error::RecorderError;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Chunks buffered for the live waveform before new ones are dropped.
pub const LIVE_FEED_CAPACITY: usize = 64;

/// Input device selection for a capture attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConstraints {
    /// "default", a device index, or a device name
    pub device: String,
    /// Preferred sample rate in Hz (the device may use another)
    pub sample_rate: u32,
}

/// A live input stream delivering mono chunks into a `ChunkSink`.
pub trait InputStream {
    /// Actual sample rate of the delivered chunks.
    fn sample_rate(&self) -> u32;

    fn device_name(&self) -> &str;

    /// Stops capture and frees the device. Consumes the stream so it can only
    /// happen once.
    fn release(self: Box<Self>);
}

/// Source of input streams.
pub trait Microphone {
    /// Opens an input stream that pushes captured chunks into `sink`.
    ///
    /// # Errors
    /// - `PermissionDenied` if access to the microphone is refused
    /// - `DeviceUnavailable` if no matching input device can be opened
    fn request_stream(
        &mut self,
        constraints: &StreamConstraints,
        sink: ChunkSink,
    ) -> Result<Box<dyn InputStream>, RecorderError>;
}

/// Write end handed to the input stream.
///
/// Each chunk is appended to the session buffer and offered to the live
/// visualization feed. The feed is bounded and lossy; the buffer is not.
#[derive(Debug, Clone)]
pub struct ChunkSink {
    chunks: Arc<Mutex<Vec<Vec<i16>>>>,
    live: mpsc::Sender<Vec<i16>>,
}

impl ChunkSink {
    pub fn push(&self, chunk: Vec<i16>) {
        if chunk.is_empty() {
            return;
        }
        let _ = self.live.try_send(chunk.clone());
        match self.chunks.lock() {
            Ok(mut chunks) => chunks.push(chunk),
            Err(poisoned) => poisoned.into_inner().push(chunk),
        }
    }
}

/// One active recording.
pub struct CaptureSession {
    stream: Option<Box<dyn InputStream>>,
    chunks: Arc<Mutex<Vec<Vec<i16>>>>,
    live_feed: mpsc::Receiver<Vec<i16>>,
    sample_rate: u32,
    started_at: Instant,
}

impl CaptureSession {
    /// Acquires an input stream and starts buffering.
    ///
    /// # Errors
    /// Propagates the microphone's acquisition error; nothing is held on failure.
    pub fn open(
        microphone: &mut dyn Microphone,
        constraints: &StreamConstraints,
    ) -> Result<Self, RecorderError> {
        let chunks = Arc::new(Mutex::new(Vec::new()));
        let (live_tx, live_rx) = mpsc::channel(LIVE_FEED_CAPACITY);
        let sink = ChunkSink {
            chunks: Arc::clone(&chunks),
            live: live_tx,
        };

        let stream = microphone.request_stream(constraints, sink)?;
        let sample_rate = stream.sample_rate();
        tracing::info!(
            "Capture session opened on '{}' at {}Hz",
            stream.device_name(),
            sample_rate
        );

        Ok(Self {
            stream: Some(stream),
            chunks,
            live_feed: live_rx,
            sample_rate,
            started_at: Instant::now(),
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn chunk_count(&self) -> usize {
        self.lock_chunks().len()
    }

    /// Takes every chunk that arrived on the live feed since the last call.
    pub fn drain_live(&mut self) -> Vec<Vec<i16>> {
        let mut drained = Vec::new();
        while let Ok(chunk) = self.live_feed.try_recv() {
            drained.push(chunk);
        }
        drained
    }

    /// Releases the input stream and flushes the buffer into an artifact.
    pub fn finish(mut self) -> AudioArtifact {
        if let Some(stream) = self.stream.take() {
            stream.release();
        }

        let chunks = std::mem::take(&mut *self.lock_chunks());
        let chunk_count = chunks.len();
        let samples: Vec<i16> = chunks.into_iter().flatten().collect();
        let artifact = AudioArtifact::new(samples, self.sample_rate);

        tracing::info!(
            "Recording stopped: {:.2}s ({} samples in {} chunks at {}Hz)",
            artifact.duration_secs_f64(),
            artifact.samples().len(),
            chunk_count,
            self.sample_rate
        );
        artifact
    }

    fn lock_chunks(&self) -> std::sync::MutexGuard<'_, Vec<Vec<i16>>> {
        self.chunks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        if let Some(stream) = self.stream.take() {
            tracing::warn!("Capture session dropped while recording; releasing input stream");
            stream.release();
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted microphone shared by the session and controller tests.

    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Microphone that either fails or hands out streams the test can feed.
    pub struct FakeMicrophone {
        pub failure: Option<RecorderError>,
        pub sample_rate: u32,
        pub releases: Arc<AtomicUsize>,
        pub opened: usize,
        pub sink: Option<ChunkSink>,
    }

    impl FakeMicrophone {
        pub fn new(sample_rate: u32) -> Self {
            Self {
                failure: None,
                sample_rate,
                releases: Arc::new(AtomicUsize::new(0)),
                opened: 0,
                sink: None,
            }
        }

        pub fn failing(failure: RecorderError) -> Self {
            Self {
                failure: Some(failure),
                ..Self::new(16_000)
            }
        }

        pub fn release_count(&self) -> usize {
            self.releases.load(Ordering::SeqCst)
        }

        /// Pushes a chunk through the sink of the most recent stream.
        pub fn emit(&self, chunk: Vec<i16>) {
            if let Some(sink) = &self.sink {
                sink.push(chunk);
            }
        }
    }

    struct FakeStream {
        sample_rate: u32,
        releases: Arc<AtomicUsize>,
    }

    impl InputStream for FakeStream {
        fn sample_rate(&self) -> u32 {
            self.sample_rate
        }

        fn device_name(&self) -> &str {
            "fake"
        }

        fn release(self: Box<Self>) {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl Microphone for FakeMicrophone {
        fn request_stream(
            &mut self,
            _constraints: &StreamConstraints,
            sink: ChunkSink,
        ) -> Result<Box<dyn InputStream>, RecorderError> {
            if let Some(failure) = &self.failure {
                return Err(failure.clone());
            }
            self.opened += 1;
            self.sink = Some(sink);
            Ok(Box::new(FakeStream {
                sample_rate: self.sample_rate,
                releases: Arc::clone(&self.releases),
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FakeMicrophone;
    use super::*;

    fn constraints() -> StreamConstraints {
        StreamConstraints {
            device: "default".to_string(),
            sample_rate: 16_000,
        }
    }

    #[test]
    fn test_finish_concatenates_chunks_and_releases_once() {
        let mut mic = FakeMicrophone::new(8_000);
        let session = CaptureSession::open(&mut mic, &constraints()).unwrap();
        mic.emit(vec![1, 2]);
        mic.emit(vec![]);
        mic.emit(vec![3]);
        assert_eq!(session.chunk_count(), 2);

        let artifact = session.finish();
        assert_eq!(artifact.samples(), &[1, 2, 3]);
        assert_eq!(artifact.sample_rate(), 8_000);
        assert_eq!(mic.release_count(), 1);
    }

    #[test]
    fn test_drop_releases_unfinished_stream() {
        let mut mic = FakeMicrophone::new(16_000);
        let session = CaptureSession::open(&mut mic, &constraints()).unwrap();
        drop(session);
        assert_eq!(mic.release_count(), 1);
    }

    #[test]
    fn test_failed_open_holds_nothing() {
        let mut mic = FakeMicrophone::failing(RecorderError::PermissionDenied);
        let result = CaptureSession::open(&mut mic, &constraints());
        assert!(matches!(result, Err(RecorderError::PermissionDenied)));
        assert_eq!(mic.release_count(), 0);
    }

    #[test]
    fn test_live_feed_is_bounded_but_buffer_is_not() {
        let mut mic = FakeMicrophone::new(16_000);
        let mut session = CaptureSession::open(&mut mic, &constraints()).unwrap();
        for i in 0..(LIVE_FEED_CAPACITY + 10) {
            mic.emit(vec![i as i16]);
        }

        assert_eq!(session.drain_live().len(), LIVE_FEED_CAPACITY);
        assert!(session.drain_live().is_empty());
        assert_eq!(session.finish().samples().len(), LIVE_FEED_CAPACITY + 10);
    }
}

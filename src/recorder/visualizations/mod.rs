//! Waveform visualization surface.
//!
//! The controller pushes live chunks and finished artifacts into a
//! `Visualizer`; the terminal UI reads bars back out of `WaveformSurface`.

pub mod spectrum;
pub mod surface;
pub mod waveform;

pub use spectrum::SpectrumAnalyzer;
pub use surface::{SurfaceMode, WaveformSurface};

use super::artifact::AudioArtifact;
use super::error::RecorderError;

/// Consumer of live audio and finished recordings.
///
/// Every method may fail with `VisualizationFailure`; callers treat that as
/// non-fatal.
pub trait Visualizer {
    /// Prepares for a live feed at the given sample rate.
    fn begin_live(&mut self, sample_rate: u32) -> Result<(), RecorderError>;

    /// Consumes audio captured since the previous call.
    fn feed_live(&mut self, samples: &[i16]) -> Result<(), RecorderError>;

    /// Shows a finished recording.
    fn load(&mut self, artifact: &AudioArtifact) -> Result<(), RecorderError>;

    /// Moves the playback marker of the loaded recording.
    fn set_progress(&mut self, fraction: f64);

    /// Drops whatever is shown.
    fn clear(&mut self);
}

//! Voice message recording and review.
//!
//! `RecorderController` drives a microphone capture into an `AudioArtifact`,
//! plays it back with a countdown clock and scrubbing, and hands it to a
//! `Transport` on send. Device access sits behind the `Microphone`,
//! `PlaybackSurface` and `Visualizer` traits; the cpal and terminal
//! implementations live in `capture`, `playback` and `visualizations`.

pub mod artifact;
pub mod capture;
pub mod controller;
pub mod cursor;
pub mod error;
pub mod playback;
pub mod session;
pub mod timer;
pub mod transport;
pub mod ui;
pub mod visualizations;

pub use capture::{suppress_alsa_warnings, CpalMicrophone};
pub use controller::{RecorderController, RecorderState};
pub use error::RecorderError;
pub use playback::CpalPlayer;
pub use session::StreamConstraints;
pub use transport::{LogTransport, OutboxTransport, Transport};
pub use ui::{RecorderCommand, RecorderTui};
pub use visualizations::{Visualizer, WaveformSurface};

/// Playback position and remaining time for the loaded artifact.
///
/// `remaining_secs` seeds the playback timer. After a seek it is marked as
/// seek-derived so that resuming playback keeps the scrubbed position instead
/// of falling back to the full length.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlaybackCursor {
    /// Position as a fraction of the artifact length (0.0 to 1.0)
    pub position: f64,
    /// Artifact length in whole seconds
    pub duration_secs: u64,
    /// Seconds left from `position` to the end
    pub remaining_secs: u64,
    /// Whether `remaining_secs` comes from a seek rather than the full length
    pub seek_derived: bool,
}

impl PlaybackCursor {
    /// Cursor at the start of an artifact of the given length.
    pub fn at_start(duration_secs: u64) -> Self {
        Self {
            position: 0.0,
            duration_secs,
            remaining_secs: duration_secs,
            seek_derived: false,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Moves to `fraction` of the artifact and derives the remaining time from it.
    ///
    /// Out of range and non-finite fractions are clamped into `[0, 1]`.
    pub fn seek(&mut self, fraction: f64) {
        let fraction = if fraction.is_finite() {
            fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let seek_secs = (fraction * self.duration_secs as f64).floor() as u64;
        self.position = fraction;
        self.remaining_secs = self.duration_secs.saturating_sub(seek_secs);
        self.seek_derived = true;
    }

    /// Back to the start with the full length remaining.
    pub fn rewind(&mut self) {
        *self = Self::at_start(self.duration_secs);
    }
}

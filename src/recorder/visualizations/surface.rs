use super::spectrum::SpectrumAnalyzer;
use super::waveform::{bin_peaks, fit_to_width, push_bar, volume_percent};
use super::Visualizer;
use crate::config::VisualizationType;
use crate::recorder::artifact::AudioArtifact;
use crate::recorder::error::RecorderError;

/// What the surface is currently showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceMode {
    Empty,
    Live,
    Static,
}

/// Bar model behind the recorder's waveform area.
pub struct WaveformSurface {
    kind: VisualizationType,
    reference_level_db: i8,
    width: usize,
    mode: SurfaceMode,
    history: Vec<u64>,
    spectrum: SpectrumAnalyzer,
    peaks: Vec<u64>,
    loaded: Option<AudioArtifact>,
    progress: f64,
}

impl WaveformSurface {
    pub fn new(kind: VisualizationType, width: usize, reference_level_db: i8) -> Self {
        Self {
            kind,
            reference_level_db,
            width,
            mode: SurfaceMode::Empty,
            history: vec![0u64; width],
            spectrum: SpectrumAnalyzer::new(width, 16_000, reference_level_db),
            peaks: Vec::new(),
            loaded: None,
            progress: 0.0,
        }
    }

    pub fn mode(&self) -> SurfaceMode {
        self.mode
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Playback progress of the loaded recording (0.0 to 1.0).
    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// Bars to draw for the current mode.
    pub fn bars(&self) -> &[u64] {
        match (self.mode, self.kind) {
            (SurfaceMode::Empty, _) => &[][..],
            (SurfaceMode::Live, VisualizationType::Waveform) => self.history.as_slice(),
            (SurfaceMode::Live, VisualizationType::Spectrum) => self.spectrum.bars(),
            (SurfaceMode::Static, _) => self.peaks.as_slice(),
        }
    }

    /// Adapts to a new terminal width.
    pub fn resize(&mut self, width: usize) {
        if width == self.width {
            return;
        }
        self.width = width;
        fit_to_width(&mut self.history, width);
        self.spectrum.resize(width);
        if let Some(artifact) = &self.loaded {
            self.peaks = bin_peaks(artifact.samples(), width, self.reference_level_db);
        }
    }

    fn ensure_width(&self) -> Result<(), RecorderError> {
        if self.width == 0 {
            return Err(RecorderError::VisualizationFailure(
                "waveform area has zero width".to_string(),
            ));
        }
        Ok(())
    }
}

impl Visualizer for WaveformSurface {
    fn begin_live(&mut self, sample_rate: u32) -> Result<(), RecorderError> {
        self.clear();
        self.ensure_width()?;
        self.history = vec![0u64; self.width];
        self.spectrum.reset(sample_rate);
        self.mode = SurfaceMode::Live;
        Ok(())
    }

    fn feed_live(&mut self, samples: &[i16]) -> Result<(), RecorderError> {
        if self.mode != SurfaceMode::Live {
            return Err(RecorderError::VisualizationFailure(
                "live feed received without an active live view".to_string(),
            ));
        }
        if samples.is_empty() {
            return Ok(());
        }
        match self.kind {
            VisualizationType::Waveform => {
                let volume = volume_percent(samples, self.reference_level_db);
                push_bar(&mut self.history, volume, self.width);
            }
            VisualizationType::Spectrum => self.spectrum.push(samples),
        }
        Ok(())
    }

    fn load(&mut self, artifact: &AudioArtifact) -> Result<(), RecorderError> {
        self.clear();
        self.ensure_width()?;
        if artifact.is_empty() {
            return Err(RecorderError::VisualizationFailure(
                "recording contains no audio".to_string(),
            ));
        }
        self.peaks = bin_peaks(artifact.samples(), self.width, self.reference_level_db);
        self.loaded = Some(artifact.clone());
        self.mode = SurfaceMode::Static;
        Ok(())
    }

    fn set_progress(&mut self, fraction: f64) {
        self.progress = if fraction.is_finite() {
            fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };
    }

    fn clear(&mut self) {
        self.mode = SurfaceMode::Empty;
        self.peaks.clear();
        self.loaded = None;
        self.progress = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_live_waveform_scrolls_one_bar_per_feed() {
        let mut surface = WaveformSurface::new(VisualizationType::Waveform, 4, -20);
        surface.begin_live(16_000).unwrap();
        surface.feed_live(&[i16::MAX; 32]).unwrap();
        assert_eq!(surface.bars(), &[0, 0, 0, 100]);
        surface.feed_live(&[]).unwrap();
        assert_eq!(surface.bars().len(), 4);
    }

    #[test]
    fn test_feed_without_live_view_fails() {
        let mut surface = WaveformSurface::new(VisualizationType::Waveform, 4, -20);
        assert!(matches!(
            surface.feed_live(&[1, 2, 3]),
            Err(RecorderError::VisualizationFailure(_))
        ));
    }

    #[test]
    fn test_load_and_resize_rebins() {
        let mut surface = WaveformSurface::new(VisualizationType::Spectrum, 8, -20);
        let artifact = AudioArtifact::new(vec![5_000; 800], 16_000);
        surface.load(&artifact).unwrap();
        assert_eq!(surface.mode(), SurfaceMode::Static);
        assert_eq!(surface.bars().len(), 8);

        surface.resize(3);
        assert_eq!(surface.bars().len(), 3);
    }

    #[test]
    fn test_empty_artifact_is_a_visualization_failure() {
        let mut surface = WaveformSurface::new(VisualizationType::Waveform, 8, -20);
        let result = surface.load(&AudioArtifact::new(vec![], 16_000));
        assert!(matches!(result, Err(RecorderError::VisualizationFailure(_))));
        assert_eq!(surface.mode(), SurfaceMode::Empty);
    }

    #[test]
    fn test_zero_width_fails() {
        let mut surface = WaveformSurface::new(VisualizationType::Waveform, 0, -20);
        assert!(surface.begin_live(16_000).is_err());
    }

    #[test]
    fn test_progress_is_clamped_and_cleared() {
        let mut surface = WaveformSurface::new(VisualizationType::Waveform, 8, -20);
        surface.set_progress(1.5);
        assert_eq!(surface.progress(), 1.0);
        surface.clear();
        assert_eq!(surface.progress(), 0.0);
        assert!(surface.bars().is_empty());
    }
}

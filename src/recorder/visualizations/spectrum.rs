//! Live frequency spectrum using FFT.
//!
//! Shows energy across the human voice range while recording.

use rustfft::{num_complex::Complex, FftPlanner};

/// FFT window in samples.
pub const FFT_SIZE: usize = 2048;

/// Voice fundamentals and lower harmonics.
const MIN_FREQ_HZ: f32 = 100.0;
const MAX_FREQ_HZ: f32 = 1500.0;

/// Rolling-window spectrum analyzer with smoothing between frames.
pub struct SpectrumAnalyzer {
    planner: FftPlanner<f32>,
    window: Vec<i16>,
    bars: Vec<u64>,
    sample_rate: u32,
    reference_level_db: i8,
}

impl SpectrumAnalyzer {
    pub fn new(width: usize, sample_rate: u32, reference_level_db: i8) -> Self {
        Self {
            planner: FftPlanner::new(),
            window: Vec::with_capacity(FFT_SIZE),
            bars: vec![0u64; width],
            sample_rate,
            reference_level_db,
        }
    }

    /// Forgets previous audio, e.g. when a new capture starts at another rate.
    pub fn reset(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate;
        self.window.clear();
        self.bars.iter_mut().for_each(|bar| *bar = 0);
    }

    /// Adds captured audio and recomputes the bars, averaging with the previous frame.
    pub fn push(&mut self, chunk: &[i16]) {
        self.window.extend_from_slice(chunk);
        if self.window.len() > FFT_SIZE {
            let excess = self.window.len() - FFT_SIZE;
            self.window.drain(..excess);
        }

        let fresh = self.compute(self.bars.len());
        for (bar, new_value) in self.bars.iter_mut().zip(fresh) {
            *bar = (*bar + new_value) / 2;
        }
    }

    /// Changes the number of bars, recomputing from the current window.
    pub fn resize(&mut self, width: usize) {
        self.bars = self.compute(width);
    }

    pub fn bars(&self) -> &[u64] {
        &self.bars
    }

    /// Magnitudes per display column, normalized to 0-100 like the volume meter.
    fn compute(&mut self, width: usize) -> Vec<u64> {
        let mut result = vec![0u64; width];
        if self.window.is_empty() || width == 0 || self.sample_rate == 0 {
            return result;
        }

        let count = self.window.len();
        let mut buffer: Vec<Complex<f32>> = self
            .window
            .iter()
            .enumerate()
            .map(|(i, &s)| {
                let hann =
                    0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / count as f32).cos());
                Complex::new(s as f32 * hann / 32768.0, 0.0)
            })
            .collect();
        buffer.resize(FFT_SIZE, Complex::new(0.0, 0.0));

        self.planner.plan_fft_forward(FFT_SIZE).process(&mut buffer);

        let resolution = self.sample_rate as f32 / FFT_SIZE as f32;
        let min_bin = (MIN_FREQ_HZ / resolution) as usize;
        let max_bin = (MAX_FREQ_HZ / resolution).min((FFT_SIZE / 2) as f32) as usize;
        if max_bin <= min_bin {
            return result;
        }
        let span = max_bin - min_bin;

        let noise_gate_db = self.reference_level_db as f32 - 35.0;
        let db_range = self.reference_level_db as f32 - noise_gate_db;

        for (column, bar) in result.iter_mut().enumerate() {
            let first = min_bin + column * span / width;
            let last = (min_bin + (column + 1) * span / width)
                .min(max_bin)
                .max(first + 1);
            if first >= max_bin {
                break;
            }

            let magnitudes = &buffer[first..last];
            let average = magnitudes.iter().map(|c| c.norm()).sum::<f32>() / magnitudes.len() as f32;

            // FFT energy sits about 20 dB above the RMS meter for the same input
            let db = if average > 1e-10 {
                20.0 * average.log10() - 20.0
            } else {
                -120.0
            };

            if db >= noise_gate_db {
                *bar = ((db - noise_gate_db) / db_range * 100.0).clamp(0.0, 100.0) as u64;
            }
        }

        result
    }
}

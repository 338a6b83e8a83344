//! Time-domain waveform bars.
//!
//! Live recording shows a rolling bar per frame; a finished artifact is binned
//! into one bar per terminal column.

/// Converts a block of samples to a 0-100 volume relative to the reference level.
///
/// RMS is mapped to dBFS and spread over a 40 dB window ending at
/// `reference_level_db`. Silence still returns a small floor so the bar
/// stays visible.
pub fn volume_percent(samples: &[i16], reference_level_db: i8) -> u8 {
    if samples.is_empty() {
        return 0;
    }

    let sum_of_squares: i64 = samples.iter().map(|&x| (x as i64).pow(2)).sum();
    let mean_square = sum_of_squares / samples.len() as i64;
    let rms = (mean_square as f32).sqrt();

    let db_fs = if rms > 0.0 {
        20.0 * (rms / 32767.0).log10()
    } else {
        -160.0
    };

    let min_db = reference_level_db as f32 - 40.0;
    ((db_fs - min_db) / 40.0 * 100.0).clamp(4.0, 100.0) as u8
}

/// Appends a bar and scrolls the oldest one out once `max_width` is reached.
pub fn push_bar(history: &mut Vec<u64>, volume: u8, max_width: usize) {
    history.push(volume as u64);
    if history.len() > max_width {
        let excess = history.len() - max_width;
        history.drain(..excess);
    }
}

/// Trims or left-pads the rolling history to exactly `width` bars.
pub fn fit_to_width(history: &mut Vec<u64>, width: usize) {
    if history.len() > width {
        let excess = history.len() - width;
        history.drain(..excess);
    } else if history.len() < width {
        let mut padded = vec![0u64; width - history.len()];
        padded.append(history);
        *history = padded;
    }
}

/// Splits the whole recording into `width` equal spans and measures each one.
pub fn bin_peaks(samples: &[i16], width: usize, reference_level_db: i8) -> Vec<u64> {
    if samples.is_empty() || width == 0 {
        return vec![0u64; width];
    }

    (0..width)
        .map(|column| {
            let start = column * samples.len() / width;
            let end = ((column + 1) * samples.len() / width).max(start + 1).min(samples.len());
            if start >= samples.len() {
                0
            } else {
                volume_percent(&samples[start..end], reference_level_db) as u64
            }
        })
        .collect()
}

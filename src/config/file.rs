//! Configuration file management for vmemo.
//!
//! Configuration lives in `~/.config/vmemo/vmemo.toml`. A file with default
//! values is written the first time the recorder starts.

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Live visualization shown while recording.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum VisualizationType {
    /// Scrolling volume bars, one per UI frame
    #[default]
    Waveform,
    /// Frequency spectrum of the most recent audio
    Spectrum,
}

impl std::fmt::Display for VisualizationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Waveform => write!(f, "waveform"),
            Self::Spectrum => write!(f, "spectrum"),
        }
    }
}

/// Capture settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AudioConfig {
    /// Input device. Options:
    /// - "default" for the system default device
    /// - numeric index (0, 1, 2, etc.) from `vmemo list-devices`
    /// - device name from `vmemo list-devices`
    #[serde(default = "default_device")]
    pub device: String,
    /// Preferred sample rate in Hz. The device rate wins if they differ.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Reference level in dBFS drawn as a full-height bar (typical: -20 to -6)
    #[serde(default = "default_reference_level_db")]
    pub reference_level_db: i8,
    #[serde(default)]
    pub visualization: VisualizationType,
}

/// Output device for reviewing recordings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlaybackConfig {
    /// "default", an output device index, or its name
    #[serde(default = "default_device")]
    pub device: String,
}

/// Where the send action delivers recordings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SendConfig {
    /// Directory that receives sent recordings. Without it sends are only logged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outbox: Option<PathBuf>,
    /// Output audio format string: "codec [ffmpeg_options]" (e.g. "libopus -b:a 24k").
    /// "pcm_s16le" writes WAV without ffmpeg.
    #[serde(default = "default_output_format")]
    pub output_format: String,
}

fn default_device() -> String {
    "default".to_string()
}

fn default_sample_rate() -> u32 {
    16000
}

fn default_reference_level_db() -> i8 {
    -20
}

fn default_output_format() -> String {
    "libopus -b:a 24k".to_string()
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            sample_rate: default_sample_rate(),
            reference_level_db: default_reference_level_db(),
            visualization: VisualizationType::default(),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
        }
    }
}

impl Default for SendConfig {
    fn default() -> Self {
        Self {
            outbox: None,
            output_format: default_output_format(),
        }
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VmemoConfig {
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub send: SendConfig,
}

impl VmemoConfig {
    /// Loads configuration from the user's config directory, writing defaults
    /// first if no file exists yet.
    ///
    /// # Errors
    /// - If the config directory cannot be determined or created
    /// - If the file cannot be read or written
    /// - If the TOML is malformed
    pub fn load_or_init() -> anyhow::Result<Self> {
        let path = get_config_path()?;
        Self::load_or_init_at(&path)
    }

    pub fn load_or_init_at(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            tracing::info!("Wrote default configuration to {}", path.display());
            return Ok(config);
        }
        Self::load_from(path)
    }

    /// Reads and parses a config file.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: VmemoConfig = toml::from_str(&content)
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Writes the config as pretty TOML, creating parent directories.
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(path, toml::to_string_pretty(self)?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.audio.sample_rate == 0 {
            return Err(anyhow!("[audio] sample_rate must be greater than 0"));
        }
        if self.send.output_format.split_whitespace().next().is_none() {
            return Err(anyhow!("[send] output_format must name a codec"));
        }
        Ok(())
    }
}

/// Returns `~/.config/vmemo`, creating it if needed.
///
/// # Errors
/// - If the home directory cannot be determined
/// - If the directory cannot be created
pub fn get_config_dir() -> anyhow::Result<PathBuf> {
    let config_dir = dirs::home_dir()
        .ok_or_else(|| anyhow!("Could not determine home directory"))?
        .join(".config")
        .join("vmemo");
    fs::create_dir_all(&config_dir)
        .map_err(|e| anyhow!("Failed to create config directory: {e}"))?;
    Ok(config_dir)
}

/// Retrieves the path to the config file.
pub fn get_config_path() -> anyhow::Result<PathBuf> {
    Ok(get_config_dir()?.join("vmemo.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("vmemo.toml");

        let config = VmemoConfig::load_or_init_at(&path).unwrap();
        assert_eq!(config, VmemoConfig::default());
        assert!(path.exists());
        assert_eq!(VmemoConfig::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vmemo.toml");
        fs::write(
            &path,
            "[audio]\ndevice = \"2\"\nvisualization = \"spectrum\"\n\n[send]\noutbox = \"/tmp/out\"\n",
        )
        .unwrap();

        let config = VmemoConfig::load_from(&path).unwrap();
        assert_eq!(config.audio.device, "2");
        assert_eq!(config.audio.visualization, VisualizationType::Spectrum);
        assert_eq!(config.audio.sample_rate, 16000);
        assert_eq!(config.playback.device, "default");
        assert_eq!(config.send.outbox, Some(PathBuf::from("/tmp/out")));
        assert_eq!(config.send.output_format, "libopus -b:a 24k");
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vmemo.toml");

        fs::write(&path, "[audio]\nsample_rate = 0\n").unwrap();
        assert!(VmemoConfig::load_from(&path).is_err());

        fs::write(&path, "[audio]\nvisualization = \"bars\"\n").unwrap();
        assert!(VmemoConfig::load_from(&path).is_err());

        fs::write(&path, "[send]\noutput_format = \"  \"\n").unwrap();
        assert!(VmemoConfig::load_from(&path).is_err());
    }

    #[test]
    fn test_visualization_display_matches_serde() {
        assert_eq!(VisualizationType::Waveform.to_string(), "waveform");
        assert_eq!(VisualizationType::Spectrum.to_string(), "spectrum");
    }
}

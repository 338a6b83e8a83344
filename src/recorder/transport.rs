//! Hand-off of finished recordings for the send action.
//!
//! `OutboxTransport` drops an encoded file into a local directory, converting
//! through ffmpeg unless the configured codec is plain PCM. `LogTransport`
//! only records that a send happened.

use super::artifact::AudioArtifact;
use super::error::RecorderError;
use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Receiver of sent recordings. Delivery guarantees belong to the implementation.
pub trait Transport {
    fn name(&self) -> &str;

    /// Delivers the artifact and returns a short receipt for the status line.
    fn deliver(&self, artifact: &AudioArtifact) -> Result<String, RecorderError>;
}

/// Logs the artifact reference and nothing else.
#[derive(Debug, Default)]
pub struct LogTransport;

impl Transport for LogTransport {
    fn name(&self) -> &str {
        "log"
    }

    fn deliver(&self, artifact: &AudioArtifact) -> Result<String, RecorderError> {
        tracing::info!(
            "Send requested for artifact #{} ({:.2}s, {}Hz, recorded {})",
            artifact.id(),
            artifact.duration_secs_f64(),
            artifact.sample_rate(),
            artifact.created_at().format("%Y-%m-%d %H:%M:%S")
        );
        Ok(format!("voice message #{} sent", artifact.id()))
    }
}

/// Writes each sent recording into a directory.
#[derive(Debug, Clone)]
pub struct OutboxTransport {
    dir: PathBuf,
    /// ffmpeg codec and options, e.g. "libopus -b:a 24k"
    output_format: String,
}

impl OutboxTransport {
    pub fn new(dir: PathBuf, output_format: String) -> Self {
        Self { dir, output_format }
    }

    fn codec(&self) -> &str {
        self.output_format.split_whitespace().next().unwrap_or("pcm_s16le")
    }

    /// Target path for an artifact, named after its timestamp and id.
    pub fn target_path(&self, artifact: &AudioArtifact) -> PathBuf {
        self.dir.join(format!(
            "voice-{}-{}.{}",
            artifact.created_at().format("%Y%m%d-%H%M%S"),
            artifact.id(),
            extension_for_codec(self.codec())
        ))
    }

    fn write(&self, artifact: &AudioArtifact) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create outbox {}", self.dir.display()))?;
        let target = self.target_path(artifact);

        if self.codec() == "pcm_s16le" {
            artifact.write_wav(&target)?;
            return Ok(target);
        }

        let temp_wav =
            std::env::temp_dir().join(format!("vmemo_{}_{}.wav", std::process::id(), artifact.id()));
        artifact.write_wav(&temp_wav)?;
        let converted = encode_with_ffmpeg(&temp_wav, &target, &self.output_format);
        if let Err(e) = std::fs::remove_file(&temp_wav) {
            tracing::debug!("Failed to remove temp file: {}", e);
        }
        converted?;
        Ok(target)
    }
}

impl Transport for OutboxTransport {
    fn name(&self) -> &str {
        "outbox"
    }

    fn deliver(&self, artifact: &AudioArtifact) -> Result<String, RecorderError> {
        let path = self
            .write(artifact)
            .map_err(|e| RecorderError::Transport(format!("{e:#}")))?;
        let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        tracing::info!(
            "Artifact #{} written to outbox: {} ({} bytes, format: {})",
            artifact.id(),
            path.display(),
            size,
            self.output_format
        );
        Ok(format!("saved {}", path.display()))
    }
}

/// File extension for an ffmpeg codec name.
pub fn extension_for_codec(codec: &str) -> &str {
    match codec {
        "libopus" | "libvorbis" => "ogg",
        "flac" => "flac",
        "aac" => "m4a",
        "libmp3lame" | "mp3" => "mp3",
        "pcm_s16le" => "wav",
        other => other,
    }
}

/// Converts a WAV file with ffmpeg: `format` is "codec [options]", output is forced mono.
fn encode_with_ffmpeg(input_wav: &Path, output: &Path, format: &str) -> Result<()> {
    let mut parts = format.split_whitespace();
    let codec = parts.next().ok_or_else(|| anyhow!("Invalid format string: empty"))?;

    let ffmpeg = find_ffmpeg()?;
    let result = Command::new(&ffmpeg)
        .args(["-loglevel", "error", "-i"])
        .arg(input_wav)
        .args(["-acodec", codec, "-ac", "1", "-y"])
        .args(parts)
        .arg(output)
        .output()
        .with_context(|| format!("Failed to run {}", ffmpeg.display()))?;

    if result.status.success() {
        tracing::debug!("Audio converted to {} format", codec);
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&result.stderr);
        tracing::error!("ffmpeg conversion failed: {}", stderr);
        Err(anyhow!("Audio encoding failed: {stderr}"))
    }
}

/// Locates ffmpeg in the usual install prefixes, then on PATH.
pub fn find_ffmpeg() -> Result<PathBuf> {
    let candidates: &[&str] = if cfg!(target_os = "macos") {
        &["/opt/homebrew/bin/ffmpeg", "/usr/local/bin/ffmpeg", "/usr/bin/ffmpeg"]
    } else if cfg!(target_os = "linux") {
        &["/usr/bin/ffmpeg", "/usr/local/bin/ffmpeg", "/snap/bin/ffmpeg"]
    } else if cfg!(target_os = "windows") {
        &[
            "C:\\ffmpeg\\bin\\ffmpeg.exe",
            "C:\\Program Files\\ffmpeg\\bin\\ffmpeg.exe",
        ]
    } else {
        &[]
    };

    if let Some(found) = candidates.iter().map(PathBuf::from).find(|p| p.exists()) {
        tracing::debug!("Found ffmpeg at: {}", found.display());
        return Ok(found);
    }

    let lookup = if cfg!(target_os = "windows") { "where" } else { "which" };
    let output = Command::new(lookup)
        .arg("ffmpeg")
        .output()
        .with_context(|| format!("Failed to search PATH for ffmpeg using {lookup}"))?;

    let path = PathBuf::from(String::from_utf8_lossy(&output.stdout).trim());
    if output.status.success() && !path.as_os_str().is_empty() {
        tracing::debug!("Found ffmpeg in PATH at: {}", path.display());
        return Ok(path);
    }

    Err(anyhow!(
        "ffmpeg not found. Install ffmpeg or set [send] output_format = \"pcm_s16le\" to send WAV files."
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_for_codec() {
        assert_eq!(extension_for_codec("libopus"), "ogg");
        assert_eq!(extension_for_codec("pcm_s16le"), "wav");
        assert_eq!(extension_for_codec("mp3"), "mp3");
        assert_eq!(extension_for_codec("wavpack"), "wavpack");
    }

    #[test]
    fn test_log_transport_receipt_names_artifact() {
        let artifact = AudioArtifact::new(vec![0; 160], 16_000);
        let receipt = LogTransport.deliver(&artifact).unwrap();
        assert!(receipt.contains(&format!("#{}", artifact.id())));
    }

    #[test]
    fn test_outbox_writes_wav_without_ffmpeg() {
        let dir = tempfile::tempdir().unwrap();
        let outbox = OutboxTransport::new(dir.path().join("outbox"), "pcm_s16le".to_string());
        let artifact = AudioArtifact::new(vec![1, 2, 3, 4], 8_000);

        let receipt = outbox.deliver(&artifact).unwrap();
        let path = outbox.target_path(&artifact);
        assert!(receipt.contains(&path.display().to_string()));
        assert!(path.extension().is_some_and(|ext| ext == "wav"));

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.len(), 4);
    }

    #[test]
    fn test_outbox_failure_is_a_transport_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();
        let outbox = OutboxTransport::new(blocker, "pcm_s16le".to_string());

        let result = outbox.deliver(&AudioArtifact::new(vec![0; 8], 8_000));
        assert!(matches!(result, Err(RecorderError::Transport(_))));
    }
}

//! Microphone capture on cpal.
//!
//! Opens the configured input device at its native rate, downmixes every
//! callback buffer to mono i16 and pushes it into the session's `ChunkSink`.

use super::error::{classify_backend_error, RecorderError};
use super::session::{ChunkSink, InputStream, Microphone, StreamConstraints};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample};

#[cfg(target_os = "linux")]
use std::fs::OpenOptions;
#[cfg(target_os = "linux")]
use std::os::unix::io::AsRawFd;

/// Microphone backed by the default cpal host.
#[derive(Debug, Default)]
pub struct CpalMicrophone;

impl CpalMicrophone {
    pub fn new() -> Self {
        Self
    }
}

/// A running cpal input stream. Dropping the inner stream stops capture.
struct CpalInputStream {
    stream: cpal::Stream,
    sample_rate: u32,
    device_name: String,
}

impl InputStream for CpalInputStream {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn device_name(&self) -> &str {
        &self.device_name
    }

    fn release(self: Box<Self>) {
        let CpalInputStream {
            stream,
            device_name,
            ..
        } = *self;
        if let Err(e) = stream.pause() {
            tracing::debug!("Pausing input stream before release failed: {}", e);
        }
        drop(stream);
        tracing::debug!("Input stream on '{}' released", device_name);
    }
}

impl Microphone for CpalMicrophone {
    fn request_stream(
        &mut self,
        constraints: &StreamConstraints,
        sink: ChunkSink,
    ) -> Result<Box<dyn InputStream>, RecorderError> {
        let device = suppress_alsa_warnings(|| {
            let host = cpal::default_host();
            if constraints.device == "default" {
                host.default_input_device().ok_or_else(|| {
                    RecorderError::DeviceUnavailable("no default input device".to_string())
                })
            } else {
                find_input_device(&host, &constraints.device)
            }
        })?;

        let device_name = device
            .name()
            .unwrap_or_else(|_| "Unknown device".to_string());
        tracing::info!("Recording device: {}", device_name);

        let supported = device.default_input_config().map_err(|e| match e {
            cpal::DefaultStreamConfigError::DeviceNotAvailable => {
                RecorderError::DeviceUnavailable(format!("'{device_name}' is not available"))
            }
            other => classify_backend_error(&other.to_string()),
        })?;

        let sample_rate = supported.sample_rate().0;
        let channels = supported.channels() as usize;
        if sample_rate != constraints.sample_rate {
            tracing::warn!(
                "Requested sample rate {}Hz but device uses {}Hz. Recording at device rate.",
                constraints.sample_rate,
                sample_rate
            );
        }
        tracing::debug!(
            "Device configuration: {}Hz, {} channels, {:?}",
            sample_rate,
            channels,
            supported.sample_format()
        );

        let config: cpal::StreamConfig = supported.clone().into();
        let stream = match supported.sample_format() {
            SampleFormat::I16 => build_capture_stream::<i16>(&device, &config, channels, sink),
            SampleFormat::U16 => build_capture_stream::<u16>(&device, &config, channels, sink),
            SampleFormat::F32 => build_capture_stream::<f32>(&device, &config, channels, sink),
            other => Err(RecorderError::DeviceUnavailable(format!(
                "unsupported input sample format {other:?}"
            ))),
        }?;

        stream
            .play()
            .map_err(|e| classify_backend_error(&e.to_string()))?;
        tracing::debug!("Audio stream started");

        Ok(Box::new(CpalInputStream {
            stream,
            sample_rate,
            device_name,
        }))
    }
}

fn build_capture_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    channels: usize,
    sink: ChunkSink,
) -> Result<cpal::Stream, RecorderError>
where
    T: SizedSample,
    i16: FromSample<T>,
{
    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                let converted: Vec<i16> = data.iter().map(|&s| i16::from_sample(s)).collect();
                sink.push(downmix_to_mono(&converted, channels));
            },
            |err| {
                tracing::error!("Audio stream error: {}", err);
            },
            None,
        )
        .map_err(|e| match e {
            cpal::BuildStreamError::DeviceNotAvailable => {
                RecorderError::DeviceUnavailable("input device disappeared".to_string())
            }
            other => classify_backend_error(&other.to_string()),
        })
}

/// Averages interleaved channels into a single mono channel.
pub fn downmix_to_mono(data: &[i16], channels: usize) -> Vec<i16> {
    match channels {
        0 | 1 => data.to_vec(),
        _ => data
            .chunks_exact(channels)
            .map(|frame| {
                let sum: i32 = frame.iter().map(|&s| s as i32).sum();
                (sum / channels as i32) as i16
            })
            .collect(),
    }
}

/// Finds an input device by numeric index or exact name.
fn find_input_device(host: &cpal::Host, device_spec: &str) -> Result<cpal::Device, RecorderError> {
    let devices: Vec<cpal::Device> = host
        .input_devices()
        .map_err(|e| classify_backend_error(&format!("Failed to enumerate devices: {e}")))?
        .collect();

    if let Ok(index) = device_spec.parse::<usize>() {
        let count = devices.len();
        return devices.into_iter().nth(index).ok_or_else(|| {
            RecorderError::DeviceUnavailable(format!(
                "device index {} is out of range (0-{})",
                index,
                count.saturating_sub(1)
            ))
        });
    }

    devices
        .into_iter()
        .find(|device| device.name().map(|name| name == device_spec).unwrap_or(false))
        .ok_or_else(|| {
            RecorderError::DeviceUnavailable(format!(
                "'{device_spec}' not found. Use 'vmemo list-devices' to see available devices."
            ))
        })
}

/// Runs `f` with stderr redirected to /dev/null so ALSA's probing noise does
/// not land on the terminal UI. Suppression failures fall back to running `f`
/// with stderr untouched.
#[cfg(target_os = "linux")]
pub fn suppress_alsa_warnings<F, T>(f: F) -> T
where
    F: FnOnce() -> T,
{
    let dev_null = match OpenOptions::new().write(true).open("/dev/null") {
        Ok(file) => file,
        Err(e) => {
            tracing::debug!("Failed to open /dev/null: {}", e);
            return f();
        }
    };

    let old_stderr = unsafe { libc::dup(libc::STDERR_FILENO) };
    if old_stderr == -1 {
        return f();
    }

    if unsafe { libc::dup2(dev_null.as_raw_fd(), libc::STDERR_FILENO) } == -1 {
        unsafe { libc::close(old_stderr) };
        return f();
    }

    let result = f();

    unsafe {
        libc::dup2(old_stderr, libc::STDERR_FILENO);
        libc::close(old_stderr);
    }

    result
}

#[cfg(not(target_os = "linux"))]
pub fn suppress_alsa_warnings<F, T>(f: F) -> T
where
    F: FnOnce() -> T,
{
    f()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downmix_mono_passthrough() {
        assert_eq!(downmix_to_mono(&[1, -2, 3], 1), vec![1, -2, 3]);
    }

    #[test]
    fn test_downmix_stereo_averages_pairs() {
        assert_eq!(downmix_to_mono(&[100, 300, -50, 50], 2), vec![200, 0]);
    }

    #[test]
    fn test_downmix_drops_partial_frame() {
        assert_eq!(downmix_to_mono(&[3, 3, 3, 9, 9, 9, 1], 3), vec![3, 9]);
    }

    #[test]
    fn test_suppressed_closure_result_is_returned() {
        assert_eq!(suppress_alsa_warnings(|| 42), 42);
    }
}

//! List available audio input and output devices.

use crate::recorder::suppress_alsa_warnings;
use anyhow::anyhow;
use cpal::traits::{DeviceTrait, HostTrait};

/// One listed device.
struct DeviceEntry {
    name: String,
    is_default: bool,
    /// "(48000Hz, 2 channels)" or why the config is missing
    config: String,
}

/// Prints the input devices usable as `[audio] device` and the output devices
/// usable as `[playback] device`.
///
/// # Errors
/// - If the audio host cannot enumerate devices
pub fn handle_list_devices() -> Result<(), anyhow::Error> {
    let (inputs, outputs) = suppress_alsa_warnings(|| -> anyhow::Result<_> {
        let host = cpal::default_host();
        let default_input = host.default_input_device().and_then(|d| d.name().ok());
        let default_output = host.default_output_device().and_then(|d| d.name().ok());

        let inputs = host
            .input_devices()
            .map_err(|e| anyhow!("Failed to enumerate input devices: {e}"))?
            .filter_map(|device| {
                let name = device.name().ok()?;
                let config = describe_config(device.default_input_config());
                Some(DeviceEntry {
                    is_default: default_input.as_deref() == Some(name.as_str()),
                    name,
                    config,
                })
            })
            .collect::<Vec<_>>();

        let outputs = host
            .output_devices()
            .map_err(|e| anyhow!("Failed to enumerate output devices: {e}"))?
            .filter_map(|device| {
                let name = device.name().ok()?;
                let config = describe_config(device.default_output_config());
                Some(DeviceEntry {
                    is_default: default_output.as_deref() == Some(name.as_str()),
                    name,
                    config,
                })
            })
            .collect::<Vec<_>>();

        Ok((inputs, outputs))
    })?;

    println!();
    print_section("Audio input devices ([audio] device)", &inputs);
    print_section("Audio output devices ([playback] device)", &outputs);
    Ok(())
}

fn describe_config(
    config: Result<cpal::SupportedStreamConfig, cpal::DefaultStreamConfigError>,
) -> String {
    match config {
        Ok(config) => format!("({}Hz, {} channels)", config.sample_rate().0, config.channels()),
        Err(_) => "(configuration unavailable)".to_string(),
    }
}

fn print_section(title: &str, devices: &[DeviceEntry]) {
    println!("{title}:");
    println!();
    if devices.is_empty() {
        println!("  none found");
        println!();
        return;
    }
    for (index, device) in devices.iter().enumerate() {
        println!("{}", format_entry(index, device));
    }
}

fn format_entry(index: usize, device: &DeviceEntry) -> String {
    let default_indicator = if device.is_default { " [DEFAULT]" } else { "" };
    format!(
        "  ID: {index}\n    Name: {}{default_indicator}\n    Config: {}\n",
        device.name, device.config
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_entry_marks_default() {
        let entry = DeviceEntry {
            name: "USB Mic".to_string(),
            is_default: true,
            config: "(48000Hz, 1 channels)".to_string(),
        };
        let text = format_entry(2, &entry);
        assert!(text.contains("ID: 2"));
        assert!(text.contains("Name: USB Mic [DEFAULT]"));
        assert!(text.contains("Config: (48000Hz, 1 channels)"));
    }
}

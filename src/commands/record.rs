//! Interactive voice message recorder.
//!
//! Starts capturing as soon as the recorder opens, then lets the user stop,
//! review, scrub, re-record, delete and send. SIGUSR1 toggles between
//! recording and stopped so window manager bindings can drive it.

use crate::config::{SendConfig, VmemoConfig};
use crate::recorder::timer::format_time;
use crate::recorder::ui::StatusMessage;
use crate::recorder::{
    CpalMicrophone, CpalPlayer, LogTransport, OutboxTransport, RecorderCommand,
    RecorderController, RecorderError, RecorderState, RecorderTui, StreamConstraints, Transport,
    Visualizer, WaveformSurface,
};
use crate::ui::ErrorScreen;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// What the loop should do after a command.
#[derive(Debug, PartialEq)]
enum Outcome {
    /// No command was given
    Idle,
    /// The command ran; `None` clears any stale message
    Continue(Option<StatusMessage>),
    Quit,
}

/// Runs the recorder until the user quits.
///
/// # Errors
/// - If the configuration cannot be loaded (shown on the error screen first)
/// - If the terminal cannot be initialized or rendered
pub async fn handle_record() -> Result<(), anyhow::Error> {
    tracing::info!("=== vmemo recorder started ===");

    let config = match VmemoConfig::load_or_init() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("Failed to load configuration: {err:#}");
            let error_message = format!(
                "Configuration Error:\n\n{err:#}\n\nPlease check your ~/.config/vmemo/vmemo.toml file and try again."
            );
            let mut error_screen = ErrorScreen::new()?;
            error_screen.show_error(&error_message)?;
            error_screen.cleanup()?;
            return Err(anyhow::anyhow!("Configuration error: {err}"));
        }
    };

    tracing::info!(
        "Configuration loaded: input={}, output={}, sample_rate={}Hz, reference_level={}dBFS, visualization={}",
        config.audio.device,
        config.playback.device,
        config.audio.sample_rate,
        config.audio.reference_level_db,
        config.audio.visualization
    );

    let mut tui = RecorderTui::new()?;
    let surface = WaveformSurface::new(
        config.audio.visualization,
        tui.width()?,
        config.audio.reference_level_db,
    );
    let mut controller = RecorderController::new(
        StreamConstraints {
            device: config.audio.device.clone(),
            sample_rate: config.audio.sample_rate,
        },
        Box::new(CpalMicrophone::new()),
        Box::new(CpalPlayer::new(config.playback.device.clone())),
        build_transport(&config.send),
        surface,
    );

    let toggle = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGUSR1, Arc::clone(&toggle))
        .map_err(|e| anyhow::anyhow!("Failed to register signal handler: {e}"))?;

    let result = run_loop(&mut tui, &mut controller, &toggle);

    controller.shutdown();
    tui.cleanup()?;

    match &result {
        Ok(()) => tracing::info!("=== vmemo recorder exited ==="),
        Err(e) => tracing::error!("Recorder loop failed: {e:#}"),
    }
    result
}

fn run_loop(
    tui: &mut RecorderTui,
    controller: &mut RecorderController,
    toggle: &AtomicBool,
) -> anyhow::Result<()> {
    let mut command = RecorderCommand::Record;

    loop {
        match apply_command(controller, command) {
            Outcome::Quit => return Ok(()),
            Outcome::Continue(Some(status)) if status.is_error => tui.set_error(status.text),
            Outcome::Continue(Some(status)) => tui.set_status(status.text),
            Outcome::Continue(None) => tui.clear_status(),
            Outcome::Idle => {}
        }

        controller.pump(Instant::now());
        tui.render(controller)?;

        command = if toggle.swap(false, Ordering::Relaxed) {
            tracing::info!("Received SIGUSR1: toggling recording");
            if controller.state() == RecorderState::Recording {
                RecorderCommand::Stop
            } else {
                RecorderCommand::Record
            }
        } else {
            tui.handle_input(controller.state())?
        };
    }
}

/// Runs one command against the controller and describes the result for the footer.
fn apply_command<V: Visualizer>(
    controller: &mut RecorderController<V>,
    command: RecorderCommand,
) -> Outcome {
    let result = match command {
        RecorderCommand::Continue => return Outcome::Idle,
        RecorderCommand::Quit => return Outcome::Quit,
        RecorderCommand::Record => controller
            .start_recording()
            .map(|()| "Recording".to_string()),
        RecorderCommand::Stop => controller.stop_recording().map(|artifact| {
            format!("Recorded {}", format_time(artifact.duration_secs()))
        }),
        RecorderCommand::PlayPause => controller.play().map(|()| String::new()),
        RecorderCommand::Clear => controller.clear().map(|()| "Recording deleted".to_string()),
        RecorderCommand::Send => controller.send(),
        RecorderCommand::SeekTo(fraction) => controller.seek(fraction).map(|()| String::new()),
        RecorderCommand::SeekBy(delta) => controller.seek_by(delta).map(|()| String::new()),
    };

    match result {
        Ok(text) if text.is_empty() => Outcome::Continue(None),
        Ok(text) => Outcome::Continue(Some(StatusMessage {
            text,
            is_error: false,
        })),
        Err(e) => Outcome::Continue(Some(describe_error(&e))),
    }
}

fn describe_error(error: &RecorderError) -> StatusMessage {
    if let RecorderError::InvalidTransition { .. } = error {
        return StatusMessage {
            text: error.to_string(),
            is_error: false,
        };
    }

    tracing::warn!("Recorder operation failed: {}", error);
    let text = match error {
        RecorderError::PermissionDenied | RecorderError::DeviceUnavailable(_) => {
            format!("{error}. Press r to retry")
        }
        _ if error.is_retryable() => format!("{error}. Try again"),
        _ => error.to_string(),
    };
    StatusMessage {
        text,
        is_error: true,
    }
}

/// Outbox delivery when a directory is configured, otherwise log only.
fn build_transport(send: &SendConfig) -> Box<dyn Transport> {
    match &send.outbox {
        Some(dir) => {
            tracing::info!("Sent recordings go to {}", dir.display());
            Box::new(OutboxTransport::new(dir.clone(), send.output_format.clone()))
        }
        None => {
            tracing::info!("No [send] outbox configured; sends are logged only");
            Box::new(LogTransport)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VisualizationType;
    use crate::recorder::session::testing::FakeMicrophone;

    fn controller(mic: FakeMicrophone) -> RecorderController {
        RecorderController::new(
            StreamConstraints {
                device: "default".to_string(),
                sample_rate: 16_000,
            },
            Box::new(mic),
            Box::new(CpalPlayer::new("default".to_string())),
            Box::new(LogTransport),
            WaveformSurface::new(VisualizationType::Waveform, 40, -20),
        )
    }

    fn status_text(outcome: Outcome) -> String {
        match outcome {
            Outcome::Continue(Some(status)) => status.text,
            other => panic!("expected a status, got {other:?}"),
        }
    }

    #[test]
    fn test_record_stop_send_clear_statuses() {
        let mut controller = controller(FakeMicrophone::new(16_000));

        assert_eq!(
            status_text(apply_command(&mut controller, RecorderCommand::Record)),
            "Recording"
        );
        assert_eq!(
            status_text(apply_command(&mut controller, RecorderCommand::Stop)),
            "Recorded 0:00"
        );
        assert!(status_text(apply_command(&mut controller, RecorderCommand::Send)).contains("sent"));
        assert_eq!(
            status_text(apply_command(&mut controller, RecorderCommand::Clear)),
            "Recording deleted"
        );
        assert_eq!(controller.state(), RecorderState::Idle);
    }

    #[test]
    fn test_permission_denied_offers_retry() {
        let mut controller = controller(FakeMicrophone::failing(RecorderError::PermissionDenied));
        match apply_command(&mut controller, RecorderCommand::Record) {
            Outcome::Continue(Some(status)) => {
                assert!(status.is_error);
                assert_eq!(status.text, "Microphone access was denied. Press r to retry");
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn test_invalid_transition_is_not_an_error_banner() {
        let mut controller = controller(FakeMicrophone::new(16_000));
        match apply_command(&mut controller, RecorderCommand::PlayPause) {
            Outcome::Continue(Some(status)) => {
                assert!(!status.is_error);
                assert_eq!(status.text, "Cannot play while idle");
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(
            apply_command(&mut controller, RecorderCommand::Quit),
            Outcome::Quit
        );
    }

    #[test]
    fn test_transport_follows_outbox_setting() {
        let mut send = SendConfig::default();
        assert_eq!(build_transport(&send).name(), "log");
        send.outbox = Some(std::path::PathBuf::from("/tmp/vmemo-outbox"));
        assert_eq!(build_transport(&send).name(), "outbox");
    }
}

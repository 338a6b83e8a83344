//! Error taxonomy for the recorder core.
//!
//! Capture errors end the current attempt and surface to the user. Visualization
//! errors are swallowed by the controller. Invalid transitions are returned as
//! values and leave the state machine untouched.

use super::controller::RecorderState;
use thiserror::Error;

/// Errors produced by the recorder state machine and its collaborators.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecorderError {
    #[error("Microphone access was denied")]
    PermissionDenied,

    #[error("No audio input device available: {0}")]
    DeviceUnavailable(String),

    #[error("Waveform visualization failed: {0}")]
    VisualizationFailure(String),

    #[error("Cannot {operation} while {state}")]
    InvalidTransition {
        operation: &'static str,
        state: RecorderState,
    },

    #[error("Playback failed: {0}")]
    Playback(String),

    #[error("Send failed: {0}")]
    Transport(String),
}

impl RecorderError {
    /// Whether the user can retry the failed operation by invoking it again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RecorderError::PermissionDenied
                | RecorderError::DeviceUnavailable(_)
                | RecorderError::Playback(_)
                | RecorderError::Transport(_)
        )
    }
}

/// Maps an audio backend error message onto the capture error taxonomy.
///
/// Backends report refused access as free-form text (ALSA `EACCES`, CoreAudio
/// and WASAPI permission strings), so the message is matched loosely.
pub fn classify_backend_error(message: &str) -> RecorderError {
    let lowered = message.to_lowercase();
    if lowered.contains("permission")
        || lowered.contains("denied")
        || lowered.contains("not permitted")
        || lowered.contains("not authorized")
    {
        RecorderError::PermissionDenied
    } else {
        RecorderError::DeviceUnavailable(message.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_permission_messages() {
        assert_eq!(
            classify_backend_error("ALSA function 'snd_pcm_open' failed: Permission denied"),
            RecorderError::PermissionDenied
        );
        assert_eq!(
            classify_backend_error("Operation not permitted"),
            RecorderError::PermissionDenied
        );
    }

    #[test]
    fn test_classify_other_messages_as_unavailable() {
        assert_eq!(
            classify_backend_error("The requested device is no longer available"),
            RecorderError::DeviceUnavailable(
                "The requested device is no longer available".to_string()
            )
        );
    }

    #[test]
    fn test_invalid_transition_message() {
        let err = RecorderError::InvalidTransition {
            operation: "clear",
            state: RecorderState::Recording,
        };
        assert_eq!(err.to_string(), "Cannot clear while recording");
        assert!(!err.is_retryable());
        assert!(RecorderError::PermissionDenied.is_retryable());
    }
}

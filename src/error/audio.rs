// Audio error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Audio error code constants
///
/// These constants provide a single source of truth for error codes
/// reported by the activity detector and the metronome.
///
/// Error code range: 1001-1008
pub struct AudioErrorCodes {}

impl AudioErrorCodes {
    /// BPM value is outside the supported range (40-200)
    pub const BPM_INVALID: i32 = 1001;

    /// Component is already running
    pub const ALREADY_RUNNING: i32 = 1002;

    /// Component is not running
    pub const NOT_RUNNING: i32 = 1003;

    /// Hardware error occurred
    pub const HARDWARE_ERROR: i32 = 1004;

    /// Microphone permission denied or input device unavailable
    pub const PERMISSION_DENIED: i32 = 1005;

    /// Failed to open audio stream
    pub const STREAM_OPEN_FAILED: i32 = 1006;

    /// Mutex/RwLock was poisoned
    pub const LOCK_POISONED: i32 = 1007;

    /// Audio stream disconnected or channel closed unexpectedly
    pub const STREAM_FAILURE: i32 = 1008;
}

/// Log an audio error with structured context
///
/// This function logs audio errors with structured fields including:
/// - error_code: Numeric error code for programmatic handling
/// - component: The component where the error occurred
/// - message: Human-readable error message
/// - context: Additional contextual information
///
/// The logging is non-blocking and will not panic on failure.
pub fn log_audio_error(err: &AudioError, context: &str) {
    error!(
        "Audio error in {}: code={}, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Audio-related errors
///
/// These errors cover the activity detector and metronome lifecycles,
/// including stream management and hardware access.
///
/// Error code range: 1001-1008
#[derive(Debug, Clone, PartialEq)]
pub enum AudioError {
    /// BPM value is outside the supported range (40-200)
    BpmInvalid { bpm: u32 },

    /// Component is already running
    AlreadyRunning,

    /// Component is not running
    NotRunning,

    /// Hardware error occurred
    HardwareError { details: String },

    /// Microphone permission denied or input device unavailable
    PermissionDenied { reason: String },

    /// Failed to open audio stream
    StreamOpenFailed { reason: String },

    /// Mutex/RwLock was poisoned
    LockPoisoned { component: String },

    /// Stream channel disconnected unexpectedly
    StreamFailure { reason: String },
}

impl ErrorCode for AudioError {
    fn code(&self) -> i32 {
        match self {
            AudioError::BpmInvalid { .. } => AudioErrorCodes::BPM_INVALID,
            AudioError::AlreadyRunning => AudioErrorCodes::ALREADY_RUNNING,
            AudioError::NotRunning => AudioErrorCodes::NOT_RUNNING,
            AudioError::HardwareError { .. } => AudioErrorCodes::HARDWARE_ERROR,
            AudioError::PermissionDenied { .. } => AudioErrorCodes::PERMISSION_DENIED,
            AudioError::StreamOpenFailed { .. } => AudioErrorCodes::STREAM_OPEN_FAILED,
            AudioError::LockPoisoned { .. } => AudioErrorCodes::LOCK_POISONED,
            AudioError::StreamFailure { .. } => AudioErrorCodes::STREAM_FAILURE,
        }
    }

    fn message(&self) -> String {
        match self {
            AudioError::BpmInvalid { bpm } => {
                format!("BPM must be in range 40-200 (got {})", bpm)
            }
            AudioError::AlreadyRunning => "Component is already running".to_string(),
            AudioError::NotRunning => "Component is not running".to_string(),
            AudioError::HardwareError { details } => {
                format!("Hardware error: {}", details)
            }
            AudioError::PermissionDenied { reason } => {
                format!("Microphone access denied: {}", reason)
            }
            AudioError::StreamOpenFailed { reason } => {
                format!("Failed to open audio stream: {}", reason)
            }
            AudioError::LockPoisoned { component } => {
                format!("Lock poisoned on {}", component)
            }
            AudioError::StreamFailure { reason } => {
                format!("Audio stream failed: {}", reason)
            }
        }
    }
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AudioError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for AudioError {}

impl From<std::io::Error> for AudioError {
    fn from(err: std::io::Error) -> Self {
        AudioError::HardwareError {
            details: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_error_codes() {
        assert_eq!(
            AudioError::BpmInvalid { bpm: 0 }.code(),
            AudioErrorCodes::BPM_INVALID
        );
        assert_eq!(
            AudioError::AlreadyRunning.code(),
            AudioErrorCodes::ALREADY_RUNNING
        );
        assert_eq!(AudioError::NotRunning.code(), AudioErrorCodes::NOT_RUNNING);
        assert_eq!(
            AudioError::HardwareError {
                details: "test".to_string()
            }
            .code(),
            AudioErrorCodes::HARDWARE_ERROR
        );
        assert_eq!(
            AudioError::PermissionDenied {
                reason: "test".to_string()
            }
            .code(),
            AudioErrorCodes::PERMISSION_DENIED
        );
        assert_eq!(
            AudioError::StreamOpenFailed {
                reason: "test".to_string()
            }
            .code(),
            AudioErrorCodes::STREAM_OPEN_FAILED
        );
        assert_eq!(
            AudioError::LockPoisoned {
                component: "test".to_string()
            }
            .code(),
            AudioErrorCodes::LOCK_POISONED
        );
        assert_eq!(
            AudioError::StreamFailure {
                reason: "test".to_string()
            }
            .code(),
            AudioErrorCodes::STREAM_FAILURE
        );
    }

    #[test]
    fn test_audio_error_messages() {
        let err = AudioError::BpmInvalid { bpm: 250 };
        assert_eq!(err.message(), "BPM must be in range 40-200 (got 250)");

        let err = AudioError::AlreadyRunning;
        assert!(err.message().contains("already running"));

        let err = AudioError::NotRunning;
        assert!(err.message().contains("not running"));

        let err = AudioError::PermissionDenied {
            reason: "no default input device".to_string(),
        };
        assert!(err.message().contains("Microphone access denied"));
    }

    #[test]
    fn test_audio_error_display() {
        let err = AudioError::BpmInvalid { bpm: 0 };
        let display = format!("{}", err);
        assert!(display.contains("AudioError"));
        assert!(display.contains(&err.code().to_string()));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "device gone");
        let err: AudioError = io_err.into();
        assert!(matches!(err, AudioError::HardwareError { .. }));
    }
}

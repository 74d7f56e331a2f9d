// Error types for the practice trainer core
//
// This module defines custom error types for audio and progression operations,
// providing structured error handling with stable numeric error codes.

mod audio;
mod progression;

pub use audio::{log_audio_error, AudioError, AudioErrorCodes};
pub use progression::{log_progression_error, ProgressionError, ProgressionErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// component boundaries.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}

// Progression error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Progression error code constants
///
/// Single source of truth for error codes reported by the progression
/// engine and the profile storage layer.
///
/// Error code range: 2001-2005
pub struct ProgressionErrorCodes {}

impl ProgressionErrorCodes {
    /// Reward catalog contains no items at all
    pub const EMPTY_CATALOG: i32 = 2001;

    /// Failed to read profile data from storage
    pub const STORAGE_READ: i32 = 2002;

    /// Failed to write profile data to storage
    pub const STORAGE_WRITE: i32 = 2003;

    /// Profile state RwLock was poisoned
    pub const STATE_POISONED: i32 = 2004;

    /// Stored profile record could not be parsed
    pub const RECORD_CORRUPT: i32 = 2005;
}

/// Log a progression error with structured context
///
/// Logs progression errors with the numeric error code and the operation
/// that failed. Non-blocking, never panics.
pub fn log_progression_error(err: &ProgressionError, context: &str) {
    error!(
        "Progression error in {}: code={}, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Progression and storage related errors
///
/// Error code range: 2001-2005
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressionError {
    /// Reward catalog contains no items at all (configuration error)
    EmptyCatalog,

    /// Failed to read profile data from storage
    StorageRead { reason: String },

    /// Failed to write profile data to storage
    StorageWrite { reason: String },

    /// Profile state RwLock was poisoned
    StatePoisoned,

    /// Stored profile record could not be parsed
    RecordCorrupt { reason: String },
}

impl ErrorCode for ProgressionError {
    fn code(&self) -> i32 {
        match self {
            ProgressionError::EmptyCatalog => ProgressionErrorCodes::EMPTY_CATALOG,
            ProgressionError::StorageRead { .. } => ProgressionErrorCodes::STORAGE_READ,
            ProgressionError::StorageWrite { .. } => ProgressionErrorCodes::STORAGE_WRITE,
            ProgressionError::StatePoisoned => ProgressionErrorCodes::STATE_POISONED,
            ProgressionError::RecordCorrupt { .. } => ProgressionErrorCodes::RECORD_CORRUPT,
        }
    }

    fn message(&self) -> String {
        match self {
            ProgressionError::EmptyCatalog => {
                "Reward catalog is empty; at least one item is required".to_string()
            }
            ProgressionError::StorageRead { reason } => {
                format!("Failed to read profile storage: {}", reason)
            }
            ProgressionError::StorageWrite { reason } => {
                format!("Failed to write profile storage: {}", reason)
            }
            ProgressionError::StatePoisoned => "Profile state lock poisoned".to_string(),
            ProgressionError::RecordCorrupt { reason } => {
                format!("Stored profile record is corrupt: {}", reason)
            }
        }
    }
}

impl fmt::Display for ProgressionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ProgressionError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for ProgressionError {}

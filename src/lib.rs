// Practice Trainer Core - Rust practice-companion engine
// Microphone activity tracking, lookahead metronome, loot progression

// Module declarations
pub mod config;
pub mod detector;
pub mod error;
pub mod managers;
pub mod metronome;
pub mod progression;
pub mod session;
pub mod storage;

// Re-exports for convenience
pub use config::AppConfig;
pub use detector::{ActivityDetector, ActivityState};
pub use metronome::{BeatTick, ClickStyle, Metronome, MetronomeState};
pub use progression::{CatalogItem, ProgressionEngine, ProfileData, Rarity, RewardItem};
pub use session::{SessionEvent, SessionHandle, SessionSummary};
pub use storage::{JsonFileRepository, MemoryRepository, ProfileRepository};

/// Initialize logging for binaries and examples
///
/// Installs the default tracing subscriber, which also captures `log`
/// records emitted throughout the library.
pub fn init_logging() {
    tracing_subscriber::fmt::init();
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_module_structure() {
        // Verify all modules are accessible
        // This ensures the crate compiles with proper module hierarchy
    }
}

// BroadcastChannelManager: Centralized tokio broadcast channel management
// Single Responsibility: Broadcast channel lifecycle and subscription

use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

use crate::detector::ActivityState;
use crate::metronome::BeatTick;
use crate::session::SessionEvent;

/// Manages all tokio broadcast channels
///
/// Centralizes channel registration, storage, and subscription handling
/// for the three state streams the core publishes:
/// - Activity: detector snapshots, one per analysis tick
/// - Beat: metronome beat announcements, one per scheduled click
/// - Session: orchestrator lifecycle events (start/progress/complete)
///
/// The activity and beat channels are owned by their components and
/// registered here; the session channel is created by this manager.
pub struct BroadcastChannelManager {
    activity: Arc<Mutex<Option<broadcast::Sender<ActivityState>>>>,
    beat: Arc<Mutex<Option<broadcast::Sender<BeatTick>>>>,
    session: Arc<Mutex<Option<broadcast::Sender<SessionEvent>>>>,
}

impl BroadcastChannelManager {
    /// Create a new manager with all channels unregistered
    pub fn new() -> Self {
        Self {
            activity: Arc::new(Mutex::new(None)),
            beat: Arc::new(Mutex::new(None)),
            session: Arc::new(Mutex::new(None)),
        }
    }

    // ========================================================================
    // ACTIVITY CHANNEL
    // ========================================================================

    /// Register the detector's state channel
    pub fn register_activity(&self, tx: broadcast::Sender<ActivityState>) {
        *self.activity.lock().unwrap() = Some(tx);
    }

    /// Subscribe to detector state snapshots
    ///
    /// Returns None until a detector has been registered. Each subscriber
    /// gets an independent receiver; lagging subscribers drop old messages.
    pub fn subscribe_activity(&self) -> Option<broadcast::Receiver<ActivityState>> {
        self.activity
            .lock()
            .unwrap()
            .as_ref()
            .map(|tx| tx.subscribe())
    }

    // ========================================================================
    // BEAT CHANNEL
    // ========================================================================

    /// Register the metronome's beat channel
    pub fn register_beat(&self, tx: broadcast::Sender<BeatTick>) {
        *self.beat.lock().unwrap() = Some(tx);
    }

    /// Subscribe to beat announcements
    pub fn subscribe_beat(&self) -> Option<broadcast::Receiver<BeatTick>> {
        self.beat.lock().unwrap().as_ref().map(|tx| tx.subscribe())
    }

    // ========================================================================
    // SESSION CHANNEL
    // ========================================================================

    /// Initialize the session event channel
    ///
    /// Returns the sender for the orchestrator to publish lifecycle
    /// events. Buffer of 50 messages is ample for one event per second
    /// plus lifecycle edges.
    pub fn init_session(&self) -> broadcast::Sender<SessionEvent> {
        let (tx, _) = broadcast::channel(50);
        *self.session.lock().unwrap() = Some(tx.clone());
        tx
    }

    /// Subscribe to session lifecycle events
    pub fn subscribe_session(&self) -> Option<broadcast::Receiver<SessionEvent>> {
        self.session
            .lock()
            .unwrap()
            .as_ref()
            .map(|tx| tx.subscribe())
    }

    /// Get the session sender if initialized
    pub fn get_session_sender(&self) -> Option<broadcast::Sender<SessionEvent>> {
        self.session.lock().unwrap().clone()
    }
}

impl Default for BroadcastChannelManager {
    fn default() -> Self {
        Self::new()
    }
}

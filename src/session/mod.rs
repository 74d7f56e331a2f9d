//! Session orchestrator - wires detector, metronome, and progression
//!
//! Thin composition layer with no novel algorithms: a countdown that only
//! advances while the activity detector reports the user as playing, and a
//! completion path that updates the streak, draws the reward, and persists
//! the inventory. Screens, buttons, and rendering live outside the core
//! and consume the event streams exposed here.

pub mod countdown;

pub use countdown::{CountdownTimer, TickOutcome};

use chrono::{DateTime, NaiveDate, Utc};
use futures::Stream;
use log::info;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use crate::config::AppConfig;
use crate::detector::{ActivityDetector, ActivityState};
use crate::error::{AudioError, ProgressionError};
use crate::managers::BroadcastChannelManager;
use crate::metronome::{BeatTick, ClickStyle, Metronome};
use crate::progression::{
    get_streak_bonus, CatalogItem, ProgressionEngine, RewardItem,
};
use crate::storage::{JsonFileRepository, ProfileRepository};

/// What the user walks away with when a session completes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub reward: RewardItem,
    pub streak: u32,
    pub newly_earned_badges: Vec<String>,
    /// Description of the streak bonus in effect, if any
    pub bonus_description: Option<String>,
}

/// Orchestrator lifecycle events
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SessionEvent {
    Started {
        target_secs: u32,
    },
    Progress {
        elapsed_secs: u32,
        target_secs: u32,
        is_active: bool,
    },
    Completed(SessionSummary),
    Cancelled,
}

/// One practice session over one profile
///
/// Composes the three core engines. The caller drives time by invoking
/// [`Self::tick_second`] once per second (or [`Self::tick`] with an
/// explicit activity flag); on completion it calls
/// [`Self::complete_session`].
pub struct SessionHandle {
    detector: ActivityDetector,
    metronome: Metronome,
    progression: ProgressionEngine,
    broadcasts: BroadcastChannelManager,
    session_tx: broadcast::Sender<SessionEvent>,
    countdown: Option<CountdownTimer>,
}

impl SessionHandle {
    /// Open a session over the platform profile store
    pub fn new(config: AppConfig, profile_id: &str, style: ClickStyle) -> Self {
        let repository = Box::new(JsonFileRepository::from_config(&config.storage));
        Self::with_repository(config, profile_id, style, repository)
    }

    /// Open a session over an explicit repository (tests, ephemeral runs)
    pub fn with_repository(
        config: AppConfig,
        profile_id: &str,
        style: ClickStyle,
        repository: Box<dyn ProfileRepository>,
    ) -> Self {
        let detector = ActivityDetector::new(config.detector.clone());
        let metronome = Metronome::new(config.metronome.clone(), style);
        let progression = ProgressionEngine::open(repository, profile_id);

        let broadcasts = BroadcastChannelManager::new();
        broadcasts.register_activity(detector.sender());
        broadcasts.register_beat(metronome.sender());
        let session_tx = broadcasts.init_session();

        Self {
            detector,
            metronome,
            progression,
            broadcasts,
            session_tx,
            countdown: None,
        }
    }

    /// Start practicing: microphone on, optional metronome, countdown armed
    ///
    /// On a metronome failure the microphone is released again, so a failed
    /// start leaves no resources behind.
    pub fn start_session(
        &mut self,
        target_secs: u32,
        metronome_on: bool,
        bpm: u32,
    ) -> Result<(), AudioError> {
        self.detector.start()?;

        if metronome_on {
            if let Err(err) = self.metronome.start(bpm) {
                self.detector.stop();
                return Err(err);
            }
        }

        self.arm_countdown(target_secs);
        info!(
            "[Session] Started: target {}s, metronome {}",
            target_secs,
            if metronome_on { "on" } else { "off" }
        );
        Ok(())
    }

    /// Arm the countdown without acquiring audio
    ///
    /// For callers that drive [`Self::tick`] from their own activity
    /// source instead of the microphone-backed detector.
    pub fn arm_countdown(&mut self, target_secs: u32) {
        self.countdown = Some(CountdownTimer::new(target_secs));
        let _ = self.session_tx.send(SessionEvent::Started { target_secs });
    }

    /// Advance the countdown by one second of wall time
    ///
    /// Reads the detector's current activity state; returns None when no
    /// session is running.
    pub fn tick_second(&mut self) -> Option<TickOutcome> {
        let is_active = self
            .detector
            .snapshot()
            .map(|state| state.is_active)
            .unwrap_or(false);
        self.tick(is_active)
    }

    /// Advance the countdown with an explicit activity flag
    pub fn tick(&mut self, is_active: bool) -> Option<TickOutcome> {
        let countdown = self.countdown.as_mut()?;
        let outcome = countdown.tick(is_active);

        let _ = self.session_tx.send(SessionEvent::Progress {
            elapsed_secs: countdown.elapsed_secs(),
            target_secs: countdown.target_secs(),
            is_active,
        });

        Some(outcome)
    }

    /// Finish the session: stop audio, bump the streak, roll the loot
    pub fn complete_session(
        &mut self,
        catalog: &[CatalogItem],
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<SessionSummary, ProgressionError> {
        self.release_audio();
        self.countdown = None;

        let outcome = self.progression.update_streak(today);
        let bonus_description =
            get_streak_bonus(outcome.streak).map(|b| b.description.to_string());
        let reward = self
            .progression
            .grant_reward(catalog, &mut rand::thread_rng(), now)?;

        let summary = SessionSummary {
            reward,
            streak: outcome.streak,
            newly_earned_badges: outcome.newly_earned_badges,
            bonus_description,
        };
        info!(
            "[Session] Completed: streak {}, reward '{}'",
            summary.streak, summary.reward.id
        );
        let _ = self
            .session_tx
            .send(SessionEvent::Completed(summary.clone()));
        Ok(summary)
    }

    /// Abort the session without progression effects
    pub fn cancel_session(&mut self) {
        self.release_audio();
        self.countdown = None;
        info!("[Session] Cancelled");
        let _ = self.session_tx.send(SessionEvent::Cancelled);
    }

    fn release_audio(&mut self) {
        self.detector.stop();
        if self.metronome.is_running() {
            let _ = self.metronome.stop();
        }
    }

    pub fn is_running(&self) -> bool {
        self.countdown.is_some()
    }

    pub fn detector(&self) -> &ActivityDetector {
        &self.detector
    }

    pub fn metronome(&self) -> &Metronome {
        &self.metronome
    }

    pub fn metronome_mut(&mut self) -> &mut Metronome {
        &mut self.metronome
    }

    pub fn progression(&self) -> &ProgressionEngine {
        &self.progression
    }

    pub fn progression_mut(&mut self) -> &mut ProgressionEngine {
        &mut self.progression
    }

    pub fn broadcasts(&self) -> &BroadcastChannelManager {
        &self.broadcasts
    }

    // ========================================================================
    // STREAMS
    // ========================================================================

    /// Stream of detector snapshots, one per analysis tick
    pub fn activity_stream(&self) -> impl Stream<Item = ActivityState> {
        BroadcastStream::new(self.detector.subscribe()).filter_map(|item| item.ok())
    }

    /// Stream of beat announcements
    pub fn beat_stream(&self) -> impl Stream<Item = BeatTick> {
        BroadcastStream::new(self.metronome.subscribe()).filter_map(|item| item.ok())
    }

    /// Stream of session lifecycle events
    pub fn session_stream(&self) -> impl Stream<Item = SessionEvent> {
        BroadcastStream::new(self.session_tx.subscribe()).filter_map(|item| item.ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryRepository;

    fn handle() -> SessionHandle {
        SessionHandle::with_repository(
            AppConfig::default(),
            "blink",
            ClickStyle::Pulse,
            Box::new(MemoryRepository::new()),
        )
    }

    #[test]
    fn test_tick_without_session_is_none() {
        let mut session = handle();
        assert!(session.tick(true).is_none());
        assert!(!session.is_running());
    }

    #[test]
    fn test_session_events_reach_subscribers() {
        let mut session = handle();
        let mut rx = session.broadcasts().subscribe_session().unwrap();

        session.cancel_session();
        assert!(matches!(rx.try_recv().unwrap(), SessionEvent::Cancelled));
    }

    #[test]
    fn test_countdown_gating_through_handle() {
        let mut session = handle();
        session.arm_countdown(3);

        assert_eq!(session.tick(false), Some(TickOutcome::Paused));
        assert_eq!(
            session.tick(true),
            Some(TickOutcome::Advanced { elapsed_secs: 1 })
        );
        assert_eq!(
            session.tick(true),
            Some(TickOutcome::Advanced { elapsed_secs: 2 })
        );
        assert_eq!(session.tick(true), Some(TickOutcome::Completed));
    }
}

//! Lookahead scheduling core
//!
//! The scheduler computes click times against a monotonic audio clock and
//! batches every event falling inside the lookahead window, so a late poll
//! never produces a late click: events are handed to the audio subsystem
//! with their exact target time, not executed inline.
//!
//! The beat counter is owned by the scheduler and mutated only inside the
//! scheduling step.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Beats per bar; index 0 is the downbeat
pub const BEATS_PER_BAR: u8 = 4;

/// Gap between anchoring the schedule and the first click, in seconds
pub const START_EPSILON: f64 = 0.1;

/// Monotonic clock abstraction over the audio timeline, in seconds
pub trait AudioClock: Send + Sync {
    fn now(&self) -> f64;
}

/// Clock derived from an output stream's frame counter
///
/// `now()` is frames-rendered divided by sample rate, which is the audio
/// device's own monotonic timeline.
pub struct FrameClock {
    frames: Arc<AtomicU64>,
    sample_rate: u32,
}

impl FrameClock {
    pub fn new(frames: Arc<AtomicU64>, sample_rate: u32) -> Self {
        Self {
            frames,
            sample_rate,
        }
    }
}

impl AudioClock for FrameClock {
    fn now(&self) -> f64 {
        self.frames.load(Ordering::Relaxed) as f64 / self.sample_rate as f64
    }
}

/// Manually advanced clock for deterministic tests
#[derive(Default)]
pub struct ManualClock {
    micros: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, secs: f64) {
        self.micros
            .store((secs * 1_000_000.0) as u64, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: f64) {
        self.micros
            .fetch_add((secs * 1_000_000.0) as u64, Ordering::SeqCst);
    }
}

impl AudioClock for ManualClock {
    fn now(&self) -> f64 {
        self.micros.load(Ordering::SeqCst) as f64 / 1_000_000.0
    }
}

/// One scheduled click
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeatEvent {
    /// Target time on the audio clock, in seconds
    pub at_secs: f64,
    /// Beat index within the bar, 0 = downbeat
    pub beat: u8,
}

/// Pure lookahead scheduler
///
/// Owns `next_event_time` and the beat counter. Each call to
/// [`Self::schedule_due`] emits *all* events inside the window, advancing
/// the internal state per event.
#[derive(Debug)]
pub struct LookaheadScheduler {
    seconds_per_beat: f64,
    next_event_time: f64,
    beat: u8,
}

impl LookaheadScheduler {
    /// Anchor a new schedule
    ///
    /// The first click fires at `start_time + START_EPSILON`, beat 0.
    pub fn new(bpm: u32, start_time: f64) -> Self {
        Self {
            seconds_per_beat: 60.0 / bpm as f64,
            next_event_time: start_time + START_EPSILON,
            beat: 0,
        }
    }

    /// Change tempo; spacing updates from the next scheduled event onward
    pub fn set_bpm(&mut self, bpm: u32) {
        self.seconds_per_beat = 60.0 / bpm as f64;
    }

    pub fn seconds_per_beat(&self) -> f64 {
        self.seconds_per_beat
    }

    /// Beat index of the next event to be scheduled
    pub fn next_beat(&self) -> u8 {
        self.beat
    }

    /// Emit every event whose time falls before `now + horizon`
    ///
    /// Events are appended to `out`, which is not cleared. Returns the
    /// number of events emitted.
    pub fn schedule_due(&mut self, now: f64, horizon: f64, out: &mut Vec<BeatEvent>) -> usize {
        let mut emitted = 0;
        while self.next_event_time < now + horizon {
            out.push(BeatEvent {
                at_secs: self.next_event_time,
                beat: self.beat,
            });
            self.next_event_time += self.seconds_per_beat;
            self.beat = (self.beat + 1) % BEATS_PER_BAR;
            emitted += 1;
        }
        emitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOOKAHEAD: f64 = 0.1;

    fn drain(scheduler: &mut LookaheadScheduler, now: f64) -> Vec<BeatEvent> {
        let mut out = Vec::new();
        scheduler.schedule_due(now, LOOKAHEAD, &mut out);
        out
    }

    #[test]
    fn test_first_event_is_downbeat_after_epsilon() {
        let mut scheduler = LookaheadScheduler::new(120, 0.0);
        let events = drain(&mut scheduler, 0.05);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].beat, 0);
        assert!((events[0].at_secs - START_EPSILON).abs() < 1e-12);
    }

    #[test]
    fn test_beat_cycle_is_modulo_four() {
        let mut scheduler = LookaheadScheduler::new(120, 0.0);
        let mut events = Vec::new();
        // 120 BPM = 0.5 s/beat; cover 4 seconds = 8 beats
        scheduler.schedule_due(4.0, LOOKAHEAD, &mut events);
        assert_eq!(events.len(), 8);
        for (i, event) in events.iter().enumerate() {
            assert_eq!(event.beat as usize, i % 4);
        }
    }

    #[test]
    fn test_consecutive_spacing_is_exact() {
        let mut scheduler = LookaheadScheduler::new(90, 0.0);
        let mut events = Vec::new();
        scheduler.schedule_due(10.0, LOOKAHEAD, &mut events);
        let spb = 60.0 / 90.0;
        for pair in events.windows(2) {
            let gap = pair[1].at_secs - pair[0].at_secs;
            assert!(
                (gap - spb).abs() < 1e-9,
                "click spacing {} deviates from {}",
                gap,
                spb
            );
        }
    }

    #[test]
    fn test_late_poll_emits_batch_without_losing_events() {
        let mut scheduler = LookaheadScheduler::new(120, 0.0);
        // Polls stall for a full second: every missed event still comes out,
        // stamped with its original target time.
        let events = drain(&mut scheduler, 1.02);
        assert_eq!(events.len(), 3); // 0.1, 0.6, 1.1 all inside the window
        assert!((events[0].at_secs - 0.1).abs() < 1e-9);
        assert!((events[1].at_secs - 0.6).abs() < 1e-9);
        assert!((events[2].at_secs - 1.1).abs() < 1e-9);
    }

    #[test]
    fn test_bpm_change_applies_to_next_event() {
        let mut scheduler = LookaheadScheduler::new(60, 0.0);
        let events = drain(&mut scheduler, 0.05);
        assert_eq!(events.len(), 1);

        scheduler.set_bpm(120);
        let mut events = Vec::new();
        scheduler.schedule_due(3.0, LOOKAHEAD, &mut events);
        // Next event was already anchored at 0.1 + 1.0; spacing after it is 0.5
        assert!((events[0].at_secs - 1.1).abs() < 1e-9);
        assert!((events[1].at_secs - 1.6).abs() < 1e-9);
    }

    #[test]
    fn test_no_events_outside_window() {
        let mut scheduler = LookaheadScheduler::new(40, 0.0);
        let mut out = Vec::new();
        assert_eq!(scheduler.schedule_due(0.0, 0.05, &mut out), 0);
        assert!(out.is_empty());
    }

    #[test]
    fn test_drift_over_thousand_beats() {
        let mut scheduler = LookaheadScheduler::new(200, 0.0);
        let mut events = Vec::new();
        let spb = 60.0 / 200.0;
        // Poll in jittery 25-40ms steps until 1000 beats have been scheduled
        let mut now = 0.0;
        let mut step = 0;
        while events.len() < 1000 {
            scheduler.schedule_due(now, LOOKAHEAD, &mut events);
            now += if step % 3 == 0 { 0.040 } else { 0.025 };
            step += 1;
        }
        // Cumulative drift across 1000 beats stays under one sample at 48kHz
        let expected_last = START_EPSILON + 999.0 * spb;
        let drift = (events[999].at_secs - expected_last).abs();
        assert!(
            drift < 1.0 / 48000.0,
            "cumulative drift {} exceeds one sample period",
            drift
        );
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new();
        assert_eq!(clock.now(), 0.0);
        clock.advance(1.5);
        assert!((clock.now() - 1.5).abs() < 1e-6);
        clock.set(0.25);
        assert!((clock.now() - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_frame_clock_tracks_frames() {
        let frames = Arc::new(AtomicU64::new(0));
        let clock = FrameClock::new(Arc::clone(&frames), 48000);
        assert_eq!(clock.now(), 0.0);
        frames.store(24000, Ordering::Relaxed);
        assert!((clock.now() - 0.5).abs() < 1e-12);
    }
}

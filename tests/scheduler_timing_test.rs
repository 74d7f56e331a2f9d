//! Integration tests for metronome timing
//!
//! The lookahead scheduler is driven the way the poll thread drives it,
//! against a manually advanced audio clock, validating:
//! - Click counts over an interval match floor(T / (60/B)) ± 1
//! - Exact spacing and sub-sample cumulative drift
//! - Tempo changes applying on the next scheduled event
//! - Offline pattern rendering placing clicks at exact frame offsets

use practice_trainer::metronome::{
    render_pattern, samples_per_beat, AudioClock, BeatEvent, ClickStyle, LookaheadScheduler,
    ManualClock, BEATS_PER_BAR,
};

const LOOKAHEAD_SECS: f64 = 0.1;
const POLL_SECS: f64 = 0.025;
const START_EPSILON: f64 = 0.1;

/// Drive the scheduler with 25ms polls until the clock passes `duration`
fn run_for(bpm: u32, duration: f64) -> Vec<BeatEvent> {
    let clock = ManualClock::new();
    let mut scheduler = LookaheadScheduler::new(bpm, clock.now());
    let mut events = Vec::new();

    while clock.now() < duration {
        scheduler.schedule_due(clock.now(), LOOKAHEAD_SECS, &mut events);
        clock.advance(POLL_SECS);
    }

    // Keep only events that actually fire inside the interval
    events.retain(|e| e.at_secs <= duration);
    events
}

#[test]
fn test_click_count_over_interval() {
    for &(bpm, duration) in &[(60u32, 30.0f64), (100, 60.0), (120, 45.0), (200, 10.0)] {
        let events = run_for(bpm, duration);
        let expected = (duration / (60.0 / bpm as f64)).floor() as i64;
        let got = events.len() as i64;
        assert!(
            (got - expected).abs() <= 1,
            "{} BPM over {}s: got {} clicks, expected {} ± 1",
            bpm,
            duration,
            got,
            expected
        );
    }
}

#[test]
fn test_spacing_is_exact_across_interval() {
    let events = run_for(100, 120.0);
    let spb = 60.0 / 100.0;
    for pair in events.windows(2) {
        let gap = pair[1].at_secs - pair[0].at_secs;
        assert!(
            (gap - spb).abs() < 1e-9,
            "gap {} deviates from {}",
            gap,
            spb
        );
    }
}

#[test]
fn test_beat_index_cycles_with_audio_events() {
    let events = run_for(120, 20.0);
    for (i, event) in events.iter().enumerate() {
        assert_eq!(
            event.beat as usize,
            i % BEATS_PER_BAR as usize,
            "event {} out of cycle",
            i
        );
    }
}

#[test]
fn test_cumulative_drift_under_one_sample() {
    // 1000 beats at 150 BPM = 400 seconds of scheduling
    let bpm = 150;
    let clock = ManualClock::new();
    let mut scheduler = LookaheadScheduler::new(bpm, clock.now());
    let mut events = Vec::new();

    while events.len() < 1000 {
        scheduler.schedule_due(clock.now(), LOOKAHEAD_SECS, &mut events);
        clock.advance(POLL_SECS);
    }

    let spb = 60.0 / bpm as f64;
    let expected_last = START_EPSILON + 999.0 * spb;
    let drift = (events[999].at_secs - expected_last).abs();
    assert!(
        drift < 1.0 / 48000.0,
        "drift over 1000 beats is {}s, more than one 48kHz sample",
        drift
    );
}

#[test]
fn test_stalled_polls_do_not_delay_events() {
    let clock = ManualClock::new();
    let mut scheduler = LookaheadScheduler::new(120, clock.now());
    let mut events = Vec::new();

    // Regular polling for half a second
    while clock.now() < 0.5 {
        scheduler.schedule_due(clock.now(), LOOKAHEAD_SECS, &mut events);
        clock.advance(POLL_SECS);
    }
    // A 300ms scheduler stall
    clock.advance(0.3);
    while clock.now() < 2.0 {
        scheduler.schedule_due(clock.now(), LOOKAHEAD_SECS, &mut events);
        clock.advance(POLL_SECS);
    }

    // Spacing never wavers despite the stall
    let spb = 0.5;
    for pair in events.windows(2) {
        let gap = pair[1].at_secs - pair[0].at_secs;
        assert!((gap - spb).abs() < 1e-9);
    }
}

#[test]
fn test_bpm_change_takes_effect_on_next_event() {
    let clock = ManualClock::new();
    let mut scheduler = LookaheadScheduler::new(60, clock.now());
    let mut events = Vec::new();

    // Schedule the first two beats at 60 BPM
    while events.len() < 2 {
        scheduler.schedule_due(clock.now(), LOOKAHEAD_SECS, &mut events);
        clock.advance(POLL_SECS);
    }

    // Tempo change mid-run
    scheduler.set_bpm(120);
    while events.len() < 6 {
        scheduler.schedule_due(clock.now(), LOOKAHEAD_SECS, &mut events);
        clock.advance(POLL_SECS);
    }

    // Old spacing between the first pair, new spacing after the change
    let gap_before = events[1].at_secs - events[0].at_secs;
    assert!((gap_before - 1.0).abs() < 1e-9);
    let gap_after = events[4].at_secs - events[3].at_secs;
    assert!(
        (gap_after - 0.5).abs() < 1e-9,
        "new tempo must govern subsequent events, gap {}",
        gap_after
    );
}

#[test]
fn test_render_pattern_places_clicks_on_beat_frames() {
    let sample_rate = 48000;
    let bpm = 100;
    let bars = 4;
    let buffer = render_pattern(ClickStyle::Wood, bpm, bars, sample_rate);

    let spb = samples_per_beat(bpm, sample_rate);
    let first = (START_EPSILON * sample_rate as f64) as usize;
    let total_beats = bars * BEATS_PER_BAR as u32;

    for beat in 0..total_beats as u64 {
        let start = first + (beat * spb) as usize;
        // Click onset energy right at the beat frame
        let onset: f32 = buffer[start..start + 16].iter().map(|s| s.abs()).sum();
        assert!(onset > 0.0, "beat {} missing at frame {}", beat, start);

        // The final stretch before the beat is quieter than the onset
        let pre: f32 = buffer[start.saturating_sub(16)..start]
            .iter()
            .map(|s| s.abs())
            .sum();
        assert!(
            onset > pre,
            "beat {} onset not distinct from preceding samples",
            beat
        );
    }
}

#[test]
fn test_frame_clock_and_manual_clock_agree_on_seconds() {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    let frames = Arc::new(AtomicU64::new(0));
    let frame_clock = practice_trainer::metronome::FrameClock::new(Arc::clone(&frames), 44100);
    let manual = ManualClock::new();

    frames.store(44100 * 3, Ordering::Relaxed);
    manual.set(3.0);
    assert!((frame_clock.now() - manual.now()).abs() < 1e-9);
}

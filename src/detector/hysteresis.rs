// SilenceGate - threshold + silence-timeout hysteresis
//
// Pure state machine that turns a stream of (level, timestamp) samples into
// a binary playing/silent signal. The rising edge fires immediately on any
// level above the threshold; the falling edge fires only after the silence
// timeout has elapsed without a level above the threshold.

/// Hysteresis gate over normalized audio levels
#[derive(Debug)]
pub struct SilenceGate {
    threshold: f32,
    timeout_ms: u64,
    last_active_ms: Option<u64>,
    active: bool,
}

impl SilenceGate {
    pub fn new(threshold: f32, timeout_ms: u64) -> Self {
        Self {
            threshold,
            timeout_ms,
            last_active_ms: None,
            active: false,
        }
    }

    /// Reset internal state (e.g. when the detector restarts)
    pub fn reset(&mut self) {
        self.last_active_ms = None;
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Timestamp of the most recent above-threshold sample
    pub fn last_active_ms(&self) -> Option<u64> {
        self.last_active_ms
    }

    /// Process one level sample at `now_ms`
    ///
    /// Returns `Some(new_state)` when the active state transitions and
    /// `None` otherwise. A level strictly above the threshold stamps the
    /// activity time and activates immediately; a level at or below the
    /// threshold deactivates only once the timeout has fully elapsed.
    pub fn update(&mut self, level: f32, now_ms: u64) -> Option<bool> {
        if level > self.threshold {
            self.last_active_ms = Some(now_ms);
            if !self.active {
                self.active = true;
                return Some(true);
            }
            return None;
        }

        if self.active {
            let silence_elapsed = self
                .last_active_ms
                .map(|t| now_ms.saturating_sub(t))
                .unwrap_or(u64::MAX);
            if silence_elapsed >= self.timeout_ms {
                self.active = false;
                return Some(false);
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rising_edge_is_immediate() {
        let mut gate = SilenceGate::new(0.015, 5000);
        assert!(!gate.is_active());

        // First sample above threshold activates within one tick
        assert_eq!(gate.update(0.5, 0), Some(true));
        assert!(gate.is_active());

        // Staying loud produces no further transitions
        assert_eq!(gate.update(0.5, 16), None);
    }

    #[test]
    fn test_level_at_threshold_is_silence() {
        let mut gate = SilenceGate::new(0.015, 5000);
        assert_eq!(gate.update(0.015, 0), None);
        assert!(!gate.is_active());
    }

    #[test]
    fn test_falling_edge_waits_for_timeout() {
        let mut gate = SilenceGate::new(0.015, 5000);
        gate.update(0.5, 0);

        // Silence, but not long enough
        assert_eq!(gate.update(0.0, 1000), None);
        assert_eq!(gate.update(0.0, 4999), None);
        assert!(gate.is_active());

        // Exactly at the timeout the gate drops
        assert_eq!(gate.update(0.0, 5000), Some(false));
        assert!(!gate.is_active());
    }

    #[test]
    fn test_retrigger_resets_silence_window() {
        let mut gate = SilenceGate::new(0.015, 5000);
        gate.update(0.5, 0);
        gate.update(0.0, 3000);

        // A new loud sample restarts the countdown
        assert_eq!(gate.update(0.5, 4000), None);
        assert_eq!(gate.update(0.0, 8999), None);
        assert!(gate.is_active());
        assert_eq!(gate.update(0.0, 9000), Some(false));
    }

    #[test]
    fn test_no_falling_edge_when_never_active() {
        let mut gate = SilenceGate::new(0.015, 5000);
        for t in (0..20000).step_by(100) {
            assert_eq!(gate.update(0.001, t), None);
        }
        assert!(!gate.is_active());
    }

    #[test]
    fn test_reset_clears_state() {
        let mut gate = SilenceGate::new(0.015, 5000);
        gate.update(0.5, 0);
        assert!(gate.is_active());

        gate.reset();
        assert!(!gate.is_active());
        assert_eq!(gate.last_active_ms(), None);

        // Rising edge fires again after reset
        assert_eq!(gate.update(0.5, 10000), Some(true));
    }

    #[test]
    fn test_end_to_end_level_sequence() {
        // 3 seconds of sound, then silence: active at once, inactive after
        // exactly 5000 ms of that silence, not before.
        let mut gate = SilenceGate::new(0.015, 5000);
        let mut transitions = Vec::new();

        let mut now = 0;
        while now < 3000 {
            if let Some(state) = gate.update(0.5, now) {
                transitions.push((now, state));
            }
            now += 16;
        }
        while now < 9000 {
            if let Some(state) = gate.update(0.0, now) {
                transitions.push((now, state));
            }
            now += 16;
        }

        assert_eq!(transitions.len(), 2);
        assert_eq!(transitions[0], (0, true));
        let (drop_time, drop_state) = transitions[1];
        assert!(!drop_state);
        // Last loud sample lands just before 3000 ms; the drop must come
        // 5000 ms after it, within one analysis tick.
        let last_loud = 2992;
        assert!(drop_time >= last_loud + 5000);
        assert!(drop_time < last_loud + 5000 + 16);
    }
}

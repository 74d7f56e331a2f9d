//! Click synthesis - short oscillator tones for metronome beats
//!
//! Clicks are synthesized, not sampled: a square or triangle oscillator
//! under an exponential decay envelope, pre-rendered once per style so the
//! audio callback only copies samples. The downbeat renders at a higher
//! pitch than the other three beats.

use serde::{Deserialize, Serialize};

/// Peak envelope gain at click onset
const CLICK_GAIN: f32 = 0.1;

/// Envelope floor the decay ramps down to
const CLICK_GAIN_FLOOR: f32 = 0.001;

/// Click sound styles
///
/// `Pulse` is a sharp electronic tick (square, 1200/800 Hz, 50 ms decay);
/// `Wood` is a softer mechanical tock (triangle, 400/300 Hz, 100 ms decay).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClickStyle {
    Pulse,
    Wood,
}

impl Default for ClickStyle {
    fn default() -> Self {
        ClickStyle::Pulse
    }
}

#[derive(Debug, Clone, Copy)]
enum Waveform {
    Square,
    Triangle,
}

struct ToneSpec {
    freq_hz: f32,
    wave: Waveform,
    decay_secs: f32,
}

impl ClickStyle {
    fn tone(&self, downbeat: bool) -> ToneSpec {
        match self {
            ClickStyle::Pulse => ToneSpec {
                freq_hz: if downbeat { 1200.0 } else { 800.0 },
                wave: Waveform::Square,
                decay_secs: 0.05,
            },
            ClickStyle::Wood => ToneSpec {
                freq_hz: if downbeat { 400.0 } else { 300.0 },
                wave: Waveform::Triangle,
                decay_secs: 0.1,
            },
        }
    }
}

/// Render one click tone
///
/// Produces `decay_secs` worth of samples: an oscillator at the style's
/// pitch under an exponential ramp from [CLICK_GAIN] down to
/// [CLICK_GAIN_FLOOR]. Output samples stay well inside [-1.0, 1.0].
pub fn render_click(style: ClickStyle, downbeat: bool, sample_rate: u32) -> Vec<f32> {
    let spec = style.tone(downbeat);
    let num_samples = (sample_rate as f32 * spec.decay_secs) as usize;
    let decay_rate = (CLICK_GAIN_FLOOR / CLICK_GAIN).ln() / spec.decay_secs;

    let mut samples = Vec::with_capacity(num_samples);
    for i in 0..num_samples {
        let t = i as f32 / sample_rate as f32;
        let phase = (spec.freq_hz * t).fract();
        let osc = match spec.wave {
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Triangle => 4.0 * (phase - 0.5).abs() - 1.0,
        };
        let envelope = CLICK_GAIN * (decay_rate * t).exp();
        samples.push(osc * envelope);
    }

    samples
}

/// Converts BPM (beats per minute) to samples per beat
///
/// Formula: samples_per_beat = (sample_rate × 60) / BPM
///
/// # Examples
/// ```
/// use practice_trainer::metronome::click::samples_per_beat;
/// assert_eq!(samples_per_beat(120, 48000), 24000);
/// ```
#[inline]
pub fn samples_per_beat(bpm: u32, sample_rate: u32) -> u64 {
    (sample_rate as u64 * 60) / bpm as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_click_duration() {
        for &sr in &[44100, 48000, 96000] {
            let click = render_click(ClickStyle::Pulse, true, sr);
            let expected = (sr as f32 * 0.05) as usize;
            assert_eq!(click.len(), expected, "Pulse click is 50ms at {} Hz", sr);

            let click = render_click(ClickStyle::Wood, true, sr);
            let expected = (sr as f32 * 0.1) as usize;
            assert_eq!(click.len(), expected, "Wood click is 100ms at {} Hz", sr);
        }
    }

    #[test]
    fn test_render_click_range() {
        for style in [ClickStyle::Pulse, ClickStyle::Wood] {
            for downbeat in [true, false] {
                let click = render_click(style, downbeat, 48000);
                for (i, &sample) in click.iter().enumerate() {
                    assert!(
                        (-1.0..=1.0).contains(&sample),
                        "sample {} at index {} out of range for {:?}",
                        sample,
                        i,
                        style
                    );
                }
            }
        }
    }

    #[test]
    fn test_render_click_deterministic() {
        let a = render_click(ClickStyle::Pulse, true, 48000);
        let b = render_click(ClickStyle::Pulse, true, 48000);
        assert_eq!(a, b, "click rendering is deterministic");
    }

    #[test]
    fn test_envelope_decays() {
        let click = render_click(ClickStyle::Wood, false, 48000);
        let head: f32 = click[..100].iter().map(|s| s.abs()).sum();
        let tail: f32 = click[click.len() - 100..].iter().map(|s| s.abs()).sum();
        assert!(head > tail * 10.0, "envelope must decay substantially");
    }

    #[test]
    fn test_downbeat_differs_from_upbeat() {
        let down = render_click(ClickStyle::Pulse, true, 48000);
        let up = render_click(ClickStyle::Pulse, false, 48000);
        assert_ne!(down, up, "downbeat carries a distinct tone");
    }

    #[test]
    fn test_samples_per_beat_formula() {
        // At 120 BPM, 48kHz: (48000 * 60) / 120 = 24000
        assert_eq!(samples_per_beat(120, 48000), 24000);
        // At 60 BPM, 48kHz: (48000 * 60) / 60 = 48000
        assert_eq!(samples_per_beat(60, 48000), 48000);
        // At 200 BPM, 48kHz: (48000 * 60) / 200 = 14400
        assert_eq!(samples_per_beat(200, 48000), 14400);
        // At 100 BPM, 44.1kHz: (44100 * 60) / 100 = 26460
        assert_eq!(samples_per_beat(100, 44100), 26460);
    }
}

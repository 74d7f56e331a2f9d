//! Metronome - lookahead-scheduled clicks with a synchronized beat index
//!
//! Architecture:
//! - Poll thread (25 ms cadence): runs the [LookaheadScheduler] against the
//!   output stream's frame clock and pushes click commands, each stamped
//!   with its exact start frame, into a lock-free SPSC queue
//! - cpal output callback (real-time): advances the frame counter, drains
//!   due commands into a small fixed voice table, and mixes the
//!   pre-rendered click tones at their exact frame offsets
//!
//! Because commands carry absolute frame positions, a delayed poll inside
//! the lookahead window never shifts a click. Stopping voids the queue so
//! already-scheduled clicks become no-ops.

pub mod click;
pub mod scheduler;

pub use click::{render_click, samples_per_beat, ClickStyle};
pub use scheduler::{
    AudioClock, BeatEvent, FrameClock, LookaheadScheduler, ManualClock, BEATS_PER_BAR,
};

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use log::{info, warn};
use tokio::sync::broadcast;

use crate::config::MetronomeConfig;
use crate::error::{log_audio_error, AudioError};

/// Supported tempo range in BPM
pub const BPM_RANGE: std::ops::RangeInclusive<u32> = 40..=200;

/// Simultaneously sounding clicks the output callback can mix
const MAX_VOICES: usize = 8;

/// Click command queue capacity
const COMMAND_QUEUE_CAPACITY: usize = 64;

/// Observable metronome state
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MetronomeState {
    pub bpm: u32,
    /// Beat index of the most recently scheduled click, 0 = downbeat
    pub beat_index: u8,
    pub running: bool,
}

/// Beat announcement for visual consumers
///
/// Emitted at schedule time, so display may lead or lag true audio by at
/// most the lookahead window.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BeatTick {
    /// Beat index within the bar, 0 = downbeat
    pub beat: u8,
    /// Target time of the click on the audio clock, in seconds
    pub at_secs: f64,
    /// How far ahead of the audio clock this tick was announced
    pub latency_secs: f64,
}

/// Command handed to the output callback
#[derive(Debug, Clone, Copy)]
struct ClickCommand {
    start_frame: u64,
    beat: u8,
}

/// One sounding click inside the output callback
#[derive(Debug, Clone, Copy)]
struct Voice {
    start_frame: u64,
    downbeat: bool,
    position: usize,
}

/// Running playback resources, released on stop
struct MetronomeRuntime {
    // Held so the output stream stays alive; dropped on stop.
    _stream: cpal::Stream,
    poll_running: Arc<AtomicBool>,
    voided: Arc<AtomicBool>,
    poll_worker: Option<JoinHandle<()>>,
}

/// Lookahead-scheduled metronome
pub struct Metronome {
    config: MetronomeConfig,
    style: ClickStyle,
    bpm: Arc<AtomicU32>,
    beat_index: Arc<AtomicU32>,
    tick_tx: broadcast::Sender<BeatTick>,
    runtime: Option<MetronomeRuntime>,
}

impl Metronome {
    pub fn new(config: MetronomeConfig, style: ClickStyle) -> Self {
        let (tick_tx, _) = broadcast::channel(100);
        let default_bpm = config.default_bpm;
        Self {
            config,
            style,
            bpm: Arc::new(AtomicU32::new(default_bpm)),
            beat_index: Arc::new(AtomicU32::new(0)),
            tick_tx,
            runtime: None,
        }
    }

    /// Validate a tempo against the supported range
    pub fn validate_bpm(bpm: u32) -> Result<(), AudioError> {
        if BPM_RANGE.contains(&bpm) {
            Ok(())
        } else {
            Err(AudioError::BpmInvalid { bpm })
        }
    }

    /// Start clicking at the given tempo
    ///
    /// Resets the beat counter to 0 and anchors the schedule to the output
    /// stream's clock. Output-device unavailability is reported once; the
    /// metronome stays stopped and the caller must start again explicitly.
    pub fn start(&mut self, bpm: u32) -> Result<(), AudioError> {
        Self::validate_bpm(bpm)?;
        if self.runtime.is_some() {
            return Err(AudioError::AlreadyRunning);
        }

        self.bpm.store(bpm, Ordering::Relaxed);
        self.beat_index.store(0, Ordering::Relaxed);

        match self.open_output() {
            Ok(runtime) => {
                info!("[Metronome] Started at {} BPM ({:?})", bpm, self.style);
                self.runtime = Some(runtime);
                Ok(())
            }
            Err(err) => {
                log_audio_error(&err, "metronome_start");
                Err(err)
            }
        }
    }

    fn open_output(&self) -> Result<MetronomeRuntime, AudioError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| AudioError::StreamOpenFailed {
                reason: "no default output device found".to_string(),
            })?;

        let device_config =
            device
                .default_output_config()
                .map_err(|e| AudioError::StreamOpenFailed {
                    reason: format!("failed to query output config: {:?}", e),
                })?;

        let stream_config: cpal::StreamConfig = device_config.clone().into();
        let sample_rate = stream_config.sample_rate.0;
        let channels_count = stream_config.channels as usize;

        // Pre-render both click variants once; the callback only copies
        let downbeat_click = Arc::new(render_click(self.style, true, sample_rate));
        let upbeat_click = Arc::new(render_click(self.style, false, sample_rate));

        let (producer, consumer) = rtrb::RingBuffer::<ClickCommand>::new(COMMAND_QUEUE_CAPACITY);

        let frame_counter = Arc::new(AtomicU64::new(0));
        let voided = Arc::new(AtomicBool::new(false));

        let stream = self.build_output_stream(
            &device,
            &device_config,
            channels_count,
            Arc::clone(&frame_counter),
            Arc::clone(&voided),
            consumer,
            downbeat_click,
            upbeat_click,
        )?;

        stream.play().map_err(|e| AudioError::StreamFailure {
            reason: format!("{:?}", e),
        })?;

        let poll_running = Arc::new(AtomicBool::new(true));
        let poll_worker = self.spawn_poll_thread(
            Arc::clone(&poll_running),
            Arc::clone(&voided),
            frame_counter,
            sample_rate,
            producer,
        );

        Ok(MetronomeRuntime {
            _stream: stream,
            poll_running,
            voided,
            poll_worker: Some(poll_worker),
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn build_output_stream(
        &self,
        device: &cpal::Device,
        device_config: &cpal::SupportedStreamConfig,
        channels_count: usize,
        frame_counter: Arc<AtomicU64>,
        voided: Arc<AtomicBool>,
        mut consumer: rtrb::Consumer<ClickCommand>,
        downbeat_click: Arc<Vec<f32>>,
        upbeat_click: Arc<Vec<f32>>,
    ) -> Result<cpal::Stream, AudioError> {
        let stream_config: cpal::StreamConfig = device_config.clone().into();
        let err_fn = |err| warn!("[Metronome] Output stream error: {}", err);

        let mut voices: [Option<Voice>; MAX_VOICES] = [None; MAX_VOICES];

        let stream = match device_config.sample_format() {
            cpal::SampleFormat::F32 => device
                .build_output_stream(
                    &stream_config,
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        let base_frame = frame_counter.load(Ordering::Relaxed);
                        let frames = (data.len() / channels_count) as u64;

                        if voided.load(Ordering::Relaxed) {
                            // Stop voids everything already handed over
                            while consumer.pop().is_ok() {}
                            voices = [None; MAX_VOICES];
                            data.fill(0.0);
                            frame_counter.store(base_frame + frames, Ordering::Relaxed);
                            return;
                        }

                        // Claim commands that begin before this buffer ends
                        loop {
                            let due = match consumer.peek() {
                                Ok(command) if command.start_frame < base_frame + frames => {
                                    *command
                                }
                                _ => break,
                            };
                            let _ = consumer.pop();
                            if let Some(slot) = voices.iter_mut().find(|v| v.is_none()) {
                                *slot = Some(Voice {
                                    start_frame: due.start_frame,
                                    downbeat: due.beat == 0,
                                    position: 0,
                                });
                            }
                        }

                        for (i, frame) in data.chunks_mut(channels_count).enumerate() {
                            let absolute = base_frame + i as u64;
                            let mut sample = 0.0f32;

                            for slot in voices.iter_mut() {
                                if let Some(voice) = slot {
                                    if absolute < voice.start_frame {
                                        continue;
                                    }
                                    let click = if voice.downbeat {
                                        &downbeat_click
                                    } else {
                                        &upbeat_click
                                    };
                                    if let Some(&s) = click.get(voice.position) {
                                        sample += s;
                                        voice.position += 1;
                                    } else {
                                        *slot = None;
                                    }
                                }
                            }

                            for out in frame.iter_mut() {
                                *out = sample;
                            }
                        }

                        frame_counter.store(base_frame + frames, Ordering::Relaxed);
                    },
                    err_fn,
                    None,
                )
                .map_err(|e| AudioError::StreamOpenFailed {
                    reason: format!("{:?}", e),
                })?,
            other => {
                return Err(AudioError::StreamOpenFailed {
                    reason: format!("unsupported output sample format {:?}", other),
                })
            }
        };

        Ok(stream)
    }

    fn spawn_poll_thread(
        &self,
        poll_running: Arc<AtomicBool>,
        voided: Arc<AtomicBool>,
        frame_counter: Arc<AtomicU64>,
        sample_rate: u32,
        mut producer: rtrb::Producer<ClickCommand>,
    ) -> JoinHandle<()> {
        let clock = FrameClock::new(frame_counter, sample_rate);
        let bpm = Arc::clone(&self.bpm);
        let beat_index = Arc::clone(&self.beat_index);
        let tick_tx = self.tick_tx.clone();
        let poll_interval = Duration::from_millis(self.config.lookahead_poll_ms);
        let horizon = self.config.schedule_ahead_secs;

        std::thread::spawn(move || {
            let mut core = LookaheadScheduler::new(bpm.load(Ordering::Relaxed), clock.now());
            let mut current_bpm = bpm.load(Ordering::Relaxed);
            let mut events = Vec::with_capacity(8);

            while poll_running.load(Ordering::SeqCst) {
                // Tempo changes take effect on the next scheduled event
                let requested_bpm = bpm.load(Ordering::Relaxed);
                if requested_bpm != current_bpm {
                    core.set_bpm(requested_bpm);
                    current_bpm = requested_bpm;
                }

                let now = clock.now();
                events.clear();
                core.schedule_due(now, horizon, &mut events);
                if !events.is_empty() {
                    tracing::debug!(
                        count = events.len(),
                        clock_secs = now,
                        "scheduling click batch"
                    );
                }

                for event in &events {
                    if voided.load(Ordering::Relaxed) {
                        break;
                    }
                    let command = ClickCommand {
                        start_frame: (event.at_secs * sample_rate as f64) as u64,
                        beat: event.beat,
                    };
                    if producer.push(command).is_err() {
                        warn!("[Metronome] Click queue full, dropping beat {}", event.beat);
                        continue;
                    }
                    beat_index.store(event.beat as u32, Ordering::Relaxed);
                    let _ = tick_tx.send(BeatTick {
                        beat: event.beat,
                        at_secs: event.at_secs,
                        latency_secs: event.at_secs - now,
                    });
                }

                std::thread::sleep(poll_interval);
            }
        })
    }

    /// Stop clicking
    ///
    /// Cancels the poll synchronously and voids any click commands already
    /// handed to the output callback, so nothing fires after stop returns.
    pub fn stop(&mut self) -> Result<(), AudioError> {
        let Some(mut runtime) = self.runtime.take() else {
            return Err(AudioError::NotRunning);
        };

        runtime.voided.store(true, Ordering::SeqCst);
        runtime.poll_running.store(false, Ordering::SeqCst);
        if let Some(worker) = runtime.poll_worker.take() {
            let _ = worker.join();
        }
        // Output stream dropped here

        self.beat_index.store(0, Ordering::Relaxed);
        info!("[Metronome] Stopped");
        Ok(())
    }

    /// Change tempo; applies to the next scheduled event
    pub fn set_bpm(&self, bpm: u32) -> Result<(), AudioError> {
        Self::validate_bpm(bpm)?;
        self.bpm.store(bpm, Ordering::Relaxed);
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.runtime.is_some()
    }

    pub fn state(&self) -> MetronomeState {
        MetronomeState {
            bpm: self.bpm.load(Ordering::Relaxed),
            beat_index: self.beat_index.load(Ordering::Relaxed) as u8,
            running: self.runtime.is_some(),
        }
    }

    /// Subscribe to beat announcements
    pub fn subscribe(&self) -> broadcast::Receiver<BeatTick> {
        self.tick_tx.subscribe()
    }

    /// Sender side of the beat channel, for channel registries
    pub fn sender(&self) -> broadcast::Sender<BeatTick> {
        self.tick_tx.clone()
    }
}

impl Drop for Metronome {
    fn drop(&mut self) {
        if self.runtime.is_some() {
            let _ = self.stop();
        }
    }
}

/// Render a click pattern offline
///
/// Runs the same scheduler core and click tones against a virtual clock,
/// mixing every click of `bars` full bars into one mono buffer. Used by the
/// CLI's WAV export and by timing tests.
pub fn render_pattern(style: ClickStyle, bpm: u32, bars: u32, sample_rate: u32) -> Vec<f32> {
    let downbeat_click = render_click(style, true, sample_rate);
    let upbeat_click = render_click(style, false, sample_rate);

    let spb = 60.0 / bpm as f64;
    let total_beats = bars * BEATS_PER_BAR as u32;
    let duration_secs = scheduler::START_EPSILON + spb * total_beats as f64;
    let total_samples = (duration_secs * sample_rate as f64).ceil() as usize;

    let mut core = LookaheadScheduler::new(bpm, 0.0);
    let mut events = Vec::new();
    core.schedule_due(duration_secs, 0.0, &mut events);
    events.truncate(total_beats as usize);

    let mut buffer = vec![0.0f32; total_samples];
    for event in &events {
        let start = (event.at_secs * sample_rate as f64) as usize;
        let click = if event.beat == 0 {
            &downbeat_click
        } else {
            &upbeat_click
        };
        for (offset, &s) in click.iter().enumerate() {
            if let Some(slot) = buffer.get_mut(start + offset) {
                *slot += s;
            }
        }
    }

    buffer
}

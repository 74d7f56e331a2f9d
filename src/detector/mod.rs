//! Activity detector - turns the microphone signal into a binary
//! "is the user playing" signal with hysteresis
//!
//! Architecture:
//! - cpal input callback (real-time): de-interleaves the first channel and
//!   pushes samples into a lock-free SPSC ring buffer, nothing else
//! - Analysis thread: drains the ring at a fixed cadence, computes the
//!   magnitude spectrum and normalized level, runs the silence gate, and
//!   publishes immutable [ActivityState] snapshots
//!
//! The detector publishes state only; it never drives a countdown itself.

pub mod hysteresis;
pub mod spectrum;

pub use hysteresis::SilenceGate;
pub use spectrum::{SpectrumAnalyzer, SpectrumFrame};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use log::{info, warn};
use tokio::sync::broadcast;

use crate::config::DetectorConfig;
use crate::error::{log_audio_error, AudioError};

/// Snapshot of the detector's observable state
///
/// Published after every analysis tick. `frequency_bins` is always the
/// leading display window of the underlying spectrum.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ActivityState {
    /// Mean spectrum magnitude, normalized to [0, 1]
    pub audio_level: f32,
    /// First N spectrum bins for display (N = configured display_bins)
    pub frequency_bins: Vec<f32>,
    /// Whether the microphone stream is open
    pub is_listening: bool,
    /// Whether the user is currently playing (hysteresis applied)
    pub is_active: bool,
    /// Milliseconds since detector start of the last above-threshold sample
    pub last_active_ms: u64,
    /// Terminal acquisition error from the last start attempt, if any
    pub error: Option<String>,
}

impl ActivityState {
    fn idle(display_bins: usize) -> Self {
        Self {
            audio_level: 0.0,
            frequency_bins: vec![0.0; display_bins],
            is_listening: false,
            is_active: false,
            last_active_ms: 0,
            error: None,
        }
    }
}

/// The detector's DSP path, callable without a microphone
///
/// Owns the spectrum analyzer, the silence gate, and the rolling sample
/// window. The live detector feeds it from the capture ring; fixtures and
/// the CLI feed it directly from buffers.
pub struct AnalysisLoop {
    analyzer: SpectrumAnalyzer,
    gate: SilenceGate,
    window: Vec<f32>,
    window_capacity: usize,
    display_bins: usize,
}

impl AnalysisLoop {
    pub fn new(config: &DetectorConfig) -> Self {
        Self {
            analyzer: SpectrumAnalyzer::new(config.fft_size, config.display_bins),
            gate: SilenceGate::new(config.silence_threshold, config.silence_timeout_ms),
            window: Vec::with_capacity(config.fft_size * 2),
            window_capacity: config.fft_size * 2,
            display_bins: config.display_bins,
        }
    }

    /// Feed captured samples and produce the next state snapshot
    ///
    /// `now_ms` is milliseconds since detector start. An empty block is
    /// valid: the gate still advances, so silence timeouts fire even when
    /// the capture ring is drained.
    pub fn process_block(&mut self, samples: &[f32], now_ms: u64) -> ActivityState {
        self.window.extend_from_slice(samples);
        if self.window.len() > self.window_capacity {
            let excess = self.window.len() - self.window_capacity;
            self.window.drain(..excess);
        }

        let frame = self.analyzer.analyze(&self.window);
        self.gate.update(frame.level, now_ms);

        ActivityState {
            audio_level: frame.level,
            frequency_bins: frame.bins,
            is_listening: true,
            is_active: self.gate.is_active(),
            last_active_ms: self.gate.last_active_ms().unwrap_or(0),
            error: None,
        }
    }

    pub fn reset(&mut self) {
        self.window.clear();
        self.gate.reset();
    }

    pub fn display_bins(&self) -> usize {
        self.display_bins
    }
}

/// Running capture resources, released on stop
struct DetectorRuntime {
    // Held so the input stream stays alive; dropped on stop.
    _stream: cpal::Stream,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

/// Microphone-backed activity detector
///
/// `start()` acquires the default input stream and spawns the analysis
/// thread; acquisition failures are terminal for that attempt and recorded
/// in the published state. `stop()` releases everything and is idempotent.
pub struct ActivityDetector {
    config: DetectorConfig,
    state: Arc<RwLock<ActivityState>>,
    state_tx: broadcast::Sender<ActivityState>,
    runtime: Option<DetectorRuntime>,
}

impl ActivityDetector {
    pub fn new(config: DetectorConfig) -> Self {
        let (state_tx, _) = broadcast::channel(100);
        let state = Arc::new(RwLock::new(ActivityState::idle(config.display_bins)));
        Self {
            config,
            state,
            state_tx,
            runtime: None,
        }
    }

    /// Begin listening on the default input device
    ///
    /// # Errors
    /// - `AlreadyRunning` if the detector is listening
    /// - `PermissionDenied` if no input device is available or access is denied
    /// - `StreamOpenFailed` for any other stream setup failure
    ///
    /// Every error is also recorded in the published state; there is no
    /// automatic retry, the caller may invoke `start()` again.
    pub fn start(&mut self) -> Result<(), AudioError> {
        if self.runtime.is_some() {
            return Err(AudioError::AlreadyRunning);
        }

        match self.acquire() {
            Ok(runtime) => {
                self.runtime = Some(runtime);
                Ok(())
            }
            Err(err) => {
                log_audio_error(&err, "detector_start");
                self.publish_error(&err);
                Err(err)
            }
        }
    }

    fn acquire(&self) -> Result<DetectorRuntime, AudioError> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| AudioError::PermissionDenied {
                reason: "no default input device found".to_string(),
            })?;

        let device_config =
            device
                .default_input_config()
                .map_err(|e| AudioError::PermissionDenied {
                    reason: format!("failed to query input config: {:?}", e),
                })?;

        let stream_config: cpal::StreamConfig = device_config.clone().into();
        let sample_rate = stream_config.sample_rate.0;
        let channels_count = stream_config.channels as usize;

        // One second of capture headroom between callback and analysis thread
        let (mut producer, mut consumer) = rtrb::RingBuffer::<f32>::new(sample_rate as usize);

        let err_fn = |err| warn!("[Detector] Input stream error: {}", err);

        let stream = match device_config.sample_format() {
            cpal::SampleFormat::F32 => device
                .build_input_stream(
                    &stream_config,
                    move |data: &[f32], _: &cpal::InputCallbackInfo| {
                        // De-interleave: take first channel; drop on overrun
                        for frame in data.chunks(channels_count) {
                            if let Some(&sample) = frame.first() {
                                let _ = producer.push(sample);
                            }
                        }
                    },
                    err_fn,
                    None,
                )
                .map_err(|e| match e {
                    cpal::BuildStreamError::DeviceNotAvailable => AudioError::PermissionDenied {
                        reason: "input device not available".to_string(),
                    },
                    other => AudioError::StreamOpenFailed {
                        reason: format!("{:?}", other),
                    },
                })?,
            other => {
                return Err(AudioError::StreamOpenFailed {
                    reason: format!("unsupported input sample format {:?}", other),
                })
            }
        };

        stream.play().map_err(|e| AudioError::StreamFailure {
            reason: format!("{:?}", e),
        })?;

        let running = Arc::new(AtomicBool::new(true));
        let worker_running = Arc::clone(&running);
        let state = Arc::clone(&self.state);
        let state_tx = self.state_tx.clone();
        let mut analysis = AnalysisLoop::new(&self.config);
        let interval = Duration::from_millis(self.config.analysis_interval_ms);

        {
            let mut guard = state.write().map_err(|_| AudioError::LockPoisoned {
                component: "ActivityState".to_string(),
            })?;
            *guard = ActivityState::idle(self.config.display_bins);
            guard.is_listening = true;
        }

        let worker = std::thread::spawn(move || {
            let epoch = Instant::now();
            let mut block = Vec::with_capacity(4096);

            while worker_running.load(Ordering::SeqCst) {
                block.clear();
                while let Ok(sample) = consumer.pop() {
                    block.push(sample);
                }

                let now_ms = epoch.elapsed().as_millis() as u64;
                let snapshot = analysis.process_block(&block, now_ms);

                match state.write() {
                    Ok(mut guard) => *guard = snapshot.clone(),
                    Err(_) => break,
                }
                let _ = state_tx.send(snapshot);

                std::thread::sleep(interval);
            }
        });

        info!(
            "[Detector] Listening on default input ({} Hz, {} ch)",
            sample_rate, channels_count
        );

        Ok(DetectorRuntime {
            _stream: stream,
            running,
            worker: Some(worker),
        })
    }

    /// Stop listening and release all resources
    ///
    /// Idempotent and infallible: stopping an idle detector does nothing.
    pub fn stop(&mut self) {
        if let Some(mut runtime) = self.runtime.take() {
            runtime.running.store(false, Ordering::SeqCst);
            if let Some(worker) = runtime.worker.take() {
                let _ = worker.join();
            }
            // Input stream dropped here, releasing the device
            info!("[Detector] Stopped");
        }

        if let Ok(mut guard) = self.state.write() {
            let error = guard.error.take();
            *guard = ActivityState::idle(self.config.display_bins);
            guard.error = error;
        }
    }

    pub fn is_listening(&self) -> bool {
        self.runtime.is_some()
    }

    /// Latest published state
    pub fn snapshot(&self) -> Result<ActivityState, AudioError> {
        self.state
            .read()
            .map(|guard| guard.clone())
            .map_err(|_| AudioError::LockPoisoned {
                component: "ActivityState".to_string(),
            })
    }

    /// Subscribe to state snapshots (one per analysis tick)
    pub fn subscribe(&self) -> broadcast::Receiver<ActivityState> {
        self.state_tx.subscribe()
    }

    /// Sender side of the snapshot channel, for channel registries
    pub fn sender(&self) -> broadcast::Sender<ActivityState> {
        self.state_tx.clone()
    }

    fn publish_error(&self, err: &AudioError) {
        use crate::error::ErrorCode;

        if let Ok(mut guard) = self.state.write() {
            guard.is_listening = false;
            guard.is_active = false;
            guard.error = Some(err.message());
            let _ = self.state_tx.send(guard.clone());
        }
    }
}

impl Drop for ActivityDetector {
    fn drop(&mut self) {
        self.stop();
    }
}

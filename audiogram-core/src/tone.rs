//! # Tone Synthesis Module
//!
//! Fire-and-forget playback of stereo-panned sine tones.
//!
//! ## Pieces
//! - [`ToneRequest`]: what to play (frequency, gain, ear, duration)
//! - [`SineVoice`]: the per-frame generator, independent of any device
//! - [`ToneOutput`]: the device seam; [`crate::audio::CpalOutput`] is the real one
//! - [`TonePlayer`]: spawns one render thread per tone and reports its lifecycle
//!
//! Every tone holds an [`ActiveTone`] guard on its render thread. The guard is
//! released when the thread ends, whether the voice completed, the device
//! failed or the backend panicked, so a tone can never stay registered.

use crossbeam_channel::Sender;
use std::f64::consts::PI;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;
use tracing::{debug, error};

use crate::level;
use crate::session::Ear;

/// Tone length used when the caller does not pick one.
pub const DEFAULT_TONE_DURATION: Duration = Duration::from_secs(1);

/// A tone to be played.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneRequest {
    /// Frequency in Hz
    pub frequency: f32,
    /// Linear gain, 0 to 100
    pub gain: f32,
    pub ear: Ear,
    pub duration: Duration,
}

impl ToneRequest {
    /// A one-second tone.
    pub fn new(frequency: f32, gain: f32, ear: Ear) -> Self {
        Self {
            frequency,
            gain,
            ear,
            duration: DEFAULT_TONE_DURATION,
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Gain mapped onto 0.0-1.0 amplitude.
    pub fn normalized_gain(&self) -> f32 {
        level::clamp_gain(self.gain) / level::MAX_GAIN
    }

    /// Stereo position: -1.0 full left, +1.0 full right.
    pub fn pan(&self) -> f32 {
        pan_for(self.ear)
    }
}

/// Pan value for an ear. No partial panning.
pub fn pan_for(ear: Ear) -> f32 {
    match ear {
        Ear::Left => -1.0,
        Ear::Right => 1.0,
    }
}

/// Equal-power channel gains `(left, right)` for a mono source at `pan`.
fn channel_gains(pan: f32) -> (f32, f32) {
    // Hard pans are exact so the silent side is true silence.
    if pan <= -1.0 {
        return (1.0, 0.0);
    }
    if pan >= 1.0 {
        return (0.0, 1.0);
    }
    let x = (pan as f64 + 1.0) / 2.0;
    let theta = x * PI / 2.0;
    (theta.cos() as f32, theta.sin() as f32)
}

/// Sine generator for one tone at a fixed sample rate.
#[derive(Debug, Clone)]
pub struct SineVoice {
    phase: f64,
    phase_step: f64,
    amplitude: f32,
    left_gain: f32,
    right_gain: f32,
    frames_total: u64,
    frames_rendered: u64,
}

impl SineVoice {
    pub fn new(request: &ToneRequest, sample_rate: u32) -> Self {
        let (left_gain, right_gain) = channel_gains(request.pan());
        let frames_total = (request.duration.as_secs_f64() * sample_rate as f64).round() as u64;
        Self {
            phase: 0.0,
            phase_step: 2.0 * PI * request.frequency as f64 / sample_rate as f64,
            amplitude: request.normalized_gain(),
            left_gain,
            right_gain,
            frames_total,
            frames_rendered: 0,
        }
    }

    /// Next `[left, right]` frame, or `None` once the duration has elapsed.
    pub fn next_frame(&mut self) -> Option<[f32; 2]> {
        if self.is_finished() {
            return None;
        }
        let sample = self.phase.sin() as f32 * self.amplitude;
        self.phase = (self.phase + self.phase_step) % (2.0 * PI);
        self.frames_rendered += 1;
        Some([sample * self.left_gain, sample * self.right_gain])
    }

    /// Fills an interleaved buffer of `channels` (at least two) channels.
    ///
    /// Channels beyond the first two stay silent, and frames past the end of
    /// the tone are zeroed. Returns `true` while the voice is still sounding.
    pub fn fill_interleaved(&mut self, out: &mut [f32], channels: usize) -> bool {
        let channels = channels.max(2);
        for frame in out.chunks_mut(channels) {
            let [left, right] = self.next_frame().unwrap_or([0.0, 0.0]);
            for (i, sample) in frame.iter_mut().enumerate() {
                *sample = match i {
                    0 => left,
                    1 => right,
                    _ => 0.0,
                };
            }
        }
        !self.is_finished()
    }

    pub fn is_finished(&self) -> bool {
        self.frames_rendered >= self.frames_total
    }

    pub fn total_frames(&self) -> u64 {
        self.frames_total
    }
}

/// An audio device that can render a tone.
pub trait ToneOutput: Send + Sync + 'static {
    /// Plays `request` and blocks the calling thread until it has finished.
    ///
    /// Implementations release every device resource they acquired before
    /// returning, including on error.
    fn render(&self, request: &ToneRequest) -> anyhow::Result<()>;
}

/// Identifies one `play` call in [`ToneEvent`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ToneId(pub u64);

/// Lifecycle notifications sent by a [`TonePlayer`].
#[derive(Debug, Clone, PartialEq)]
pub enum ToneEvent {
    Started { id: ToneId, frequency: f32, ear: Ear },
    /// The tone played to completion and its resources were released
    Finished { id: ToneId },
    /// The tone could not be played; its resources were released
    Failed { id: ToneId, reason: String },
}

/// Reason reported for a tone whose render thread never ran.
const NOT_STARTED: &str = "tone thread could not be started";
/// Reason reported for a tone whose backend panicked.
const PANICKED: &str = "tone thread panicked";

/// Registration of one tone; dropping it releases the tone.
///
/// A guard is armed as failed until [`ActiveTone::started`] is called on the
/// render thread, so a tone dropped by a failed spawn reports `Failed`.
struct ActiveTone {
    id: ToneId,
    active: Arc<AtomicUsize>,
    events: Option<Sender<ToneEvent>>,
    failure: Option<String>,
}

impl ActiveTone {
    fn acquire(id: ToneId, active: Arc<AtomicUsize>, events: Option<Sender<ToneEvent>>) -> Self {
        active.fetch_add(1, Ordering::SeqCst);
        Self {
            id,
            active,
            events,
            failure: Some(NOT_STARTED.to_string()),
        }
    }

    /// Marks the render thread as running and announces the tone.
    fn started(&mut self, request: &ToneRequest) {
        self.failure = None;
        self.notify(ToneEvent::Started {
            id: self.id,
            frequency: request.frequency,
            ear: request.ear,
        });
    }

    fn notify(&self, event: ToneEvent) {
        if let Some(events) = &self.events {
            // The receiver may have gone away; the tone is still released.
            let _ = events.send(event);
        }
    }
}

impl Drop for ActiveTone {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
        let failure = self
            .failure
            .take()
            .or_else(|| thread::panicking().then(|| PANICKED.to_string()));
        let event = match failure {
            Some(reason) => {
                error!("[TONE] Tone {:?} failed: {}", self.id, reason);
                ToneEvent::Failed { id: self.id, reason }
            }
            None => ToneEvent::Finished { id: self.id },
        };
        debug!("[TONE] Released tone {:?}", self.id);
        self.notify(event);
    }
}

/// Plays tones on detached threads through a [`ToneOutput`].
///
/// Overlapping calls sound concurrently; nothing is queued or cancelled.
pub struct TonePlayer<O: ToneOutput> {
    output: Arc<O>,
    active: Arc<AtomicUsize>,
    next_id: AtomicU64,
    events: Option<Sender<ToneEvent>>,
}

impl<O: ToneOutput> TonePlayer<O> {
    pub fn new(output: O) -> Self {
        Self {
            output: Arc::new(output),
            active: Arc::new(AtomicUsize::new(0)),
            next_id: AtomicU64::new(1),
            events: None,
        }
    }

    /// Sends [`ToneEvent`]s for every subsequent tone to `sender`.
    pub fn with_events(mut self, sender: Sender<ToneEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    /// Starts a tone and returns immediately.
    ///
    /// Audio failures are logged and reported as [`ToneEvent::Failed`]; they
    /// never propagate to the caller.
    pub fn play(&self, request: ToneRequest) -> ToneId {
        let id = ToneId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut guard = ActiveTone::acquire(id, Arc::clone(&self.active), self.events.clone());
        let output = Arc::clone(&self.output);

        let spawned = thread::Builder::new()
            .name(format!("tone-{}", id.0))
            .spawn(move || {
                debug!(
                    "[TONE] Playing {} Hz at gain {} ({}) for {:?}",
                    request.frequency, request.gain, request.ear, request.duration
                );
                guard.started(&request);
                if let Err(e) = output.render(&request) {
                    error!("[TONE] Error playing tone: {:#}", e);
                    guard.failure = Some(e.to_string());
                }
                // `guard` drops here and releases the tone.
            });

        if let Err(e) = spawned {
            // The closure was dropped with the guard still armed as not started.
            error!("[TONE] Could not start tone thread: {}", e);
        }
        id
    }

    /// Number of tones that have started and not yet been released.
    pub fn active_tones(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::{Receiver, unbounded};
    use rustfft::{FftPlanner, num_complex::Complex};

    const SAMPLE_RATE: u32 = 44_100;
    const WAIT: Duration = Duration::from_secs(5);

    #[test]
    fn request_normalizes_gain_and_pans() {
        let left = ToneRequest::new(1000.0, 50.0, Ear::Left);
        assert_eq!(left.normalized_gain(), 0.5);
        assert_eq!(left.pan(), -1.0);
        assert_eq!(left.duration, Duration::from_secs(1));
        assert_eq!(ToneRequest::new(1000.0, 150.0, Ear::Right).normalized_gain(), 1.0);
        assert_eq!(ToneRequest::new(1000.0, 0.0, Ear::Right).pan(), 1.0);
    }

    #[test]
    fn voice_stays_in_its_channel() {
        let request = ToneRequest::new(440.0, 80.0, Ear::Left);
        let mut voice = SineVoice::new(&request, SAMPLE_RATE);
        let mut peak_left = 0.0f32;
        let mut peak_right = 0.0f32;
        while let Some([l, r]) = voice.next_frame() {
            peak_left = peak_left.max(l.abs());
            peak_right = peak_right.max(r.abs());
        }
        assert!((peak_left - 0.8).abs() < 0.01);
        assert!(peak_right < 1e-6);

        let mut right = SineVoice::new(&ToneRequest::new(440.0, 80.0, Ear::Right), SAMPLE_RATE);
        let frames: Vec<[f32; 2]> = std::iter::from_fn(|| right.next_frame()).collect();
        assert!(frames.iter().all(|[l, _]| l.abs() < 1e-6));
    }

    #[test]
    fn voice_length_matches_duration() {
        let request =
            ToneRequest::new(1000.0, 50.0, Ear::Right).with_duration(Duration::from_millis(250));
        let mut voice = SineVoice::new(&request, SAMPLE_RATE);
        assert_eq!(voice.total_frames(), 11_025);
        let count = std::iter::from_fn(|| voice.next_frame()).count();
        assert_eq!(count, 11_025);
        assert!(voice.is_finished());
    }

    #[test]
    fn voice_spectrum_peaks_at_tone_frequency() {
        const N: usize = 4096;
        let request = ToneRequest::new(1000.0, 100.0, Ear::Left);
        let mut voice = SineVoice::new(&request, SAMPLE_RATE);
        let mut buffer: Vec<Complex<f32>> = (0..N)
            .map(|_| Complex {
                re: voice.next_frame().unwrap()[0],
                im: 0.0,
            })
            .collect();

        let mut planner = FftPlanner::new();
        planner.plan_fft_forward(N).process(&mut buffer);

        let peak_bin = buffer
            .iter()
            .take(N / 2)
            .enumerate()
            .max_by(|a, b| a.1.norm().partial_cmp(&b.1.norm()).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        let expected = 1000.0 * N as f32 / SAMPLE_RATE as f32;
        assert!((peak_bin as f32 - expected).abs() <= 1.0, "peak at bin {}", peak_bin);
    }

    #[test]
    fn fill_pads_silence_and_extra_channels() {
        let request =
            ToneRequest::new(500.0, 100.0, Ear::Right).with_duration(Duration::from_millis(1));
        let mut voice = SineVoice::new(&request, SAMPLE_RATE);
        let frames = voice.total_frames() as usize;
        let mut out = vec![1.0f32; (frames + 10) * 4];

        assert!(!voice.fill_interleaved(&mut out, 4));
        for frame in out.chunks(4) {
            assert_eq!(frame[0].abs(), 0.0);
            assert_eq!(frame[2], 0.0);
            assert_eq!(frame[3], 0.0);
        }
        assert!(out[(frames + 1) * 4..].iter().all(|&s| s == 0.0));
    }

    /// Output that reports each request and waits for a release signal.
    struct GatedOutput {
        requests: Sender<ToneRequest>,
        release: Receiver<()>,
    }

    impl ToneOutput for GatedOutput {
        fn render(&self, request: &ToneRequest) -> anyhow::Result<()> {
            self.requests.send(*request)?;
            self.release.recv_timeout(WAIT)?;
            Ok(())
        }
    }

    struct BrokenOutput;

    impl ToneOutput for BrokenOutput {
        fn render(&self, _request: &ToneRequest) -> anyhow::Result<()> {
            Err(crate::error::AudioError::NoOutputDevice.into())
        }
    }

    struct PanickingOutput;

    impl ToneOutput for PanickingOutput {
        fn render(&self, _request: &ToneRequest) -> anyhow::Result<()> {
            panic!("device callback blew up");
        }
    }

    fn wait_for(events: &Receiver<ToneEvent>, pred: impl Fn(&ToneEvent) -> bool) -> ToneEvent {
        loop {
            let event = events.recv_timeout(WAIT).expect("tone event");
            if pred(&event) {
                return event;
            }
        }
    }

    #[test]
    fn player_releases_after_playback() {
        let (req_tx, req_rx) = unbounded();
        let (release_tx, release_rx) = unbounded();
        let (event_tx, event_rx) = unbounded();
        let player = TonePlayer::new(GatedOutput {
            requests: req_tx,
            release: release_rx,
        })
        .with_events(event_tx);

        let id = player.play(ToneRequest::new(2000.0, 30.0, Ear::Right));
        let request = req_rx.recv_timeout(WAIT).unwrap();
        assert_eq!(request.frequency, 2000.0);
        assert_eq!(player.active_tones(), 1);

        release_tx.send(()).unwrap();
        let finished = wait_for(&event_rx, |e| matches!(e, ToneEvent::Finished { .. }));
        assert_eq!(finished, ToneEvent::Finished { id });
        assert_eq!(player.active_tones(), 0);
    }

    #[test]
    fn overlapping_tones_sound_together() {
        let (req_tx, req_rx) = unbounded();
        let (release_tx, release_rx) = unbounded();
        let (event_tx, event_rx) = unbounded();
        let player = TonePlayer::new(GatedOutput {
            requests: req_tx,
            release: release_rx,
        })
        .with_events(event_tx);

        let first = player.play(ToneRequest::new(250.0, 40.0, Ear::Left));
        let second = player.play(ToneRequest::new(8000.0, 40.0, Ear::Left));
        assert_ne!(first, second);
        req_rx.recv_timeout(WAIT).unwrap();
        req_rx.recv_timeout(WAIT).unwrap();
        assert_eq!(player.active_tones(), 2);

        release_tx.send(()).unwrap();
        release_tx.send(()).unwrap();
        wait_for(&event_rx, |e| matches!(e, ToneEvent::Finished { .. }));
        wait_for(&event_rx, |e| matches!(e, ToneEvent::Finished { .. }));
        assert_eq!(player.active_tones(), 0);
    }

    #[test]
    fn device_failure_is_reported_not_raised() {
        let (event_tx, event_rx) = unbounded();
        let player = TonePlayer::new(BrokenOutput).with_events(event_tx);
        let id = player.play(ToneRequest::new(1000.0, 50.0, Ear::Left));

        match wait_for(&event_rx, |e| !matches!(e, ToneEvent::Started { .. })) {
            ToneEvent::Failed { id: failed, reason } => {
                assert_eq!(failed, id);
                assert!(reason.contains("No output device"));
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(player.active_tones(), 0);
    }

    #[test]
    fn panicking_backend_is_reported_as_failure() {
        let (event_tx, event_rx) = unbounded();
        let player = TonePlayer::new(PanickingOutput).with_events(event_tx);
        let id = player.play(ToneRequest::new(1000.0, 50.0, Ear::Left));

        let released = wait_for(&event_rx, |e| !matches!(e, ToneEvent::Started { .. }));
        assert_eq!(
            released,
            ToneEvent::Failed {
                id,
                reason: PANICKED.to_string()
            }
        );
        assert_eq!(player.active_tones(), 0);
    }

    #[test]
    fn tone_that_never_started_is_reported_as_failure() {
        let (event_tx, event_rx) = unbounded();
        let active = Arc::new(AtomicUsize::new(0));
        let guard = ActiveTone::acquire(ToneId(7), Arc::clone(&active), Some(event_tx));
        assert_eq!(active.load(Ordering::SeqCst), 1);
        drop(guard);

        assert_eq!(
            event_rx.try_recv().unwrap(),
            ToneEvent::Failed {
                id: ToneId(7),
                reason: NOT_STARTED.to_string()
            }
        );
        assert_eq!(active.load(Ordering::SeqCst), 0);
    }
}

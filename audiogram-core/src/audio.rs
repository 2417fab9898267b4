//! # Audio Output Module
//!
//! This module plays test tones on the default output device using CPAL
//! (Cross-Platform Audio Library). It is the production [`ToneOutput`].
//!
//! ## Features
//! - Automatic output device selection
//! - Stereo f32 stream at (or near) 44.1 kHz
//! - Stream torn down once the final buffer of the tone has been handed off
//! - Errors returned to the tone player, never panicked

use anyhow::Result;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SupportedStreamConfigRange;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::error::AudioError;
use crate::tone::{SineVoice, ToneOutput, ToneRequest};

/// Preferred output sample rate in Hz.
pub const TARGET_SAMPLE_RATE: u32 = 44_100;

/// Extra time granted past the tone duration before the stream is torn
/// down regardless of the completion signal.
const RELEASE_MARGIN: Duration = Duration::from_millis(500);

/// Tone output on the host's default output device.
#[derive(Debug, Default, Clone, Copy)]
pub struct CpalOutput;

impl CpalOutput {
    pub fn new() -> Self {
        Self
    }
}

/// Decides when a finished voice may report completion.
///
/// The callback that renders the last samples of a tone also reports the
/// voice as finished. Completion is signalled one callback later, once the
/// device has asked for the next buffer and so has taken the final one.
#[derive(Debug, Default)]
struct CompletionGate {
    last_buffer_written: bool,
}

impl CompletionGate {
    /// Called after each callback; returns `true` when completion should be signalled.
    fn after_fill(&mut self, sounding: bool) -> bool {
        if sounding {
            return false;
        }
        if self.last_buffer_written {
            return true;
        }
        self.last_buffer_written = true;
        false
    }
}

/// Owns a running stream and stops it when dropped.
struct StreamGuard(cpal::Stream);

impl Drop for StreamGuard {
    fn drop(&mut self) {
        if let Err(e) = self.0.pause() {
            warn!("[AUDIO] Error pausing stream: {}", e);
        }
        debug!("[AUDIO] Output stream released");
    }
}

impl ToneOutput for CpalOutput {
    /// Opens the default output device, plays one voice and blocks until the
    /// voice signals it is done.
    ///
    /// # Audio Configuration
    /// - Sample Rate: 44.1 kHz when supported, else the closest the device offers
    /// - Format: 32-bit float
    /// - Channels: 2 or more (extra channels are silent)
    fn render(&self, request: &ToneRequest) -> Result<()> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(AudioError::NoOutputDevice)?;

        debug!("[AUDIO] Using audio output device: {}", device.name()?);

        let configs = device.supported_output_configs()?.collect::<Vec<_>>();
        let supported_config =
            find_supported_config(configs, TARGET_SAMPLE_RATE).ok_or(AudioError::NoSuitableFormat)?;

        let sample_rate_val = TARGET_SAMPLE_RATE.clamp(
            supported_config.min_sample_rate().0,
            supported_config.max_sample_rate().0,
        );
        let config = supported_config.with_sample_rate(cpal::SampleRate(sample_rate_val));
        let channels = config.channels() as usize;
        let config: cpal::StreamConfig = config.into();

        debug!("[AUDIO] Selected sample rate: {} Hz, {} channels", sample_rate_val, channels);

        let mut voice = SineVoice::new(request, sample_rate_val);
        let mut gate = CompletionGate::default();
        let (done_tx, done_rx) = crossbeam_channel::bounded::<()>(1);

        let err_fn = |err| error!("[AUDIO] An error occurred on the output stream: {}", err);

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let sounding = voice.fill_interleaved(data, channels);
                    if gate.after_fill(sounding) {
                        // Ignore a full channel; one completion signal is enough.
                        let _ = done_tx.try_send(());
                    }
                },
                err_fn,
                None,
            )
            .map_err(|e| AudioError::StreamOpenFailed(e.to_string()))?;
        let stream = StreamGuard(stream);

        stream
            .0
            .play()
            .map_err(|e| AudioError::StreamOpenFailed(e.to_string()))?;

        if done_rx.recv_timeout(request.duration + RELEASE_MARGIN).is_err() {
            warn!(
                "[AUDIO] Tone at {} Hz did not report completion; releasing stream",
                request.frequency
            );
        }
        Ok(())
    }
}

/// Best-effort hint of the current output volume.
///
/// Desktop hosts do not expose the system volume, so this only detects the
/// "no output at all" case (reported as `0.0`) and is `None` otherwise.
pub fn output_volume_hint() -> Option<f32> {
    match cpal::default_host().default_output_device() {
        Some(_) => None,
        None => Some(0.0),
    }
}

/// Finds the best supported output configuration for the target sample rate.
///
/// Keeps stereo-or-wider f32 configurations and picks the one whose range
/// lies closest to `target_rate`. Mono devices are rejected: they cannot
/// present a tone to one ear only.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.channels() >= 2 && c.sample_format() == cpal::SampleFormat::F32)
        .min_by_key(|c| {
            let (min, max) = (c.min_sample_rate().0, c.max_sample_rate().0);
            if (min..=max).contains(&target_rate) {
                0
            } else {
                min.abs_diff(target_rate).min(max.abs_diff(target_rate))
            }
        })
}

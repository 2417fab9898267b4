//! # Gain and Hearing Level Module
//!
//! Conversions between the linear 0-100 gain scale used by the tone player
//! and the dB-like hearing level shown on the audiogram.
//!
//! ## Scales
//! - Gain: linear, 0 (silent) to 100 (full scale)
//! - Hearing level: -10 dB (top of the chart) to 120 dB (bottom of the chart)
//!
//! [`gain_to_level`] is a fixed affine map. [`level_to_gain`] is an
//! exponential curve and is *not* its inverse; the two serve different
//! displays and are kept as they are.

/// Lowest gain on the slider.
pub const MIN_GAIN: f32 = 0.0;
/// Highest gain on the slider.
pub const MAX_GAIN: f32 = 100.0;

/// Hearing level reported for a gain of zero or below.
pub const MIN_LEVEL: f32 = -10.0;
/// Hearing level reported for full gain.
pub const MAX_LEVEL: f32 = 120.0;
/// Width of the hearing level scale.
pub const LEVEL_RANGE: f32 = MAX_LEVEL - MIN_LEVEL;

/// Levels at or below this are treated as silence by [`level_to_gain`].
const SILENCE_LEVEL: f32 = -60.0;

/// Converts a linear gain (0-100) to a hearing level in dB.
///
/// # Arguments
/// * `gain` - Linear gain, nominally 0 to 100
///
/// # Returns
/// * `-10.0` for any gain at or below zero
/// * `-10 + 130 * gain / 100` otherwise, i.e. `120.0` at full gain
pub fn gain_to_level(gain: f32) -> f32 {
    if gain <= MIN_GAIN {
        return MIN_LEVEL;
    }
    MIN_LEVEL + LEVEL_RANGE * (gain / MAX_GAIN)
}

/// Converts a hearing level in dB back to a linear gain.
///
/// Uses an exponential curve (`100 * 10^(level / 20)`), so
/// `level_to_gain(gain_to_level(g))` is generally not `g`.
pub fn level_to_gain(level: f32) -> f32 {
    if level <= SILENCE_LEVEL {
        return 0.0;
    }
    MAX_GAIN * 10f32.powf(level / 20.0)
}

/// Clamps a gain into the slider range.
pub fn clamp_gain(gain: f32) -> f32 {
    if gain.is_nan() {
        return MIN_GAIN;
    }
    gain.clamp(MIN_GAIN, MAX_GAIN)
}

/// Applies a keyboard step to a gain and clamps the result.
///
/// The result is rounded to one decimal so repeated 0.1 steps do not
/// accumulate float noise on the readout.
pub fn adjust_gain(gain: f32, delta: f32) -> f32 {
    let stepped = ((gain + delta) * 10.0).round() / 10.0;
    clamp_gain(stepped)
}

/// Formats a frequency for labels: `"500Hz"`, `"1kHz"`, `"7.4kHz"`.
pub fn format_frequency(frequency: u32) -> String {
    if frequency >= 1000 {
        format!("{}kHz", frequency as f64 / 1000.0)
    } else {
        format!("{}Hz", frequency)
    }
}

/// Formats a hearing level with one decimal, e.g. `"55.0 dB"`.
pub fn format_level(level: f32) -> String {
    format!("{:.1} dB", level)
}

//! # Session Model Module
//!
//! The entities recorded by a hearing test and the pure functions that
//! create, update and query them.
//!
//! A [`Session`] is one test run. Each [`Measurement`] is keyed by its
//! `(frequency, ear)` pair and a session holds at most one measurement per
//! key; [`Session::upsert`] is the only mutation and it returns a new value.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::level;

/// Frequencies of the standard test, in Hz.
pub const STANDARD_FREQUENCIES: [u32; 6] = [250, 500, 1000, 2000, 4000, 8000];

/// Frequencies of the high-frequency test, in Hz.
pub const HIGH_FREQUENCIES: [u32; 11] = [
    6000, 7000, 7400, 7600, 7800, 8000, 8200, 8400, 8600, 9000, 10000,
];

/// Both ears, in display order.
pub const BOTH_EARS: [Ear; 2] = [Ear::Left, Ear::Right];

/// Slider start value for untested frequencies in the standard test.
const STANDARD_PRESET_GAIN: f32 = 50.0;
/// Slider start value for untested frequencies in the high-frequency test.
const HIGH_FREQUENCY_PRESET_GAIN: f32 = 2.4;

/// Number of random base-36 characters in a session id.
const SESSION_ID_RANDOM_LEN: usize = 9;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Left or right channel of a tone or measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ear {
    Left,
    Right,
}

impl Ear {
    /// The other ear.
    pub fn opposite(self) -> Ear {
        match self {
            Ear::Left => Ear::Right,
            Ear::Right => Ear::Left,
        }
    }

    /// Lowercase name as used in exports (`"left"` / `"right"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Ear::Left => "left",
            Ear::Right => "right",
        }
    }
}

impl fmt::Display for Ear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ear::Left => write!(f, "Left"),
            Ear::Right => write!(f, "Right"),
        }
    }
}

/// Which frequency set a session covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TestType {
    #[default]
    Standard,
    HighFrequency,
}

impl TestType {
    /// The fixed frequency set tested by this test type.
    pub fn frequencies(self) -> &'static [u32] {
        match self {
            TestType::Standard => &STANDARD_FREQUENCIES,
            TestType::HighFrequency => &HIGH_FREQUENCIES,
        }
    }

    /// Whether `frequency` belongs to this test type's set.
    pub fn allows(self, frequency: u32) -> bool {
        self.frequencies().contains(&frequency)
    }

    /// Gain the slider starts at before the user has answered.
    pub fn preset_gain(self) -> f32 {
        match self {
            TestType::Standard => STANDARD_PRESET_GAIN,
            TestType::HighFrequency => HIGH_FREQUENCY_PRESET_GAIN,
        }
    }

    /// Number of (frequency, ear) answers needed to finish the test.
    pub fn total_required(self) -> usize {
        self.frequencies().len() * BOTH_EARS.len()
    }

    pub fn title(self) -> &'static str {
        match self {
            TestType::Standard => "Hearing Test",
            TestType::HighFrequency => "High Frequency Test",
        }
    }
}

/// One recorded response: the gain at which a tone was heard.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measurement {
    /// Tone frequency in Hz
    pub frequency: u32,
    pub ear: Ear,
    /// Gain (0-100) at which the user reported hearing the tone
    pub gain_level: f32,
}

impl Measurement {
    /// Creates a measurement, clamping the gain into 0-100.
    pub fn new(frequency: u32, ear: Ear, gain_level: f32) -> Self {
        Self {
            frequency,
            ear,
            gain_level: level::clamp_gain(gain_level),
        }
    }

    /// The natural key of this measurement within a session.
    pub fn key(&self) -> (u32, Ear) {
        (self.frequency, self.ear)
    }
}

/// One test run: metadata plus its ordered measurements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "headphone")]
    pub headphone_label: String,
    #[serde(default)]
    pub test_type: TestType,
    #[serde(rename = "data")]
    pub measurements: Vec<Measurement>,
}

impl Session {
    /// Starts an empty session stamped with the current time and a fresh id.
    pub fn create(headphone_label: impl Into<String>, test_type: TestType) -> Self {
        let timestamp = Utc::now();
        Self {
            id: generate_session_id(timestamp),
            timestamp,
            headphone_label: headphone_label.into(),
            test_type,
            measurements: Vec::new(),
        }
    }

    /// Returns a copy of the session with `measurement` recorded.
    ///
    /// A measurement with the same `(frequency, ear)` key is replaced where
    /// it stands; otherwise the new one is appended. Applying the same
    /// measurement twice gives the same session as applying it once.
    pub fn upsert(&self, measurement: Measurement) -> Session {
        let mut next = self.clone();
        match next
            .measurements
            .iter_mut()
            .find(|m| m.key() == measurement.key())
        {
            Some(existing) => *existing = measurement,
            None => next.measurements.push(measurement),
        }
        next
    }

    /// The recorded gain for a key, if any.
    pub fn gain_for(&self, frequency: u32, ear: Ear) -> Option<f32> {
        self.measurements
            .iter()
            .find(|m| m.frequency == frequency && m.ear == ear)
            .map(|m| m.gain_level)
    }

    /// True iff every `(frequency, ear)` in the product of the inputs has a
    /// measurement.
    pub fn is_complete(&self, frequencies: &[u32], ears: &[Ear]) -> bool {
        frequencies.iter().all(|&frequency| {
            ears.iter()
                .all(|&ear| self.gain_for(frequency, ear).is_some())
        })
    }

    /// True iff every frequency has a measurement for `ear`.
    pub fn is_ear_complete(&self, frequencies: &[u32], ear: Ear) -> bool {
        self.is_complete(frequencies, &[ear])
    }

    /// Share of required answers recorded so far.
    ///
    /// Not clamped; upsert keeps it at or below 1.0 in practice. Zero
    /// required answers reports 0.0.
    pub fn progress_fraction(&self, total_required: usize) -> f32 {
        if total_required == 0 {
            return 0.0;
        }
        self.measurements.len() as f32 / total_required as f32
    }
}

/// Builds `session-<unix millis>-<9 base-36 chars>`.
fn generate_session_id(timestamp: DateTime<Utc>) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..SESSION_ID_RANDOM_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("session-{}-{}", timestamp.timestamp_millis(), suffix)
}

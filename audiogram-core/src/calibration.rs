//! # Calibration Module
//!
//! Tracks the reference volume the user calibrated against and flags when
//! the current volume seems to have drifted from it. The drift check is
//! advisory only; it never blocks a test.
//!
//! [`CalibrationState`] is a plain value. It is loaded from the store when
//! the application starts and saved when the user calibrates or resets.

use std::time::Duration;
use tracing::{error, info};

use crate::session::Ear;
use crate::storage::{self, CALIBRATION_KEY, KeyValueStore};
use crate::tone::ToneRequest;

/// Relative volume change treated as drift.
pub const DRIFT_TOLERANCE: f32 = 0.1;

/// How often the GUI re-checks the volume.
pub const DRIFT_CHECK_INTERVAL: Duration = Duration::from_secs(30);

/// The tone the user adjusts their volume against.
pub fn reference_tone() -> ToneRequest {
    ToneRequest::new(1000.0, 50.0, Ear::Left).with_duration(Duration::from_secs(2))
}

/// Calibration status for the current user.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CalibrationState {
    /// Volume observed when the user confirmed calibration, if it was known
    pub reference_volume: Option<f32>,
    /// Whether the user has confirmed a calibration
    pub calibrated: bool,
}

impl CalibrationState {
    /// Restores the saved calibration. A saved reference volume implies the
    /// user had calibrated; read failures yield an uncalibrated state.
    pub fn load<S: KeyValueStore + ?Sized>(store: &S) -> Self {
        match storage::get_json::<_, f32>(store, CALIBRATION_KEY) {
            Ok(Some(volume)) => Self {
                reference_volume: Some(volume),
                calibrated: true,
            },
            Ok(None) => Self::default(),
            Err(e) => {
                error!("[CALIBRATION] Error loading calibration: {}", e);
                Self::default()
            }
        }
    }

    /// Persists the reference volume, or clears it when absent.
    pub fn save<S: KeyValueStore + ?Sized>(&self, store: &S) {
        let result = match self.reference_volume {
            Some(volume) => storage::set_json(store, CALIBRATION_KEY, &volume),
            None => store.remove(CALIBRATION_KEY),
        };
        if let Err(e) = result {
            error!("[CALIBRATION] Error saving calibration: {}", e);
        }
    }

    /// Records the user's confirmation at `current_volume`.
    pub fn calibrate(&mut self, current_volume: Option<f32>) {
        info!("[CALIBRATION] Calibrated at volume {:?}", current_volume);
        self.reference_volume = current_volume;
        self.calibrated = true;
    }

    /// Forgets the calibration.
    pub fn reset(&mut self) {
        info!("[CALIBRATION] Calibration reset");
        *self = Self::default();
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibrated
    }

    /// True when both volumes are known and differ by more than
    /// [`DRIFT_TOLERANCE`] relative to the reference.
    pub fn has_drifted(&self, current_volume: Option<f32>) -> bool {
        match (self.reference_volume, current_volume) {
            (Some(reference), Some(current)) if reference == 0.0 => current != 0.0,
            (Some(reference), Some(current)) => {
                ((current - reference) / reference).abs() > DRIFT_TOLERANCE
            }
            _ => false,
        }
    }
}

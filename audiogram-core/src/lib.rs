// audiogram-core/src/lib.rs

//! The core logic for the audiogram hearing tracker.
//! This crate is responsible for the measurement model, gain/level math,
//! tone playback, session comparison and history storage. It is completely
//! headless and contains no GUI code.

pub mod audio;
pub mod calibration;
pub mod chart;
pub mod compare;
pub mod error;
pub mod export;
pub mod level;
pub mod selection;
pub mod session;
pub mod storage;
pub mod tone;

pub use compare::{Comparison, ComparisonRow, compare};
pub use session::{Ear, Measurement, Session, TestType};
pub use tone::{ToneEvent, ToneId, TonePlayer, ToneRequest};

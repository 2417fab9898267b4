//! # Widgets
//!
//! Custom canvas widgets.

pub mod audiogram_chart;

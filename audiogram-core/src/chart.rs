//! # Audiogram Chart Data
//!
//! Turns sessions into the line series drawn on the audiogram. The GUI only
//! has to map these onto canvas coordinates.
//!
//! Selected sessions are drawn oldest to newest; the newest gets full
//! opacity and the widest line, older ones fade out. Right-ear lines are
//! dashed.

use chrono::Local;
use std::collections::BTreeSet;

use crate::level::{self, LEVEL_RANGE, MAX_LEVEL, MIN_LEVEL};
use crate::session::{Ear, STANDARD_FREQUENCIES, Session};

/// Line colors, assigned by the session's position in the selection.
pub const SESSION_PALETTE: [[u8; 3]; 5] = [
    [54, 162, 235],  // Blue
    [255, 99, 132],  // Red
    [75, 192, 192],  // Green
    [255, 159, 64],  // Orange
    [153, 102, 255], // Purple
];

/// Opacity lost across the whole selection, oldest vs newest.
const OPACITY_SPAN: f32 = 0.8;
const NEWEST_LINE_WIDTH: f32 = 3.0;
const LINE_WIDTH_STEP: f32 = 0.5;
const MIN_LINE_WIDTH: f32 = 1.0;

/// Horizontal grid lines, in dB.
pub const LEVEL_TICKS: [f32; 14] = [
    -10.0, 0.0, 10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0, 100.0, 110.0, 120.0,
];

/// Which ears to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EarFilter {
    pub left: bool,
    pub right: bool,
}

impl Default for EarFilter {
    fn default() -> Self {
        Self {
            left: true,
            right: true,
        }
    }
}

impl EarFilter {
    fn ears(self) -> impl Iterator<Item = Ear> {
        [(Ear::Left, self.left), (Ear::Right, self.right)]
            .into_iter()
            .filter_map(|(ear, shown)| shown.then_some(ear))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesStyle {
    pub color: [u8; 3],
    /// 0.0-1.0
    pub opacity: f32,
    pub line_width: f32,
    pub dashed: bool,
}

/// One session/ear line on the audiogram.
#[derive(Debug, Clone, PartialEq)]
pub struct AudiogramSeries {
    pub session_id: String,
    pub ear: Ear,
    pub label: String,
    /// Hearing level per chart frequency; `None` where untested
    pub levels: Vec<Option<f32>>,
    pub style: SeriesStyle,
}

/// Everything needed to draw one audiogram.
#[derive(Debug, Clone, PartialEq)]
pub struct AudiogramData {
    pub frequencies: Vec<u32>,
    pub series: Vec<AudiogramSeries>,
}

impl AudiogramData {
    pub fn is_empty(&self) -> bool {
        self.series.iter().all(|s| s.levels.iter().all(Option::is_none))
    }
}

/// `(opacity, line width)` for the session at `index` of `count`, where the
/// last index is the most recent.
pub fn recency_weight(index: usize, count: usize) -> (f32, f32) {
    let reverse_index = count.saturating_sub(1).saturating_sub(index) as f32;
    let opacity_step = OPACITY_SPAN / (count.saturating_sub(1)).max(1) as f32;
    let opacity = 1.0 - reverse_index * opacity_step;
    let line_width = (NEWEST_LINE_WIDTH - reverse_index * LINE_WIDTH_STEP).max(MIN_LINE_WIDTH);
    (opacity, line_width)
}

/// Palette color for a session, by its position in `selected_ids`.
pub fn session_color(session_id: &str, selected_ids: &[String]) -> [u8; 3] {
    let index = selected_ids
        .iter()
        .position(|id| id == session_id)
        .unwrap_or(0);
    SESSION_PALETTE[index % SESSION_PALETTE.len()]
}

/// Vertical position of a level as a fraction of the plot height, with
/// -10 dB at the top (0.0) and 120 dB at the bottom (1.0).
pub fn level_fraction(level: f32) -> f32 {
    ((level.clamp(MIN_LEVEL, MAX_LEVEL) - MIN_LEVEL) / LEVEL_RANGE).clamp(0.0, 1.0)
}

/// Frequency axis for a set of sessions: every frequency their test types
/// cover plus any measured outside of it, ascending. Falls back to the
/// standard set when `sessions` is empty.
pub fn chart_frequencies<'a>(sessions: impl IntoIterator<Item = &'a Session>) -> Vec<u32> {
    let mut frequencies = BTreeSet::new();
    for session in sessions {
        frequencies.extend(session.test_type.frequencies().iter().copied());
        frequencies.extend(session.measurements.iter().map(|m| m.frequency));
    }
    if frequencies.is_empty() {
        return STANDARD_FREQUENCIES.to_vec();
    }
    frequencies.into_iter().collect()
}

/// Builds the series for the selected sessions.
///
/// `sessions` may contain unselected sessions; only those whose id is in
/// `selected_ids` are drawn, ordered by timestamp.
pub fn build_audiogram(
    sessions: &[Session],
    selected_ids: &[String],
    frequencies: &[u32],
    ears: EarFilter,
) -> AudiogramData {
    let mut selected: Vec<&Session> = sessions
        .iter()
        .filter(|s| selected_ids.contains(&s.id))
        .collect();
    selected.sort_by_key(|s| s.timestamp);

    let count = selected.len();
    let series = selected
        .iter()
        .enumerate()
        .flat_map(|(index, session)| {
            let (opacity, line_width) = recency_weight(index, count);
            let color = session_color(&session.id, selected_ids);
            let date = session.timestamp.with_timezone(&Local).format("%Y-%m-%d");
            ears.ears().map(move |ear| AudiogramSeries {
                session_id: session.id.clone(),
                ear,
                label: format!("{} ({})", date, ear),
                levels: frequencies
                    .iter()
                    .map(|&f| session.gain_for(f, ear).map(level::gain_to_level))
                    .collect(),
                style: SeriesStyle {
                    color,
                    opacity,
                    line_width,
                    dashed: ear == Ear::Right,
                },
            })
        })
        .collect();

    AudiogramData {
        frequencies: frequencies.to_vec(),
        series,
    }
}

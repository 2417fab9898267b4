//! # Screen State
//!
//! Plain state machines behind the screens. They hold no widgets and no
//! audio handles, so the update loop stays a thin dispatcher and the flows
//! can be unit tested without a window.

use std::collections::HashMap;
use std::time::Duration;

use audiogram_core::chart::EarFilter;
use audiogram_core::level;
use audiogram_core::selection::SessionSelection;
use audiogram_core::session::BOTH_EARS;
use audiogram_core::{Ear, Measurement, Session, TestType, ToneId, ToneRequest};

/// Which top-level screen is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Home,
    Headphone,
    Calibration,
    Test,
    History,
}

/// Steps of the calibration screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationStep {
    Intro,
    Playing,
    Adjust,
    Complete,
}

#[derive(Debug, Clone)]
pub struct CalibrationFlow {
    pub step: CalibrationStep,
    reference_tone: Option<ToneId>,
}

impl CalibrationFlow {
    /// Already calibrated users land on the final step.
    pub fn new(calibrated: bool) -> Self {
        Self {
            step: if calibrated {
                CalibrationStep::Complete
            } else {
                CalibrationStep::Intro
            },
            reference_tone: None,
        }
    }

    /// The reference tone `id` has started.
    pub fn tone_started(&mut self, id: ToneId) {
        self.reference_tone = Some(id);
        self.step = CalibrationStep::Playing;
    }

    /// A tone ended, successfully or not. Moves on to adjusting once the
    /// reference tone is done.
    pub fn tone_ended(&mut self, id: ToneId) {
        if self.reference_tone == Some(id) {
            self.reference_tone = None;
            if self.step == CalibrationStep::Playing {
                self.step = CalibrationStep::Adjust;
            }
        }
    }

    pub fn confirm(&mut self) {
        self.step = CalibrationStep::Complete;
    }

    pub fn recalibrate(&mut self) {
        *self = Self::new(false);
    }

    pub fn is_playing(&self) -> bool {
        self.reference_tone.is_some()
    }
}

/// An in-progress test: the session being built plus per-row slider
/// positions and which rows are currently sounding.
#[derive(Debug, Clone)]
pub struct TestRun {
    pub session: Session,
    pub ear: Ear,
    /// Row the arrow keys adjust
    pub focused: Option<u32>,
    sliders: HashMap<(u32, Ear), f32>,
    playing: HashMap<ToneId, (u32, Ear)>,
}

impl TestRun {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            ear: Ear::Left,
            focused: None,
            sliders: HashMap::new(),
            playing: HashMap::new(),
        }
    }

    pub fn test_type(&self) -> TestType {
        self.session.test_type
    }

    pub fn frequencies(&self) -> &'static [u32] {
        self.test_type().frequencies()
    }

    /// Slider position for a row: the last value the user set, else the
    /// recorded answer, else the test type's preset.
    pub fn slider_gain(&self, frequency: u32, ear: Ear) -> f32 {
        self.sliders
            .get(&(frequency, ear))
            .copied()
            .or_else(|| self.session.gain_for(frequency, ear))
            .unwrap_or_else(|| self.test_type().preset_gain())
    }

    pub fn set_slider_gain(&mut self, frequency: u32, gain: f32) {
        self.sliders
            .insert((frequency, self.ear), level::clamp_gain(gain));
        self.focused = Some(frequency);
    }

    /// Fine adjustment of the focused row, if any.
    pub fn nudge_focused(&mut self, delta: f32) {
        if let Some(frequency) = self.focused {
            let gain = level::adjust_gain(self.slider_gain(frequency, self.ear), delta);
            self.sliders.insert((frequency, self.ear), gain);
        }
    }

    /// Tone for a row of the current ear at its slider position.
    pub fn tone_request(&self, frequency: u32, duration: Duration) -> ToneRequest {
        ToneRequest::new(
            frequency as f32,
            self.slider_gain(frequency, self.ear),
            self.ear,
        )
        .with_duration(duration)
    }

    pub fn tone_started(&mut self, id: ToneId, frequency: u32) {
        self.playing.insert(id, (frequency, self.ear));
        self.focused = Some(frequency);
    }

    pub fn tone_ended(&mut self, id: ToneId) {
        self.playing.remove(&id);
    }

    pub fn is_playing(&self, frequency: u32, ear: Ear) -> bool {
        self.playing.values().any(|&key| key == (frequency, ear))
    }

    /// Records the current slider position as the answer for a row.
    pub fn record(&mut self, frequency: u32) {
        let gain = self.slider_gain(frequency, self.ear);
        self.session = self
            .session
            .upsert(Measurement::new(frequency, self.ear, gain));
        self.focused = Some(frequency);
    }

    pub fn is_recorded(&self, frequency: u32, ear: Ear) -> bool {
        self.session.gain_for(frequency, ear).is_some()
    }

    pub fn select_ear(&mut self, ear: Ear) {
        self.ear = ear;
        self.focused = None;
    }

    pub fn progress(&self) -> f32 {
        self.session
            .progress_fraction(self.test_type().total_required())
    }

    pub fn is_ear_complete(&self, ear: Ear) -> bool {
        self.session.is_ear_complete(self.frequencies(), ear)
    }

    pub fn is_complete(&self) -> bool {
        self.session.is_complete(self.frequencies(), &BOTH_EARS)
    }
}

/// History screen: saved sessions newest first plus the chart controls.
#[derive(Debug, Clone, Default)]
pub struct HistoryView {
    pub sessions: Vec<Session>,
    pub selection: SessionSelection,
    pub ears: EarFilter,
}

impl HistoryView {
    /// Replaces the listed sessions, keeping only still-existing selections.
    pub fn load(&mut self, mut sessions: Vec<Session>) {
        sessions.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        let mut selection = SessionSelection::new();
        for id in self.selection.ids() {
            if sessions.iter().any(|s| &s.id == id) {
                selection.toggle(id);
            }
        }
        self.sessions = sessions;
        self.selection = selection;
    }

    pub fn toggle_ear(&mut self, ear: Ear) {
        match ear {
            Ear::Left => self.ears.left = !self.ears.left,
            Ear::Right => self.ears.right = !self.ears.right,
        }
    }

    pub fn selected_sessions(&self) -> impl Iterator<Item = &Session> {
        self.sessions
            .iter()
            .filter(|s| self.selection.contains(&s.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use audiogram_core::session::STANDARD_FREQUENCIES;
    use chrono::Duration as ChronoDuration;

    #[test]
    fn calibration_steps() {
        let mut flow = CalibrationFlow::new(false);
        assert_eq!(flow.step, CalibrationStep::Intro);

        flow.tone_started(ToneId(7));
        assert_eq!(flow.step, CalibrationStep::Playing);
        assert!(flow.is_playing());

        // Some other tone ending changes nothing.
        flow.tone_ended(ToneId(3));
        assert_eq!(flow.step, CalibrationStep::Playing);

        flow.tone_ended(ToneId(7));
        assert_eq!(flow.step, CalibrationStep::Adjust);
        assert!(!flow.is_playing());

        flow.confirm();
        assert_eq!(flow.step, CalibrationStep::Complete);
        flow.recalibrate();
        assert_eq!(flow.step, CalibrationStep::Intro);

        assert_eq!(CalibrationFlow::new(true).step, CalibrationStep::Complete);
    }

    #[test]
    fn replaying_from_adjust_stays_in_adjust() {
        let mut flow = CalibrationFlow::new(false);
        flow.tone_started(ToneId(1));
        flow.tone_ended(ToneId(1));
        flow.confirm();
        flow.tone_started(ToneId(2));
        flow.confirm();
        flow.tone_ended(ToneId(2));
        assert_eq!(flow.step, CalibrationStep::Complete);
    }

    #[test]
    fn slider_defaults_follow_test_type() {
        let standard = TestRun::new(Session::create("HD 600", TestType::Standard));
        assert_eq!(standard.slider_gain(1000, Ear::Left), 50.0);

        let high = TestRun::new(Session::create("HD 600", TestType::HighFrequency));
        assert_eq!(high.slider_gain(7400, Ear::Right), 2.4);
    }

    #[test]
    fn record_uses_slider_for_current_ear() {
        let mut run = TestRun::new(Session::create("HD 600", TestType::Standard));
        run.set_slider_gain(500, 35.0);
        run.record(500);
        assert_eq!(run.session.gain_for(500, Ear::Left), Some(35.0));
        assert!(!run.is_recorded(500, Ear::Right));

        // Re-recording replaces rather than appends.
        run.set_slider_gain(500, 30.0);
        run.record(500);
        assert_eq!(run.session.measurements.len(), 1);
        assert_eq!(run.session.gain_for(500, Ear::Left), Some(30.0));

        run.select_ear(Ear::Right);
        assert_eq!(run.slider_gain(500, Ear::Right), 50.0);
        run.record(500);
        assert_eq!(run.session.gain_for(500, Ear::Right), Some(50.0));
        assert!((run.progress() - 2.0 / 12.0).abs() < 1e-6);
    }

    #[test]
    fn nudging_the_focused_row() {
        let mut run = TestRun::new(Session::create("HD 600", TestType::Standard));
        run.nudge_focused(1.0);
        assert_eq!(run.slider_gain(250, Ear::Left), 50.0);

        run.set_slider_gain(250, 99.5);
        run.nudge_focused(1.0);
        assert_eq!(run.slider_gain(250, Ear::Left), 100.0);
        run.nudge_focused(-0.1);
        assert!((run.slider_gain(250, Ear::Left) - 99.9).abs() < 1e-4);
    }

    #[test]
    fn playing_rows_track_tone_ids() {
        let mut run = TestRun::new(Session::create("HD 600", TestType::Standard));
        run.tone_started(ToneId(1), 1000);
        run.tone_started(ToneId(2), 1000);
        assert!(run.is_playing(1000, Ear::Left));
        assert!(!run.is_playing(1000, Ear::Right));

        run.tone_ended(ToneId(1));
        assert!(run.is_playing(1000, Ear::Left));
        run.tone_ended(ToneId(2));
        assert!(!run.is_playing(1000, Ear::Left));
    }

    #[test]
    fn completes_after_every_row_on_both_ears() {
        let mut run = TestRun::new(Session::create("HD 600", TestType::Standard));
        for ear in BOTH_EARS {
            run.select_ear(ear);
            for &frequency in &STANDARD_FREQUENCIES {
                assert!(!run.is_complete());
                run.record(frequency);
            }
            assert!(run.is_ear_complete(ear));
        }
        assert!(run.is_complete());
        assert_eq!(run.progress(), 1.0);
    }

    #[test]
    fn history_sorts_newest_first_and_prunes_selection() {
        let mut older = Session::create("HD 600", TestType::Standard);
        older.timestamp = older.timestamp - ChronoDuration::days(3);
        let newer = Session::create("HD 600", TestType::Standard);

        let mut view = HistoryView::default();
        view.selection.toggle(&older.id);
        view.selection.toggle("session-0-deleted");
        view.load(vec![older.clone(), newer.clone()]);

        assert_eq!(view.sessions[0].id, newer.id);
        assert_eq!(view.selection.ids(), [older.id.clone()]);
        assert_eq!(view.selected_sessions().count(), 1);

        view.toggle_ear(Ear::Left);
        assert!(!view.ears.left && view.ears.right);
    }
}

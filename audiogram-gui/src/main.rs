//! # Audiogram - Hearing Threshold Test GUI
//!
//! This module contains the main GUI application. The user picks a test,
//! names their headphones, calibrates their volume against a reference tone
//! and then finds the quietest audible gain for each frequency and ear.
//! Finished sessions are saved and can be charted and compared later.
//!
//! ## Architecture
//! - **Main Thread**: Iced GUI application with dark theme
//! - **Tone Threads**: One short-lived thread per tone, owned by `TonePlayer`
//! - **Communication**: Tone lifecycle events arrive on a crossbeam channel
//!   and are drained on every tick
//! - **Persistence**: A JSON key-value file in the data directory

mod config;
mod state;
mod ui;
mod widgets;

use chrono::Local;
use clap::Parser;
use crossbeam_channel::Receiver;
use iced::keyboard::{self, key::Named};
use iced::{Element, Subscription, Task, Theme};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use audiogram_core::audio::{self, CpalOutput};
use audiogram_core::calibration::{self, CalibrationState};
use audiogram_core::export::{self, ExportFormat};
use audiogram_core::selection::SessionSelection;
use audiogram_core::storage::{HistoryStore, JsonFileStore};
use audiogram_core::{Ear, Session, TestType, ToneEvent, TonePlayer};
use config::{Args, DEFAULT_LOG_FILTER};
use state::{CalibrationFlow, HistoryView, Screen, TestRun};
use ui::create_main_view;

/// How often tone events are polled.
const TICK_INTERVAL: Duration = Duration::from_millis(50);
/// Arrow key step for the focused slider.
const COARSE_STEP: f32 = 1.0;
/// Arrow key step with Shift held.
const FINE_STEP: f32 = 0.1;

/// Main entry point for the audiogram application.
pub fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args);

    info!("[MAIN] Starting audiogram, data directory {}", args.data_dir.display());
    let result = iced::application("Audiogram", AudiogramApp::update, AudiogramApp::view)
        .subscription(AudiogramApp::subscription)
        .theme(AudiogramApp::theme)
        .run_with(move || (AudiogramApp::new(args), Task::none()));
    info!("[MAIN] Application finished with result: {:?}", result);
    result.map_err(|e| anyhow::anyhow!("GUI error: {}", e))
}

fn init_tracing(args: &Args) {
    let filter = match &args.log {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Application message types for the Iced GUI framework.
#[derive(Debug, Clone)]
pub enum Message {
    // Navigation
    StartTest(TestType),
    OpenHistory,
    GoHome,

    // Headphone screen
    HeadphoneInputChanged(String),
    ConfirmHeadphone,

    // Calibration
    PlayReferenceTone,
    ConfirmCalibration,
    SkipCalibration,
    Recalibrate,
    BeginTest,
    CheckDrift,
    DismissDriftWarning,

    // Test screen
    SelectEar(Ear),
    PlayTone(u32),
    GainChanged(u32, f32),
    NudgeGain(f32),
    RecordResponse(u32),
    FinishTest,

    // History screen
    ToggleSession(String),
    ToggleEar(Ear),
    Export(ExportFormat),

    // Continuous update message
    Tick,
}

/// UI-specific data needed for rendering the interface.
#[derive(Debug, Clone)]
pub struct AppDisplayData {
    pub screen: Screen,
    /// Test picked on the home screen
    pub test_type: TestType,
    pub headphone_input: String,
    /// Label confirmed in an earlier session, if any
    pub saved_headphone: Option<String>,
    pub calibration_flow: CalibrationFlow,
    pub drift_warning: bool,
    pub test_run: Option<TestRun>,
    pub history: HistoryView,
    /// One-line feedback such as export results or tone failures
    pub status: Option<String>,
}

/// Main application state.
struct AudiogramApp {
    args: Args,
    player: TonePlayer<CpalOutput>,
    tone_events: Receiver<ToneEvent>,
    history: HistoryStore<JsonFileStore>,
    calibration: CalibrationState,

    // Single source of truth for all display data
    display_data: AppDisplayData,
}

impl AudiogramApp {
    fn new(args: Args) -> Self {
        info!("[MAIN] Creating AudiogramApp...");
        let (tone_tx, tone_rx) = crossbeam_channel::unbounded();
        let player = TonePlayer::new(CpalOutput::new()).with_events(tone_tx);

        let history = HistoryStore::new(JsonFileStore::new(args.store_path()));
        let calibration = CalibrationState::load(history.store());
        let saved_headphone = history.headphone_label();
        let mut history_view = HistoryView::default();
        history_view.load(history.all_sessions());
        info!(
            "[MAIN] Loaded {} saved sessions (calibrated: {})",
            history_view.sessions.len(),
            calibration.is_calibrated()
        );

        Self {
            args,
            player,
            tone_events: tone_rx,
            history,
            calibration,
            display_data: AppDisplayData {
                screen: Screen::Home,
                test_type: TestType::Standard,
                headphone_input: saved_headphone.clone().unwrap_or_default(),
                saved_headphone,
                calibration_flow: CalibrationFlow::new(calibration.is_calibrated()),
                drift_warning: false,
                test_run: None,
                history: history_view,
                status: None,
            },
        }
    }

    /// Handles application state updates based on incoming messages.
    fn update(&mut self, message: Message) {
        if !matches!(message, Message::Tick) {
            debug!("[UPDATE] Received message: {:?}", message);
        }

        match message {
            Message::StartTest(test_type) => {
                info!("[MAIN] Starting {:?} test", test_type);
                let data = &mut self.display_data;
                data.test_type = test_type;
                data.test_run = None;
                data.headphone_input = data.saved_headphone.clone().unwrap_or_default();
                self.navigate(Screen::Headphone);
            }
            Message::OpenHistory => {
                self.reload_history();
                self.navigate(Screen::History);
            }
            Message::GoHome => {
                if self.display_data.test_run.take().is_some() {
                    info!("[MAIN] Test abandoned");
                }
                self.navigate(Screen::Home);
            }
            Message::HeadphoneInputChanged(input) => {
                self.display_data.headphone_input = input;
            }
            Message::ConfirmHeadphone => {
                let label = self.display_data.headphone_input.trim().to_string();
                if label.is_empty() {
                    return;
                }
                if let Some(saved) = &self.display_data.saved_headphone {
                    if saved != &label {
                        warn!("[MAIN] Headphones changed from {:?} to {:?}", saved, label);
                    }
                }
                self.history.set_headphone_label(&label);
                self.display_data.headphone_input = label.clone();
                self.display_data.saved_headphone = Some(label);
                self.display_data.calibration_flow =
                    CalibrationFlow::new(self.calibration.is_calibrated());
                self.navigate(Screen::Calibration);
            }
            Message::PlayReferenceTone => {
                let id = self.player.play(calibration::reference_tone());
                self.display_data.calibration_flow.tone_started(id);
            }
            Message::ConfirmCalibration => {
                self.calibration.calibrate(audio::output_volume_hint());
                self.calibration.save(self.history.store());
                self.display_data.drift_warning = false;
                self.display_data.calibration_flow.confirm();
            }
            Message::SkipCalibration => {
                info!("[MAIN] Calibration skipped");
                self.begin_test();
            }
            Message::Recalibrate => {
                self.calibration.reset();
                self.calibration.save(self.history.store());
                self.display_data.drift_warning = false;
                self.display_data.calibration_flow.recalibrate();
                self.navigate(Screen::Calibration);
            }
            Message::BeginTest => self.begin_test(),
            Message::CheckDrift => {
                let current = audio::output_volume_hint();
                if self.calibration.is_calibrated() && self.calibration.has_drifted(current) {
                    warn!(
                        "[CALIBRATION] Volume drifted from {:?} to {:?}",
                        self.calibration.reference_volume, current
                    );
                    self.display_data.drift_warning = true;
                }
            }
            Message::DismissDriftWarning => {
                self.display_data.drift_warning = false;
            }
            Message::SelectEar(ear) => {
                if let Some(run) = &mut self.display_data.test_run {
                    run.select_ear(ear);
                }
            }
            Message::PlayTone(frequency) => {
                let duration = self.args.tone_duration();
                if let Some(run) = &mut self.display_data.test_run {
                    let id = self.player.play(run.tone_request(frequency, duration));
                    run.tone_started(id, frequency);
                }
            }
            Message::GainChanged(frequency, gain) => {
                if let Some(run) = &mut self.display_data.test_run {
                    run.set_slider_gain(frequency, gain);
                }
            }
            Message::NudgeGain(delta) => {
                if let Some(run) = &mut self.display_data.test_run {
                    run.nudge_focused(delta);
                }
            }
            Message::RecordResponse(frequency) => {
                if let Some(run) = &mut self.display_data.test_run {
                    run.record(frequency);
                    debug!(
                        "[MAIN] Recorded {} Hz {} ({:.0}% complete)",
                        frequency,
                        run.ear,
                        run.progress() * 100.0
                    );
                }
            }
            Message::FinishTest => self.finish_test(),
            Message::ToggleSession(id) => {
                self.display_data.history.selection.toggle(&id);
            }
            Message::ToggleEar(ear) => {
                self.display_data.history.toggle_ear(ear);
            }
            Message::Export(format) => self.export(format),
            Message::Tick => {
                // Collect first so the receiver borrow ends before handling
                let events: Vec<ToneEvent> = self.tone_events.try_iter().collect();
                for event in events {
                    self.process_tone_event(event);
                }
            }
        }
    }

    fn navigate(&mut self, screen: Screen) {
        info!("[MAIN] Screen {:?} -> {:?}", self.display_data.screen, screen);
        self.display_data.screen = screen;
        self.display_data.status = None;
    }

    fn reload_history(&mut self) {
        self.display_data.history.load(self.history.all_sessions());
    }

    /// Starts a new run, or resumes the current one after a recalibration.
    fn begin_test(&mut self) {
        let data = &mut self.display_data;
        let label = data.saved_headphone.clone().unwrap_or_default();
        if label.is_empty() {
            self.navigate(Screen::Headphone);
            return;
        }
        if data.test_run.is_none() {
            let session = Session::create(label, data.test_type);
            info!("[MAIN] Created session {}", session.id);
            data.test_run = Some(TestRun::new(session));
        }
        self.navigate(Screen::Test);
    }

    fn finish_test(&mut self) {
        let Some(run) = self.display_data.test_run.take() else {
            return;
        };
        if !run.is_complete() {
            // The button is disabled until then; keep the run.
            self.display_data.test_run = Some(run);
            return;
        }
        info!(
            "[MAIN] Finished session {} with {} measurements",
            run.session.id,
            run.session.measurements.len()
        );
        self.history.append_session(&run.session);
        self.reload_history();
        self.display_data.history.selection = SessionSelection::single(run.session.id);
        self.navigate(Screen::History);
    }

    fn export(&mut self, format: ExportFormat) {
        let sessions = self.history.all_sessions();
        let today = Local::now().date_naive();
        let status = match export::write_export(&self.args.data_dir, format, &sessions, today) {
            Ok(path) => {
                info!("[EXPORT] Wrote {} sessions to {}", sessions.len(), path.display());
                format!("Exported {} sessions to {}", sessions.len(), path.display())
            }
            Err(e) => {
                error!("[EXPORT] Export failed: {}", e);
                format!("Export failed: {}", e)
            }
        };
        self.display_data.status = Some(status);
    }

    fn process_tone_event(&mut self, event: ToneEvent) {
        let data = &mut self.display_data;
        match event {
            ToneEvent::Started { id, frequency, ear } => {
                debug!("[MAIN] Tone {:?} started: {} Hz {}", id, frequency, ear);
            }
            ToneEvent::Finished { id } => {
                data.calibration_flow.tone_ended(id);
                if let Some(run) = &mut data.test_run {
                    run.tone_ended(id);
                }
            }
            ToneEvent::Failed { id, reason } => {
                data.calibration_flow.tone_ended(id);
                if let Some(run) = &mut data.test_run {
                    run.tone_ended(id);
                }
                data.status = Some(format!("Could not play tone: {}", reason));
            }
        }
    }

    fn view(&self) -> Element<'_, Message> {
        create_main_view(&self.display_data)
    }

    /// Tick for tone events, the periodic drift check, and arrow keys while
    /// a test is running.
    fn subscription(&self) -> Subscription<Message> {
        let mut subscriptions = vec![
            iced::time::every(TICK_INTERVAL).map(|_| Message::Tick),
            iced::time::every(calibration::DRIFT_CHECK_INTERVAL).map(|_| Message::CheckDrift),
        ];
        if self.display_data.screen == Screen::Test {
            subscriptions.push(keyboard::on_key_press(slider_key));
        }
        Subscription::batch(subscriptions)
    }

    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

/// Arrow keys nudge the focused slider; Shift makes the step finer.
fn slider_key(key: keyboard::Key, modifiers: keyboard::Modifiers) -> Option<Message> {
    let step = if modifiers.shift() { FINE_STEP } else { COARSE_STEP };
    match key {
        keyboard::Key::Named(Named::ArrowUp | Named::ArrowRight) => Some(Message::NudgeGain(step)),
        keyboard::Key::Named(Named::ArrowDown | Named::ArrowLeft) => {
            Some(Message::NudgeGain(-step))
        }
        _ => None,
    }
}

use iced::widget::{Space, column, row, text};
use iced::Element;

use audiogram_core::calibration;
use audiogram_core::level;

use super::{ACCENT, SUCCESS, colored_button, panel, plain_button};
use crate::state::CalibrationStep;
use crate::{AppDisplayData, Message};

pub fn view(data: &AppDisplayData) -> Element<'_, Message> {
    let tone = calibration::reference_tone();
    let tone_text = format!(
        "Reference tone: {} in the {} ear, {:.0} seconds.",
        level::format_frequency(tone.frequency as u32),
        tone.ear.as_str(),
        tone.duration.as_secs_f32()
    );
    let flow = &data.calibration_flow;

    let (instructions, actions): (&str, Element<'_, Message>) = match flow.step {
        CalibrationStep::Intro => (
            "Set your computer volume to a comfortable level, then play the reference tone.",
            row![
                colored_button("Play Reference Tone", ACCENT, Some(Message::PlayReferenceTone)),
                Space::with_width(10),
                plain_button("Skip Calibration", Some(Message::SkipCalibration)),
            ]
            .into(),
        ),
        CalibrationStep::Playing => (
            "Listen to the reference tone...",
            row![plain_button("Skip Calibration", Some(Message::SkipCalibration))].into(),
        ),
        CalibrationStep::Adjust => (
            "Adjust your volume until the tone is soft but clearly audible. \
             Keep the volume unchanged for the rest of the test.",
            row![
                plain_button(
                    if flow.is_playing() { "Playing..." } else { "Play Again" },
                    (!flow.is_playing()).then_some(Message::PlayReferenceTone),
                ),
                Space::with_width(10),
                colored_button("Volume Is Set", SUCCESS, Some(Message::ConfirmCalibration)),
                Space::with_width(10),
                plain_button("Skip Calibration", Some(Message::SkipCalibration)),
            ]
            .into(),
        ),
        CalibrationStep::Complete => (
            "Calibration complete. Leave your volume where it is.",
            row![
                colored_button("Start Test", ACCENT, Some(Message::BeginTest)),
                Space::with_width(10),
                plain_button("Recalibrate", Some(Message::Recalibrate)),
            ]
            .into(),
        ),
    };

    column![
        text(data.test_type.title()).size(22),
        Space::with_height(10),
        panel(
            "Volume Calibration",
            column![
                text(instructions).size(16),
                text(tone_text).size(12),
                Space::with_height(10),
                actions,
            ]
            .spacing(5)
            .into(),
        ),
    ]
    .into()
}

//! # Test Screen
//!
//! One row per frequency for the selected ear: play the tone, move the gain
//! slider down until the tone is barely audible and record the answer. A
//! live audiogram of the session sits under the rows.

use iced::widget::{Space, column, container, horizontal_space, progress_bar, row, slider, text};
use iced::{Alignment, Element, Length};

use audiogram_core::chart::{self, EarFilter};
use audiogram_core::level::{self, MAX_GAIN, MIN_GAIN};
use audiogram_core::session::BOTH_EARS;
use audiogram_core::Ear;

use super::{ACCENT, SUCCESS, colored_button, panel, plain_button};
use crate::state::TestRun;
use crate::widgets::audiogram_chart::AudiogramChart;
use crate::{AppDisplayData, Message};

pub fn view(data: &AppDisplayData) -> Element<'_, Message> {
    let Some(run) = &data.test_run else {
        return text("No test in progress.").size(16).into();
    };
    let progress = run.progress();

    let header = row![
        text(run.test_type().title()).size(22),
        horizontal_space(),
        text(format!("Headphones: {}", run.session.headphone_label)).size(14),
    ]
    .align_y(Alignment::Center);

    let ear_tabs = BOTH_EARS.iter().fold(row![].spacing(8), |tabs, &ear| {
        let complete = if run.is_ear_complete(ear) { " \u{2713}" } else { "" };
        let label = format!("{} Ear{}", ear, complete);
        tabs.push(if ear == run.ear {
            colored_button(label, ACCENT, Some(Message::SelectEar(ear)))
        } else {
            plain_button(label, Some(Message::SelectEar(ear)))
        })
    });

    let progress_row = row![
        progress_bar(0.0..=1.0, progress).height(8),
        Space::with_width(10),
        text(format!("{:.0}% complete", progress * 100.0)).size(14),
    ]
    .align_y(Alignment::Center);

    let rows = run
        .frequencies()
        .iter()
        .fold(column![].spacing(6), |col, &frequency| {
            col.push(frequency_row(run, frequency))
        });

    let current = [run.session.id.clone()];
    let audiogram = chart::build_audiogram(
        std::slice::from_ref(&run.session),
        &current,
        run.frequencies(),
        EarFilter::default(),
    );
    let chart_panel = container(AudiogramChart::new(audiogram).view())
        .width(Length::Fill)
        .height(Length::Fixed(300.0));

    let other = run.ear.opposite();
    let finish = run.is_complete().then_some(Message::FinishTest);
    let footer = row![
        plain_button(format!("Switch to {} Ear", other), Some(Message::SelectEar(other))),
        horizontal_space(),
        plain_button("Cancel", Some(Message::GoHome)),
        Space::with_width(10),
        colored_button("Finish Test", SUCCESS, finish),
    ];

    column![
        header,
        ear_tabs,
        progress_row,
        panel(
            "Frequencies",
            column![
                rows,
                text("Arrow keys adjust the last used slider; hold Shift for finer steps.").size(12),
            ]
            .spacing(10)
            .into(),
        ),
        panel("Audiogram", chart_panel.into()),
        footer,
    ]
    .spacing(10)
    .into()
}

/// Label, level readout, play button, gain slider and answer button.
fn frequency_row(run: &TestRun, frequency: u32) -> Element<'static, Message> {
    let ear: Ear = run.ear;
    let gain = run.slider_gain(frequency, ear);
    let playing = run.is_playing(frequency, ear);
    let recorded = run.is_recorded(frequency, ear);

    let play = plain_button(
        if playing { "Playing..." } else { "Play Tone" },
        (!playing).then_some(Message::PlayTone(frequency)),
    );
    let answer = if recorded {
        plain_button("Update Response", Some(Message::RecordResponse(frequency)))
    } else {
        colored_button("I Heard It", ACCENT, Some(Message::RecordResponse(frequency)))
    };

    row![
        text(level::format_frequency(frequency)).size(16).width(Length::Fixed(70.0)),
        text(level::format_level(level::gain_to_level(gain)))
            .size(14)
            .width(Length::Fixed(80.0)),
        play,
        slider(MIN_GAIN..=MAX_GAIN, gain, move |g| Message::GainChanged(frequency, g))
            .step(0.1_f32)
            .width(Length::Fill),
        answer,
        text(if recorded { "\u{2713}" } else { "" }).size(16).width(Length::Fixed(20.0)),
    ]
    .spacing(10)
    .align_y(Alignment::Center)
    .into()
}

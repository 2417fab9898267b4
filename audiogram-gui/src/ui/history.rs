//! # History Screen
//!
//! Lists saved sessions newest first. Up to two can be selected; they are
//! drawn on one audiogram and, when two are picked, compared row by row.

use chrono::Local;
use iced::widget::{Space, button, checkbox, column, container, horizontal_space, row, text};
use iced::{Alignment, Background, Border, Color, Element, Length};

use audiogram_core::chart;
use audiogram_core::compare::Comparison;
use audiogram_core::export::ExportFormat;
use audiogram_core::level;
use audiogram_core::{Ear, Session, TestType};

use super::{ACCENT, colored_button, panel, plain_button, warning_banner};
use crate::state::HistoryView;
use crate::widgets::audiogram_chart::AudiogramChart;
use crate::{AppDisplayData, Message};

pub fn view(data: &AppDisplayData) -> Element<'_, Message> {
    let history = &data.history;
    if history.sessions.is_empty() {
        return column![
            text("No saved sessions yet.").size(16),
            Space::with_height(10),
            colored_button(
                "Take a Hearing Test",
                ACCENT,
                Some(Message::StartTest(TestType::Standard)),
            ),
        ]
        .into();
    }

    let exports = row![
        text(format!("{} saved sessions", history.sessions.len())).size(16),
        horizontal_space(),
        plain_button("Export JSON", Some(Message::Export(ExportFormat::Json))),
        Space::with_width(8),
        plain_button("Export CSV", Some(Message::Export(ExportFormat::Csv))),
    ]
    .align_y(Alignment::Center);

    let list = history
        .sessions
        .iter()
        .fold(column![].spacing(6), |col, session| {
            col.push(session_entry(history, session))
        });

    let mut content = column![
        exports,
        panel(
            "Sessions",
            column![
                text("Select up to two sessions; a third replaces the oldest pick.").size(12),
                list,
            ]
            .spacing(8)
            .into(),
        ),
        panel("Audiogram", audiogram_panel(history)),
    ]
    .spacing(10);

    if let Some(comparison) = history.selection.comparison(&history.sessions) {
        content = content.push(panel("Comparison", comparison_table(comparison)));
    }

    content.into()
}

/// Selectable row describing one saved session.
fn session_entry<'a>(history: &HistoryView, session: &'a Session) -> Element<'a, Message> {
    let position = history.selection.position(&session.id);
    let marker = position.map(|p| format!("#{}", p)).unwrap_or_default();
    let when = session.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M");

    let entry = row![
        text(marker).size(14).width(Length::Fixed(30.0)),
        text(when.to_string()).size(14).width(Length::Fixed(140.0)),
        text(session.test_type.title()).size(14).width(Length::Fixed(160.0)),
        text(session.headphone_label.as_str()).size(14).width(Length::Fill),
        text(format!("{} measurements", session.measurements.len())).size(12),
    ]
    .spacing(10)
    .align_y(Alignment::Center);

    let highlight = position.map(|_| palette_color(chart::session_color(
        &session.id,
        history.selection.ids(),
    )));
    button(entry)
        .width(Length::Fill)
        .padding([6, 10])
        .style(move |theme: &iced::Theme, _status| {
            let palette = theme.extended_palette();
            button::Style {
                background: Some(Background::Color(palette.background.strong.color)),
                text_color: palette.background.strong.text,
                border: Border {
                    color: highlight.unwrap_or(Color::TRANSPARENT),
                    width: if highlight.is_some() { 2.0 } else { 0.0 },
                    radius: 4.0.into(),
                },
                ..button::Style::default()
            }
        })
        .on_press(Message::ToggleSession(session.id.clone()))
        .into()
}

/// Ear toggles and the chart of the selected sessions.
fn audiogram_panel(history: &HistoryView) -> Element<'_, Message> {
    let ears = row![
        checkbox("Left ear", history.ears.left).on_toggle(|_| Message::ToggleEar(Ear::Left)),
        Space::with_width(15),
        checkbox("Right ear (dashed)", history.ears.right)
            .on_toggle(|_| Message::ToggleEar(Ear::Right)),
    ];

    let frequencies = chart::chart_frequencies(history.selected_sessions());
    let audiogram = chart::build_audiogram(
        &history.sessions,
        history.selection.ids(),
        &frequencies,
        history.ears,
    );

    column![
        ears,
        container(AudiogramChart::new(audiogram).view())
            .width(Length::Fill)
            .height(Length::Fixed(320.0)),
    ]
    .spacing(10)
    .into()
}

/// Per-frequency gains of the two selected sessions and their change.
fn comparison_table(comparison: Comparison) -> Element<'static, Message> {
    let mut table = column![].spacing(4);
    if !comparison.is_reliable() {
        table = table.push(warning_banner(
            "These sessions used different headphones. The comparison may be unreliable.",
            Space::with_width(0).into(),
        ));
    }

    if comparison.rows.is_empty() {
        return table
            .push(text("The sessions have no measurements in common.").size(14))
            .into();
    }

    table = table.push(comparison_line(["Frequency", "Ear", "#1 gain", "#2 gain", "Change"], 14));
    for entry in &comparison.rows {
        table = table.push(comparison_line(
            [
                level::format_frequency(entry.frequency).as_str(),
                entry.ear.as_str(),
                format!("{:.1}", entry.gain_a).as_str(),
                format!("{:.1}", entry.gain_b).as_str(),
                format!("{:+.1}", entry.delta).as_str(),
            ],
            13,
        ));
    }
    table.into()
}

fn comparison_line(cells: [&str; 5], size: u16) -> Element<'static, Message> {
    cells
        .iter()
        .fold(row![].spacing(10), |line, cell| {
            line.push(text(cell.to_string()).size(size).width(Length::Fixed(100.0)))
        })
        .into()
}

fn palette_color([r, g, b]: [u8; 3]) -> Color {
    Color::from_rgb8(r, g, b)
}

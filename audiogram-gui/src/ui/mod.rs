//! # UI Module
//!
//! Screen layouts for the audiogram application plus the small set of
//! styled building blocks they share.

mod calibration;
mod headphone;
mod history;
mod home;
mod test_screen;

use iced::widget::{Space, button, column, container, horizontal_space, row, scrollable, text};
use iced::{Alignment, Background, Border, Color, Element, Length};

use crate::state::Screen;
use crate::{AppDisplayData, Message};

pub const ACCENT: Color = Color::from_rgb(0.21, 0.47, 0.86);
pub const SUCCESS: Color = Color::from_rgb(0.2, 0.65, 0.35);
pub const WARNING: Color = Color::from_rgb(0.85, 0.6, 0.1);
const WARNING_BACKGROUND: Color = Color::from_rgb(0.3, 0.22, 0.05);
const DISABLED: Color = Color::from_rgb(0.3, 0.3, 0.3);
const DISABLED_TEXT: Color = Color::from_rgb(0.6, 0.6, 0.6);

/// Creates the complete main application view
pub fn create_main_view(data: &AppDisplayData) -> Element<'_, Message> {
    let body = match data.screen {
        Screen::Home => home::view(data),
        Screen::Headphone => headphone::view(data),
        Screen::Calibration => calibration::view(data),
        Screen::Test => test_screen::view(data),
        Screen::History => history::view(data),
    };

    let mut layout = column![create_header(data.screen)].spacing(10);
    if data.drift_warning {
        layout = layout.push(warning_banner(
            "Your volume appears to have changed since calibration. Results may not be comparable.",
            row![
                plain_button("Recalibrate", Some(Message::Recalibrate)),
                plain_button("Dismiss", Some(Message::DismissDriftWarning)),
            ]
            .spacing(8)
            .into(),
        ));
    }
    if let Some(status) = &data.status {
        layout = layout.push(text(status.as_str()).size(14));
    }
    layout = layout.push(scrollable(body).height(Length::Fill));

    container(layout.padding(20))
        .width(Length::Fill)
        .height(Length::Fill)
        .into()
}

/// Title bar with navigation back to the main screens.
fn create_header(screen: Screen) -> Element<'static, Message> {
    let home = (screen != Screen::Home).then_some(Message::GoHome);
    let history = (screen != Screen::History && screen != Screen::Test)
        .then_some(Message::OpenHistory);

    row![
        text("Audiogram").size(28),
        horizontal_space(),
        plain_button("Home", home),
        Space::with_width(8),
        plain_button("History", history),
    ]
    .align_y(Alignment::Center)
    .into()
}

/// Titled panel around some content.
pub fn panel<'a>(title: &'a str, content: Element<'a, Message>) -> Element<'a, Message> {
    container(
        column![text(title).size(18), Space::with_height(10), content]
            .spacing(5)
            .padding(15),
    )
    .width(Length::Fill)
    .style(|theme: &iced::Theme| container::Style {
        background: Some(Background::Color(
            theme.extended_palette().background.weak.color,
        )),
        border: Border {
            radius: 6.0.into(),
            ..Border::default()
        },
        ..container::Style::default()
    })
    .into()
}

/// Amber banner with a message and optional actions.
pub fn warning_banner<'a>(
    message: &'a str,
    actions: Element<'a, Message>,
) -> Element<'a, Message> {
    container(
        row![text(message).size(14).width(Length::Fill), actions]
            .spacing(10)
            .align_y(Alignment::Center),
    )
    .padding([8, 12])
    .width(Length::Fill)
    .style(|_theme| container::Style {
        background: Some(Background::Color(WARNING_BACKGROUND)),
        text_color: Some(WARNING),
        border: Border {
            color: WARNING,
            width: 1.0,
            radius: 4.0.into(),
        },
        ..container::Style::default()
    })
    .into()
}

/// Default-styled button; greyed out when there is no message.
pub fn plain_button<'a>(label: impl ToString, message: Option<Message>) -> Element<'a, Message> {
    let enabled = message.is_some();
    let mut button = button(text(label.to_string()).size(14)).padding([6, 10]);
    if !enabled {
        button = button.style(|_theme, _status| button::Style {
            background: Some(Background::Color(DISABLED)),
            text_color: DISABLED_TEXT,
            ..button::Style::default()
        });
    }
    button.on_press_maybe(message).into()
}

/// Solid colored button; greyed out when there is no message.
pub fn colored_button<'a>(
    label: impl ToString,
    color: Color,
    message: Option<Message>,
) -> Element<'a, Message> {
    let background = if message.is_some() { color } else { DISABLED };
    button(text(label.to_string()).size(16))
        .padding([10, 18])
        .style(move |_theme, _status| button::Style {
            background: Some(Background::Color(background)),
            text_color: Color::WHITE,
            border: Border {
                radius: 4.0.into(),
                ..Border::default()
            },
            ..button::Style::default()
        })
        .on_press_maybe(message)
        .into()
}

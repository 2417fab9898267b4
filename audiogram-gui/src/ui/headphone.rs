//! Headphone entry. The label is stored with every session so results from
//! different headphones can be told apart.

use iced::widget::{Space, column, row, text, text_input};
use iced::{Element, Length};

use super::{ACCENT, colored_button, plain_button, warning_banner};
use crate::{AppDisplayData, Message};

pub fn view(data: &AppDisplayData) -> Element<'_, Message> {
    let input = data.headphone_input.trim();

    let field = text_input("e.g. Sennheiser HD 600", &data.headphone_input)
        .on_input(Message::HeadphoneInputChanged)
        .on_submit(Message::ConfirmHeadphone)
        .padding(8)
        .size(16)
        .width(Length::Fixed(400.0));

    let mut content = column![
        text(data.test_type.title()).size(22),
        Space::with_height(10),
        text("Which headphones are you using?").size(16),
        text("Use the same headphones every time so your results stay comparable.").size(12),
        Space::with_height(10),
        field,
    ]
    .spacing(5);

    if let Some(saved) = &data.saved_headphone {
        if !input.is_empty() && input != saved.as_str() {
            content = content.push(warning_banner(
                "These are different headphones than last time. Comparisons with earlier sessions may be unreliable.",
                text(format!("Previously: {}", saved)).size(14).into(),
            ));
        }
    }

    let next = (!input.is_empty()).then_some(Message::ConfirmHeadphone);
    content
        .push(Space::with_height(10))
        .push(row![
            plain_button("Back", Some(Message::GoHome)),
            Space::with_width(10),
            colored_button("Continue", ACCENT, next),
        ])
        .into()
}

use iced::widget::{Space, column, row, text};
use iced::{Element, Length};

use audiogram_core::TestType;

use super::{ACCENT, SUCCESS, colored_button, panel, plain_button};
use crate::{AppDisplayData, Message};

const STEPS: [&str; 4] = [
    "1. Sit somewhere quiet and put on your headphones.",
    "2. Set your volume against the 1 kHz reference tone.",
    "3. For each frequency, lower the slider until the tone is barely audible, then press \"I Heard It\".",
    "4. Test both ears, then save the session to track changes over time.",
];

pub fn view(data: &AppDisplayData) -> Element<'_, Message> {
    let session_count = data.history.sessions.len();

    let tests = row![
        colored_button(
            TestType::Standard.title(),
            ACCENT,
            Some(Message::StartTest(TestType::Standard)),
        ),
        Space::with_width(10),
        colored_button(
            TestType::HighFrequency.title(),
            SUCCESS,
            Some(Message::StartTest(TestType::HighFrequency)),
        ),
        Space::with_width(10),
        plain_button(
            format!("View History ({})", session_count),
            Some(Message::OpenHistory),
        ),
    ];

    let instructions = STEPS
        .iter()
        .fold(column![].spacing(6), |col, step| col.push(text(*step).size(14)));

    column![
        text("Check how quiet a tone you can hear, frequency by frequency.").size(16),
        Space::with_height(10),
        tests,
        Space::with_height(20),
        panel("How it works", instructions.into()),
        Space::with_height(10),
        text(
            "This is not a medical device and does not replace a hearing test by a professional. \
             Results depend on your headphones and volume settings."
        )
        .size(12)
        .width(Length::Fill),
    ]
    .spacing(5)
    .into()
}

//! # Home Screen
//!
//! Settings and mode selection: string toggles, accidentals, answer time,
//! the two start buttons and the all-time best streak.

use iced::widget::{Space, button, column, container, row, slider, text, toggler};
use iced::{Alignment, Color, Element, Length};

use fretly_core::SessionSnapshot;
use fretly_core::StringIndex;
use fretly_core::settings::{TIMER_MAX_SECS, TIMER_MIN_SECS};

use crate::Message;

const SELECTED: Color = Color::from_rgb(0.20, 0.72, 0.47);
const UNSELECTED: Color = Color::from_rgb(0.30, 0.30, 0.30);
const ERROR: Color = Color::from_rgb(1.0, 0.35, 0.35);

pub fn view(data: &SessionSnapshot) -> Element<'static, Message> {
    let title = text("Fretly").size(36);
    let subtitle = text("Learn the fretboard by ear and by eye").size(16);

    let settings = column![
        text("Strings").size(18),
        string_toggles(data),
        Space::with_height(10),
        toggler(data.settings.include_accidentals())
            .label("Include sharps (#)")
            .on_toggle(Message::SetAccidentals),
        Space::with_height(10),
        text(format!(
            "Answer time: {:.0} s",
            data.settings.timer_duration_secs()
        ))
        .size(16),
        slider(
            TIMER_MIN_SECS..=TIMER_MAX_SECS,
            data.settings.timer_duration_secs(),
            Message::SetTimerDuration,
        )
        .step(1.0),
        button(text("Reset settings").size(14))
            .padding([4, 10])
            .on_press(Message::ResetSettings),
    ]
    .spacing(8);

    let start = column![
        start_button("Start Listening Challenge", Message::StartListening),
        start_button("Start Image Training", Message::StartImage),
    ]
    .spacing(10);

    let content = column![
        title,
        subtitle,
        Space::with_height(20),
        settings,
        Space::with_height(20),
        start,
        Space::with_height(10),
        microphone_status(data),
        text(format!("Best Streak: {}", data.best_streak_ever)).size(20),
    ]
    .spacing(8)
    .max_width(480)
    .align_x(Alignment::Center);

    container(content)
        .padding(20)
        .width(Length::Fill)
        .height(Length::Fill)
        .center_x(Length::Fill)
        .into()
}

/// One button per string, 6 (low E) on the left.
fn string_toggles(data: &SessionSnapshot) -> Element<'static, Message> {
    StringIndex::ALL
        .into_iter()
        .rev()
        .fold(row![].spacing(6), |row, string| {
            let color = if data.settings.is_selected(string) {
                SELECTED
            } else {
                UNSELECTED
            };
            let label = column![
                text(string.to_string()).size(18),
                text(string.open_note().to_string()).size(12),
            ]
            .align_x(Alignment::Center);
            row.push(
                button(label)
                    .width(Length::Fixed(56.0))
                    .padding([6, 10])
                    .style(move |_theme, _status| button::Style {
                        background: Some(iced::Background::Color(color)),
                        text_color: Color::WHITE,
                        ..button::Style::default()
                    })
                    .on_press(Message::ToggleString(string)),
            )
        })
        .into()
}

fn start_button(label: &'static str, message: Message) -> Element<'static, Message> {
    button(text(label).size(18))
        .padding([12, 20])
        .width(Length::Fill)
        .on_press(message)
        .into()
}

fn microphone_status(data: &SessionSnapshot) -> Element<'static, Message> {
    match (&data.audio_error, data.audio_ready) {
        (Some(error), _) => text(format!("Microphone: {}", error))
            .size(14)
            .color(ERROR)
            .into(),
        (None, true) => text("Microphone ready").size(14).into(),
        (None, false) => text("Waiting for microphone...").size(14).into(),
    }
}

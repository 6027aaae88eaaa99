//! # Game Screen
//!
//! Question, countdown bar, streak, feedback and the fretboard reveal for a
//! running session, plus the summary once it has finished.

use iced::widget::{Space, button, column, container, horizontal_space, progress_bar, row, text};
use iced::{Alignment, Color, Element, Length};

use fretly_core::{GameMode, GameStatus, SessionSnapshot};

use super::fretboard::Fretboard;
use super::pitch_meter::PitchMeter;
use crate::Message;

const CORRECT: Color = Color::from_rgb(0.20, 0.86, 0.60);
const INCORRECT: Color = Color::from_rgb(1.0, 0.35, 0.35);
const MUTED: Color = Color::from_rgb(0.6, 0.6, 0.6);

pub fn view(data: &SessionSnapshot) -> Element<'static, Message> {
    if data.status == GameStatus::Finished {
        return summary(data);
    }

    let listening = data.mode == Some(GameMode::Listening);

    let mut content = column![
        top_bar(data, listening),
        progress_bar(0.0..=1.0, data.time_fraction()).height(Length::Fixed(8.0)),
        Space::with_height(20),
        prompt(data),
        status_line(data, listening),
    ]
    .spacing(10)
    .align_x(Alignment::Center);

    if listening {
        content = content.push(heard_note(data));
    }

    if listening && data.status == GameStatus::Feedback && data.last_answer_correct == Some(false)
    {
        content = content.push(
            button(text("Next").size(18))
                .padding([10, 30])
                .on_press(Message::Next),
        );
    }

    content = content.push(Space::with_height(20)).push(
        Fretboard::new(
            data.question.map(|q| q.string),
            data.valid_frets.clone(),
            data.last_answer_correct,
        )
        .view(),
    );

    container(content.padding(20))
        .width(Length::Fill)
        .height(Length::Fill)
        .into()
}

fn top_bar(data: &SessionSnapshot, listening: bool) -> Element<'static, Message> {
    let pause = match data.status {
        GameStatus::Paused => button(text("Resume").size(14)).on_press(Message::Resume),
        GameStatus::Playing => button(text("Pause").size(14)).on_press(Message::Pause),
        _ => button(text("Pause").size(14)),
    };

    let streak: Element<'static, Message> = if listening {
        text(format!("Streak: {}", data.streak)).size(20).into()
    } else {
        text("Image Training").size(20).into()
    };

    row![
        button(text("Stop").size(14)).on_press(Message::Stop),
        Space::with_width(10),
        pause.padding([4, 10]),
        horizontal_space(),
        streak,
    ]
    .align_y(Alignment::Center)
    .into()
}

fn prompt(data: &SessionSnapshot) -> Element<'static, Message> {
    match data.question {
        Some(question) => column![
            text(format!("String {}", question.string)).size(24).color(MUTED),
            text(question.pitch_class.to_string()).size(96),
        ]
        .align_x(Alignment::Center)
        .into(),
        None => text("...").size(96).into(),
    }
}

fn status_line(data: &SessionSnapshot, listening: bool) -> Element<'static, Message> {
    match (data.status, data.last_answer_correct) {
        (GameStatus::Feedback, Some(true)) => text("Correct!").size(28).color(CORRECT).into(),
        (GameStatus::Feedback, _) => {
            let frets = data
                .valid_frets
                .iter()
                .map(|fret| fret.to_string())
                .collect::<Vec<_>>()
                .join(" / ");
            text(format!("Fret {}", frets)).size(28).color(INCORRECT).into()
        }
        (GameStatus::Paused, _) => text("Paused").size(20).color(MUTED).into(),
        _ if listening => text("Listening...").size(20).color(MUTED).into(),
        _ => text("Think...").size(20).color(MUTED).into(),
    }
}

/// Last note the microphone picked up, with its tuning offset.
fn heard_note(data: &SessionSnapshot) -> Element<'static, Message> {
    let target = data.question.map(|q| q.pitch_class);
    let (label, cents, on_target) = match data.last_reading {
        Some(reading) => (
            format!(
                "Heard {} ({:.1} Hz, {:+.0} cents)",
                reading.pitch_class, reading.estimate.frequency_hz, reading.cents
            ),
            Some(reading.cents),
            target == Some(reading.pitch_class),
        ),
        None if !data.audio_ready => ("No microphone".to_string(), None, false),
        None => ("Heard --".to_string(), None, false),
    };

    column![
        text(label).size(14).color(MUTED),
        container(PitchMeter::new(cents, on_target).view()).max_width(320),
    ]
    .spacing(4)
    .align_x(Alignment::Center)
    .into()
}

fn summary(data: &SessionSnapshot) -> Element<'static, Message> {
    let content = column![
        text("Session over").size(36),
        text(format!("Best streak this session: {}", data.best_streak_this_session)).size(20),
        text(format!("Best streak ever: {}", data.best_streak_ever)).size(20),
        Space::with_height(20),
        button(text("Back to Home").size(18))
            .padding([10, 30])
            .on_press(Message::BackHome),
    ]
    .spacing(10)
    .align_x(Alignment::Center);

    container(content)
        .width(Length::Fill)
        .height(Length::Fill)
        .center_x(Length::Fill)
        .center_y(Length::Fill)
        .into()
}

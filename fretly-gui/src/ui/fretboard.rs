//! # Fretboard Widget
//!
//! Draws the first twelve frets of a guitar neck with the asked string
//! highlighted. Once a question is answered the frets that sound the note
//! are marked.

use iced::widget::canvas::{self, Fill, Geometry, Path, Stroke, Text};
use iced::widget::container;
use iced::{Color, Element, Pixels, Point, Rectangle, Renderer, Size, Theme, mouse};

use fretly_core::fretboard::{MAX_FRET, STRING_COUNT};
use fretly_core::{Fret, StringIndex};

/// Frets carrying an inlay dot; 12 gets two.
const INLAYS: [u8; 5] = [3, 5, 7, 9, 12];

const NECK: Color = Color::from_rgb(0.24, 0.17, 0.12);
const FRET_WIRE: Color = Color::from_rgb(0.75, 0.75, 0.75);
const STRING: Color = Color::from_rgb(0.85, 0.80, 0.70);
const HIGHLIGHT: Color = Color::from_rgb(1.0, 0.76, 0.0);
const CORRECT: Color = Color::from_rgb(0.20, 0.86, 0.60);
const INCORRECT: Color = Color::from_rgb(1.0, 0.35, 0.35);

#[derive(Debug, Clone)]
pub struct Fretboard {
    string: Option<StringIndex>,
    revealed: Vec<Fret>,
    correct: Option<bool>,
}

impl Fretboard {
    /// # Arguments
    /// * `string` - String to highlight
    /// * `revealed` - Frets to mark on that string (empty while playing)
    /// * `correct` - Outcome of the answer, colours the marks
    pub fn new(string: Option<StringIndex>, revealed: Vec<Fret>, correct: Option<bool>) -> Self {
        Self {
            string,
            revealed,
            correct,
        }
    }

    pub fn view(self) -> Element<'static, crate::Message> {
        container(
            canvas::Canvas::new(self)
                .width(iced::Length::Fill)
                .height(iced::Length::Fixed(180.0)),
        )
        .into()
    }
}

impl<Message> canvas::Program<Message> for Fretboard {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = canvas::Frame::new(renderer, bounds.size());

        let label_height = 20.0;
        let neck_height = bounds.height - label_height;
        // Slot 0 is the open string, left of the nut.
        let slots = f32::from(MAX_FRET) + 1.0;
        let slot_width = bounds.width / slots;
        let string_gap = neck_height / STRING_COUNT as f32;

        let string_y = |string: StringIndex| (f32::from(string.number()) - 0.5) * string_gap;
        let slot_center = |fret: u8| (f32::from(fret) + 0.5) * slot_width;

        frame.fill_rectangle(
            Point::new(slot_width, 0.0),
            Size::new(bounds.width - slot_width, neck_height),
            Fill::from(NECK),
        );

        // Inlays
        for fret in INLAYS {
            let x = slot_center(fret);
            let heights = if fret == 12 { vec![0.3, 0.7] } else { vec![0.5] };
            for h in heights {
                frame.fill(
                    &Path::circle(Point::new(x, neck_height * h), string_gap * 0.18),
                    Color::from_rgb(0.55, 0.50, 0.45),
                );
            }
        }

        // Nut and fret wires
        for fret in 1..=MAX_FRET + 1 {
            let x = f32::from(fret) * slot_width;
            let width = if fret == 1 { 5.0 } else { 2.0 };
            frame.stroke(
                &Path::line(Point::new(x, 0.0), Point::new(x, neck_height)),
                Stroke::default().with_width(width).with_color(FRET_WIRE),
            );
        }

        // Strings, thicker towards the bass side
        for string in StringIndex::ALL {
            let y = string_y(string);
            let selected = self.string == Some(string);
            let width = 1.0 + f32::from(string.number()) * 0.4;
            frame.stroke(
                &Path::line(Point::new(0.0, y), Point::new(bounds.width, y)),
                Stroke::default()
                    .with_width(if selected { width + 1.5 } else { width })
                    .with_color(if selected { HIGHLIGHT } else { STRING }),
            );
        }

        // Revealed positions
        if let Some(string) = self.string {
            let color = match self.correct {
                Some(false) => INCORRECT,
                _ => CORRECT,
            };
            for fret in &self.revealed {
                frame.fill(
                    &Path::circle(
                        Point::new(slot_center(fret.number()), string_y(string)),
                        string_gap * 0.4,
                    ),
                    color,
                );
            }
        }

        // Fret numbers
        for fret in Fret::all() {
            frame.fill_text(Text {
                content: fret.to_string(),
                position: Point::new(slot_center(fret.number()) - 4.0, neck_height + 3.0),
                color: Color::from_rgb(0.7, 0.7, 0.7),
                size: Pixels(12.0),
                ..Text::default()
            });
        }

        vec![frame.into_geometry()]
    }
}

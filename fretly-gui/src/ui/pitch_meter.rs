//! # Pitch Meter Widget
//!
//! Shows how far the note the microphone hears sits from its equal-tempered
//! pitch. The needle turns green when the heard note is the one asked for.

use iced::widget::canvas::{self, Geometry, Path, Stroke};
use iced::widget::container;
use iced::{Color, Element, Point, Rectangle, Renderer, Size, Theme, mouse};

/// The meter spans -50 to +50 cents, one semitone in total.
const METER_RANGE: f32 = 50.0;

const ON_TARGET: Color = Color::from_rgb(0.20, 0.86, 0.60);
const OFF_TARGET: Color = Color::from_rgb(1.0, 0.76, 0.0);

pub struct PitchMeter {
    /// Cents offset of the last reading, None if nothing is heard.
    cents: Option<f32>,
    on_target: bool,
}

impl PitchMeter {
    pub fn new(cents: Option<f32>, on_target: bool) -> Self {
        Self { cents, on_target }
    }

    pub fn view(self) -> Element<'static, crate::Message> {
        container(
            canvas::Canvas::new(self)
                .width(iced::Length::Fill)
                .height(iced::Length::Fixed(24.0)),
        )
        .into()
    }
}

impl<Message> canvas::Program<Message> for PitchMeter {
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

        frame.fill(
            &Path::rectangle(Point::ORIGIN, bounds.size()),
            Color::from_rgb8(0x40, 0x40, 0x40),
        );

        let center_x = bounds.width / 2.0;
        frame.stroke(
            &Path::line(Point::new(center_x, 0.0), Point::new(center_x, bounds.height)),
            Stroke::default().with_width(2.0).with_color(Color::WHITE),
        );

        if let Some(c) = self.cents {
            let x = (c.clamp(-METER_RANGE, METER_RANGE) + METER_RANGE) / (2.0 * METER_RANGE)
                * bounds.width;
            let color = if self.on_target { ON_TARGET } else { OFF_TARGET };
            frame.fill(
                &Path::rectangle(Point::new(x - 2.0, 0.0), Size::new(4.0, bounds.height)),
                color,
            );
        }

        vec![frame.into_geometry()]
    }
}

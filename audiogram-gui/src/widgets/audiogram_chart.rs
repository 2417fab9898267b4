//! # Audiogram Chart Widget
//!
//! Draws hearing level against frequency on a canvas. Frequencies are
//! spaced evenly along the x axis; the level axis runs from -10 dB at the
//! top to 120 dB at the bottom, as audiograms are conventionally read.
//!
//! ## Features
//! - One line per session and ear, styled by `audiogram_core::chart`
//! - Dashed lines for the right ear
//! - Gaps where a frequency was not measured
//! - Legend in the top right corner

use iced::widget::canvas::{self, Frame, Geometry, LineDash, Path, Stroke, Text};
use iced::widget::container;
use iced::{Color, Element, Point, Rectangle, Renderer, Size, Theme, alignment, mouse};

use audiogram_core::chart::{self, AudiogramData, AudiogramSeries, LEVEL_TICKS};
use audiogram_core::level;

/// Space reserved around the plot for axis labels.
const MARGIN_LEFT: f32 = 48.0;
const MARGIN_RIGHT: f32 = 16.0;
const MARGIN_TOP: f32 = 16.0;
const MARGIN_BOTTOM: f32 = 28.0;

const POINT_RADIUS: f32 = 3.5;
const DASH: [f32; 2] = [6.0, 4.0];
const LEGEND_ROW_HEIGHT: f32 = 16.0;
const LEGEND_SWATCH: f32 = 20.0;

/// Canvas widget for one [`AudiogramData`].
pub struct AudiogramChart {
    data: AudiogramData,
}

impl AudiogramChart {
    pub fn new(data: AudiogramData) -> Self {
        Self { data }
    }

    pub fn view(self) -> Element<'static, crate::Message> {
        container(
            canvas::Canvas::new(self)
                .width(iced::Length::Fill)
                .height(iced::Length::Fill),
        )
        .into()
    }

    /// Plot area inside the axis margins.
    fn plot_area(bounds: Size) -> Rectangle {
        Rectangle {
            x: MARGIN_LEFT,
            y: MARGIN_TOP,
            width: (bounds.width - MARGIN_LEFT - MARGIN_RIGHT).max(1.0),
            height: (bounds.height - MARGIN_TOP - MARGIN_BOTTOM).max(1.0),
        }
    }

    fn x_for(&self, plot: Rectangle, index: usize) -> f32 {
        let columns = self.data.frequencies.len().max(1) as f32;
        plot.x + (index as f32 + 0.5) * plot.width / columns
    }

    fn y_for(plot: Rectangle, level: f32) -> f32 {
        plot.y + chart::level_fraction(level) * plot.height
    }

    fn draw_grid(&self, frame: &mut Frame, plot: Rectangle, theme: &Theme) {
        let text_color = theme.palette().text;
        let grid_color = Color {
            a: 0.15,
            ..text_color
        };
        let grid = Stroke::default().with_width(1.0).with_color(grid_color);

        for &tick in &LEVEL_TICKS {
            let y = Self::y_for(plot, tick);
            frame.stroke(
                &Path::line(Point::new(plot.x, y), Point::new(plot.x + plot.width, y)),
                grid,
            );
            frame.fill_text(Text {
                content: format!("{}", tick),
                position: Point::new(plot.x - 6.0, y),
                color: text_color,
                size: 11.0.into(),
                horizontal_alignment: alignment::Horizontal::Right,
                vertical_alignment: alignment::Vertical::Center,
                ..Text::default()
            });
        }

        for (index, &frequency) in self.data.frequencies.iter().enumerate() {
            let x = self.x_for(plot, index);
            frame.stroke(
                &Path::line(Point::new(x, plot.y), Point::new(x, plot.y + plot.height)),
                grid,
            );
            frame.fill_text(Text {
                content: level::format_frequency(frequency),
                position: Point::new(x, plot.y + plot.height + 6.0),
                color: text_color,
                size: 11.0.into(),
                horizontal_alignment: alignment::Horizontal::Center,
                vertical_alignment: alignment::Vertical::Top,
                ..Text::default()
            });
        }

        frame.fill_text(Text {
            content: "dB".to_string(),
            position: Point::new(4.0, 2.0),
            color: text_color,
            size: 11.0.into(),
            ..Text::default()
        });
    }

    fn series_stroke(series: &AudiogramSeries) -> (Color, Stroke<'static>) {
        let [r, g, b] = series.style.color;
        let color = Color::from_rgba8(r, g, b, series.style.opacity);
        let solid = Stroke::default()
            .with_width(series.style.line_width)
            .with_color(color);
        let stroke = if series.style.dashed {
            Stroke {
                line_dash: LineDash {
                    segments: &DASH,
                    offset: 0,
                },
                ..solid
            }
        } else {
            solid
        };
        (color, stroke)
    }

    fn draw_series(&self, frame: &mut Frame, plot: Rectangle, series: &AudiogramSeries) {
        let (color, stroke) = Self::series_stroke(series);
        let points: Vec<Option<Point>> = series
            .levels
            .iter()
            .enumerate()
            .map(|(index, level)| level.map(|l| Point::new(self.x_for(plot, index), Self::y_for(plot, l))))
            .collect();

        // Untested frequencies break the line.
        let line = Path::new(|builder| {
            let mut pen_down = false;
            for point in &points {
                match point {
                    Some(p) if pen_down => builder.line_to(*p),
                    Some(p) => {
                        builder.move_to(*p);
                        pen_down = true;
                    }
                    None => pen_down = false,
                }
            }
        });
        frame.stroke(&line, stroke);

        for point in points.iter().flatten() {
            frame.fill(&Path::circle(*point, POINT_RADIUS), color);
        }
    }

    fn draw_legend(&self, frame: &mut Frame, plot: Rectangle, theme: &Theme) {
        let right = plot.x + plot.width - 8.0;
        for (row, series) in self.data.series.iter().enumerate() {
            let y = plot.y + 10.0 + row as f32 * LEGEND_ROW_HEIGHT;
            let (_, stroke) = Self::series_stroke(series);
            frame.stroke(
                &Path::line(Point::new(right - LEGEND_SWATCH, y), Point::new(right, y)),
                stroke,
            );
            frame.fill_text(Text {
                content: series.label.clone(),
                position: Point::new(right - LEGEND_SWATCH - 6.0, y),
                color: theme.palette().text,
                size: 11.0.into(),
                horizontal_alignment: alignment::Horizontal::Right,
                vertical_alignment: alignment::Vertical::Center,
                ..Text::default()
            });
        }
    }
}

impl<Message> canvas::Program<Message> for AudiogramChart {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = Frame::new(renderer, bounds.size());

        if !bounds.width.is_finite() || !bounds.height.is_finite() {
            return vec![frame.into_geometry()];
        }

        let plot = Self::plot_area(bounds.size());
        self.draw_grid(&mut frame, plot, theme);

        if self.data.is_empty() {
            frame.fill_text(Text {
                content: "No measurements to show".to_string(),
                position: Point::new(plot.center_x(), plot.center_y()),
                color: theme.palette().text,
                size: 14.0.into(),
                horizontal_alignment: alignment::Horizontal::Center,
                vertical_alignment: alignment::Vertical::Center,
                ..Text::default()
            });
            return vec![frame.into_geometry()];
        }

        for series in &self.data.series {
            self.draw_series(&mut frame, plot, series);
        }
        self.draw_legend(&mut frame, plot, theme);

        vec![frame.into_geometry()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plot_area_leaves_room_for_labels() {
        let plot = AudiogramChart::plot_area(Size::new(600.0, 300.0));
        assert_eq!(plot.x, MARGIN_LEFT);
        assert_eq!(plot.width, 600.0 - MARGIN_LEFT - MARGIN_RIGHT);
        assert_eq!(plot.height, 300.0 - MARGIN_TOP - MARGIN_BOTTOM);
    }

    #[test]
    fn louder_levels_sit_lower() {
        let plot = AudiogramChart::plot_area(Size::new(600.0, 300.0));
        let top = AudiogramChart::y_for(plot, -10.0);
        let bottom = AudiogramChart::y_for(plot, 120.0);
        assert_eq!(top, plot.y);
        assert_eq!(bottom, plot.y + plot.height);
        assert!(AudiogramChart::y_for(plot, 40.0) < AudiogramChart::y_for(plot, 60.0));
    }

    #[test]
    fn frequencies_are_centered_in_columns() {
        let chart = AudiogramChart::new(AudiogramData {
            frequencies: vec![250, 500, 1000, 2000],
            series: Vec::new(),
        });
        let plot = AudiogramChart::plot_area(Size::new(448.0 + MARGIN_LEFT + MARGIN_RIGHT, 300.0));
        assert_eq!(chart.x_for(plot, 0), MARGIN_LEFT + 56.0);
        assert_eq!(chart.x_for(plot, 3), MARGIN_LEFT + 392.0);
    }
}

//! Test patterns drawn through embedded-graphics

use clap::ValueEnum;
use embedded_graphics::mono_font::ascii::FONT_6X10;
use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};
use embedded_graphics::text::Text;

/// Side of a checkerboard square and of the moving marker
const CELL: u32 = 40;
const MARKER: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Pattern {
    /// Alternating squares over the whole panel
    Checker,
    /// One-pixel frame around the edge
    Border,
    /// A line of text near the top left
    Text,
    /// Horizontal red ramp, vertical blue ramp
    Gradient,
}

impl Pattern {
    pub fn draw<D>(self, target: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb888>,
    {
        let area = target.bounding_box();
        match self {
            Pattern::Checker => {
                let cols = area.size.width.div_ceil(CELL);
                let rows = area.size.height.div_ceil(CELL);
                for row in 0..rows {
                    for col in 0..cols {
                        let color = if (row + col) % 2 == 0 { Rgb888::WHITE } else { Rgb888::BLACK };
                        Rectangle::new(
                            Point::new((col * CELL) as i32, (row * CELL) as i32),
                            Size::new(CELL, CELL),
                        )
                        .into_styled(PrimitiveStyle::with_fill(color))
                        .draw(target)?;
                    }
                }
            }
            Pattern::Border => {
                area.into_styled(PrimitiveStyle::with_stroke(Rgb888::GREEN, 1))
                    .draw(target)?;
            }
            Pattern::Text => {
                let style = MonoTextStyle::new(&FONT_6X10, Rgb888::WHITE);
                Text::new("ILI9486 panel-sim", Point::new(4, 12), style).draw(target)?;
            }
            Pattern::Gradient => {
                let (w, h) = (area.size.width.max(1), area.size.height.max(1));
                let pixels = (0..h).flat_map(move |y| {
                    (0..w).map(move |x| {
                        let red = (x * 255 / w) as u8;
                        let blue = (y * 255 / h) as u8;
                        Pixel(Point::new(x as i32, y as i32), Rgb888::new(red, 0, blue))
                    })
                });
                target.draw_iter(pixels)?;
            }
        }
        Ok(())
    }
}

/// Small square that steps right by its own size each frame
pub fn marker_at(frame: u32, size: Size) -> Rectangle {
    let per_row = (size.width / MARKER).max(1);
    let rows = (size.height / MARKER).max(1);
    let step = frame % (per_row * rows);
    Rectangle::new(
        Point::new(((step % per_row) * MARKER) as i32, ((step / per_row) * MARKER) as i32),
        Size::new(MARKER, MARKER),
    )
}

/// Erase the previous marker and draw the one for `frame`
pub fn move_marker<D>(target: &mut D, frame: u32) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb888>,
{
    let size = target.bounding_box().size;
    if frame > 0 {
        marker_at(frame - 1, size)
            .into_styled(PrimitiveStyle::with_fill(Rgb888::BLACK))
            .draw(target)?;
    }
    marker_at(frame, size)
        .into_styled(PrimitiveStyle::with_fill(Rgb888::RED))
        .draw(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_walks_rows() {
        let size = Size::new(32, 16);
        assert_eq!(marker_at(0, size).top_left, Point::new(0, 0));
        assert_eq!(marker_at(3, size).top_left, Point::new(24, 0));
        assert_eq!(marker_at(4, size).top_left, Point::new(0, 8));
        assert_eq!(marker_at(8, size).top_left, Point::new(0, 0));
    }
}

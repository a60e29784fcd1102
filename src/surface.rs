//! A canvas of half-block "pixels" on top of a grid of terminal cells.

use glam::Vec2;
use termwiz::surface::Change as TermwizChange;
use termwiz::surface::Position as TermwizPosition;

/// An RGBA colour
pub type Colour = (f32, f32, f32, f32);

/// A default pure white.
pub const WHITE: Colour = (1.0, 1.0, 1.0, 1.0);

/// Scale a colour towards black. Terminal cells have no real alpha channel, so translucency is
/// faked by pre-fading against the (assumed black) background.
#[must_use]
pub fn faded(colour: Colour, opacity: f32) -> Colour {
    (
        colour.0 * opacity,
        colour.1 * opacity,
        colour.2 * opacity,
        1.0,
    )
}

/// A drawable frame. Each terminal cell hosts two vertically-stacked pixels, rendered with the
/// half block characters ("▀", "▄"). So pixel coordinates span `0..columns` × `0..rows * 2`.
pub struct Canvas {
    /// The canvas width in pixels (the same as the terminal's column count).
    pub width: usize,
    /// The canvas height in pixels (double the terminal's row count).
    pub height: usize,
    /// The underlying surface of terminal cells.
    pub cells: termwiz::surface::Surface,
}

impl Canvas {
    /// Create a blank canvas for a terminal of the given cell dimensions.
    #[must_use]
    pub fn new(columns: usize, rows: usize) -> Self {
        Self {
            width: columns,
            height: rows.saturating_mul(2),
            cells: termwiz::surface::Surface::new(columns, rows),
        }
    }

    /// Paint a single pixel.
    ///
    /// The rule is that we default to rendering any pair of colours using the upper half block,
    /// so the upper pixel is the cell's foreground and the lower pixel is the cell's background.
    ///
    /// However, there is one edge case that requires this to be inverted: when an empty cell
    /// needs a pixel in the lower half. It is impossible to do this with an upper half block
    /// *whilst retaining the ANSI-coded default background colour*.
    ///
    /// Coordinates outside the canvas are silently clipped: the simulation legitimately holds
    /// positions beyond a freshly-shrunk viewport until they wrap back in.
    pub fn paint_pixel(&mut self, x: usize, y: usize, colour: Colour) {
        let col = x;
        let row = y.div_euclid(2);
        if col >= self.width || y >= self.height {
            return;
        }
        self.cells.add_change(TermwizChange::CursorPosition {
            x: TermwizPosition::Absolute(col),
            y: TermwizPosition::Absolute(row),
        });

        let Some(cell) = self.cell_at(col, row) else {
            return;
        };
        let is_empty_upper = cell.str() != "▀";
        let is_upper_half = y.rem_euclid(2) == 0;
        let is_lower_half = !is_upper_half;
        let is_adding_to_bottom_of_empty_upper = is_empty_upper && is_lower_half;

        let mut fg_colour = if is_upper_half {
            Self::make_fg_colour(colour)
        } else {
            TermwizChange::Attribute(termwiz::cell::AttributeChange::Foreground(
                cell.attrs().foreground(),
            ))
        };

        let mut bg_colour = if is_upper_half {
            TermwizChange::Attribute(termwiz::cell::AttributeChange::Background(
                cell.attrs().background(),
            ))
        } else {
            Self::make_bg_colour(colour)
        };

        if is_adding_to_bottom_of_empty_upper {
            fg_colour = Self::make_fg_colour(colour);
            bg_colour = TermwizChange::Attribute(termwiz::cell::AttributeChange::Background(
                cell.attrs().background(),
            ));
        }

        // This is when we add a pixel to a cell that only has a lower-half colour.
        let is_converting_lower_to_full = is_upper_half && cell.str() == "▄";
        if is_converting_lower_to_full {
            fg_colour = Self::make_fg_colour(colour);
            bg_colour = TermwizChange::Attribute(termwiz::cell::AttributeChange::Background(
                cell.attrs().foreground(),
            ));
        }

        self.cells.add_changes(vec![fg_colour, bg_colour]);
        if is_adding_to_bottom_of_empty_upper {
            self.cells.add_change("▄");
        } else {
            self.cells.add_change("▀");
        }
    }

    /// Paint a filled circle. Every pixel whose centre lies within `radius` of the given point is
    /// painted, so even sub-pixel radii produce at least the centre pixel.
    pub fn fill_circle(&mut self, centre: Vec2, radius: f32, colour: Colour) {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "The bounding box is clamped to sane pixel coordinates"
        )]
        let (left, right, top, bottom) = (
            (centre.x - radius).floor() as i64,
            (centre.x + radius).ceil() as i64,
            (centre.y - radius).floor() as i64,
            (centre.y + radius).ceil() as i64,
        );

        for y in top..=bottom {
            for x in left..=right {
                #[expect(
                    clippy::cast_precision_loss,
                    reason = "Pixel coordinates are far below f32's integer limit"
                )]
                let offset = Vec2::new(x as f32, y as f32) - centre;
                if offset.length() <= radius {
                    if let (Ok(x_pixel), Ok(y_pixel)) = (usize::try_from(x), usize::try_from(y)) {
                        self.paint_pixel(x_pixel, y_pixel, colour);
                    }
                }
            }
        }
    }

    /// Paint a straight line between two points with Bresenham's algorithm.
    pub fn stroke_line(&mut self, from: Vec2, to: Vec2, colour: Colour) {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "Pixel coordinates comfortably fit an i64"
        )]
        let (mut x, mut y, x_end, y_end) = (
            from.x.round() as i64,
            from.y.round() as i64,
            to.x.round() as i64,
            to.y.round() as i64,
        );

        let dx = (x_end - x).abs();
        let dy = -(y_end - y).abs();
        let step_x = if x < x_end { 1i64 } else { -1i64 };
        let step_y = if y < y_end { 1i64 } else { -1i64 };
        let mut error = dx + dy;

        loop {
            if let (Ok(x_pixel), Ok(y_pixel)) = (usize::try_from(x), usize::try_from(y)) {
                self.paint_pixel(x_pixel, y_pixel, colour);
            }
            if x == x_end && y == y_end {
                break;
            }
            let doubled = 2i64 * error;
            if doubled >= dy {
                error += dy;
                x += step_x;
            }
            if doubled <= dx {
                error += dx;
                y += step_y;
            }
        }
    }

    /// Overlay text at a given cell coordinate.
    pub fn overlay_text(&mut self, column: usize, row: usize, text: String) {
        self.cells.add_changes(vec![
            TermwizChange::CursorPosition {
                x: TermwizPosition::Absolute(column),
                y: TermwizPosition::Absolute(row),
            },
            Self::make_default_bg_colour(),
            Self::make_fg_colour(WHITE),
        ]);
        self.cells.add_change(text);
    }

    /// Make a Termwiz colour attribute
    #[must_use]
    pub const fn make_colour_attribute(colour: Colour) -> termwiz::color::ColorAttribute {
        termwiz::color::ColorAttribute::TrueColorWithDefaultFallback(termwiz::color::SrgbaTuple(
            colour.0, colour.1, colour.2, colour.3,
        ))
    }

    /// Make a Termwiz background colour
    #[must_use]
    pub const fn make_bg_colour(colour: Colour) -> TermwizChange {
        let colour_attribute = Self::make_colour_attribute(colour);
        TermwizChange::Attribute(termwiz::cell::AttributeChange::Background(colour_attribute))
    }

    /// Make the default Termwiz background colour. This is the non-colour, usually black, that a
    /// terminal displays when nothing else has been set.
    #[must_use]
    pub const fn make_default_bg_colour() -> TermwizChange {
        let colour_attribute = termwiz::color::ColorAttribute::Default;
        TermwizChange::Attribute(termwiz::cell::AttributeChange::Background(colour_attribute))
    }

    /// Make a Termwiz foreground colour
    #[must_use]
    pub const fn make_fg_colour(colour: Colour) -> TermwizChange {
        let colour_attribute = Self::make_colour_attribute(colour);
        TermwizChange::Attribute(termwiz::cell::AttributeChange::Foreground(colour_attribute))
    }

    /// Get the cell at the given column and row.
    fn cell_at(&mut self, col: usize, row: usize) -> Option<termwiz::cell::Cell> {
        let cells = self.cells.screen_cells();
        cells.get(row)?.get(col).map(|cell| (*cell).clone())
    }
}

#[cfg(test)]
#[allow(
    clippy::indexing_slicing,
    clippy::shadow_unrelated,
    reason = "Tests aren't so strict"
)]
mod test {
    use super::*;

    const RED: Colour = (1.0, 0.0, 0.0, 1.0);
    const GREY: Colour = (0.5, 0.5, 0.5, 1.0);

    #[test]
    fn paint_new_pixels() {
        let mut canvas = Canvas::new(2, 2);

        let cell = &canvas.cells.screen_cells()[0][0];
        assert_eq!(cell.str(), " ");
        assert_eq!(
            cell.attrs().foreground(),
            termwiz::color::ColorAttribute::Default
        );
        assert_eq!(
            cell.attrs().background(),
            termwiz::color::ColorAttribute::Default
        );

        canvas.paint_pixel(0, 0, WHITE);
        let cell = &canvas.cells.screen_cells()[0][0];

        assert_eq!(cell.str(), "▀");
        assert_eq!(
            cell.attrs().foreground(),
            Canvas::make_colour_attribute(WHITE)
        );
        assert_eq!(
            cell.attrs().background(),
            termwiz::color::ColorAttribute::Default
        );

        canvas.paint_pixel(1, 0, WHITE);
        let cell = &canvas.cells.screen_cells()[0][1];
        assert_eq!(cell.str(), "▀");

        canvas.paint_pixel(1, 2, WHITE);
        let cell = &canvas.cells.screen_cells()[1][1];
        assert_eq!(cell.str(), "▀");

        canvas.paint_pixel(1, 3, WHITE);
        let cell = &canvas.cells.screen_cells()[1][1];
        assert_eq!(cell.str(), "▀");
    }

    #[test]
    fn out_of_bounds_pixels_are_clipped() {
        let mut canvas = Canvas::new(2, 2);
        canvas.paint_pixel(1, 4, WHITE);
        canvas.paint_pixel(2, 0, WHITE);
        for row in canvas.cells.screen_cells() {
            for cell in row {
                assert_eq!(cell.str(), " ");
            }
        }
    }

    #[test]
    fn paint_pixel_at_bottom_of_empty_cell() {
        let mut canvas = Canvas::new(1, 1);

        canvas.paint_pixel(0, 1, WHITE);
        let cell = &canvas.cells.screen_cells()[0][0];
        assert_eq!(cell.str(), "▄");
        assert_eq!(
            cell.attrs().foreground(),
            Canvas::make_colour_attribute(WHITE)
        );
        assert_eq!(
            cell.attrs().background(),
            termwiz::color::ColorAttribute::Default
        );
    }

    #[test]
    fn convert_cell_from_bottom_to_full() {
        let mut canvas = Canvas::new(1, 1);

        canvas.paint_pixel(0, 1, WHITE);
        canvas.paint_pixel(0, 0, RED);
        let cell = &canvas.cells.screen_cells()[0][0];
        assert_eq!(cell.str(), "▀");
        assert_eq!(
            cell.attrs().foreground(),
            Canvas::make_colour_attribute(RED)
        );
        assert_eq!(
            cell.attrs().background(),
            Canvas::make_colour_attribute(WHITE)
        );
    }

    #[test]
    fn paint_pixels_on_or_near_other_pixels() {
        let mut canvas = Canvas::new(2, 1);
        canvas.paint_pixel(0, 0, WHITE);

        let fg = Canvas::make_colour_attribute(WHITE);
        let bg = Canvas::make_colour_attribute(GREY);

        canvas.paint_pixel(0, 1, GREY);
        let cells = canvas.cells.screen_cells();
        let first_cell = cells[0][0].clone();
        assert_eq!(first_cell.str(), "▀");
        assert_eq!(first_cell.attrs().foreground(), fg);
        assert_eq!(first_cell.attrs().background(), bg);

        let fg = Canvas::make_colour_attribute(RED);
        canvas.paint_pixel(0, 0, RED);
        let cells = canvas.cells.screen_cells();
        let first_cell = cells[0][0].clone();
        assert_eq!(first_cell.attrs().foreground(), fg);
        assert_eq!(first_cell.attrs().background(), bg);
    }

    #[test]
    fn tiny_circle_paints_its_centre() {
        let mut canvas = Canvas::new(4, 4);
        canvas.fill_circle(Vec2::new(2.0, 2.0), 0.5, WHITE);
        let cell = &canvas.cells.screen_cells()[1][2];
        assert_eq!(cell.str(), "▀");
    }

    #[test]
    fn circle_is_bounded_by_its_radius() {
        let mut canvas = Canvas::new(9, 5);
        canvas.fill_circle(Vec2::new(4.0, 4.0), 2.0, WHITE);

        // The extremes of the circle are painted...
        let cells = canvas.cells.screen_cells();
        assert_eq!(cells[2][4].str(), "▀"); // y=4
        assert_eq!(cells[1][4].str(), "▀"); // y=2 (it wouldn't reach y=1)
        assert_eq!(cells[2][2].str(), "▀"); // x=2
        assert_eq!(cells[2][6].str(), "▀"); // x=6
        // One column over, only the lower half of the cell is reached.
        assert_eq!(cells[1][3].str(), "▄"); // y=3

        // ...but the bounding box corners are not.
        assert_eq!(cells[1][2].str(), " ");
        assert_eq!(cells[3][6].str(), " ");
    }

    #[test]
    fn line_connects_its_endpoints() {
        let mut canvas = Canvas::new(8, 4);
        canvas.stroke_line(Vec2::new(0.0, 0.0), Vec2::new(7.0, 7.0), WHITE);

        let cells = canvas.cells.screen_cells();
        assert_eq!(cells[0][0].str(), "▀");
        assert_eq!(cells[3][7].str(), "▄");
        // A 45° line paints exactly one pixel per column.
        let mut painted = 0;
        for row in &cells {
            for cell in row.iter() {
                if cell.str() != " " {
                    painted += 1;
                }
            }
        }
        assert_eq!(painted, 8);
    }

    #[test]
    fn line_clips_at_the_canvas_edge() {
        let mut canvas = Canvas::new(2, 1);
        canvas.stroke_line(Vec2::new(0.0, 0.0), Vec2::new(5.0, 0.0), WHITE);
        let cells = canvas.cells.screen_cells();
        assert_eq!(cells[0][0].str(), "▀");
        assert_eq!(cells[0][1].str(), "▀");
    }
}

//! Panel identification pattern for checking a grid config against the
//! real wiring.
//!
//! Every grid cell is filled with its own hue, stepping around the color
//! wheel in row-major cell order, and gets a white square in its logical
//! top-left corner. A panel showing the wrong hue has the wrong `order` or
//! `parallel`; a marker in the wrong corner means the wrong `rotate`.

use crate::Color;
use crate::grid::GridTransformer;
use crate::mirror::FrameSource;
use crate::surface::DrawSurface;
use std::convert::Infallible;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PanelPattern {
    rows: i32,
    cols: i32,
    panel_width: i32,
    panel_height: i32,
}

impl PanelPattern {
    pub fn for_grid<S: ?Sized>(grid: &GridTransformer<'_, S>) -> Self {
        Self {
            rows: grid.rows(),
            cols: grid.columns(),
            panel_width: grid.panel_width(),
            panel_height: grid.panel_height(),
        }
    }

    /// Hue-coded color of a grid cell.
    pub fn cell_color(&self, row: i32, col: i32) -> Color {
        let cells = (self.rows * self.cols).max(1);
        let index = row * self.cols + col;
        Color::from_hue((index * 360 / cells) as u16)
    }

    /// Side of the corner marker: an eighth of the shorter panel edge.
    fn marker_size(&self) -> i32 {
        (self.panel_width.min(self.panel_height) / 8).max(1)
    }
}

impl FrameSource for PanelPattern {
    type Error = Infallible;

    fn draw_frame<D: DrawSurface + ?Sized>(&mut self, target: &mut D) -> Result<(), Infallible> {
        let marker = self.marker_size();
        for y in 0..self.rows * self.panel_height {
            for x in 0..self.cols * self.panel_width {
                let color = if x % self.panel_width < marker && y % self.panel_height < marker {
                    Color::WHITE
                } else {
                    self.cell_color(y / self.panel_height, x / self.panel_width)
                };
                target.set_pixel(x, y, color);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Panel, Rotation};
    use crate::mirror::render_frame;
    use crate::surface::FrameBuffer;
    use pretty_assertions::assert_eq;

    fn two_by_two<'a>(panels: Vec<Panel>) -> GridTransformer<'a, FrameBuffer> {
        GridTransformer::new(32, 32, 16, 16, 4, panels).unwrap()
    }

    fn upright() -> Vec<Panel> {
        (0..4).map(|i| Panel::new(i, Rotation::Deg0, 0)).collect()
    }

    #[test]
    fn cells_get_distinct_hues() {
        let pattern = PanelPattern::for_grid(&two_by_two(upright()));
        assert_eq!(pattern.cell_color(0, 0), Color::from_hue(0));
        assert_eq!(pattern.cell_color(0, 1), Color::from_hue(90));
        assert_eq!(pattern.cell_color(1, 0), Color::from_hue(180));
        assert_eq!(pattern.cell_color(1, 1), Color::from_hue(270));
    }

    #[test]
    fn logical_frame_has_marker_in_each_cell() {
        let grid = two_by_two(upright());
        let mut pattern = PanelPattern::for_grid(&grid);
        let mut fb = FrameBuffer::new(32, 32);
        pattern.draw_frame(&mut fb).unwrap();

        assert_eq!(fb.pixel(0, 0), Some(Color::WHITE));
        assert_eq!(fb.pixel(1, 1), Some(Color::WHITE));
        assert_eq!(fb.pixel(2, 2), Some(pattern.cell_color(0, 0)));
        assert_eq!(fb.pixel(17, 1), Some(Color::WHITE));
        assert_eq!(fb.pixel(20, 20), Some(pattern.cell_color(1, 1)));
    }

    #[test]
    fn rotated_panel_shows_marker_in_opposite_corner() {
        let mut panels = upright();
        panels[3] = Panel::new(3, Rotation::Deg180, 0);
        let grid = two_by_two(panels);
        let mut pattern = PanelPattern::for_grid(&grid);

        let mut canvas = FrameBuffer::new(64, 16);
        render_frame(&mut pattern, &grid, &mut canvas, 100).unwrap();

        // Panel 3 sits in driver columns 48..64 and is upside down.
        assert_eq!(canvas.pixel(63, 15), Some(Color::WHITE));
        assert_eq!(canvas.pixel(48, 0), Some(pattern.cell_color(1, 1)));
        // Panel 0 is upright.
        assert_eq!(canvas.pixel(0, 0), Some(Color::WHITE));
    }

    #[test]
    fn marker_is_at_least_one_pixel() {
        let grid = GridTransformer::<FrameBuffer>::new(4, 4, 4, 4, 1, vec![Panel::default()])
            .unwrap();
        let mut pattern = PanelPattern::for_grid(&grid);
        let mut fb = FrameBuffer::new(4, 4);
        pattern.draw_frame(&mut fb).unwrap();
        assert_eq!(fb.pixel(0, 0), Some(Color::WHITE));
        assert_eq!(fb.pixel(1, 0), Some(Color::from_hue(0)));
    }
}

//! Drawing surfaces: the capability set shared by the LED canvas, the
//! in-memory frame buffer and the panel grid transformer.
//!
//! ## Rust concepts
//! - Traits as narrow capability sets instead of base classes
//! - Borrowed handles (`&'a mut S`) whose lifetime the caller owns
//! - Implementing a foreign type's behavior behind a cargo feature

use crate::Color;
use image::RgbImage;

// ── Capabilities ─────────────────────────────────────────────────────

/// Anything pixels can be drawn onto.
///
/// Coordinates are `i32` to match the LED driver. Writes outside
/// `[0, width) × [0, height)` are dropped by every implementation in this
/// crate, so callers can draw overscanned content without clipping first.
pub trait DrawSurface {
    fn width(&self) -> i32;
    fn height(&self) -> i32;
    /// Turn every pixel off.
    fn clear(&mut self);
    /// Set every pixel to `color`.
    fn fill(&mut self, color: Color);
    fn set_pixel(&mut self, x: i32, y: i32, color: Color);
}

/// A surface that wraps another surface and rewrites what is drawn to it.
///
/// # Rust concept: lifetimes on traits
/// `'a` is how long the wrapped surface is borrowed for. The transform
/// never owns `source`; the caller keeps it alive and gets it back once
/// the transform is dropped or detached.
pub trait SurfaceTransform<'a, S: DrawSurface + ?Sized>: DrawSurface {
    /// Wrap `source`, replacing any surface wrapped before, and return the
    /// wrapping surface to draw on.
    fn transform(&mut self, source: &'a mut S) -> &mut Self;

    /// Release the wrapped surface, if any.
    fn detach(&mut self) -> Option<&'a mut S>;
}

// Lets `&mut dyn DrawSurface` and `&mut T` be passed wherever a surface is
// expected, including as the source of another transform.
impl<T: DrawSurface + ?Sized> DrawSurface for &mut T {
    fn width(&self) -> i32 {
        (**self).width()
    }

    fn height(&self) -> i32 {
        (**self).height()
    }

    fn clear(&mut self) {
        (**self).clear();
    }

    fn fill(&mut self, color: Color) {
        (**self).fill(color);
    }

    fn set_pixel(&mut self, x: i32, y: i32, color: Color) {
        (**self).set_pixel(x, y, color);
    }
}

// ── In-memory surface ────────────────────────────────────────────────

/// A plain RGB frame buffer in host memory.
///
/// Used for `--snapshot` (render one frame without LED hardware) and as the
/// physical surface in tests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameBuffer {
    width: i32,
    height: i32,
    pixels: Vec<Color>,
}

impl FrameBuffer {
    /// Create an all-black buffer. Negative sizes are treated as zero.
    pub fn new(width: i32, height: i32) -> Self {
        let width = width.max(0);
        let height = height.max(0);
        Self {
            width,
            height,
            pixels: vec![Color::BLACK; width as usize * height as usize],
        }
    }

    /// Read back a pixel, or `None` if `(x, y)` is outside the buffer.
    pub fn pixel(&self, x: i32, y: i32) -> Option<Color> {
        self.index(x, y).map(|i| self.pixels[i])
    }

    /// Convert to an `image` buffer, e.g. to save as PNG.
    pub fn to_image(&self) -> RgbImage {
        RgbImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            let c = self.pixels[(y as i32 * self.width + x as i32) as usize];
            image::Rgb([c.r, c.g, c.b])
        })
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }
}

impl DrawSurface for FrameBuffer {
    fn width(&self) -> i32 {
        self.width
    }

    fn height(&self) -> i32 {
        self.height
    }

    fn clear(&mut self) {
        self.fill(Color::BLACK);
    }

    fn fill(&mut self, color: Color) {
        self.pixels.fill(color);
    }

    fn set_pixel(&mut self, x: i32, y: i32, color: Color) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = color;
        }
    }
}

// ── LED canvas ───────────────────────────────────────────────────────

/// The driver's canvas is the physical surface. The C library already
/// ignores out-of-range writes, so no bounds check is needed here.
#[cfg(feature = "hardware")]
impl DrawSurface for rpi_led_matrix::LedCanvas {
    fn width(&self) -> i32 {
        self.canvas_size().0
    }

    fn height(&self) -> i32 {
        self.canvas_size().1
    }

    fn clear(&mut self) {
        rpi_led_matrix::LedCanvas::clear(self);
    }

    fn fill(&mut self, color: Color) {
        rpi_led_matrix::LedCanvas::fill(self, &color.into());
    }

    fn set_pixel(&mut self, x: i32, y: i32, color: Color) {
        self.set(x, y, &color.into());
    }
}

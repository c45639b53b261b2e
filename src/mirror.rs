//! Capture-and-redraw loop: pull a frame from a source, draw it through
//! the panel grid onto the back canvas, swap, repeat.
//!
//! The LED driver double-buffers: we draw into an offscreen canvas and hand
//! it to the driver, which shows it on the next VSync and gives back the
//! previous one to draw into. [`FramePresenter`] is that exchange;
//! [`FrameSource`] is anything that can paint a whole frame.
//!
//! ## Rust concepts
//! - Associated types on traits (`type Canvas`, `type Error`)
//! - Moving a value into a call and getting another back (`present`)
//! - Scoped borrows: a transformer bound to `&mut canvas` must be dropped
//!   before the canvas can be moved

use crate::grid::GridTransformer;
use crate::surface::{DrawSurface, FrameBuffer, SurfaceTransform};
use crate::{Color, is_running};
use std::sync::atomic::AtomicBool;
use std::thread;
use std::time::{Duration, Instant};

/// Slow frames are logged individually up to this many per run.
const SLOW_FRAME_LOG_LIMIT: u64 = 5;

// ── Traits ───────────────────────────────────────────────────────────

/// Something that can paint one full frame onto a surface.
pub trait FrameSource {
    type Error;

    /// Draw the current frame with its top-left corner at `(0, 0)`.
    fn draw_frame<D: DrawSurface + ?Sized>(&mut self, target: &mut D) -> Result<(), Self::Error>;
}

/// The double-buffered output of the LED driver.
pub trait FramePresenter {
    type Canvas: DrawSurface;

    /// An offscreen canvas to draw the first frame into.
    fn back_buffer(&self) -> Self::Canvas;

    /// Show `canvas` and return the canvas to draw the next frame into.
    fn present(&self, canvas: Self::Canvas) -> Self::Canvas;
}

#[cfg(feature = "hardware")]
impl FramePresenter for rpi_led_matrix::LedMatrix {
    type Canvas = rpi_led_matrix::LedCanvas;

    fn back_buffer(&self) -> Self::Canvas {
        self.offscreen_canvas()
    }

    fn present(&self, canvas: Self::Canvas) -> Self::Canvas {
        self.swap(canvas)
    }
}

// ── Brightness ───────────────────────────────────────────────────────

/// Scales every color drawn through it by a 0-100 brightness.
pub struct Dimmed<'a, S: ?Sized> {
    inner: &'a mut S,
    brightness: u8,
}

impl<'a, S: DrawSurface + ?Sized> Dimmed<'a, S> {
    pub fn new(inner: &'a mut S, brightness: u8) -> Self {
        Self { inner, brightness }
    }
}

impl<S: DrawSurface + ?Sized> DrawSurface for Dimmed<'_, S> {
    fn width(&self) -> i32 {
        self.inner.width()
    }

    fn height(&self) -> i32 {
        self.inner.height()
    }

    fn clear(&mut self) {
        self.inner.clear();
    }

    fn fill(&mut self, color: Color) {
        self.inner.fill(color.apply_brightness(self.brightness));
    }

    fn set_pixel(&mut self, x: i32, y: i32, color: Color) {
        self.inner
            .set_pixel(x, y, color.apply_brightness(self.brightness));
    }
}

// ── Rendering ────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MirrorOptions {
    /// Pause between frames
    pub update_interval: Duration,
    /// Software brightness, 0-100
    pub brightness: u8,
}

impl Default for MirrorOptions {
    fn default() -> Self {
        Self {
            update_interval: Duration::from_micros(10_000),
            brightness: 100,
        }
    }
}

/// Counters reported when the loop ends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MirrorStats {
    pub frames: u64,
    pub slow_frames: u64,
}

/// Draw one frame from `source` through `grid` onto `canvas`.
///
/// The canvas is cleared first so pixels outside the grid stay dark.
pub fn render_frame<F, S>(
    source: &mut F,
    grid: &GridTransformer<'_, S>,
    canvas: &mut S,
    brightness: u8,
) -> Result<(), F::Error>
where
    F: FrameSource,
    S: DrawSurface,
{
    let mut frame = grid.unattached();
    let surface = frame.transform(canvas);
    surface.clear();
    source.draw_frame(&mut Dimmed::new(surface, brightness))
}

/// Render a single frame into an in-memory buffer of the physical canvas
/// size, for inspecting a layout without LED hardware.
pub fn snapshot<F: FrameSource>(
    source: &mut F,
    grid: &GridTransformer<'_, FrameBuffer>,
    physical_width: i32,
    physical_height: i32,
    brightness: u8,
) -> Result<FrameBuffer, F::Error> {
    let mut canvas = FrameBuffer::new(physical_width, physical_height);
    render_frame(source, grid, &mut canvas, brightness)?;
    Ok(canvas)
}

/// Mirror `source` onto the LED matrix until `running` is cleared or the
/// source fails.
///
/// The matrix is cleared before returning either way.
pub fn run<F, P>(
    source: &mut F,
    presenter: &P,
    grid: &GridTransformer<'_, P::Canvas>,
    options: &MirrorOptions,
    running: &AtomicBool,
) -> Result<MirrorStats, F::Error>
where
    F: FrameSource,
    P: FramePresenter,
{
    let mut canvas = presenter.back_buffer();
    let mut stats = MirrorStats::default();

    tracing::info!(
        "Mirroring {}x{} display every {}µs",
        grid.width(),
        grid.height(),
        options.update_interval.as_micros()
    );

    let result = loop {
        if !is_running(running) {
            break Ok(());
        }

        let frame_start = Instant::now();

        if let Err(e) = render_frame(source, grid, &mut canvas, options.brightness) {
            break Err(e);
        }
        canvas = presenter.present(canvas);
        stats.frames += 1;

        let frame_time = frame_start.elapsed();
        if frame_time > options.update_interval {
            stats.slow_frames += 1;
            if stats.slow_frames <= SLOW_FRAME_LOG_LIMIT {
                tracing::warn!(
                    "Frame {} took {}µs (interval: {}µs)",
                    stats.frames,
                    frame_time.as_micros(),
                    options.update_interval.as_micros()
                );
            }
        }

        thread::sleep(options.update_interval);
    };

    canvas.clear();
    presenter.present(canvas);

    if stats.slow_frames > 0 {
        tracing::warn!(
            "{} slow frames out of {}",
            stats.slow_frames,
            stats.frames
        );
    }
    tracing::info!("Mirroring stopped after {} frames", stats.frames);

    result.map(|()| stats)
}

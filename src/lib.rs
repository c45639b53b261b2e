//! Mirror a region of an X11 screen onto a grid of chained RGB LED panels.
//!
//! This module provides the pieces the binary wires together:
//! - Matrix configuration and initialization with our hardware defaults
//! - Signal handling for clean shutdown
//! - The color type shared by every surface
//!
//! The panel remapping lives in [`grid`], the drawing-surface traits in
//! [`surface`], and the capture-and-redraw loop in [`mirror`].

#[cfg(feature = "capture")]
pub mod capture;
pub mod config;
pub mod grid;
pub mod mirror;
pub mod pattern;
pub mod pixel_format;
pub mod surface;

#[cfg(feature = "hardware")]
use rpi_led_matrix::{LedMatrix, LedMatrixOptions, LedRuntimeOptions};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

// ── Matrix configuration ───────────────────────────────────────────

/// How the LED driver sees the hardware: panel size, chain length and
/// number of parallel chains, plus the board wiring.
///
/// The driver canvas is `cols * chain_length` pixels wide and
/// `rows * parallel` pixels tall, with each parallel chain occupying its
/// own band of `rows` pixels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatrixConfig {
    /// Pixel rows on a single panel
    pub rows: u32,
    /// Pixel columns on a single panel
    pub cols: u32,
    /// Panels daisy-chained on each output line
    pub chain_length: u32,
    /// Output lines driven in parallel
    pub parallel: u32,
    /// GPIO mapping name understood by the driver
    pub hardware_mapping: String,
    pub gpio_slowdown: u32,
}

impl MatrixConfig {
    /// Width of the driver canvas in pixels. Saturates instead of overflowing.
    pub fn width(&self) -> u32 {
        self.cols.saturating_mul(self.chain_length)
    }

    /// Height of the driver canvas in pixels. Saturates instead of overflowing.
    pub fn height(&self) -> u32 {
        self.rows.saturating_mul(self.parallel)
    }

    /// Total number of panels across all parallel chains.
    pub fn panel_count(&self) -> u32 {
        self.chain_length.saturating_mul(self.parallel)
    }
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            rows: 32,
            cols: 32,
            chain_length: 1,
            parallel: 1,
            hardware_mapping: "adafruit-hat".to_string(),
            gpio_slowdown: 2,
        }
    }
}

// ── Color ──────────────────────────────────────────────────────────

/// Our own color type, decoupled from the hardware crate.
///
/// This lets the grid and capture code be tested without `rpi-led-matrix`.
/// At the hardware boundary, we convert via `Into<LedColor>`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Self = Self::new(0, 0, 0);
    pub const WHITE: Self = Self::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Create a color from a hue value (0-360), with full saturation and brightness.
    ///
    /// # Rust concept: match expressions
    /// Rust's `match` is exhaustive, so the catch-all arm covers sector 5.
    pub fn from_hue(hue: u16) -> Self {
        let hue = hue % 360;
        let sector = hue / 60;
        let fraction = ((hue % 60) as f32) / 60.0;
        let rising = (fraction * 255.0) as u8;
        let falling = ((1.0 - fraction) * 255.0) as u8;

        match sector {
            0 => Self::new(255, rising, 0),
            1 => Self::new(falling, 255, 0),
            2 => Self::new(0, 255, rising),
            3 => Self::new(0, falling, 255),
            4 => Self::new(rising, 0, 255),
            _ => Self::new(255, 0, falling),
        }
    }

    /// Apply brightness scaling (0-100) to this color.
    pub fn apply_brightness(self, brightness: u8) -> Self {
        if brightness >= 100 {
            return self;
        }
        Self {
            r: ((self.r as u16 * brightness as u16) / 100) as u8,
            g: ((self.g as u16 * brightness as u16) / 100) as u8,
            b: ((self.b as u16 * brightness as u16) / 100) as u8,
        }
    }
}

/// Convert our Color to the hardware crate's LedColor at the boundary.
#[cfg(feature = "hardware")]
impl From<Color> for rpi_led_matrix::LedColor {
    fn from(c: Color) -> Self {
        rpi_led_matrix::LedColor {
            red: c.r,
            green: c.g,
            blue: c.b,
        }
    }
}

// ── Matrix initialization ──────────────────────────────────────────

/// Create a matrix for the given panel chain.
///
/// # Rust concept: Result and the ? operator
/// Matrix initialization can fail (e.g., if not running as root, or if GPIO
/// is unavailable). The caller uses `?` to propagate errors upward.
#[cfg(feature = "hardware")]
pub fn create_matrix(config: &MatrixConfig) -> Result<LedMatrix, Box<dyn std::error::Error>> {
    let mut options = LedMatrixOptions::new();
    options.set_rows(config.rows);
    options.set_cols(config.cols);
    options.set_chain_length(config.chain_length);
    options.set_parallel(config.parallel);
    options.set_hardware_mapping(&config.hardware_mapping);

    options.set_pwm_bits(8)?;
    options.set_pwm_lsb_nanoseconds(130);

    let mut rt_options = LedRuntimeOptions::new();
    rt_options.set_gpio_slowdown(config.gpio_slowdown);

    let matrix = LedMatrix::new(Some(options), Some(rt_options))?;

    tracing::info!(
        "LED matrix ready: {}x{} panels, chain {} x parallel {} ({}x{} px)",
        config.cols,
        config.rows,
        config.chain_length,
        config.parallel,
        config.width(),
        config.height()
    );

    Ok(matrix)
}

/// Set up a Ctrl+C / SIGTERM handler that sets `running` to false.
///
/// # Rust concept: Arc and AtomicBool
/// The flag is shared between the capture loop and the signal handler.
/// `Arc` lets both own it; `AtomicBool` makes it safe to flip from the
/// handler thread without a mutex.
pub fn setup_signal_handler() -> Result<Arc<AtomicBool>, ctrlc::Error> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    Ok(running)
}

/// Check if the main loop should keep running.
pub fn is_running(running: &AtomicBool) -> bool {
    running.load(Ordering::SeqCst)
}

// ── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    // ── MatrixConfig tests ─────────────────────────────────────────

    #[test]
    fn matrix_config_default_is_single_32x32() {
        let config = MatrixConfig::default();
        assert_eq!(config.rows, 32);
        assert_eq!(config.cols, 32);
        assert_eq!(config.panel_count(), 1);
        assert_eq!(config.hardware_mapping, "adafruit-hat");
    }

    #[rstest]
    #[case(32, 32, 1, 1, 32, 32)]
    #[case(32, 32, 4, 1, 128, 32)]
    #[case(32, 64, 2, 3, 128, 96)]
    #[case(16, 32, 3, 2, 96, 32)]
    fn canvas_size_follows_chain_and_parallel(
        #[case] rows: u32,
        #[case] cols: u32,
        #[case] chain_length: u32,
        #[case] parallel: u32,
        #[case] width: u32,
        #[case] height: u32,
    ) {
        let config = MatrixConfig {
            rows,
            cols,
            chain_length,
            parallel,
            ..MatrixConfig::default()
        };
        assert_eq!((config.width(), config.height()), (width, height));
        assert_eq!(config.panel_count(), chain_length * parallel);
    }

    #[test]
    fn oversized_geometry_saturates() {
        let config = MatrixConfig {
            rows: 70_000,
            cols: 70_000,
            chain_length: 70_000,
            parallel: 70_000,
            ..MatrixConfig::default()
        };
        assert_eq!(config.width(), u32::MAX);
        assert_eq!(config.height(), u32::MAX);
        assert_eq!(config.panel_count(), u32::MAX);
    }

    // ── Color tests ────────────────────────────────────────────────

    #[rstest]
    #[case(0, 255, 0, 0)] // Red
    #[case(60, 255, 255, 0)] // Yellow
    #[case(120, 0, 255, 0)] // Green
    #[case(180, 0, 255, 255)] // Cyan
    #[case(240, 0, 0, 255)] // Blue
    #[case(300, 255, 0, 255)] // Magenta
    fn test_color_from_hue_primary(#[case] hue: u16, #[case] r: u8, #[case] g: u8, #[case] b: u8) {
        assert_eq!(Color::from_hue(hue), Color::new(r, g, b));
    }

    #[test]
    fn color_from_hue_wraps_at_360() {
        assert_eq!(Color::from_hue(0), Color::from_hue(360));
        assert_eq!(Color::from_hue(90), Color::from_hue(450));
    }

    #[test]
    fn default_color_is_black() {
        assert_eq!(Color::default(), Color::BLACK);
    }

    #[rstest]
    #[case(100)]
    #[case(255)]
    fn apply_brightness_at_or_above_100_is_identity(#[case] brightness: u8) {
        let c = Color::new(100, 200, 50);
        assert_eq!(c.apply_brightness(brightness), c);
    }

    #[test]
    fn apply_brightness_0_is_black() {
        assert_eq!(Color::WHITE.apply_brightness(0), Color::BLACK);
    }

    #[test]
    fn apply_brightness_50_halves() {
        let c = Color::new(200, 100, 50);
        assert_eq!(c.apply_brightness(50), Color::new(100, 50, 25));
    }

    #[test]
    fn is_running_reads_flag() {
        let flag = AtomicBool::new(true);
        assert!(is_running(&flag));
        flag.store(false, Ordering::SeqCst);
        assert!(!is_running(&flag));
    }
}

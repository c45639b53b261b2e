//! X11 screen mirror for RGB LED matrix panels
//!
//! Grabs a region of the X display every update interval and draws it onto
//! the LED matrix through the panel grid, so panels can be chained in any
//! order and mounted at any rotation.
//!
//! ## Usage
//! ```sh
//! sudo ./target/release/xscreen-matrix --grid-config grid.json -u 20000
//! # check the wiring without a display:
//! sudo ./target/release/xscreen-matrix --grid-config grid.json --test-pattern
//! # render one frame to a PNG without LED hardware:
//! ./target/release/xscreen-matrix --grid-config grid.json --snapshot frame.png
//! ```

use clap::Parser;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use xscreen_matrix::MatrixConfig;
use xscreen_matrix::config::GridConfig;
use xscreen_matrix::grid::GridTransformer;
use xscreen_matrix::mirror::{self, FrameSource, MirrorOptions};
use xscreen_matrix::pattern::PanelPattern;
use xscreen_matrix::surface::{DrawSurface, FrameBuffer};

/// Mirror an X11 screen region onto chained RGB LED matrix panels
#[derive(Parser)]
#[command(name = "xscreen-matrix")]
#[command(version)]
struct Args {
    /// Update interval in microseconds
    #[arg(short = 'u', long, default_value_t = 10_000, value_parser = clap::value_parser!(u64).range(1..))]
    update_interval: u64,

    /// Screenshot X offset in pixels
    #[arg(short = 'x', long, default_value_t = 0, value_parser = clap::value_parser!(i32).range(0..))]
    x_offset: i32,

    /// Screenshot Y offset in pixels
    #[arg(short = 'y', long, default_value_t = 0, value_parser = clap::value_parser!(i32).range(0..))]
    y_offset: i32,

    /// JSON file describing how panels are chained and rotated.
    /// Without it, panels are assumed to be chained left to right, one row
    /// per parallel chain.
    #[arg(long)]
    grid_config: Option<PathBuf>,

    /// Show the panel identification pattern instead of the screen
    #[arg(long)]
    test_pattern: bool,

    /// Render a single frame to this PNG file instead of the LED matrix
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Brightness (0-100)
    #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u8).range(0..=100))]
    brightness: u8,

    /// Pixel rows per panel
    #[arg(long, default_value_t = 32, value_parser = clap::value_parser!(u32).range(1..=512))]
    led_rows: u32,

    /// Pixel columns per panel
    #[arg(long, default_value_t = 32, value_parser = clap::value_parser!(u32).range(1..=512))]
    led_cols: u32,

    /// Panels daisy-chained on each output line
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..=256))]
    led_chain: u32,

    /// Output lines driven in parallel
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..=6))]
    led_parallel: u32,

    /// GPIO mapping of the driver board
    #[arg(long, default_value = "adafruit-hat")]
    led_gpio_mapping: String,

    /// GPIO slowdown for faster Raspberry Pi models
    #[arg(long, default_value_t = 2)]
    led_slowdown_gpio: u32,
}

impl Args {
    fn matrix_config(&self) -> MatrixConfig {
        MatrixConfig {
            rows: self.led_rows,
            cols: self.led_cols,
            chain_length: self.led_chain,
            parallel: self.led_parallel,
            hardware_mapping: self.led_gpio_mapping.clone(),
            gpio_slowdown: self.led_slowdown_gpio,
        }
    }

    #[cfg_attr(not(feature = "hardware"), allow(dead_code))]
    fn mirror_options(&self) -> MirrorOptions {
        MirrorOptions {
            update_interval: std::time::Duration::from_micros(self.update_interval),
            brightness: self.brightness,
        }
    }
}

// ── Frame sources ────────────────────────────────────────────────────

/// Where frames come from: the live screen or the test pattern.
enum Source {
    Pattern(PanelPattern),
    #[cfg(feature = "capture")]
    Screen(xscreen_matrix::capture::ScreenGrabber),
}

impl FrameSource for Source {
    type Error = Box<dyn Error>;

    fn draw_frame<D: DrawSurface + ?Sized>(&mut self, target: &mut D) -> Result<(), Self::Error> {
        match self {
            Source::Pattern(pattern) => pattern.draw_frame(target).map_err(|never| match never {}),
            #[cfg(feature = "capture")]
            Source::Screen(grabber) => grabber.draw_frame(target).map_err(Into::into),
        }
    }
}

fn open_source<S>(args: &Args, grid: &GridTransformer<'_, S>) -> Result<Source, Box<dyn Error>> {
    if args.test_pattern {
        tracing::info!(
            "Showing panel test pattern on a {}x{} grid",
            grid.columns(),
            grid.rows()
        );
        return Ok(Source::Pattern(PanelPattern::for_grid(grid)));
    }

    // The region is the logical display size; the grid spreads it over the panels.
    let width = (grid.columns() * grid.panel_width()) as u32;
    let height = (grid.rows() * grid.panel_height()) as u32;
    tracing::info!(
        "Screenshot region: x={}, y={}, width={}, height={}",
        args.x_offset,
        args.y_offset,
        width,
        height
    );
    open_screen(args, width, height)
}

#[cfg(feature = "capture")]
fn open_screen(args: &Args, width: u32, height: u32) -> Result<Source, Box<dyn Error>> {
    use xscreen_matrix::capture::{ScreenGrabber, ScreenRegion};

    let grabber = ScreenGrabber::open(ScreenRegion {
        x: args.x_offset,
        y: args.y_offset,
        width,
        height,
    })?;
    Ok(Source::Screen(grabber))
}

#[cfg(not(feature = "capture"))]
fn open_screen(_args: &Args, _width: u32, _height: u32) -> Result<Source, Box<dyn Error>> {
    Err("screen capture requires the 'capture' feature (try --test-pattern)".into())
}

// ── Outputs ──────────────────────────────────────────────────────────

#[cfg(feature = "hardware")]
fn mirror_to_matrix(
    args: &Args,
    matrix_config: &MatrixConfig,
    grid_config: &GridConfig,
) -> Result<(), Box<dyn Error>> {
    use xscreen_matrix::{create_matrix, setup_signal_handler};

    let grid = grid_config.transformer::<rpi_led_matrix::LedCanvas>()?;
    tracing::info!(
        "Panel grid: {} rows x {} columns of {}x{}",
        grid.rows(),
        grid.columns(),
        grid.panel_width(),
        grid.panel_height()
    );

    let mut source = open_source(args, &grid)?;
    let running = setup_signal_handler()?;
    let matrix = create_matrix(matrix_config)?;

    mirror::run(&mut source, &matrix, &grid, &args.mirror_options(), &running)?;
    Ok(())
}

#[cfg(not(feature = "hardware"))]
fn mirror_to_matrix(
    _args: &Args,
    _matrix_config: &MatrixConfig,
    _grid_config: &GridConfig,
) -> Result<(), Box<dyn Error>> {
    Err("driving the LED matrix requires the 'hardware' feature (try --snapshot)".into())
}

fn write_snapshot(
    args: &Args,
    path: &Path,
    matrix_config: &MatrixConfig,
    grid_config: &GridConfig,
) -> Result<(), Box<dyn Error>> {
    let grid = grid_config.transformer::<FrameBuffer>()?;
    let mut source = open_source(args, &grid)?;

    let frame = mirror::snapshot(
        &mut source,
        &grid,
        matrix_config.width() as i32,
        matrix_config.height() as i32,
        args.brightness,
    )?;
    frame.to_image().save(path)?;

    tracing::info!(
        "Wrote {}x{} snapshot to {}",
        frame.width(),
        frame.height(),
        path.display()
    );
    Ok(())
}

fn run(args: &Args) -> Result<(), Box<dyn Error>> {
    let mut matrix_config = args.matrix_config();
    let grid_config = match &args.grid_config {
        Some(path) => {
            let config = GridConfig::load(path)?;
            tracing::info!("Grid config: {}", path.display());
            config.apply_to(&mut matrix_config);
            config
        }
        None => GridConfig::straight_chain(&matrix_config),
    };

    tracing::info!(
        "Update interval: {} microseconds ({:.1} FPS)",
        args.update_interval,
        1_000_000.0 / args.update_interval as f64
    );

    match &args.snapshot {
        Some(path) => write_snapshot(args, path, &matrix_config, &grid_config),
        None => mirror_to_matrix(args, &matrix_config, &grid_config),
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_ansi(false) // Disable ANSI color codes for systemd/journald
        .compact()
        .init();

    let args = Args::parse();
    tracing::info!("X11 screen mirror v{}", env!("CARGO_PKG_VERSION"));

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

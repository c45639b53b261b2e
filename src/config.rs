//! Grid configuration file: how the physical panels are laid out behind
//! the logical display.
//!
//! ```json
//! {
//!   "display_width": 64,
//!   "display_height": 64,
//!   "panel_width": 32,
//!   "panel_height": 32,
//!   "chain_length": 2,
//!   "parallel": 2,
//!   "panels": [
//!     { "order": 0, "rotate": 0,   "parallel": 0 },
//!     { "order": 1, "rotate": 0,   "parallel": 0 },
//!     { "order": 1, "rotate": 180, "parallel": 1 },
//!     { "order": 0, "rotate": 180, "parallel": 1 }
//!   ]
//! }
//! ```
//!
//! `panels` lists one entry per grid cell, row by row from the top left.
//! `chain_length` counts panels on one output line, as the LED driver does.

use crate::MatrixConfig;
use crate::grid::{GridError, GridTransformer, Panel, Rotation};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read grid config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid grid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error(transparent)]
    Grid(#[from] GridError),
}

fn default_parallel() -> u32 {
    1
}

/// Layout of the logical display over the panel chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GridConfig {
    /// Logical display width in pixels
    pub display_width: i32,
    /// Logical display height in pixels
    pub display_height: i32,
    pub panel_width: i32,
    pub panel_height: i32,
    /// Panels on each output line
    pub chain_length: u32,
    /// Output lines driven in parallel
    #[serde(default = "default_parallel")]
    pub parallel: u32,
    /// One entry per grid cell, row-major
    pub panels: Vec<Panel>,
}

impl GridConfig {
    /// Read and parse a JSON grid config. The layout itself is validated
    /// when building the transformer.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// The layout of a chain wired in reading order: every output line is
    /// one row of panels, each mounted upright. Maps every pixel onto itself.
    pub fn straight_chain(matrix: &MatrixConfig) -> Self {
        let panels = (0..matrix.parallel)
            .flat_map(|line| {
                (0..matrix.chain_length).map(move |order| Panel::new(order, Rotation::Deg0, line))
            })
            .collect();

        Self {
            display_width: matrix.width() as i32,
            display_height: matrix.height() as i32,
            panel_width: matrix.cols as i32,
            panel_height: matrix.rows as i32,
            chain_length: matrix.chain_length,
            parallel: matrix.parallel,
            panels,
        }
    }

    /// Total panels across all output lines.
    pub fn panel_count(&self) -> usize {
        self.chain_length as usize * self.parallel as usize
    }

    /// Validate the layout and build an unattached transformer for it.
    pub fn transformer<'a, S: ?Sized>(&self) -> Result<GridTransformer<'a, S>, GridError> {
        GridTransformer::new(
            self.display_width,
            self.display_height,
            self.panel_width,
            self.panel_height,
            self.panel_count(),
            self.panels.clone(),
        )
    }

    /// Size of one panel as the driver sees it, `(cols, rows)`.
    ///
    /// Panels mounted on their side present a swapped cell to the display.
    /// The first panel's mounting decides.
    pub fn physical_panel_size(&self) -> (u32, u32) {
        let width = self.panel_width.max(0) as u32;
        let height = self.panel_height.max(0) as u32;
        match self.panels.first() {
            Some(panel) if panel.rotate.is_quarter_turn() => (height, width),
            _ => (width, height),
        }
    }

    /// Override the driver's panel geometry with this layout's, so the LED
    /// matrix is initialized to match the grid.
    pub fn apply_to(&self, matrix: &mut MatrixConfig) {
        let before = matrix.clone();
        (matrix.cols, matrix.rows) = self.physical_panel_size();
        matrix.chain_length = self.chain_length;
        matrix.parallel = self.parallel;

        if *matrix != before {
            tracing::info!(
                "Grid config sets LED geometry to {}x{} panels, chain {} x parallel {}",
                matrix.cols,
                matrix.rows,
                matrix.chain_length,
                matrix.parallel
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::FrameBuffer;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const TWO_BY_TWO: &str = r#"{
        "display_width": 64,
        "display_height": 64,
        "panel_width": 32,
        "panel_height": 32,
        "chain_length": 2,
        "parallel": 2,
        "panels": [
            { "order": 0, "rotate": 0,   "parallel": 0 },
            { "order": 1, "rotate": 0,   "parallel": 0 },
            { "order": 1, "rotate": 180, "parallel": 1 },
            { "order": 0, "rotate": 180, "parallel": 1 }
        ]
    }"#;

    fn write_config(dir: &TempDir, text: &str) -> PathBuf {
        let path = dir.path().join("grid.json");
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn load_parses_panels() {
        let tmp = TempDir::new().unwrap();
        let config = GridConfig::load(&write_config(&tmp, TWO_BY_TWO)).unwrap();

        assert_eq!(config.panel_count(), 4);
        assert_eq!(config.panels[2], Panel::new(1, Rotation::Deg180, 1));

        let grid = config.transformer::<FrameBuffer>().unwrap();
        assert_eq!((grid.rows(), grid.columns()), (2, 2));
        assert_eq!(grid.map(0, 32), Some((63, 63)));
    }

    #[test]
    fn parallel_defaults_to_one() {
        let config: GridConfig = serde_json::from_str(
            r#"{
                "display_width": 32, "display_height": 16,
                "panel_width": 16, "panel_height": 16,
                "chain_length": 2,
                "panels": [{ "order": 1 }, { "order": 0 }]
            }"#,
        )
        .unwrap();
        assert_eq!(config.parallel, 1);
        assert!(config.transformer::<FrameBuffer>().is_ok());
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let err = GridConfig::load(&tmp.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }), "{err}");
    }

    #[test]
    fn load_rejects_bad_rotation() {
        let tmp = TempDir::new().unwrap();
        let text = TWO_BY_TWO.replace("180", "45");
        let err = GridConfig::load(&write_config(&tmp, &text)).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }), "{err}");
        assert!(err.to_string().contains("unsupported panel rotation 45"));
    }

    #[test]
    fn load_rejects_unknown_fields() {
        let tmp = TempDir::new().unwrap();
        let text = TWO_BY_TWO.replace("\"parallel\": 2,", "\"parallel\": 2, \"brightness\": 50,");
        let err = GridConfig::load(&write_config(&tmp, &text)).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }), "{err}");
    }

    #[test]
    fn inconsistent_layout_fails_at_transformer() {
        let mut config: GridConfig = serde_json::from_str(TWO_BY_TWO).unwrap();
        config.panels.pop();
        let err = config.transformer::<FrameBuffer>().err().unwrap();
        assert_eq!(
            err,
            GridError::PanelCount {
                expected: 4,
                actual: 3
            }
        );
        let wrapped: ConfigError = err.into();
        assert!(wrapped.to_string().starts_with("expected one panel descriptor"));
    }

    #[test]
    fn straight_chain_is_identity() {
        let matrix = MatrixConfig {
            rows: 16,
            cols: 32,
            chain_length: 3,
            parallel: 2,
            ..MatrixConfig::default()
        };
        let config = GridConfig::straight_chain(&matrix);
        assert_eq!(config.panel_count(), 6);
        assert_eq!((config.display_width, config.display_height), (96, 32));

        let grid = config.transformer::<FrameBuffer>().unwrap();
        for (x, y) in [(0, 0), (95, 31), (40, 20), (64, 15), (31, 16)] {
            assert_eq!(grid.map(x, y), Some((x, y)));
        }
    }

    #[test]
    fn apply_to_overrides_geometry_only() {
        let config: GridConfig = serde_json::from_str(TWO_BY_TWO).unwrap();
        let mut matrix = MatrixConfig {
            hardware_mapping: "regular".to_string(),
            ..MatrixConfig::default()
        };
        config.apply_to(&mut matrix);
        assert_eq!(
            matrix,
            MatrixConfig {
                rows: 32,
                cols: 32,
                chain_length: 2,
                parallel: 2,
                hardware_mapping: "regular".to_string(),
                gpio_slowdown: 2,
            }
        );
    }

    #[test]
    fn apply_to_uses_physical_size_of_sideways_panels() {
        let config: GridConfig = serde_json::from_str(
            r#"{
                "display_width": 64, "display_height": 32,
                "panel_width": 32, "panel_height": 32,
                "chain_length": 2,
                "panels": [{ "order": 0, "rotate": 90 }, { "order": 1, "rotate": 90 }]
            }"#,
        )
        .unwrap();
        assert_eq!(config.physical_panel_size(), (32, 32));

        let config = GridConfig {
            display_width: 64,
            display_height: 64,
            panel_width: 32,
            panel_height: 64,
            chain_length: 2,
            parallel: 1,
            panels: vec![
                Panel::new(0, Rotation::Deg270, 0),
                Panel::new(1, Rotation::Deg270, 0),
            ],
        };
        let mut matrix = MatrixConfig::default();
        config.apply_to(&mut matrix);
        assert_eq!((matrix.cols, matrix.rows), (64, 32));
        assert_eq!((matrix.width(), matrix.height()), (128, 32));

        let grid = config.transformer::<FrameBuffer>().unwrap();
        let (x, y) = grid.map(63, 63).unwrap();
        assert!(x < 128 && y < 32, "({x}, {y}) outside the driver canvas");
    }

    #[test]
    fn shipped_sample_configs_are_valid() {
        for text in [
            include_str!("../configs/2x2-parallel.json"),
            include_str!("../configs/3x1-snake.json"),
        ] {
            let config: GridConfig = serde_json::from_str(text).unwrap();
            config.transformer::<FrameBuffer>().unwrap();
        }
    }

    #[test]
    fn round_trips_through_json() {
        let config: GridConfig = serde_json::from_str(TWO_BY_TWO).unwrap();
        let text = serde_json::to_string(&config).unwrap();
        assert!(text.contains("\"rotate\":180"));
        let back: GridConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(back, config);
    }
}

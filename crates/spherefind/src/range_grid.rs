//! Dense range grid produced by a line-scanning rangefinder.
//!
//! Grid coordinate `x` is the scan-line index (the motion axis), `y` is the
//! sample index inside one scan line (the angular axis). Values are distances
//! in millimetres; `0` marks a sample without a valid return.
//!
//! Two on-disk formats are accepted:
//! - JSON following the `spherefind.scan.v1` schema,
//! - a plain text scan log with one scan line per row.

use std::path::Path;

use image::{GrayImage, Luma};

const SCAN_SCHEMA_V1: &str = "spherefind.scan.v1";

/// Sample value used for "no return".
pub const NO_RETURN: u32 = 0;

/// Errors raised while loading a range grid. Always fatal for a detection run.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Underlying file could not be read.
    #[error("failed to read scan log: {0}")]
    Io(#[from] std::io::Error),
    /// JSON payload did not parse.
    #[error("invalid scan JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// JSON payload declared an unknown schema.
    #[error("unsupported scan schema '{found}' (expected '{expected}')")]
    UnsupportedSchema {
        /// Schema string found in the file.
        found: String,
        /// Schema string this loader understands.
        expected: &'static str,
    },
    /// A token in a text scan log is not a distance value.
    #[error("malformed sample '{token}' on line {line}")]
    Malformed {
        /// 1-based line number.
        line: usize,
        /// Offending token.
        token: String,
    },
    /// Scan lines of different length (truncated or corrupted log).
    #[error("scan on line {line} has {got} samples, expected {expected}")]
    Ragged {
        /// 1-based line (or scan) number.
        line: usize,
        /// Sample count of the first scan.
        expected: usize,
        /// Sample count of this scan.
        got: usize,
    },
    /// No scan lines or zero samples per line.
    #[error("scan log contains no samples")]
    Empty,
}

/// Loader options.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    /// Samples above this distance (mm) are stored as [`NO_RETURN`].
    pub max_range_mm: u32,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            max_range_mm: 20_000,
        }
    }
}

#[derive(Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct ScanLogSpecV1 {
    schema: String,
    scans: Vec<Vec<u32>>,
}

/// Immutable grid of distance samples (millimetres).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeGrid {
    width: u32,
    height: u32,
    /// Row-major over `y`, i.e. `data[y * width + x]`.
    data: Vec<u32>,
}

impl RangeGrid {
    /// Build a grid from scan lines (one `Vec` per scan, equal length).
    pub fn from_scans(scans: &[Vec<u32>], max_range_mm: u32) -> Result<Self, LoadError> {
        let first = scans.first().ok_or(LoadError::Empty)?;
        let height = first.len();
        if height == 0 {
            return Err(LoadError::Empty);
        }
        for (i, scan) in scans.iter().enumerate() {
            if scan.len() != height {
                return Err(LoadError::Ragged {
                    line: i + 1,
                    expected: height,
                    got: scan.len(),
                });
            }
        }

        let width = scans.len();
        let mut data = vec![NO_RETURN; width * height];
        for (x, scan) in scans.iter().enumerate() {
            for (y, &mm) in scan.iter().enumerate() {
                data[y * width + x] = if mm > max_range_mm { NO_RETURN } else { mm };
            }
        }

        Ok(Self {
            width: width as u32,
            height: height as u32,
            data,
        })
    }

    /// Build a grid by evaluating `f(x, y)` for every cell.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> u32) -> Self {
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Load a grid from disk, dispatching on the file extension.
    pub fn from_path(path: &Path, config: &LoadConfig) -> Result<Self, LoadError> {
        let raw = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        let grid = if is_json {
            Self::from_json_str(&raw, config)?
        } else {
            Self::from_text_log(&raw, config)?
        };
        tracing::debug!(
            "loaded {}: {} scans x {} samples",
            path.display(),
            grid.width,
            grid.height
        );
        Ok(grid)
    }

    /// Parse the `spherefind.scan.v1` JSON format.
    pub fn from_json_str(raw: &str, config: &LoadConfig) -> Result<Self, LoadError> {
        let spec: ScanLogSpecV1 = serde_json::from_str(raw)?;
        if spec.schema != SCAN_SCHEMA_V1 {
            return Err(LoadError::UnsupportedSchema {
                found: spec.schema,
                expected: SCAN_SCHEMA_V1,
            });
        }
        Self::from_scans(&spec.scans, config.max_range_mm)
    }

    /// Parse a text scan log: one scan per line, integer millimetres
    /// separated by whitespace or commas. `#` starts a comment.
    pub fn from_text_log(raw: &str, config: &LoadConfig) -> Result<Self, LoadError> {
        let mut scans: Vec<Vec<u32>> = Vec::new();
        for (idx, line) in raw.lines().enumerate() {
            let body = line.split('#').next().unwrap_or("").trim();
            if body.is_empty() {
                continue;
            }
            let scan = body
                .split(|c: char| c.is_whitespace() || c == ',')
                .filter(|t| !t.is_empty())
                .map(|t| {
                    t.parse::<u32>().map_err(|_| LoadError::Malformed {
                        line: idx + 1,
                        token: t.to_string(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            if let Some(first) = scans.first() {
                if first.len() != scan.len() {
                    return Err(LoadError::Ragged {
                        line: idx + 1,
                        expected: first.len(),
                        got: scan.len(),
                    });
                }
            }
            scans.push(scan);
        }
        Self::from_scans(&scans, config.max_range_mm)
    }

    /// `(width, height)` = (scan lines, samples per line).
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw sample in millimetres, `None` outside the grid.
    pub fn get(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.data[y as usize * self.width as usize + x as usize])
    }

    /// Sample converted to metres, `None` outside the grid.
    pub fn depth_m(&self, x: u32, y: u32) -> Option<f64> {
        self.get(x, y).map(|mm| mm as f64 / 1000.0)
    }

    /// Number of samples with a valid return.
    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|&&mm| mm != NO_RETURN).count()
    }

    /// Bounded 8-bit view of the grid: `mm / scale_mm`, saturating at 255.
    pub fn intensity_image(&self, scale_mm: u32) -> GrayImage {
        let scale = scale_mm.max(1);
        let mut img = GrayImage::new(self.width, self.height);
        for (i, &mm) in self.data.iter().enumerate() {
            let x = (i % self.width as usize) as u32;
            let y = (i / self.width as usize) as u32;
            img.put_pixel(x, y, Luma([(mm / scale).min(255) as u8]));
        }
        img
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_log_is_indexed_scan_by_sample() {
        let raw = "# two scans, three samples\n100 200 300\n400, 500, 600\n\n";
        let grid = RangeGrid::from_text_log(raw, &LoadConfig::default()).expect("valid log");
        assert_eq!(grid.dimensions(), (2, 3));
        assert_eq!(grid.get(0, 0), Some(100));
        assert_eq!(grid.get(0, 2), Some(300));
        assert_eq!(grid.get(1, 1), Some(500));
        assert_eq!(grid.get(2, 0), None);
        assert_eq!(grid.depth_m(1, 2), Some(0.6));
    }

    #[test]
    fn truncated_scan_is_rejected() {
        let raw = "1 2 3\n4 5\n";
        let err = RangeGrid::from_text_log(raw, &LoadConfig::default()).expect_err("ragged");
        assert!(matches!(
            err,
            LoadError::Ragged {
                line: 2,
                expected: 3,
                got: 2
            }
        ));
    }

    #[test]
    fn garbage_token_is_rejected() {
        let raw = "1 2 3\n4 x 6\n";
        let err = RangeGrid::from_text_log(raw, &LoadConfig::default()).expect_err("malformed");
        assert!(matches!(err, LoadError::Malformed { line: 2, .. }));
    }

    #[test]
    fn empty_log_is_rejected() {
        let err = RangeGrid::from_text_log("# nothing\n", &LoadConfig::default())
            .expect_err("empty");
        assert!(matches!(err, LoadError::Empty));
    }

    #[test]
    fn far_samples_become_no_return() {
        let cfg = LoadConfig { max_range_mm: 1000 };
        let grid = RangeGrid::from_text_log("500 1500\n", &cfg).expect("valid");
        assert_eq!(grid.get(0, 0), Some(500));
        assert_eq!(grid.get(0, 1), Some(NO_RETURN));
        assert_eq!(grid.valid_count(), 1);
    }

    #[test]
    fn json_requires_v1_schema() {
        let raw = r#"{"schema":"spherefind.scan.v0","scans":[[1,2]]}"#;
        let err = RangeGrid::from_json_str(raw, &LoadConfig::default()).expect_err("schema");
        assert!(matches!(err, LoadError::UnsupportedSchema { .. }));

        let raw = r#"{"schema":"spherefind.scan.v1","scans":[[1,2],[3,4]]}"#;
        let grid = RangeGrid::from_json_str(raw, &LoadConfig::default()).expect("valid");
        assert_eq!(grid.get(1, 0), Some(3));
    }

    #[test]
    fn json_rejects_unknown_fields() {
        let raw = r#"{"schema":"spherefind.scan.v1","scans":[[1]],"motion_step":0.01}"#;
        assert!(RangeGrid::from_json_str(raw, &LoadConfig::default()).is_err());
    }

    #[test]
    fn intensity_saturates() {
        let grid = RangeGrid::from_fn(3, 1, |x, _| [0, 500, 5000][x as usize]);
        let img = grid.intensity_image(5);
        assert_eq!(img.get_pixel(0, 0)[0], 0);
        assert_eq!(img.get_pixel(1, 0)[0], 100);
        assert_eq!(img.get_pixel(2, 0)[0], 255);
    }
}

//! Perspective-aware extraction windows.
//!
//! The horizontal axis of the grid is the scanner's linear motion, so a fixed
//! physical size always spans the same number of scan lines. The vertical axis
//! is angular (one sample per `angular_step_deg`), so an object subtends fewer
//! samples the farther away it is.

use super::proposal::Candidate;
use crate::range_grid::{RangeGrid, NO_RETURN};

/// Scanner calibration used to turn grid cells into metric points.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ScanGeometry {
    /// Linear travel between consecutive scan lines (metres).
    pub motion_step_m: f64,
    /// Angle between consecutive samples of one scan line (degrees).
    pub angular_step_deg: f64,
    /// Beam angle of sample 0 (degrees).
    pub angle_offset_deg: f64,
}

impl Default for ScanGeometry {
    fn default() -> Self {
        Self {
            motion_step_m: 0.005,
            angular_step_deg: 1.0,
            angle_offset_deg: 0.0,
        }
    }
}

impl ScanGeometry {
    /// Beam angle of sample row `y` (radians).
    pub fn beam_angle(&self, y: f64) -> f64 {
        (self.angle_offset_deg + y * self.angular_step_deg).to_radians()
    }

    /// Metric point of cell `(x, y)` with range `mm`.
    ///
    /// `x` runs along the motion axis; the beam sweeps the `(y, z)` plane with
    /// angle 0 pointing along `+z`.
    pub fn point(&self, x: u32, y: u32, mm: u32) -> [f64; 3] {
        let r = mm as f64 / 1000.0;
        let a = self.beam_angle(y as f64);
        [x as f64 * self.motion_step_m, r * a.sin(), r * a.cos()]
    }

    /// Fractional scan-line index of a metric `x` coordinate.
    pub fn column_of(&self, x_m: f64) -> f64 {
        x_m / self.motion_step_m
    }

    /// Fractional sample index of a beam angle (radians).
    pub fn row_of(&self, angle_rad: f64) -> f64 {
        (angle_rad.to_degrees() - self.angle_offset_deg) / self.angular_step_deg
    }
}

/// Valid sensing interval for window sizing.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Nearest usable depth (metres).
    pub min_depth_m: f64,
    /// Farthest usable depth (metres).
    pub max_depth_m: f64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            min_depth_m: 0.1,
            max_depth_m: 1.0,
        }
    }
}

/// How touching rectangle edges are treated by [`Window::overlaps`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapConvention {
    /// Windows sharing an edge coordinate overlap.
    #[default]
    TouchingOverlaps,
    /// Windows must share interior cells to overlap.
    TouchingSeparates,
}

/// Axis-aligned window `[x1, x2) × [y1, y2)` in grid coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(into = "WindowCorners", try_from = "WindowCorners")]
pub struct Window {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

/// Serialized window: the four corners, clockwise from `(x1, y1)`.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct WindowCorners {
    pub corners: [[u32; 2]; 4],
}

impl From<Window> for WindowCorners {
    fn from(w: Window) -> Self {
        Self {
            corners: w.corners(),
        }
    }
}

impl TryFrom<WindowCorners> for Window {
    type Error = String;

    fn try_from(c: WindowCorners) -> Result<Self, Self::Error> {
        let xs = c.corners.map(|p| p[0]);
        let ys = c.corners.map(|p| p[1]);
        let x1 = xs.iter().copied().min().unwrap_or(0);
        let x2 = xs.iter().copied().max().unwrap_or(0);
        let y1 = ys.iter().copied().min().unwrap_or(0);
        let y2 = ys.iter().copied().max().unwrap_or(0);
        Window::new(x1, y1, x2, y2).ok_or_else(|| format!("degenerate window corners {:?}", c.corners))
    }
}

impl Window {
    /// Build a window, `None` unless `x1 < x2` and `y1 < y2`.
    pub fn new(x1: u32, y1: u32, x2: u32, y2: u32) -> Option<Self> {
        (x1 < x2 && y1 < y2).then_some(Self { x1, y1, x2, y2 })
    }

    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }

    /// Corner pixels `(x1,y1) (x2,y1) (x2,y2) (x1,y2)`.
    pub fn corners(&self) -> [[u32; 2]; 4] {
        [
            [self.x1, self.y1],
            [self.x2, self.y1],
            [self.x2, self.y2],
            [self.x1, self.y2],
        ]
    }

    /// Separating-axis overlap test; symmetric in its arguments.
    pub fn overlaps(&self, other: &Window, convention: OverlapConvention) -> bool {
        let separated = match convention {
            OverlapConvention::TouchingOverlaps => {
                self.x1 > other.x2
                    || other.x1 > self.x2
                    || self.y1 > other.y2
                    || other.y1 > self.y2
            }
            OverlapConvention::TouchingSeparates => {
                self.x1 >= other.x2
                    || other.x1 >= self.x2
                    || self.y1 >= other.y2
                    || other.y1 >= self.y2
            }
        };
        !separated
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x1 && x < self.x2 && y >= self.y1 && y < self.y2
    }
}

/// Why a candidate produced no window. All variants are silent skips.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum WindowReject {
    /// Candidate position is outside the grid.
    #[error("candidate lies outside the grid")]
    OffGrid,
    /// Depth at the candidate is outside the sensing interval.
    #[error("depth {depth_m:.3} m outside sensing range")]
    OutOfRangeDepth { depth_m: f64 },
    /// Window would cross the grid border.
    #[error("window exceeds grid bounds")]
    OutOfBounds,
    /// Target is smaller than one grid step on some axis.
    #[error("window collapses to zero size")]
    Degenerate,
}

/// Half extents `(hx, hy)` in cells for a target of `target_size_m` at `depth_m`.
///
/// Full extents are `floor(target / motion_step)` and
/// `1 + floor(degrees(target / depth) / angular_step)`; halves truncate.
pub fn window_half_size(target_size_m: f64, depth_m: f64, geometry: &ScanGeometry) -> (u32, u32) {
    // `as` saturates, so huge or infinite extents clamp to `u32::MAX`.
    let full_x = (target_size_m / geometry.motion_step_m).floor().max(0.0) as u32;
    let rows = ((target_size_m / depth_m).to_degrees() / geometry.angular_step_deg)
        .floor()
        .max(0.0) as u32;
    let full_y = rows.saturating_add(1);
    (full_x / 2, full_y / 2)
}

/// Size the extraction window for `candidate`, re-reading its depth.
pub fn size_window(
    candidate: &Candidate,
    grid: &RangeGrid,
    target_size_m: f64,
    geometry: &ScanGeometry,
    config: &WindowConfig,
) -> Result<Window, WindowReject> {
    let depth_m = grid
        .depth_m(candidate.x, candidate.y)
        .ok_or(WindowReject::OffGrid)?;
    if depth_m < config.min_depth_m || depth_m > config.max_depth_m {
        return Err(WindowReject::OutOfRangeDepth { depth_m });
    }

    let (hx, hy) = window_half_size(target_size_m, depth_m, geometry);
    if hx == 0 || hy == 0 {
        return Err(WindowReject::Degenerate);
    }

    let (w, h) = grid.dimensions();
    let (x, y) = (candidate.x, candidate.y);
    let past = |c: u32, half: u32, limit: u32| c.checked_add(half).map_or(true, |e| e > limit);
    if x < hx || y < hy || past(x, hx, w) || past(y, hy, h) {
        return Err(WindowReject::OutOfBounds);
    }
    Window::new(x - hx, y - hy, x + hx, y + hy).ok_or(WindowReject::Degenerate)
}

/// Raw grid values covered by a window.
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    pub window: Window,
    /// Row-major over the window, `values[(y - y1) * width + (x - x1)]`.
    pub values: Vec<u32>,
}

impl Patch {
    /// Iterate `(x, y, mm)` over cells with a valid return, in grid coordinates.
    pub fn valid_cells(&self) -> impl Iterator<Item = (u32, u32, u32)> + '_ {
        let w = self.window.width();
        let (x1, y1) = (self.window.x1, self.window.y1);
        self.values
            .iter()
            .enumerate()
            .filter(|(_, &mm)| mm != NO_RETURN)
            .map(move |(i, &mm)| (x1 + i as u32 % w, y1 + i as u32 / w, mm))
    }

    /// Metric points of all valid cells.
    pub fn points(&self, geometry: &ScanGeometry) -> Vec<[f64; 3]> {
        self.valid_cells()
            .map(|(x, y, mm)| geometry.point(x, y, mm))
            .collect()
    }
}

/// Copy the window's cells out of the grid. The window must lie inside it.
pub fn extract_patch(grid: &RangeGrid, window: Window) -> Patch {
    let mut values = Vec::with_capacity(window.width() as usize * window.height() as usize);
    for y in window.y1..window.y2 {
        for x in window.x1..window.x2 {
            values.push(grid.get(x, y).unwrap_or(NO_RETURN));
        }
    }
    Patch { window, values }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_at(mm: u32) -> RangeGrid {
        RangeGrid::from_fn(200, 180, |_, _| mm)
    }

    #[test]
    fn closer_objects_get_taller_windows() {
        let g = ScanGeometry::default();
        let (hx_near, hy_near) = window_half_size(0.1, 0.5, &g);
        let (hx_far, hy_far) = window_half_size(0.1, 1.0, &g);
        assert_eq!(hx_near, hx_far);
        assert_eq!(hx_near, 10);
        assert_eq!(hy_near, 6);
        assert_eq!(hy_far, 3);
        assert!(hy_near > hy_far);
    }

    #[test]
    fn too_near_candidate_is_skipped_before_sizing() {
        let grid = grid_at(50);
        let err = size_window(
            &Candidate::at(100, 90),
            &grid,
            0.1,
            &ScanGeometry::default(),
            &WindowConfig::default(),
        )
        .expect_err("too near");
        assert!(matches!(err, WindowReject::OutOfRangeDepth { depth_m } if (depth_m - 0.05).abs() < 1e-12));
    }

    #[test]
    fn too_far_and_no_return_are_skipped() {
        let cfg = WindowConfig::default();
        let g = ScanGeometry::default();
        for mm in [0, 1001, 5000] {
            let err = size_window(&Candidate::at(100, 90), &grid_at(mm), 0.1, &g, &cfg)
                .expect_err("out of range");
            assert!(matches!(err, WindowReject::OutOfRangeDepth { .. }));
        }
    }

    #[test]
    fn window_is_centered_and_inside() {
        let grid = grid_at(500);
        let w = size_window(
            &Candidate::at(100, 90),
            &grid,
            0.1,
            &ScanGeometry::default(),
            &WindowConfig::default(),
        )
        .expect("valid window");
        assert_eq!(w, Window { x1: 90, y1: 84, x2: 110, y2: 96 });
        assert!(w.x1 < w.x2 && w.y1 < w.y2);
        assert!(w.x2 <= grid.width() && w.y2 <= grid.height());
    }

    #[test]
    fn windows_crossing_border_are_skipped_not_clamped() {
        let grid = grid_at(500);
        let g = ScanGeometry::default();
        let cfg = WindowConfig::default();
        for (x, y) in [(5, 90), (195, 90), (100, 2), (100, 178)] {
            let err = size_window(&Candidate::at(x, y), &grid, 0.1, &g, &cfg).expect_err("border");
            assert_eq!(err, WindowReject::OutOfBounds);
        }
        // Exactly touching the border is fine.
        let w = size_window(&Candidate::at(10, 6), &grid, 0.1, &g, &cfg).expect("fits");
        assert_eq!((w.x1, w.y1), (0, 0));
        let w = size_window(&Candidate::at(190, 174), &grid, 0.1, &g, &cfg).expect("fits");
        assert_eq!((w.x2, w.y2), (200, 180));
    }

    #[test]
    fn huge_extents_saturate_instead_of_overflowing() {
        let g = ScanGeometry::default();
        let (hx, hy) = window_half_size(1e12, 0.3, &g);
        assert_eq!(hx, u32::MAX / 2);
        assert_eq!(hy, u32::MAX / 2);

        let flat = ScanGeometry {
            angular_step_deg: 0.0,
            motion_step_m: 0.0,
            ..g
        };
        assert_eq!(window_half_size(0.1, 0.3, &flat), (u32::MAX / 2, u32::MAX / 2));

        let grid = grid_at(300);
        let err = size_window(
            &Candidate::at(100, 90),
            &grid,
            1e12,
            &g,
            &WindowConfig::default(),
        )
        .expect_err("cannot fit");
        assert_eq!(err, WindowReject::OutOfBounds);
    }

    #[test]
    fn tiny_target_is_degenerate() {
        let grid = grid_at(500);
        let err = size_window(
            &Candidate::at(100, 90),
            &grid,
            0.004,
            &ScanGeometry::default(),
            &WindowConfig::default(),
        )
        .expect_err("degenerate");
        assert_eq!(err, WindowReject::Degenerate);
    }

    #[test]
    fn overlap_conventions() {
        let a = Window::new(0, 0, 10, 10).expect("valid");
        let touching = Window::new(10, 0, 20, 10).expect("valid");
        let inside = Window::new(2, 2, 4, 4).expect("valid");
        let apart = Window::new(11, 11, 20, 20).expect("valid");

        for conv in [OverlapConvention::TouchingOverlaps, OverlapConvention::TouchingSeparates] {
            assert!(a.overlaps(&inside, conv) && inside.overlaps(&a, conv));
            assert!(!a.overlaps(&apart, conv) && !apart.overlaps(&a, conv));
        }
        assert!(a.overlaps(&touching, OverlapConvention::TouchingOverlaps));
        assert!(touching.overlaps(&a, OverlapConvention::TouchingOverlaps));
        assert!(!a.overlaps(&touching, OverlapConvention::TouchingSeparates));
        assert!(!touching.overlaps(&a, OverlapConvention::TouchingSeparates));
    }

    #[test]
    fn window_serializes_as_corners() {
        let w = Window::new(1, 2, 5, 7).expect("valid");
        let json = serde_json::to_string(&w).expect("serialize");
        assert_eq!(json, r#"{"corners":[[1,2],[5,2],[5,7],[1,7]]}"#);
        let back: Window = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, w);
        assert!(serde_json::from_str::<Window>(r#"{"corners":[[1,2],[1,2],[1,2],[1,2]]}"#).is_err());
    }

    #[test]
    fn patch_keeps_grid_coordinates() {
        let grid = RangeGrid::from_fn(8, 6, |x, y| if x == 3 && y == 2 { 0 } else { 100 * x + y });
        let p = extract_patch(&grid, Window::new(2, 1, 5, 4).expect("valid"));
        assert_eq!(p.values.len(), 9);
        assert_eq!(p.values[0], 201);
        let cells: Vec<_> = p.valid_cells().collect();
        assert_eq!(cells.len(), 8);
        assert!(cells.contains(&(4, 3, 403)));
        assert!(!cells.iter().any(|&(x, y, _)| x == 3 && y == 2));
    }
}

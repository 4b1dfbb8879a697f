//! High-level detection API.
//!
//! [`Detector`] is the primary entry point for finding spheres in a range
//! grid. It wraps a validated [`DetectConfig`] and runs the pipeline with the
//! default depth-band proposals or any caller-supplied [`CandidateSource`].

use crate::detector::{CandidateSource, ConfigError, DenseBandSource, DetectConfig, Detection};
use crate::pipeline::{self, DetectionResult};
use crate::range_grid::RangeGrid;

/// Primary detection interface.
///
/// Create once, detect on many grids.
///
/// # Examples
///
/// ```no_run
/// use spherefind::{Detector, LoadConfig, RangeGrid};
/// use std::path::Path;
///
/// let grid = RangeGrid::from_path(Path::new("scan.txt"), &LoadConfig::default()).unwrap();
/// let detector = Detector::new(0.1).unwrap();
/// let result = detector.detect(&grid);
/// println!("Found {} spheres", result.detections.len());
/// ```
pub struct Detector {
    config: DetectConfig,
}

impl Detector {
    /// Create a detector for objects of `target_size_m` diameter with default
    /// tuning.
    pub fn new(target_size_m: f64) -> Result<Self, ConfigError> {
        Self::with_config(DetectConfig::for_target(target_size_m))
    }

    /// Create with full config control. The config is validated first.
    pub fn with_config(config: DetectConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Access the current configuration.
    pub fn config(&self) -> &DetectConfig {
        &self.config
    }

    /// Mutable access to configuration for post-construction tuning.
    ///
    /// Changes made here are not re-validated.
    pub fn config_mut(&mut self) -> &mut DetectConfig {
        &mut self.config
    }

    /// Detect spheres using one density-peak candidate per depth band.
    pub fn detect(&self, grid: &RangeGrid) -> DetectionResult {
        let mut source =
            DenseBandSource::new(self.config.density.clone(), self.config.target_size_m);
        pipeline::run(grid, &self.config, &mut source)
    }

    /// Detect spheres at the locations produced by `source`.
    ///
    /// Candidates are consumed lazily, in order; earlier candidates win when
    /// accepted windows overlap.
    pub fn detect_with_source(
        &self,
        grid: &RangeGrid,
        source: &mut dyn CandidateSource,
    ) -> DetectionResult {
        pipeline::run(grid, &self.config, source)
    }
}

/// Detect spheres of `target_size_m` diameter with default tuning.
///
/// Returns the deduplicated detections in candidate order.
pub fn detect(
    target_size_m: f64,
    grid: &RangeGrid,
    source: &mut dyn CandidateSource,
) -> Result<Vec<Detection>, ConfigError> {
    let detector = Detector::new(target_size_m)?;
    Ok(detector.detect_with_source(grid, source).detections)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::{FixedCandidates, RegionSource, StrideScanSource, Window};
    use crate::sphere::Sphere;
    use crate::test_utils::{render_scene, render_wall, SCENE_GEOMETRY};
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_4;

    /// One 0.1 m ball 0.45 m out, centered on cell (60, 60).
    fn ball_scene() -> (RangeGrid, Sphere) {
        let ball = Sphere {
            center: [0.3, 0.0, 0.45],
            radius: 0.05,
        };
        (render_scene(120, 120, &SCENE_GEOMETRY, &[ball], None), ball)
    }

    fn scene_config() -> DetectConfig {
        DetectConfig {
            geometry: SCENE_GEOMETRY,
            ..DetectConfig::for_target(0.1)
        }
    }

    fn scene_detector() -> Detector {
        Detector::with_config(scene_config()).expect("valid config")
    }

    fn assert_matches_ball(d: &Detection, ball: &Sphere) {
        for k in 0..3 {
            assert_abs_diff_eq!(d.center()[k], ball.center[k], epsilon = 4e-3);
        }
        assert_abs_diff_eq!(d.radius(), ball.radius, epsilon = 3e-3);
        assert!((d.ratio() - FRAC_PI_4).abs() < 0.1, "ratio {}", d.ratio());
    }

    #[test]
    fn empty_grid_has_no_detections() {
        let grid = RangeGrid::from_fn(80, 60, |_, _| 0);
        let result = Detector::new(0.1).expect("valid").detect(&grid);
        assert!(result.detections.is_empty());
        assert_eq!(result.grid_size, [80, 60]);
        assert_eq!(result.stats.n_candidates, 60);
        assert_eq!(result.stats.n_out_of_range_depth, 60);
    }

    #[test]
    fn dense_bands_find_single_ball() {
        let (grid, ball) = ball_scene();
        let result = scene_detector().detect(&grid);

        assert_eq!(result.detections.len(), 1);
        assert_matches_ball(&result.detections[0], &ball);

        let s = result.stats;
        assert_eq!(s.n_candidates, 60);
        // Bands below the ball's intensity levels see an all-zero map.
        assert!(s.n_out_of_range_depth >= 30);
        assert!(s.n_accepted >= 1);
        assert_eq!(s.n_duplicates, s.n_accepted - 1);
        let skipped = s.n_out_of_range_depth + s.n_out_of_bounds;
        let verified = s.n_degenerate + s.n_rejected + s.n_accepted;
        assert_eq!(skipped + verified, s.n_candidates);
    }

    #[test]
    fn overlapping_candidates_keep_first() {
        let (grid, ball) = ball_scene();
        let mut source = FixedCandidates::new([[60, 60], [62, 60]]);
        let result = scene_detector().detect_with_source(&grid, &mut source);

        assert_eq!(result.stats.n_accepted, 2);
        assert_eq!(result.stats.n_duplicates, 1);
        assert_eq!(result.detections.len(), 1);
        let d = &result.detections[0];
        assert_eq!(d.window, Window::new(50, 53, 70, 67).expect("valid"));
        assert_eq!(d.fit.seed, 42);
        assert_matches_ball(d, &ball);
    }

    #[test]
    fn too_near_candidate_is_skipped() {
        let (scene, _) = ball_scene();
        let grid = RangeGrid::from_fn(120, 120, |x, y| {
            if (x, y) == (30, 30) {
                50
            } else {
                scene.get(x, y).unwrap_or(0)
            }
        });
        let mut source = FixedCandidates::new([[30, 30], [60, 60]]);
        let result = scene_detector().detect_with_source(&grid, &mut source);

        assert_eq!(result.stats.n_out_of_range_depth, 1);
        assert_eq!(result.detections.len(), 1);
        // Second candidate still gets its own index-derived seed.
        assert_eq!(result.detections[0].fit.seed, 43);
    }

    #[test]
    fn border_candidate_is_skipped_not_clamped() {
        // A wall along the first scan lines puts a valid depth at the border.
        let (scene, _) = ball_scene();
        let grid = RangeGrid::from_fn(120, 120, |x, y| {
            if x < 10 {
                450
            } else {
                scene.get(x, y).unwrap_or(0)
            }
        });
        let mut source = FixedCandidates::new([[3, 60]]);
        let result = scene_detector().detect_with_source(&grid, &mut source);
        assert_eq!(result.stats.n_out_of_bounds, 1);
        assert!(result.detections.is_empty());
    }

    #[test]
    fn stride_source_detections_are_disjoint() {
        let (grid, ball) = ball_scene();
        let mut source = StrideScanSource::new(15);
        let result = scene_detector().detect_with_source(&grid, &mut source);

        assert!(!result.detections.is_empty());
        for (i, a) in result.detections.iter().enumerate() {
            assert_matches_ball(a, &ball);
            for b in &result.detections[i + 1..] {
                assert!(!a.window.overlaps(&b.window, Default::default()));
            }
        }
    }

    #[test]
    fn region_source_finds_ball() {
        let (grid, ball) = ball_scene();
        let config = scene_config();
        let mut source = RegionSource::from_config(&config);
        let result = scene_detector().detect_with_source(&grid, &mut source);

        assert_eq!(result.detections.len(), 1);
        assert_matches_ball(&result.detections[0], &ball);
    }

    #[test]
    fn flat_wall_is_not_a_sphere() {
        let grid = render_wall(120, 120, &SCENE_GEOMETRY, 0.45);
        let mut source = FixedCandidates::new([[30, 60], [60, 60], [90, 60]]);
        let result = scene_detector().detect_with_source(&grid, &mut source);

        assert!(result.detections.is_empty());
        assert_eq!(result.stats.n_degenerate, 3);
        assert_eq!(result.stats.n_accepted, 0);
    }

    #[test]
    fn huge_target_is_skipped_without_panicking() {
        let grid = RangeGrid::from_fn(50, 50, |_, _| 300);
        let mut source = FixedCandidates::new([[25, 25]]);
        let result = Detector::new(1e12)
            .expect("finite positive target")
            .detect_with_source(&grid, &mut source);
        assert!(result.detections.is_empty());
        assert_eq!(result.stats.n_out_of_bounds, 1);
    }

    #[test]
    fn invalid_configs_are_rejected_up_front() {
        assert!(Detector::new(0.0).is_err());
        assert!(Detector::new(f64::NAN).is_err());
        let mut cfg = scene_config();
        cfg.geometry.angular_step_deg = 0.0;
        assert!(Detector::with_config(cfg).is_err());

        let grid = RangeGrid::from_fn(10, 10, |_, _| 300);
        let mut source = FixedCandidates::new([[5, 5]]);
        assert!(detect(-0.1, &grid, &mut source).is_err());
    }

    #[test]
    fn free_detect_matches_detector() {
        let grid = RangeGrid::from_fn(50, 50, |_, _| 300);
        let mut a = FixedCandidates::new([[25, 25]]);
        let mut b = FixedCandidates::new([[25, 25]]);
        let free = detect(0.1, &grid, &mut a).expect("valid target");
        let full = Detector::new(0.1)
            .expect("valid target")
            .detect_with_source(&grid, &mut b);
        assert_eq!(free, full.detections);
    }

    #[test]
    fn detector_config_mut() {
        let mut det = Detector::new(0.1).expect("valid target");
        det.config_mut().acceptance.tolerance = 0.05;
        assert_eq!(det.config().acceptance.tolerance, 0.05);
        assert_eq!(det.config().target_size_m, 0.1);
    }
}

use std::path::Path;

use crate::range_grid::LoadConfig;
use crate::sphere::SphereRansacConfig;

use super::proposal::{DensityConfig, RegionConfig};
use super::window::{OverlapConvention, ScanGeometry, WindowConfig};

const MAX_KERNEL_SIZE: u32 = 1024;

/// Invalid detector configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Invalid(String),
}

/// Fitness acceptance band around the ideal footprint ratio.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AcceptanceConfig {
    /// Ratio of an ideal one-sided sphere view (π/4).
    pub ideal_ratio: f64,
    /// Accepted half-width around `ideal_ratio` (exclusive).
    pub tolerance: f64,
}

impl Default for AcceptanceConfig {
    fn default() -> Self {
        Self {
            ideal_ratio: std::f64::consts::FRAC_PI_4,
            tolerance: 0.1,
        }
    }
}

impl AcceptanceConfig {
    /// `true` when `ratio` lies strictly inside `(ideal - tol, ideal + tol)`.
    pub fn accepts(&self, ratio: f64) -> bool {
        self.ideal_ratio - self.tolerance < ratio && ratio < self.ideal_ratio + self.tolerance
    }
}

/// Top-level detection configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DetectConfig {
    /// Expected object diameter (metres).
    pub target_size_m: f64,
    /// Scanner calibration.
    pub geometry: ScanGeometry,
    /// Loader options used by front ends.
    pub load: LoadConfig,
    /// Depth-band density proposals.
    pub density: DensityConfig,
    /// Connected-region proposal filters.
    pub region: RegionConfig,
    /// Sensing interval for window sizing.
    pub window: WindowConfig,
    /// RANSAC sphere fit parameters.
    pub sphere: SphereRansacConfig,
    /// Fitness acceptance band.
    pub acceptance: AcceptanceConfig,
    /// Overlap boundary convention used by dedup.
    pub overlap: OverlapConvention,
}

impl Default for DetectConfig {
    fn default() -> Self {
        Self {
            target_size_m: 0.1,
            geometry: ScanGeometry::default(),
            load: LoadConfig::default(),
            density: DensityConfig::default(),
            region: RegionConfig::default(),
            window: WindowConfig::default(),
            sphere: SphereRansacConfig::default(),
            acceptance: AcceptanceConfig::default(),
            overlap: OverlapConvention::default(),
        }
    }
}

impl DetectConfig {
    /// Default configuration for objects of `target_size_m` diameter.
    pub fn for_target(target_size_m: f64) -> Self {
        Self {
            target_size_m,
            ..Self::default()
        }
    }

    /// Load a configuration from JSON; missing fields take defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check parameter consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fail = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));
        if !self.target_size_m.is_finite() || self.target_size_m <= 0.0 {
            return fail("target_size_m must be finite and > 0");
        }
        if !self.geometry.motion_step_m.is_finite() || self.geometry.motion_step_m <= 0.0 {
            return fail("geometry.motion_step_m must be finite and > 0");
        }
        if !self.geometry.angular_step_deg.is_finite() || self.geometry.angular_step_deg <= 0.0 {
            return fail("geometry.angular_step_deg must be finite and > 0");
        }
        if !(self.window.min_depth_m > 0.0 && self.window.min_depth_m < self.window.max_depth_m) {
            return fail("window depth range must satisfy 0 < min_depth_m < max_depth_m");
        }
        if self.density.level_min >= self.density.level_max {
            return fail("density.level_min must be < density.level_max");
        }
        if self.density.kernel_size == 0 || self.density.intensity_scale_mm == 0 {
            return fail("density.kernel_size and density.intensity_scale_mm must be >= 1");
        }
        if self.density.kernel_size > MAX_KERNEL_SIZE {
            return fail("density.kernel_size must be <= 1024");
        }
        let r = &self.region;
        if !(r.width_tolerance_m > 0.0) || r.min_area > r.max_area {
            return fail("region needs width_tolerance_m > 0 and min_area <= max_area");
        }
        let s = &self.sphere;
        if !(s.min_radius > 0.0 && s.min_radius <= s.max_radius) {
            return fail("sphere radius bounds must satisfy 0 < min_radius <= max_radius");
        }
        if !(s.max_dist > 0.0) {
            return fail("sphere.max_dist must be > 0");
        }
        if s.num_iter == 0 {
            return fail("sphere.num_iter must be >= 1");
        }
        if !(self.acceptance.tolerance > 0.0) {
            return fail("acceptance.tolerance must be > 0");
        }
        Ok(())
    }
}

//! Sphere model, fitting parameters and results.

use serde::{Deserialize, Serialize};

// ── Errors ─────────────────────────────────────────────────────────────────

/// The patch could not be explained by any radius-bounded sphere.
///
/// This is an expected outcome and maps to a fitness ratio of 0.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DegenerateFit {
    /// Fewer points than a minimal sample.
    #[error("too few points: need {needed}, got {got}")]
    TooFewPoints {
        /// Required minimum number of points.
        needed: usize,
        /// Provided number of points.
        got: usize,
    },
    /// Every minimal sample was coplanar or out of the radius bounds.
    #[error("no radius-bounded sphere found in {iterations} iterations")]
    NoValidSphere {
        /// Iterations spent.
        iterations: usize,
    },
    /// A plane explains the patch at least as well as the best sphere.
    #[error("patch is planar: plane keeps {plane_inliers} inliers, sphere {sphere_inliers}")]
    Planar {
        /// Points within `max_dist` of the least-squares plane.
        plane_inliers: usize,
        /// Inliers of the best sphere.
        sphere_inliers: usize,
    },
}

// ── Model ──────────────────────────────────────────────────────────────────

/// Sphere in metric scanner coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sphere {
    /// Center (metres).
    pub center: [f64; 3],
    /// Radius (metres).
    pub radius: f64,
}

impl Sphere {
    /// Absolute distance from `p` to the sphere surface.
    pub fn surface_distance(&self, p: &[f64; 3]) -> f64 {
        let dx = p[0] - self.center[0];
        let dy = p[1] - self.center[1];
        let dz = p[2] - self.center[2];
        ((dx * dx + dy * dy + dz * dz).sqrt() - self.radius).abs()
    }

    pub fn is_valid(&self) -> bool {
        self.radius > 0.0 && self.radius.is_finite() && self.center.iter().all(|c| c.is_finite())
    }

    /// Sample `n_lat * n_lon` points on the hemisphere facing `-z`.
    pub fn sample_front_points(&self, n_lat: usize, n_lon: usize) -> Vec<[f64; 3]> {
        let mut pts = Vec::with_capacity(n_lat * n_lon);
        for i in 0..n_lat {
            let polar = (i as f64 + 0.5) / n_lat as f64 * std::f64::consts::FRAC_PI_2;
            for j in 0..n_lon {
                let az = j as f64 / n_lon as f64 * std::f64::consts::TAU;
                pts.push([
                    self.center[0] + self.radius * polar.sin() * az.cos(),
                    self.center[1] + self.radius * polar.sin() * az.sin(),
                    self.center[2] - self.radius * polar.cos(),
                ]);
            }
        }
        pts
    }
}

/// Plane through `point` with unit `normal`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    pub point: [f64; 3],
    pub normal: [f64; 3],
}

impl Plane {
    /// Absolute distance from `p` to the plane.
    pub fn distance(&self, p: &[f64; 3]) -> f64 {
        (0..3)
            .map(|k| (p[k] - self.point[k]) * self.normal[k])
            .sum::<f64>()
            .abs()
    }
}

// ── Configuration ──────────────────────────────────────────────────────────

/// Configuration for RANSAC sphere fitting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SphereRansacConfig {
    /// Smallest accepted radius (metres).
    pub min_radius: f64,
    /// Largest accepted radius (metres).
    pub max_radius: f64,
    /// Inlier threshold: distance to the surface (metres).
    pub max_dist: f64,
    /// Number of minimal samples drawn.
    pub num_iter: usize,
    /// Base RNG seed.
    pub seed: u64,
}

impl Default for SphereRansacConfig {
    fn default() -> Self {
        Self {
            min_radius: 0.03,
            max_radius: 0.15,
            max_dist: 0.01,
            num_iter: 100,
            seed: 42,
        }
    }
}

impl SphereRansacConfig {
    pub fn radius_in_bounds(&self, r: f64) -> bool {
        r >= self.min_radius && r <= self.max_radius
    }
}

// ── Results ────────────────────────────────────────────────────────────────

/// Outcome of the RANSAC stage on a point set.
#[derive(Debug, Clone)]
pub struct RansacSphere {
    /// Refined sphere.
    pub sphere: Sphere,
    /// Inlier mask over the input points for `sphere`.
    pub inliers: Vec<bool>,
    /// Number of `true` entries in `inliers`.
    pub num_inliers: usize,
    /// Whether the least-squares refit replaced the best minimal sphere.
    pub refined: bool,
}

/// Verified sphere for one patch, with the parameters that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SphereFit {
    /// Center (metres).
    pub center: [f64; 3],
    /// Radius (metres).
    pub radius: f64,
    /// Inliers over footprint cells; π/4 for an ideal front view.
    pub ratio: f64,
    /// Number of inlier points.
    pub num_inliers: usize,
    /// Number of valid points in the patch.
    pub num_points: usize,
    /// Patch cells inside the projected sphere footprint.
    pub footprint_cells: usize,
    /// RNG seed used for sampling.
    pub seed: u64,
    /// Iteration budget used for sampling.
    pub iterations: usize,
}

impl SphereFit {
    pub fn sphere(&self) -> Sphere {
        Sphere {
            center: self.center,
            radius: self.radius,
        }
    }
}

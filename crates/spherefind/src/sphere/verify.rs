//! Patch-level sphere verification and the fitness ratio.
//!
//! The ratio compares the number of inliers with the number of patch cells
//! covered by the fitted sphere's bounding rectangle in grid space. A clean
//! one-sided view of a sphere fills an inscribed disc, so the ratio tends to
//! π/4; edges and clutter land far from it. Patches that a plane explains at
//! least as well as the sphere are rejected before scoring.

use rand::rngs::StdRng;
use rand::SeedableRng;

use super::fit::fit_plane_lsq;
use super::ransac::fit_sphere_ransac;
use super::types::{DegenerateFit, Sphere, SphereFit, SphereRansacConfig};
use crate::detector::window::{Patch, ScanGeometry, Window};

/// Slack on footprint borders so that cells exactly on the tangent survive
/// rounding in the fitted center.
const FOOTPRINT_EPS: f64 = 1e-9;

/// Inclusive integer range `[ceil(lo), floor(hi)]` clipped to `[min, max)`.
fn clip_span(lo: f64, hi: f64, min: u32, max: u32) -> usize {
    let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
    let first = (lo - FOOTPRINT_EPS).ceil().max(min as f64);
    let last = (hi + FOOTPRINT_EPS).floor().min(max as f64 - 1.0);
    if !first.is_finite() || !last.is_finite() || last < first {
        return 0;
    }
    (last - first) as usize + 1
}

/// Number of window cells inside the sphere's projected bounding rectangle.
///
/// Columns span `center.x ± r` along the motion axis; rows span the beam
/// angles tangent to the sphere as seen from the scan axis.
pub fn footprint_cells(sphere: &Sphere, window: &Window, geometry: &ScanGeometry) -> usize {
    let [cx, cy, cz] = sphere.center;
    let r = sphere.radius;

    let cols = clip_span(
        geometry.column_of(cx - r),
        geometry.column_of(cx + r),
        window.x1,
        window.x2,
    );

    let axis_dist = (cy * cy + cz * cz).sqrt();
    let half_angle = if axis_dist > r {
        (r / axis_dist).asin()
    } else {
        std::f64::consts::FRAC_PI_2
    };
    let center_angle = cy.atan2(cz);
    let rows = clip_span(
        geometry.row_of(center_angle - half_angle),
        geometry.row_of(center_angle + half_angle),
        window.y1,
        window.y2,
    );

    cols * rows
}

/// Fit a sphere to `patch` and score how sphere-like its footprint is.
///
/// Fails with [`DegenerateFit::Planar`] when the least-squares plane keeps at
/// least as many points within `max_dist` as the best sphere.
///
/// Sampling is driven by `StdRng::seed_from_u64(seed)`, so repeated calls
/// with the same inputs return identical fits.
pub fn verify_patch(
    patch: &Patch,
    geometry: &ScanGeometry,
    config: &SphereRansacConfig,
    seed: u64,
) -> Result<SphereFit, DegenerateFit> {
    let points = patch.points(geometry);
    let mut rng = StdRng::seed_from_u64(seed);
    let fit = fit_sphere_ransac(&points, config, &mut rng)?;

    if let Some(plane) = fit_plane_lsq(&points) {
        let plane_inliers = points
            .iter()
            .filter(|p| plane.distance(p) <= config.max_dist)
            .count();
        if plane_inliers >= fit.num_inliers {
            return Err(DegenerateFit::Planar {
                plane_inliers,
                sphere_inliers: fit.num_inliers,
            });
        }
    }

    let footprint = footprint_cells(&fit.sphere, &patch.window, geometry);
    let ratio = if footprint == 0 {
        0.0
    } else {
        fit.num_inliers as f64 / footprint as f64
    };

    Ok(SphereFit {
        center: fit.sphere.center,
        radius: fit.sphere.radius,
        ratio,
        num_inliers: fit.num_inliers,
        num_points: points.len(),
        footprint_cells: footprint,
        seed,
        iterations: config.num_iter,
    })
}

/// Fitness ratio of a verification outcome; degenerate fits score 0.
pub fn fitness_ratio(outcome: &Result<SphereFit, DegenerateFit>) -> f64 {
    outcome.as_ref().map_or(0.0, |f| f.ratio)
}

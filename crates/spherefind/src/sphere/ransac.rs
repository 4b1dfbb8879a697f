//! RANSAC wrapper for outlier-robust sphere fitting.

use rand::Rng;

use super::fit::{fit_sphere_lsq, sphere_from_four_points};
use super::types::{DegenerateFit, RansacSphere, Sphere, SphereRansacConfig};

const SAMPLE_SIZE: usize = 4;

fn inlier_mask(points: &[[f64; 3]], sphere: &Sphere, max_dist: f64) -> (Vec<bool>, usize) {
    let mask: Vec<bool> = points
        .iter()
        .map(|p| sphere.surface_distance(p) <= max_dist)
        .collect();
    let count = mask.iter().filter(|&&m| m).count();
    (mask, count)
}

/// Fit a sphere robustly using RANSAC.
///
/// Draws `num_iter` 4-point samples, solves each in closed form, discards
/// spheres outside `[min_radius, max_radius]` and keeps the one with the most
/// inliers. The winner is re-fit by least squares on its inliers; the refit is
/// kept only when it stays within the radius bounds and does not lose inliers.
pub fn fit_sphere_ransac<R: Rng>(
    points: &[[f64; 3]],
    config: &SphereRansacConfig,
    rng: &mut R,
) -> Result<RansacSphere, DegenerateFit> {
    let n = points.len();
    if n < SAMPLE_SIZE {
        return Err(DegenerateFit::TooFewPoints {
            needed: SAMPLE_SIZE,
            got: n,
        });
    }

    let mut best: Option<(Sphere, Vec<bool>, usize)> = None;

    for _ in 0..config.num_iter {
        let sample = sample_indices(rng, n, SAMPLE_SIZE);
        let quad = [
            points[sample[0]],
            points[sample[1]],
            points[sample[2]],
            points[sample[3]],
        ];
        let Some(sphere) = sphere_from_four_points(&quad) else {
            continue;
        };
        if !config.radius_in_bounds(sphere.radius) {
            continue;
        }

        let (mask, count) = inlier_mask(points, &sphere, config.max_dist);
        if best.as_ref().map_or(true, |(_, _, c)| count > *c) {
            best = Some((sphere, mask, count));
        }
    }

    let Some((best_sphere, best_mask, best_count)) = best else {
        return Err(DegenerateFit::NoValidSphere {
            iterations: config.num_iter,
        });
    };

    let inlier_pts: Vec<[f64; 3]> = best_mask
        .iter()
        .zip(points.iter())
        .filter(|(&m, _)| m)
        .map(|(_, &p)| p)
        .collect();

    if let Some(refit) = fit_sphere_lsq(&inlier_pts).filter(|s| config.radius_in_bounds(s.radius)) {
        let (mask, count) = inlier_mask(points, &refit, config.max_dist);
        if count >= best_count {
            return Ok(RansacSphere {
                sphere: refit,
                inliers: mask,
                num_inliers: count,
                refined: true,
            });
        }
    }

    Ok(RansacSphere {
        sphere: best_sphere,
        inliers: best_mask,
        num_inliers: best_count,
        refined: false,
    })
}

/// Sample `k` distinct indices from `0..n` using Fisher–Yates partial shuffle.
fn sample_indices<R: Rng>(rng: &mut R, n: usize, k: usize) -> Vec<usize> {
    debug_assert!(k <= n);
    let mut indices: Vec<usize> = (0..n).collect();
    for i in 0..k {
        let j = rng.gen_range(i..n);
        indices.swap(i, j);
    }
    indices.truncate(k);
    indices
}

//! Closed-form and least-squares sphere fits.

use nalgebra::{Matrix3, Matrix4, Vector3, Vector4};

use super::types::{Plane, Sphere};

/// Relative volume below which a 4-point sample counts as coplanar.
const COPLANAR_EPS: f64 = 1e-9;

/// Sphere through four points, `None` when they are (nearly) coplanar.
///
/// Solves `2 (pᵢ − p₀) · (c − p₀) = |pᵢ − p₀|²` for `i = 1..3`.
pub fn sphere_from_four_points(p: &[[f64; 3]; 4]) -> Option<Sphere> {
    let p0 = Vector3::from(p[0]);
    let a1 = Vector3::from(p[1]) - p0;
    let a2 = Vector3::from(p[2]) - p0;
    let a3 = Vector3::from(p[3]) - p0;

    let scale = a1.norm().max(a2.norm()).max(a3.norm());
    if scale <= 0.0 || !scale.is_finite() {
        return None;
    }

    let m = Matrix3::from_rows(&[a1.transpose(), a2.transpose(), a3.transpose()]);
    let det = m.determinant();
    if det.abs() <= COPLANAR_EPS * scale * scale * scale {
        return None;
    }

    let b = Vector3::new(a1.norm_squared(), a2.norm_squared(), a3.norm_squared()) * 0.5;
    let rel = m.try_inverse()? * b;
    let sphere = Sphere {
        center: (p0 + rel).into(),
        radius: rel.norm(),
    };
    sphere.is_valid().then_some(sphere)
}

/// Centroid and isotropic scale that bring the mean distance from the
/// centroid to √3.
fn normalization_params(points: &[[f64; 3]]) -> (Vector3<f64>, f64) {
    let n = points.len() as f64;
    let mean = points
        .iter()
        .fold(Vector3::zeros(), |acc, p| acc + Vector3::from(*p))
        / n;
    let mean_dist = points
        .iter()
        .map(|p| (Vector3::from(*p) - mean).norm())
        .sum::<f64>()
        / n;
    let scale = if mean_dist > 1e-15 {
        3f64.sqrt() / mean_dist
    } else {
        1.0
    };
    (mean, scale)
}

/// Algebraic least-squares sphere fit.
///
/// Minimizes `Σ (|p|² − 2 c·p − k)²` with `k = r² − |c|²` on normalized
/// coordinates. Requires at least 4 non-coplanar points.
pub fn fit_sphere_lsq(points: &[[f64; 3]]) -> Option<Sphere> {
    if points.len() < 4 {
        return None;
    }
    let (mean, scale) = normalization_params(points);

    let mut ata = Matrix4::<f64>::zeros();
    let mut atb = Vector4::<f64>::zeros();
    for p in points {
        let q = (Vector3::from(*p) - mean) * scale;
        let row = Vector4::new(2.0 * q.x, 2.0 * q.y, 2.0 * q.z, 1.0);
        let rhs = q.norm_squared();
        ata += row * row.transpose();
        atb += row * rhs;
    }

    let sol = ata.cholesky()?.solve(&atb);
    let c = Vector3::new(sol[0], sol[1], sol[2]);
    let r2 = sol[3] + c.norm_squared();
    if !(r2 > 0.0) {
        return None;
    }

    let sphere = Sphere {
        center: (mean + c / scale).into(),
        radius: r2.sqrt() / scale,
    };
    sphere.is_valid().then_some(sphere)
}

/// Total least-squares plane: through the centroid, normal along the
/// direction of least scatter. Requires at least 3 points.
pub fn fit_plane_lsq(points: &[[f64; 3]]) -> Option<Plane> {
    if points.len() < 3 {
        return None;
    }
    let n = points.len() as f64;
    let mean = points
        .iter()
        .fold(Vector3::zeros(), |acc, p| acc + Vector3::from(*p))
        / n;

    let mut scatter = Matrix3::<f64>::zeros();
    for p in points {
        let d = Vector3::from(*p) - mean;
        scatter += d * d.transpose();
    }

    let eig = scatter.symmetric_eigen();
    let normal = eig.eigenvectors.column(eig.eigenvalues.imin()).normalize();
    if !normal.iter().all(|v| v.is_finite()) {
        return None;
    }
    Some(Plane {
        point: mean.into(),
        normal: normal.into(),
    })
}

//! Synthetic range scenes for unit tests and benches.

use crate::detector::window::{Patch, ScanGeometry, Window};
use crate::range_grid::{RangeGrid, NO_RETURN};
use crate::sphere::Sphere;

/// Geometry whose sample row 6 looks straight along `+z`.
pub(crate) const FRONT_SPHERE_GEOMETRY: ScanGeometry = ScanGeometry {
    motion_step_m: 0.005,
    angular_step_deg: 1.0,
    angle_offset_deg: -6.0,
};

/// Geometry whose sample row 60 looks straight along `+z`.
pub(crate) const SCENE_GEOMETRY: ScanGeometry = ScanGeometry {
    motion_step_m: 0.005,
    angular_step_deg: 1.0,
    angle_offset_deg: -60.0,
};

/// Range (mm) seen by cell `(x, y)` when `sphere` is in front of an optional
/// flat background at `background_mm`.
pub(crate) fn ray_cast_mm(
    geometry: &ScanGeometry,
    spheres: &[Sphere],
    x: u32,
    y: u32,
    background_mm: Option<u32>,
) -> u32 {
    let ox = x as f64 * geometry.motion_step_m;
    let angle = geometry.beam_angle(y as f64);
    let (dir_y, dir_z) = (angle.sin(), angle.cos());

    let mut nearest: Option<f64> = None;
    for s in spheres {
        let [cx, cy, cz] = s.center;
        let dx = cx - ox;
        let proj = cy * dir_y + cz * dir_z;
        let disc = proj * proj - (dx * dx + cy * cy + cz * cz - s.radius * s.radius);
        if disc < 0.0 {
            continue;
        }
        let t = proj - disc.sqrt();
        if t > 0.0 && nearest.map_or(true, |n| t < n) {
            nearest = Some(t);
        }
    }

    match nearest {
        Some(t) => (t * 1000.0).round() as u32,
        None => background_mm.unwrap_or(NO_RETURN),
    }
}

/// Render a full grid with `spheres` in front of an optional background.
pub(crate) fn render_scene(
    width: u32,
    height: u32,
    geometry: &ScanGeometry,
    spheres: &[Sphere],
    background_mm: Option<u32>,
) -> RangeGrid {
    RangeGrid::from_fn(width, height, |x, y| {
        ray_cast_mm(geometry, spheres, x, y, background_mm)
    })
}

/// Render a flat wall parallel to the scan axis at `distance_m` along `+z`.
/// Beams pointing away from the wall get no return.
pub(crate) fn render_wall(
    width: u32,
    height: u32,
    geometry: &ScanGeometry,
    distance_m: f64,
) -> RangeGrid {
    RangeGrid::from_fn(width, height, |_, y| {
        let c = geometry.beam_angle(y as f64).cos();
        if c > 1e-6 {
            (distance_m / c * 1000.0).round() as u32
        } else {
            NO_RETURN
        }
    })
}

/// Patch holding a clean front view of one sphere of `radius` at axis
/// distance `distance`, framed by its bounding rectangle
/// (21 scan lines x 13 samples for r = 0.05 m at 0.45 m).
pub(crate) fn front_sphere_patch(
    radius: f64,
    distance: f64,
    background_mm: Option<u32>,
) -> (Patch, Sphere) {
    let g = FRONT_SPHERE_GEOMETRY;
    let sphere = Sphere {
        center: [radius, 0.0, distance],
        radius,
    };
    let cols = (2.0 * radius / g.motion_step_m).round() as u32 + 1;
    let half_rows = (radius / distance).asin().to_degrees().floor() as u32;
    let rows = 2 * half_rows + 1;
    // FRONT_SPHERE_GEOMETRY puts the straight-ahead beam on row 6.
    debug_assert_eq!(half_rows, 6);

    let window = Window::new(0, 0, cols, rows).expect("non-empty window");
    let mut values = Vec::with_capacity((cols * rows) as usize);
    for y in 0..rows {
        for x in 0..cols {
            values.push(ray_cast_mm(&g, &[sphere], x, y, background_mm));
        }
    }
    (Patch { window, values }, sphere)
}

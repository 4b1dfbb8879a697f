//! Sphere fitting primitives.
//!
//! Implements:
//! - Closed-form sphere through four non-coplanar points.
//! - Algebraic least-squares sphere fit on normalized coordinates.
//! - Least-squares plane fit used to reject flat patches.
//! - RANSAC wrapper with radius bounds and least-squares refinement.
//! - Patch verification producing the footprint fitness ratio.

mod fit;
mod ransac;
mod types;
mod verify;

pub use fit::{fit_plane_lsq, fit_sphere_lsq, sphere_from_four_points};
pub use ransac::fit_sphere_ransac;
pub use types::{DegenerateFit, Plane, RansacSphere, Sphere, SphereFit, SphereRansacConfig};
pub use verify::{fitness_ratio, footprint_cells, verify_patch};

//! spherefind — sphere detection in dense 3D range scans.
//!
//! A scanning rangefinder sweeps a fan of beams while moving along a straight
//! axis, producing a grid of range samples in millimetres. The pipeline
//! stages are:
//!
//! 1. **Density** – quantize depth to intensity levels and count, per cell,
//!    how many neighbours fall inside a depth band.
//! 2. **Proposal** – one candidate per band (the density peak), the centers
//!    of target-wide connected band regions, or any other [`CandidateSource`].
//! 3. **Window** – size a grid window from the candidate's own depth so it
//!    covers one target-sized object, then crop the patch.
//! 4. **Sphere** – RANSAC sphere fit on the patch points, a plane check that
//!    rejects flat patches, and the footprint fitness ratio.
//! 5. **Acceptance & dedup** – keep fits whose ratio is near π/4, drop later
//!    detections whose windows overlap an earlier one.
//!
//! # Public API
//! - [`Detector`] and the free [`detect`] function as entry points
//! - [`DetectConfig`] for tuning
//! - [`RangeGrid`] loading and the candidate-source trait
//! - low-level fitting primitives for tools and benches

mod api;
mod detector;
mod pipeline;
mod range_grid;
mod sphere;

#[cfg(test)]
mod test_utils;

pub use api::{detect, Detector};
pub use detector::{
    band_density, band_mask, box_sum, dedup_detections, density_peak, extract_patch, size_window,
    window_half_size, AcceptanceConfig, Candidate, CandidateSource, Candidates, ConfigError,
    DenseBandSource, DensityConfig, DensityMap, DetectConfig, Detection, FixedCandidates,
    OverlapConvention, Patch, RegionConfig, RegionSource, ScanGeometry, StrideScanSource, Window,
    WindowConfig, WindowReject,
};
pub use pipeline::{DetectStats, DetectionResult};
pub use range_grid::{LoadConfig, LoadError, RangeGrid, NO_RETURN};
pub use sphere::{
    fit_plane_lsq, fit_sphere_lsq, fit_sphere_ransac, fitness_ratio, footprint_cells,
    sphere_from_four_points, verify_patch, DegenerateFit, Plane, RansacSphere, Sphere, SphereFit,
    SphereRansacConfig,
};

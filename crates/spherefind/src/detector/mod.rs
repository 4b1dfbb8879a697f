//! Detection primitives (proposal/window/acceptance/dedup) independent of orchestration.
//!
//! The `pipeline` module owns the high-level call order. This module provides
//! the algorithmic building blocks and shared configuration types.

pub(crate) mod config;
pub(crate) mod dedup;
pub(crate) mod density;
pub(crate) mod detection;
pub(crate) mod proposal;
pub(crate) mod window;

pub use config::{AcceptanceConfig, ConfigError, DetectConfig};
pub use dedup::dedup_detections;
pub use density::{band_density, band_mask, box_sum, density_peak, DensityMap};
pub use detection::Detection;
pub use proposal::{
    Candidate, CandidateSource, Candidates, DenseBandSource, DensityConfig, FixedCandidates,
    RegionConfig, RegionSource, StrideScanSource,
};
pub use window::{
    extract_patch, size_window, window_half_size, OverlapConvention, Patch, ScanGeometry, Window,
    WindowConfig, WindowReject,
};

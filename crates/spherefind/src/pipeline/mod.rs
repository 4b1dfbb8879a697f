//! High-level detection pipeline.
//!
//! This module is the internal "glue" layer that wires together detector
//! stages: candidate source -> window sizing -> sphere verification ->
//! acceptance -> dedup.
//!
//! Algorithmic primitives live in `crate::detector` and `crate::sphere`.

mod result;
mod run;

pub use result::{DetectStats, DetectionResult};

pub(crate) use run::run;

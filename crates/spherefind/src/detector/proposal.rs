//! Candidate sources: where in the grid to try fitting a sphere.
//!
//! Every source implements [`CandidateSource`], so the downstream stages do
//! not care whether candidates come from depth-band density peaks, connected
//! band regions, a fixed regression list or an exhaustive stride scan.

use std::collections::{HashSet, VecDeque};

use image::Luma;
use imageproc::region_labelling::{connected_components, Connectivity};

use super::config::DetectConfig;
use super::density::{band_density, band_mask, density_peak};
use crate::range_grid::RangeGrid;

/// A proposed object location in grid coordinates.
///
/// Depth is deliberately not stored; the window stage re-reads it from the
/// grid when the candidate is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Candidate {
    /// Scan-line index.
    pub x: u32,
    /// Sample index within the scan line.
    pub y: u32,
    /// Source-specific score (density count for band proposals).
    pub score: u32,
    /// Depth band level that produced the candidate, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub band: Option<u8>,
}

impl Candidate {
    pub fn at(x: u32, y: u32) -> Self {
        Self {
            x,
            y,
            score: 0,
            band: None,
        }
    }
}

/// Finite, single-pass producer of candidates.
pub trait CandidateSource {
    /// Produce the next candidate for `grid`, or `None` once exhausted.
    fn next_candidate(&mut self, grid: &RangeGrid) -> Option<Candidate>;
}

impl<S: CandidateSource + ?Sized> CandidateSource for &mut S {
    fn next_candidate(&mut self, grid: &RangeGrid) -> Option<Candidate> {
        (**self).next_candidate(grid)
    }
}

/// Configuration for depth-band density proposals.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DensityConfig {
    /// Millimetres per intensity level (255 levels then span `255 * scale`).
    pub intensity_scale_mm: u32,
    /// First band level (inclusive), in intensity units.
    pub level_min: u8,
    /// Last band level (exclusive), in intensity units.
    pub level_max: u8,
    /// Band half-width in intensity units. Derived from the target size
    /// when `None`.
    pub band_half_width: Option<u8>,
    /// Side of the square summation kernel (pixels).
    pub kernel_size: u32,
}

impl Default for DensityConfig {
    fn default() -> Self {
        Self {
            intensity_scale_mm: 5,
            level_min: 40,
            level_max: 100,
            band_half_width: None,
            kernel_size: 10,
        }
    }
}

impl DensityConfig {
    /// Band half-width for a target of `target_size_m`: half the object's
    /// depth extent expressed in intensity levels.
    pub fn half_width_for(&self, target_size_m: f64) -> u8 {
        if let Some(hw) = self.band_half_width {
            return hw;
        }
        let levels = target_size_m * 1000.0 / self.intensity_scale_mm.max(1) as f64;
        (levels / 2.0).floor().clamp(0.0, 255.0) as u8
    }
}

/// One candidate per depth band: the densest cell of each band's map.
#[derive(Debug, Clone)]
pub struct DenseBandSource {
    config: DensityConfig,
    half_width: u8,
    next_level: u16,
}

impl DenseBandSource {
    pub fn new(config: DensityConfig, target_size_m: f64) -> Self {
        let half_width = config.half_width_for(target_size_m);
        Self {
            next_level: config.level_min as u16,
            config,
            half_width,
        }
    }

    /// Number of bands this source scans in total.
    pub fn band_count(&self) -> usize {
        self.config.level_max.saturating_sub(self.config.level_min) as usize
    }
}

impl CandidateSource for DenseBandSource {
    fn next_candidate(&mut self, grid: &RangeGrid) -> Option<Candidate> {
        if self.next_level >= self.config.level_max as u16 {
            return None;
        }
        let level = self.next_level as u8;
        self.next_level += 1;

        let intensity = grid.intensity_image(self.config.intensity_scale_mm);
        let map = band_density(&intensity, level, self.half_width, self.config.kernel_size);
        let (x, y, score) = density_peak(&map)?;
        tracing::trace!("band {}: peak ({}, {}) score={}", level, x, y, score);
        Some(Candidate {
            x,
            y,
            score,
            band: Some(level),
        })
    }
}

/// Filters for connected band regions.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    /// Accepted deviation of a region's bounding-box width along the motion
    /// axis from the target size (metres, exclusive).
    pub width_tolerance_m: f64,
    /// Smallest region area (cells).
    pub min_area: u32,
    /// Largest region area (cells).
    pub max_area: u32,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            width_tolerance_m: 0.01,
            min_area: 100,
            max_area: 600,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct RegionBox {
    x1: u32,
    y1: u32,
    x2: u32,
    y2: u32,
    area: u32,
}

/// One candidate per connected region of each depth band whose bounding box
/// spans the target size along the motion axis.
///
/// Regions are 8-connected components of the band mask. Each surviving
/// region proposes the center of its bounding box; a center already
/// proposed by an earlier band is not repeated.
#[derive(Debug, Clone)]
pub struct RegionSource {
    density: DensityConfig,
    region: RegionConfig,
    target_size_m: f64,
    motion_step_m: f64,
    half_width: u8,
    next_level: u16,
    pending: VecDeque<Candidate>,
    seen: HashSet<(u32, u32)>,
}

impl RegionSource {
    pub fn new(
        density: DensityConfig,
        region: RegionConfig,
        target_size_m: f64,
        motion_step_m: f64,
    ) -> Self {
        let half_width = density.half_width_for(target_size_m);
        Self {
            next_level: density.level_min as u16,
            density,
            region,
            target_size_m,
            motion_step_m,
            half_width,
            pending: VecDeque::new(),
            seen: HashSet::new(),
        }
    }

    pub fn from_config(config: &DetectConfig) -> Self {
        Self::new(
            config.density.clone(),
            config.region,
            config.target_size_m,
            config.geometry.motion_step_m,
        )
    }

    fn keeps(&self, b: &RegionBox) -> bool {
        let width_m = (b.x2 - b.x1) as f64 * self.motion_step_m;
        (self.region.min_area..=self.region.max_area).contains(&b.area)
            && (width_m - self.target_size_m).abs() < self.region.width_tolerance_m
    }

    fn scan_band(&mut self, grid: &RangeGrid, level: u8) {
        let intensity = grid.intensity_image(self.density.intensity_scale_mm);
        let mask = band_mask(&intensity, level, self.half_width);
        let labels = connected_components(&mask, Connectivity::Eight, Luma([0u8]));

        let mut boxes: Vec<Option<RegionBox>> = Vec::new();
        for (x, y, label) in labels.enumerate_pixels() {
            let Some(i) = (label[0] as usize).checked_sub(1) else {
                continue;
            };
            if i >= boxes.len() {
                boxes.resize(i + 1, None);
            }
            let b = boxes[i].get_or_insert(RegionBox {
                x1: x,
                y1: y,
                x2: x,
                y2: y,
                area: 0,
            });
            b.x1 = b.x1.min(x);
            b.y1 = b.y1.min(y);
            b.x2 = b.x2.max(x);
            b.y2 = b.y2.max(y);
            b.area += 1;
        }

        let mut kept = 0usize;
        for b in boxes.into_iter().flatten() {
            if !self.keeps(&b) {
                continue;
            }
            let center = ((b.x1 + b.x2) / 2, (b.y1 + b.y2) / 2);
            if !self.seen.insert(center) {
                continue;
            }
            kept += 1;
            self.pending.push_back(Candidate {
                x: center.0,
                y: center.1,
                score: b.area,
                band: Some(level),
            });
        }
        tracing::trace!("band {}: {} regions kept", level, kept);
    }
}

impl CandidateSource for RegionSource {
    fn next_candidate(&mut self, grid: &RangeGrid) -> Option<Candidate> {
        while self.pending.is_empty() {
            if self.next_level >= self.density.level_max as u16 {
                return None;
            }
            let level = self.next_level as u8;
            self.next_level += 1;
            self.scan_band(grid, level);
        }
        self.pending.pop_front()
    }
}

/// Replays a fixed list of positions.
#[derive(Debug, Clone, Default)]
pub struct FixedCandidates {
    points: std::vec::IntoIter<Candidate>,
}

impl FixedCandidates {
    pub fn new(points: impl IntoIterator<Item = [u32; 2]>) -> Self {
        let points: Vec<Candidate> = points
            .into_iter()
            .map(|[x, y]| Candidate::at(x, y))
            .collect();
        Self {
            points: points.into_iter(),
        }
    }
}

impl CandidateSource for FixedCandidates {
    fn next_candidate(&mut self, _grid: &RangeGrid) -> Option<Candidate> {
        self.points.next()
    }
}

/// Exhaustive scan over every `stride`-th cell, row-major.
#[derive(Debug, Clone)]
pub struct StrideScanSource {
    stride: u32,
    x: u32,
    y: u32,
}

impl StrideScanSource {
    pub fn new(stride: u32) -> Self {
        Self {
            stride: stride.max(1),
            x: 0,
            y: 0,
        }
    }
}

impl CandidateSource for StrideScanSource {
    fn next_candidate(&mut self, grid: &RangeGrid) -> Option<Candidate> {
        let (w, h) = grid.dimensions();
        if self.x >= w {
            self.x = 0;
            self.y += self.stride;
        }
        if self.y >= h || w == 0 {
            return None;
        }
        let out = Candidate::at(self.x, self.y);
        self.x += self.stride;
        Some(out)
    }
}

/// Adapts a source into an [`Iterator`] bound to one grid.
pub struct Candidates<'a, S: ?Sized> {
    source: &'a mut S,
    grid: &'a RangeGrid,
}

impl<'a, S: CandidateSource + ?Sized> Candidates<'a, S> {
    pub fn new(source: &'a mut S, grid: &'a RangeGrid) -> Self {
        Self { source, grid }
    }
}

impl<S: CandidateSource + ?Sized> Iterator for Candidates<'_, S> {
    type Item = Candidate;

    fn next(&mut self) -> Option<Candidate> {
        self.source.next_candidate(self.grid)
    }
}

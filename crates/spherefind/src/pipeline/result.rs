use crate::detector::Detection;

/// Per-run counters, one increment per candidate outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DetectStats {
    /// Candidates drawn from the source.
    pub n_candidates: usize,
    /// Skipped: depth outside the sensing interval (includes no return).
    pub n_out_of_range_depth: usize,
    /// Skipped: window off-grid, crossing the border or collapsed.
    pub n_out_of_bounds: usize,
    /// Verified with a degenerate fit (ratio 0).
    pub n_degenerate: usize,
    /// Fitted but outside the acceptance band.
    pub n_rejected: usize,
    /// Accepted before dedup.
    pub n_accepted: usize,
    /// Accepted but dropped as overlapping duplicates.
    pub n_duplicates: usize,
}

/// Full detection result for a single range grid.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DetectionResult {
    /// Accepted, non-overlapping detections in candidate order.
    pub detections: Vec<Detection>,
    /// Grid dimensions [scan lines, samples per line].
    pub grid_size: [u32; 2],
    /// Candidate outcome counters.
    pub stats: DetectStats,
}

impl DetectionResult {
    /// Construct an empty result for a grid with the provided dimensions.
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            detections: Vec::new(),
            grid_size: [width, height],
            stats: DetectStats::default(),
        }
    }
}

//! Top-level pipeline orchestrator: propose → window → verify → accept → dedup.

use crate::detector::{
    dedup_detections, extract_patch, size_window, Candidate, CandidateSource, Candidates,
    DetectConfig, Detection, WindowReject,
};
use crate::range_grid::RangeGrid;
use crate::sphere::verify_patch;

use super::result::{DetectStats, DetectionResult};

/// What happened to one candidate.
#[derive(Debug, Clone)]
pub(crate) enum CandidateOutcome {
    Skipped(WindowReject),
    Degenerate,
    Rejected,
    Accepted(Detection),
}

/// Evaluate one candidate. `index` is its position in the source sequence and
/// fixes the RNG seed, so the outcome does not depend on evaluation order.
pub(crate) fn process_candidate(
    candidate: &Candidate,
    index: usize,
    grid: &RangeGrid,
    config: &DetectConfig,
) -> CandidateOutcome {
    let window = match size_window(
        candidate,
        grid,
        config.target_size_m,
        &config.geometry,
        &config.window,
    ) {
        Ok(w) => w,
        Err(reason) => {
            tracing::trace!("candidate ({}, {}) skipped: {}", candidate.x, candidate.y, reason);
            return CandidateOutcome::Skipped(reason);
        }
    };

    let patch = extract_patch(grid, window);
    let seed = config.sphere.seed.wrapping_add(index as u64);
    let fit = match verify_patch(&patch, &config.geometry, &config.sphere, seed) {
        Ok(fit) => fit,
        Err(reason) => {
            tracing::trace!("candidate ({}, {}) degenerate: {}", candidate.x, candidate.y, reason);
            return CandidateOutcome::Degenerate;
        }
    };

    if !config.acceptance.accepts(fit.ratio) {
        tracing::trace!(
            "candidate ({}, {}) rejected: ratio={:.3}",
            candidate.x,
            candidate.y,
            fit.ratio
        );
        return CandidateOutcome::Rejected;
    }

    tracing::debug!(
        "{:.2}: ({:.3}, {:.3}, {:.3}) r={:.3} window={:?}",
        fit.ratio,
        fit.center[0],
        fit.center[1],
        fit.center[2],
        fit.radius,
        window.corners()
    );
    CandidateOutcome::Accepted(Detection { window, fit })
}

pub(crate) fn run(
    grid: &RangeGrid,
    config: &DetectConfig,
    source: &mut dyn CandidateSource,
) -> DetectionResult {
    let (w, h) = grid.dimensions();
    let mut stats = DetectStats::default();
    let mut accepted = Vec::new();

    for (index, candidate) in Candidates::new(source, grid).enumerate() {
        stats.n_candidates += 1;
        match process_candidate(&candidate, index, grid, config) {
            CandidateOutcome::Skipped(WindowReject::OutOfRangeDepth { .. }) => {
                stats.n_out_of_range_depth += 1
            }
            CandidateOutcome::Skipped(_) => stats.n_out_of_bounds += 1,
            CandidateOutcome::Degenerate => stats.n_degenerate += 1,
            CandidateOutcome::Rejected => stats.n_rejected += 1,
            CandidateOutcome::Accepted(det) => {
                stats.n_accepted += 1;
                accepted.push(det);
            }
        }
    }
    tracing::info!(
        "{} candidates, {} accepted before dedup",
        stats.n_candidates,
        stats.n_accepted
    );

    let detections = dedup_detections(accepted, config.overlap);
    stats.n_duplicates = stats.n_accepted - detections.len();
    tracing::info!("{} detections after dedup", detections.len());

    DetectionResult {
        detections,
        grid_size: [w, h],
        stats,
    }
}

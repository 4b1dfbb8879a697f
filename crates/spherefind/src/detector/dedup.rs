use super::detection::Detection;
use super::window::OverlapConvention;

/// Remove overlapping detections, first occurrence wins.
///
/// A detection is kept only if its window overlaps none of the windows kept
/// before it; input order is preserved.
pub fn dedup_detections(
    detections: Vec<Detection>,
    convention: OverlapConvention,
) -> Vec<Detection> {
    let mut kept: Vec<Detection> = Vec::with_capacity(detections.len());
    for det in detections {
        let clash = kept
            .iter()
            .any(|k| k.window.overlaps(&det.window, convention));
        if clash {
            tracing::trace!("dropping duplicate at {:?}", det.window);
            continue;
        }
        kept.push(det);
    }
    kept
}

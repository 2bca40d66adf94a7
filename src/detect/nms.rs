use crate::detect::result::BoundingBox;

/// Greedy non-maximum suppression, applied per label.
///
/// Output is ordered by descending confidence, so the first box of each label
/// is the model's most confident one.
pub fn non_max_suppression(mut boxes: Vec<BoundingBox>, iou_threshold: f32) -> Vec<BoundingBox> {
    boxes.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<BoundingBox> = Vec::with_capacity(boxes.len());
    for candidate in boxes {
        let suppressed = kept
            .iter()
            .any(|k| k.label == candidate.label && k.iou(&candidate) > iou_threshold);
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}

//! Average Precision (AP) calculation at a fixed IoU threshold.

use crate::metrics::precision_recall::interpolate_precision;

/// Calculate Average Precision (AP) from a precision-recall curve.
///
/// Uses the COCO-style 101-point interpolation method. This engine reports
/// AP at a single IoU threshold (0.5, area=all, maxDets=100); there is
/// deliberately no multi-threshold sweep here.
///
/// # Example
///
/// ```
/// use mask_eval::metrics::ap::calculate_ap;
///
/// let precisions = vec![1.0, 1.0, 0.67, 0.75, 0.6];
/// let recalls = vec![0.25, 0.5, 0.5, 0.75, 0.75];
/// let ap = calculate_ap(&precisions, &recalls);
/// assert!(ap >= 0.0 && ap <= 1.0);
/// ```
pub fn calculate_ap(precisions: &[f64], recalls: &[f64]) -> f64 {
    if precisions.is_empty() || recalls.is_empty() {
        return 0.0;
    }

    let interpolated = interpolate_precision(precisions, recalls);
    interpolated.iter().sum::<f64>() / interpolated.len() as f64
}

/// Average AP values across classes.
///
/// Classes whose curve is undefined are excluded before this call, so an
/// empty slice means "no evaluable classes" and yields 0.0.
pub fn mean_ap(class_aps: &[f64]) -> f64 {
    if class_aps.is_empty() {
        return 0.0;
    }
    class_aps.iter().sum::<f64>() / class_aps.len() as f64
}

//! Precision and Recall calculation.

/// Container for precision and recall values.
#[derive(Debug, Clone)]
pub struct PrecisionRecall {
    pub precision: f64,
    pub recall: f64,
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
}

/// Calculate precision and recall from TP, FP, and FN counts.
///
/// # Example
///
/// ```
/// use mask_eval::metrics::precision_recall::calculate_precision_recall;
///
/// let pr = calculate_precision_recall(8, 2, 3);
/// assert_eq!(pr.precision, 0.8); // 8 / (8 + 2)
/// assert!((pr.recall - 0.7272).abs() < 0.001); // 8 / (8 + 3)
/// ```
pub fn calculate_precision_recall(
    true_positives: usize,
    false_positives: usize,
    false_negatives: usize,
) -> PrecisionRecall {
    let precision = if true_positives + false_positives > 0 {
        true_positives as f64 / (true_positives + false_positives) as f64
    } else {
        0.0
    };

    let recall = if true_positives + false_negatives > 0 {
        true_positives as f64 / (true_positives + false_negatives) as f64
    } else {
        0.0
    };

    PrecisionRecall {
        precision,
        recall,
        true_positives,
        false_positives,
        false_negatives,
    }
}

/// Build the cumulative precision-recall curve from confidence-sorted
/// detection outcomes.
///
/// `is_true_positive` must already be ordered by confidence, descending;
/// each element contributes one point to the curve.
pub fn cumulative_pr_curve(
    is_true_positive: &[bool],
    num_ground_truth: usize,
) -> (Vec<f64>, Vec<f64>) {
    let mut precisions = Vec::with_capacity(is_true_positive.len());
    let mut recalls = Vec::with_capacity(is_true_positive.len());

    let mut tp = 0usize;
    let mut fp = 0usize;

    for &is_tp in is_true_positive {
        if is_tp {
            tp += 1;
        } else {
            fp += 1;
        }

        precisions.push(tp as f64 / (tp + fp) as f64);
        recalls.push(if num_ground_truth > 0 {
            tp as f64 / num_ground_truth as f64
        } else {
            0.0
        });
    }

    (precisions, recalls)
}

/// Interpolate precision values for standard recall levels.
///
/// Uses the COCO-style 101-point interpolation: at each recall level the
/// precision is the maximum precision achieved at that recall or beyond.
pub fn interpolate_precision(precision: &[f64], recall: &[f64]) -> Vec<f64> {
    let mut interpolated = vec![0.0; 101];

    for (i, slot) in interpolated.iter_mut().enumerate() {
        let recall_level = i as f64 / 100.0;
        *slot = precision
            .iter()
            .zip(recall.iter())
            .filter(|(_, &r)| r >= recall_level)
            .map(|(&p, _)| p)
            .fold(0.0f64, f64::max);
    }

    interpolated
}

/// Statistics tracking for ingestion and filtering
///
/// This module provides structures for tracking instances dropped during
/// the preparation of annotation and prediction sets for evaluation.

use serde::{Deserialize, Serialize};

/// Statistics collected while preparing instances for evaluation
///
/// Tracks validation failures and filter decisions so the class-exclusion
/// policy stays auditable from the serialized results.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationStats {
    /// Total number of ground-truth instances seen
    pub total_annotations: usize,

    /// Total number of predicted instances seen
    pub total_predictions: usize,

    /// Instances skipped due to invalid bounding boxes
    pub skipped_invalid_boxes: usize,

    /// Instances skipped due to an unknown category id
    pub skipped_unknown_category: usize,

    /// Instances skipped due to an unknown image id
    pub skipped_unknown_image: usize,

    /// Instances dropped because their class is outside the common set
    pub skipped_foreign_class: usize,

    /// Number of images that went through evaluation
    pub images_processed: usize,

    /// Number of images skipped because their evaluation failed
    pub images_failed: usize,
}

impl ValidationStats {
    /// Create a new `ValidationStats` with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one ingested ground-truth instance
    pub fn add_annotation(&mut self) {
        self.total_annotations += 1;
    }

    /// Record one ingested predicted instance
    pub fn add_prediction(&mut self) {
        self.total_predictions += 1;
    }

    /// Record an instance skipped due to an invalid bounding box
    pub fn skip_invalid_box(&mut self) {
        self.skipped_invalid_boxes += 1;
    }

    /// Record an instance skipped due to an unknown category
    pub fn skip_unknown_category(&mut self) {
        self.skipped_unknown_category += 1;
    }

    /// Record an instance skipped due to an unknown image
    pub fn skip_unknown_image(&mut self) {
        self.skipped_unknown_image += 1;
    }

    /// Record instances dropped by the common-class filter
    pub fn skip_foreign_class(&mut self, count: usize) {
        self.skipped_foreign_class += count;
    }

    /// Total number of skipped instances
    pub fn total_skipped(&self) -> usize {
        self.skipped_invalid_boxes
            + self.skipped_unknown_category
            + self.skipped_unknown_image
            + self.skipped_foreign_class
    }

    /// Get a formatted string summary of the statistics
    pub fn summary_string(&self) -> String {
        format!(
            "ValidationStats {{ annotations: {}, predictions: {}, skipped: {}, images: {} ok / {} failed }}",
            self.total_annotations,
            self.total_predictions,
            self.total_skipped(),
            self.images_processed,
            self.images_failed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_stats_are_zero() {
        let stats = ValidationStats::new();
        assert_eq!(stats.total_annotations, 0);
        assert_eq!(stats.total_skipped(), 0);
    }

    #[test]
    fn test_skip_counters() {
        let mut stats = ValidationStats::new();
        stats.skip_invalid_box();
        stats.skip_unknown_category();
        stats.skip_unknown_image();
        stats.skip_foreign_class(3);

        assert_eq!(stats.total_skipped(), 6);
    }

    #[test]
    fn test_summary_string() {
        let mut stats = ValidationStats::new();
        stats.add_annotation();
        stats.add_annotation();
        stats.images_processed = 1;

        let summary = stats.summary_string();
        assert!(summary.contains("annotations: 2"));
        assert!(summary.contains("1 ok"));
    }
}

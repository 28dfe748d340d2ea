//! Greedy matching of detections to ground-truth instances.
//!
//! One record is produced per (image, class) pair. Records are evaluation
//! artifacts only: they are reduced into counts and lists by the aggregator
//! and never serialized themselves.

use std::cmp::Ordering;

use crate::error::Result;
use crate::mask;
use crate::metrics::iou::calculate_iou;
use crate::types::{Annotation, Prediction};

/// IoU threshold for the counts this engine reports.
pub const IOU_THRESHOLD: f64 = 0.5;

/// Detection cap per (image, class); overflow detections beyond the 100
/// highest-confidence ones are dropped before matching.
pub const MAX_DETECTIONS: usize = 100;

/// Outcome of one detection after matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionOutcome {
    /// Matched a ground truth: index into `MatchRecord::ground_truths`.
    Matched { ground_truth: usize },
    /// No ground truth claimed: a false positive.
    Unmatched,
    /// Best overlap above threshold was an ignore-flagged ground truth;
    /// the detection leaves the TP/FP/FN accounting entirely.
    Ignored,
}

/// One detection with its matching outcome.
#[derive(Debug, Clone)]
pub struct DetectionMatch {
    pub prediction: Prediction,
    /// IoU against the claimed ground truth, or the best IoU observed if
    /// unmatched.
    pub iou: f64,
    pub outcome: DetectionOutcome,
}

/// One ground truth with its matching outcome.
#[derive(Debug, Clone)]
pub struct GroundTruthMatch {
    pub annotation: Annotation,
    /// Index into `MatchRecord::detections` of the claiming detection.
    pub matched_by: Option<usize>,
}

impl GroundTruthMatch {
    /// Whether this ground truth is excluded from TP/FN accounting.
    pub fn is_ignored(&self) -> bool {
        self.annotation.ignore
    }
}

/// Match results for one image and one class at one IoU threshold.
///
/// Detections are ordered by confidence descending; ground truths keep
/// their input order.
#[derive(Debug, Clone)]
pub struct MatchRecord {
    pub image_id: u64,
    pub category_id: u32,
    pub classname: String,
    pub detections: Vec<DetectionMatch>,
    pub ground_truths: Vec<GroundTruthMatch>,
}

impl MatchRecord {
    /// Detections that claimed a ground truth.
    pub fn true_positives(&self) -> usize {
        self.detections
            .iter()
            .filter(|d| matches!(d.outcome, DetectionOutcome::Matched { .. }))
            .count()
    }

    /// Detections that claimed nothing.
    pub fn false_positives(&self) -> usize {
        self.detections
            .iter()
            .filter(|d| d.outcome == DetectionOutcome::Unmatched)
            .count()
    }

    /// Non-ignored ground truths never claimed by a detection.
    pub fn false_negatives(&self) -> usize {
        self.ground_truths
            .iter()
            .filter(|g| !g.is_ignored() && g.matched_by.is_none())
            .count()
    }

    /// Detections that entered the accounting (TP + FP).
    pub fn considered_detections(&self) -> usize {
        self.detections
            .iter()
            .filter(|d| d.outcome != DetectionOutcome::Ignored)
            .count()
    }

    /// Ground truths that entered the accounting (TP + FN).
    pub fn considered_ground_truths(&self) -> usize {
        self.ground_truths.iter().filter(|g| !g.is_ignored()).count()
    }
}

/// IoU between one detection and one ground truth.
///
/// Uses mask IoU when both sides carry a mask, bounding-box IoU otherwise.
pub fn instance_iou(prediction: &Prediction, annotation: &Annotation) -> Result<f64> {
    match (&prediction.mask, &annotation.mask) {
        (Some(det_mask), Some(gt_mask)) => mask::mask_iou(det_mask, gt_mask),
        _ => Ok(calculate_iou(&prediction.to_bbox()?, &annotation.to_bbox()?)),
    }
}

/// Match detections to ground truths for a single image and class.
///
/// Greedy, confidence-first: detections are visited in descending
/// confidence order (stable, so ties keep insertion order) and each claims
/// the not-yet-matched, non-ignored ground truth with maximum IoU, if that
/// IoU clears `iou_threshold`. A detection whose best remaining overlap
/// above threshold is an ignore-flagged ground truth is excluded from the
/// accounting instead of becoming a false positive.
///
/// Guarantees: each detection claims at most one ground truth, each ground
/// truth is claimed at most once, and the result is deterministic for a
/// fixed input ordering.
pub fn match_class_in_image(
    image_id: u64,
    category_id: u32,
    classname: &str,
    detections: &[Prediction],
    ground_truths: &[Annotation],
    iou_threshold: f64,
) -> Result<MatchRecord> {
    let mut order: Vec<usize> = (0..detections.len()).collect();
    order.sort_by(|&a, &b| {
        detections[b]
            .confidence
            .partial_cmp(&detections[a].confidence)
            .unwrap_or(Ordering::Equal)
    });
    order.truncate(MAX_DETECTIONS);

    let mut gt_matches: Vec<GroundTruthMatch> = ground_truths
        .iter()
        .map(|ann| GroundTruthMatch {
            annotation: ann.clone(),
            matched_by: None,
        })
        .collect();

    let mut det_matches: Vec<DetectionMatch> = Vec::with_capacity(order.len());

    for &det_idx in &order {
        let prediction = &detections[det_idx];

        // Best eligible ground truth: not ignored, not yet claimed.
        let mut best_iou = 0.0;
        let mut best_gt: Option<usize> = None;
        for (gt_idx, gt) in gt_matches.iter().enumerate() {
            if gt.is_ignored() || gt.matched_by.is_some() {
                continue;
            }
            let iou = instance_iou(prediction, &ground_truths[gt_idx])?;
            if iou > best_iou {
                best_iou = iou;
                best_gt = Some(gt_idx);
            }
        }

        let slot = det_matches.len();
        let (iou, outcome) = match best_gt {
            Some(gt_idx) if best_iou >= iou_threshold => {
                gt_matches[gt_idx].matched_by = Some(slot);
                (best_iou, DetectionOutcome::Matched { ground_truth: gt_idx })
            }
            _ => {
                // Sub-threshold against every real ground truth; an ignore
                // region overlapping above threshold absorbs the detection.
                let mut ignore_iou = 0.0;
                for (gt_idx, gt) in gt_matches.iter().enumerate() {
                    if !gt.is_ignored() {
                        continue;
                    }
                    let iou = instance_iou(prediction, &ground_truths[gt_idx])?;
                    if iou > ignore_iou {
                        ignore_iou = iou;
                    }
                }
                if ignore_iou >= iou_threshold {
                    (ignore_iou, DetectionOutcome::Ignored)
                } else {
                    (best_iou, DetectionOutcome::Unmatched)
                }
            }
        };

        det_matches.push(DetectionMatch {
            prediction: prediction.clone(),
            iou,
            outcome,
        });
    }

    Ok(MatchRecord {
        image_id,
        category_id,
        classname: classname.to_string(),
        detections: det_matches,
        ground_truths: gt_matches,
    })
}

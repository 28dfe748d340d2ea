//! Reduction of match records into dataset-level and per-image results.
//!
//! Dataset results retain only counts; per-image results additionally keep
//! the literal matched/unmatched instance lists for downstream diagnostic
//! rendering.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::matching::{DetectionOutcome, MatchRecord};
use crate::metrics::ap::{calculate_ap, mean_ap};
use crate::metrics::precision_recall::cumulative_pr_curve;
use crate::types::{Annotation, Prediction};

/// Total and per-class counts for one outcome (TP, FP, or FN).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeCounts {
    pub n: usize,
    pub n_per_class: BTreeMap<String, usize>,
}

impl OutcomeCounts {
    fn add(&mut self, classname: &str, count: usize) {
        self.n += count;
        *self.n_per_class.entry(classname.to_string()).or_insert(0) += count;
    }
}

/// Aggregated evaluation results at dataset scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetResults {
    pub n_anns_considered: usize,
    pub n_preds_considered: usize,
    #[serde(rename = "AP")]
    pub ap: f64,
    pub ap_per_class: BTreeMap<String, f64>,
    pub true_positives: OutcomeCounts,
    pub false_positives: OutcomeCounts,
    pub false_negatives: OutcomeCounts,
}

/// An instance tagged into one of the per-image outcome lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutcomeInstance {
    Prediction(Prediction),
    Annotation(Annotation),
}

/// Aggregated evaluation results for one image.
///
/// `lists_per_class` is keyed `{classname}_TP_det`, `{classname}_TP_ann`,
/// `{classname}_FP`, `{classname}_FN`; all four keys are present for every
/// evaluated class, empty lists included.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageResults {
    pub n_anns_considered: usize,
    pub n_preds_considered: usize,
    #[serde(rename = "AP")]
    pub ap: f64,
    pub true_positives: OutcomeCounts,
    pub false_positives: OutcomeCounts,
    pub false_negatives: OutcomeCounts,
    pub lists_per_class: BTreeMap<String, Vec<OutcomeInstance>>,
}

/// Per-class precision/recall curves reduced to AP values.
///
/// Returns per-class APs plus the mean over evaluable classes. A class with
/// zero non-ignored ground truths has an undefined curve: it reports AP 0.0
/// and is excluded from the mean denominator, never raised as an error.
fn class_average_precisions(records: &[&MatchRecord]) -> (BTreeMap<String, f64>, f64) {
    let mut scored: BTreeMap<&str, Vec<(f64, bool)>> = BTreeMap::new();
    let mut gt_counts: BTreeMap<&str, usize> = BTreeMap::new();

    for record in records {
        let class_gts = gt_counts.entry(record.classname.as_str()).or_insert(0);
        *class_gts += record.considered_ground_truths();

        let class_scores = scored.entry(record.classname.as_str()).or_default();
        for det in &record.detections {
            match det.outcome {
                DetectionOutcome::Matched { .. } => {
                    class_scores.push((det.prediction.confidence, true));
                }
                DetectionOutcome::Unmatched => {
                    class_scores.push((det.prediction.confidence, false));
                }
                DetectionOutcome::Ignored => {}
            }
        }
    }

    let mut ap_per_class = BTreeMap::new();
    let mut evaluable = Vec::new();

    for (classname, n_gt) in &gt_counts {
        let ap = if *n_gt == 0 {
            0.0
        } else {
            let mut class_scores = scored.remove(classname).unwrap_or_default();
            class_scores.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
            let flags: Vec<bool> = class_scores.iter().map(|&(_, tp)| tp).collect();
            let (precisions, recalls) = cumulative_pr_curve(&flags, *n_gt);
            calculate_ap(&precisions, &recalls)
        };
        ap_per_class.insert((*classname).to_string(), ap);
        if *n_gt > 0 {
            evaluable.push(ap);
        }
    }

    let ap = mean_ap(&evaluable);
    (ap_per_class, ap)
}

fn accumulate_counts(
    records: &[&MatchRecord],
) -> (OutcomeCounts, OutcomeCounts, OutcomeCounts) {
    let mut tp = OutcomeCounts::default();
    let mut fp = OutcomeCounts::default();
    let mut fn_ = OutcomeCounts::default();

    for record in records {
        tp.add(&record.classname, record.true_positives());
        fp.add(&record.classname, record.false_positives());
        fn_.add(&record.classname, record.false_negatives());
    }

    (tp, fp, fn_)
}

/// Reduce all match records for a dataset into counts and AP.
///
/// `n_anns_considered` / `n_preds_considered` are the sizes of the filtered
/// collections that entered matching.
pub fn aggregate_dataset(
    records: &[MatchRecord],
    n_anns_considered: usize,
    n_preds_considered: usize,
) -> DatasetResults {
    let refs: Vec<&MatchRecord> = records.iter().collect();
    let (true_positives, false_positives, false_negatives) = accumulate_counts(&refs);
    let (ap_per_class, ap) = class_average_precisions(&refs);

    DatasetResults {
        n_anns_considered,
        n_preds_considered,
        ap,
        ap_per_class,
        true_positives,
        false_positives,
        false_negatives,
    }
}

/// Reduce the match records of a single image, retaining the literal
/// outcome lists for diagnostic rendering.
pub fn aggregate_image(records: &[MatchRecord]) -> ImageResults {
    let refs: Vec<&MatchRecord> = records.iter().collect();
    let (true_positives, false_positives, false_negatives) = accumulate_counts(&refs);
    let (_, ap) = class_average_precisions(&refs);

    let n_anns_considered = records.iter().map(|r| r.ground_truths.len()).sum();
    let n_preds_considered = records.iter().map(|r| r.detections.len()).sum();

    let mut lists_per_class: BTreeMap<String, Vec<OutcomeInstance>> = BTreeMap::new();
    for record in records {
        let mut tp_det = Vec::new();
        let mut tp_ann = Vec::new();
        let mut fp = Vec::new();
        let mut fn_ = Vec::new();

        for det in &record.detections {
            match det.outcome {
                DetectionOutcome::Matched { .. } => {
                    tp_det.push(OutcomeInstance::Prediction(det.prediction.clone()));
                }
                DetectionOutcome::Unmatched => {
                    fp.push(OutcomeInstance::Prediction(det.prediction.clone()));
                }
                DetectionOutcome::Ignored => {}
            }
        }
        for gt in &record.ground_truths {
            if gt.matched_by.is_some() {
                tp_ann.push(OutcomeInstance::Annotation(gt.annotation.clone()));
            } else if !gt.is_ignored() {
                fn_.push(OutcomeInstance::Annotation(gt.annotation.clone()));
            }
        }

        let classname = &record.classname;
        lists_per_class
            .entry(format!("{classname}_TP_det"))
            .or_default()
            .extend(tp_det);
        lists_per_class
            .entry(format!("{classname}_TP_ann"))
            .or_default()
            .extend(tp_ann);
        lists_per_class
            .entry(format!("{classname}_FP"))
            .or_default()
            .extend(fp);
        lists_per_class
            .entry(format!("{classname}_FN"))
            .or_default()
            .extend(fn_);
    }

    ImageResults {
        n_anns_considered,
        n_preds_considered,
        ap,
        true_positives,
        false_positives,
        false_negatives,
        lists_per_class,
    }
}

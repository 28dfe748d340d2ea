//! Evaluation pipeline orchestration.
//!
//! One run covers one (dataset, model) pair: class reconciliation filters
//! are computed once, both instance sets are filtered identically, and the
//! matcher produces one record per (image, class). The same records feed
//! the dataset-level and per-image reductions so both scopes share one
//! denominator.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::aggregate::{aggregate_dataset, aggregate_image, DatasetResults, ImageResults};
use crate::error::{EvalError, Result};
use crate::matching::{match_class_in_image, MatchRecord, IOU_THRESHOLD};
use crate::stats::ValidationStats;
use crate::store::{compute_eval_filters, DatasetHandle, EvalFilters, InstanceSet};
use crate::types::{Annotation, Prediction};

/// Per-class operating-point summary included in the serialized results.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassSummary {
    pub tp: usize,
    pub fp: usize,
    #[serde(rename = "fn")]
    pub fn_: usize,
    #[serde(rename = "AP")]
    pub ap: f64,
}

/// Full evaluation output for one (dataset, model) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalReport {
    pub raw_results: BTreeMap<String, ClassSummary>,
    pub eval_filters: EvalFilters,
    pub results_on_dataset: DatasetResults,
    pub results_per_image: BTreeMap<String, ImageResults>,
    /// Images whose evaluation failed, with the failure reason.
    pub per_image_errors: BTreeMap<String, String>,
    pub stats: ValidationStats,
}

/// Evaluate one model's predictions against a dataset's ground truth.
///
/// Classes present on only one side are excluded before matching (see
/// [`EvalFilters`]); the exclusions are reported, not errors. A single
/// image's failure is logged, recorded in `per_image_errors`, and skipped
/// without aborting the rest of the dataset.
pub fn evaluate_model(
    dataset: &DatasetHandle,
    predictions: &InstanceSet<Prediction>,
) -> Result<EvalReport> {
    let eval_filters = compute_eval_filters(&dataset.annotations, predictions);
    log::debug!(
        "evaluating {} common classes ({} prediction classes dropped, {} annotation classes dropped)",
        eval_filters.classes_considered.len(),
        eval_filters.pred_classes_ignored.len(),
        eval_filters.ann_classes_ignored.len()
    );

    let mut stats = ValidationStats::new();
    stats.total_annotations = dataset.annotations.len();
    stats.total_predictions = predictions.len();

    let annotations = dataset
        .annotations
        .filter_by_classes(&eval_filters.classes_considered);
    let filtered_predictions = predictions.filter_by_classes(&eval_filters.classes_considered);
    stats.skip_foreign_class(dataset.annotations.len() - annotations.len());
    stats.skip_foreign_class(predictions.len() - filtered_predictions.len());

    let mut image_names: BTreeSet<String> =
        annotations.image_names().map(str::to_string).collect();
    image_names.extend(filtered_predictions.image_names().map(str::to_string));

    let mut records_by_image: BTreeMap<String, Vec<MatchRecord>> = BTreeMap::new();
    let mut per_image_errors = BTreeMap::new();

    for image_name in &image_names {
        match evaluate_image(
            dataset,
            &annotations,
            &filtered_predictions,
            image_name,
            &eval_filters,
        ) {
            Ok(records) => {
                stats.images_processed += 1;
                records_by_image.insert(image_name.clone(), records);
            }
            Err(err) => {
                log::warn!("skipping image '{image_name}': {err}");
                stats.images_failed += 1;
                per_image_errors.insert(image_name.clone(), err.to_string());
            }
        }
    }

    let all_records: Vec<MatchRecord> = records_by_image
        .values()
        .flat_map(|records| records.iter().cloned())
        .collect();
    let results_on_dataset = aggregate_dataset(
        &all_records,
        annotations.len(),
        filtered_predictions.len(),
    );

    let results_per_image: BTreeMap<String, ImageResults> = records_by_image
        .iter()
        .map(|(name, records)| (name.clone(), aggregate_image(records)))
        .collect();

    let raw_results = class_summaries(&eval_filters, &results_on_dataset);

    Ok(EvalReport {
        raw_results,
        eval_filters,
        results_on_dataset,
        results_per_image,
        per_image_errors,
        stats,
    })
}

/// Match every considered class within one image.
fn evaluate_image(
    dataset: &DatasetHandle,
    annotations: &InstanceSet<Annotation>,
    predictions: &InstanceSet<Prediction>,
    image_name: &str,
    eval_filters: &EvalFilters,
) -> Result<Vec<MatchRecord>> {
    let image_id = dataset
        .image_id(image_name)
        .ok_or_else(|| EvalError::NotFound(format!("image '{image_name}' not in dataset")))?;

    let image_gts = annotations.instances(image_name);
    let image_dets = predictions.instances(image_name);

    let mut records = Vec::new();
    for classname in &eval_filters.classes_considered {
        let key = classname.to_lowercase();
        let class_gts: Vec<Annotation> = image_gts
            .iter()
            .filter(|a| a.classname.to_lowercase() == key)
            .cloned()
            .collect();
        let class_dets: Vec<Prediction> = image_dets
            .iter()
            .filter(|p| p.classname.to_lowercase() == key)
            .cloned()
            .collect();

        if class_gts.is_empty() && class_dets.is_empty() {
            continue;
        }

        let category_id = dataset.vocabulary.id_of(classname).ok_or_else(|| {
            EvalError::Conflict(format!("class '{classname}' missing from vocabulary"))
        })?;

        records.push(match_class_in_image(
            image_id,
            category_id,
            classname,
            &class_dets,
            &class_gts,
            IOU_THRESHOLD,
        )?);
    }

    Ok(records)
}

fn class_summaries(
    eval_filters: &EvalFilters,
    results: &DatasetResults,
) -> BTreeMap<String, ClassSummary> {
    eval_filters
        .classes_considered
        .iter()
        .map(|classname| {
            let summary = ClassSummary {
                tp: results
                    .true_positives
                    .n_per_class
                    .get(classname)
                    .copied()
                    .unwrap_or(0),
                fp: results
                    .false_positives
                    .n_per_class
                    .get(classname)
                    .copied()
                    .unwrap_or(0),
                fn_: results
                    .false_negatives
                    .n_per_class
                    .get(classname)
                    .copied()
                    .unwrap_or(0),
                ap: results.ap_per_class.get(classname).copied().unwrap_or(0.0),
            };
            (classname.clone(), summary)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Category, CocoAnnotation, CocoDataset, ImageInfo};

    fn dataset_with_one_dog() -> DatasetHandle {
        let coco = CocoDataset {
            images: vec![ImageInfo {
                id: 1,
                file_name: "a.jpg".to_string(),
                height: 100,
                width: 100,
            }],
            categories: vec![Category {
                id: 18,
                name: "dog".to_string(),
                supercategory: None,
            }],
            annotations: vec![CocoAnnotation {
                id: 1,
                image_id: 1,
                category_id: 18,
                bbox: vec![10.0, 10.0, 20.0, 20.0],
                segmentation: None,
                area: None,
                iscrowd: None,
            }],
        };
        DatasetHandle::from_coco(&coco).unwrap().0
    }

    fn prediction(classname: &str, bbox: Vec<f64>, confidence: f64) -> Prediction {
        Prediction {
            classname: classname.to_string(),
            confidence,
            mask: None,
            bbox,
        }
    }

    #[test]
    fn test_perfect_prediction_scores_ap_one() {
        let dataset = dataset_with_one_dog();
        let mut predictions = InstanceSet::new();
        predictions.insert("a.jpg", prediction("dog", vec![10.0, 10.0, 20.0, 20.0], 0.9));

        let report = evaluate_model(&dataset, &predictions).unwrap();
        assert_eq!(report.results_on_dataset.true_positives.n, 1);
        assert_eq!(report.results_on_dataset.false_positives.n, 0);
        assert_eq!(report.results_on_dataset.false_negatives.n, 0);
        assert!((report.results_on_dataset.ap - 1.0).abs() < 1e-6);
        assert_eq!(report.raw_results["dog"].tp, 1);
    }

    #[test]
    fn test_unknown_prediction_image_recorded_not_fatal() {
        let dataset = dataset_with_one_dog();
        let mut predictions = InstanceSet::new();
        predictions.insert("a.jpg", prediction("dog", vec![10.0, 10.0, 20.0, 20.0], 0.9));
        predictions.insert("ghost.jpg", prediction("dog", vec![0.0, 0.0, 5.0, 5.0], 0.8));

        let report = evaluate_model(&dataset, &predictions).unwrap();
        assert!(report.per_image_errors.contains_key("ghost.jpg"));
        assert_eq!(report.stats.images_failed, 1);
        // The healthy image still evaluated.
        assert_eq!(report.results_on_dataset.true_positives.n, 1);
    }

    #[test]
    fn test_no_common_classes_yields_empty_results() {
        let dataset = dataset_with_one_dog();
        let mut predictions = InstanceSet::new();
        predictions.insert("a.jpg", prediction("cat", vec![10.0, 10.0, 20.0, 20.0], 0.9));

        let report = evaluate_model(&dataset, &predictions).unwrap();
        assert!(report.eval_filters.classes_considered.is_empty());
        assert_eq!(report.results_on_dataset.true_positives.n, 0);
        assert_eq!(report.results_on_dataset.false_positives.n, 0);
        assert_eq!(report.results_on_dataset.false_negatives.n, 0);
        assert_eq!(report.results_on_dataset.ap, 0.0);
        assert_eq!(report.stats.skipped_foreign_class, 2);
    }

    #[test]
    fn test_per_image_results_cover_empty_images() {
        let dataset = dataset_with_one_dog();
        let mut predictions = InstanceSet::new();
        predictions.insert("a.jpg", prediction("dog", vec![10.0, 10.0, 20.0, 20.0], 0.9));

        let report = evaluate_model(&dataset, &predictions).unwrap();
        assert!(report.results_per_image.contains_key("a.jpg"));
        let image = &report.results_per_image["a.jpg"];
        assert_eq!(image.true_positives.n, 1);
        assert_eq!(image.lists_per_class["dog_TP_det"].len(), 1);
    }
}

//! Edge case tests for matching, aggregation, and filtering.

use mask_eval::evaluator::evaluate_model;
use mask_eval::matching::{match_class_in_image, DetectionOutcome, IOU_THRESHOLD, MAX_DETECTIONS};
use mask_eval::store::{DatasetHandle, InstanceSet};
use mask_eval::types::{Annotation, Category, CocoAnnotation, CocoDataset, ImageInfo, Prediction};

fn annotation(bbox: Vec<f64>) -> Annotation {
    Annotation {
        classname: "dog".to_string(),
        mask: None,
        bbox,
        ignore: false,
    }
}

fn prediction(bbox: Vec<f64>, confidence: f64) -> Prediction {
    Prediction {
        classname: "dog".to_string(),
        confidence,
        mask: None,
        bbox,
    }
}

#[test]
fn zero_detections_zero_ground_truths_is_empty_record() {
    let record = match_class_in_image(1, 1, "dog", &[], &[], IOU_THRESHOLD).unwrap();
    assert_eq!(record.true_positives(), 0);
    assert_eq!(record.false_positives(), 0);
    assert_eq!(record.false_negatives(), 0);
}

#[test]
fn detection_cap_truncates_overflow() {
    // 120 detections on an empty image: only the 100 most confident enter
    // the accounting.
    let detections: Vec<Prediction> = (0..120)
        .map(|i| prediction(vec![i as f64 * 5.0, 0.0, 4.0, 4.0], 1.0 - i as f64 * 0.001))
        .collect();

    let record = match_class_in_image(1, 1, "dog", &detections, &[], IOU_THRESHOLD).unwrap();
    assert_eq!(record.detections.len(), MAX_DETECTIONS);
    assert_eq!(record.false_positives(), MAX_DETECTIONS);

    // The kept detections are the most confident ones.
    let min_kept = record
        .detections
        .iter()
        .map(|d| d.prediction.confidence)
        .fold(f64::INFINITY, f64::min);
    assert!(min_kept > 1.0 - 0.101);
}

#[test]
fn tied_confidences_keep_insertion_order() {
    // Both detections could match the ground truth; with equal confidence
    // the earlier-inserted one wins.
    let detections = vec![
        prediction(vec![10.0, 10.0, 20.0, 20.0], 0.7),
        prediction(vec![10.0, 10.0, 20.0, 20.0], 0.7),
    ];
    let gts = vec![annotation(vec![10.0, 10.0, 20.0, 20.0])];

    let record = match_class_in_image(1, 1, "dog", &detections, &gts, IOU_THRESHOLD).unwrap();
    assert!(matches!(
        record.detections[0].outcome,
        DetectionOutcome::Matched { .. }
    ));
    assert_eq!(record.detections[1].outcome, DetectionOutcome::Unmatched);
}

#[test]
fn degenerate_boxes_never_match() {
    let detections = vec![prediction(vec![10.0, 10.0, 0.0, 0.0], 0.9)];
    let gts = vec![annotation(vec![10.0, 10.0, 0.0, 0.0])];

    let record = match_class_in_image(1, 1, "dog", &detections, &gts, IOU_THRESHOLD).unwrap();
    assert_eq!(record.true_positives(), 0);
    assert_eq!(record.false_positives(), 1);
    assert_eq!(record.false_negatives(), 1);
}

#[test]
fn failed_image_drops_out_of_the_ap_denominator() {
    // "cat" ground truth lives only in the image whose evaluation fails
    // (mismatched mask sizes), so the class has no eligible curve: the
    // dataset AP is computed over "dog" alone.
    use mask_eval::mask::encode;
    use mask_eval::types::Segmentation;

    let coco = CocoDataset {
        images: vec![
            ImageInfo {
                id: 1,
                file_name: "a.jpg".to_string(),
                height: 4,
                width: 4,
            },
            ImageInfo {
                id: 2,
                file_name: "b.jpg".to_string(),
                height: 4,
                width: 4,
            },
        ],
        categories: vec![
            Category {
                id: 1,
                name: "dog".to_string(),
                supercategory: None,
            },
            Category {
                id: 2,
                name: "cat".to_string(),
                supercategory: None,
            },
        ],
        annotations: vec![
            CocoAnnotation {
                id: 1,
                image_id: 1,
                category_id: 1,
                bbox: vec![0.0, 0.0, 4.0, 4.0],
                segmentation: None,
                area: None,
                iscrowd: None,
            },
            CocoAnnotation {
                id: 2,
                image_id: 2,
                category_id: 2,
                bbox: vec![0.0, 0.0, 4.0, 4.0],
                segmentation: Some(Segmentation::Rle(encode(&[1u8; 16], 4, 4).unwrap())),
                area: None,
                iscrowd: None,
            },
        ],
    };
    let (dataset, _) = DatasetHandle::from_coco(&coco).unwrap();

    let mut predictions = InstanceSet::new();
    predictions.insert("a.jpg", prediction(vec![0.0, 0.0, 4.0, 4.0], 0.9));
    predictions.insert(
        "b.jpg",
        Prediction {
            classname: "cat".to_string(),
            confidence: 0.9,
            mask: Some(encode(&[1u8; 25], 5, 5).unwrap()),
            bbox: vec![0.0, 0.0, 4.0, 4.0],
        },
    );

    let report = evaluate_model(&dataset, &predictions).unwrap();

    assert!(report.per_image_errors.contains_key("b.jpg"));
    // Mean AP over the one evaluable class is still 1.0.
    assert!((report.results_on_dataset.ap - 1.0).abs() < 1e-6);
    assert!(!report.results_on_dataset.ap_per_class.contains_key("cat"));
}

#[test]
fn images_without_instances_still_appear_in_per_image_results() {
    let coco = CocoDataset {
        images: vec![
            ImageInfo {
                id: 1,
                file_name: "a.jpg".to_string(),
                height: 100,
                width: 100,
            },
            ImageInfo {
                id: 2,
                file_name: "empty.jpg".to_string(),
                height: 100,
                width: 100,
            },
        ],
        categories: vec![Category {
            id: 1,
            name: "dog".to_string(),
            supercategory: None,
        }],
        annotations: vec![CocoAnnotation {
            id: 1,
            image_id: 1,
            category_id: 1,
            bbox: vec![10.0, 10.0, 20.0, 20.0],
            segmentation: None,
            area: None,
            iscrowd: None,
        }],
    };
    let (dataset, _) = DatasetHandle::from_coco(&coco).unwrap();

    let mut predictions = InstanceSet::new();
    predictions.insert("a.jpg", prediction(vec![10.0, 10.0, 20.0, 20.0], 0.9));

    let report = evaluate_model(&dataset, &predictions).unwrap();
    let empty = &report.results_per_image["empty.jpg"];
    assert_eq!(empty.n_anns_considered, 0);
    assert_eq!(empty.n_preds_considered, 0);
    assert_eq!(empty.true_positives.n, 0);
    assert!(empty.lists_per_class.is_empty());
}

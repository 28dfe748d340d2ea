//! End-to-end evaluation of one model against a small inline dataset,
//! writing `dataset-info.json` and `results_{model}.json`.
//!
//! Run with: cargo run --example evaluate_model

use mask_eval::evaluator::evaluate_model;
use mask_eval::loader::{load_dataset_from_str, load_predictions_from_str};
use mask_eval::report::{write_dataset_info, write_model_results};
use mask_eval::store::{DatasetHandle, InstanceSet};

const GROUND_TRUTH: &str = r#"{
    "images": [
        {"id": 1, "file_name": "beach_001.jpg", "height": 480, "width": 640},
        {"id": 2, "file_name": "beach_002.jpg", "height": 480, "width": 640}
    ],
    "categories": [
        {"id": 1, "name": "person"},
        {"id": 18, "name": "dog"}
    ],
    "annotations": [
        {"id": 1, "image_id": 1, "category_id": 18, "bbox": [100.0, 120.0, 80.0, 60.0]},
        {"id": 2, "image_id": 1, "category_id": 1, "bbox": [300.0, 80.0, 60.0, 180.0]},
        {"id": 3, "image_id": 2, "category_id": 18, "bbox": [200.0, 200.0, 90.0, 70.0]}
    ]
}"#;

const PREDICTIONS_IMG1: &str = r#"[
    {"classname": "dog", "confidence": 0.94, "bbox": [102.0, 118.0, 80.0, 62.0]},
    {"classname": "dog", "confidence": 0.35, "bbox": [110.0, 125.0, 85.0, 60.0]},
    {"classname": "person", "confidence": 0.88, "bbox": [298.0, 82.0, 62.0, 176.0]}
]"#;

const PREDICTIONS_IMG2: &str = r#"[
    {"classname": "dog", "confidence": 0.52, "bbox": [400.0, 50.0, 90.0, 70.0]}
]"#;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let ground_truth = load_dataset_from_str(GROUND_TRUTH)?;
    let (dataset, stats) = DatasetHandle::from_coco(&ground_truth)?;
    println!("Ingested ground truth: {}", stats.summary_string());

    let mut predictions = InstanceSet::new();
    for prediction in load_predictions_from_str(PREDICTIONS_IMG1)? {
        predictions.insert("beach_001.jpg", prediction);
    }
    for prediction in load_predictions_from_str(PREDICTIONS_IMG2)? {
        predictions.insert("beach_002.jpg", prediction);
    }

    let report = evaluate_model(&dataset, &predictions)?;
    let results = &report.results_on_dataset;

    println!("\n=== Results on dataset ===");
    println!("AP:              {:.4}", results.ap);
    println!("True positives:  {}", results.true_positives.n);
    println!("False positives: {}", results.false_positives.n);
    println!("False negatives: {}", results.false_negatives.n);

    println!("\n=== Per class ===");
    for (classname, summary) in &report.raw_results {
        println!(
            "{classname:>10}: tp={} fp={} fn={} AP={:.4}",
            summary.tp, summary.fp, summary.fn_, summary.ap
        );
    }

    println!("\n=== Per image ===");
    for (image, image_results) in &report.results_per_image {
        println!(
            "{image}: tp={} fp={} fn={}",
            image_results.true_positives.n,
            image_results.false_positives.n,
            image_results.false_negatives.n
        );
    }

    let out_dir = std::env::temp_dir().join("mask-eval-demo");
    let info_path = write_dataset_info(&dataset, &out_dir)?;
    let results_path = write_model_results(&report, &out_dir, "mask_rcnn")?;
    println!("\nWrote {} and {}", info_path.display(), results_path.display());

    Ok(())
}

//! # mask-eval
//!
//! A Rust library for evaluating instance-segmentation models against
//! ground-truth annotations.
//!
//! The engine compares predicted detections (class, mask, confidence,
//! bounding box) with ground-truth instances and produces:
//! - **TP / FP / FN** breakdowns, per class and per image
//! - **AP** (Average Precision) at IoU=0.50, area=all, maxDets=100
//! - Per-image matched/unmatched instance lists for diagnostic rendering
//!
//! ## Features
//!
//! - Load COCO format ground truth and per-image prediction arrays
//! - Decode/encode COCO run-length masks and rasterize polygon segmentations
//! - Reconcile two independently numbered class taxonomies (reference ids
//!   stay below 100, extended classes are numbered from 100)
//! - Greedy confidence-first IoU matching with ignore-region support
//! - Aggregate results at dataset scope and per-image scope
//! - Serialize `dataset-info.json` and per-model `results_{model}.json`
//!
//! ## Quick Start
//!
//! ```rust
//! use mask_eval::evaluator::evaluate_model;
//! use mask_eval::loader::{load_dataset_from_str, load_predictions_from_str};
//! use mask_eval::store::{DatasetHandle, InstanceSet};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let ground_truth = load_dataset_from_str(r#"{
//!     "images": [{"id": 1, "file_name": "a.jpg", "height": 100, "width": 100}],
//!     "categories": [{"id": 18, "name": "dog"}],
//!     "annotations": [
//!         {"id": 1, "image_id": 1, "category_id": 18, "bbox": [10.0, 10.0, 20.0, 20.0]}
//!     ]
//! }"#)?;
//! let (dataset, _stats) = DatasetHandle::from_coco(&ground_truth)?;
//!
//! let mut predictions = InstanceSet::new();
//! for prediction in load_predictions_from_str(
//!     r#"[{"classname": "dog", "confidence": 0.9, "bbox": [10.0, 10.0, 20.0, 20.0]}]"#,
//! )? {
//!     predictions.insert("a.jpg", prediction);
//! }
//!
//! let report = evaluate_model(&dataset, &predictions)?;
//! println!("AP: {:.4}", report.results_on_dataset.ap);
//! # Ok(())
//! # }
//! ```
//!
//! ## Prediction Format
//!
//! One JSON array per (image, model) pair:
//!
//! ```json
//! [
//!   {
//!     "classname": "dog",
//!     "confidence": 0.92,
//!     "mask": {"size": [480, 640], "counts": "..."},
//!     "bbox": [x, y, width, height]
//!   }
//! ]
//! ```

pub mod aggregate;
pub mod error;
pub mod evaluator;
pub mod loader;
pub mod mask;
pub mod matching;
pub mod metrics;
pub mod predictor;
pub mod report;
pub mod stats;
pub mod store;
pub mod types;
pub mod vocabulary;

// Re-export commonly used types and functions
pub use aggregate::{DatasetResults, ImageResults, OutcomeCounts, OutcomeInstance};
pub use error::{EvalError, Result};
pub use evaluator::{evaluate_model, EvalReport};
pub use loader::{
    load_dataset_from_file, load_dataset_from_str, load_predictions_from_file,
    load_predictions_from_str,
};
pub use matching::{
    match_class_in_image, DetectionOutcome, MatchRecord, IOU_THRESHOLD, MAX_DETECTIONS,
};
pub use predictor::{evaluate_predictor, Predictor};
pub use report::{dataset_info, write_dataset_info, write_model_results, DatasetInfo};
pub use stats::ValidationStats;
pub use store::{compute_eval_filters, DatasetHandle, EvalFilters, InstanceSet};
pub use types::{Annotation, BoundingBox, Category, CocoDataset, ImageInfo, Prediction, Rle};
pub use vocabulary::{common_classes, remap, ClassVocabulary, EXTENDED_ID_OFFSET};

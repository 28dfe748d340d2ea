//! Capability interface for inference collaborators.
//!
//! Model families (two-stage detectors, single-shot detectors, kernel-based
//! segmenters) are consumed uniformly through this one interface; the
//! evaluation core never branches on model identity except to label output
//! files by [`Predictor::model_name`].

use crate::error::Result;
use crate::evaluator::{evaluate_model, EvalReport};
use crate::store::{DatasetHandle, InstanceSet};
use crate::types::{ImageInfo, Prediction};

/// One segmentation model as seen by the evaluation core.
pub trait Predictor {
    /// Label used for this model's output files.
    fn model_name(&self) -> &str;

    /// Produce the detections for one image.
    fn predict(&self, image: &ImageInfo) -> Result<Vec<Prediction>>;
}

/// Drive a predictor over every image of a dataset and evaluate the output.
///
/// A predict failure on one image is logged and leaves that image without
/// predictions; it never aborts the run.
pub fn evaluate_predictor<P: Predictor>(
    dataset: &DatasetHandle,
    predictor: &P,
) -> Result<EvalReport> {
    let mut predictions = InstanceSet::new();

    for image in dataset.images() {
        predictions.add_image(&image.file_name);
        match predictor.predict(image) {
            Ok(outputs) => {
                for output in outputs {
                    predictions.insert(&image.file_name, output);
                }
            }
            Err(err) => {
                log::warn!(
                    "model '{}' failed on '{}': {err}",
                    predictor.model_name(),
                    image.file_name
                );
            }
        }
    }

    evaluate_model(dataset, &predictions)
}

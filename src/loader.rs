//! JSON loading utilities for ground-truth and prediction sources.
//!
//! Ground truth arrives as one COCO-style structure per dataset;
//! predictions arrive as one JSON array per (image, model) pair.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::{EvalError, Result};
use crate::types::{CocoDataset, Prediction};

/// Load a COCO-style ground-truth structure from a JSON file.
///
/// # Errors
///
/// Returns `NotFound` if the file is missing, `InvalidFormat` naming the
/// file if it cannot be parsed or fails validation.
///
/// # Example
///
/// ```no_run
/// use mask_eval::loader::load_dataset_from_file;
///
/// let dataset = load_dataset_from_file("annotations.json").unwrap();
/// println!("Loaded {} annotations", dataset.annotations.len());
/// ```
pub fn load_dataset_from_file<P: AsRef<Path>>(path: P) -> Result<CocoDataset> {
    let path = path.as_ref();
    let file = open_file(path)?;
    let reader = BufReader::new(file);
    let dataset: CocoDataset =
        serde_json::from_reader(reader).map_err(|e| invalid_format(path, e))?;

    validate_dataset(&dataset).map_err(|reason| EvalError::InvalidFormat {
        path: path.display().to_string(),
        reason,
    })?;

    Ok(dataset)
}

/// Load a COCO-style ground-truth structure from a JSON string.
///
/// # Example
///
/// ```
/// use mask_eval::loader::load_dataset_from_str;
///
/// let json = r#"{
///     "images": [{"id": 1, "file_name": "a.jpg", "height": 100, "width": 100}],
///     "categories": [{"id": 1, "name": "dog"}],
///     "annotations": []
/// }"#;
/// let dataset = load_dataset_from_str(json).unwrap();
/// ```
pub fn load_dataset_from_str(json_str: &str) -> Result<CocoDataset> {
    let dataset: CocoDataset = serde_json::from_str(json_str)?;
    validate_dataset(&dataset).map_err(|reason| EvalError::InvalidFormat {
        path: "<string>".to_string(),
        reason,
    })?;
    Ok(dataset)
}

/// Load one image's predictions for one model from a JSON file.
///
/// # Errors
///
/// Returns `NotFound` if the file is missing, `InvalidFormat` naming the
/// file on parse or validation failure.
pub fn load_predictions_from_file<P: AsRef<Path>>(path: P) -> Result<Vec<Prediction>> {
    let path = path.as_ref();
    let file = open_file(path)?;
    let reader = BufReader::new(file);
    let predictions: Vec<Prediction> =
        serde_json::from_reader(reader).map_err(|e| invalid_format(path, e))?;

    validate_predictions(&predictions).map_err(|reason| EvalError::InvalidFormat {
        path: path.display().to_string(),
        reason,
    })?;

    Ok(predictions)
}

/// Load one image's predictions from a JSON string.
pub fn load_predictions_from_str(json_str: &str) -> Result<Vec<Prediction>> {
    let predictions: Vec<Prediction> = serde_json::from_str(json_str)?;
    validate_predictions(&predictions).map_err(|reason| EvalError::InvalidFormat {
        path: "<string>".to_string(),
        reason,
    })?;
    Ok(predictions)
}

fn open_file(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            EvalError::NotFound(path.display().to_string())
        } else {
            EvalError::Io(e)
        }
    })
}

fn invalid_format(path: &Path, err: serde_json::Error) -> EvalError {
    EvalError::InvalidFormat {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}

/// Validate that a ground-truth structure is usable for evaluation.
fn validate_dataset(dataset: &CocoDataset) -> std::result::Result<(), String> {
    if dataset.categories.is_empty() {
        return Err("dataset must contain at least one category".to_string());
    }
    if dataset.images.is_empty() {
        return Err("dataset must contain at least one image".to_string());
    }

    for annotation in &dataset.annotations {
        if annotation.bbox.len() != 4 {
            return Err(format!(
                "annotation {} has invalid bbox length: {}",
                annotation.id,
                annotation.bbox.len()
            ));
        }
        if annotation.bbox[2] < 0.0 || annotation.bbox[3] < 0.0 {
            return Err(format!("annotation {} has negative dimensions", annotation.id));
        }
    }

    Ok(())
}

/// Validate a prediction array.
fn validate_predictions(predictions: &[Prediction]) -> std::result::Result<(), String> {
    for (i, prediction) in predictions.iter().enumerate() {
        if prediction.bbox.len() != 4 {
            return Err(format!(
                "prediction {} has invalid bbox length: {}",
                i,
                prediction.bbox.len()
            ));
        }
        if !(0.0..=1.0).contains(&prediction.confidence) {
            return Err(format!(
                "prediction {} has confidence {} outside [0, 1]",
                i, prediction.confidence
            ));
        }
    }
    Ok(())
}

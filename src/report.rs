//! Serializable reports for downstream plotting and reporting collaborators.
//!
//! Two artifacts are produced per dataset: `dataset-info.json` describing
//! the ground truth, and one `results_{model}.json` per evaluated model.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::evaluator::EvalReport;
use crate::store::DatasetHandle;

/// Object counts for one image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSummary {
    pub n_objects: usize,
    pub class_dist: BTreeMap<String, usize>,
}

/// Ground-truth summary for one dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub n_images: usize,
    pub n_objects: usize,
    pub class_dist: BTreeMap<String, usize>,
    pub info_per_image: BTreeMap<String, ImageSummary>,
}

/// Summarize a dataset's ground truth.
pub fn dataset_info(dataset: &DatasetHandle) -> DatasetInfo {
    let mut info_per_image = BTreeMap::new();
    for (image, instances) in dataset.annotations.iter() {
        let mut class_dist: BTreeMap<String, usize> = BTreeMap::new();
        for instance in instances {
            *class_dist.entry(instance.classname.clone()).or_insert(0) += 1;
        }
        info_per_image.insert(
            image.to_string(),
            ImageSummary {
                n_objects: instances.len(),
                class_dist,
            },
        );
    }

    DatasetInfo {
        n_images: dataset.n_images(),
        n_objects: dataset.annotations.len(),
        class_dist: dataset.annotations.class_distribution(),
        info_per_image,
    }
}

/// Write `dataset-info.json` into `dir`, creating the directory if needed.
///
/// Returns the path of the written file.
pub fn write_dataset_info<P: AsRef<Path>>(dataset: &DatasetHandle, dir: P) -> Result<PathBuf> {
    let info = dataset_info(dataset);
    let path = dir.as_ref().join("dataset-info.json");
    write_json(&path, &info)?;
    Ok(path)
}

/// Write one model's evaluation report as `results_{model}.json` into `dir`.
///
/// The model name is only a file label; the report content is model
/// agnostic. Returns the path of the written file.
pub fn write_model_results<P: AsRef<Path>>(
    report: &EvalReport,
    dir: P,
    model_name: &str,
) -> Result<PathBuf> {
    let path = dir.as_ref().join(format!("results_{model_name}.json"));
    write_json(&path, report)?;
    Ok(path)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, value)?;
    Ok(())
}

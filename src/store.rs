//! Dataset handle, instance collections, and class reconciliation filters.
//!
//! The handle is an explicit value owned by the caller and passed by
//! reference into evaluation; there is no process-wide cached dataset
//! state. It maps storage-level identifiers (file names) to the numeric
//! image and category ids the matcher works with.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{EvalError, Result};
use crate::mask;
use crate::stats::ValidationStats;
use crate::types::{Annotation, Category, CocoDataset, ImageInfo, Prediction, Segmentation};
use crate::vocabulary::{self, ClassVocabulary};

/// Access to the class name of an instance record.
pub trait HasClass {
    fn classname(&self) -> &str;
}

impl HasClass for Annotation {
    fn classname(&self) -> &str {
        &self.classname
    }
}

impl HasClass for Prediction {
    fn classname(&self) -> &str {
        &self.classname
    }
}

/// A collection of annotations or predictions keyed by image name.
///
/// Filtering produces copies; the source collection is never mutated.
/// Class filtering and image filtering are two distinct operations:
/// composing them means calling one after the other, and requesting both
/// through [`InstanceSet::select`] at once is a usage error.
#[derive(Debug, Clone)]
pub struct InstanceSet<T> {
    by_image: BTreeMap<String, Vec<T>>,
}

impl<T> Default for InstanceSet<T> {
    fn default() -> Self {
        Self {
            by_image: BTreeMap::new(),
        }
    }
}

impl<T: HasClass + Clone> InstanceSet<T> {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an image key, with or without instances.
    ///
    /// Images with zero instances still participate in per-image results.
    pub fn add_image(&mut self, image: &str) {
        self.by_image.entry(image.to_string()).or_default();
    }

    /// Add one instance under an image.
    pub fn insert(&mut self, image: &str, instance: T) {
        self.by_image
            .entry(image.to_string())
            .or_default()
            .push(instance);
    }

    /// Image names in this collection, sorted.
    pub fn image_names(&self) -> impl Iterator<Item = &str> {
        self.by_image.keys().map(String::as_str)
    }

    /// Instances for one image; empty if the image is unknown.
    pub fn instances(&self, image: &str) -> &[T] {
        self.by_image.get(image).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Iterate (image name, instances) pairs in image-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[T])> {
        self.by_image.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Total number of instances across all images.
    pub fn len(&self) -> usize {
        self.by_image.values().map(Vec::len).sum()
    }

    /// Whether the collection holds no instances.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of registered images.
    pub fn n_images(&self) -> usize {
        self.by_image.len()
    }

    /// Distinct class names present in the collection.
    pub fn class_names(&self) -> BTreeSet<String> {
        self.by_image
            .values()
            .flatten()
            .map(|i| i.classname().to_string())
            .collect()
    }

    /// Instances per class name.
    pub fn class_distribution(&self) -> BTreeMap<String, usize> {
        let mut dist = BTreeMap::new();
        for instance in self.by_image.values().flatten() {
            *dist.entry(instance.classname().to_string()).or_insert(0) += 1;
        }
        dist
    }

    /// Keep only instances whose class is in `classes` (case-insensitive).
    ///
    /// Every image key survives, so images emptied by the filter still show
    /// up downstream with zero instances.
    pub fn filter_by_classes(&self, classes: &BTreeSet<String>) -> Self {
        let keys: BTreeSet<String> = classes.iter().map(|c| c.to_lowercase()).collect();
        let by_image = self
            .by_image
            .iter()
            .map(|(image, instances)| {
                let kept = instances
                    .iter()
                    .filter(|i| keys.contains(&i.classname().to_lowercase()))
                    .cloned()
                    .collect();
                (image.clone(), kept)
            })
            .collect();
        Self { by_image }
    }

    /// Reduce the collection to a single image.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the image is not in the collection.
    pub fn filter_by_image(&self, image: &str) -> Result<Self> {
        let instances = self
            .by_image
            .get(image)
            .ok_or_else(|| EvalError::NotFound(format!("image '{image}'")))?;
        let mut by_image = BTreeMap::new();
        by_image.insert(image.to_string(), instances.clone());
        Ok(Self { by_image })
    }

    /// Apply exactly one of the two filters.
    ///
    /// # Errors
    ///
    /// Returns `InvalidFilter` when both a class set and an image are
    /// requested simultaneously; the two filters compose only by calling
    /// one after the other.
    pub fn select(
        &self,
        classes: Option<&BTreeSet<String>>,
        image: Option<&str>,
    ) -> Result<Self> {
        match (classes, image) {
            (Some(_), Some(_)) => Err(EvalError::InvalidFilter(
                "cannot filter by classes and image simultaneously".to_string(),
            )),
            (Some(classes), None) => Ok(self.filter_by_classes(classes)),
            (None, Some(image)) => self.filter_by_image(image),
            (None, None) => Ok(self.clone()),
        }
    }
}

/// Class exclusions applied before matching for one (dataset, model) pair.
///
/// Classes present on only one side cannot contribute to TP/FP/FN counts
/// and are excluded from both sets identically, so the dataset-level and
/// per-image evaluations share the same denominator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalFilters {
    pub classes_considered: BTreeSet<String>,
    pub pred_classes_ignored: BTreeSet<String>,
    pub ann_classes_ignored: BTreeSet<String>,
}

/// Compute the class filters for one (dataset, model) pair.
///
/// Computed once and applied to both the annotation and prediction sets.
pub fn compute_eval_filters(
    annotations: &InstanceSet<Annotation>,
    predictions: &InstanceSet<Prediction>,
) -> EvalFilters {
    let ann_classes = annotations.class_names();
    let pred_classes = predictions.class_names();

    let classes_considered = vocabulary::common_classes(&ann_classes, &pred_classes);
    let common_keys: BTreeSet<String> = classes_considered
        .iter()
        .map(|c| c.to_lowercase())
        .collect();

    let pred_classes_ignored = pred_classes
        .into_iter()
        .filter(|c| !common_keys.contains(&c.to_lowercase()))
        .collect();
    let ann_classes_ignored = ann_classes
        .into_iter()
        .filter(|c| !common_keys.contains(&c.to_lowercase()))
        .collect();

    EvalFilters {
        classes_considered,
        pred_classes_ignored,
        ann_classes_ignored,
    }
}

/// Caller-owned handle to one dataset's ground truth.
///
/// Holds the image table, the reconciled class vocabulary, and the
/// annotation collection keyed by image name.
#[derive(Debug, Clone)]
pub struct DatasetHandle {
    images: BTreeMap<String, ImageInfo>,
    pub annotations: InstanceSet<Annotation>,
    pub vocabulary: ClassVocabulary,
}

impl DatasetHandle {
    /// Build a handle from a COCO-style structure, using the dataset's own
    /// categories as the reference taxonomy.
    ///
    /// Instances referencing unknown images or categories, or carrying
    /// malformed boxes, are skipped and counted in the returned stats.
    pub fn from_coco(dataset: &CocoDataset) -> Result<(Self, ValidationStats)> {
        let vocab = ClassVocabulary::build(&dataset.categories, &[])?;
        Self::ingest(dataset, vocab)
    }

    /// Build a handle from a COCO-style structure whose taxonomy is
    /// reconciled against an external reference numbering.
    ///
    /// Dataset classes absent from the reference get extended ids; every
    /// category reference in the dataset is renumbered (via a pure remap of
    /// a copy) into the reconciled vocabulary before ingestion.
    pub fn with_reference(
        dataset: &CocoDataset,
        reference: &[Category],
    ) -> Result<(Self, ValidationStats)> {
        let extended: Vec<String> = dataset
            .categories
            .iter()
            .map(|c| c.name.clone())
            .collect();
        let vocab = ClassVocabulary::build(reference, &extended)?;
        let table = vocab.remap_table(&dataset.categories);
        let remapped = vocabulary::remap(dataset, &table);
        Self::ingest(&remapped, vocab)
    }

    fn ingest(
        dataset: &CocoDataset,
        vocabulary: ClassVocabulary,
    ) -> Result<(Self, ValidationStats)> {
        let mut stats = ValidationStats::new();
        let mut images = BTreeMap::new();
        let mut by_id: BTreeMap<u64, ImageInfo> = BTreeMap::new();
        let mut annotations = InstanceSet::new();

        for image in &dataset.images {
            images.insert(image.file_name.clone(), image.clone());
            by_id.insert(image.id, image.clone());
            annotations.add_image(&image.file_name);
        }

        for ann in &dataset.annotations {
            stats.add_annotation();

            let Some(image) = by_id.get(&ann.image_id) else {
                log::warn!("annotation {} references unknown image {}", ann.id, ann.image_id);
                stats.skip_unknown_image();
                continue;
            };
            let Some(classname) = vocabulary.name_of(ann.category_id) else {
                log::warn!(
                    "annotation {} references unknown category {}",
                    ann.id,
                    ann.category_id
                );
                stats.skip_unknown_category();
                continue;
            };
            if ann.bbox.len() != 4 || ann.bbox[2] < 0.0 || ann.bbox[3] < 0.0 {
                log::warn!("annotation {} has a malformed bbox", ann.id);
                stats.skip_invalid_box();
                continue;
            }

            let mask = match &ann.segmentation {
                Some(Segmentation::Rle(rle)) => Some(rle.clone()),
                Some(Segmentation::Polygons(polygons)) => {
                    Some(mask::rasterize_polygons(polygons, image.height, image.width)?)
                }
                None => None,
            };

            annotations.insert(
                &image.file_name,
                Annotation {
                    classname: classname.to_string(),
                    mask,
                    bbox: ann.bbox.clone(),
                    ignore: ann.is_ignored(),
                },
            );
        }

        Ok((
            Self {
                images,
                annotations,
                vocabulary,
            },
            stats,
        ))
    }

    /// Numeric id for an image file name.
    pub fn image_id(&self, file_name: &str) -> Option<u64> {
        self.images.get(file_name).map(|i| i.id)
    }

    /// Image metadata for a file name.
    pub fn image_info(&self, file_name: &str) -> Option<&ImageInfo> {
        self.images.get(file_name)
    }

    /// Iterate images in file-name order.
    pub fn images(&self) -> impl Iterator<Item = &ImageInfo> {
        self.images.values()
    }

    /// Number of images in the dataset.
    pub fn n_images(&self) -> usize {
        self.images.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CocoAnnotation;

    fn annotation(classname: &str) -> Annotation {
        Annotation {
            classname: classname.to_string(),
            mask: None,
            bbox: vec![0.0, 0.0, 10.0, 10.0],
            ignore: false,
        }
    }

    fn prediction(classname: &str) -> Prediction {
        Prediction {
            classname: classname.to_string(),
            confidence: 0.9,
            mask: None,
            bbox: vec![0.0, 0.0, 10.0, 10.0],
        }
    }

    fn sample_set() -> InstanceSet<Annotation> {
        let mut set = InstanceSet::new();
        set.insert("a.jpg", annotation("dog"));
        set.insert("a.jpg", annotation("cat"));
        set.insert("b.jpg", annotation("dog"));
        set
    }

    #[test]
    fn test_filter_by_classes_keeps_image_keys() {
        let set = sample_set();
        let classes: BTreeSet<String> = ["cat".to_string()].into_iter().collect();
        let filtered = set.filter_by_classes(&classes);

        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.n_images(), 2);
        assert!(filtered.instances("b.jpg").is_empty());
    }

    #[test]
    fn test_filter_by_classes_case_insensitive() {
        let set = sample_set();
        let classes: BTreeSet<String> = ["DOG".to_string()].into_iter().collect();
        assert_eq!(set.filter_by_classes(&classes).len(), 2);
    }

    #[test]
    fn test_filter_by_image() {
        let set = sample_set();
        let filtered = set.filter_by_image("a.jpg").unwrap();
        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered.n_images(), 1);
    }

    #[test]
    fn test_filter_by_unknown_image() {
        let set = sample_set();
        assert!(matches!(
            set.filter_by_image("missing.jpg"),
            Err(EvalError::NotFound(_))
        ));
    }

    #[test]
    fn test_select_rejects_both_filters() {
        let set = sample_set();
        let classes: BTreeSet<String> = ["dog".to_string()].into_iter().collect();
        let result = set.select(Some(&classes), Some("a.jpg"));
        assert!(matches!(result, Err(EvalError::InvalidFilter(_))));
    }

    #[test]
    fn test_select_single_filter_paths() {
        let set = sample_set();
        let classes: BTreeSet<String> = ["dog".to_string()].into_iter().collect();
        assert_eq!(set.select(Some(&classes), None).unwrap().len(), 2);
        assert_eq!(set.select(None, Some("b.jpg")).unwrap().len(), 1);
        assert_eq!(set.select(None, None).unwrap().len(), 3);
    }

    #[test]
    fn test_eval_filters_partition() {
        let mut anns = InstanceSet::new();
        anns.insert("a.jpg", annotation("dog"));
        anns.insert("a.jpg", annotation("heron"));

        let mut preds = InstanceSet::new();
        preds.insert("a.jpg", prediction("Dog"));
        preds.insert("a.jpg", prediction("otter"));

        let filters = compute_eval_filters(&anns, &preds);
        assert!(filters.classes_considered.contains("dog"));
        assert_eq!(filters.classes_considered.len(), 1);
        assert!(filters.pred_classes_ignored.contains("otter"));
        assert!(filters.ann_classes_ignored.contains("heron"));
    }

    fn coco_fixture() -> CocoDataset {
        CocoDataset {
            images: vec![
                ImageInfo {
                    id: 1,
                    file_name: "a.jpg".to_string(),
                    height: 100,
                    width: 100,
                },
                ImageInfo {
                    id: 2,
                    file_name: "b.jpg".to_string(),
                    height: 100,
                    width: 100,
                },
            ],
            categories: vec![Category {
                id: 7,
                name: "dog".to_string(),
                supercategory: None,
            }],
            annotations: vec![
                CocoAnnotation {
                    id: 1,
                    image_id: 1,
                    category_id: 7,
                    bbox: vec![10.0, 10.0, 20.0, 20.0],
                    segmentation: None,
                    area: None,
                    iscrowd: None,
                },
                CocoAnnotation {
                    id: 2,
                    image_id: 99,
                    category_id: 7,
                    bbox: vec![10.0, 10.0, 20.0, 20.0],
                    segmentation: None,
                    area: None,
                    iscrowd: None,
                },
                CocoAnnotation {
                    id: 3,
                    image_id: 1,
                    category_id: 42,
                    bbox: vec![10.0, 10.0, 20.0, 20.0],
                    segmentation: None,
                    area: None,
                    iscrowd: None,
                },
            ],
        }
    }

    #[test]
    fn test_from_coco_skips_dangling_references() {
        let (handle, stats) = DatasetHandle::from_coco(&coco_fixture()).unwrap();

        assert_eq!(handle.n_images(), 2);
        assert_eq!(handle.annotations.len(), 1);
        assert_eq!(stats.total_annotations, 3);
        assert_eq!(stats.skipped_unknown_image, 1);
        assert_eq!(stats.skipped_unknown_category, 1);
        assert_eq!(handle.image_id("a.jpg"), Some(1));
        assert_eq!(handle.image_id("missing.jpg"), None);
    }

    #[test]
    fn test_with_reference_renumbers_into_vocabulary() {
        let reference = vec![Category {
            id: 18,
            name: "Dog".to_string(),
            supercategory: None,
        }];
        let (handle, _) = DatasetHandle::with_reference(&coco_fixture(), &reference).unwrap();

        // Dataset id 7 was renumbered to reference id 18 by name.
        assert_eq!(handle.vocabulary.id_of("dog"), Some(18));
        let instances = handle.annotations.instances("a.jpg");
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].classname, "Dog");
    }

    #[test]
    fn test_empty_images_registered() {
        let (handle, _) = DatasetHandle::from_coco(&coco_fixture()).unwrap();
        assert!(handle.annotations.instances("b.jpg").is_empty());
        assert_eq!(handle.annotations.n_images(), 2);
    }
}

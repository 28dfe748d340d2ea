//! Core data types for annotations, predictions, and COCO-style sources.

use serde::{Deserialize, Serialize};

/// Represents a bounding box in COCO format (x, y, width, height).
///
/// Coordinates are in LTWH (Left-Top-Width-Height) format where:
/// - x: Left coordinate
/// - y: Top coordinate
/// - width: Box width
/// - height: Box height
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    /// Create a new bounding box.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Get the area of the bounding box.
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Get the right coordinate (x + width).
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Get the bottom coordinate (y + height).
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Check if the bounding box is valid (positive dimensions).
    pub fn is_valid(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// Compressed run-length encoded binary mask, COCO style.
///
/// `size` is `[height, width]`; `counts` holds alternating background and
/// foreground run lengths in the COCO LEB128-like string format. The dense
/// form is column-major: pixel (x, y) sits at index `y + height * x`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rle {
    pub size: [u32; 2],
    pub counts: String,
}

impl Rle {
    /// Mask height in pixels.
    pub fn height(&self) -> u32 {
        self.size[0]
    }

    /// Mask width in pixels.
    pub fn width(&self) -> u32 {
        self.size[1]
    }
}

/// Segmentation as found in COCO ground-truth files: either a list of
/// polygons (flat `[x0, y0, x1, y1, ...]` rings) or a compressed RLE.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Segmentation {
    Polygons(Vec<Vec<f64>>),
    Rle(Rle),
}

/// One ground-truth object instance in one image.
///
/// Confidence is implicitly 1.0. Instances flagged `ignore` are excluded
/// from TP/FN accounting without being removed from the dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub classname: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mask: Option<Rle>,
    /// Bounding box in [x, y, width, height] format
    pub bbox: Vec<f64>,
    #[serde(default)]
    pub ignore: bool,
}

impl Annotation {
    /// Convert the bbox array to a BoundingBox struct.
    pub fn to_bbox(&self) -> crate::error::Result<BoundingBox> {
        bbox_from_slice(&self.bbox)
    }
}

/// One model output for one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub classname: String,
    /// Confidence score in [0, 1]
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mask: Option<Rle>,
    /// Bounding box in [x, y, width, height] format
    pub bbox: Vec<f64>,
}

impl Prediction {
    /// Convert the bbox array to a BoundingBox struct.
    pub fn to_bbox(&self) -> crate::error::Result<BoundingBox> {
        bbox_from_slice(&self.bbox)
    }
}

fn bbox_from_slice(bbox: &[f64]) -> crate::error::Result<BoundingBox> {
    if bbox.len() != 4 {
        return Err(crate::error::EvalError::InvalidBoundingBox(format!(
            "Expected 4 values, got {}",
            bbox.len()
        )));
    }
    Ok(BoundingBox::new(bbox[0], bbox[1], bbox[2], bbox[3]))
}

/// Represents an image in a COCO-style dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub id: u64,
    pub file_name: String,
    pub height: u32,
    pub width: u32,
}

/// Represents a category in a COCO-style dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: u32,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supercategory: Option<String>,
}

/// An annotation record as found in COCO ground-truth files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CocoAnnotation {
    pub id: u64,
    pub image_id: u64,
    pub category_id: u32,
    /// Bounding box in [x, y, width, height] format
    pub bbox: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segmentation: Option<Segmentation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iscrowd: Option<u8>,
}

impl CocoAnnotation {
    /// Whether this instance should be excluded from TP/FN accounting.
    ///
    /// Crowd regions are the standard non-evaluable ground truths.
    pub fn is_ignored(&self) -> bool {
        self.iscrowd == Some(1)
    }
}

/// A complete COCO-style ground-truth structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CocoDataset {
    pub images: Vec<ImageInfo>,
    pub categories: Vec<Category>,
    pub annotations: Vec<CocoAnnotation>,
}

//! Metrics calculation modules.

pub mod ap;
pub mod iou;
pub mod precision_recall;

pub use ap::{calculate_ap, mean_ap};
pub use iou::{calculate_iou, calculate_iou_matrix};
pub use precision_recall::{
    calculate_precision_recall, cumulative_pr_curve, interpolate_precision, PrecisionRecall,
};

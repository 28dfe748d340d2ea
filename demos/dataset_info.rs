//! Summarize a COCO-style ground-truth file into dataset-info form.
//!
//! Run with: cargo run --example dataset_info -- annotations.json

use mask_eval::loader::load_dataset_from_file;
use mask_eval::report::dataset_info;
use mask_eval::store::DatasetHandle;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let path = std::env::args()
        .nth(1)
        .ok_or("usage: dataset_info <annotations.json>")?;

    let ground_truth = load_dataset_from_file(&path)?;
    let (dataset, stats) = DatasetHandle::from_coco(&ground_truth)?;
    let info = dataset_info(&dataset);

    println!("Images:  {}", info.n_images);
    println!("Objects: {}", info.n_objects);
    println!("Skipped: {}", stats.total_skipped());
    println!("\nClass distribution:");
    for (classname, count) in &info.class_dist {
        println!("  {classname:>15}: {count}");
    }

    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}

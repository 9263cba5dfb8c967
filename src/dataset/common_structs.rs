use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tch::Tensor;
/// Frequently used structs in the provided data transformers/loaders/augmenters

/// One entry of a dataset: where its files are and how it is called
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    pub image_path: PathBuf,
    /// None for inference-only data without ground truth
    pub label_path: Option<PathBuf>,
    pub name: String,
    pub weight: f32,
}

impl SampleRecord {
    pub fn labeled(image_path: PathBuf, label_path: PathBuf, name: String) -> SampleRecord {
        SampleRecord {
            image_path,
            label_path: Some(label_path),
            name,
            weight: 1.0,
        }
    }

    pub fn unlabeled(image_path: PathBuf, name: String) -> SampleRecord {
        SampleRecord {
            image_path,
            label_path: None,
            name,
            weight: 1.0,
        }
    }
}

/// Shape of a decoded image before any augmentation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    pub height: u32,
    pub width: u32,
    pub channels: u32,
}

/// Image (3, H, W) as normalized f32 and label (H, W) as i64 class indices
#[derive(Debug)]
pub struct LabeledSample {
    pub image: Tensor,
    pub label: Tensor,
    pub original_size: ImageSize,
    pub name: String,
}

/// Image (3, H, W) as normalized f32
#[derive(Debug)]
pub struct UnlabeledSample {
    pub image: Tensor,
    pub original_size: ImageSize,
    pub name: String,
}

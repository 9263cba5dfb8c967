pub mod batch_loader;
pub mod cityscapes;
pub mod image_list;
pub mod segmentation_pairs;
pub mod synscapes;
pub mod unlabeled_images;

pub use batch_loader::{BatchLoader, LabeledBatch, UnlabeledBatch};
pub use segmentation_pairs::{AugmentedPairs, EvalPairs};
pub use unlabeled_images::UnlabeledImages;

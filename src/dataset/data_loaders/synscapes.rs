use super::{AugmentedPairs, EvalPairs};
use crate::dataset::common_structs::SampleRecord;
use crate::dataset::data_augmenters::scale_crop_flip::ScaleCropFlip;
use crate::dataset::data_transformers::list_file::{read_id_list, repeat_to_cover};
use crate::dataset::label_remap::{LabelRemap, LabelSource};
use crate::dataset::{DatasetError, MissingFilePolicy};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Which pickled id list to read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Val,
}

impl Split {
    pub fn id_list_path(&self, root_meta: &Path) -> PathBuf {
        match self {
            Split::Train => root_meta.join("train_img_ids.pkl"),
            Split::Val => root_meta.join("val_img_ids.pkl"),
        }
    }
}

impl FromStr for Split {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "train" => Ok(Split::Train),
            "val" => Ok(Split::Val),
            other => Err(DatasetError::InvalidSplit(other.to_string())),
        }
    }
}

fn records(root: &Path, root_meta: &Path, split: Split) -> Result<Vec<SampleRecord>, DatasetError> {
    let ids = read_id_list(&split.id_list_path(root_meta))?;
    Ok(ids
        .into_iter()
        .map(|id| {
            SampleRecord::labeled(
                root.join("img").join("rgb-2k").join(format!("{}.png", id)),
                root_meta.join("gtFine").join(format!("{}.png", id)),
                id,
            )
        })
        .collect())
}

/// Training pairs. Unlike Cityscapes, a small fraction of Synscapes images is missing, so those
/// are substituted by the first sample.
pub fn augmentation(
    root: &Path,
    root_meta: &Path,
    split: Split,
    max_iters: Option<usize>,
    crop_size: (u32, u32),
    ignore_label: u8,
) -> Result<AugmentedPairs, DatasetError> {
    let records = records(root, root_meta, split)?;
    log::info!("Synscapes augmentation - num unique examples: {}", records.len());
    let records = repeat_to_cover(records, max_iters);
    log::info!("Synscapes augmentation - num examples: {}", records.len());
    Ok(AugmentedPairs::new(
        records,
        LabelRemap::for_source(LabelSource::Synscapes, ignore_label),
        ScaleCropFlip::new(crop_size, ignore_label),
        MissingFilePolicy::SubstituteFirst,
    ))
}

pub fn eval(
    root: &Path,
    root_meta: &Path,
    split: Split,
    ignore_label: u8,
) -> Result<EvalPairs, DatasetError> {
    let records = records(root, root_meta, split)?;
    log::info!("Synscapes eval - num examples: {}", records.len());
    Ok(EvalPairs::new(
        records,
        LabelRemap::for_source(LabelSource::Synscapes, ignore_label),
        MissingFilePolicy::SubstituteFirst,
    ))
}

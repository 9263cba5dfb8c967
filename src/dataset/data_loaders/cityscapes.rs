use super::{AugmentedPairs, EvalPairs, UnlabeledImages};
use crate::dataset::common_structs::SampleRecord;
use crate::dataset::data_augmenters::scale_crop_flip::ScaleCropFlip;
use crate::dataset::data_transformers::list_file::{read_list_file, repeat_to_cover};
use crate::dataset::label_remap::{LabelRemap, LabelSource};
use crate::dataset::{DatasetError, MissingFilePolicy};
use std::path::{Path, PathBuf};

const SEQUENCE_IMAGE_SUFFIX: &str = "_leftImg8bit.png";

/// Training pairs from a Cityscapes list file. `max_iters` repeats the list so it covers that many
/// samples. Missing images are an error here.
pub fn augmentation(
    root: &Path,
    list_path: &Path,
    max_iters: Option<usize>,
    crop_size: (u32, u32),
    ignore_label: u8,
) -> Result<AugmentedPairs, DatasetError> {
    let records = read_list_file(root, list_path)?;
    log::info!("Cityscapes augmentation - num unique examples: {}", records.len());
    let records = repeat_to_cover(records, max_iters);
    log::info!("Cityscapes augmentation - num examples: {}", records.len());
    Ok(AugmentedPairs::new(
        records,
        LabelRemap::for_source(LabelSource::Cityscapes, ignore_label),
        ScaleCropFlip::new(crop_size, ignore_label),
        MissingFilePolicy::Fail,
    ))
}

/// Full resolution pairs from a Cityscapes list file
pub fn eval(root: &Path, list_path: &Path, ignore_label: u8) -> Result<EvalPairs, DatasetError> {
    let records = read_list_file(root, list_path)?;
    log::info!("Cityscapes eval - num examples: {}", records.len());
    Ok(EvalPairs::new(
        records,
        LabelRemap::for_source(LabelSource::Cityscapes, ignore_label),
        MissingFilePolicy::SubstituteFirst,
    ))
}

pub fn sequence_dir(data_path: &Path, sequence: &str) -> PathBuf {
    data_path
        .join("leftImg8bit")
        .join("demoVideo")
        .join(format!("stuttgart_{}", sequence))
}

/// The frames of one demo video sequence, sorted by file name. Frame names drop the
/// `_leftImg8bit.png` suffix, e.g. `stuttgart_00_000000_000031`.
pub fn sequence(data_path: &Path, sequence: &str) -> Result<UnlabeledImages, DatasetError> {
    let img_dir = sequence_dir(data_path, sequence);
    let io_err = |source| DatasetError::Io {
        path: img_dir.clone(),
        source,
    };
    let mut records = vec![];
    for entry in std::fs::read_dir(&img_dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if !path.is_file() {
            continue;
        }
        let file_name = match path.file_name().and_then(|name| name.to_str()) {
            Some(file_name) => file_name.to_string(),
            None => continue,
        };
        let name = match file_name.strip_suffix(SEQUENCE_IMAGE_SUFFIX) {
            Some(name) => name.to_string(),
            None => {
                log::warn!("skipping {}, not a sequence frame", path.display());
                continue;
            }
        };
        records.push(SampleRecord::unlabeled(path, name));
    }
    records.sort_by(|a, b| a.name.cmp(&b.name));
    log::info!("Cityscapes sequence {} - num examples: {}", sequence, records.len());
    Ok(UnlabeledImages::new(records, MissingFilePolicy::SubstituteFirst))
}

const LABEL_SUFFIX: &str = "_gtFine_labelIds.png";

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, DatasetError> {
    let io_err = |source| DatasetError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut paths = vec![];
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        paths.push(entry.map_err(io_err)?.path());
    }
    paths.sort();
    Ok(paths)
}

/// Pairs every `leftImg8bit/<split>/<city>/*_leftImg8bit.png` under `root` with its
/// `gtFine/<split>/<city>/*_gtFine_labelIds.png`. Paths are relative to `root` and sorted, images
/// without a label are skipped.
pub fn list_split(root: &Path, split: &str) -> Result<Vec<(PathBuf, PathBuf)>, DatasetError> {
    let mut pairs = vec![];
    for city_dir in sorted_entries(&root.join("leftImg8bit").join(split))? {
        if !city_dir.is_dir() {
            continue;
        }
        let city = match city_dir.file_name() {
            Some(city) => city.to_owned(),
            None => continue,
        };
        for image_path in sorted_entries(&city_dir)? {
            let stem = match image_path
                .file_name()
                .and_then(|name| name.to_str())
                .and_then(|name| name.strip_suffix(SEQUENCE_IMAGE_SUFFIX))
            {
                Some(stem) => stem.to_string(),
                None => continue,
            };
            let label = PathBuf::from("gtFine")
                .join(split)
                .join(&city)
                .join(format!("{}{}", stem, LABEL_SUFFIX));
            if !root.join(&label).is_file() {
                log::warn!("skipping {}, no label at {}", image_path.display(), label.display());
                continue;
            }
            let image = PathBuf::from("leftImg8bit")
                .join(split)
                .join(&city)
                .join(format!("{}{}", stem, SEQUENCE_IMAGE_SUFFIX));
            pairs.push((image, label));
        }
    }
    log::info!("Cityscapes {} - num pairs: {}", split, pairs.len());
    Ok(pairs)
}

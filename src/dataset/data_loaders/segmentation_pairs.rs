use crate::dataset::common_structs::{LabeledSample, SampleRecord};
use crate::dataset::data_augmenters::scale_crop_flip::ScaleCropFlip;
use crate::dataset::data_transformers::img2tensor::{
    decode_color, decode_label, from_img_to_tensor, gray_to_tensor, image_size,
};
use crate::dataset::label_remap::LabelRemap;
use crate::dataset::{fetch_with_policy, DatasetError, Fetched, MissingFilePolicy, SegmentationDataset};
use image::{GrayImage, RgbImage};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn load_pair(
    record: &SampleRecord,
    remap: &LabelRemap,
) -> Result<(RgbImage, GrayImage), DatasetError> {
    let image = decode_color(&record.image_path)?;
    let label_path = record
        .label_path
        .as_ref()
        .ok_or_else(|| DatasetError::Unlabeled(record.name.clone()))?;
    let label = remap.apply(&decode_label(label_path)?);
    Ok((image, label))
}

/// Image/label pairs with random scale, crop and flip, for training
pub struct AugmentedPairs {
    records: Vec<SampleRecord>,
    remap: LabelRemap,
    augmenter: ScaleCropFlip,
    policy: MissingFilePolicy,
    rng: StdRng,
}

impl AugmentedPairs {
    pub fn new(
        records: Vec<SampleRecord>,
        remap: LabelRemap,
        augmenter: ScaleCropFlip,
        policy: MissingFilePolicy,
    ) -> AugmentedPairs {
        AugmentedPairs {
            records,
            remap,
            augmenter,
            policy,
            rng: StdRng::from_entropy(),
        }
    }

    /// Makes the augmentation draws repeatable
    pub fn with_seed(mut self, seed: u64) -> AugmentedPairs {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn records(&self) -> &[SampleRecord] {
        &self.records
    }
}

impl SegmentationDataset for AugmentedPairs {
    type Item = LabeledSample;

    fn len(&self) -> usize {
        self.records.len()
    }

    fn get(&mut self, index: usize) -> Result<Fetched<LabeledSample>, DatasetError> {
        let records = &self.records;
        let remap = &self.remap;
        let augmenter = &self.augmenter;
        let rng = &mut self.rng;
        fetch_with_policy(
            index,
            records.len(),
            |i| records[i].image_path.exists(),
            self.policy,
            |i| records[i].image_path.clone(),
            |i| {
                let record = &records[i];
                let (image, label) = load_pair(record, remap)?;
                let original_size = image_size(&image);
                let (image, label) = augmenter.augment(&image, &label, rng);
                Ok(LabeledSample {
                    image,
                    label,
                    original_size,
                    name: record.name.clone(),
                })
            },
        )
    }
}

/// Image/label pairs at full resolution without any randomness, for evaluation
pub struct EvalPairs {
    records: Vec<SampleRecord>,
    remap: LabelRemap,
    policy: MissingFilePolicy,
}

impl EvalPairs {
    pub fn new(records: Vec<SampleRecord>, remap: LabelRemap, policy: MissingFilePolicy) -> EvalPairs {
        EvalPairs {
            records,
            remap,
            policy,
        }
    }

    pub fn records(&self) -> &[SampleRecord] {
        &self.records
    }
}

impl SegmentationDataset for EvalPairs {
    type Item = LabeledSample;

    fn len(&self) -> usize {
        self.records.len()
    }

    fn get(&mut self, index: usize) -> Result<Fetched<LabeledSample>, DatasetError> {
        let records = &self.records;
        let remap = &self.remap;
        fetch_with_policy(
            index,
            records.len(),
            |i| records[i].image_path.exists(),
            self.policy,
            |i| records[i].image_path.clone(),
            |i| {
                let record = &records[i];
                let (image, label) = load_pair(record, remap)?;
                Ok(LabeledSample {
                    original_size: image_size(&image),
                    image: from_img_to_tensor(&image),
                    label: gray_to_tensor(&label),
                    name: record.name.clone(),
                })
            },
        )
    }
}


#[cfg(test)]
mod tests {
    use super::test_data::write_pair;
    use super::*;
    use crate::dataset::label_remap::{LabelSource, DEFAULT_IGNORE_LABEL};
    use tch::Kind;

    fn records(dir: &std::path::Path) -> Vec<SampleRecord> {
        let (img_a, label_a) = write_pair(dir, "a", 20, 10);
        let (img_b, label_b) = write_pair(dir, "b", 20, 10);
        vec![
            SampleRecord::labeled(img_a, label_a, "a".to_string()),
            SampleRecord::labeled(img_b, label_b, "b".to_string()),
            SampleRecord::labeled(dir.join("gone.png"), dir.join("gone_label.png"), "gone".to_string()),
        ]
    }

    fn remap() -> LabelRemap {
        LabelRemap::for_source(LabelSource::Cityscapes, DEFAULT_IGNORE_LABEL)
    }

    #[test]
    fn eval_sample_is_full_resolution_and_remapped() {
        let dir = tempfile::tempdir().unwrap();
        let mut dataset = EvalPairs::new(records(dir.path()), remap(), MissingFilePolicy::SubstituteFirst);
        let sample = dataset.get(1).unwrap().into_inner();
        assert_eq!(sample.name, "b");
        assert_eq!(sample.image.size(), vec![3, 10, 20]);
        assert_eq!(sample.label.size(), vec![10, 20]);
        assert_eq!(sample.original_size.height, 10);
        assert_eq!(sample.original_size.width, 20);
        assert_eq!(sample.original_size.channels, 3);
        assert_eq!(sample.label.int64_value(&[0, 0]), 0);
        assert_eq!(sample.label.int64_value(&[0, 1]), 13);
        assert_eq!(sample.label.int64_value(&[0, 2]), 255);
    }

    #[test]
    fn eval_access_is_repeatable() {
        let dir = tempfile::tempdir().unwrap();
        let mut dataset = EvalPairs::new(records(dir.path()), remap(), MissingFilePolicy::SubstituteFirst);
        let first = dataset.get(0).unwrap().into_inner();
        let second = dataset.get(0).unwrap().into_inner();
        assert!(first.image.equal(&second.image));
        assert!(first.label.equal(&second.label));
        assert_eq!(first.image.kind(), Kind::Float);
    }

    #[test]
    fn eval_missing_image_is_substituted() {
        let dir = tempfile::tempdir().unwrap();
        let mut dataset = EvalPairs::new(records(dir.path()), remap(), MissingFilePolicy::SubstituteFirst);
        let fetched = dataset.get(2).unwrap();
        assert_eq!(fetched.requested_index(), Some(2));
        assert_eq!(fetched.sample().name, "a");
    }

    #[test]
    fn augmented_missing_image_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut dataset = AugmentedPairs::new(
            records(dir.path()),
            remap(),
            ScaleCropFlip::new((8, 8), DEFAULT_IGNORE_LABEL),
            MissingFilePolicy::Fail,
        );
        assert!(matches!(dataset.get(2), Err(DatasetError::MissingFile(_))));
    }

    #[test]
    fn augmented_samples_have_crop_size_and_original_shape() {
        let dir = tempfile::tempdir().unwrap();
        let mut dataset = AugmentedPairs::new(
            records(dir.path()),
            remap(),
            ScaleCropFlip::new((16, 32), DEFAULT_IGNORE_LABEL),
            MissingFilePolicy::Fail,
        )
        .with_seed(5);
        for _ in 0..5 {
            let sample = dataset.get(0).unwrap().into_inner();
            assert_eq!(sample.image.size(), vec![3, 16, 32]);
            assert_eq!(sample.label.size(), vec![16, 32]);
            assert_eq!(sample.original_size.width, 20);
            let values = Vec::<i64>::try_from(&sample.label.reshape([-1])).unwrap();
            assert!(values.iter().all(|&v| v == 0 || v == 13 || v == 255));
        }
    }
}

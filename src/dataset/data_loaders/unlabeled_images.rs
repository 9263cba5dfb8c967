use crate::dataset::common_structs::{SampleRecord, UnlabeledSample};
use crate::dataset::data_transformers::img2tensor::{decode_color, from_img_to_tensor, image_size};
use crate::dataset::{fetch_with_policy, DatasetError, Fetched, MissingFilePolicy, SegmentationDataset};

/// Images without ground truth, normalized like the evaluation pairs
pub struct UnlabeledImages {
    records: Vec<SampleRecord>,
    policy: MissingFilePolicy,
}

impl UnlabeledImages {
    pub fn new(records: Vec<SampleRecord>, policy: MissingFilePolicy) -> UnlabeledImages {
        UnlabeledImages { records, policy }
    }

    pub fn records(&self) -> &[SampleRecord] {
        &self.records
    }
}

impl SegmentationDataset for UnlabeledImages {
    type Item = UnlabeledSample;

    fn len(&self) -> usize {
        self.records.len()
    }

    fn get(&mut self, index: usize) -> Result<Fetched<UnlabeledSample>, DatasetError> {
        let records = &self.records;
        fetch_with_policy(
            index,
            records.len(),
            |i| records[i].image_path.exists(),
            self.policy,
            |i| records[i].image_path.clone(),
            |i| {
                let record = &records[i];
                let image = decode_color(&record.image_path)?;
                Ok(UnlabeledSample {
                    original_size: image_size(&image),
                    image: from_img_to_tensor(&image),
                    name: record.name.clone(),
                })
            },
        )
    }
}

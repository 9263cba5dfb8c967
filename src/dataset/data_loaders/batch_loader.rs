use crate::dataset::common_structs::{ImageSize, LabeledSample, UnlabeledSample};
use crate::dataset::iterator_adapters::batching::Batcher;
use crate::dataset::iterator_adapters::{Batching, Shuffling};
use crate::dataset::{DataLoader, DatasetError, Fetched, SegmentationDataset};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tch::Tensor;

/// Stacks fetched samples into one batch
pub trait Collate: Sized {
    type Batch;
    fn collate(samples: Vec<Fetched<Self>>) -> Result<Self::Batch, DatasetError>;
}

#[derive(Debug)]
pub struct LabeledBatch {
    /// (B, 3, H, W)
    pub images: Tensor,
    /// (B, H, W)
    pub labels: Tensor,
    pub original_sizes: Vec<ImageSize>,
    pub names: Vec<String>,
    /// true where the sample was substituted for a missing one
    pub substituted: Vec<bool>,
}

#[derive(Debug)]
pub struct UnlabeledBatch {
    /// (B, 3, H, W)
    pub images: Tensor,
    pub original_sizes: Vec<ImageSize>,
    pub names: Vec<String>,
    pub substituted: Vec<bool>,
}

impl Collate for LabeledSample {
    type Batch = LabeledBatch;

    fn collate(samples: Vec<Fetched<Self>>) -> Result<LabeledBatch, DatasetError> {
        if samples.is_empty() {
            return Err(DatasetError::Empty);
        }
        let mut images = Vec::with_capacity(samples.len());
        let mut labels = Vec::with_capacity(samples.len());
        let mut original_sizes = Vec::with_capacity(samples.len());
        let mut names = Vec::with_capacity(samples.len());
        let mut substituted = Vec::with_capacity(samples.len());
        for fetched in samples {
            substituted.push(fetched.is_substituted());
            let sample = fetched.into_inner();
            images.push(sample.image);
            labels.push(sample.label);
            original_sizes.push(sample.original_size);
            names.push(sample.name);
        }
        Ok(LabeledBatch {
            images: Tensor::f_stack(&images, 0)?,
            labels: Tensor::f_stack(&labels, 0)?,
            original_sizes,
            names,
            substituted,
        })
    }
}

impl Collate for UnlabeledSample {
    type Batch = UnlabeledBatch;

    fn collate(samples: Vec<Fetched<Self>>) -> Result<UnlabeledBatch, DatasetError> {
        if samples.is_empty() {
            return Err(DatasetError::Empty);
        }
        let mut images = Vec::with_capacity(samples.len());
        let mut original_sizes = Vec::with_capacity(samples.len());
        let mut names = Vec::with_capacity(samples.len());
        let mut substituted = Vec::with_capacity(samples.len());
        for fetched in samples {
            substituted.push(fetched.is_substituted());
            let sample = fetched.into_inner();
            images.push(sample.image);
            original_sizes.push(sample.original_size);
            names.push(sample.name);
        }
        Ok(UnlabeledBatch {
            images: Tensor::f_stack(&images, 0)?,
            original_sizes,
            names,
            substituted,
        })
    }
}

/// Walks a dataset in batches, in order or shuffled. Samples are loaded on the calling thread.
pub struct BatchLoader<D> {
    dataset: D,
    batch_size: usize,
    shuffle: bool,
    rng: StdRng,
}

impl<D> BatchLoader<D>
where
    D: SegmentationDataset,
    D::Item: Collate,
{
    pub fn new(dataset: D, batch_size: usize) -> BatchLoader<D> {
        BatchLoader {
            dataset,
            batch_size: batch_size.max(1),
            shuffle: false,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn shuffled(mut self, seed: Option<u64>) -> BatchLoader<D> {
        self.shuffle = true;
        if let Some(seed) = seed {
            self.rng = StdRng::seed_from_u64(seed);
        }
        self
    }

    pub fn dataset(&self) -> &D {
        &self.dataset
    }

    pub fn num_batches(&self) -> usize {
        (self.dataset.len() + self.batch_size - 1) / self.batch_size
    }

    /// One pass over the dataset. Every call reshuffles when shuffling is on.
    pub fn batches(&mut self) -> Batches<'_, D> {
        let len = self.dataset.len();
        let order: Vec<usize> = if self.shuffle {
            (0..len).shuffling(len, &mut self.rng).collect()
        } else {
            (0..len).collect()
        };
        Batches {
            num_batches: self.num_batches(),
            next_batch: 0,
            index_batches: order.into_iter().batching(self.batch_size),
            dataset: &mut self.dataset,
        }
    }
}

pub struct Batches<'a, D> {
    dataset: &'a mut D,
    index_batches: Batcher<std::vec::IntoIter<usize>>,
    next_batch: usize,
    num_batches: usize,
}

impl<'a, D> Iterator for Batches<'a, D>
where
    D: SegmentationDataset,
    D::Item: Collate,
{
    type Item = Result<<D::Item as Collate>::Batch, DatasetError>;

    fn next(&mut self) -> Option<Self::Item> {
        let indices = self.index_batches.next()?;
        self.next_batch += 1;
        let fetched: Result<Vec<_>, DatasetError> = indices
            .into_iter()
            .map(|index| self.dataset.get(index))
            .collect();
        Some(fetched.and_then(<D::Item as Collate>::collate))
    }
}

impl<'a, D> DataLoader for Batches<'a, D>
where
    D: SegmentationDataset,
    D::Item: Collate,
{
    fn next_element_index(&self) -> usize {
        self.next_batch
    }

    fn max_elem_index(&self) -> usize {
        self.num_batches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::common_structs::ImageSize;
    use tch::Kind;

    /// Serves 2x3 images whose pixels all equal the index; index 4 is "missing".
    struct Synthetic {
        len: usize,
    }

    impl SegmentationDataset for Synthetic {
        type Item = UnlabeledSample;

        fn len(&self) -> usize {
            self.len
        }

        fn get(&mut self, index: usize) -> Result<Fetched<UnlabeledSample>, DatasetError> {
            let make = |i: usize| UnlabeledSample {
                image: Tensor::full([3, 2, 3], i as f64, (Kind::Float, tch::Device::Cpu)),
                original_size: ImageSize {
                    height: 2,
                    width: 3,
                    channels: 3,
                },
                name: format!("frame_{:06}", i),
            };
            if index == 4 {
                Ok(Fetched::Substituted {
                    requested: 4,
                    sample: make(0),
                })
            } else {
                Ok(Fetched::Original(make(index)))
            }
        }
    }

    #[test]
    fn batches_in_order_with_remainder() {
        let mut loader = BatchLoader::new(Synthetic { len: 5 }, 2);
        assert_eq!(loader.num_batches(), 3);
        let mut batches = loader.batches();
        assert_eq!(batches.max_elem_index(), 3);
        let first = batches.next().unwrap().unwrap();
        assert_eq!(batches.next_element_index(), 1);
        assert_eq!(first.images.size(), vec![2, 3, 2, 3]);
        assert_eq!(first.names, vec!["frame_000000", "frame_000001"]);
        let rest: Vec<UnlabeledBatch> = batches.map(|b| b.unwrap()).collect();
        assert_eq!(rest.len(), 2);
        assert_eq!(rest[1].images.size(), vec![1, 3, 2, 3]);
        assert_eq!(rest[1].substituted, vec![true]);
        assert_eq!(rest[1].names, vec!["frame_000000"]);
    }

    #[test]
    fn shuffled_pass_visits_every_index_once() {
        let mut loader = BatchLoader::new(Synthetic { len: 4 }, 3).shuffled(Some(2));
        let mut seen: Vec<f64> = vec![];
        for batch in loader.batches() {
            let batch = batch.unwrap();
            for i in 0..batch.names.len() as i64 {
                seen.push(batch.images.double_value(&[i, 0, 0, 0]));
            }
        }
        seen.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(seen, vec![0., 1., 2., 3.]);
    }

    #[test]
    fn mismatched_sizes_fail_to_collate() {
        let samples = vec![
            Fetched::Original(UnlabeledSample {
                image: Tensor::zeros([3, 2, 2], (Kind::Float, tch::Device::Cpu)),
                original_size: ImageSize { height: 2, width: 2, channels: 3 },
                name: "a".to_string(),
            }),
            Fetched::Original(UnlabeledSample {
                image: Tensor::zeros([3, 4, 2], (Kind::Float, tch::Device::Cpu)),
                original_size: ImageSize { height: 4, width: 2, channels: 3 },
                name: "b".to_string(),
            }),
        ];
        assert!(matches!(UnlabeledSample::collate(samples), Err(DatasetError::Tensor(_))));
    }
}

pub mod common_structs;
pub mod error;
pub mod label_remap;

pub mod data_augmenters;
pub mod data_loaders;
pub mod data_transformers;
pub mod iterator_adapters;

pub use error::DatasetError;

/// Extends the iterator trait so loops over batches can display progress
pub trait DataLoader: Iterator {
    /// Number of elements handed out so far
    fn next_element_index(&self) -> usize;
    /// Total number of elements in one pass
    fn max_elem_index(&self) -> usize;
}

/// Random access to the samples of a dataset, the way the training and evaluation loops consume
/// them. Indices are in `0..len()`.
pub trait SegmentationDataset {
    type Item;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Loads the sample at `index`. Adapters that tolerate missing files may hand back another
    /// sample instead, in which case the result says so.
    fn get(&mut self, index: usize) -> Result<Fetched<Self::Item>, DatasetError>;
}

/// What to do when the image of a sample does not exist on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingFilePolicy {
    /// Report the missing file as an error
    Fail,
    /// Load the first sample of the dataset instead and mark the result as substituted
    SubstituteFirst,
}

/// A sample together with whether it is the one that was asked for.
#[derive(Debug)]
pub enum Fetched<T> {
    Original(T),
    /// The sample at `requested` could not be loaded, `sample` comes from index 0
    Substituted { requested: usize, sample: T },
}

impl<T> Fetched<T> {
    pub fn is_substituted(&self) -> bool {
        matches!(self, Fetched::Substituted { .. })
    }

    pub fn requested_index(&self) -> Option<usize> {
        match self {
            Fetched::Original(_) => None,
            Fetched::Substituted { requested, .. } => Some(*requested),
        }
    }

    pub fn sample(&self) -> &T {
        match self {
            Fetched::Original(sample) => sample,
            Fetched::Substituted { sample, .. } => sample,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Fetched::Original(sample) => sample,
            Fetched::Substituted { sample, .. } => sample,
        }
    }

    /// Drops substituted samples, for callers that must not train or evaluate on them
    pub fn into_original(self) -> Option<T> {
        match self {
            Fetched::Original(sample) => Some(sample),
            Fetched::Substituted { .. } => None,
        }
    }
}

/// Shared index-0 fallback used by every adapter that supports `SubstituteFirst`.
pub(crate) fn fetch_with_policy<T, F>(
    index: usize,
    len: usize,
    image_exists: impl Fn(usize) -> bool,
    policy: MissingFilePolicy,
    missing_path: impl Fn(usize) -> std::path::PathBuf,
    mut load: F,
) -> Result<Fetched<T>, DatasetError>
where
    F: FnMut(usize) -> Result<T, DatasetError>,
{
    if index >= len {
        return Err(DatasetError::IndexOutOfRange { index, len });
    }
    if image_exists(index) {
        return Ok(Fetched::Original(load(index)?));
    }
    match policy {
        MissingFilePolicy::Fail => Err(DatasetError::MissingFile(missing_path(index))),
        MissingFilePolicy::SubstituteFirst => {
            if index == 0 || !image_exists(0) {
                return Err(DatasetError::MissingFile(missing_path(index)));
            }
            log::warn!(
                "image {} is missing, substituting sample 0",
                missing_path(index).display()
            );
            Ok(Fetched::Substituted {
                requested: index,
                sample: load(0)?,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn run(index: usize, present: &[bool], policy: MissingFilePolicy) -> Result<Fetched<usize>, DatasetError> {
        fetch_with_policy(
            index,
            present.len(),
            |i| present[i],
            policy,
            |i| PathBuf::from(format!("img_{}.png", i)),
            |i| Ok(i),
        )
    }

    #[test]
    fn present_sample_is_original() {
        let fetched = run(2, &[true, true, true], MissingFilePolicy::Fail).unwrap();
        assert!(!fetched.is_substituted());
        assert_eq!(fetched.into_inner(), 2);
    }

    #[test]
    fn missing_sample_is_substituted_and_marked() {
        let fetched = run(1, &[true, false], MissingFilePolicy::SubstituteFirst).unwrap();
        assert!(fetched.is_substituted());
        assert_eq!(fetched.requested_index(), Some(1));
        assert_eq!(*fetched.sample(), 0);
        assert!(fetched.into_original().is_none());
    }

    #[test]
    fn missing_sample_fails_without_fallback() {
        let err = run(1, &[true, false], MissingFilePolicy::Fail).unwrap_err();
        assert!(matches!(err, DatasetError::MissingFile(_)));
    }

    #[test]
    fn missing_first_sample_does_not_recurse() {
        let err = run(1, &[false, false], MissingFilePolicy::SubstituteFirst).unwrap_err();
        assert!(matches!(err, DatasetError::MissingFile(_)));
        let err = run(0, &[false, true], MissingFilePolicy::SubstituteFirst).unwrap_err();
        assert!(matches!(err, DatasetError::MissingFile(_)));
    }

    #[test]
    fn out_of_range_index() {
        let err = run(3, &[true], MissingFilePolicy::SubstituteFirst).unwrap_err();
        assert!(matches!(err, DatasetError::IndexOutOfRange { index: 3, len: 1 }));
    }
}

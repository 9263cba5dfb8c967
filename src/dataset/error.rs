use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("index {index} out of range for dataset of {len} samples")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("file not found: {0}")]
    MissingFile(PathBuf),
    #[error("could not decode {path}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("{path}:{line}: {reason}")]
    ListFile {
        path: PathBuf,
        line: usize,
        reason: String,
    },
    #[error("could not read id list {path}")]
    IdList {
        path: PathBuf,
        #[source]
        source: serde_pickle::Error,
    },
    #[error("sample {0} has no label")]
    Unlabeled(String),
    #[error("type must be either 'train' or 'val', got '{0}'")]
    InvalidSplit(String),
    #[error("dataset has no samples")]
    Empty,
    #[error("io error on {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Tensor(#[from] tch::TchError),
}

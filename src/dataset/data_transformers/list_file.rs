use crate::dataset::common_structs::SampleRecord;
use crate::dataset::DatasetError;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Reads a list file where every line holds an image path and a label path, both relative to
/// `root`, separated by whitespace. The sample name is the label file name without extension.
pub fn read_list_file(root: &Path, list_path: &Path) -> Result<Vec<SampleRecord>, DatasetError> {
    let io_err = |source| DatasetError::Io {
        path: list_path.to_owned(),
        source,
    };
    let file = File::open(list_path).map_err(io_err)?;
    let mut records = vec![];
    for (line_index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(io_err)?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let list_err = |reason: &str| DatasetError::ListFile {
            path: list_path.to_owned(),
            line: line_index + 1,
            reason: reason.to_string(),
        };
        let paths: Vec<&str> = line.split_whitespace().collect();
        if paths.len() != 2 {
            return Err(list_err("expected '<image path> <label path>'"));
        }
        let (image_path, label_path) = (paths[0], paths[1]);
        let name = Path::new(label_path)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| list_err("label path has no file name"))?
            .to_string();
        records.push(SampleRecord::labeled(
            root.join(image_path),
            root.join(label_path),
            name,
        ));
    }
    Ok(records)
}

/// Writes pairs of relative paths in the format `read_list_file` expects
pub fn write_list_file(list_path: &Path, pairs: &[(PathBuf, PathBuf)]) -> Result<(), DatasetError> {
    let io_err = |source| DatasetError::Io {
        path: list_path.to_owned(),
        source,
    };
    let mut writer = BufWriter::new(File::create(list_path).map_err(io_err)?);
    for (image_path, label_path) in pairs {
        writeln!(writer, "{} {}", image_path.display(), label_path.display()).map_err(io_err)?;
    }
    writer.flush().map_err(io_err)
}

/// Reads a pickled list of sample identifiers
pub fn read_id_list(path: &Path) -> Result<Vec<String>, DatasetError> {
    let file = File::open(path).map_err(|source| DatasetError::Io {
        path: path.to_owned(),
        source,
    })?;
    serde_pickle::from_reader(BufReader::new(file), serde_pickle::DeOptions::new()).map_err(
        |source| DatasetError::IdList {
            path: path.to_owned(),
            source,
        },
    )
}

/// Repeats `records` until there are at least `max_iters` of them, so one pass over the dataset
/// lasts a whole training run.
pub fn repeat_to_cover<T: Clone>(records: Vec<T>, max_iters: Option<usize>) -> Vec<T> {
    match max_iters {
        Some(max_iters) if !records.is_empty() => {
            let times = (max_iters + records.len() - 1) / records.len();
            let mut repeated = Vec::with_capacity(records.len() * times);
            for _ in 0..times {
                repeated.extend_from_slice(&records);
            }
            repeated
        }
        _ => records,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_pairs_and_names() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("train.txt");
        std::fs::write(
            &list,
            "leftImg8bit/a_leftImg8bit.png gtFine/a_gtFine_labelIds.png\n\n  leftImg8bit/b.png   gtFine/b.png  \n",
        )
        .unwrap();
        let records = read_list_file(Path::new("/data"), &list).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "a_gtFine_labelIds");
        assert_eq!(records[0].image_path, Path::new("/data/leftImg8bit/a_leftImg8bit.png"));
        assert_eq!(
            records[1].label_path.as_deref(),
            Some(Path::new("/data/gtFine/b.png"))
        );
        assert_eq!(records[1].weight, 1.0);
    }

    #[test]
    fn malformed_line_reports_line_number() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("val.txt");
        std::fs::write(&list, "a.png b.png\nonly_one.png\n").unwrap();
        match read_list_file(dir.path(), &list) {
            Err(DatasetError::ListFile { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn written_list_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("list.txt");
        let pairs = vec![(PathBuf::from("img/x.png"), PathBuf::from("gt/x_labelIds.png"))];
        write_list_file(&list, &pairs).unwrap();
        let records = read_list_file(dir.path(), &list).unwrap();
        assert_eq!(records[0].name, "x_labelIds");
    }

    #[test]
    fn repeat_covers_max_iters() {
        let repeated = repeat_to_cover(vec![1, 2, 3], Some(7));
        assert_eq!(repeated, vec![1, 2, 3, 1, 2, 3, 1, 2, 3]);
        assert_eq!(repeat_to_cover(vec![1, 2], None), vec![1, 2]);
        assert!(repeat_to_cover(Vec::<u8>::new(), Some(5)).is_empty());
        assert!(repeat_to_cover(vec![1, 2], Some(0)).is_empty());
    }

    #[test]
    fn reads_pickled_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("val_img_ids.pkl");
        let ids = vec!["1".to_string(), "25000".to_string()];
        let bytes = serde_pickle::to_vec(&ids, serde_pickle::SerOptions::new()).unwrap();
        std::fs::write(&path, bytes).unwrap();
        assert_eq!(read_id_list(&path).unwrap(), ids);
    }

    #[test]
    fn missing_id_list_is_io_error() {
        let err = read_id_list(Path::new("nowhere/train_img_ids.pkl")).unwrap_err();
        assert!(matches!(err, DatasetError::Io { .. }));
    }
}

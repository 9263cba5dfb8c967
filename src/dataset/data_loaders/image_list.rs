use super::UnlabeledImages;
use crate::dataset::common_structs::SampleRecord;
use crate::dataset::MissingFilePolicy;
use std::path::Path;

/// A handful of loose images under `root`, e.g. photos taken outside any benchmark. The name of
/// each sample is its file name without extension.
pub fn unlabeled_image_list<S: AsRef<str>>(root: &Path, file_names: &[S]) -> UnlabeledImages {
    let records: Vec<SampleRecord> = file_names
        .iter()
        .map(|file_name| {
            let file_name = file_name.as_ref();
            let name = Path::new(file_name)
                .file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or(file_name)
                .to_string();
            SampleRecord::unlabeled(root.join(file_name), name)
        })
        .collect();
    log::info!("Image list - num examples: {}", records.len());
    UnlabeledImages::new(records, MissingFilePolicy::SubstituteFirst)
}

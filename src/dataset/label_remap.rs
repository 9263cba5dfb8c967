use image::GrayImage;

/// Label value excluded from losses and metrics
pub const DEFAULT_IGNORE_LABEL: u8 = 255;

/// Raw Cityscapes label id to train id. Ids not listed here map to the ignore label.
/// The source table also lists id -1 (license plate), which cannot appear in an 8 bit label image.
const CITYSCAPES_TRAIN_IDS: [(u8, u8); 19] = [
    (7, 0),
    (8, 1),
    (11, 2),
    (12, 3),
    (13, 4),
    (17, 5),
    (19, 6),
    (20, 7),
    (21, 8),
    (22, 9),
    (23, 10),
    (24, 11),
    (25, 12),
    (26, 13),
    (27, 14),
    (28, 15),
    (31, 16),
    (32, 17),
    (33, 18),
];

/// Highest raw id covered by the Cityscapes table, codes above it are left untouched
const CITYSCAPES_MAX_RAW_ID: u8 = 33;

/// Dataset family the raw label ids come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelSource {
    Cityscapes,
    /// Synscapes ships Cityscapes label ids
    Synscapes,
}

impl LabelSource {
    pub fn table_version(&self) -> &'static str {
        match self {
            LabelSource::Cityscapes | LabelSource::Synscapes => "cityscapes-labelids-v1",
        }
    }

    fn train_ids(&self) -> (&'static [(u8, u8)], u8) {
        match self {
            LabelSource::Cityscapes | LabelSource::Synscapes => {
                (&CITYSCAPES_TRAIN_IDS, CITYSCAPES_MAX_RAW_ID)
            }
        }
    }
}

/// Lookup table from raw label codes to training class indices
#[derive(Clone)]
pub struct LabelRemap {
    source: LabelSource,
    ignore_label: u8,
    num_classes: u8,
    lut: [u8; 256],
}

impl LabelRemap {
    pub fn for_source(source: LabelSource, ignore_label: u8) -> LabelRemap {
        let (train_ids, max_raw_id) = source.train_ids();
        let mut lut = [0u8; 256];
        for (code, entry) in lut.iter_mut().enumerate() {
            *entry = if code as u8 <= max_raw_id {
                ignore_label
            } else {
                code as u8
            };
        }
        for &(raw, train) in train_ids {
            lut[raw as usize] = train;
        }
        let num_classes = train_ids.iter().map(|(_, train)| train + 1).max().unwrap_or(0);
        LabelRemap {
            source,
            ignore_label,
            num_classes,
            lut,
        }
    }

    pub fn source(&self) -> LabelSource {
        self.source
    }

    pub fn ignore_label(&self) -> u8 {
        self.ignore_label
    }

    pub fn num_classes(&self) -> u8 {
        self.num_classes
    }

    pub fn map_code(&self, code: u8) -> u8 {
        self.lut[code as usize]
    }

    pub fn apply(&self, label: &GrayImage) -> GrayImage {
        let mut remapped = label.clone();
        for pixel in remapped.pixels_mut() {
            pixel.0[0] = self.map_code(pixel.0[0]);
        }
        remapped
    }
}

impl std::fmt::Debug for LabelRemap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LabelRemap")
            .field("source", &self.source)
            .field("version", &self.source.table_version())
            .field("ignore_label", &self.ignore_label)
            .finish()
    }
}

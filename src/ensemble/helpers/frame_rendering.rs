use super::colormap::{apply_colormap, Colormap};
use super::palette::label_to_color;
use crate::dataset::data_transformers::img2tensor::denormalize_image;
use crate::ensemble::uncertainty::UncertaintyMaps;
use anyhow::{ensure, Context};
use image::{GrayImage, Rgb, RgbImage};
use std::path::{Path, PathBuf};
use tch::{Device, Kind, Tensor};

/// The four images written for every frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Image,
    PredictionOverlay,
    Entropy,
    HEntropy,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 4] = [
        ArtifactKind::Image,
        ArtifactKind::PredictionOverlay,
        ArtifactKind::Entropy,
        ArtifactKind::HEntropy,
    ];

    pub fn suffix(self) -> &'static str {
        match self {
            ArtifactKind::Image => "img",
            ArtifactKind::PredictionOverlay => "pred_overlayed",
            ArtifactKind::Entropy => "entropy",
            ArtifactKind::HEntropy => "hentropy",
        }
    }
}

/// `<dir>/<name>_<suffix>.png`
pub fn artifact_path(dir: &Path, name: &str, kind: ArtifactKind) -> PathBuf {
    dir.join(format!("{}_{}.png", name, kind.suffix()))
}

/// Scales a value in [0, 1] to a byte. Values outside the range saturate, NaN becomes 0.
pub fn to_byte_intensity(value: f64) -> u8 {
    (value * 255.).max(0.).min(255.) as u8
}

/// (H, W) map of values in [0, 1] to a grayscale image
pub fn intensity_image(map: &Tensor) -> Result<GrayImage, anyhow::Error> {
    let (height, width) = map.size2()?;
    let values = Vec::<f64>::try_from(&map.to_device(Device::Cpu).to_kind(Kind::Double).reshape([-1]))?;
    let raw = values.into_iter().map(to_byte_intensity).collect();
    GrayImage::from_raw(width as u32, height as u32, raw).context("intensity map does not fit its image")
}

/// (H, W) map of class ids to a grayscale image, ids above 255 become 255
pub fn class_image(prediction: &Tensor) -> Result<GrayImage, anyhow::Error> {
    let (height, width) = prediction.size2()?;
    let values = Vec::<i64>::try_from(&prediction.to_device(Device::Cpu).to_kind(Kind::Int64).reshape([-1]))?;
    let raw = values
        .into_iter()
        .map(|class| u8::try_from(class).unwrap_or(u8::MAX))
        .collect();
    GrayImage::from_raw(width as u32, height as u32, raw).context("class map does not fit its image")
}

/// `alpha * image + (1 - alpha) * colors`, truncated
pub fn overlay(image: &RgbImage, colors: &RgbImage, alpha: f32) -> Result<RgbImage, anyhow::Error> {
    ensure!(
        image.dimensions() == colors.dimensions(),
        "cannot overlay {:?} colors on a {:?} image",
        colors.dimensions(),
        image.dimensions()
    );
    Ok(imageproc::map::map_colors2(image, colors, |a: Rgb<u8>, b: Rgb<u8>| {
        let mut out = [0u8; 3];
        for c in 0..3 {
            out[c] = (alpha * a.0[c] as f32 + (1. - alpha) * b.0[c] as f32) as u8;
        }
        Rgb(out)
    }))
}

/// Everything shown for one frame of a sequence
#[derive(Debug, Clone)]
pub struct FrameArtifacts {
    pub image: RgbImage,
    pub overlay: RgbImage,
    /// Normalized entropy through the hot colormap
    pub entropy: RgbImage,
    /// Hyper entropy through the ocean colormap
    pub hentropy: RgbImage,
}

impl FrameArtifacts {
    /// Renders sample `index` of a batch. `image` is its (3, H, W) normalized input.
    pub fn render(
        image: &Tensor,
        maps: &UncertaintyMaps,
        index: i64,
        overlay_alpha: f32,
    ) -> Result<FrameArtifacts, anyhow::Error> {
        let image = denormalize_image(image)?;
        let classes = class_image(&maps.prediction.get(index))?;
        let overlay = overlay(&image, &label_to_color(&classes), overlay_alpha)?;
        let entropy = intensity_image(&maps.normalized_entropy().get(index))?;
        let hentropy = intensity_image(&maps.hentropy.get(index))?;
        Ok(FrameArtifacts {
            image,
            overlay,
            entropy: apply_colormap(&entropy, Colormap::Hot)?,
            hentropy: apply_colormap(&hentropy, Colormap::Ocean)?,
        })
    }

    fn get(&self, kind: ArtifactKind) -> &RgbImage {
        match kind {
            ArtifactKind::Image => &self.image,
            ArtifactKind::PredictionOverlay => &self.overlay,
            ArtifactKind::Entropy => &self.entropy,
            ArtifactKind::HEntropy => &self.hentropy,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn save(&self, dir: &Path, name: &str) -> Result<(), anyhow::Error> {
        for kind in ArtifactKind::ALL.iter() {
            let path = artifact_path(dir, name, *kind);
            self.get(*kind)
                .save(&path)
                .with_context(|| format!("cannot write {}", path.display()))?;
        }
        Ok(())
    }

    pub fn load(dir: &Path, name: &str) -> Result<FrameArtifacts, anyhow::Error> {
        let read = |kind: ArtifactKind| -> Result<RgbImage, anyhow::Error> {
            let path = artifact_path(dir, name, kind);
            let img = image::open(&path).with_context(|| format!("cannot read {}", path.display()))?;
            Ok(img.to_rgb8())
        };
        let artifacts = FrameArtifacts {
            image: read(ArtifactKind::Image)?,
            overlay: read(ArtifactKind::PredictionOverlay)?,
            entropy: read(ArtifactKind::Entropy)?,
            hentropy: read(ArtifactKind::HEntropy)?,
        };
        let size = artifacts.dimensions();
        ensure!(
            ArtifactKind::ALL.iter().all(|kind| artifacts.get(*kind).dimensions() == size),
            "images of frame {} have different sizes",
            name
        );
        Ok(artifacts)
    }
}

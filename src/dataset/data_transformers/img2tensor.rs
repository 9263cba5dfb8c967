use crate::dataset::common_structs::ImageSize;
use crate::dataset::DatasetError;
use image::{GrayImage, RgbImage};
use std::path::Path;
use tch::{Kind, TchError, Tensor};

/// Per channel mean subtracted from every image fed to the networks, in the channel order of the
/// tensors (R, G, B).
pub const IMAGE_MEAN: [f32; 3] = [102.9801, 115.9465, 122.7717];

pub fn decode_color(path: &Path) -> Result<RgbImage, DatasetError> {
    image::open(path)
        .map(|img| img.to_rgb8())
        .map_err(|source| DatasetError::Decode {
            path: path.to_owned(),
            source,
        })
}

pub fn decode_label(path: &Path) -> Result<GrayImage, DatasetError> {
    image::open(path)
        .map(|img| img.to_luma8())
        .map_err(|source| DatasetError::Decode {
            path: path.to_owned(),
            source,
        })
}

pub fn image_size(img: &RgbImage) -> ImageSize {
    ImageSize {
        height: img.height(),
        width: img.width(),
        channels: 3,
    }
}

/// (H, W, 3) Uint8 tensor with the pixels of `img`
pub fn rgb_to_tensor(img: &RgbImage) -> Tensor {
    let (width, height) = img.dimensions();
    Tensor::from_slice(img.as_raw()).view([height as i64, width as i64, 3])
}

/// (H, W) Int64 tensor with the label codes of `label`
pub fn gray_to_tensor(label: &GrayImage) -> Tensor {
    let (width, height) = label.dimensions();
    Tensor::from_slice(label.as_raw())
        .view([height as i64, width as i64])
        .to_kind(Kind::Int64)
}

/// (H, W, 3) Float tensor with the mean subtracted, still channels last
pub fn normalize_image(img: &RgbImage) -> Tensor {
    let mean = Tensor::from_slice(&IMAGE_MEAN).view([1, 1, 3]);
    rgb_to_tensor(img).to_kind(Kind::Float) - mean
}

/// Normalized (3, H, W) Float tensor, the layout the networks consume
pub fn from_img_to_tensor(img: &RgbImage) -> Tensor {
    normalize_image(img).permute([2, 0, 1]).contiguous()
}

/// Inverse of `from_img_to_tensor`: adds the mean back and rounds to bytes.
/// Accepts a (3, H, W) tensor on any device.
pub fn denormalize_image(image: &Tensor) -> Result<RgbImage, DatasetError> {
    let (channels, height, width) = image.size3()?;
    if channels != 3 {
        return Err(TchError::Shape(format!("expected 3 channels, got {}", channels)).into());
    }
    let mean = Tensor::from_slice(&IMAGE_MEAN).view([1, 1, 3]);
    let pixels = (image.to_device(tch::Device::Cpu).to_kind(Kind::Float).permute([1, 2, 0]) + mean)
        .clamp(0., 255.)
        .round()
        .to_kind(Kind::Uint8)
        .reshape([-1]);
    let raw = Vec::<u8>::try_from(&pixels)?;
    RgbImage::from_raw(width as u32, height as u32, raw)
        .ok_or_else(|| TchError::Shape(format!("{}x{} image buffer too small", width, height)).into())
}

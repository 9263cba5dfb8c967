use crate::dataset::data_transformers::img2tensor::{gray_to_tensor, normalize_image};
use image::imageops::{resize, FilterType};
use image::{GrayImage, RgbImage};
use rand::Rng;
use tch::{Kind, Tensor};

/// Scale factors go from 0.5 to 2.1 in steps of 0.1
pub fn random_scale<R: Rng>(rng: &mut R) -> f32 {
    0.5 + rng.gen_range(0..=16) as f32 / 10.0
}

fn scaled_size(width: u32, height: u32, scale: f32) -> (u32, u32) {
    let scaled = |side: u32| ((side as f32 * scale).round() as u32).max(1);
    (scaled(width), scaled(height))
}

/// Resizes image and label by the same factor. The label uses nearest neighbour so no new class
/// codes appear along boundaries.
pub fn rescale_pair(image: &RgbImage, label: &GrayImage, scale: f32) -> (RgbImage, GrayImage) {
    let (width, height) = scaled_size(image.width(), image.height(), scale);
    (
        resize(image, width, height, FilterType::Triangle),
        resize(label, width, height, FilterType::Nearest),
    )
}

/// Pads a (H, W, 3) image with zeros and a (H, W) label with `ignore_label` on the bottom and
/// right so both are at least `crop_h` x `crop_w`.
pub fn pad_pair(
    image: &Tensor,
    label: &Tensor,
    crop_h: i64,
    crop_w: i64,
    ignore_label: u8,
) -> (Tensor, Tensor) {
    let size = label.size();
    let (height, width) = (size[0], size[1]);
    let pad_h = (crop_h - height).max(0);
    let pad_w = (crop_w - width).max(0);
    if pad_h == 0 && pad_w == 0 {
        return (image.shallow_clone(), label.shallow_clone());
    }
    let image_pad = Tensor::zeros(
        [height + pad_h, width + pad_w, 3],
        (Kind::Float, image.device()),
    );
    image_pad
        .narrow(0, 0, height)
        .narrow(1, 0, width)
        .copy_(image);
    let label_pad = Tensor::full(
        [height + pad_h, width + pad_w],
        ignore_label as i64,
        (Kind::Int64, label.device()),
    );
    label_pad
        .narrow(0, 0, height)
        .narrow(1, 0, width)
        .copy_(label);
    (image_pad, label_pad)
}

/// Top left corner of the crop inside the padded image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropWindow {
    pub top: i64,
    pub left: i64,
}

/// One draw of the random augmentation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AugmentationParams {
    pub scale: f32,
    pub crop: CropWindow,
    pub flip: bool,
}

/// Random rescale, pad, crop and horizontal flip applied identically to an image and its label.
#[derive(Debug, Clone, Copy)]
pub struct ScaleCropFlip {
    pub crop_h: u32,
    pub crop_w: u32,
    pub ignore_label: u8,
}

impl ScaleCropFlip {
    pub fn new(crop_size: (u32, u32), ignore_label: u8) -> ScaleCropFlip {
        let (crop_h, crop_w) = crop_size;
        ScaleCropFlip {
            crop_h,
            crop_w,
            ignore_label,
        }
    }

    /// Draws parameters for an image of `width` x `height`. The crop offsets depend on the scaled
    /// and padded size, so they are drawn after the scale.
    pub fn draw_params<R: Rng>(&self, width: u32, height: u32, rng: &mut R) -> AugmentationParams {
        let scale = random_scale(rng);
        let (scaled_w, scaled_h) = scaled_size(width, height, scale);
        let padded_h = scaled_h.max(self.crop_h);
        let padded_w = scaled_w.max(self.crop_w);
        let top = rng.gen_range(0..=padded_h - self.crop_h) as i64;
        let left = rng.gen_range(0..=padded_w - self.crop_w) as i64;
        let flip = rng.gen_bool(0.5);
        AugmentationParams {
            scale,
            crop: CropWindow { top, left },
            flip,
        }
    }

    /// Returns the normalized (3, crop_h, crop_w) image and the (crop_h, crop_w) label
    pub fn augment<R: Rng>(
        &self,
        image: &RgbImage,
        label: &GrayImage,
        rng: &mut R,
    ) -> (Tensor, Tensor) {
        let params = self.draw_params(image.width(), image.height(), rng);
        self.apply(image, label, &params)
    }

    pub fn apply(
        &self,
        image: &RgbImage,
        label: &GrayImage,
        params: &AugmentationParams,
    ) -> (Tensor, Tensor) {
        let (crop_h, crop_w) = (self.crop_h as i64, self.crop_w as i64);
        let (image, label) = rescale_pair(image, label, params.scale);
        let image = normalize_image(&image);
        let label = gray_to_tensor(&label);
        let (image, label) = pad_pair(&image, &label, crop_h, crop_w, self.ignore_label);

        let CropWindow { top, left } = params.crop;
        let image = image
            .narrow(0, top, crop_h)
            .narrow(1, left, crop_w)
            .permute([2, 0, 1]);
        let label = label.narrow(0, top, crop_h).narrow(1, left, crop_w);

        if params.flip {
            (image.flip([2]).copy(), label.flip([1]).copy())
        } else {
            (image.copy(), label.copy())
        }
    }
}

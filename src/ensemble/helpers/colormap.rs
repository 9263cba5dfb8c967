use super::mat_conversion::{bgr_mat_to_rgb, gray_to_mat};
use image::{GrayImage, RgbImage};
use opencv::core::Mat;
use opencv::imgproc::{apply_color_map, COLORMAP_HOT, COLORMAP_OCEAN};

/// OpenCV colormaps used for the uncertainty images
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Colormap {
    /// Black, red, yellow, white
    Hot,
    /// Dark blue to white through teal
    Ocean,
}

impl Colormap {
    fn opencv_code(self) -> i32 {
        match self {
            Colormap::Hot => COLORMAP_HOT,
            Colormap::Ocean => COLORMAP_OCEAN,
        }
    }
}

pub fn apply_colormap(intensity: &GrayImage, colormap: Colormap) -> Result<RgbImage, anyhow::Error> {
    let src = gray_to_mat(intensity)?;
    let mut dst = Mat::default();
    apply_color_map(&src, &mut dst, colormap.opencv_code())?;
    bgr_mat_to_rgb(&dst)
}

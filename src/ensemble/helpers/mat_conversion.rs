use anyhow::{ensure, Context};
use image::{GrayImage, RgbImage};
use opencv::core::{Mat, Scalar, CV_8UC1, CV_8UC3};
use opencv::prelude::*;

/// Single channel 8 bit Mat holding a copy of `img`
pub fn gray_to_mat(img: &GrayImage) -> Result<Mat, anyhow::Error> {
    let (width, height) = img.dimensions();
    let mut mat = Mat::new_rows_cols_with_default(height as i32, width as i32, CV_8UC1, Scalar::all(0.))?;
    mat.data_bytes_mut()?.copy_from_slice(img.as_raw());
    Ok(mat)
}

/// 3 channel 8 bit Mat in OpenCV's BGR order
pub fn rgb_to_bgr_mat(img: &RgbImage) -> Result<Mat, anyhow::Error> {
    let (width, height) = img.dimensions();
    let mut mat = Mat::new_rows_cols_with_default(height as i32, width as i32, CV_8UC3, Scalar::all(0.))?;
    for (bgr, rgb) in mat.data_bytes_mut()?.chunks_exact_mut(3).zip(img.as_raw().chunks_exact(3)) {
        bgr[0] = rgb[2];
        bgr[1] = rgb[1];
        bgr[2] = rgb[0];
    }
    Ok(mat)
}

pub fn bgr_mat_to_rgb(mat: &Mat) -> Result<RgbImage, anyhow::Error> {
    ensure!(mat.typ() == CV_8UC3, "expected an 8 bit 3 channel Mat, got type {}", mat.typ());
    let (width, height) = (mat.cols() as u32, mat.rows() as u32);
    let mut raw = Vec::with_capacity((width * height * 3) as usize);
    for bgr in mat.data_bytes()?.chunks_exact(3) {
        raw.extend_from_slice(&[bgr[2], bgr[1], bgr[0]]);
    }
    RgbImage::from_raw(width, height, raw).context("Mat does not fit its image")
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb};

    #[test]
    fn channels_are_swapped_both_ways() {
        let mut img = RgbImage::new(3, 2);
        img.put_pixel(2, 1, Rgb([10, 20, 30]));
        let mat = rgb_to_bgr_mat(&img).unwrap();
        assert_eq!((mat.rows(), mat.cols()), (2, 3));
        let bytes = mat.data_bytes().unwrap();
        let at = (1 * 3 + 2) * 3;
        assert_eq!(&bytes[at..at + 3], &[30, 20, 10]);
        assert_eq!(bgr_mat_to_rgb(&mat).unwrap(), img);
    }

    #[test]
    fn gray_keeps_values() {
        let mut img = GrayImage::new(4, 1);
        img.put_pixel(3, 0, Luma([200]));
        let mat = gray_to_mat(&img).unwrap();
        assert_eq!(mat.typ(), CV_8UC1);
        assert_eq!(mat.data_bytes().unwrap(), &[0, 0, 0, 200]);
        assert!(bgr_mat_to_rgb(&mat).is_err());
    }
}

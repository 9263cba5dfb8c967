use super::FrameSink;
use crate::ensemble::helpers::mat_conversion::rgb_to_bgr_mat;
use anyhow::ensure;
use image::RgbImage;
use opencv::core::Size;
use opencv::prelude::*;
use opencv::videoio::VideoWriter;
use std::path::Path;

/// Motion JPEG video written through OpenCV. The container follows the file extension.
pub struct MjpegVideoWriter {
    writer: VideoWriter,
    width: u32,
    height: u32,
    frames: usize,
}

impl MjpegVideoWriter {
    pub fn create<T: AsRef<Path>>(path: T, width: u32, height: u32, fps: u32) -> Result<MjpegVideoWriter, anyhow::Error> {
        let path = path.as_ref();
        ensure!(fps > 0, "fps must be positive");
        let fourcc = VideoWriter::fourcc('M', 'J', 'P', 'G')?;
        let writer = VideoWriter::new(
            &path.to_string_lossy(),
            fourcc,
            fps as f64,
            Size::new(width as i32, height as i32),
            true,
        )?;
        ensure!(writer.is_opened()?, "cannot open {} for writing", path.display());
        Ok(MjpegVideoWriter {
            writer,
            width,
            height,
            frames: 0,
        })
    }

    pub fn frames_written(&self) -> usize {
        self.frames
    }
}

impl FrameSink for MjpegVideoWriter {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<(), anyhow::Error> {
        // OpenCV silently drops frames that do not match the opened size
        ensure!(
            frame.dimensions() == (self.width, self.height),
            "frame is {:?}, video is {}x{}",
            frame.dimensions(),
            self.width,
            self.height
        );
        self.writer.write(&rgb_to_bgr_mat(frame)?)?;
        self.frames += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), anyhow::Error> {
        self.writer.release()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use opencv::videoio::{VideoCapture, CAP_ANY, CAP_PROP_FRAME_COUNT, CAP_PROP_FRAME_HEIGHT, CAP_PROP_FRAME_WIDTH};

    #[test]
    fn written_video_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seq.avi");
        let mut writer = MjpegVideoWriter::create(&path, 32, 16, 20).unwrap();
        for value in [0u8, 128, 255].iter() {
            writer.write_frame(&RgbImage::from_pixel(32, 16, Rgb([*value, 0, 0]))).unwrap();
        }
        writer.finish().unwrap();
        assert_eq!(writer.frames_written(), 3);

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"AVI ");
        let capture = VideoCapture::from_file(&path.to_string_lossy(), CAP_ANY).unwrap();
        assert_eq!(capture.get(CAP_PROP_FRAME_COUNT).unwrap() as i64, 3);
        assert_eq!(capture.get(CAP_PROP_FRAME_WIDTH).unwrap() as i64, 32);
        assert_eq!(capture.get(CAP_PROP_FRAME_HEIGHT).unwrap() as i64, 16);
    }

    #[test]
    fn frames_must_match_the_video_size() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = MjpegVideoWriter::create(dir.path().join("seq.avi"), 8, 8, 20).unwrap();
        assert!(writer.write_frame(&RgbImage::new(8, 4)).is_err());
        assert_eq!(writer.frames_written(), 0);
        writer.finish().unwrap();
    }
}

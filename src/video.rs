use image::RgbImage;

pub mod composer;
pub mod video_writer;

/// Receives the frames of a video in display order
pub trait FrameSink {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<(), anyhow::Error>;
    /// Called once after the last frame
    fn finish(&mut self) -> Result<(), anyhow::Error>;
}

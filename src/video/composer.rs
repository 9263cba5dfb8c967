use super::video_writer::MjpegVideoWriter;
use super::FrameSink;
use crate::ensemble::helpers::frame_rendering::FrameArtifacts;
use anyhow::{ensure, Context};
use image::{GenericImage, RgbImage};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// Frames decoded in parallel before they are handed to the sink in order
const FRAMES_IN_FLIGHT: usize = 16;

/// 2x2 grid: image | prediction overlay on top, hyper entropy | entropy below
pub fn compose_grid(artifacts: &FrameArtifacts) -> Result<RgbImage, anyhow::Error> {
    let (width, height) = artifacts.dimensions();
    let mut grid = RgbImage::new(2 * width, 2 * height);
    let tiles = [
        (&artifacts.image, 0, 0),
        (&artifacts.overlay, width, 0),
        (&artifacts.hentropy, 0, height),
        (&artifacts.entropy, width, height),
    ];
    for (tile, x, y) in tiles.iter() {
        ensure!(
            tile.dimensions() == (width, height),
            "tile is {:?}, expected {}x{}",
            tile.dimensions(),
            width,
            height
        );
        grid.copy_from(*tile, *x, *y)?;
    }
    Ok(grid)
}

/// Reads the frames saved under `dir`, sorted by name, and writes their grids to `sink`.
/// Returns the number of frames written.
pub fn assemble_sequence_video<S: FrameSink + ?Sized>(
    dir: &Path,
    names: &[String],
    sink: &mut S,
) -> Result<usize, anyhow::Error> {
    let mut sorted: Vec<&String> = names.iter().collect();
    sorted.sort();
    let mut size = None;
    let mut written = 0;
    for chunk in sorted.chunks(FRAMES_IN_FLIGHT) {
        let grids: Vec<RgbImage> = chunk
            .par_iter()
            .map(|name| FrameArtifacts::load(dir, name).and_then(|artifacts| compose_grid(&artifacts)))
            .collect::<Result<_, _>>()?;
        for grid in grids {
            if written % 10 == 0 {
                log::info!("step: {}/{}", written + 1, sorted.len());
            }
            let expected = *size.get_or_insert(grid.dimensions());
            ensure!(
                grid.dimensions() == expected,
                "frame {} is {:?}, earlier frames are {:?}",
                sorted[written],
                grid.dimensions(),
                expected
            );
            sink.write_frame(&grid)?;
            written += 1;
        }
    }
    sink.finish()?;
    Ok(written)
}

/// Writes `<dir>/<sequence>.avi`, sized after the first frame in name order
pub fn write_sequence_video(dir: &Path, sequence: &str, names: &[String], fps: u32) -> Result<PathBuf, anyhow::Error> {
    let first = names.iter().min().context("no frames to write")?;
    let (width, height) = FrameArtifacts::load(dir, first)?.dimensions();
    let path = dir.join(format!("{}.avi", sequence));
    let mut writer = MjpegVideoWriter::create(&path, 2 * width, 2 * height, fps)?;
    let frames = assemble_sequence_video(dir, names, &mut writer)?;
    log::info!("Wrote {} frames to {}", frames, path.display());
    Ok(path)
}

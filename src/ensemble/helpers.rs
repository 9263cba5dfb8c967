pub mod colormap;
pub mod frame_rendering;
pub mod mat_conversion;
pub mod palette;

pub mod img2tensor;
pub mod list_file;

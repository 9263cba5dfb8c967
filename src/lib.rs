pub mod config;
pub mod dataset;
pub mod ensemble;
pub mod video;

// ImageSeal watermarking service library

pub mod config;
pub mod constants;
pub mod logging;
pub mod server;
pub mod watermark;

pub mod downloader;
pub mod states;
pub mod task;
pub mod transport;

pub mod actor;
pub mod catalog;
pub mod config;
pub mod core;
pub mod job;
pub mod model;
mod processing;
pub use deadpool_diesel;
pub use processing::startup_self_check;
pub use processing::video::{
    ffmpeg::{FFmpegTranscoder, TranscodeEngineTrait},
    ffprobe::{FFProbe, MediaProberTrait},
};
pub mod util;

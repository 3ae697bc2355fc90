pub mod ffmpeg;
pub mod ffprobe;
pub mod manifest;
pub mod transcode;

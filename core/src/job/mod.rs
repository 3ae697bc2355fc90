pub mod transcode_job;

pub use transcode_job::{TranscodeJob, TranscodeJobResult};

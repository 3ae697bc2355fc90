use serde::{Deserialize, Serialize};

use super::{BucketId, StoredFileId, VideoId};

/// A source video registered from an already stored bucket file.
/// The probed fields are null until the first transcoding job runs
/// the prober over the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub id: VideoId,
    pub bucket_id: BucketId,
    pub file_id: StoredFileId,
    pub size: i64,
    pub duration: Option<f64>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub video_codec_name: Option<String>,
    /// fraction as reported by the prober, e.g. "30000/1001"
    pub video_framerate: Option<String>,
    pub video_bitrate: Option<i64>,
    pub audio_codec_name: Option<String>,
    pub audio_bitrate: Option<i64>,
    pub audio_sample_rate: Option<i64>,
}

/// Probe results written back onto the Video document.
/// Video fields are set iff the source has a video stream,
/// audio fields iff it has an audio stream.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProbedMedia {
    pub duration: Option<f64>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub video_codec_name: Option<String>,
    pub video_framerate: Option<String>,
    pub video_bitrate: Option<i64>,
    pub audio_codec_name: Option<String>,
    pub audio_bitrate: Option<i64>,
    pub audio_sample_rate: Option<i64>,
}

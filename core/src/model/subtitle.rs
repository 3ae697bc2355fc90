use strum::{Display, EnumString};

use super::{BucketId, StoredFileId, SubtitleId, VideoId};

/// Subtitles start out with an empty status and are picked up by the
/// next transcoding job for their video. Lifecycle mirrors Rendition:
/// `started -> ready`, `error` terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum SubtitleStatus {
    #[strum(serialize = "")]
    Pending,
    Started,
    Ready,
    Error,
}

/// A caption track attached to a video, sourced from a stored bucket file.
#[derive(Debug, Clone, PartialEq)]
pub struct Subtitle {
    pub id: SubtitleId,
    pub video_id: VideoId,
    pub bucket_id: BucketId,
    pub file_id: StoredFileId,
    /// display name
    pub name: String,
    /// language code, e.g. "en"
    pub code: String,
    pub default: bool,
    pub status: SubtitleStatus,
    pub path: Option<String>,
    pub target_duration: Option<i32>,
}

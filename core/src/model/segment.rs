use super::{RenditionId, RenditionSegmentId, SubtitleId, SubtitleSegmentId};

/// One media chunk (`.ts`, `.m4s` or init segment) belonging to a rendition.
/// Write-once, deleted with its parent.
#[derive(Debug, Clone, PartialEq)]
pub struct RenditionSegment {
    pub id: RenditionSegmentId,
    pub rendition_id: RenditionId,
    /// stream/representation index within the manifest
    pub stream_id: i32,
    pub file_name: String,
    pub path: String,
    /// seconds; DASH SegmentURL entries carry no duration
    pub duration: Option<f64>,
    pub is_init: bool,
}

/// One WebVTT chunk belonging to a subtitle track.
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleSegment {
    pub id: SubtitleSegmentId,
    pub subtitle_id: SubtitleId,
    pub file_name: String,
    pub path: String,
    pub duration: f64,
}

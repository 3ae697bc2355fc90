use crate::model::{RenditionId, VideoId};

/// Keys on the video device are rooted at the source video's id.
/// Subtitle playlists and .vtt segments go directly under this root,
/// next to the rendition directories, so every rendition of the video
/// can reference them.
pub fn video_root(video_id: VideoId) -> String {
    format!("{}/", video_id.0)
}

/// Rendition artifacts go under `{videoId}/{name}-{renditionId}/`.
/// The rendition id suffix keeps re-runs of the same profile apart.
pub fn rendition_dir(video_id: VideoId, rendition_name: &str, rendition_id: RenditionId) -> String {
    format!("{}/{}-{}/", video_id.0, rendition_name, rendition_id.0)
}

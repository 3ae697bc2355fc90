use serde::{Deserialize, Serialize};

use crate::model::VideoId;

use super::quoted_attribute;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MasterStreamType {
    Audio,
    Video,
}

/// One variant or audio rendition referenced by the master playlist.
/// Serialized as-is into the rendition's metadata document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterStream {
    pub id: String,
    #[serde(rename = "type")]
    pub ty: MasterStreamType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub path: String,
}

/// Collects the media playlists the master references. Variant playlist
/// filenames look like `{videoId}_{streamId}[_rest].m3u8`, the stream id
/// is the second `_` separated field. Subtitle playlists are handled by
/// the subtitle finalize step and skipped here.
pub fn parse(text: &str, video_id: VideoId) -> Vec<MasterStream> {
    let video_prefix = format!("{}_", video_id.0);
    let mut streams = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if !line.contains(".m3u8") || line.contains("TYPE=SUBTITLES") {
            continue;
        }
        let (ty, path) = if line.starts_with('#') {
            let Some(uri) = quoted_attribute(line, "URI") else {
                continue;
            };
            let ty = if line.contains("TYPE=AUDIO") {
                MasterStreamType::Audio
            } else {
                MasterStreamType::Video
            };
            (ty, uri)
        } else {
            (MasterStreamType::Video, line.to_owned())
        };
        let file_name = path.rsplit('/').next().unwrap_or(&path);
        if !file_name.starts_with(&video_prefix) || file_name.contains("_subtitles_") {
            continue;
        }
        let stem = file_name.trim_end_matches(".m3u8");
        let Some(id) = stem.split('_').nth(1) else {
            continue;
        };
        let language = quoted_attribute(line, "LANGUAGE");
        streams.push(MasterStream {
            id: id.to_owned(),
            ty,
            language,
            path,
        });
    }
    streams
}

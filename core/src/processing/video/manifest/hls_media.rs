#[derive(Debug, Clone, PartialEq)]
pub struct MediaPlaylist {
    pub target_duration: Option<i32>,
    /// (file name, duration in seconds), in playlist order
    pub segments: Vec<(String, f64)>,
}

/// Pairs every `.ts`/`.vtt` line with the `#EXTINF` duration directly
/// above it. Segment lines without a pending duration are dropped, a
/// playlist that interleaves other directives stays parseable.
pub fn parse(text: &str) -> MediaPlaylist {
    let mut target_duration = None;
    let mut segments = Vec::new();
    let mut pending_duration: Option<f64> = None;
    for line in text.lines() {
        let line = line.trim();
        if let Some(value) = line.strip_prefix("#EXT-X-TARGETDURATION:") {
            target_duration = value.trim().parse().ok();
        } else if let Some(value) = line.strip_prefix("#EXTINF:") {
            pending_duration = value.split(',').next().and_then(|d| d.trim().parse().ok());
        } else if line.ends_with(".ts") || line.ends_with(".vtt") {
            if let Some(duration) = pending_duration.take() {
                segments.push((line.to_owned(), duration));
            }
        }
    }
    MediaPlaylist {
        target_duration,
        segments,
    }
}

pub mod dash_mpd;
pub mod hls_master;
pub mod hls_media;

/// Value of a `KEY="value"` attribute on a manifest line, if present.
pub(crate) fn quoted_attribute(line: &str, key: &str) -> Option<String> {
    let start = line.find(&format!("{key}=\""))? + key.len() + 2;
    let end = line[start..].find('"')? + start;
    Some(line[start..end].to_owned())
}

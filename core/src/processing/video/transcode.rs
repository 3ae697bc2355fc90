use camino::{Utf8Path, Utf8PathBuf};

use crate::model::VideoId;

/// Encoding target derived from a Profile. Bitrates in kbit/s, like the
/// profile documents carry them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Representation {
    pub width: i32,
    pub height: i32,
    pub video_kilo_bitrate: i64,
    pub audio_kilo_bitrate: i64,
}

/// A WebVTT file in scratch that gets muxed into the HLS output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleTrack {
    pub path: Utf8PathBuf,
    pub language_code: String,
    pub name: String,
    pub is_default: bool,
}

pub const SEGMENT_DURATION_SECONDS: u32 = 10;

/// Letterbox into the target frame instead of distorting: downscale
/// preserving aspect ratio, then pad to the exact profile dimensions.
pub fn scale_filter(representation: &Representation) -> String {
    let (w, h) = (representation.width, representation.height);
    format!(
        "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,setsar=1:1"
    )
}

/// Flags shared by both protocols: codec selection, rate control and a
/// keyframe every 2 seconds so segment boundaries are clean cut points.
pub fn ffmpeg_common_flags(representation: &Representation) -> Vec<String> {
    vec![
        "-dn".to_string(),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-b:v".to_string(),
        format!("{}k", representation.video_kilo_bitrate),
        "-c:a".to_string(),
        "aac".to_string(),
        "-b:a".to_string(),
        format!("{}k", representation.audio_kilo_bitrate),
        "-vf".to_string(),
        scale_filter(representation),
        "-b_strategy".to_string(),
        "1".to_string(),
        "-bf".to_string(),
        "3".to_string(),
        "-force_key_frames".to_string(),
        "expr:gte(t,n_forced*2)".to_string(),
    ]
}

/// HLS muxer flags. Variant playlists come out as `{videoId}_{v}.m3u8`
/// with `{videoId}_{v}_{seq}.ts` segments, subtitle playlists as
/// `{videoId}_subtitles_{code}.m3u8`. The `name:` fields in the
/// var_stream_map drive that naming through the `%v` placeholder.
///
/// When the source declares audio language tags, each tagged audio
/// stream becomes its own rendition in an `agroup`, labeled with its
/// language, instead of being muxed into the video variant.
pub fn ffmpeg_hls_flags(
    video_id: VideoId,
    out_dir: &Utf8Path,
    subtitles: &[SubtitleTrack],
    audio_languages: &[String],
) -> Vec<String> {
    let mut var_stream_map = if audio_languages.is_empty() {
        "v:0,a:0,name:0".to_string()
    } else {
        "v:0,name:0,agroup:audio".to_string()
    };
    if !subtitles.is_empty() {
        var_stream_map.push_str(",sgroup:subs");
    }
    for (index, language) in audio_languages.iter().enumerate() {
        let default = if index == 0 { ",default:yes" } else { "" };
        var_stream_map.push_str(&format!(
            " a:{},name:{},agroup:audio,language:{}{}",
            index,
            index + 1,
            language,
            default
        ));
    }
    let mut flags = vec![
        "-f".to_string(),
        "hls".to_string(),
        "-hls_time".to_string(),
        SEGMENT_DURATION_SECONDS.to_string(),
        "-hls_playlist_type".to_string(),
        "vod".to_string(),
        "-hls_allow_cache".to_string(),
        "0".to_string(),
        "-hls_flags".to_string(),
        "independent_segments".to_string(),
        "-master_pl_name".to_string(),
        "master.m3u8".to_string(),
        "-hls_segment_filename".to_string(),
        out_dir.join(format!("{}_%v_%03d.ts", video_id.0)).to_string(),
    ];
    if !subtitles.is_empty() {
        flags.push("-c:s".to_string());
        flags.push("webvtt".to_string());
        for (index, subtitle) in subtitles.iter().enumerate() {
            let default = if subtitle.is_default { ",default:yes" } else { "" };
            var_stream_map.push_str(&format!(
                " s:{},name:subtitles_{},language:{}{},sgroup:subs",
                index, subtitle.language_code, subtitle.language_code, default
            ));
        }
    }
    flags.push("-var_stream_map".to_string());
    flags.push(var_stream_map);
    flags.push(out_dir.join(format!("{}_%v.m3u8", video_id.0)).to_string());
    flags
}

/// DASH muxer flags. `use_timeline 0` and `use_template 0` force a
/// SegmentList/SegmentURL manifest, the only form the MPD ingest reads.
pub fn ffmpeg_dash_flags(video_id: VideoId, out_dir: &Utf8Path) -> Vec<String> {
    vec![
        "-f".to_string(),
        "dash".to_string(),
        "-seg_duration".to_string(),
        SEGMENT_DURATION_SECONDS.to_string(),
        "-use_timeline".to_string(),
        "0".to_string(),
        "-use_template".to_string(),
        "0".to_string(),
        out_dir.join(format!("{}.mpd", video_id.0)).to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn representation() -> Representation {
        Representation {
            width: 1024,
            height: 576,
            video_kilo_bitrate: 2538,
            audio_kilo_bitrate: 128,
        }
    }

    #[test]
    fn common_flags_assembled_correctly() {
        let expected = [
            "-dn",
            "-c:v",
            "libx264",
            "-b:v",
            "2538k",
            "-c:a",
            "aac",
            "-b:a",
            "128k",
            "-vf",
            "scale=1024:576:force_original_aspect_ratio=decrease,pad=1024:576:(ow-iw)/2:(oh-ih)/2,setsar=1:1",
            "-b_strategy",
            "1",
            "-bf",
            "3",
            "-force_key_frames",
            "expr:gte(t,n_forced*2)",
        ];
        let actual = ffmpeg_common_flags(&representation());
        assert_eq!(expected.as_slice(), &actual);
    }

    #[test]
    fn hls_flags_without_subtitles() {
        let expected = [
            "-f",
            "hls",
            "-hls_time",
            "10",
            "-hls_playlist_type",
            "vod",
            "-hls_allow_cache",
            "0",
            "-hls_flags",
            "independent_segments",
            "-master_pl_name",
            "master.m3u8",
            "-hls_segment_filename",
            "/scratch/out/7_%v_%03d.ts",
            "-var_stream_map",
            "v:0,a:0,name:0",
            "/scratch/out/7_%v.m3u8",
        ];
        let actual = ffmpeg_hls_flags(VideoId(7), Utf8Path::new("/scratch/out"), &[], &[]);
        assert_eq!(expected.as_slice(), &actual);
    }

    #[test]
    fn hls_flags_split_tagged_audio_into_a_group() {
        let languages = vec!["eng".to_string(), "fra".to_string()];
        let actual =
            ffmpeg_hls_flags(VideoId(7), Utf8Path::new("/scratch/out"), &[], &languages);
        let map_index = actual.iter().position(|f| f == "-var_stream_map").unwrap();
        assert_eq!(
            actual[map_index + 1],
            "v:0,name:0,agroup:audio \
             a:0,name:1,agroup:audio,language:eng,default:yes \
             a:1,name:2,agroup:audio,language:fra"
        );
    }

    #[test]
    fn hls_flags_name_subtitle_playlists_by_language() {
        let subtitles = vec![SubtitleTrack {
            path: "/scratch/in/5.vtt".into(),
            language_code: "eng".to_string(),
            name: "English".to_string(),
            is_default: true,
        }];
        let actual = ffmpeg_hls_flags(VideoId(7), Utf8Path::new("/scratch/out"), &subtitles, &[]);
        let map_index = actual.iter().position(|f| f == "-var_stream_map").unwrap();
        assert_eq!(
            actual[map_index + 1],
            "v:0,a:0,name:0,sgroup:subs s:0,name:subtitles_eng,language:eng,default:yes,sgroup:subs"
        );
        assert!(actual.contains(&"-c:s".to_string()));
        assert!(actual.contains(&"webvtt".to_string()));
    }

    #[test]
    fn dash_flags_force_segment_lists() {
        let expected = [
            "-f",
            "dash",
            "-seg_duration",
            "10",
            "-use_timeline",
            "0",
            "-use_template",
            "0",
            "/scratch/out/7.mpd",
        ];
        let actual = ffmpeg_dash_flags(VideoId(7), Utf8Path::new("/scratch/out"));
        assert_eq!(expected.as_slice(), &actual);
    }
}

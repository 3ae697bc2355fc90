use std::process::Stdio;

use camino::Utf8Path as Path;
use eyre::{Context, Result};
use serde::Deserialize;
use tokio::process::Command;
use tracing::{instrument, warn};

use super::{AudioStream, MediaInfo, ProbeError, VideoStream};

#[instrument]
pub async fn ffprobe_get_media(
    path: &Path,
    ffprobe_bin_path: Option<&Path>,
) -> Result<MediaInfo, ProbeError> {
    let ffprobe_result = Command::new(ffprobe_bin_path.map(|p| p.as_str()).unwrap_or("ffprobe"))
        .args(["-v", "error", "-show_streams", "-show_format", "-of", "json=compact=1"])
        .arg(path)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .wrap_err("failed to call ffprobe")?
        .wait_with_output()
        .await
        .wrap_err("ffprobe error")?;
    if !ffprobe_result.status.success() {
        return Err(ProbeError::InvalidMedia(
            String::from_utf8_lossy(&ffprobe_result.stderr).trim().to_owned(),
        ));
    }
    parse_ffprobe_output(&ffprobe_result.stdout)
}

pub fn parse_ffprobe_output(json: &[u8]) -> Result<MediaInfo, ProbeError> {
    #[derive(Debug, Clone, Deserialize)]
    struct FFProbeVideoStream {
        pub codec_name: String,
        pub width: i32,
        pub height: i32,
        pub bit_rate: Option<String>,
        pub avg_frame_rate: String,
    }
    #[derive(Debug, Clone, Deserialize)]
    struct FFProbeTags {
        pub language: Option<String>,
    }
    #[derive(Debug, Clone, Deserialize)]
    struct FFProbeAudioStream {
        pub codec_name: String,
        pub sample_rate: Option<String>,
        pub bit_rate: Option<String>,
        pub tags: Option<FFProbeTags>,
    }
    #[derive(Debug, Clone, Deserialize)]
    #[serde(tag = "codec_type")]
    enum FFProbeStreamType {
        #[serde(rename = "video")]
        Video(FFProbeVideoStream),
        #[serde(rename = "audio")]
        Audio(FFProbeAudioStream),
        #[serde(other)]
        Other,
    }
    #[derive(Debug, Clone, Deserialize)]
    struct FFProbeFormat {
        pub duration: Option<String>,
    }
    #[derive(Debug, Clone, Deserialize)]
    struct FFProbeOutput {
        pub streams: Vec<FFProbeStreamType>,
        pub format: Option<FFProbeFormat>,
    }

    fn parse_opt_i64(value: Option<String>, what: &'static str) -> Result<Option<i64>> {
        value
            .map(|v| v.parse().wrap_err(what))
            .transpose()
            .wrap_err("could not parse ffprobe output")
    }

    let parsed: FFProbeOutput =
        serde_json::from_slice(json).wrap_err("could not parse ffprobe output")?;

    let mut video: Option<VideoStream> = None;
    let mut audio: Vec<AudioStream> = Vec::new();
    for stream in parsed.streams {
        match stream {
            FFProbeStreamType::Video(s) => match video {
                None => {
                    video = Some(VideoStream {
                        codec_name: s.codec_name,
                        width: s.width,
                        height: s.height,
                        bitrate: parse_opt_i64(s.bit_rate, "bad bit_rate")?,
                        framerate: s.avg_frame_rate,
                    });
                }
                Some(_) => {
                    warn!("multiple video streams in file, using the first");
                }
            },
            FFProbeStreamType::Audio(s) => {
                audio.push(AudioStream {
                    codec_name: s.codec_name,
                    bitrate: parse_opt_i64(s.bit_rate, "bad bit_rate")?,
                    sample_rate: parse_opt_i64(s.sample_rate, "bad sample_rate")?,
                    language: s.tags.and_then(|t| t.language).filter(|l| !l.is_empty()),
                });
            }
            FFProbeStreamType::Other => {}
        }
    }
    if video.is_none() && audio.is_empty() {
        return Err(ProbeError::InvalidMedia(
            "no video or audio streams in file".to_owned(),
        ));
    }
    let duration = parsed
        .format
        .and_then(|f| f.duration)
        .map(|d| d.parse::<f64>().wrap_err("bad duration in ffprobe output"))
        .transpose()
        .wrap_err("could not parse ffprobe output")?;
    Ok(MediaInfo {
        duration,
        video,
        audio,
    })
}

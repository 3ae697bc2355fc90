use std::process::Stdio;

use async_trait::async_trait;
use camino::{Utf8Path as Path, Utf8PathBuf as PathBuf};
use eyre::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, instrument, warn};

use crate::model::{Protocol, VideoId};
use crate::processing::process_control::{run_process, ProcessControlReceiver};

use super::ffprobe::{ffprobe_get_media, MediaInfo};
use super::transcode::{
    ffmpeg_common_flags, ffmpeg_dash_flags, ffmpeg_hls_flags, Representation, SubtitleTrack,
};

#[derive(thiserror::Error, Debug)]
pub enum TranscodeError {
    #[error("Error starting FFmpeg")]
    ErrorStarting(#[source] std::io::Error),
    #[error("FFmpeg exited with {code}: {stderr}")]
    Failed { code: i32, stderr: String },
    #[error("FFmpeg was killed before finishing")]
    Killed,
    #[error(transparent)]
    Other(#[from] eyre::Report),
}

/// What actually came out of the encoder, read back off the generated
/// manifest. Falls back to the representation when the probe has no
/// video stream to report on.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamInfo {
    pub width: i32,
    pub height: i32,
    pub video_codec_name: Option<String>,
    pub framerate: Option<String>,
    pub duration: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct TranscodeRequest<'a> {
    pub protocol: Protocol,
    pub video_id: VideoId,
    pub input: &'a Path,
    pub out_dir: &'a Path,
    pub representation: Representation,
    pub subtitles: &'a [SubtitleTrack],
    /// declared audio languages in stream order; HLS splits these into
    /// an audio group, DASH ignores them
    pub audio_languages: &'a [String],
    /// probed container duration, used to turn encoder time into percent
    pub source_duration: Option<f64>,
}

/// The manifest file the muxer writes at the root of the output set.
pub fn primary_manifest_name(protocol: Protocol, video_id: VideoId) -> String {
    match protocol {
        Protocol::Hls => "master.m3u8".to_string(),
        Protocol::Dash => format!("{}.mpd", video_id.0),
    }
}

#[async_trait]
pub trait TranscodeEngineTrait: Send + Sync {
    async fn transcode(
        &self,
        request: &TranscodeRequest<'_>,
        progress_send: mpsc::Sender<i32>,
        control_recv: &mut ProcessControlReceiver,
    ) -> Result<StreamInfo, TranscodeError>;
}

#[derive(Debug, Clone, Default)]
pub struct FFmpegTranscoder {
    pub ffmpeg_bin_path: Option<PathBuf>,
    pub ffprobe_bin_path: Option<PathBuf>,
}

#[async_trait]
impl TranscodeEngineTrait for FFmpegTranscoder {
    #[instrument(err, name = "ffmpeg", skip(self, request, progress_send, control_recv), fields(video_id = request.video_id.0))]
    async fn transcode(
        &self,
        request: &TranscodeRequest<'_>,
        progress_send: mpsc::Sender<i32>,
        control_recv: &mut ProcessControlReceiver,
    ) -> Result<StreamInfo, TranscodeError> {
        let mut command = Command::new(
            self.ffmpeg_bin_path
                .as_deref()
                .map(|p| p.as_str())
                .unwrap_or("ffmpeg"),
        );
        command
            .arg("-nostdin")
            .arg("-y")
            .args(["-loglevel", "error", "-nostats"])
            .args(["-progress", "pipe:1"])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        command.arg("-i").arg(request.input);
        for subtitle in request.subtitles {
            command.arg("-i").arg(&subtitle.path);
        }
        let audio_group = request.protocol == Protocol::Hls && !request.audio_languages.is_empty();
        if audio_group {
            command.args(["-map", "0:v:0"]);
            for index in 0..request.audio_languages.len() {
                command.arg("-map").arg(format!("0:a:{index}"));
            }
        } else {
            command.args(["-map", "0:v:0", "-map", "0:a:0?"]);
        }
        for (index, _) in request.subtitles.iter().enumerate() {
            command.arg("-map").arg(format!("{}:0", index + 1));
        }
        command.args(ffmpeg_common_flags(&request.representation));
        match request.protocol {
            Protocol::Hls => {
                command.args(ffmpeg_hls_flags(
                    request.video_id,
                    request.out_dir,
                    request.subtitles,
                    request.audio_languages,
                ));
            }
            Protocol::Dash => {
                command.args(ffmpeg_dash_flags(request.video_id, request.out_dir));
            }
        }
        debug!(command = ?command.as_std(), "Invoking ffmpeg");

        let mut child = command.spawn().map_err(TranscodeError::ErrorStarting)?;
        let stdout = child
            .stdout
            .take()
            .expect("child process stdout must be piped");
        let source_duration = request.source_duration;
        tokio::task::spawn(async move {
            forward_progress(stdout, source_duration, progress_send).await;
        });

        let output = run_process(child, control_recv)
            .await
            .wrap_err("error running ffmpeg")?
            .ok_or(TranscodeError::Killed)?;
        if !output.status.success() {
            return Err(TranscodeError::Failed {
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }

        let manifest = request
            .out_dir
            .join(primary_manifest_name(request.protocol, request.video_id));
        Ok(self.stream_info(&manifest, &request.representation).await)
    }
}

impl FFmpegTranscoder {
    /// Probes the generated manifest. A probe failure only costs us the
    /// detailed stream info, so it degrades to the representation.
    async fn stream_info(&self, manifest: &Path, representation: &Representation) -> StreamInfo {
        let fallback = StreamInfo {
            width: representation.width,
            height: representation.height,
            video_codec_name: None,
            framerate: None,
            duration: None,
        };
        let probed: MediaInfo =
            match ffprobe_get_media(manifest, self.ffprobe_bin_path.as_deref()).await {
                Ok(info) => info,
                Err(err) => {
                    warn!("could not probe generated manifest: {}", err);
                    return fallback;
                }
            };
        match probed.video {
            Some(video) => StreamInfo {
                width: video.width,
                height: video.height,
                video_codec_name: Some(video.codec_name),
                framerate: Some(video.framerate),
                duration: probed.duration,
            },
            None => StreamInfo {
                duration: probed.duration,
                ..fallback
            },
        }
    }
}

/// Reads `-progress pipe:1` key=value lines and reports each new integer
/// percentage. ffmpeg's out_time_ms is in microseconds despite the name.
async fn forward_progress(
    stdout: impl tokio::io::AsyncRead + Unpin,
    source_duration: Option<f64>,
    progress_send: mpsc::Sender<i32>,
) {
    let Some(duration) = source_duration.filter(|d| *d > 0.0) else {
        return;
    };
    let mut lines = BufReader::new(stdout).lines();
    let mut last_sent: i32 = -1;
    while let Ok(Some(line)) = lines.next_line().await {
        let Some(value) = line.strip_prefix("out_time_ms=") else {
            continue;
        };
        let Ok(out_time_us) = value.trim().parse::<i64>() else {
            continue;
        };
        let percent = ((out_time_us as f64 / 1_000_000.0) / duration * 100.0) as i32;
        let percent = percent.clamp(0, 100);
        if percent > last_sent {
            last_sent = percent;
            if progress_send.send(percent).await.is_err() {
                // receiver gone, keep draining so ffmpeg never blocks on a full pipe
                continue;
            }
        }
    }
}

#[cfg(feature = "mock-commands")]
pub struct FFmpegTranscoderMock {}

#[cfg(feature = "mock-commands")]
#[async_trait]
impl TranscodeEngineTrait for FFmpegTranscoderMock {
    async fn transcode(
        &self,
        request: &TranscodeRequest<'_>,
        progress_send: mpsc::Sender<i32>,
        _control_recv: &mut ProcessControlReceiver,
    ) -> Result<StreamInfo, TranscodeError> {
        let _ = progress_send.send(100).await;
        Ok(StreamInfo {
            width: request.representation.width,
            height: request.representation.height,
            video_codec_name: None,
            framerate: None,
            duration: request.source_duration,
        })
    }
}

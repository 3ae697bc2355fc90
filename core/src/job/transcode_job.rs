use std::collections::HashMap;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::Utc;
use eyre::{eyre, Context, Result};
use tokio::sync::mpsc;
use tracing::{error, info, instrument, warn, Instrument};

use crate::{
    catalog::{storage_key, ScratchDirs},
    core::storage::{Storage, StorageProvider},
    interact,
    model::{
        repository::{
            self,
            db::DbPool,
            rendition::CreateRendition,
            segment::{CreateRenditionSegment, CreateSubtitleSegment},
        },
        JobPayload, Protocol, RenditionId, Subtitle, Video, VideoId,
    },
    processing::{
        fetch::fetch_to_scratch,
        process_control::ProcessControlReceiver,
        subtitle::write_as_vtt,
        video::{
            ffmpeg::{TranscodeEngineTrait, TranscodeError, TranscodeRequest},
            ffprobe::{MediaInfo, MediaProberTrait, ProbeError},
            manifest::{dash_mpd, hls_master, hls_media},
            transcode::{Representation, SubtitleTrack},
        },
    },
};

/// Progress writes hit the database only on multiples of this.
const PROGRESS_PERSIST_STEP: i32 = 3;

/// Exit code recorded when the failure has no ffmpeg exit code to borrow.
pub const GENERIC_ERROR_CODE: i32 = 500;

#[derive(Debug)]
pub enum TranscodeJobResult {
    Completed { rendition_id: RenditionId },
    /// The source was not usable media. Logged and dropped, no rendition
    /// document is ever created for it.
    RejectedSource,
}

/// One claimed queue payload turned into a rendition. Owns the scratch
/// space for the run and drives the rendition state machine; the devices
/// are already scoped to the payload's project.
pub struct TranscodeJob<P: MediaProberTrait, E: TranscodeEngineTrait> {
    pub pool: DbPool,
    pub files_device: Storage,
    pub video_device: Storage,
    pub scratch_root: Utf8PathBuf,
    pub encryption_keys: HashMap<i32, Vec<u8>>,
    pub prober: P,
    pub engine: E,
}

impl<P: MediaProberTrait, E: TranscodeEngineTrait> TranscodeJob<P, E> {
    #[instrument(name = "TranscodeJob", skip(self, payload, control_recv), fields(video_id = payload.video.id.0, profile_id = payload.profile.id.0))]
    pub async fn run(
        &self,
        payload: &JobPayload,
        control_recv: &mut ProcessControlReceiver,
    ) -> Result<TranscodeJobResult> {
        let scratch = ScratchDirs::create(&self.scratch_root).await?;
        let result = self.run_inner(payload, &scratch, control_recv).await;
        if let Err(err) = scratch.cleanup().await {
            // never let cleanup decide the job's fate
            warn!("could not remove scratch directory {}: {}", scratch.root, err);
        }
        result
    }

    async fn run_inner(
        &self,
        payload: &JobPayload,
        scratch: &ScratchDirs,
        control_recv: &mut ProcessControlReceiver,
    ) -> Result<TranscodeJobResult> {
        let video = &payload.video;

        let source_path = self.fetch_source(video, scratch).await?;
        let subtitles = self.fetch_subtitles(video.id, scratch).await?;

        let probed = match self.prober.probe(&source_path).await {
            Ok(probed) => probed,
            Err(ProbeError::InvalidMedia(reason)) => {
                warn!(video_id = video.id.0, "rejecting source: {}", reason);
                return Ok(TranscodeJobResult::RejectedSource);
            }
            Err(ProbeError::Other(report)) => {
                return Err(report.wrap_err("error probing source"));
            }
        };
        self.persist_probed(video.id, &probed).await?;

        let rendition_name = payload.profile.rendition_name();
        let conn = self.pool.get().await?;
        let create = CreateRendition {
            video_id: video.id,
            profile_id: payload.profile.id,
            name: rendition_name.clone(),
            protocol: payload.profile.protocol,
            started_at: Utc::now(),
        };
        let rendition_id = interact!(conn, move |conn| {
            repository::rendition::insert_rendition(conn, &create)
        })
        .await??;
        drop(conn);

        // the rendition document exists now, any failure below lands on it
        match self
            .produce_rendition(
                payload,
                scratch,
                &source_path,
                &subtitles,
                &probed,
                rendition_id,
                control_recv,
            )
            .await
        {
            Ok(()) => {
                info!(rendition_id = rendition_id.0, "rendition ready");
                Ok(TranscodeJobResult::Completed { rendition_id })
            }
            Err(report) => {
                let code = report
                    .downcast_ref::<TranscodeError>()
                    .and_then(|err| match err {
                        TranscodeError::Failed { code, .. } => Some(*code),
                        _ => None,
                    })
                    .unwrap_or(GENERIC_ERROR_CODE);
                let message = format!("{:#}", report);
                let conn = self.pool.get().await?;
                if let Err(update_err) = interact!(conn, move |conn| {
                    repository::rendition::mark_error(conn, rendition_id, code, &message)
                })
                .await?
                {
                    error!(
                        rendition_id = rendition_id.0,
                        "could not record rendition error: {}", update_err
                    );
                }
                Err(report)
            }
        }
    }

    /// Everything between `started` and `ready`. Errors bubble to the
    /// caller, which owns the transition to `error`.
    #[allow(clippy::too_many_arguments)]
    async fn produce_rendition(
        &self,
        payload: &JobPayload,
        scratch: &ScratchDirs,
        source_path: &Utf8Path,
        subtitles: &[(Subtitle, SubtitleTrack)],
        probed: &MediaInfo,
        rendition_id: RenditionId,
        control_recv: &mut ProcessControlReceiver,
    ) -> Result<()> {
        let video_id = payload.video.id;
        let protocol = payload.profile.protocol;
        let rendition_name = payload.profile.rendition_name();

        let (progress_send, progress_recv) = mpsc::channel(64);
        let persister = tokio::task::spawn(
            persist_progress(self.pool.clone(), rendition_id, progress_recv).in_current_span(),
        );

        let tracks: Vec<SubtitleTrack> = match protocol {
            // only the HLS muxer consumes subtitle inputs
            Protocol::Hls => subtitles.iter().map(|(_, track)| track.clone()).collect(),
            Protocol::Dash => Vec::new(),
        };
        let audio_languages = probed.audio_languages();
        let request = TranscodeRequest {
            protocol,
            video_id,
            input: source_path,
            out_dir: &scratch.out_dir,
            representation: Representation {
                width: payload.profile.width,
                height: payload.profile.height,
                video_kilo_bitrate: payload.profile.video_bitrate,
                audio_kilo_bitrate: payload.profile.audio_bitrate,
            },
            subtitles: &tracks,
            audio_languages: &audio_languages,
            source_duration: probed.duration,
        };
        let stream_info = self
            .engine
            .transcode(&request, progress_send, control_recv)
            .await?;
        info!(
            rendition_id = rendition_id.0,
            width = stream_info.width,
            height = stream_info.height,
            codec = stream_info.video_codec_name.as_deref().unwrap_or("unknown"),
            "encoder finished"
        );
        if let Err(err) = persister.await {
            warn!("progress persister task panicked: {}", err);
        }

        let rendition_path = storage_key::rendition_dir(video_id, &rendition_name, rendition_id);
        self.ingest_manifests(payload, scratch, rendition_id, &rendition_path)
            .await?;
        self.finalize_subtitles(payload, scratch, subtitles).await?;
        self.upload_artifacts(video_id, scratch, rendition_id, &rendition_path)
            .await?;

        let conn = self.pool.get().await?;
        interact!(conn, move |conn| {
            repository::rendition::mark_ready(conn, rendition_id)
        })
        .await??;
        Ok(())
    }

    async fn fetch_source(&self, video: &Video, scratch: &ScratchDirs) -> Result<Utf8PathBuf> {
        let file_id = video.file_id;
        let conn = self.pool.get().await?;
        let file = interact!(conn, move |conn| {
            repository::stored_file::get_stored_file(conn, file_id)
        })
        .await??;
        drop(conn);
        let extension = Utf8Path::new(&file.path)
            .extension()
            .unwrap_or("mp4")
            .to_owned();
        let source_path = scratch.in_dir.join(format!("in.{extension}"));
        fetch_to_scratch(
            &self.files_device,
            &file,
            &self.encryption_keys,
            &source_path,
        )
        .await
        .wrap_err("error fetching source file")?;
        Ok(source_path)
    }

    /// Pulls every pending subtitle of the video into scratch as WebVTT.
    /// A subtitle that cannot be fetched goes to `error` and is skipped,
    /// it does not fail the rendition.
    async fn fetch_subtitles(
        &self,
        video_id: VideoId,
        scratch: &ScratchDirs,
    ) -> Result<Vec<(Subtitle, SubtitleTrack)>> {
        let conn = self.pool.get().await?;
        let pending = interact!(conn, move |conn| {
            repository::subtitle::get_pending_subtitles(conn, video_id)
        })
        .await??;
        let mut tracks = Vec::with_capacity(pending.len());
        for subtitle in pending {
            let subtitle_id = subtitle.id;
            interact!(conn, move |conn| {
                repository::subtitle::set_started(conn, subtitle_id)
            })
            .await??;
            match self.fetch_one_subtitle(&subtitle, scratch).await {
                Ok(track) => tracks.push((subtitle, track)),
                Err(err) => {
                    warn!(
                        subtitle_id = subtitle_id.0,
                        "could not prepare subtitle: {}", err
                    );
                    interact!(conn, move |conn| {
                        repository::subtitle::mark_error(conn, subtitle_id)
                    })
                    .await??;
                }
            }
        }
        Ok(tracks)
    }

    async fn fetch_one_subtitle(
        &self,
        subtitle: &Subtitle,
        scratch: &ScratchDirs,
    ) -> Result<SubtitleTrack> {
        let file_id = subtitle.file_id;
        let conn = self.pool.get().await?;
        let file = interact!(conn, move |conn| {
            repository::stored_file::get_stored_file(conn, file_id)
        })
        .await??;
        drop(conn);
        let extension = Utf8Path::new(&file.path).extension().unwrap_or("srt");
        let raw_path = scratch
            .in_dir
            .join(format!("{}.{}", subtitle.id.0, extension));
        fetch_to_scratch(&self.files_device, &file, &self.encryption_keys, &raw_path).await?;
        let vtt_path = scratch.in_dir.join(format!("{}.vtt", subtitle.id.0));
        if raw_path != vtt_path {
            write_as_vtt(&raw_path, &vtt_path).await?;
        }
        Ok(SubtitleTrack {
            path: vtt_path,
            language_code: subtitle.code.clone(),
            name: subtitle.name.clone(),
            is_default: subtitle.default,
        })
    }

    async fn persist_probed(&self, video_id: VideoId, probed: &MediaInfo) -> Result<()> {
        let update = crate::model::ProbedMedia {
            duration: probed.duration,
            width: probed.video.as_ref().map(|v| v.width),
            height: probed.video.as_ref().map(|v| v.height),
            video_codec_name: probed.video.as_ref().map(|v| v.codec_name.clone()),
            video_framerate: probed.video.as_ref().map(|v| v.framerate.clone()),
            video_bitrate: probed.video.as_ref().and_then(|v| v.bitrate),
            audio_codec_name: probed.audio.first().map(|a| a.codec_name.clone()),
            audio_bitrate: probed.audio.first().and_then(|a| a.bitrate),
            audio_sample_rate: probed.audio.first().and_then(|a| a.sample_rate),
        };
        let conn = self.pool.get().await?;
        interact!(conn, move |conn| {
            repository::video::set_probed_media(conn, video_id, &update)
        })
        .await??;
        Ok(())
    }

    /// Reads the generated manifests back and turns them into segment
    /// documents plus the rendition's metadata, then marks `ended`.
    async fn ingest_manifests(
        &self,
        payload: &JobPayload,
        scratch: &ScratchDirs,
        rendition_id: RenditionId,
        rendition_path: &str,
    ) -> Result<()> {
        let video_id = payload.video.id;
        let (metadata, target_duration, segments) = match payload.profile.protocol {
            Protocol::Hls => {
                let master_text = tokio::fs::read_to_string(scratch.out_dir.join("master.m3u8"))
                    .await
                    .wrap_err("could not read master playlist")?;
                let streams = hls_master::parse(&master_text, video_id);
                if streams.is_empty() {
                    return Err(eyre!("master playlist references no media playlists"));
                }
                let metadata = serde_json::to_string(&streams)
                    .wrap_err("could not serialize master playlist streams")?;
                let mut target_duration = None;
                let mut segments = Vec::new();
                for stream in &streams {
                    let playlist_text =
                        tokio::fs::read_to_string(scratch.out_dir.join(&stream.path))
                            .await
                            .wrap_err("could not read media playlist")?;
                    let playlist = hls_media::parse(&playlist_text);
                    // last playlist wins, they all share the muxer's segment length
                    target_duration = playlist.target_duration.or(target_duration);
                    let stream_id: i32 = stream.id.parse().unwrap_or(0);
                    segments.extend(playlist.segments.into_iter().map(
                        |(file_name, duration)| CreateRenditionSegment {
                            rendition_id,
                            stream_id,
                            file_name,
                            path: rendition_path.to_owned(),
                            duration: Some(duration),
                            is_init: false,
                        },
                    ));
                }
                (metadata, target_duration, segments)
            }
            Protocol::Dash => {
                let mpd_text = tokio::fs::read_to_string(
                    scratch.out_dir.join(format!("{}.mpd", video_id.0)),
                )
                .await
                .wrap_err("could not read MPD manifest")?;
                let manifest = dash_mpd::parse(&mpd_text);
                let segments = manifest
                    .segments
                    .into_iter()
                    .map(|segment| CreateRenditionSegment {
                        rendition_id,
                        stream_id: segment.stream_id,
                        file_name: segment.file_name,
                        path: rendition_path.to_owned(),
                        duration: None,
                        is_init: segment.is_init,
                    })
                    .collect();
                (manifest.metadata, None, segments)
            }
        };

        let conn = self.pool.get().await?;
        interact!(conn, move |conn| {
            repository::segment::insert_rendition_segments(conn, &segments)?;
            repository::rendition::mark_ended(
                conn,
                rendition_id,
                Some(&metadata),
                target_duration,
                Utc::now(),
            )
        })
        .await??;
        Ok(())
    }

    /// HLS: the muxer already wrote `{videoId}_subtitles_{code}.m3u8`,
    /// parse it into segment documents. DASH: the muxer takes no subtitle
    /// inputs, so the raw WebVTT is placed into the output set instead.
    async fn finalize_subtitles(
        &self,
        payload: &JobPayload,
        scratch: &ScratchDirs,
        subtitles: &[(Subtitle, SubtitleTrack)],
    ) -> Result<()> {
        let video_id = payload.video.id;
        let video_root = storage_key::video_root(video_id);
        for (subtitle, track) in subtitles {
            let subtitle_id = subtitle.id;
            let target_duration = match payload.profile.protocol {
                Protocol::Hls => {
                    let playlist_name =
                        format!("{}_subtitles_{}.m3u8", video_id.0, subtitle.code);
                    let playlist_text =
                        tokio::fs::read_to_string(scratch.out_dir.join(&playlist_name))
                            .await
                            .wrap_err("could not read subtitle playlist")?;
                    let playlist = hls_media::parse(&playlist_text);
                    let segments: Vec<CreateSubtitleSegment> = playlist
                        .segments
                        .into_iter()
                        .map(|(file_name, duration)| CreateSubtitleSegment {
                            subtitle_id,
                            file_name,
                            path: video_root.clone(),
                            duration,
                        })
                        .collect();
                    let conn = self.pool.get().await?;
                    interact!(conn, move |conn| {
                        repository::segment::insert_subtitle_segments(conn, &segments)
                    })
                    .await??;
                    playlist.target_duration
                }
                Protocol::Dash => {
                    let out_name = format!("{}_subtitles_{}.vtt", video_id.0, subtitle.code);
                    tokio::fs::copy(&track.path, scratch.out_dir.join(out_name))
                        .await
                        .wrap_err("could not place subtitle in output set")?;
                    None
                }
            };
            let conn = self.pool.get().await?;
            let path = video_root.clone();
            interact!(conn, move |conn| {
                repository::subtitle::mark_ready(conn, subtitle_id, &path, target_duration)
            })
            .await??;
        }
        Ok(())
    }

    /// Moves everything the encoder produced onto the video device.
    /// Subtitle artifacts go to the video root so every rendition of the
    /// video can reference them, the rest under the rendition directory.
    async fn upload_artifacts(
        &self,
        video_id: VideoId,
        scratch: &ScratchDirs,
        rendition_id: RenditionId,
        rendition_path: &str,
    ) -> Result<()> {
        let out_dir = scratch.out_dir.clone();
        let files: Vec<Utf8PathBuf> = tokio::task::spawn_blocking(move || {
            walkdir::WalkDir::new(&out_dir)
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_file())
                .filter_map(|entry| Utf8PathBuf::from_path_buf(entry.into_path()).ok())
                .collect()
        })
        .await
        .wrap_err("error walking scratch output directory")?;

        let video_root = storage_key::video_root(video_id);
        let mut marked_uploading = false;
        for file in files {
            let Some(file_name) = file.file_name() else {
                continue;
            };
            let key = if file_name.contains("_subtitles_") || file_name.ends_with(".vtt") {
                format!("{video_root}{file_name}")
            } else {
                format!("{rendition_path}{file_name}")
            };
            self.video_device
                .write_file(&key, &file, guess_mime(&file))
                .await
                .wrap_err("error uploading artifact")?;
            if !marked_uploading {
                marked_uploading = true;
                let conn = self.pool.get().await?;
                let path = rendition_path.to_owned();
                interact!(conn, move |conn| {
                    repository::rendition::mark_uploading(conn, rendition_id, &path)
                })
                .await??;
            }
            if let Err(err) = tokio::fs::remove_file(&file).await {
                warn!("could not remove uploaded artifact {}: {}", file, err);
            }
        }
        Ok(())
    }
}

async fn persist_progress(
    pool: DbPool,
    rendition_id: RenditionId,
    mut progress_recv: mpsc::Receiver<i32>,
) {
    let mut last_written = -1;
    while let Some(percent) = progress_recv.recv().await {
        if percent % PROGRESS_PERSIST_STEP != 0 || percent <= last_written {
            continue;
        }
        let conn = match pool.get().await {
            Ok(conn) => conn,
            Err(err) => {
                warn!("could not persist progress: {}", err);
                continue;
            }
        };
        let written = interact!(conn, move |conn| {
            repository::rendition::set_progress(conn, rendition_id, percent)
        })
        .await;
        match written {
            Ok(Ok(())) => {
                last_written = percent;
            }
            Ok(Err(err)) | Err(err) => {
                warn!("could not persist progress: {}", err);
            }
        }
    }
}

fn guess_mime(path: &Utf8Path) -> &'static str {
    match path.extension() {
        Some("m3u8") => "application/vnd.apple.mpegurl",
        Some("mpd") => "application/dash+xml",
        Some("ts") => "video/mp2t",
        Some("m4s") => "video/iso.segment",
        Some("mp4") => "video/mp4",
        Some("vtt") => "text/vtt",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use claims::{assert_err, assert_ok};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        core::storage::LocalFileStorage,
        model::{
            repository::subtitle::CreateSubtitle, BucketId, Compression, Profile, ProfileId,
            RenditionStatus, StoredFile, StoredFileId, SubtitleId,
        },
        processing::video::ffmpeg::StreamInfo,
        processing::video::ffprobe::VideoStream,
    };

    struct FakeProber {
        reject: bool,
    }

    #[async_trait]
    impl MediaProberTrait for FakeProber {
        async fn probe(&self, _path: &Utf8Path) -> Result<MediaInfo, ProbeError> {
            if self.reject {
                return Err(ProbeError::InvalidMedia("not media".to_owned()));
            }
            Ok(MediaInfo {
                duration: Some(14.5),
                video: Some(VideoStream {
                    codec_name: "h264".to_owned(),
                    width: 1920,
                    height: 1080,
                    bitrate: Some(4_500_000),
                    framerate: "25/1".to_owned(),
                }),
                audio: Vec::new(),
            })
        }
    }

    /// Pretends to be the HLS muxer: writes the manifests and segments a
    /// real run would leave in the scratch output directory.
    struct FakeHlsEngine;

    #[async_trait]
    impl TranscodeEngineTrait for FakeHlsEngine {
        async fn transcode(
            &self,
            request: &TranscodeRequest<'_>,
            progress_send: mpsc::Sender<i32>,
            _control_recv: &mut ProcessControlReceiver,
        ) -> Result<StreamInfo, TranscodeError> {
            for percent in [3, 50, 99] {
                let _ = progress_send.send(percent).await;
            }
            let vid = request.video_id.0;
            let out = request.out_dir;
            let master = format!(
                "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=2729000,RESOLUTION=1024x576\n{vid}_0.m3u8\n"
            );
            let media = format!(
                "#EXTM3U\n#EXT-X-TARGETDURATION:10\n#EXTINF:10.000000,\n{vid}_0_000.ts\n#EXTINF:4.500000,\n{vid}_0_001.ts\n#EXT-X-ENDLIST\n"
            );
            tokio::fs::write(out.join("master.m3u8"), master).await.unwrap();
            tokio::fs::write(out.join(format!("{vid}_0.m3u8")), media).await.unwrap();
            tokio::fs::write(out.join(format!("{vid}_0_000.ts")), b"seg0").await.unwrap();
            tokio::fs::write(out.join(format!("{vid}_0_001.ts")), b"seg1").await.unwrap();
            for track in request.subtitles {
                let code = &track.language_code;
                let playlist = format!(
                    "#EXTM3U\n#EXT-X-TARGETDURATION:10\n#EXTINF:14.500000,\n{vid}_subtitles_{code}_0.vtt\n#EXT-X-ENDLIST\n"
                );
                tokio::fs::write(
                    out.join(format!("{vid}_subtitles_{code}.m3u8")),
                    playlist,
                )
                .await
                .unwrap();
                tokio::fs::copy(
                    &track.path,
                    out.join(format!("{vid}_subtitles_{code}_0.vtt")),
                )
                .await
                .unwrap();
            }
            Ok(StreamInfo {
                width: request.representation.width,
                height: request.representation.height,
                video_codec_name: Some("h264".to_owned()),
                framerate: Some("25/1".to_owned()),
                duration: request.source_duration,
            })
        }
    }

    struct FailingEngine;

    #[async_trait]
    impl TranscodeEngineTrait for FailingEngine {
        async fn transcode(
            &self,
            _request: &TranscodeRequest<'_>,
            _progress_send: mpsc::Sender<i32>,
            _control_recv: &mut ProcessControlReceiver,
        ) -> Result<StreamInfo, TranscodeError> {
            Err(TranscodeError::Failed {
                code: 1,
                stderr: "e".repeat(600),
            })
        }
    }

    struct Fixture {
        _db_dir: tempfile::TempDir,
        files_dir: tempfile::TempDir,
        _video_dir: tempfile::TempDir,
        _scratch_dir: tempfile::TempDir,
        pool: DbPool,
        files_device: Storage,
        video_device: Storage,
        video_root: Utf8PathBuf,
        scratch_root: Utf8PathBuf,
        payload: JobPayload,
    }

    async fn setup() -> Fixture {
        let db_dir = tempfile::tempdir().unwrap();
        let files_dir = tempfile::tempdir().unwrap();
        let video_dir = tempfile::tempdir().unwrap();
        let scratch_dir = tempfile::tempdir().unwrap();

        let db_path = Utf8PathBuf::from_path_buf(db_dir.path().join("test.db")).unwrap();
        let pool = repository::db::open_db_pool(db_path.as_str()).unwrap();
        let conn = pool.get().await.unwrap();
        interact!(conn, |conn| repository::db::migrate(conn))
            .await
            .unwrap()
            .unwrap();

        let files_root = Utf8PathBuf::from_path_buf(files_dir.path().to_owned()).unwrap();
        let video_root = Utf8PathBuf::from_path_buf(video_dir.path().to_owned()).unwrap();
        let scratch_root = Utf8PathBuf::from_path_buf(scratch_dir.path().to_owned()).unwrap();

        tokio::fs::write(files_root.join("source.mp4"), b"fake mp4 bits")
            .await
            .unwrap();
        let file = StoredFile {
            id: StoredFileId(0),
            bucket_id: BucketId(1),
            path: "source.mp4".to_owned(),
            mime_type: "video/mp4".to_owned(),
            size: 13,
            compression: Compression::None,
            cipher: None,
        };
        let (video_id, profile_id) = interact!(conn, move |conn| {
            let file_id = repository::stored_file::insert_stored_file(conn, &file)?;
            let video_id = repository::video::insert_video(
                conn,
                &Video {
                    id: VideoId(0),
                    bucket_id: BucketId(1),
                    file_id,
                    size: 13,
                    duration: None,
                    width: None,
                    height: None,
                    video_codec_name: None,
                    video_framerate: None,
                    video_bitrate: None,
                    audio_codec_name: None,
                    audio_bitrate: None,
                    audio_sample_rate: None,
                },
            )?;
            let profile_id = repository::profile::insert_profile(
                conn,
                &Profile {
                    id: ProfileId(0),
                    name: "sd".to_owned(),
                    video_bitrate: 2538,
                    audio_bitrate: 128,
                    width: 1024,
                    height: 576,
                    protocol: Protocol::Hls,
                },
            )?;
            Ok((video_id, profile_id))
        })
        .await
        .unwrap()
        .unwrap();

        let video = interact!(conn, move |conn| repository::video::get_video(
            conn, video_id
        ))
        .await
        .unwrap()
        .unwrap();
        let profile = interact!(conn, move |conn| repository::profile::get_profile(
            conn, profile_id
        ))
        .await
        .unwrap()
        .unwrap();

        Fixture {
            _db_dir: db_dir,
            files_dir,
            _video_dir: video_dir,
            _scratch_dir: scratch_dir,
            pool,
            files_device: LocalFileStorage::new(files_root).into(),
            video_device: LocalFileStorage::new(video_root.clone()).into(),
            video_root,
            scratch_root,
            payload: JobPayload {
                project_id: "proj1".to_owned(),
                user_id: "user1".to_owned(),
                video,
                profile,
            },
        }
    }

    async fn add_pending_subtitle(fixture: &Fixture) -> SubtitleId {
        let conn = fixture.pool.get().await.unwrap();
        let srt = "1\n00:00:01,000 --> 00:00:03,000\nHello\n";
        tokio::fs::write(
            fixture.files_dir.path().join("eng.srt"),
            srt,
        )
        .await
        .unwrap();
        let video_id = fixture.payload.video.id;
        interact!(conn, move |conn| {
            let file_id = repository::stored_file::insert_stored_file(
                conn,
                &StoredFile {
                    id: StoredFileId(0),
                    bucket_id: BucketId(1),
                    path: "eng.srt".to_owned(),
                    mime_type: "text/plain".to_owned(),
                    size: 40,
                    compression: Compression::None,
                    cipher: None,
                },
            )?;
            repository::subtitle::insert_subtitle(
                conn,
                &CreateSubtitle {
                    video_id,
                    bucket_id: BucketId(1),
                    file_id,
                    name: "English".to_owned(),
                    code: "eng".to_owned(),
                    is_default: true,
                },
            )
        })
        .await
        .unwrap()
        .unwrap()
    }

    fn job<E: TranscodeEngineTrait>(
        fixture: &Fixture,
        reject: bool,
        engine: E,
    ) -> TranscodeJob<FakeProber, E> {
        TranscodeJob {
            pool: fixture.pool.clone(),
            files_device: fixture.files_device.clone(),
            video_device: fixture.video_device.clone(),
            scratch_root: fixture.scratch_root.clone(),
            encryption_keys: HashMap::new(),
            prober: FakeProber { reject },
            engine,
        }
    }

    #[tokio::test]
    async fn hls_run_produces_ready_rendition_with_subtitles() {
        let fixture = setup().await;
        let subtitle_id = add_pending_subtitle(&fixture).await;
        let job = job(&fixture, false, FakeHlsEngine);
        let (_ctl_send, mut ctl_recv) = mpsc::channel(1);

        let result = assert_ok!(job.run(&fixture.payload, &mut ctl_recv).await);
        let rendition_id = match result {
            TranscodeJobResult::Completed { rendition_id } => rendition_id,
            other => panic!("expected completed run, got {:?}", other),
        };

        let conn = fixture.pool.get().await.unwrap();
        let video_id = fixture.payload.video.id;
        let rendition = interact!(conn, move |conn| {
            repository::rendition::get_rendition(conn, rendition_id)
        })
        .await
        .unwrap()
        .unwrap();
        assert_eq!(rendition.status, RenditionStatus::Ready);
        assert_eq!(rendition.progress, 100);
        assert_eq!(rendition.name, "1024X576@2666");
        assert_eq!(rendition.target_duration, Some(10));
        let expected_path = format!("{}/1024X576@2666-{}/", video_id.0, rendition_id.0);
        assert_eq!(rendition.path.as_deref(), Some(expected_path.as_str()));
        let metadata = rendition.metadata.unwrap();
        assert!(metadata.contains(r#""type":"video""#));

        let segments = interact!(conn, move |conn| {
            repository::segment::get_ready_segments_for_rendition(conn, rendition_id)
        })
        .await
        .unwrap()
        .unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].stream_id, 0);
        assert_eq!(segments[0].duration, Some(10.0));
        assert_eq!(segments[1].duration, Some(4.5));

        // probed fields written back onto the video
        let video = interact!(conn, move |conn| repository::video::get_video(
            conn, video_id
        ))
        .await
        .unwrap()
        .unwrap();
        assert_eq!(video.duration, Some(14.5));
        assert_eq!(video.video_codec_name.as_deref(), Some("h264"));

        // subtitle went ready with its segments in the video root
        let subtitles = interact!(conn, move |conn| {
            repository::subtitle::get_pending_subtitles(conn, video_id)
        })
        .await
        .unwrap()
        .unwrap();
        assert!(subtitles.is_empty());
        let subtitle_segments = interact!(conn, move |conn| {
            repository::segment::get_segments_for_subtitle(conn, subtitle_id)
        })
        .await
        .unwrap()
        .unwrap();
        assert_eq!(subtitle_segments.len(), 1);
        assert_eq!(subtitle_segments[0].duration, 14.5);
        assert_eq!(subtitle_segments[0].path, format!("{}/", video_id.0));

        // artifacts landed on the video device, subtitles at the video root
        let vid = video_id.0;
        assert!(fixture
            .video_root
            .join(format!("{vid}/1024X576@2666-{}/master.m3u8", rendition_id.0))
            .is_file());
        assert!(fixture
            .video_root
            .join(format!("{vid}/1024X576@2666-{}/{vid}_0_000.ts", rendition_id.0))
            .is_file());
        assert!(fixture
            .video_root
            .join(format!("{vid}/{vid}_subtitles_eng.m3u8"))
            .is_file());
        assert!(fixture
            .video_root
            .join(format!("{vid}/{vid}_subtitles_eng_0.vtt"))
            .is_file());

        // scratch is gone
        let mut entries = tokio::fs::read_dir(&fixture.scratch_root).await.unwrap();
        assert!(entries.next_entry().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn encoder_failure_marks_exactly_one_error() {
        let fixture = setup().await;
        let job = job(&fixture, false, FailingEngine);
        let (_ctl_send, mut ctl_recv) = mpsc::channel(1);

        assert_err!(job.run(&fixture.payload, &mut ctl_recv).await);

        let conn = fixture.pool.get().await.unwrap();
        let video_id = fixture.payload.video.id;
        let renditions = interact!(conn, move |conn| {
            repository::rendition::get_renditions_for_video(conn, video_id)
        })
        .await
        .unwrap()
        .unwrap();
        assert_eq!(renditions.len(), 1);
        let rendition = &renditions[0];
        assert_eq!(rendition.status, RenditionStatus::Error);
        assert_eq!(rendition.error_code, Some(1));
        let message = rendition.error_message.as_ref().unwrap();
        assert!(!message.is_empty());
        assert!(message.len() <= 255);

        let rendition_id = rendition.id;
        let segments = interact!(conn, move |conn| {
            repository::segment::get_segments_for_rendition(conn, rendition_id)
        })
        .await
        .unwrap()
        .unwrap();
        assert!(segments.is_empty());

        // scratch cleaned up on failure too
        let mut entries = tokio::fs::read_dir(&fixture.scratch_root).await.unwrap();
        assert!(entries.next_entry().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn invalid_source_is_rejected_without_a_rendition() {
        let fixture = setup().await;
        let job = job(&fixture, true, FakeHlsEngine);
        let (_ctl_send, mut ctl_recv) = mpsc::channel(1);

        let result = assert_ok!(job.run(&fixture.payload, &mut ctl_recv).await);
        assert!(matches!(result, TranscodeJobResult::RejectedSource));

        let conn = fixture.pool.get().await.unwrap();
        let video_id = fixture.payload.video.id;
        let renditions = interact!(conn, move |conn| {
            repository::rendition::get_renditions_for_video(conn, video_id)
        })
        .await
        .unwrap()
        .unwrap();
        assert!(renditions.is_empty());
    }
}

use diesel::{Queryable, Selectable};

use crate::model::{BucketId, StoredFileId, Video, VideoId};

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = super::super::schema::Video)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DbVideo {
    pub video_id: i64,
    pub bucket_id: i64,
    pub file_id: i64,
    pub size: i64,
    pub duration: Option<f64>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub video_codec_name: Option<String>,
    pub video_framerate: Option<String>,
    pub video_bitrate: Option<i64>,
    pub audio_codec_name: Option<String>,
    pub audio_bitrate: Option<i64>,
    pub audio_sample_rate: Option<i64>,
}

impl TryFrom<DbVideo> for Video {
    type Error = eyre::Report;

    fn try_from(value: DbVideo) -> Result<Self, Self::Error> {
        Ok(Video {
            id: VideoId(value.video_id),
            bucket_id: BucketId(value.bucket_id),
            file_id: StoredFileId(value.file_id),
            size: value.size,
            duration: value.duration,
            width: value.width,
            height: value.height,
            video_codec_name: value.video_codec_name,
            video_framerate: value.video_framerate,
            video_bitrate: value.video_bitrate,
            audio_codec_name: value.audio_codec_name,
            audio_bitrate: value.audio_bitrate,
            audio_sample_rate: value.audio_sample_rate,
        })
    }
}

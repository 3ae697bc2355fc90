use std::str::FromStr;

use diesel::{Queryable, Selectable};
use eyre::Context;

use crate::model::{BucketId, StoredFileId, Subtitle, SubtitleId, SubtitleStatus, VideoId};

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = super::super::schema::Subtitle)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DbSubtitle {
    pub subtitle_id: i64,
    pub video_id: i64,
    pub bucket_id: i64,
    pub file_id: i64,
    pub name: String,
    pub code: String,
    pub is_default: i32,
    pub status: String,
    pub path: Option<String>,
    pub target_duration: Option<i32>,
}

impl TryFrom<DbSubtitle> for Subtitle {
    type Error = eyre::Report;

    fn try_from(value: DbSubtitle) -> Result<Self, Self::Error> {
        Ok(Subtitle {
            id: SubtitleId(value.subtitle_id),
            video_id: VideoId(value.video_id),
            bucket_id: BucketId(value.bucket_id),
            file_id: StoredFileId(value.file_id),
            name: value.name,
            code: value.code,
            default: value.is_default != 0,
            status: SubtitleStatus::from_str(&value.status)
                .wrap_err("invalid status in Subtitle row")?,
            path: value.path,
            target_duration: value.target_duration,
        })
    }
}

use std::str::FromStr;

use diesel::{Queryable, Selectable};
use eyre::Context;

use crate::model::{
    util::datetime_from_db, ProfileId, Protocol, Rendition, RenditionId, RenditionStatus, VideoId,
};

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = super::super::schema::Rendition)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DbRendition {
    pub rendition_id: i64,
    pub video_id: i64,
    pub profile_id: i64,
    pub name: String,
    pub protocol: String,
    pub status: String,
    pub progress: i32,
    pub started_at: i64,
    pub ended_at: Option<i64>,
    pub path: Option<String>,
    pub metadata: Option<String>,
    pub target_duration: Option<i32>,
    pub error_code: Option<i32>,
    pub error_message: Option<String>,
}

impl TryFrom<DbRendition> for Rendition {
    type Error = eyre::Report;

    fn try_from(value: DbRendition) -> Result<Self, Self::Error> {
        Ok(Rendition {
            id: RenditionId(value.rendition_id),
            video_id: VideoId(value.video_id),
            profile_id: ProfileId(value.profile_id),
            name: value.name,
            protocol: Protocol::from_str(&value.protocol)
                .wrap_err("invalid protocol in Rendition row")?,
            status: RenditionStatus::from_str(&value.status)
                .wrap_err("invalid status in Rendition row")?,
            progress: value.progress,
            started_at: datetime_from_db(value.started_at)?,
            ended_at: value.ended_at.map(datetime_from_db).transpose()?,
            path: value.path,
            metadata: value.metadata,
            target_duration: value.target_duration,
            error_code: value.error_code,
            error_message: value.error_message,
        })
    }
}

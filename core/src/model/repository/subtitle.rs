use diesel::prelude::*;
use eyre::{Context, Result};
use tracing::instrument;

use crate::model::{
    repository::db_entity::DbSubtitle, BucketId, StoredFileId, Subtitle, SubtitleId,
    SubtitleStatus, VideoId,
};
use super::db::DbConn;
use super::schema;

#[derive(Debug, Clone)]
pub struct CreateSubtitle {
    pub video_id: VideoId,
    pub bucket_id: BucketId,
    pub file_id: StoredFileId,
    pub name: String,
    pub code: String,
    pub is_default: bool,
}

#[instrument(skip(conn), level = "trace")]
pub fn get_subtitle(conn: &mut DbConn, subtitle_id: SubtitleId) -> Result<Subtitle> {
    use schema::Subtitle;
    let db_subtitle: DbSubtitle = Subtitle::table
        .find(subtitle_id.0)
        .first(conn)
        .wrap_err("error querying table Subtitle")?;
    db_subtitle.try_into()
}

#[instrument(skip(conn, create), level = "trace")]
pub fn insert_subtitle(conn: &mut DbConn, create: &CreateSubtitle) -> Result<SubtitleId> {
    use schema::Subtitle;
    let id = diesel::insert_into(Subtitle::table)
        .values((
            Subtitle::video_id.eq(create.video_id.0),
            Subtitle::bucket_id.eq(create.bucket_id.0),
            Subtitle::file_id.eq(create.file_id.0),
            Subtitle::name.eq(&create.name),
            Subtitle::code.eq(&create.code),
            Subtitle::is_default.eq(if create.is_default { 1 } else { 0 }),
            Subtitle::status.eq(SubtitleStatus::Pending.to_string()),
        ))
        .returning(Subtitle::subtitle_id)
        .get_result(conn)
        .wrap_err("error inserting into table Subtitle")?;
    Ok(SubtitleId(id))
}

/// Subtitles of a video that no transcode run has picked up yet.
#[instrument(skip(conn), level = "trace")]
pub fn get_pending_subtitles(conn: &mut DbConn, video_id: VideoId) -> Result<Vec<Subtitle>> {
    use schema::Subtitle;
    let db_subtitles: Vec<DbSubtitle> = Subtitle::table
        .filter(Subtitle::video_id.eq(video_id.0))
        .filter(Subtitle::status.eq(SubtitleStatus::Pending.to_string()))
        .order_by(Subtitle::subtitle_id.asc())
        .load(conn)
        .wrap_err("error querying table Subtitle")?;
    db_subtitles.into_iter().map(|s| s.try_into()).collect()
}

#[instrument(skip(conn), level = "trace")]
pub fn set_started(conn: &mut DbConn, subtitle_id: SubtitleId) -> Result<()> {
    use schema::Subtitle;
    diesel::update(Subtitle::table.find(subtitle_id.0))
        .set(Subtitle::status.eq(SubtitleStatus::Started.to_string()))
        .execute(conn)
        .wrap_err("error updating table Subtitle")?;
    Ok(())
}

#[instrument(skip(conn), level = "trace")]
pub fn mark_ready(
    conn: &mut DbConn,
    subtitle_id: SubtitleId,
    path: &str,
    target_duration: Option<i32>,
) -> Result<()> {
    use schema::Subtitle;
    diesel::update(Subtitle::table.find(subtitle_id.0))
        .set((
            Subtitle::status.eq(SubtitleStatus::Ready.to_string()),
            Subtitle::path.eq(path),
            Subtitle::target_duration.eq(target_duration),
        ))
        .execute(conn)
        .wrap_err("error updating table Subtitle")?;
    Ok(())
}

#[instrument(skip(conn), level = "trace")]
pub fn mark_error(conn: &mut DbConn, subtitle_id: SubtitleId) -> Result<()> {
    use schema::Subtitle;
    diesel::update(Subtitle::table.find(subtitle_id.0))
        .set(Subtitle::status.eq(SubtitleStatus::Error.to_string()))
        .execute(conn)
        .wrap_err("error updating table Subtitle")?;
    Ok(())
}

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use eyre::{Context, Result};
use tracing::instrument;

use crate::model::{
    repository::db_entity::DbRendition, util::datetime_to_db, ProfileId, Protocol, Rendition,
    RenditionId, RenditionStatus, VideoId,
};
use crate::util::truncate_chars;

use super::db::DbConn;
use super::schema;

pub const ERROR_MESSAGE_MAX_LEN: usize = 255;

#[derive(Debug, Clone)]
pub struct CreateRendition {
    pub video_id: VideoId,
    pub profile_id: ProfileId,
    pub name: String,
    pub protocol: Protocol,
    pub started_at: DateTime<Utc>,
}

#[instrument(skip(conn), level = "trace")]
pub fn get_rendition(conn: &mut DbConn, rendition_id: RenditionId) -> Result<Rendition> {
    use schema::Rendition;
    let db_rendition: DbRendition = Rendition::table
        .find(rendition_id.0)
        .first(conn)
        .wrap_err("error querying table Rendition")?;
    db_rendition.try_into()
}

#[instrument(skip(conn), level = "trace")]
pub fn get_renditions_for_video(conn: &mut DbConn, video_id: VideoId) -> Result<Vec<Rendition>> {
    use schema::Rendition;
    let db_renditions: Vec<DbRendition> = Rendition::table
        .filter(Rendition::video_id.eq(video_id.0))
        .order_by(Rendition::rendition_id.asc())
        .load(conn)
        .wrap_err("error querying table Rendition")?;
    db_renditions.into_iter().map(|r| r.try_into()).collect()
}

/// Inserts the rendition in `started` state with progress 0.
#[instrument(skip(conn, create), level = "trace")]
pub fn insert_rendition(conn: &mut DbConn, create: &CreateRendition) -> Result<RenditionId> {
    use schema::Rendition;
    let id = diesel::insert_into(Rendition::table)
        .values((
            Rendition::video_id.eq(create.video_id.0),
            Rendition::profile_id.eq(create.profile_id.0),
            Rendition::name.eq(&create.name),
            Rendition::protocol.eq(create.protocol.to_string()),
            Rendition::status.eq(RenditionStatus::Started.to_string()),
            Rendition::progress.eq(0),
            Rendition::started_at.eq(datetime_to_db(create.started_at)),
        ))
        .returning(Rendition::rendition_id)
        .get_result(conn)
        .wrap_err("error inserting into table Rendition")?;
    Ok(RenditionId(id))
}

/// Persists encoder progress. Progress never decreases: stale updates
/// from a lagging progress channel are dropped by the filter.
#[instrument(skip(conn), level = "trace")]
pub fn set_progress(conn: &mut DbConn, rendition_id: RenditionId, progress: i32) -> Result<()> {
    use schema::Rendition;
    diesel::update(
        Rendition::table
            .find(rendition_id.0)
            .filter(Rendition::progress.lt(progress))
            .filter(Rendition::status.ne(RenditionStatus::Error.to_string())),
    )
    .set(Rendition::progress.eq(progress.clamp(0, 100)))
    .execute(conn)
    .wrap_err("error updating table Rendition")?;
    Ok(())
}

/// Transition `started -> ended`, attaching ingested manifest metadata.
#[instrument(skip(conn, metadata), level = "trace")]
pub fn mark_ended(
    conn: &mut DbConn,
    rendition_id: RenditionId,
    metadata: Option<&str>,
    target_duration: Option<i32>,
    ended_at: DateTime<Utc>,
) -> Result<()> {
    use schema::Rendition;
    diesel::update(Rendition::table.find(rendition_id.0))
        .set((
            Rendition::status.eq(RenditionStatus::Ended.to_string()),
            Rendition::ended_at.eq(datetime_to_db(ended_at)),
            Rendition::metadata.eq(metadata),
            Rendition::target_duration.eq(target_duration),
        ))
        .execute(conn)
        .wrap_err("error updating table Rendition")?;
    Ok(())
}

/// Transition `ended -> uploading`, fixing progress at 100 and recording
/// the storage path the artifacts go under.
#[instrument(skip(conn), level = "trace")]
pub fn mark_uploading(conn: &mut DbConn, rendition_id: RenditionId, path: &str) -> Result<()> {
    use schema::Rendition;
    diesel::update(Rendition::table.find(rendition_id.0))
        .set((
            Rendition::status.eq(RenditionStatus::Uploading.to_string()),
            Rendition::progress.eq(100),
            Rendition::path.eq(path),
        ))
        .execute(conn)
        .wrap_err("error updating table Rendition")?;
    Ok(())
}

#[instrument(skip(conn), level = "trace")]
pub fn mark_ready(conn: &mut DbConn, rendition_id: RenditionId) -> Result<()> {
    use schema::Rendition;
    diesel::update(Rendition::table.find(rendition_id.0))
        .set(Rendition::status.eq(RenditionStatus::Ready.to_string()))
        .execute(conn)
        .wrap_err("error updating table Rendition")?;
    Ok(())
}

/// Terminal error transition. The message is truncated to 255 bytes.
#[instrument(skip(conn, message), level = "trace")]
pub fn mark_error(
    conn: &mut DbConn,
    rendition_id: RenditionId,
    code: i32,
    message: &str,
) -> Result<()> {
    use schema::Rendition;
    diesel::update(Rendition::table.find(rendition_id.0))
        .set((
            Rendition::status.eq(RenditionStatus::Error.to_string()),
            Rendition::error_code.eq(code),
            Rendition::error_message.eq(truncate_chars(message, ERROR_MESSAGE_MAX_LEN)),
        ))
        .execute(conn)
        .wrap_err("error updating table Rendition")?;
    Ok(())
}

#[instrument(skip(conn), level = "trace")]
pub fn delete_rendition(conn: &mut DbConn, rendition_id: RenditionId) -> Result<()> {
    use schema::Rendition;
    diesel::delete(Rendition::table.find(rendition_id.0))
        .execute(conn)
        .wrap_err("error deleting from table Rendition")?;
    Ok(())
}

/// Renditions stuck in a non-terminal state since before `cutoff`.
/// Only used by the opt-in reconciliation sweep.
#[instrument(skip(conn), level = "trace")]
pub fn get_stalled_renditions(conn: &mut DbConn, cutoff: DateTime<Utc>) -> Result<Vec<Rendition>> {
    use schema::Rendition;
    let db_renditions: Vec<DbRendition> = Rendition::table
        .filter(
            Rendition::status.ne_all(vec![
                RenditionStatus::Ready.to_string(),
                RenditionStatus::Error.to_string(),
            ]),
        )
        .filter(Rendition::started_at.lt(datetime_to_db(cutoff)))
        .order_by(Rendition::started_at.asc())
        .load(conn)
        .wrap_err("error querying table Rendition")?;
    db_renditions.into_iter().map(|r| r.try_into()).collect()
}

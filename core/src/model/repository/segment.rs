use diesel::prelude::*;
use eyre::{Context, Result};
use tracing::instrument;

use crate::model::{
    repository::db_entity::{DbRenditionSegment, DbSubtitleSegment},
    RenditionId, RenditionSegment, RenditionStatus, SubtitleId, SubtitleSegment,
};

use super::db::DbConn;
use super::schema;

#[derive(Debug, Clone)]
pub struct CreateRenditionSegment {
    pub rendition_id: RenditionId,
    pub stream_id: i32,
    pub file_name: String,
    pub path: String,
    pub duration: Option<f64>,
    pub is_init: bool,
}

#[derive(Debug, Clone)]
pub struct CreateSubtitleSegment {
    pub subtitle_id: SubtitleId,
    pub file_name: String,
    pub path: String,
    pub duration: f64,
}

#[instrument(skip(conn, segments), level = "trace")]
pub fn insert_rendition_segments(
    conn: &mut DbConn,
    segments: &[CreateRenditionSegment],
) -> Result<()> {
    use schema::RenditionSegment;
    let values: Vec<_> = segments
        .iter()
        .map(|segment| {
            (
                RenditionSegment::rendition_id.eq(segment.rendition_id.0),
                RenditionSegment::stream_id.eq(segment.stream_id),
                RenditionSegment::file_name.eq(&segment.file_name),
                RenditionSegment::path.eq(&segment.path),
                RenditionSegment::duration.eq(segment.duration),
                RenditionSegment::is_init.eq(if segment.is_init { 1 } else { 0 }),
            )
        })
        .collect();
    diesel::insert_into(RenditionSegment::table)
        .values(values)
        .execute(conn)
        .wrap_err("error inserting into table RenditionSegment")?;
    Ok(())
}

#[instrument(skip(conn), level = "trace")]
pub fn get_segments_for_rendition(
    conn: &mut DbConn,
    rendition_id: RenditionId,
) -> Result<Vec<RenditionSegment>> {
    use schema::RenditionSegment;
    let db_segments: Vec<DbRenditionSegment> = RenditionSegment::table
        .filter(RenditionSegment::rendition_id.eq(rendition_id.0))
        .order_by(RenditionSegment::segment_id.asc())
        .load(conn)
        .wrap_err("error querying table RenditionSegment")?;
    db_segments.into_iter().map(|s| s.try_into()).collect()
}

/// Segments of a rendition, but only once the rendition is `ready`.
/// Playback must never see segments of an unfinished rendition.
#[instrument(skip(conn), level = "trace")]
pub fn get_ready_segments_for_rendition(
    conn: &mut DbConn,
    rendition_id: RenditionId,
) -> Result<Vec<RenditionSegment>> {
    use schema::{Rendition, RenditionSegment};
    let db_segments: Vec<DbRenditionSegment> = RenditionSegment::table
        .inner_join(Rendition::table)
        .filter(RenditionSegment::rendition_id.eq(rendition_id.0))
        .filter(Rendition::status.eq(RenditionStatus::Ready.to_string()))
        .order_by(RenditionSegment::segment_id.asc())
        .select(DbRenditionSegment::as_select())
        .load(conn)
        .wrap_err("error querying table RenditionSegment")?;
    db_segments.into_iter().map(|s| s.try_into()).collect()
}

#[instrument(skip(conn, segments), level = "trace")]
pub fn insert_subtitle_segments(
    conn: &mut DbConn,
    segments: &[CreateSubtitleSegment],
) -> Result<()> {
    use schema::SubtitleSegment;
    let values: Vec<_> = segments
        .iter()
        .map(|segment| {
            (
                SubtitleSegment::subtitle_id.eq(segment.subtitle_id.0),
                SubtitleSegment::file_name.eq(&segment.file_name),
                SubtitleSegment::path.eq(&segment.path),
                SubtitleSegment::duration.eq(segment.duration),
            )
        })
        .collect();
    diesel::insert_into(SubtitleSegment::table)
        .values(values)
        .execute(conn)
        .wrap_err("error inserting into table SubtitleSegment")?;
    Ok(())
}

#[instrument(skip(conn), level = "trace")]
pub fn get_segments_for_subtitle(
    conn: &mut DbConn,
    subtitle_id: SubtitleId,
) -> Result<Vec<SubtitleSegment>> {
    use schema::SubtitleSegment;
    let db_segments: Vec<DbSubtitleSegment> = SubtitleSegment::table
        .filter(SubtitleSegment::subtitle_id.eq(subtitle_id.0))
        .order_by(SubtitleSegment::subtitle_segment_id.asc())
        .load(conn)
        .wrap_err("error querying table SubtitleSegment")?;
    db_segments.into_iter().map(|s| s.try_into()).collect()
}

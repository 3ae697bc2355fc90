use diesel::{Queryable, Selectable};

use crate::model::{
    RenditionId, RenditionSegment, RenditionSegmentId, SubtitleId, SubtitleSegment,
    SubtitleSegmentId,
};

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = super::super::schema::RenditionSegment)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DbRenditionSegment {
    pub segment_id: i64,
    pub rendition_id: i64,
    pub stream_id: i32,
    pub file_name: String,
    pub path: String,
    pub duration: Option<f64>,
    pub is_init: i32,
}

impl TryFrom<DbRenditionSegment> for RenditionSegment {
    type Error = eyre::Report;

    fn try_from(value: DbRenditionSegment) -> Result<Self, Self::Error> {
        Ok(RenditionSegment {
            id: RenditionSegmentId(value.segment_id),
            rendition_id: RenditionId(value.rendition_id),
            stream_id: value.stream_id,
            file_name: value.file_name,
            path: value.path,
            duration: value.duration,
            is_init: value.is_init != 0,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = super::super::schema::SubtitleSegment)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DbSubtitleSegment {
    pub subtitle_segment_id: i64,
    pub subtitle_id: i64,
    pub file_name: String,
    pub path: String,
    pub duration: f64,
}

impl TryFrom<DbSubtitleSegment> for SubtitleSegment {
    type Error = eyre::Report;

    fn try_from(value: DbSubtitleSegment) -> Result<Self, Self::Error> {
        Ok(SubtitleSegment {
            id: SubtitleSegmentId(value.subtitle_segment_id),
            subtitle_id: SubtitleId(value.subtitle_id),
            file_name: value.file_name,
            path: value.path,
            duration: value.duration,
        })
    }
}

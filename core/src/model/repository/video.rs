use diesel::prelude::*;
use eyre::{Context, Result};
use tracing::instrument;

use crate::model::{repository::db_entity::DbVideo, ProbedMedia, Video, VideoId};

use super::db::DbConn;
use super::schema;

#[instrument(skip(conn), level = "trace")]
pub fn get_video(conn: &mut DbConn, video_id: VideoId) -> Result<Video> {
    use schema::Video;
    let db_video: DbVideo = Video::table
        .find(video_id.0)
        .first(conn)
        .wrap_err("error querying table Video")?;
    db_video.try_into()
}

#[instrument(skip(conn, video), level = "trace")]
pub fn insert_video(conn: &mut DbConn, video: &Video) -> Result<VideoId> {
    use schema::Video;

    assert!(video.id.0 == 0);

    let id = diesel::insert_into(Video::table)
        .values((
            Video::bucket_id.eq(video.bucket_id.0),
            Video::file_id.eq(video.file_id.0),
            Video::size.eq(video.size),
        ))
        .returning(Video::video_id)
        .get_result(conn)
        .wrap_err("error inserting into table Video")?;
    Ok(VideoId(id))
}

/// Writes the prober's findings back onto the Video document.
#[instrument(skip(conn, probed), level = "trace")]
pub fn set_probed_media(conn: &mut DbConn, video_id: VideoId, probed: &ProbedMedia) -> Result<()> {
    use schema::Video;
    diesel::update(Video::table.find(video_id.0))
        .set((
            Video::duration.eq(probed.duration),
            Video::width.eq(probed.width),
            Video::height.eq(probed.height),
            Video::video_codec_name.eq(&probed.video_codec_name),
            Video::video_framerate.eq(&probed.video_framerate),
            Video::video_bitrate.eq(probed.video_bitrate),
            Video::audio_codec_name.eq(&probed.audio_codec_name),
            Video::audio_bitrate.eq(probed.audio_bitrate),
            Video::audio_sample_rate.eq(probed.audio_sample_rate),
        ))
        .execute(conn)
        .wrap_err("error updating table Video")?;
    Ok(())
}

/// Renditions, subtitles and their segments cascade.
#[instrument(skip(conn), level = "trace")]
pub fn delete_video(conn: &mut DbConn, video_id: VideoId) -> Result<()> {
    use schema::Video;
    diesel::delete(Video::table.find(video_id.0))
        .execute(conn)
        .wrap_err("error deleting from table Video")?;
    Ok(())
}

use chrono::SubsecRound;

use super::db;
use crate::model::{repository, *};

pub mod profile;
pub mod rendition;
pub mod segment;
pub mod subtitle;

pub fn utc_now_millis_zero() -> chrono::DateTime<chrono::Utc> {
    chrono::Utc::now().trunc_subsecs(3)
}

/// In-memory connection with two StoredFile rows (ids 1 and 2) that
/// test videos and subtitles reference.
pub fn open_conn_with_stored_files() -> db::DbConn {
    let mut conn = db::open_in_memory_and_migrate();
    for (path, mime_type) in [("vids/source.mp4", "video/mp4"), ("subs/eng.vtt", "text/vtt")] {
        repository::stored_file::insert_stored_file(
            &mut conn,
            &StoredFile {
                id: StoredFileId(0),
                bucket_id: BucketId(1),
                path: path.to_owned(),
                mime_type: mime_type.to_owned(),
                size: 12_345_678,
                compression: Compression::None,
                cipher: None,
            },
        )
        .expect("error inserting test StoredFile");
    }
    conn
}

pub fn test_video() -> Video {
    Video {
        id: VideoId(0),
        bucket_id: BucketId(1),
        file_id: StoredFileId(1),
        size: 12_345_678,
        duration: None,
        width: None,
        height: None,
        video_codec_name: None,
        video_framerate: None,
        video_bitrate: None,
        audio_codec_name: None,
        audio_bitrate: None,
        audio_sample_rate: None,
    }
}

pub fn test_profile(protocol: Protocol) -> Profile {
    Profile {
        id: ProfileId(0),
        name: "sd".to_owned(),
        video_bitrate: 2538,
        audio_bitrate: 128,
        width: 1024,
        height: 576,
        protocol,
    }
}

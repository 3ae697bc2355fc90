use claims::assert_ok;
use pretty_assertions::assert_eq;

use super::*;
use crate::model::repository::{self, subtitle::CreateSubtitle};

fn insert_test_subtitle(conn: &mut db::DbConn, video_id: VideoId, code: &str) -> SubtitleId {
    assert_ok!(repository::subtitle::insert_subtitle(
        conn,
        &CreateSubtitle {
            video_id,
            bucket_id: BucketId(1),
            file_id: StoredFileId(2),
            name: "English".to_owned(),
            code: code.to_owned(),
            is_default: false,
        }
    ))
}

#[test]
fn pending_query_returns_only_untouched_subtitles() {
    let mut conn = open_conn_with_stored_files();
    let video_id = assert_ok!(repository::video::insert_video(&mut conn, &test_video()));
    let pending_id = insert_test_subtitle(&mut conn, video_id, "eng");
    let started_id = insert_test_subtitle(&mut conn, video_id, "ger");
    assert_ok!(repository::subtitle::set_started(&mut conn, started_id));

    let pending = assert_ok!(repository::subtitle::get_pending_subtitles(
        &mut conn, video_id
    ));
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, pending_id);
    assert_eq!(pending[0].status, SubtitleStatus::Pending);
}

#[test]
fn ready_records_path_and_target_duration() {
    let mut conn = open_conn_with_stored_files();
    let video_id = assert_ok!(repository::video::insert_video(&mut conn, &test_video()));
    let subtitle_id = insert_test_subtitle(&mut conn, video_id, "eng");
    assert_ok!(repository::subtitle::set_started(&mut conn, subtitle_id));
    assert_ok!(repository::subtitle::mark_ready(
        &mut conn,
        subtitle_id,
        "1/",
        Some(10)
    ));
    let subtitle = assert_ok!(repository::subtitle::get_subtitle(&mut conn, subtitle_id));
    assert_eq!(subtitle.status, SubtitleStatus::Ready);
    assert_eq!(subtitle.path.as_deref(), Some("1/"));
    assert_eq!(subtitle.target_duration, Some(10));
}

#[test]
fn errored_subtitle_is_not_pending() {
    let mut conn = open_conn_with_stored_files();
    let video_id = assert_ok!(repository::video::insert_video(&mut conn, &test_video()));
    let subtitle_id = insert_test_subtitle(&mut conn, video_id, "eng");
    assert_ok!(repository::subtitle::mark_error(&mut conn, subtitle_id));
    let pending = assert_ok!(repository::subtitle::get_pending_subtitles(
        &mut conn, video_id
    ));
    assert!(pending.is_empty());
    let subtitle = assert_ok!(repository::subtitle::get_subtitle(&mut conn, subtitle_id));
    assert_eq!(subtitle.status, SubtitleStatus::Error);
}

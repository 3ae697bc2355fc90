use claims::assert_ok;
use pretty_assertions::assert_eq;

use super::*;
use crate::model::repository::{
    self,
    rendition::CreateRendition,
    segment::{CreateRenditionSegment, CreateSubtitleSegment},
};

fn insert_started_rendition(conn: &mut db::DbConn, protocol: Protocol) -> RenditionId {
    let video_id = assert_ok!(repository::video::insert_video(conn, &test_video()));
    let profile = test_profile(protocol);
    let profile_id = assert_ok!(repository::profile::insert_profile(conn, &profile));
    assert_ok!(repository::rendition::insert_rendition(
        conn,
        &CreateRendition {
            video_id,
            profile_id,
            name: profile.rendition_name(),
            protocol,
            started_at: utc_now_millis_zero(),
        }
    ))
}

#[test]
fn bulk_insert_preserves_order() {
    let mut conn = open_conn_with_stored_files();
    let rendition_id = insert_started_rendition(&mut conn, Protocol::Dash);
    let path = "1/1024X576@2666-1/".to_owned();
    let creates: Vec<_> = [
        ("init-stream0.m4s", true, None),
        ("chunk-stream0-00001.m4s", false, None),
        ("chunk-stream0-00002.m4s", false, None),
    ]
    .into_iter()
    .map(|(file_name, is_init, duration)| CreateRenditionSegment {
        rendition_id,
        stream_id: 0,
        file_name: file_name.to_owned(),
        path: path.clone(),
        duration,
        is_init,
    })
    .collect();
    assert_ok!(repository::segment::insert_rendition_segments(
        &mut conn, &creates
    ));

    let segments = assert_ok!(repository::segment::get_segments_for_rendition(
        &mut conn,
        rendition_id
    ));
    let file_names: Vec<_> = segments.iter().map(|s| s.file_name.as_str()).collect();
    assert_eq!(
        file_names,
        vec![
            "init-stream0.m4s",
            "chunk-stream0-00001.m4s",
            "chunk-stream0-00002.m4s"
        ]
    );
    assert!(segments[0].is_init);
    assert!(!segments[1].is_init);
}

#[test]
fn ready_query_hides_segments_of_unfinished_renditions() {
    let mut conn = open_conn_with_stored_files();
    let rendition_id = insert_started_rendition(&mut conn, Protocol::Hls);
    assert_ok!(repository::segment::insert_rendition_segments(
        &mut conn,
        &[CreateRenditionSegment {
            rendition_id,
            stream_id: 0,
            file_name: "1024X576@2666_0.ts".to_owned(),
            path: "1/1024X576@2666-1/".to_owned(),
            duration: Some(10.0),
            is_init: false,
        }]
    ));

    let visible = assert_ok!(repository::segment::get_ready_segments_for_rendition(
        &mut conn,
        rendition_id
    ));
    assert!(visible.is_empty());

    assert_ok!(repository::rendition::mark_ended(
        &mut conn,
        rendition_id,
        None,
        Some(10),
        utc_now_millis_zero()
    ));
    assert_ok!(repository::rendition::mark_uploading(
        &mut conn,
        rendition_id,
        "1/1024X576@2666-1/"
    ));
    assert_ok!(repository::rendition::mark_ready(&mut conn, rendition_id));

    let visible = assert_ok!(repository::segment::get_ready_segments_for_rendition(
        &mut conn,
        rendition_id
    ));
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].file_name, "1024X576@2666_0.ts");
}

#[test]
fn insert_retrieve_subtitle_segments() {
    let mut conn = open_conn_with_stored_files();
    let video_id = assert_ok!(repository::video::insert_video(&mut conn, &test_video()));
    let subtitle_id = assert_ok!(repository::subtitle::insert_subtitle(
        &mut conn,
        &repository::subtitle::CreateSubtitle {
            video_id,
            bucket_id: BucketId(1),
            file_id: StoredFileId(2),
            name: "English".to_owned(),
            code: "eng".to_owned(),
            is_default: true,
        }
    ));
    assert_ok!(repository::segment::insert_subtitle_segments(
        &mut conn,
        &[
            CreateSubtitleSegment {
                subtitle_id,
                file_name: "1_subtitles_eng_0.vtt".to_owned(),
                path: "1/".to_owned(),
                duration: 10.0,
            },
            CreateSubtitleSegment {
                subtitle_id,
                file_name: "1_subtitles_eng_1.vtt".to_owned(),
                path: "1/".to_owned(),
                duration: 7.5,
            },
        ]
    ));
    let segments = assert_ok!(repository::segment::get_segments_for_subtitle(
        &mut conn,
        subtitle_id
    ));
    assert_eq!(segments.len(), 2);
    assert_eq!(segments[1].duration, 7.5);
}

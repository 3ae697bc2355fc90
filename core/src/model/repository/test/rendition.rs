use chrono::Duration;
use claims::assert_ok;
use pretty_assertions::assert_eq;

use super::*;
use crate::model::repository::{self, rendition::CreateRendition};

fn insert_started_rendition(conn: &mut db::DbConn) -> RenditionId {
    let video_id = assert_ok!(repository::video::insert_video(conn, &test_video()));
    let profile = test_profile(Protocol::Hls);
    let profile_id = assert_ok!(repository::profile::insert_profile(conn, &profile));
    assert_ok!(repository::rendition::insert_rendition(
        conn,
        &CreateRendition {
            video_id,
            profile_id,
            name: profile.rendition_name(),
            protocol: profile.protocol,
            started_at: utc_now_millis_zero(),
        }
    ))
}

#[test]
fn insert_starts_with_zero_progress() {
    let mut conn = open_conn_with_stored_files();
    let rendition_id = insert_started_rendition(&mut conn);
    let rendition = assert_ok!(repository::rendition::get_rendition(
        &mut conn,
        rendition_id
    ));
    assert_eq!(rendition.status, RenditionStatus::Started);
    assert_eq!(rendition.progress, 0);
    assert_eq!(rendition.name, "1024X576@2666");
    assert_eq!(rendition.ended_at, None);
}

#[test]
fn progress_never_decreases() {
    let mut conn = open_conn_with_stored_files();
    let rendition_id = insert_started_rendition(&mut conn);
    assert_ok!(repository::rendition::set_progress(&mut conn, rendition_id, 42));
    // stale update from a lagging channel must be dropped
    assert_ok!(repository::rendition::set_progress(&mut conn, rendition_id, 12));
    let rendition = assert_ok!(repository::rendition::get_rendition(
        &mut conn,
        rendition_id
    ));
    assert_eq!(rendition.progress, 42);

    assert_ok!(repository::rendition::set_progress(&mut conn, rendition_id, 90));
    let rendition = assert_ok!(repository::rendition::get_rendition(
        &mut conn,
        rendition_id
    ));
    assert_eq!(rendition.progress, 90);
}

#[test]
fn full_lifecycle_to_ready() {
    let mut conn = open_conn_with_stored_files();
    let rendition_id = insert_started_rendition(&mut conn);
    let ended_at = utc_now_millis_zero();

    assert_ok!(repository::rendition::mark_ended(
        &mut conn,
        rendition_id,
        Some(r#"[{"id":"0","type":"video","path":"1024X576@2666_0.m3u8"}]"#),
        Some(10),
        ended_at,
    ));
    let rendition = assert_ok!(repository::rendition::get_rendition(
        &mut conn,
        rendition_id
    ));
    assert_eq!(rendition.status, RenditionStatus::Ended);
    assert_eq!(rendition.ended_at, Some(ended_at));
    assert_eq!(rendition.target_duration, Some(10));

    assert_ok!(repository::rendition::mark_uploading(
        &mut conn,
        rendition_id,
        "1/1024X576@2666-1/"
    ));
    let rendition = assert_ok!(repository::rendition::get_rendition(
        &mut conn,
        rendition_id
    ));
    assert_eq!(rendition.status, RenditionStatus::Uploading);
    assert_eq!(rendition.progress, 100);
    assert_eq!(rendition.path.as_deref(), Some("1/1024X576@2666-1/"));

    assert_ok!(repository::rendition::mark_ready(&mut conn, rendition_id));
    let rendition = assert_ok!(repository::rendition::get_rendition(
        &mut conn,
        rendition_id
    ));
    assert_eq!(rendition.status, RenditionStatus::Ready);
}

#[test]
fn mark_error_truncates_long_messages() {
    let mut conn = open_conn_with_stored_files();
    let rendition_id = insert_started_rendition(&mut conn);
    let long_message = "x".repeat(1000);
    assert_ok!(repository::rendition::mark_error(
        &mut conn,
        rendition_id,
        1,
        &long_message
    ));
    let rendition = assert_ok!(repository::rendition::get_rendition(
        &mut conn,
        rendition_id
    ));
    assert_eq!(rendition.status, RenditionStatus::Error);
    assert_eq!(rendition.error_code, Some(1));
    assert_eq!(rendition.error_message.as_ref().map(|m| m.len()), Some(255));
}

#[test]
fn stalled_query_skips_terminal_and_fresh_renditions() {
    let mut conn = open_conn_with_stored_files();
    let stalled_id = insert_started_rendition(&mut conn);
    let errored_id = insert_started_rendition(&mut conn);
    assert_ok!(repository::rendition::mark_error(
        &mut conn,
        errored_id,
        1,
        "encoder exited with status 1"
    ));
    // only renditions started before the cutoff count as stalled, so a
    // cutoff in the future catches stalled_id but terminal errored_id never
    let cutoff = utc_now_millis_zero() + Duration::minutes(30);
    let stalled = assert_ok!(repository::rendition::get_stalled_renditions(
        &mut conn, cutoff
    ));
    let stalled_ids: Vec<_> = stalled.iter().map(|r| r.id).collect();
    assert!(stalled_ids.contains(&stalled_id));
    assert!(!stalled_ids.contains(&errored_id));

    // everything was started just now, so a cutoff in the past matches nothing
    let cutoff_past = utc_now_millis_zero() - Duration::minutes(30);
    let stalled = assert_ok!(repository::rendition::get_stalled_renditions(
        &mut conn,
        cutoff_past
    ));
    assert!(stalled.is_empty());
}

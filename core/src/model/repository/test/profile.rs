use claims::{assert_err, assert_ok};
use pretty_assertions::assert_eq;

use super::*;
use crate::model::repository;

#[test]
fn insert_retrieve_profile() {
    let mut conn = open_conn_with_stored_files();
    let profile = test_profile(Protocol::Hls);
    let profile_id = assert_ok!(repository::profile::insert_profile(&mut conn, &profile));
    let retrieved = assert_ok!(repository::profile::get_profile(&mut conn, profile_id));
    let expected = Profile {
        id: profile_id,
        ..profile
    };
    assert_eq!(retrieved, expected);
}

#[test]
fn list_returns_profiles_in_insertion_order() {
    let mut conn = open_conn_with_stored_files();
    let first = assert_ok!(repository::profile::insert_profile(
        &mut conn,
        &test_profile(Protocol::Hls)
    ));
    let second = assert_ok!(repository::profile::insert_profile(
        &mut conn,
        &Profile {
            name: "hd".to_owned(),
            width: 1920,
            height: 1080,
            ..test_profile(Protocol::Dash)
        }
    ));
    let profiles = assert_ok!(repository::profile::list_profiles(&mut conn));
    let ids: Vec<_> = profiles.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![first, second]);
    assert_eq!(profiles[1].name, "hd");
    assert_eq!(profiles[1].protocol, Protocol::Dash);
}

#[test]
fn update_replaces_all_fields() {
    let mut conn = open_conn_with_stored_files();
    let profile_id = assert_ok!(repository::profile::insert_profile(
        &mut conn,
        &test_profile(Protocol::Hls)
    ));
    let updated = Profile {
        id: profile_id,
        name: "sd-dash".to_owned(),
        video_bitrate: 1800,
        audio_bitrate: 96,
        width: 854,
        height: 480,
        protocol: Protocol::Dash,
    };
    assert_ok!(repository::profile::update_profile(&mut conn, &updated));
    let retrieved = assert_ok!(repository::profile::get_profile(&mut conn, profile_id));
    assert_eq!(retrieved, updated);
}

#[test]
fn deleted_profile_is_gone() {
    let mut conn = open_conn_with_stored_files();
    let profile_id = assert_ok!(repository::profile::insert_profile(
        &mut conn,
        &test_profile(Protocol::Hls)
    ));
    assert_ok!(repository::profile::delete_profile(&mut conn, profile_id));
    assert_err!(repository::profile::get_profile(&mut conn, profile_id));
    assert!(assert_ok!(repository::profile::list_profiles(&mut conn)).is_empty());
}

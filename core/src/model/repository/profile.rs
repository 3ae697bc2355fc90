use diesel::prelude::*;
use eyre::{Context, Result};
use tracing::instrument;

use crate::model::{repository::db_entity::DbProfile, Profile, ProfileId};

use super::db::DbConn;
use super::schema;

#[instrument(skip(conn), level = "trace")]
pub fn get_profile(conn: &mut DbConn, profile_id: ProfileId) -> Result<Profile> {
    use schema::Profile;
    let db_profile: DbProfile = Profile::table
        .find(profile_id.0)
        .first(conn)
        .wrap_err("error querying table Profile")?;
    db_profile.try_into()
}

#[instrument(skip(conn), level = "trace")]
pub fn list_profiles(conn: &mut DbConn) -> Result<Vec<Profile>> {
    use schema::Profile;
    let db_profiles: Vec<DbProfile> = Profile::table
        .order_by(Profile::profile_id.asc())
        .load(conn)
        .wrap_err("error querying table Profile")?;
    db_profiles.into_iter().map(|p| p.try_into()).collect()
}

#[instrument(skip(conn, profile), level = "trace")]
pub fn insert_profile(conn: &mut DbConn, profile: &Profile) -> Result<ProfileId> {
    use schema::Profile;

    assert!(profile.id.0 == 0);

    let id = diesel::insert_into(Profile::table)
        .values((
            Profile::name.eq(&profile.name),
            Profile::video_bitrate.eq(profile.video_bitrate),
            Profile::audio_bitrate.eq(profile.audio_bitrate),
            Profile::width.eq(profile.width),
            Profile::height.eq(profile.height),
            Profile::protocol.eq(profile.protocol.to_string()),
        ))
        .returning(Profile::profile_id)
        .get_result(conn)
        .wrap_err("error inserting into table Profile")?;
    Ok(ProfileId(id))
}

#[instrument(skip(conn, profile), level = "trace")]
pub fn update_profile(conn: &mut DbConn, profile: &Profile) -> Result<()> {
    use schema::Profile;
    diesel::update(Profile::table.find(profile.id.0))
        .set((
            Profile::name.eq(&profile.name),
            Profile::video_bitrate.eq(profile.video_bitrate),
            Profile::audio_bitrate.eq(profile.audio_bitrate),
            Profile::width.eq(profile.width),
            Profile::height.eq(profile.height),
            Profile::protocol.eq(profile.protocol.to_string()),
        ))
        .execute(conn)
        .wrap_err("error updating table Profile")?;
    Ok(())
}

#[instrument(skip(conn), level = "trace")]
pub fn delete_profile(conn: &mut DbConn, profile_id: ProfileId) -> Result<()> {
    use schema::Profile;
    diesel::delete(Profile::table.find(profile_id.0))
        .execute(conn)
        .wrap_err("error deleting from table Profile")?;
    Ok(())
}

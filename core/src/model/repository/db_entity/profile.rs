use std::str::FromStr;

use diesel::{Queryable, Selectable};
use eyre::Context;

use crate::model::{Profile, ProfileId, Protocol};

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = super::super::schema::Profile)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DbProfile {
    pub profile_id: i64,
    pub name: String,
    pub video_bitrate: i64,
    pub audio_bitrate: i64,
    pub width: i32,
    pub height: i32,
    pub protocol: String,
}

impl TryFrom<DbProfile> for Profile {
    type Error = eyre::Report;

    fn try_from(value: DbProfile) -> Result<Self, Self::Error> {
        Ok(Profile {
            id: ProfileId(value.profile_id),
            name: value.name,
            video_bitrate: value.video_bitrate,
            audio_bitrate: value.audio_bitrate,
            width: value.width,
            height: value.height,
            protocol: Protocol::from_str(&value.protocol)
                .wrap_err("invalid protocol in Profile row")?,
        })
    }
}

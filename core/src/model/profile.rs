use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::ProfileId;

/// Output protocol of a rendition.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Hls,
    Dash,
}

/// A named encoding target. Immutable once a rendition references it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    pub name: String,
    /// kbit/s
    pub video_bitrate: i64,
    /// kbit/s
    pub audio_bitrate: i64,
    pub width: i32,
    pub height: i32,
    pub protocol: Protocol,
}

impl Profile {
    /// Derived rendition name, `{width}X{height}@{videoBitrate+audioBitrate}`.
    pub fn rendition_name(&self) -> String {
        format!(
            "{}X{}@{}",
            self.width,
            self.height,
            self.video_bitrate + self.audio_bitrate
        )
    }
}

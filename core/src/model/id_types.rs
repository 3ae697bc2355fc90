use serde::{Deserialize, Serialize};
use std::fmt::Display;

macro_rules! impl_id {
    ($ident:ident) => {
        #[derive(
            Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Copy, Hash, Serialize, Deserialize,
        )]
        pub struct $ident(pub i64);

        impl From<i64> for $ident {
            fn from(value: i64) -> Self {
                $ident(value)
            }
        }

        impl Display for $ident {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_fmt(format_args!(concat!(stringify!($ident), "({})"), self.0))
            }
        }
    };
}

impl_id!(VideoId);
impl_id!(ProfileId);
impl_id!(RenditionId);
impl_id!(RenditionSegmentId);
impl_id!(SubtitleId);
impl_id!(SubtitleSegmentId);
impl_id!(BucketId);
impl_id!(StoredFileId);
impl_id!(TranscodeJobId);

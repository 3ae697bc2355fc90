use chrono::{DateTime, Utc};
use strum::{Display, EnumString};

use super::{ProfileId, Protocol, RenditionId, VideoId};

/// Lifecycle of a rendition. Transitions are monotonic:
/// `started -> ended -> uploading -> ready`, with `error` reachable
/// from any non-terminal state. `ready` and `error` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum RenditionStatus {
    Started,
    Ended,
    Uploading,
    Ready,
    Error,
}

impl RenditionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RenditionStatus::Ready | RenditionStatus::Error)
    }

    /// Whether moving from `self` to `next` keeps the state machine monotonic.
    pub fn can_transition_to(&self, next: RenditionStatus) -> bool {
        use RenditionStatus::*;
        match (self, next) {
            (_, Error) => !self.is_terminal(),
            (Started, Ended) | (Ended, Uploading) | (Uploading, Ready) => true,
            _ => false,
        }
    }
}

/// One encoding job's output for a (video, profile) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendition {
    pub id: RenditionId,
    pub video_id: VideoId,
    pub profile_id: ProfileId,
    /// derived as `{width}X{height}@{totalBitrate}`
    pub name: String,
    pub protocol: Protocol,
    pub status: RenditionStatus,
    /// 0..=100, non-decreasing while status is not `error`
    pub progress: i32,
    pub started_at: DateTime<Utc>,
    /// set on entering `ended`, kept through `uploading` and `ready`
    pub ended_at: Option<DateTime<Utc>>,
    /// storage path the output artifacts were uploaded under
    pub path: Option<String>,
    /// serialized parsed master-playlist streams (HLS) or the
    /// non-segment MPD skeleton (DASH)
    pub metadata: Option<String>,
    pub target_duration: Option<i32>,
    pub error_code: Option<i32>,
    /// truncated to 255 bytes before it is stored
    pub error_message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::RenditionStatus::*;

    #[test]
    fn transitions_are_monotonic() {
        assert!(Started.can_transition_to(Ended));
        assert!(Ended.can_transition_to(Uploading));
        assert!(Uploading.can_transition_to(Ready));
        assert!(!Ended.can_transition_to(Started));
        assert!(!Ready.can_transition_to(Uploading));
        assert!(!Started.can_transition_to(Ready));
    }

    #[test]
    fn error_is_reachable_from_non_terminal_states_only() {
        assert!(Started.can_transition_to(Error));
        assert!(Ended.can_transition_to(Error));
        assert!(Uploading.can_transition_to(Error));
        assert!(!Ready.can_transition_to(Error));
        assert!(!Error.can_transition_to(Error));
    }

    #[test]
    fn only_ready_and_error_are_terminal() {
        assert!(Ready.is_terminal());
        assert!(Error.is_terminal());
        assert!(!Started.is_terminal());
        assert!(!Ended.is_terminal());
        assert!(!Uploading.is_terminal());
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::{Profile, TranscodeJobId, Video};

/// What goes on the durable work queue: project, user, video and profile
/// as serialized documents. One payload per trigger call, no dedup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPayload {
    pub project_id: String,
    pub user_id: String,
    pub video: Video,
    pub profile: Profile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum QueuedJobStatus {
    Queued,
    Running,
    Done,
    Failed,
}

/// A row on the transcode work queue.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedJob {
    pub id: TranscodeJobId,
    pub payload: JobPayload,
    pub status: QueuedJobStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

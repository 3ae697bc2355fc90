use std::str::FromStr;

use diesel::{Queryable, Selectable};
use eyre::Context;

use crate::model::{
    util::datetime_from_db, JobPayload, QueuedJob, QueuedJobStatus, TranscodeJobId,
};

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = super::super::schema::TranscodeJob)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DbTranscodeJob {
    pub job_id: i64,
    pub payload: String,
    pub status: String,
    pub created_at: i64,
    pub started_at: Option<i64>,
    pub finished_at: Option<i64>,
    pub error: Option<String>,
}

impl TryFrom<DbTranscodeJob> for QueuedJob {
    type Error = eyre::Report;

    fn try_from(value: DbTranscodeJob) -> Result<Self, Self::Error> {
        let payload: JobPayload = serde_json::from_str(&value.payload)
            .wrap_err("could not deserialize TranscodeJob payload")?;
        Ok(QueuedJob {
            id: TranscodeJobId(value.job_id),
            payload,
            status: QueuedJobStatus::from_str(&value.status)
                .wrap_err("invalid status in TranscodeJob row")?,
            created_at: datetime_from_db(value.created_at)?,
            started_at: value.started_at.map(datetime_from_db).transpose()?,
            finished_at: value.finished_at.map(datetime_from_db).transpose()?,
            error: value.error,
        })
    }
}

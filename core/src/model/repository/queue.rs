use chrono::{DateTime, Utc};
use diesel::prelude::*;
use eyre::{Context, Result};
use tracing::instrument;

use crate::model::{
    repository::db_entity::DbTranscodeJob, util::datetime_to_db, JobPayload, QueuedJob,
    QueuedJobStatus, TranscodeJobId,
};
use crate::util::truncate_chars;

use super::db::DbConn;
use super::rendition::ERROR_MESSAGE_MAX_LEN;
use super::schema;

#[instrument(skip(conn, payload), level = "trace")]
pub fn enqueue_job(
    conn: &mut DbConn,
    payload: &JobPayload,
    created_at: DateTime<Utc>,
) -> Result<TranscodeJobId> {
    use schema::TranscodeJob;
    let payload_json = serde_json::to_string(payload).wrap_err("error serializing job payload")?;
    let id = diesel::insert_into(TranscodeJob::table)
        .values((
            TranscodeJob::payload.eq(payload_json),
            TranscodeJob::status.eq(QueuedJobStatus::Queued.to_string()),
            TranscodeJob::created_at.eq(datetime_to_db(created_at)),
        ))
        .returning(TranscodeJob::job_id)
        .get_result(conn)
        .wrap_err("error inserting into table TranscodeJob")?;
    Ok(TranscodeJobId(id))
}

/// Atomically claims the oldest queued job by flipping it to `running`.
/// Returns None when the queue is empty.
#[instrument(skip(conn), level = "trace")]
pub fn claim_next_job(conn: &mut DbConn, now: DateTime<Utc>) -> Result<Option<QueuedJob>> {
    use schema::TranscodeJob;
    conn.transaction(|conn| {
        let next: Option<DbTranscodeJob> = TranscodeJob::table
            .filter(TranscodeJob::status.eq(QueuedJobStatus::Queued.to_string()))
            .order_by(TranscodeJob::created_at.asc())
            .first(conn)
            .optional()
            .wrap_err("error querying table TranscodeJob")?;
        let Some(next) = next else {
            return Ok(None);
        };
        diesel::update(TranscodeJob::table.find(next.job_id))
            .set((
                TranscodeJob::status.eq(QueuedJobStatus::Running.to_string()),
                TranscodeJob::started_at.eq(datetime_to_db(now)),
            ))
            .execute(conn)
            .wrap_err("error updating table TranscodeJob")?;
        let job: QueuedJob = next.try_into()?;
        Ok(Some(QueuedJob {
            status: QueuedJobStatus::Running,
            started_at: Some(now),
            ..job
        }))
    })
}

#[instrument(skip(conn), level = "trace")]
pub fn mark_job_done(
    conn: &mut DbConn,
    job_id: TranscodeJobId,
    finished_at: DateTime<Utc>,
) -> Result<()> {
    use schema::TranscodeJob;
    diesel::update(TranscodeJob::table.find(job_id.0))
        .set((
            TranscodeJob::status.eq(QueuedJobStatus::Done.to_string()),
            TranscodeJob::finished_at.eq(datetime_to_db(finished_at)),
        ))
        .execute(conn)
        .wrap_err("error updating table TranscodeJob")?;
    Ok(())
}

#[instrument(skip(conn, error), level = "trace")]
pub fn mark_job_failed(
    conn: &mut DbConn,
    job_id: TranscodeJobId,
    error: &str,
    finished_at: DateTime<Utc>,
) -> Result<()> {
    use schema::TranscodeJob;
    diesel::update(TranscodeJob::table.find(job_id.0))
        .set((
            TranscodeJob::status.eq(QueuedJobStatus::Failed.to_string()),
            TranscodeJob::finished_at.eq(datetime_to_db(finished_at)),
            TranscodeJob::error.eq(truncate_chars(error, ERROR_MESSAGE_MAX_LEN)),
        ))
        .execute(conn)
        .wrap_err("error updating table TranscodeJob")?;
    Ok(())
}

/// Fails every `running` job claimed before `cutoff`. Used by the
/// reconciliation sweep, a job this old has lost its worker.
#[instrument(skip(conn), level = "trace")]
pub fn fail_stale_running_jobs(conn: &mut DbConn, cutoff: DateTime<Utc>) -> Result<usize> {
    use schema::TranscodeJob;
    let updated = diesel::update(
        TranscodeJob::table
            .filter(TranscodeJob::status.eq(QueuedJobStatus::Running.to_string()))
            .filter(TranscodeJob::started_at.lt(datetime_to_db(cutoff))),
    )
    .set((
        TranscodeJob::status.eq(QueuedJobStatus::Failed.to_string()),
        TranscodeJob::finished_at.eq(datetime_to_db(Utc::now())),
        TranscodeJob::error.eq("job stalled, failed by reconciliation"),
    ))
    .execute(conn)
    .wrap_err("error updating table TranscodeJob")?;
    Ok(updated)
}

#[instrument(skip(conn), level = "trace")]
pub fn count_queued_jobs(conn: &mut DbConn) -> Result<i64> {
    use schema::TranscodeJob;
    TranscodeJob::table
        .filter(TranscodeJob::status.eq(QueuedJobStatus::Queued.to_string()))
        .count()
        .get_result(conn)
        .wrap_err("error querying table TranscodeJob")
}

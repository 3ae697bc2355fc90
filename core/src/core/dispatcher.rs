use std::time::Duration;

use chrono::Utc;
use eyre::Result;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, instrument, warn};

use crate::{
    actor::{
        transcoding::{
            start_transcoding_actor, MsgFromTranscoding, TranscodingActorHandle,
            TranscodingTaskResult,
        },
        TaskError,
    },
    config::Config,
    interact,
    job::transcode_job::GENERIC_ERROR_CODE,
    model::{
        repository::{self, db::DbPool},
        JobPayload, Profile, TranscodeJobId, Video,
    },
    processing::video::ffmpeg::TranscodeError,
};

/// How often the queue is polled when nothing else wakes the dispatcher.
const POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug)]
pub enum DispatcherMessage {
    /// Poke the dispatcher to look at the queue right away.
    Poll,
    Shutdown,
}

#[derive(Debug, Clone)]
pub struct DispatcherHandle {
    pub send: mpsc::Sender<DispatcherMessage>,
}

impl DispatcherHandle {
    pub fn new(db_pool: DbPool, config: Config) -> (Self, oneshot::Receiver<()>) {
        let (from_transcoding_send, from_transcoding_recv) = mpsc::unbounded_channel();
        let (did_shutdown_send, did_shutdown_recv) = oneshot::channel();
        let transcoding_actor = start_transcoding_actor(
            db_pool.clone(),
            config.clone(),
            did_shutdown_send,
            from_transcoding_send,
        );
        let (send, recv) = mpsc::channel(1000);
        let dispatcher = Dispatcher {
            db_pool,
            recv,
            transcoding_actor,
            transcoding_recv: from_transcoding_recv,
            running_job: None,
        };
        tokio::spawn(run_dispatcher(dispatcher));
        (Self { send }, did_shutdown_recv)
    }
}

/// Puts a transcoding request on the durable queue. Every call enqueues
/// a job, there is no dedup against jobs already queued for the same
/// video and profile.
#[instrument(skip(pool, video, profile), fields(video_id = video.id.0, profile_id = profile.id.0))]
pub async fn trigger(
    pool: &DbPool,
    project_id: String,
    user_id: String,
    video: Video,
    profile: Profile,
) -> Result<TranscodeJobId> {
    let payload = JobPayload {
        project_id,
        user_id,
        video,
        profile,
    };
    let conn = pool.get().await?;
    let job_id = interact!(conn, move |conn| {
        repository::queue::enqueue_job(conn, &payload, Utc::now())
    })
    .await??;
    info!(job_id = job_id.0, "transcode job queued");
    Ok(job_id)
}

/// Fails renditions that have sat in a non-terminal state since before
/// `stall_after` ago, along with any job rows still marked running.
/// Opt-in, only called when the deployment asked for it.
#[instrument(skip(pool, stall_after))]
pub async fn reconcile_stalled(pool: &DbPool, stall_after: chrono::Duration) -> Result<usize> {
    let cutoff = Utc::now() - stall_after;
    let conn = pool.get().await?;
    let swept = interact!(conn, move |conn| {
        let stalled = repository::rendition::get_stalled_renditions(conn, cutoff)?;
        for rendition in &stalled {
            repository::rendition::mark_error(
                conn,
                rendition.id,
                GENERIC_ERROR_CODE,
                "rendition stalled, failed by reconciliation",
            )?;
        }
        let stale_jobs = repository::queue::fail_stale_running_jobs(conn, cutoff)?;
        eyre::Ok(stalled.len() + stale_jobs)
    })
    .await??;
    if swept > 0 {
        warn!(count = swept, "failed stalled renditions and jobs");
    }
    Ok(swept)
}

struct Dispatcher {
    db_pool: DbPool,
    recv: mpsc::Receiver<DispatcherMessage>,
    transcoding_actor: TranscodingActorHandle,
    transcoding_recv: mpsc::UnboundedReceiver<MsgFromTranscoding>,
    // the actor runs one task at a time, so one claimed job is in flight at most
    running_job: Option<TranscodeJobId>,
}

async fn run_dispatcher(mut dispatcher: Dispatcher) {
    let mut poll = tokio::time::interval(POLL_INTERVAL);
    let mut shutting_down = false;
    loop {
        tokio::select! {
            Some(msg) = dispatcher.recv.recv() => {
                match msg {
                    DispatcherMessage::Poll => {
                        if !shutting_down {
                            dispatcher.dispatch_next().await;
                        }
                    }
                    DispatcherMessage::Shutdown => {
                        // keep looping so results of draining tasks still land on
                        // their job rows, the process exits once the actor is done
                        shutting_down = true;
                        if let Err(err) = dispatcher.transcoding_actor.msg_shutdown() {
                            error!("could not deliver shutdown to transcoding actor: {}", err);
                        }
                    }
                }
            }
            Some(msg) = dispatcher.transcoding_recv.recv() => {
                dispatcher.on_transcoding_msg(msg, shutting_down).await;
            }
            _ = poll.tick() => {
                if !shutting_down {
                    dispatcher.dispatch_next().await;
                }
            }
        }
    }
}

impl Dispatcher {
    /// Claims the oldest queued job if the actor is idle and hands it over.
    async fn dispatch_next(&mut self) {
        if self.running_job.is_some() {
            return;
        }
        let claimed = match self.claim_next().await {
            Ok(claimed) => claimed,
            Err(err) => {
                error!("error claiming next job off the queue: {:?}", err);
                return;
            }
        };
        let Some(job) = claimed else {
            return;
        };
        info!(job_id = job.id.0, "dispatching transcode job");
        self.running_job = Some(job.id);
        if let Err(err) = self.transcoding_actor.msg_transcode(job.id, job.payload) {
            error!(job_id = job.id.0, "could not hand job to actor: {}", err);
            self.running_job = None;
            self.fail_job(job.id, "transcoding actor is gone").await;
        }
    }

    async fn claim_next(&self) -> Result<Option<crate::model::QueuedJob>> {
        let conn = self.db_pool.get().await?;
        let claimed = interact!(conn, move |conn| {
            repository::queue::claim_next_job(conn, Utc::now())
        })
        .await??;
        Ok(claimed)
    }

    async fn on_transcoding_msg(&mut self, msg: MsgFromTranscoding, shutting_down: bool) {
        match msg {
            MsgFromTranscoding::ActivityChange { .. } => {}
            MsgFromTranscoding::DroppedMessage => {
                error!("transcoding actor dropped a task, queue row stays running");
            }
            MsgFromTranscoding::TaskResult(result) => {
                self.on_task_result(result).await;
                if !shutting_down {
                    self.dispatch_next().await;
                }
            }
        }
    }

    async fn on_task_result(&mut self, result: Result<TranscodingTaskResult, TaskError>) {
        match result {
            Ok(TranscodingTaskResult::Complete { job_id, rendition_id }) => {
                info!(
                    job_id = job_id.0,
                    rendition_id = rendition_id.0,
                    "transcode job complete"
                );
                self.finish_job(job_id, None).await;
            }
            Ok(TranscodingTaskResult::SourceRejected { job_id }) => {
                warn!(job_id = job_id.0, "source rejected, job marked failed");
                self.finish_job(job_id, Some("source is not valid media".to_string()))
                    .await;
            }
            Ok(TranscodingTaskResult::Error { job_id, report }) => {
                let code = report
                    .downcast_ref::<TranscodeError>()
                    .and_then(|err| match err {
                        TranscodeError::Failed { code, .. } => Some(*code),
                        _ => None,
                    })
                    .unwrap_or(GENERIC_ERROR_CODE);
                error!(job_id = job_id.0, code, "transcode job failed: {:?}", report);
                self.finish_job(job_id, Some(format!("{:#}", report))).await;
            }
            Err(task_error) => {
                // the actor lost the job id, but only one job runs at a time
                let Some(job_id) = self.running_job else {
                    error!("task result with no job in flight: {:?}", task_error);
                    return;
                };
                error!(job_id = job_id.0, "transcode task error: {}", task_error);
                self.finish_job(job_id, Some(task_error.to_string())).await;
            }
        }
    }

    async fn finish_job(&mut self, job_id: TranscodeJobId, error: Option<String>) {
        self.running_job = None;
        if let Some(error) = error {
            self.fail_job(job_id, &error).await;
        } else {
            self.complete_job(job_id).await;
        }
    }

    async fn complete_job(&self, job_id: TranscodeJobId) {
        let result: Result<()> = async {
            let conn = self.db_pool.get().await?;
            interact!(conn, move |conn| {
                repository::queue::mark_job_done(conn, job_id, Utc::now())
            })
            .await??;
            Ok(())
        }
        .await;
        if let Err(err) = result {
            error!(job_id = job_id.0, "could not mark job done: {:?}", err);
        }
    }

    async fn fail_job(&self, job_id: TranscodeJobId, error: &str) {
        let error = error.to_string();
        let result: Result<()> = async {
            let conn = self.db_pool.get().await?;
            interact!(conn, move |conn| {
                repository::queue::mark_job_failed(conn, job_id, &error, Utc::now())
            })
            .await??;
            Ok(())
        }
        .await;
        if let Err(err) = result {
            error!(job_id = job_id.0, "could not mark job failed: {:?}", err);
        }
    }
}

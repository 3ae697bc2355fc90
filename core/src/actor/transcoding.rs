use eyre::{Report, Result};
use tokio::sync::{mpsc, oneshot};
use tracing::Instrument;

use crate::{
    actor::misc::task_loop,
    config,
    core::storage::{LocalFileStorage, Storage},
    job::{TranscodeJob, TranscodeJobResult},
    model::{repository::db::DbPool, JobPayload, RenditionId, TranscodeJobId},
    processing::video::{ffmpeg::FFmpegTranscoder, ffprobe::FFProbe},
};

use super::simple_queue_actor::{
    Actor, ActorOptions, MsgFrom, MsgTaskControl, QueuedActorHandle, TaskError, TaskId,
};

pub type TranscodingActorHandle = QueuedActorHandle<TranscodingTaskMsg>;
pub type MsgFromTranscoding = MsgFrom<TranscodingTaskResult>;

#[derive(Debug, Clone)]
pub enum TranscodingTaskMsg {
    Transcode {
        job_id: TranscodeJobId,
        payload: JobPayload,
    },
}

#[derive(Debug)]
pub enum TranscodingTaskResult {
    Complete {
        job_id: TranscodeJobId,
        rendition_id: RenditionId,
    },
    /// Probe said the source is not usable media. No rendition exists,
    /// the job row still gets marked failed.
    SourceRejected {
        job_id: TranscodeJobId,
    },
    Error {
        job_id: TranscodeJobId,
        report: Report,
    },
}

pub fn start_transcoding_actor(
    db_pool: DbPool,
    config: config::Config,
    did_shutdown_send: oneshot::Sender<()>,
    send_from_us: mpsc::UnboundedSender<MsgFromTranscoding>,
) -> TranscodingActorHandle {
    let actor = TranscodingActor { db_pool, config };
    QueuedActorHandle::new(
        actor,
        send_from_us,
        did_shutdown_send,
        ActorOptions {
            max_tasks: 1,
            max_queue_size: 100,
        },
        tracing::info_span!("transcoding"),
    )
}

impl QueuedActorHandle<TranscodingTaskMsg> {
    pub fn msg_transcode(&self, job_id: TranscodeJobId, payload: JobPayload) -> Result<()> {
        self.msg_do_task(TranscodingTaskMsg::Transcode { job_id, payload })
    }
}

struct TranscodingActor {
    db_pool: DbPool,
    config: config::Config,
}

impl Actor<TranscodingTaskMsg, TranscodingTaskResult> for TranscodingActor {
    async fn run_task(
        &mut self,
        msg: TranscodingTaskMsg,
        result_send: mpsc::UnboundedSender<(TaskId, Result<TranscodingTaskResult, TaskError>)>,
        task_id: TaskId,
        mut ctl_recv: mpsc::UnboundedReceiver<MsgTaskControl>,
    ) {
        match msg {
            TranscodingTaskMsg::Transcode { job_id, payload } => {
                let db_pool = self.db_pool.clone();
                let config = self.config.clone();
                tokio::task::spawn(
                    async move {
                        let bin_paths = config.bin_paths.as_ref();
                        let job = TranscodeJob {
                            pool: db_pool,
                            files_device: Storage::from(LocalFileStorage::for_project(
                                &config.files_device_root,
                                &payload.project_id,
                            )),
                            video_device: Storage::from(LocalFileStorage::for_project(
                                &config.video_device_root,
                                &payload.project_id,
                            )),
                            scratch_root: config.scratch_dir.clone(),
                            encryption_keys: config.encryption_keys.clone(),
                            prober: FFProbe {
                                bin_path: bin_paths.and_then(|b| b.ffprobe.clone()),
                            },
                            engine: FFmpegTranscoder {
                                ffmpeg_bin_path: bin_paths.and_then(|b| b.ffmpeg.clone()),
                                ffprobe_bin_path: bin_paths.and_then(|b| b.ffprobe.clone()),
                            },
                        };
                        let (process_ctl_send, mut process_ctl_recv) =
                            tokio::sync::mpsc::channel(1);
                        let run_fut = job.run(&payload, &mut process_ctl_recv);
                        let task_result =
                            task_loop(run_fut, &mut ctl_recv, process_ctl_send).await;
                        let result = match task_result {
                            Ok(r) => r,
                            Err(err) => {
                                result_send
                                    .send((task_id, Err(err)))
                                    .expect("Receiver must be alive");
                                return;
                            }
                        };
                        let task_result = match result {
                            Ok(TranscodeJobResult::Completed { rendition_id }) => {
                                TranscodingTaskResult::Complete {
                                    job_id,
                                    rendition_id,
                                }
                            }
                            Ok(TranscodeJobResult::RejectedSource) => {
                                TranscodingTaskResult::SourceRejected { job_id }
                            }
                            Err(report) => TranscodingTaskResult::Error { job_id, report },
                        };
                        result_send
                            .send((task_id, Ok(task_result)))
                            .expect("Receiver must be alive");
                    }
                    .in_current_span(),
                );
            }
        }
    }
}

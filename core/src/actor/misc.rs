use std::future::Future;

use tokio::sync::mpsc;

use crate::processing::process_control::ProcessControl;

use super::simple_queue_actor::{MsgTaskControl, TaskError};

/// Drives a task future while translating actor control messages into
/// process control for whatever child the task is running. Returns
/// `Err(Cancelled)` when a cancel arrived before the future finished,
/// whatever the future itself produced after the Quit was delivered.
pub async fn task_loop<T>(
    fut: impl Future<Output = T>,
    ctl_recv: &mut mpsc::UnboundedReceiver<MsgTaskControl>,
    process_ctl_send: mpsc::Sender<ProcessControl>,
) -> Result<T, TaskError> {
    tokio::pin!(fut);
    let mut cancelled = false;
    loop {
        tokio::select! {
            out = &mut fut => {
                if cancelled {
                    return Err(TaskError::Cancelled);
                }
                return Ok(out);
            }
            Some(msg) = ctl_recv.recv() => {
                let process_control = match msg {
                    MsgTaskControl::Pause => ProcessControl::Suspend,
                    MsgTaskControl::Resume => ProcessControl::Resume,
                    MsgTaskControl::Cancel => {
                        cancelled = true;
                        ProcessControl::Quit
                    }
                };
                if process_ctl_send.send(process_control).await.is_err() {
                    // task is not running a process right now, nothing to control
                    tracing::debug!(?msg, "no process to deliver control message to");
                }
            }
        }
    }
}

use eyre::{Context, Result};
use nix::{
    sys::signal::{kill, Signal},
    unistd::Pid,
};
use tokio::sync::{mpsc, oneshot};

#[derive(Debug, Clone)]
pub enum ProcessControl {
    Suspend,
    Resume,
    Quit,
    Kill,
}

pub type ProcessControlReceiver = mpsc::Receiver<ProcessControl>;

impl ProcessControl {
    fn signal(&self) -> Signal {
        match self {
            ProcessControl::Suspend => Signal::SIGTSTP,
            ProcessControl::Resume => Signal::SIGCONT,
            // quit asks nicely, the child still exits on its own terms
            ProcessControl::Quit => Signal::SIGQUIT,
            ProcessControl::Kill => Signal::SIGKILL,
        }
    }
}

/// Waits for the child while applying control messages to it as signals.
/// `Ok(None)` means the child was torn down with `Kill`. Otherwise the
/// collected output comes back, with empty stdout/stderr if the caller
/// consumed the pipes before handing the child over.
#[cfg(target_family = "unix")]
pub async fn run_process(
    child: tokio::process::Child,
    control_recv: &mut ProcessControlReceiver,
) -> Result<Option<std::process::Output>> {
    let raw_pid = child.id().expect("child process must not have completed");
    let pid = Pid::from_raw(raw_pid.try_into().expect("pid_t is a signed 32-bit int"));
    let (done_send, mut done_recv) = oneshot::channel();
    tokio::task::spawn(async move { done_send.send(child.wait_with_output().await) });
    let mut control_open = true;
    loop {
        tokio::select! {
            // Err variant means the sender was dropped, which can not happen
            // before it sends the wait result
            Ok(waited) = &mut done_recv => {
                let output = waited.wrap_err("error waiting for child process")?;
                return Ok(Some(output));
            }
            msg = control_recv.recv(), if control_open => {
                let Some(msg) = msg else {
                    // nothing left to control with, wait out the child
                    tracing::error!("process control channel closed while child is running");
                    control_open = false;
                    continue;
                };
                let signal = msg.signal();
                match kill(pid, signal) {
                    Err(err) => {
                        tracing::error!("Error sending signal {:?} to PID {}: {}", signal, pid, err);
                        if matches!(msg, ProcessControl::Kill) {
                            return Err(err).wrap_err("error killing child process");
                        }
                    }
                    Ok(()) => {
                        if matches!(msg, ProcessControl::Kill) {
                            return Ok(None);
                        }
                    }
                }
            }
        }
    }
}

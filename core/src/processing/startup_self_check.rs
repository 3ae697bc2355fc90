use std::process::Stdio;

use camino::Utf8Path as Path;
use eyre::Result;
use tokio::process::Command;

use crate::{config::BinPaths, util::OptionPathExt};

/// Checks that the external tools the pipeline shells out to exist and run.
/// Logs what is wrong instead of returning error details, the caller only
/// decides whether to refuse startup.
pub async fn run_self_check(bin_paths: Option<&BinPaths>) -> Result<(), ()> {
    let ffmpeg_bin_path: Option<&Path> = bin_paths.and_then(|bp| bp.ffmpeg.as_opt_path());
    check_can_run_tool(ffmpeg_bin_path, "ffmpeg").await?;
    let ffprobe_bin_path: Option<&Path> = bin_paths.and_then(|bp| bp.ffprobe.as_opt_path());
    check_can_run_tool(ffprobe_bin_path, "ffprobe").await?;
    Ok(())
}

async fn check_can_run_tool(bin_path: Option<&Path>, default_bin: &str) -> Result<(), ()> {
    let bin = bin_path.map(|p| p.as_str()).unwrap_or(default_bin);
    let spawn_result = Command::new(bin)
        .arg("-version")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn();
    let child = match spawn_result {
        Ok(c) => c,
        Err(err) => match err.kind() {
            std::io::ErrorKind::NotFound => {
                tracing::error!("Could not find {}. Is it installed?", default_bin);
                return Err(());
            }
            _kind => {
                tracing::error!("Error running {}: {}", default_bin, err);
                return Err(());
            }
        },
    };
    let output = match child.wait_with_output().await {
        Ok(o) => o,
        Err(err) => {
            tracing::error!(
                "{} test failed, error waiting for {} process: {}",
                default_bin,
                default_bin,
                err
            );
            return Err(());
        }
    };
    if !output.status.success() {
        tracing::error!(
            "{} test failed, error running {}:\n{}",
            default_bin,
            default_bin,
            String::from_utf8_lossy(&output.stdout)
        );
        return Err(());
    }
    tracing::debug!("ok: can run {}", default_bin);
    Ok(())
}

use camino::Utf8Path;
use eyre::{Context, Result};
use tracing::instrument;

/// SubRip to WebVTT. ffmpeg only takes WebVTT subtitle inputs for HLS
/// muxing, so .srt uploads are converted on the way into scratch.
pub fn convert_srt_to_vtt(srt: &str) -> String {
    let mut vtt = String::from("WEBVTT\n\n");
    for block in srt.replace("\r\n", "\n").split("\n\n") {
        let block = block.trim();
        if block.is_empty() {
            continue;
        }
        let mut lines = block.lines().peekable();
        // cue numbers are optional in WebVTT, drop the SubRip index line
        if let Some(first) = lines.peek() {
            if first.trim().parse::<u64>().is_ok() {
                lines.next();
            }
        }
        let Some(timing) = lines.next() else {
            continue;
        };
        if !timing.contains("-->") {
            continue;
        }
        // SubRip uses a comma before the milliseconds
        vtt.push_str(&timing.replace(',', "."));
        vtt.push('\n');
        for line in lines {
            vtt.push_str(line);
            vtt.push('\n');
        }
        vtt.push('\n');
    }
    vtt
}

/// Writes `source` as WebVTT at `dest`, converting if the extension says
/// SubRip and passing .vtt files through unchanged.
#[instrument(level = "debug")]
pub async fn write_as_vtt(source: &Utf8Path, dest: &Utf8Path) -> Result<()> {
    match source.extension() {
        Some("srt") => {
            let srt = tokio::fs::read_to_string(source)
                .await
                .wrap_err("could not read subtitle file")?;
            tokio::fs::write(dest, convert_srt_to_vtt(&srt))
                .await
                .wrap_err("could not write converted subtitle file")?;
        }
        _ => {
            tokio::fs::copy(source, dest)
                .await
                .wrap_err("could not copy subtitle file")?;
        }
    }
    Ok(())
}

mod command;

use async_trait::async_trait;
use camino::Utf8Path as Path;

pub use command::{ffprobe_get_media, parse_ffprobe_output};

/// Streams and container level facts about a source file, as far as the
/// pipeline cares. Sources without a video stream are valid inputs
/// (audio only renditions), sources with neither stream are not.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MediaInfo {
    /// container duration in seconds
    pub duration: Option<f64>,
    pub video: Option<VideoStream>,
    /// every audio stream, in file order
    pub audio: Vec<AudioStream>,
}

impl MediaInfo {
    /// Declared language tags of the audio streams, in stream order.
    /// Untagged streams are skipped, the HLS muxer only builds an audio
    /// group for tracks it can label.
    pub fn audio_languages(&self) -> Vec<String> {
        self.audio
            .iter()
            .filter_map(|stream| stream.language.clone())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoStream {
    pub codec_name: String,
    pub width: i32,
    pub height: i32,
    pub bitrate: Option<i64>,
    /// fraction as ffprobe reports it, e.g. "30000/1001"
    pub framerate: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AudioStream {
    pub codec_name: String,
    pub bitrate: Option<i64>,
    pub sample_rate: Option<i64>,
    /// language tag from the stream metadata, e.g. "eng"
    pub language: Option<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum ProbeError {
    /// The file is not something the pipeline can transcode. Jobs hitting
    /// this abort before a rendition document is ever created.
    #[error("not a usable media file: {0}")]
    InvalidMedia(String),
    #[error(transparent)]
    Other(#[from] eyre::Report),
}

#[async_trait]
pub trait MediaProberTrait: Send + Sync {
    async fn probe(&self, path: &Path) -> Result<MediaInfo, ProbeError>;
}

#[derive(Debug, Clone, Default)]
pub struct FFProbe {
    pub bin_path: Option<camino::Utf8PathBuf>,
}

#[async_trait]
impl MediaProberTrait for FFProbe {
    async fn probe(&self, path: &Path) -> Result<MediaInfo, ProbeError> {
        command::ffprobe_get_media(path, self.bin_path.as_deref()).await
    }
}

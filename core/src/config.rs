use std::collections::HashMap;

use camino::{Utf8Path as Path, Utf8PathBuf as PathBuf};
use color_eyre::eyre::{bail, Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
struct TomlDataDir {
    path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
struct TomlScratchDir {
    path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
struct TomlDevice {
    path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
struct TomlBinPaths {
    pub ffmpeg: Option<String>,
    pub ffprobe: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
struct TomlEncryption {
    /// hex encoded 32 byte keys, indexed by key version
    pub keys: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
struct TomlReconcile {
    pub stall_after_minutes: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
struct TomlConfig {
    #[serde(rename = "DataDir")]
    pub data_dir: TomlDataDir,
    #[serde(rename = "ScratchDir")]
    pub scratch_dir: TomlScratchDir,
    #[serde(rename = "FilesDevice")]
    pub files_device: TomlDevice,
    #[serde(rename = "VideoDevice")]
    pub video_device: TomlDevice,
    #[serde(rename = "BinPaths")]
    pub bin_paths: Option<TomlBinPaths>,
    #[serde(rename = "Encryption")]
    pub encryption: Option<TomlEncryption>,
    #[serde(rename = "Reconcile")]
    pub reconcile: Option<TomlReconcile>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinPaths {
    pub ffmpeg: Option<PathBuf>,
    pub ffprobe: Option<PathBuf>,
}

/// Decryption keys for stored files, by key version.
pub type EncryptionKeys = HashMap<i32, Vec<u8>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconcile {
    pub stall_after: chrono::Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub scratch_dir: PathBuf,
    /// root of the device holding source videos and subtitle files
    pub files_device_root: PathBuf,
    /// root of the device rendition output is written to
    pub video_device_root: PathBuf,
    pub bin_paths: Option<BinPaths>,
    pub encryption_keys: EncryptionKeys,
    pub reconcile: Option<Reconcile>,
}

pub async fn read_config(path: &Path) -> Result<Config> {
    let toml_str = tokio::fs::read_to_string(path)
        .await
        .context(format!("Error reading config file {}", path))?;
    let toml_config: TomlConfig = toml::from_str(&toml_str).context("Error parsing config file")?;
    let bin_paths = toml_config.bin_paths.map(|bin_paths| BinPaths {
        ffmpeg: bin_paths.ffmpeg.map(PathBuf::from),
        ffprobe: bin_paths.ffprobe.map(PathBuf::from),
    });
    let mut encryption_keys: EncryptionKeys = HashMap::new();
    if let Some(encryption) = toml_config.encryption {
        for (version, key_hex) in encryption.keys {
            let version: i32 = version
                .parse()
                .context("Encryption key versions must be integers")?;
            let key = hex::decode(&key_hex).context("Encryption keys must be hex encoded")?;
            if key.len() != 32 {
                bail!("Encryption key v{} is not 32 bytes", version);
            }
            encryption_keys.insert(version, key);
        }
    }
    let reconcile = toml_config.reconcile.map(|r| Reconcile {
        stall_after: chrono::Duration::minutes(r.stall_after_minutes),
    });
    Ok(Config {
        data_dir: toml_config.data_dir.path.into(),
        scratch_dir: toml_config.scratch_dir.path.into(),
        files_device_root: toml_config.files_device.path.into(),
        video_device_root: toml_config.video_device.path.into(),
        bin_paths,
        encryption_keys,
        reconcile,
    })
}

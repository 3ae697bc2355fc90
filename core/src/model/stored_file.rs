use strum::{Display, EnumString};

use super::{BucketId, StoredFileId};

/// Compression a stored file was written with. The fetch step has to
/// undo it before the media tools can touch the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Default)]
#[strum(serialize_all = "lowercase")]
pub enum Compression {
    #[default]
    None,
    Gzip,
    Zstd,
}

/// Cipher metadata of an encrypted stored file. The key itself lives in
/// worker configuration, selected by `key_version`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCipher {
    /// cipher name, currently always "aes-256-gcm"
    pub name: String,
    pub key_version: i32,
    /// hex encoded nonce
    pub iv: String,
    /// hex encoded authentication tag
    pub tag: String,
}

/// The bucket file document a Video or Subtitle points at.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredFile {
    pub id: StoredFileId,
    pub bucket_id: BucketId,
    /// key on the files device
    pub path: String,
    pub mime_type: String,
    pub size: i64,
    pub compression: Compression,
    pub cipher: Option<FileCipher>,
}

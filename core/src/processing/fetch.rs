use std::collections::HashMap;
use std::io::Read;

use aes_gcm::{aead::Aead, Aes256Gcm, KeyInit, Nonce};
use camino::Utf8Path;
use eyre::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::instrument;

use crate::core::storage::{Storage, StorageProvider, StorageReadError};
use crate::model::{Compression, StoredFile};

#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("file '{0}' does not exist on the device")]
    NotFound(String),
    #[error("no encryption key configured for version {0}")]
    MissingKey(i32),
    #[error("unsupported cipher '{0}'")]
    UnsupportedCipher(String),
    #[error("could not decrypt file: {0}")]
    Decrypt(String),
    #[error("could not decompress file")]
    Decompress(#[source] std::io::Error),
    #[error(transparent)]
    Other(#[from] eyre::Report),
}

/// Pulls a stored file out of the device into the scratch input directory,
/// undoing encryption and compression so downstream tools see plain media.
#[instrument(skip(storage, encryption_keys), level = "debug")]
pub async fn fetch_to_scratch(
    storage: &Storage,
    file: &StoredFile,
    encryption_keys: &HashMap<i32, Vec<u8>>,
    dest: &Utf8Path,
) -> Result<(), FetchError> {
    let mut read = storage.open_read_stream(&file.path).await.map_err(|err| match err {
        StorageReadError::FileNotFound(key) => FetchError::NotFound(key),
        err => FetchError::Other(eyre::Report::new(err).wrap_err("error opening stored file")),
    })?;

    // plain files stream straight to scratch
    if file.cipher.is_none() && file.compression == Compression::None {
        let mut out = tokio::fs::File::create(dest)
            .await
            .wrap_err("could not create scratch file")
            .map_err(FetchError::Other)?;
        tokio::io::copy(&mut read, &mut out)
            .await
            .wrap_err("error copying stored file to scratch")
            .map_err(FetchError::Other)?;
        out.flush()
            .await
            .wrap_err("error flushing scratch file")
            .map_err(FetchError::Other)?;
        return Ok(());
    }

    let mut data = Vec::new();
    read.read_to_end(&mut data)
        .await
        .wrap_err("error reading stored file")
        .map_err(FetchError::Other)?;

    if let Some(cipher) = &file.cipher {
        if cipher.name != "aes-256-gcm" {
            return Err(FetchError::UnsupportedCipher(cipher.name.clone()));
        }
        let key = encryption_keys
            .get(&cipher.key_version)
            .ok_or(FetchError::MissingKey(cipher.key_version))?;
        data = decrypt_aes_256_gcm(&data, key, &cipher.iv, &cipher.tag)?;
    }

    data = match file.compression {
        Compression::None => data,
        Compression::Gzip => {
            let mut decompressed = Vec::new();
            flate2::read::MultiGzDecoder::new(data.as_slice())
                .read_to_end(&mut decompressed)
                .map_err(FetchError::Decompress)?;
            decompressed
        }
        Compression::Zstd => zstd::decode_all(data.as_slice()).map_err(FetchError::Decompress)?,
    };

    tokio::fs::write(dest, &data)
        .await
        .wrap_err("could not write scratch file")
        .map_err(FetchError::Other)?;
    Ok(())
}

fn decrypt_aes_256_gcm(
    data: &[u8],
    key: &[u8],
    iv_hex: &str,
    tag_hex: &str,
) -> Result<Vec<u8>, FetchError> {
    let iv = hex::decode(iv_hex)
        .map_err(|err| FetchError::Decrypt(format!("invalid nonce hex: {err}")))?;
    let tag = hex::decode(tag_hex)
        .map_err(|err| FetchError::Decrypt(format!("invalid tag hex: {err}")))?;
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|_| FetchError::Decrypt("key must be 32 bytes".to_owned()))?;
    // the aead crate wants the tag appended to the ciphertext
    let mut ciphertext = Vec::with_capacity(data.len() + tag.len());
    ciphertext.extend_from_slice(data);
    ciphertext.extend_from_slice(&tag);
    cipher
        .decrypt(Nonce::from_slice(&iv), ciphertext.as_slice())
        .map_err(|_| FetchError::Decrypt("bad key, nonce or tag".to_owned()))
}

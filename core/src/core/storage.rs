use async_trait::async_trait;
use camino::{Utf8Path as Path, Utf8PathBuf as PathBuf};
use enum_dispatch::enum_dispatch;
use eyre::{Context, Result};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{instrument, Instrument};

/// Abstraction for the devices rendition artifacts and source files live on.
/// This interface is basically a blob store, where every object has
/// a `key` used to store and retrieve it.
/// In practice, the `key` is not opaque, as it is path shaped so that
/// HLS/DASH players can resolve segment references relative to manifests.
#[async_trait]
#[enum_dispatch(Storage)]
pub trait StorageProvider: Clone {
    async fn open_read_stream(
        &self,
        key: &str,
    ) -> Result<Box<dyn AsyncRead + Send + Unpin>, StorageReadError>;
    async fn open_write_stream(&self, key: &str) -> Result<Box<dyn AsyncWrite + Send + Unpin>>;
    /// Uploads a local file under `key`. `content_type` is advisory,
    /// filesystem backed devices ignore it.
    async fn write_file(&self, key: &str, source: &Path, content_type: &str) -> Result<()>;
    async fn exists(&self, key: &str) -> Result<bool>;
    /// Removes every object whose key starts with `prefix`.
    async fn delete_prefix(&self, prefix: &str) -> Result<()>;
    /// If this `StorageProvider` is backed by a local filesystem,
    /// this returns the path `key` maps to assuming `key` exists.
    /// If `key` doesn't exist or the `StorageProvider` is not local,
    /// returns None.
    async fn local_path(&self, key: &str) -> Result<Option<PathBuf>>;
}

#[derive(thiserror::Error, Debug)]
pub enum StorageReadError {
    #[error("File with key '{0}' does not exist")]
    FileNotFound(String),
    #[error(transparent)]
    IOError {
        #[from]
        source: tokio::io::Error,
    },
    #[error(transparent)]
    Unknown {
        #[from]
        source: eyre::Report,
    },
}

#[enum_dispatch]
pub enum Storage {
    LocalFileStorage,
}

impl Clone for Storage {
    fn clone(&self) -> Self {
        match self {
            Self::LocalFileStorage(a) => Self::LocalFileStorage(a.clone()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LocalFileStorage {
    root: PathBuf,
}

impl LocalFileStorage {
    pub fn new(root: PathBuf) -> LocalFileStorage {
        LocalFileStorage { root }
    }

    /// Device scoped to a project: all keys live under `root/{project_id}`.
    pub fn for_project(root: &Path, project_id: &str) -> LocalFileStorage {
        LocalFileStorage {
            root: root.join(project_id),
        }
    }
}

#[async_trait]
impl StorageProvider for LocalFileStorage {
    #[instrument(skip(self), level = "debug")]
    async fn open_read_stream(
        &self,
        key: &str,
    ) -> Result<Box<dyn AsyncRead + Send + Unpin>, StorageReadError> {
        use tokio::io::ErrorKind;
        let open = tokio::fs::OpenOptions::new()
            .read(true)
            .open(self.root.join(key))
            .in_current_span()
            .await;
        match open {
            Ok(f) => Ok(Box::new(f)),
            Err(err) => Err(match err.kind() {
                ErrorKind::NotFound => StorageReadError::FileNotFound(key.to_owned()),
                err => StorageReadError::IOError { source: err.into() },
            }),
        }
    }

    #[instrument(skip(self), level = "debug")]
    async fn open_write_stream(&self, key: &str) -> Result<Box<dyn AsyncWrite + Send + Unpin>> {
        let path = self.root.join(key);
        if let Some(parent) = &path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .wrap_err("could not create directory")?;
        }
        Ok(Box::new(
            tokio::fs::OpenOptions::new()
                .create_new(true)
                .read(true)
                .write(true)
                .open(path)
                .await
                .wrap_err("error opening file for writing")?,
        ))
    }

    #[instrument(skip(self), level = "debug")]
    async fn write_file(&self, key: &str, source: &Path, _content_type: &str) -> Result<()> {
        let path = self.root.join(key);
        if let Some(parent) = &path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .wrap_err("could not create directory")?;
        }
        tokio::fs::copy(source, &path)
            .await
            .wrap_err("error copying file to storage")?;
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn exists(&self, key: &str) -> Result<bool> {
        tokio::fs::try_exists(self.root.join(key))
            .await
            .wrap_err("error checking if path exists")
    }

    #[instrument(skip(self), level = "debug")]
    async fn delete_prefix(&self, prefix: &str) -> Result<()> {
        let path = self.root.join(prefix);
        match tokio::fs::remove_dir_all(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == tokio::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).wrap_err("error removing directory from storage"),
        }
    }

    async fn local_path(&self, key: &str) -> Result<Option<PathBuf>> {
        Ok(Some(self.root.join(key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8Path;
    use claims::{assert_ok, assert_ok_eq};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn write_then_read_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(tmp.path()).unwrap().to_owned();
        let storage = LocalFileStorage::new(root);
        let mut write = assert_ok!(storage.open_write_stream("1/master.m3u8").await);
        assert_ok!(write.write_all(b"#EXTM3U").await);
        assert_ok!(write.shutdown().await);
        drop(write);

        assert_ok_eq!(storage.exists("1/master.m3u8").await, true);
        let mut read = assert_ok!(storage.open_read_stream("1/master.m3u8").await);
        let mut contents = String::new();
        assert_ok!(read.read_to_string(&mut contents).await);
        assert_eq!(contents, "#EXTM3U");
    }

    #[tokio::test]
    async fn read_missing_key_is_file_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(tmp.path()).unwrap().to_owned();
        let storage = LocalFileStorage::new(root);
        let err = storage.open_read_stream("nope").await.err().unwrap();
        assert!(matches!(err, StorageReadError::FileNotFound(key) if key == "nope"));
    }

    #[tokio::test]
    async fn delete_prefix_removes_rendition_dir_only() {
        let tmp = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(tmp.path()).unwrap().to_owned();
        let storage = LocalFileStorage::new(root);
        for key in ["1/sd-1/seg0.ts", "1/sd-1/seg1.ts", "1/other.vtt"] {
            let mut write = assert_ok!(storage.open_write_stream(key).await);
            assert_ok!(write.write_all(b"data").await);
            assert_ok!(write.shutdown().await);
        }
        assert_ok!(storage.delete_prefix("1/sd-1/").await);
        assert_ok_eq!(storage.exists("1/sd-1/seg0.ts").await, false);
        assert_ok_eq!(storage.exists("1/other.vtt").await, true);
        // removing an already absent prefix is fine
        assert_ok!(storage.delete_prefix("1/sd-1/").await);
    }
}

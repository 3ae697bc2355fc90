use camino::{Utf8Path, Utf8PathBuf};
use eyre::{Context, Result};
use uuid::Uuid;

pub mod storage_key;

/// Per-run scratch space on local disk. Keyed by a fresh uuid so that
/// concurrent or retried runs for the same (video, profile) pair never
/// stomp on each other's files.
#[derive(Debug, Clone)]
pub struct ScratchDirs {
    pub root: Utf8PathBuf,
    /// decoded and decrypted source files go here
    pub in_dir: Utf8PathBuf,
    /// everything the encoder writes goes here
    pub out_dir: Utf8PathBuf,
}

impl ScratchDirs {
    pub async fn create(scratch_root: &Utf8Path) -> Result<ScratchDirs> {
        let run_id = Uuid::new_v4();
        let root = scratch_root.join(run_id.to_string());
        let in_dir = root.join("in");
        let out_dir = root.join("out");
        tokio::fs::create_dir_all(&in_dir)
            .await
            .wrap_err("could not create scratch input directory")?;
        tokio::fs::create_dir_all(&out_dir)
            .await
            .wrap_err("could not create scratch output directory")?;
        Ok(ScratchDirs {
            root,
            in_dir,
            out_dir,
        })
    }

    /// Removes the whole run directory. Failures here are not fatal to
    /// the job, callers log and move on.
    pub async fn cleanup(&self) -> Result<()> {
        tokio::fs::remove_dir_all(&self.root)
            .await
            .wrap_err("could not remove scratch directory")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claims::assert_ok;

    #[tokio::test]
    async fn scratch_dirs_are_unique_per_run() {
        let tmp = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(tmp.path()).unwrap();
        let first = assert_ok!(ScratchDirs::create(root).await);
        let second = assert_ok!(ScratchDirs::create(root).await);
        assert_ne!(first.root, second.root);
        assert!(first.in_dir.is_dir());
        assert!(first.out_dir.is_dir());

        assert_ok!(first.cleanup().await);
        assert!(!first.root.exists());
        assert!(second.out_dir.is_dir());
    }
}
